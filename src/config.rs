use std::{path::PathBuf, time::Duration};

pub const APP_DIR_NAME: &str = "relayout";
pub const SNAPSHOT_FILE: &str = "window_positions.json";
pub const SETTINGS_FILE: &str = "config.json";

/// Delay between issuing a launch and looking for the new window.
pub const SETTLE_INTERVAL: Duration = Duration::from_secs(2);

/// Executable that hosts sandboxed (Flatpak) applications.
pub const CONTAINER_HOST: &str = "/usr/bin/bwrap";

/// Products that open many windows with varying titles. A title containing
/// the needle (case-insensitive) maps to the canonical key.
pub const MULTI_WINDOW_PRODUCTS: &[(&str, &str)] = &[
    ("microsoft edge", "Edge"),
    ("mozilla firefox", "Firefox"),
    ("google chrome", "Chrome"),
    ("chromium", "Chromium"),
    ("brave", "Brave"),
    ("visual studio code", "Code"),
];

/// Separators that split a window title into "<key> <sep> <rest>".
pub const TITLE_SEPARATORS: &[char] = &['-', '\u{2013}', '\u{2014}', '|'];

pub const PREVIEW_SECONDS: u64 = 5;

pub const BACKDROP_RGB: (u8, u8, u8) = (0, 0, 0);
pub const BACKDROP_OPACITY: f32 = 0.7;
pub const OUTLINE_RGB: (u8, u8, u8) = (0, 0, 255);
pub const OUTLINE_WIDTH: f32 = 2.0;
pub const LABEL_BG_RGB: (u8, u8, u8) = (255, 255, 0);
pub const LABEL_FG_RGB: (u8, u8, u8) = (0, 0, 0);
pub const LABEL_INSET: i32 = 10;
pub const LABEL_PADDING: i32 = 5;
pub const LABEL_SCALE: i32 = 2;

pub const fn backdrop_alpha() -> u8 {
    let clamped = if BACKDROP_OPACITY < 0.0 {
        0.0
    } else if BACKDROP_OPACITY > 1.0 {
        1.0
    } else {
        BACKDROP_OPACITY
    };
    (clamped * 255.0 + 0.5) as u8
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
