use anyhow::{Context, Result};
use serde::Deserialize;
use std::process::Command;

use super::WindowManager;
use crate::types::{BackendWindow, MonitorRect, Rect, WindowHandle};

pub struct Hyprland;

#[derive(Deserialize)]
struct HyprClient {
    address: Option<String>,
    title: Option<String>,
    at: Option<(i32, i32)>,
    size: Option<(i32, i32)>,
    pid: Option<i64>,
    mapped: Option<bool>,
    hidden: Option<bool>,
}

#[derive(Deserialize)]
struct HyprMonitor {
    x: Option<i32>,
    y: Option<i32>,
    width: Option<u32>,
    height: Option<u32>,
    scale: Option<f64>,
    disabled: Option<bool>,
}

fn parse_hypr_address(value: &str) -> Option<u64> {
    let trimmed = value.trim().trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16).ok()
}

fn hyprctl(args: &[&str]) -> Result<String> {
    let output = Command::new("hyprctl")
        .args(args)
        .output()
        .context("spawn hyprctl")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow::anyhow!("hyprctl failed: {stderr}"));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn hyprctl_json<T: for<'de> Deserialize<'de>>(args: &[&str]) -> Result<T> {
    let text = hyprctl(args)?;
    let value = serde_json::from_str(&text).context("parse hyprctl json")?;
    Ok(value)
}

fn dispatch(args: &[&str]) -> Result<()> {
    let mut full = vec!["dispatch"];
    full.extend_from_slice(args);
    let reply = hyprctl(&full)?;
    let reply = reply.trim();
    if reply != "ok" {
        return Err(anyhow::anyhow!("hyprctl dispatch {}: {reply}", args.join(" ")));
    }
    Ok(())
}

fn client_to_window(client: HyprClient) -> Option<BackendWindow> {
    if client.mapped == Some(false) || client.hidden == Some(true) {
        return None;
    }
    let handle = parse_hypr_address(client.address.as_deref()?)?;
    let (left, top) = client.at.unwrap_or((0, 0));
    let (width, height) = client.size.unwrap_or((0, 0));
    Some(BackendWindow {
        handle: WindowHandle(handle),
        title: client.title.unwrap_or_default(),
        rect: Rect::new(left, top, width, height),
        pid: client.pid.and_then(|pid| u32::try_from(pid).ok()),
    })
}

/// Hyprland reports monitor sizes in physical pixels while window
/// coordinates are logical.
fn monitor_to_rect(monitor: HyprMonitor) -> Option<MonitorRect> {
    if monitor.disabled == Some(true) {
        return None;
    }
    let scale = monitor.scale.unwrap_or(1.0).max(0.1);
    Some(MonitorRect {
        x: monitor.x.unwrap_or(0),
        y: monitor.y.unwrap_or(0),
        width: (monitor.width? as f64 / scale).round() as i32,
        height: (monitor.height? as f64 / scale).round() as i32,
    })
}

impl WindowManager for Hyprland {
    fn list_windows(&self) -> Result<Vec<BackendWindow>> {
        let clients = hyprctl_json::<Vec<HyprClient>>(&["-j", "clients"])?;
        Ok(clients.into_iter().filter_map(client_to_window).collect())
    }

    fn move_resize(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
        let addr = format!("address:0x{:x}", handle.0);
        // Tiled windows ignore absolute placement.
        dispatch(&["setfloating", &addr])?;
        let position = format!("exact {} {},{addr}", rect.left, rect.top);
        dispatch(&["movewindowpixel", &position])?;
        let size = format!("exact {} {},{addr}", rect.width, rect.height);
        dispatch(&["resizewindowpixel", &size])?;
        Ok(())
    }

    fn monitors(&self) -> Result<Vec<MonitorRect>> {
        let monitors = hyprctl_json::<Vec<HyprMonitor>>(&["-j", "monitors"])?;
        Ok(monitors.into_iter().filter_map(monitor_to_rect).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_geometry_and_pid() {
        let json = r#"[
            {"address": "0x55d0c1a2b3c0", "title": "Notes", "at": [-1920, 40],
             "size": [800, 600], "pid": 4242, "mapped": true, "hidden": false},
            {"address": "0x1", "title": "hidden", "at": [0, 0], "size": [1, 1],
             "pid": 1, "mapped": true, "hidden": true}
        ]"#;
        let clients: Vec<HyprClient> = serde_json::from_str(json).unwrap();
        let windows: Vec<_> = clients.into_iter().filter_map(client_to_window).collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].handle, WindowHandle(0x55d0c1a2b3c0));
        assert_eq!(windows[0].rect, Rect::new(-1920, 40, 800, 600));
        assert_eq!(windows[0].pid, Some(4242));
    }

    #[test]
    fn negative_pid_is_dropped() {
        let client = HyprClient {
            address: Some("0x10".into()),
            title: Some("x".into()),
            at: None,
            size: None,
            pid: Some(-1),
            mapped: None,
            hidden: None,
        };
        assert_eq!(client_to_window(client).unwrap().pid, None);
    }

    #[test]
    fn monitor_size_is_scaled_to_logical() {
        let json = r#"[{"x": 2560, "y": 0, "width": 3840, "height": 2160, "scale": 2.0}]"#;
        let monitors: Vec<HyprMonitor> = serde_json::from_str(json).unwrap();
        let rects: Vec<_> = monitors.into_iter().filter_map(monitor_to_rect).collect();
        assert_eq!(
            rects,
            vec![MonitorRect {
                x: 2560,
                y: 0,
                width: 1920,
                height: 1080
            }]
        );
    }
}
