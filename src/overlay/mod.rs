//! Preview of where applications will land: one translucent panel per
//! monitor with an outline and a key label for every preview entry.

mod paint;
mod wayland;

use anyhow::Result;

use crate::types::{AppKey, MonitorRect, Rect};

pub use paint::paint_panel;
pub use wayland::WaylandOverlay;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewEntry {
    pub key: AppKey,
    pub rect: Rect,
}

/// An outline in monitor-local coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outline {
    pub key: AppKey,
    pub rect: Rect,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Panel {
    pub monitor: MonitorRect,
    pub outlines: Vec<Outline>,
}

/// Assign each entry to the monitor containing its top-left corner.
/// Entries that start off every monitor are not drawn.
pub fn plan_panels(monitors: &[MonitorRect], entries: &[PreviewEntry]) -> Vec<Panel> {
    monitors
        .iter()
        .map(|monitor| Panel {
            monitor: *monitor,
            outlines: entries
                .iter()
                .filter(|entry| monitor.contains_point(entry.rect.left, entry.rect.top))
                .map(|entry| Outline {
                    key: entry.key.clone(),
                    rect: Rect::new(
                        entry.rect.left - monitor.x,
                        entry.rect.top - monitor.y,
                        entry.rect.width,
                        entry.rect.height,
                    ),
                })
                .collect(),
        })
        .collect()
}

pub trait OverlayRenderer {
    /// Replace whatever is on screen: every previous panel is released
    /// before the new ones are created.
    fn render(&mut self, monitors: &[MonitorRect], entries: &[PreviewEntry]) -> Result<()>;

    fn clear(&mut self) -> Result<()>;

    /// Service pending display events while the overlay stays up.
    fn pump(&mut self) -> Result<()> {
        Ok(())
    }
}
