use anyhow::{Context, Result};
use niri_ipc::{socket::Socket, Request, Response};

use super::WindowManager;
use crate::types::{BackendWindow, MonitorRect, Rect, WindowHandle};

/// niri exposes window titles and outputs, but no window geometry and no
/// absolute placement, so captured rects are empty and repositioning fails.
pub struct Niri;

fn request(request: Request) -> Result<Response> {
    let socket = Socket::connect().context("connect to niri socket")?;
    let (reply, _events) = socket.send(request).context("send niri request")?;
    reply.map_err(|message| anyhow::anyhow!(message))
}

impl WindowManager for Niri {
    fn list_windows(&self) -> Result<Vec<BackendWindow>> {
        let windows = match request(Request::Windows)? {
            Response::Windows(windows) => windows,
            _ => return Ok(Vec::new()),
        };
        Ok(windows
            .into_iter()
            .map(|window| BackendWindow {
                handle: WindowHandle(window.id),
                title: window.title.unwrap_or_default(),
                rect: Rect::default(),
                pid: None,
            })
            .collect())
    }

    fn move_resize(&self, handle: WindowHandle, _rect: Rect) -> Result<()> {
        Err(anyhow::anyhow!(
            "niri cannot place window {} at absolute coordinates",
            handle.0
        ))
    }

    fn monitors(&self) -> Result<Vec<MonitorRect>> {
        let outputs = match request(Request::Outputs)? {
            Response::Outputs(outputs) => outputs,
            _ => return Ok(Vec::new()),
        };
        let mut monitors: Vec<MonitorRect> = outputs
            .into_values()
            .filter_map(|output| output.logical)
            .map(|logical| MonitorRect {
                x: logical.x,
                y: logical.y,
                width: logical.width as i32,
                height: logical.height as i32,
            })
            .collect();
        monitors.sort_by_key(|m| (m.x, m.y));
        Ok(monitors)
    }
}
