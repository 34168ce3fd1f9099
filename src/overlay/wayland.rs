use anyhow::{Context, Result};
use log::{debug, warn};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState, Region},
    delegate_compositor, delegate_layer, delegate_output, delegate_registry, delegate_shm,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    shell::{
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{slot::SlotPool, Shm, ShmHandler},
};
use tiny_skia::PixmapMut;
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_output, wl_shm, wl_surface},
    Connection, EventQueue, QueueHandle,
};

use super::{paint_panel, plan_panels, OverlayRenderer, Panel, PreviewEntry};
use crate::types::MonitorRect;

/// Roundtrips allowed for all panels to receive their first configure.
const CONFIGURE_ROUNDTRIPS: usize = 8;

/// Layer-shell overlay: one click-through surface per output.
pub struct WaylandOverlay {
    event_queue: EventQueue<OverlayState>,
    state: OverlayState,
}

impl WaylandOverlay {
    pub fn connect() -> Result<Self> {
        let conn = Connection::connect_to_env().context("connect to Wayland")?;
        let (globals, mut event_queue) =
            registry_queue_init::<OverlayState>(&conn).context("init registry")?;
        let qh = event_queue.handle();

        let compositor =
            CompositorState::bind(&globals, &qh).context("wl_compositor not available")?;
        let layer_shell = LayerShell::bind(&globals, &qh).context("layer shell not available")?;
        let shm = Shm::bind(&globals, &qh).context("wl_shm not available")?;
        let pool = SlotPool::new(1920 * 1080 * 4, &shm).context("create shm pool")?;

        let mut state = OverlayState {
            registry_state: RegistryState::new(&globals),
            output_state: OutputState::new(&globals, &qh),
            compositor,
            layer_shell,
            shm,
            pool,
            panels: Vec::new(),
        };
        // Output geometry arrives in the first couple of roundtrips.
        event_queue.roundtrip(&mut state).context("read outputs")?;
        event_queue.roundtrip(&mut state).context("read outputs")?;
        Ok(Self { event_queue, state })
    }
}

impl OverlayRenderer for WaylandOverlay {
    fn render(&mut self, monitors: &[MonitorRect], entries: &[PreviewEntry]) -> Result<()> {
        self.clear()?;
        let qh = self.event_queue.handle();
        for panel in plan_panels(monitors, entries) {
            let Some(output) = self.state.output_for(&panel.monitor) else {
                warn!(
                    "no Wayland output at {},{}; skipping its panel",
                    panel.monitor.x, panel.monitor.y
                );
                continue;
            };
            self.state.open_panel(&qh, &output, panel)?;
        }
        for _ in 0..CONFIGURE_ROUNDTRIPS {
            if self.state.panels.iter().all(|p| p.configured) {
                break;
            }
            self.event_queue
                .roundtrip(&mut self.state)
                .context("dispatch events")?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.state.panels.is_empty() {
            return Ok(());
        }
        debug!("tearing down {} overlay panels", self.state.panels.len());
        // Dropping the layer surface destroys it on the compositor side.
        self.state.panels.clear();
        self.event_queue
            .roundtrip(&mut self.state)
            .context("dispatch events")?;
        Ok(())
    }

    fn pump(&mut self) -> Result<()> {
        self.event_queue
            .roundtrip(&mut self.state)
            .context("dispatch events")?;
        Ok(())
    }
}

impl Drop for WaylandOverlay {
    fn drop(&mut self) {
        let _ = self.clear();
    }
}

struct PanelSurface {
    layer: LayerSurface,
    panel: Panel,
    width: u32,
    height: u32,
    buffer_scale: u32,
    configured: bool,
}

struct OverlayState {
    registry_state: RegistryState,
    output_state: OutputState,
    compositor: CompositorState,
    layer_shell: LayerShell,
    shm: Shm,
    pool: SlotPool,
    panels: Vec<PanelSurface>,
}

impl OverlayState {
    fn output_for(&self, monitor: &MonitorRect) -> Option<wl_output::WlOutput> {
        self.output_state.outputs().find(|output| {
            self.output_state
                .info(output)
                .and_then(|info| info.logical_position)
                == Some((monitor.x, monitor.y))
        })
    }

    fn open_panel(
        &mut self,
        qh: &QueueHandle<Self>,
        output: &wl_output::WlOutput,
        panel: Panel,
    ) -> Result<()> {
        let buffer_scale = self
            .output_state
            .info(output)
            .map(|info| info.scale_factor.max(1) as u32)
            .unwrap_or(1);

        let surface = self.compositor.create_surface(qh);
        let layer = self.layer_shell.create_layer_surface(
            qh,
            surface,
            Layer::Overlay,
            Some("relayout-preview"),
            Some(output),
        );
        layer.set_anchor(Anchor::TOP | Anchor::BOTTOM | Anchor::LEFT | Anchor::RIGHT);
        layer.set_keyboard_interactivity(KeyboardInteractivity::None);
        layer.set_exclusive_zone(-1);
        layer.set_size(0, 0);
        // An empty input region lets clicks fall through to the windows below.
        let region = Region::new(&self.compositor).context("create input region")?;
        layer.wl_surface().set_input_region(Some(region.wl_region()));
        if buffer_scale > 1 {
            layer.wl_surface().set_buffer_scale(buffer_scale as i32);
        }
        layer.commit();

        self.panels.push(PanelSurface {
            layer,
            width: panel.monitor.width.max(1) as u32,
            height: panel.monitor.height.max(1) as u32,
            panel,
            buffer_scale,
            configured: false,
        });
        Ok(())
    }

    fn draw(&mut self, index: usize, qh: &QueueHandle<Self>) {
        let Some(surface) = self.panels.get(index) else {
            return;
        };
        let buffer_width = surface.width * surface.buffer_scale;
        let buffer_height = surface.height * surface.buffer_scale;
        let stride = buffer_width as i32 * 4;

        let needed = (buffer_width * buffer_height * 4) as usize;
        if self.pool.len() < needed {
            if let Err(err) = self.pool.resize(needed) {
                warn!("resize shm pool: {err}");
                return;
            }
        }

        let (buffer, canvas) = match self.pool.create_buffer(
            buffer_width as i32,
            buffer_height as i32,
            stride,
            wl_shm::Format::Argb8888,
        ) {
            Ok(created) => created,
            Err(err) => {
                warn!("create overlay buffer: {err}");
                return;
            }
        };

        {
            let Some(mut pixmap) = PixmapMut::from_bytes(canvas, buffer_width, buffer_height)
            else {
                warn!("overlay buffer has unexpected size");
                return;
            };
            paint_panel(&mut pixmap, &surface.panel, surface.buffer_scale as f32);
        }

        swizzle_rgba_to_bgra(canvas);

        let wl_surface = surface.layer.wl_surface();
        wl_surface.damage_buffer(0, 0, buffer_width as i32, buffer_height as i32);
        wl_surface.frame(qh, wl_surface.clone());
        if let Err(err) = buffer.attach_to(wl_surface) {
            warn!("attach overlay buffer: {err}");
            return;
        }
        surface.layer.commit();
    }

    fn panel_index(&self, surface: &wl_surface::WlSurface) -> Option<usize> {
        self.panels
            .iter()
            .position(|panel| panel.layer.wl_surface() == surface)
    }
}

impl CompositorHandler for OverlayState {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for OverlayState {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}

    fn update_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}

    fn output_destroyed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
}

impl LayerShellHandler for OverlayState {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, layer: &LayerSurface) {
        if let Some(index) = self.panel_index(layer.wl_surface()) {
            self.panels.remove(index);
        }
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        let Some(index) = self.panel_index(layer.wl_surface()) else {
            return;
        };
        let panel = &mut self.panels[index];
        let (width, height) = configure.new_size;
        if width > 0 && height > 0 {
            panel.width = width;
            panel.height = height;
        }
        panel.configured = true;
        self.draw(index, qh);
    }
}

impl ShmHandler for OverlayState {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

delegate_compositor!(OverlayState);
delegate_output!(OverlayState);
delegate_shm!(OverlayState);
delegate_layer!(OverlayState);
delegate_registry!(OverlayState);

impl ProvidesRegistryState for OverlayState {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState];
}

fn swizzle_rgba_to_bgra(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
}
