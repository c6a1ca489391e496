//! Full-screen winit window presenting through pixels.
//!
//! The event loop is never handed over to winit: every draw and every input
//! poll pumps it once without blocking, so the trial loop keeps control of
//! timing.

use ab_glyph::FontVec;
use anyhow::{anyhow, bail, Context, Result};
use mvast_core::{Display, InputEvent, PresentationError, PresentationFrame, RatingView};
use mvast_render::SkiaRenderer;
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

const STARTUP_PUMPS: usize = 50;

struct Surface {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    renderer: SkiaRenderer,
}

/// Window state driven by winit callbacks.
struct Shell {
    surface: Option<Surface>,
    font: Option<FontVec>,
    events: Vec<InputEvent>,
    cursor: (f32, f32),
    scale_factor: f64,
    refresh_rate: Option<f64>,
    startup_error: Option<String>,
    exited: bool,
}

impl Shell {
    fn new(font: Option<FontVec>) -> Self {
        Self {
            surface: None,
            font,
            events: Vec::new(),
            cursor: (0.0, 0.0),
            scale_factor: 1.0,
            refresh_rate: None,
            startup_error: None,
            exited: false,
        }
    }

    fn quit(&mut self) {
        self.events.push(InputEvent::Quit);
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<Surface> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;
        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let attributes = Window::default_attributes()
            .with_title("M-VAST")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("creating the stimulus window")?,
        );

        let size = window.inner_size();
        self.scale_factor = window.scale_factor();
        let texture = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels = Pixels::new(size.width, size.height, texture)
            .context("creating the pixel buffer")?;
        let renderer = SkiaRenderer::new(size.width, size.height, self.font.take())?;
        window.set_cursor_visible(false);

        info!("display configuration:");
        info!("  physical size: {}x{}", size.width, size.height);
        info!("  scale factor: {:.2}", self.scale_factor);
        match self.refresh_rate {
            Some(hz) => info!("  refresh rate: {hz:.1} Hz"),
            None => warn!("  refresh rate unknown"),
        }
        if !renderer.has_font() {
            warn!("no font loaded; on-screen text will not be drawn");
        }

        Ok(Surface {
            window,
            pixels,
            renderer,
        })
    }

    /// Only the swap chain follows the window; the canvas keeps the size the
    /// stimuli were scaled to and pixels letterboxes it onto the surface.
    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Err(e) = surface.pixels.resize_surface(size.width, size.height) {
            error!("failed to resize surface: {e}");
            return;
        }
        let (w, h) = surface.renderer.size();
        info!(
            "window resized to {}x{}; canvas stays {w}x{h}",
            size.width, size.height
        );
    }

    fn redraw(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Err(e) = surface.renderer.copy_to(surface.pixels.frame_mut()) {
            warn!("redraw failed: {e}");
            return;
        }
        if let Err(e) = surface.pixels.render() {
            warn!("redraw failed: {e}");
        }
    }
}

impl ApplicationHandler for Shell {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }
        match self.open(event_loop) {
            Ok(surface) => self.surface = Some(surface),
            Err(e) => {
                self.startup_error = Some(format!("{e:#}"));
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.quit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() && !event.repeat {
                    if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                        self.quit();
                    } else {
                        self.events.push(InputEvent::KeyPressed);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let pos = (position.x as f32, position.y as f32);
                self.cursor = match self.surface.as_ref() {
                    Some(s) => canvas_point(s.pixels.window_pos_to_pixel(pos), s.renderer.size()),
                    None => pos,
                };
                let (x, y) = self.cursor;
                self.events.push(InputEvent::PointerMoved { x, y });
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let (x, y) = self.cursor;
                self.events.push(match state {
                    ElementState::Pressed => InputEvent::PointerPressed { x, y },
                    ElementState::Released => InputEvent::PointerReleased { x, y },
                });
            }
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                let size = self.surface.as_ref().map(|s| s.window.inner_size());
                if let Some(size) = size {
                    self.resize(size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

/// Maps a window position onto the canvas; points in the letterbox are
/// clamped to the nearest edge pixel.
fn canvas_point(mapped: Result<(usize, usize), (isize, isize)>, (w, h): (u32, u32)) -> (f32, f32) {
    match mapped {
        Ok((x, y)) => (x as f32, y as f32),
        Err((x, y)) => (
            x.clamp(0, (w as isize - 1).max(0)) as f32,
            y.clamp(0, (h as isize - 1).max(0)) as f32,
        ),
    }
}

/// The participant-facing screen.
pub struct WinitDisplay {
    event_loop: EventLoop<()>,
    shell: Shell,
}

impl WinitDisplay {
    /// Opens the borderless full-screen window on the primary monitor.
    pub fn open(font: Option<FontVec>) -> Result<Self> {
        let mut event_loop = EventLoop::new().context("creating the event loop")?;
        let mut shell = Shell::new(font);
        for _ in 0..STARTUP_PUMPS {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(100)), &mut shell);
            if shell.surface.is_some() || shell.startup_error.is_some() {
                break;
            }
            if let PumpStatus::Exit(code) = status {
                bail!("event loop exited during startup (code {code})");
            }
        }
        if let Some(e) = shell.startup_error.take() {
            bail!(e);
        }
        if shell.surface.is_none() {
            bail!("the window was never created");
        }
        Ok(Self { event_loop, shell })
    }

    fn pump(&mut self) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.shell);
        if let PumpStatus::Exit(_) = status {
            if !self.shell.exited {
                self.shell.exited = true;
                self.shell.quit();
            }
        }
    }

    fn present<F>(&mut self, draw: F) -> Result<(), PresentationError>
    where
        F: FnOnce(&mut SkiaRenderer) -> Result<(), PresentationError>,
    {
        self.pump();
        let Some(surface) = self.shell.surface.as_mut() else {
            return Err(PresentationError::Surface("window is gone".into()));
        };
        draw(&mut surface.renderer)?;
        surface.renderer.copy_to(surface.pixels.frame_mut())?;
        surface
            .pixels
            .render()
            .map_err(|e| PresentationError::Surface(e.to_string()))
    }
}

impl Display for WinitDisplay {
    fn size(&self) -> (u32, u32) {
        self.shell
            .surface
            .as_ref()
            .map(|s| s.renderer.size())
            .unwrap_or((0, 0))
    }

    fn show_fixation(&mut self) -> Result<(), PresentationError> {
        self.present(|r| {
            r.draw_fixation();
            Ok(())
        })
    }

    fn show_frame(&mut self, frame: &PresentationFrame) -> Result<(), PresentationError> {
        self.present(|r| r.draw_frame(&frame.buffer))
    }

    fn show_rating(&mut self, view: &RatingView<'_>) -> Result<(), PresentationError> {
        self.present(|r| {
            r.draw_rating(view);
            Ok(())
        })
    }

    fn show_message(&mut self, text: &str) -> Result<(), PresentationError> {
        self.present(|r| {
            r.draw_message(text);
            Ok(())
        })
    }

    fn set_pointer_visible(&mut self, visible: bool) {
        if let Some(surface) = &self.shell.surface {
            surface.window.set_cursor_visible(visible);
        }
    }

    fn poll_input(&mut self) -> Vec<InputEvent> {
        self.pump();
        std::mem::take(&mut self.shell.events)
    }
}

impl Drop for WinitDisplay {
    fn drop(&mut self) {
        if let Some(surface) = &self.shell.surface {
            surface.window.set_cursor_visible(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_positions_land_on_the_fixed_canvas() {
        assert_eq!(canvas_point(Ok((960, 540)), (1920, 1080)), (960.0, 540.0));
        assert_eq!(canvas_point(Err((-40, 300)), (1920, 1080)), (0.0, 300.0));
        assert_eq!(canvas_point(Err((2500, 1200)), (1920, 1080)), (1919.0, 1079.0));
    }
}
