// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Duration;

use softbuffer::{Context, Surface};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::Key;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use super::{bgr_to_xrgb, scale_nearest};
use crate::core::{ConvertedFrame, DisplayConfig, KeyPress, PreviewDisplay, RecorderError, Result};

/// Key reported when the user closes the window.
const WINDOW_CLOSED: &str = "WindowClosed";

/// Last frame handed to [`PreviewWindow::show`], packed for presentation.
struct Picture {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

struct PreviewState {
    title: String,
    window: Option<Rc<Window>>,
    surface: Option<Surface<Rc<Window>, Rc<Window>>>,
    picture: Option<Picture>,
    sized_for: Option<(u32, u32)>,
    key: Option<KeyPress>,
    error: Option<RecorderError>,
}

impl PreviewState {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(640, 480));
        let window = Rc::new(
            event_loop
                .create_window(attributes)
                .map_err(|e| RecorderError::Display(format!("Failed to create window: {}", e)))?,
        );
        let context = Context::new(window.clone())
            .map_err(|e| RecorderError::Display(format!("Failed to create context: {}", e)))?;
        let surface = Surface::new(&context, window.clone())
            .map_err(|e| RecorderError::Display(format!("Failed to create surface: {}", e)))?;

        tracing::debug!("Preview window '{}' created", self.title);
        self.window = Some(window);
        self.surface = Some(surface);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(window), Some(surface), Some(picture)) =
            (self.window.as_ref(), self.surface.as_mut(), self.picture.as_ref())
        else {
            return Ok(());
        };

        let size = window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            // Minimized.
            return Ok(());
        };

        surface
            .resize(width, height)
            .map_err(|e| RecorderError::Display(format!("Failed to resize surface: {}", e)))?;
        let mut buffer = surface
            .buffer_mut()
            .map_err(|e| RecorderError::Display(format!("Failed to map surface: {}", e)))?;
        scale_nearest(
            &picture.pixels,
            picture.width,
            picture.height,
            &mut buffer,
            width.get(),
            height.get(),
        );
        buffer
            .present()
            .map_err(|e| RecorderError::Display(format!("Failed to present: {}", e)))
    }

    fn record_key(&mut self, key: String) {
        if self.key.is_none() {
            self.key = Some(KeyPress::new(key));
        }
    }
}

impl ApplicationHandler for PreviewState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window(event_loop) {
                self.error = Some(e);
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.record_key(WINDOW_CLOSED.to_string()),
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let key = match &event.logical_key {
                    Key::Character(text) => text.to_string(),
                    Key::Named(named) => format!("{:?}", named),
                    other => format!("{:?}", other),
                };
                self.record_key(key);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.error = Some(e);
                }
            }
            _ => {}
        }
    }
}

/// Native preview window.
///
/// Events are pumped only inside [`wait_key`](PreviewDisplay::wait_key), so
/// the window must live on the thread that created it.
pub struct PreviewWindow {
    event_loop: EventLoop<()>,
    state: PreviewState,
}

impl PreviewWindow {
    pub fn open(config: &DisplayConfig) -> Result<Self> {
        let event_loop = EventLoop::new()
            .map_err(|e| RecorderError::Display(format!("Failed to create event loop: {}", e)))?;
        let mut window = Self {
            event_loop,
            state: PreviewState {
                title: config.window_title.clone(),
                window: None,
                surface: None,
                picture: None,
                sized_for: None,
                key: None,
                error: None,
            },
        };
        window.pump(Duration::ZERO)?;
        if window.state.window.is_none() {
            return Err(RecorderError::Display("preview window was not created".into()));
        }
        tracing::info!("Preview window opened");
        Ok(window)
    }

    fn pump(&mut self, timeout: Duration) -> Result<()> {
        let status = self
            .event_loop
            .pump_app_events(Some(timeout), &mut self.state);
        if let PumpStatus::Exit(code) = status {
            tracing::debug!("Preview event loop exited with {}", code);
            self.state.record_key(WINDOW_CLOSED.to_string());
        }
        match self.state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl PreviewDisplay for PreviewWindow {
    fn show(&mut self, frame: &ConvertedFrame) -> Result<()> {
        let dims = (frame.width, frame.height);
        if self.state.sized_for != Some(dims) {
            if let Some(window) = self.state.window.as_ref() {
                let _ = window.request_inner_size(PhysicalSize::new(frame.width, frame.height));
            }
            self.state.sized_for = Some(dims);
        }

        self.state.picture = Some(Picture {
            pixels: bgr_to_xrgb(frame),
            width: frame.width,
            height: frame.height,
        });
        self.state.redraw()
    }

    fn wait_key(&mut self, timeout: Duration) -> Result<Option<KeyPress>> {
        self.pump(timeout)?;
        Ok(self.state.key.take())
    }
}
