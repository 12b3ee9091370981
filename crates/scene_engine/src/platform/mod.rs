//! Windowing layer
//!
//! The engine only needs a handful of window operations, collected in
//! [`WindowBackend`]. [`HeadlessWindow`] replays scripted events and is used by
//! tests and headless runs; [`GlfwWindow`] opens a real window when the
//! `glfw-window` feature is enabled.

mod headless;

#[cfg(feature = "glfw-window")]
mod glfw_window;

pub use headless::HeadlessWindow;

#[cfg(feature = "glfw-window")]
pub use glfw_window::GlfwWindow;

use thiserror::Error;

use crate::application::AppEvent;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// Windowing library failed to start
    #[error("Window system initialization failed: {0}")]
    InitializationFailed(String),

    /// Window could not be created
    #[error("Window creation failed")]
    CreationFailed,
}

/// Window operations the engine relies on
pub trait WindowBackend {
    /// Whether the window was asked to close
    fn should_close(&self) -> bool;

    /// Ask the window to close
    fn request_close(&mut self);

    /// Collect the events received since the previous call
    fn poll_events(&mut self) -> Vec<AppEvent>;

    /// Drawable size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Capture or release the cursor
    fn set_mouse_locked(&mut self, locked: bool);

    /// Show the finished frame
    fn present(&mut self);
}
