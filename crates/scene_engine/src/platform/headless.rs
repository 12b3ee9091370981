//! Scripted window without a display

use std::collections::VecDeque;

use super::WindowBackend;
use crate::application::AppEvent;

/// Window that replays queued events one frame at a time.
///
/// With a frame limit it asks to close after presenting that many frames.
#[derive(Debug)]
pub struct HeadlessWindow {
    size: (u32, u32),
    scripted: VecDeque<Vec<AppEvent>>,
    frame_limit: Option<u64>,
    frames_presented: u64,
    close_requested: bool,
    mouse_locked: bool,
}

impl HeadlessWindow {
    /// Create a window with the given drawable size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            scripted: VecDeque::new(),
            frame_limit: None,
            frames_presented: 0,
            close_requested: false,
            mouse_locked: false,
        }
    }

    /// Close after `frames` presented frames
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Queue the events delivered by one future `poll_events` call
    pub fn queue_frame(&mut self, events: Vec<AppEvent>) {
        self.scripted.push_back(events);
    }

    /// Frames presented so far
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Whether the cursor is captured
    pub fn is_mouse_locked(&self) -> bool {
        self.mouse_locked
    }
}

impl WindowBackend for HeadlessWindow {
    fn should_close(&self) -> bool {
        self.close_requested || self.frame_limit.is_some_and(|limit| self.frames_presented >= limit)
    }

    fn request_close(&mut self) {
        self.close_requested = true;
    }

    fn poll_events(&mut self) -> Vec<AppEvent> {
        let events = self.scripted.pop_front().unwrap_or_default();
        for event in &events {
            match event {
                AppEvent::WindowResized { width, height } => self.size = (*width, *height),
                AppEvent::WindowCloseRequested => self.close_requested = true,
                _ => {}
            }
        }
        events
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn set_mouse_locked(&mut self, locked: bool) {
        self.mouse_locked = locked;
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        log::trace!("Headless frame {} presented", self.frames_presented);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyCode;

    #[test]
    fn test_scripted_frames_and_frame_limit() {
        let mut window = HeadlessWindow::new(800, 600).with_frame_limit(2);
        window.queue_frame(vec![AppEvent::KeyInput {
            key: KeyCode::W,
            pressed: true,
        }]);
        window.queue_frame(vec![AppEvent::WindowResized {
            width: 1024,
            height: 768,
        }]);

        assert_eq!(window.poll_events().len(), 1);
        window.present();
        assert!(!window.should_close());

        window.poll_events();
        assert_eq!(window.framebuffer_size(), (1024, 768));
        window.present();
        assert!(window.should_close());
        assert!(window.poll_events().is_empty());
    }

    #[test]
    fn test_close_request_event() {
        let mut window = HeadlessWindow::new(1, 1);
        window.queue_frame(vec![AppEvent::WindowCloseRequested]);
        window.poll_events();
        assert!(window.should_close());
    }
}
