//! Input management system
//!
//! [`InputState`] is a per-frame snapshot fed by the window backend. Edge
//! state ("just pressed", mouse delta, scroll) is cleared by
//! [`InputState::begin_frame`]; held state persists until the release event.

use std::collections::HashSet;

use bitflags::bitflags;

use crate::foundation::math::Vec2;

bitflags! {
    /// Set of held mouse buttons
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        /// Left mouse button
        const LEFT = 0b001;
        /// Right mouse button
        const RIGHT = 0b010;
        /// Middle mouse button
        const MIDDLE = 0b100;
    }
}

impl From<MouseButton> for MouseButtons {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Self::LEFT,
            MouseButton::Right => Self::RIGHT,
            MouseButton::Middle => Self::MIDDLE,
        }
    }
}

/// Keyboard and mouse state for the current frame
#[derive(Debug, Default)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    keys_just_pressed: HashSet<KeyCode>,
    buttons: MouseButtons,
    buttons_just_pressed: MouseButtons,
    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
    scroll: Vec2,
    mouse_locked: bool,
}

impl InputState {
    /// Create an empty input state
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame edge state. Call once before polling events.
    pub fn begin_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.buttons_just_pressed = MouseButtons::empty();
        self.mouse_delta = Vec2::zeros();
        self.scroll = Vec2::zeros();
    }

    /// Handle key input
    pub fn handle_key_input(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            if self.keys_down.insert(key) {
                self.keys_just_pressed.insert(key);
            }
        } else {
            self.keys_down.remove(&key);
        }
    }

    /// Handle mouse button input
    pub fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        let flag = MouseButtons::from(button);
        if pressed {
            if !self.buttons.contains(flag) {
                self.buttons_just_pressed.insert(flag);
            }
            self.buttons.insert(flag);
        } else {
            self.buttons.remove(flag);
        }
    }

    /// Handle mouse movement
    ///
    /// The delta's Y axis is inverted so that moving the mouse up yields a
    /// positive value (screen coordinates grow downwards).
    #[allow(clippy::cast_possible_truncation)]
    pub fn handle_mouse_move(&mut self, x: f64, y: f64) {
        let position = Vec2::new(x as f32, y as f32);
        if let Some(previous) = self.mouse_position {
            self.mouse_delta += Vec2::new(position.x - previous.x, previous.y - position.y);
        }
        self.mouse_position = Some(position);
    }

    /// Handle mouse wheel
    #[allow(clippy::cast_possible_truncation)]
    pub fn handle_scroll(&mut self, delta_x: f64, delta_y: f64) {
        self.scroll += Vec2::new(delta_x as f32, delta_y as f32);
    }

    /// Record whether the cursor is captured by the window
    pub fn set_mouse_locked(&mut self, locked: bool) {
        if self.mouse_locked != locked {
            log::debug!("Mouse lock: {}", locked);
        }
        self.mouse_locked = locked;
    }

    /// Whether the key is currently held
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Whether the key went down this frame
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    /// Whether the mouse button is currently held
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(button.into())
    }

    /// Whether the mouse button went down this frame
    pub fn is_mouse_button_just_pressed(&self, button: MouseButton) -> bool {
        self.buttons_just_pressed.contains(button.into())
    }

    /// Last known cursor position in window coordinates
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position.unwrap_or_else(Vec2::zeros)
    }

    /// Cursor movement accumulated this frame
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll accumulated this frame
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll
    }

    /// Whether the cursor is captured
    pub fn is_mouse_locked(&self) -> bool {
        self.mouse_locked
    }
}

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A key
    A,
    /// B key
    B,
    /// C key
    C,
    /// D key
    D,
    /// E key
    E,
    /// F key
    F,
    /// G key
    G,
    /// H key
    H,
    /// I key
    I,
    /// J key
    J,
    /// K key
    K,
    /// L key
    L,
    /// M key
    M,
    /// N key
    N,
    /// O key
    O,
    /// P key
    P,
    /// Q key
    Q,
    /// R key
    R,
    /// S key
    S,
    /// T key
    T,
    /// U key
    U,
    /// V key
    V,
    /// W key
    W,
    /// X key
    X,
    /// Y key
    Y,
    /// Z key
    Z,
    /// Space key
    Space,
    /// Enter key
    Enter,
    /// Escape key
    Escape,
    /// Tab key
    Tab,
    /// Left shift
    LeftShift,
    /// Left control
    LeftControl,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}
