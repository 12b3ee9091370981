//! GLFW window

use glfw::{Action, Context, WindowEvent};

use super::{WindowBackend, WindowError};
use crate::application::AppEvent;
use crate::input::{KeyCode, MouseButton};

/// Desktop window with an OpenGL context
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, WindowEvent)>,
}

impl GlfwWindow {
    /// Open a window
    pub fn new(title: &str, width: u32, height: u32, resizable: bool) -> Result<Self, WindowError> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(format!("{:?}", e)))?;
        glfw.window_hint(glfw::WindowHint::ContextVersion(4, 6));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::Resizable(resizable));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.make_current();
        window.set_key_polling(true);
        window.set_mouse_button_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_scroll_polling(true);
        window.set_close_polling(true);
        window.set_focus_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Opened window '{}' ({}x{})", title, width, height);
        Ok(Self { glfw, window, events })
    }

    fn translate(event: WindowEvent) -> Option<AppEvent> {
        match event {
            WindowEvent::Key(key, _, action, _) => {
                let key = map_key(key)?;
                match action {
                    Action::Press => Some(AppEvent::KeyInput { key, pressed: true }),
                    Action::Release => Some(AppEvent::KeyInput { key, pressed: false }),
                    Action::Repeat => None,
                }
            }
            WindowEvent::MouseButton(button, action, _) => {
                let button = match button {
                    glfw::MouseButton::Button1 => MouseButton::Left,
                    glfw::MouseButton::Button2 => MouseButton::Right,
                    glfw::MouseButton::Button3 => MouseButton::Middle,
                    _ => return None,
                };
                Some(AppEvent::MouseButton {
                    button,
                    pressed: action != Action::Release,
                })
            }
            WindowEvent::CursorPos(x, y) => Some(AppEvent::MouseMoved { x, y }),
            WindowEvent::Scroll(delta_x, delta_y) => Some(AppEvent::MouseWheel { delta_x, delta_y }),
            WindowEvent::FramebufferSize(width, height) => Some(AppEvent::WindowResized {
                width: width.max(0) as u32,
                height: height.max(0) as u32,
            }),
            WindowEvent::Close => Some(AppEvent::WindowCloseRequested),
            WindowEvent::Focus(true) => Some(AppEvent::WindowFocused),
            WindowEvent::Focus(false) => Some(AppEvent::WindowUnfocused),
            _ => None,
        }
    }
}

fn map_key(key: glfw::Key) -> Option<KeyCode> {
    use glfw::Key;
    let code = match key {
        Key::A => KeyCode::A,
        Key::B => KeyCode::B,
        Key::C => KeyCode::C,
        Key::D => KeyCode::D,
        Key::E => KeyCode::E,
        Key::F => KeyCode::F,
        Key::G => KeyCode::G,
        Key::H => KeyCode::H,
        Key::I => KeyCode::I,
        Key::J => KeyCode::J,
        Key::K => KeyCode::K,
        Key::L => KeyCode::L,
        Key::M => KeyCode::M,
        Key::N => KeyCode::N,
        Key::O => KeyCode::O,
        Key::P => KeyCode::P,
        Key::Q => KeyCode::Q,
        Key::R => KeyCode::R,
        Key::S => KeyCode::S,
        Key::T => KeyCode::T,
        Key::U => KeyCode::U,
        Key::V => KeyCode::V,
        Key::W => KeyCode::W,
        Key::X => KeyCode::X,
        Key::Y => KeyCode::Y,
        Key::Z => KeyCode::Z,
        Key::Space => KeyCode::Space,
        Key::Enter => KeyCode::Enter,
        Key::Escape => KeyCode::Escape,
        Key::Tab => KeyCode::Tab,
        Key::LeftShift => KeyCode::LeftShift,
        Key::LeftControl => KeyCode::LeftControl,
        Key::Up => KeyCode::Up,
        Key::Down => KeyCode::Down,
        Key::Left => KeyCode::Left,
        Key::Right => KeyCode::Right,
        _ => return None,
    };
    Some(code)
}

impl WindowBackend for GlfwWindow {
    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn request_close(&mut self) {
        self.window.set_should_close(true);
    }

    fn poll_events(&mut self) -> Vec<AppEvent> {
        self.glfw.poll_events();
        glfw::flush_messages(&self.events)
            .filter_map(|(_, event)| Self::translate(event))
            .collect()
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    fn set_mouse_locked(&mut self, locked: bool) {
        let mode = if locked {
            glfw::CursorMode::Disabled
        } else {
            glfw::CursorMode::Normal
        };
        self.window.set_cursor_mode(mode);
    }

    fn present(&mut self) {
        self.window.swap_buffers();
    }
}
