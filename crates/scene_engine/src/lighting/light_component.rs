//! Light attached to a game object

use std::any::Any;

use super::{Light, LightId};
use crate::scene::{Component, ComponentContext, DestroyContext};

/// Registers a light with the [`super::LightManager`] and keeps its position
/// on the owner's transform.
///
/// Registration happens on the first update that has access to the manager.
#[derive(Debug)]
pub struct LightComponent {
    light: Light,
    id: Option<LightId>,
}

impl LightComponent {
    /// Wrap a light description
    pub fn new(light: Light) -> Self {
        Self { light, id: None }
    }

    /// Registered light id
    pub fn light_id(&self) -> Option<LightId> {
        self.id
    }

    /// Light description used at registration
    pub fn light(&self) -> &Light {
        &self.light
    }
}

impl Component for LightComponent {
    fn update(&mut self, ctx: &mut ComponentContext<'_>, _delta_time: f32) {
        let position = ctx.transform().position();
        let Some(lights) = ctx.lights_mut() else {
            return;
        };

        match self.id {
            Some(id) => {
                if !lights.set_light_position(id, position) {
                    log::debug!("Light {:?} no longer registered", id);
                    self.id = None;
                }
            }
            None => {
                self.light.position = position;
                self.id = Some(lights.add_light(self.light.clone()));
            }
        }
        self.light.position = position;
    }

    fn on_destroy(&mut self, ctx: &mut DestroyContext<'_>) {
        if let Some(id) = self.id.take() {
            ctx.release_queue().push_light(id);
        }
    }

    fn label(&self) -> &str {
        "Light"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
