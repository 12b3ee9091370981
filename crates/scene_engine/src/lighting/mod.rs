//! Lighting system
//!
//! Lights are owned by the [`LightManager`]; the first light also drives the
//! [`ShadowMapper`].

mod light;
mod light_component;
mod light_manager;
mod shadow_mapper;

pub use light::{Light, LightType};
pub use light_component::LightComponent;
pub use light_manager::{LightId, LightManager};
pub use shadow_mapper::{ShadowMapper, ShadowSettings, SHADOW_MAP_UNIT};
