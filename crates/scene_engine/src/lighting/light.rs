//! Light sources

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightType {
    /// Point light (like a lightbulb)
    Point,
    /// Directional light (like sunlight)
    Directional,
    /// Spot light (like a flashlight)
    Spot,
}

impl LightType {
    /// Value of the `lights[i].type` uniform
    pub fn shader_index(self) -> i32 {
        match self {
            Self::Point => 0,
            Self::Directional => 1,
            Self::Spot => 2,
        }
    }
}

/// Light source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// World-space position. Also the eye of the shadow pass.
    pub position: Vec3,
    /// Direction for directional/spot lights
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Light intensity
    pub intensity: f32,
}

impl Light {
    /// Create a light from all of its fields
    pub fn new(light_type: LightType, position: Vec3, direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type,
            position,
            direction,
            color,
            intensity,
        }
    }

    /// Create a directional light.
    ///
    /// The position still matters: the shadow pass looks from it towards the
    /// origin.
    pub fn directional(position: Vec3, direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self::new(LightType::Directional, position, safe_normalize(direction), color, intensity)
    }

    /// Create a point light
    pub fn point(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self::new(LightType::Point, position, Vec3::new(0.0, -1.0, 0.0), color, intensity)
    }

    /// Create a spot light
    pub fn spot(position: Vec3, direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self::new(LightType::Spot, position, safe_normalize(direction), color, intensity)
    }
}

fn safe_normalize(v: Vec3) -> Vec3 {
    v.try_normalize(f32::EPSILON).unwrap_or_else(|| Vec3::new(0.0, -1.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 0.001;

    #[test]
    fn test_directional_light_normalizes_direction() {
        let light = Light::directional(
            Vec3::new(-2.0, 200.0, -1.0),
            Vec3::new(-0.5, -1.0, -0.3),
            Vec3::new(1.0, 0.95, 0.8),
            1.0,
        );
        assert_relative_eq!(light.direction.norm(), 1.0, epsilon = EPSILON);
        assert_eq!(light.light_type.shader_index(), 1);

        let degenerate = Light::spot(Vec3::zeros(), Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), 1.0);
        assert_relative_eq!(degenerate.direction, Vec3::new(0.0, -1.0, 0.0));
    }
}
