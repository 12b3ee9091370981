//! Physics configuration

use serde::{Deserialize, Serialize};

use super::PhysicsError;
use crate::config::Config;

/// Physics world configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity vector (default: -9.81 in Y)
    pub gravity: [f32; 3],

    /// Step length used when `fixed_timestep` is enabled
    pub timestep: f32,

    /// Maximum number of substeps per frame in fixed-step mode
    pub max_substeps: u32,

    /// Advance in fixed `timestep` increments instead of one step of the
    /// frame delta
    pub fixed_timestep: bool,

    /// Velocity solver iterations
    pub solver_iterations: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            timestep: 1.0 / 60.0,
            max_substeps: 4,
            fixed_timestep: false,
            solver_iterations: 4,
        }
    }
}

impl Config for PhysicsConfig {}

impl PhysicsConfig {
    /// Set gravity
    pub fn with_gravity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.gravity = [x, y, z];
        self
    }

    /// Switch to fixed-step integration with the given step length
    pub fn with_fixed_timestep(mut self, timestep: f32) -> Self {
        self.timestep = timestep;
        self.fixed_timestep = true;
        self
    }

    /// Check the values a simulation cannot run with
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(PhysicsError::InvalidConfig(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidConfig(
                "max_substeps must be at least 1".to_string(),
            ));
        }
        if self.solver_iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "solver_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PhysicsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_step = PhysicsConfig {
            timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(bad_step.validate(), Err(PhysicsError::InvalidConfig(_))));

        let bad_gravity = PhysicsConfig::default().with_gravity(0.0, f32::NAN, 0.0);
        assert!(bad_gravity.validate().is_err());

        let no_substeps = PhysicsConfig {
            max_substeps: 0,
            ..Default::default()
        };
        assert!(no_substeps.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PhysicsConfig::parse(
            "gravity = [0.0, -1.62, 0.0]\n",
            crate::config::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.gravity, [0.0, -1.62, 0.0]);
        assert_eq!(config.max_substeps, 4);
        assert!(!config.fixed_timestep);
    }
}
