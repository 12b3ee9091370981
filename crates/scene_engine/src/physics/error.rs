//! Error types for the physics system

use thiserror::Error;

use super::RigidBodyHandle;

/// Physics system errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Invalid configuration
    #[error("Invalid physics configuration: {0}")]
    InvalidConfig(String),

    /// Rigid body not found
    #[error("Rigid body not found: {0:?}")]
    BodyNotFound(RigidBodyHandle),

    /// Shape creation failed
    #[error("Failed to create collision shape: {0}")]
    ShapeCreationFailed(String),

    /// The component has no owning game object yet
    #[error("Physics component is not attached to a game object")]
    NotAttached,
}
