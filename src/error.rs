//! Error types for the octree and the force field.

use thiserror::Error;

use crate::{shared::Vec3, tree::BoundingBox};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OctreeError {
    /// The particle lies outside the region it was inserted into. The force
    /// field logs this and skips the particle for the current step.
    #[error("particle {index} at ({}, {}, {}) lies outside region {region}", .position.x, .position.y, .position.z)]
    OutOfBounds {
        index: usize,
        position: Vec3,
        region: BoundingBox,
    },

    #[error("invalid state buffer: {reason}")]
    StateLayout { reason: String },
}

pub type Result<T> = std::result::Result<T, OctreeError>;
