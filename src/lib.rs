pub mod brute_force;
pub mod error;
pub mod force_field;
pub mod shared;
pub mod simulation;
pub mod tree;

pub use error::{OctreeError, Result};
pub use force_field::{ForceField, StepStats};
pub use shared::{Particle, PointParticle, SimulationSettings, Vec3};
pub use tree::{BoundingBox, Octant, Octree, OctreeNode, Placement};
