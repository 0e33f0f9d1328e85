// This file defines the particle, integrator and settings contracts shared by the force
// field, the reference simulation driver and the binary.

use bytemuck::try_cast_slice;
use nalgebra::Vector3;

use crate::error::{OctreeError, Result};

pub type Vec3 = Vector3<f64>;

/// Gravitational constant in parsec³ / (solar mass · year²).
pub const G_PC_MSUN_YR: f64 = 6.67428e-11
    / (3.08567758129e16 * 3.08567758129e16 * 3.08567758129e16)
    * 1.988435e30
    * (365.25 * 86400.0)
    * (365.25 * 86400.0);

pub trait Particle {
    fn new(position: Vec3, velocity: Vec3, mass: f64) -> Self
    where
        Self: Sized;
    fn position(&self) -> &Vec3;
    fn velocity(&self) -> &Vec3;
    fn acceleration(&self) -> &Vec3;
    fn position_mut(&mut self) -> &mut Vec3;
    fn velocity_mut(&mut self) -> &mut Vec3;
    fn acceleration_mut(&mut self) -> &mut Vec3;
    fn get_mass(&self) -> f64;
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub mass: f64,
}

impl Particle for PointParticle {
    fn new(position: Vec3, velocity: Vec3, mass: f64) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vec3::zeros(),
            mass,
        }
    }

    fn position(&self) -> &Vec3 {
        &self.position
    }

    fn velocity(&self) -> &Vec3 {
        &self.velocity
    }

    fn acceleration(&self) -> &Vec3 {
        &self.acceleration
    }

    fn position_mut(&mut self) -> &mut Vec3 {
        &mut self.position
    }

    fn velocity_mut(&mut self) -> &mut Vec3 {
        &mut self.velocity
    }

    fn acceleration_mut(&mut self) -> &mut Vec3 {
        &mut self.acceleration
    }

    fn get_mass(&self) -> f64 {
        self.mass
    }
}

/// Indexed read access to positions and masses.
///
/// The octree never owns particle storage: nodes and the renegade list hold
/// indices, and every traversal resolves them through one of these.
pub trait ParticleSet {
    fn len(&self) -> usize;
    fn position(&self, index: usize) -> Vec3;
    fn mass(&self, index: usize) -> f64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: Particle> ParticleSet for [P] {
    fn len(&self) -> usize {
        <[P]>::len(self)
    }

    fn position(&self, index: usize) -> Vec3 {
        *self[index].position()
    }

    fn mass(&self, index: usize) -> f64 {
        self[index].get_mass()
    }
}

impl<P: Particle> ParticleSet for Vec<P> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn position(&self, index: usize) -> Vec3 {
        *self[index].position()
    }

    fn mass(&self, index: usize) -> f64 {
        self[index].get_mass()
    }
}

/// Number of `f64` slots one particle occupies in a packed state buffer.
pub const STATE_STRIDE: usize = 6;

/// View over a flat integrator buffer laid out as `[x, y, z, vx, vy, vz]` per
/// particle, with masses kept alongside in a separate slice.
#[derive(Clone, Copy, Debug)]
pub struct PackedState<'a> {
    states: &'a [[f64; STATE_STRIDE]],
    masses: &'a [f64],
}

impl<'a> PackedState<'a> {
    pub fn new(state: &'a [f64], masses: &'a [f64]) -> Result<Self> {
        let states: &[[f64; STATE_STRIDE]] =
            try_cast_slice(state).map_err(|e| OctreeError::StateLayout {
                reason: format!(
                    "state buffer of {} values is not a whole number of {}-wide records ({e})",
                    state.len(),
                    STATE_STRIDE
                ),
            })?;
        if states.len() != masses.len() {
            return Err(OctreeError::StateLayout {
                reason: format!(
                    "{} particle records but {} masses",
                    states.len(),
                    masses.len()
                ),
            });
        }
        Ok(Self { states, masses })
    }

    pub fn velocity(&self, index: usize) -> Vec3 {
        let s = &self.states[index];
        Vec3::new(s[3], s[4], s[5])
    }
}

impl ParticleSet for PackedState<'_> {
    fn len(&self) -> usize {
        self.states.len()
    }

    fn position(&self, index: usize) -> Vec3 {
        let s = &self.states[index];
        Vec3::new(s[0], s[1], s[2])
    }

    fn mass(&self, index: usize) -> f64 {
        self.masses[index]
    }
}

/// Step-wide configuration of the force field. Read-only during evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSettings {
    /// Gravitational constant in simulation units.
    pub g: f64,
    /// Opening angle: a node of side `s` at distance `d` is approximated when `s / d <= theta`.
    pub theta: f64,
    /// Added to the squared distance before taking the root.
    pub softening: f64,
    /// Scale applied to the enclosing region each step, at least 1.
    pub margin: f64,
    /// Dump the tree at debug level after every rebuild.
    pub verbose: bool,
    /// Particle whose traversal is replayed to record which nodes were approximated.
    pub probe: Option<usize>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            g: 1.0,
            theta: 0.9,
            softening: 0.1 * 0.1,
            margin: 1.05,
            verbose: false,
            probe: Some(0),
        }
    }
}

impl SimulationSettings {
    /// Settings in parsec, solar mass and year units.
    pub fn astronomical() -> Self {
        Self {
            g: G_PC_MSUN_YR,
            ..Self::default()
        }
    }

    pub fn with_g(mut self, g: f64) -> Self {
        self.g = g;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_softening(mut self, softening: f64) -> Self {
        self.softening = softening;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_probe(mut self, probe: Option<usize>) -> Self {
        self.probe = probe;
        self
    }
}

pub trait Integrator<P: Particle> {
    fn init(&mut self);
    fn integrate_pre_force(&mut self, points: &mut [P], dt: f64);
    fn integrate_after_force(&mut self, points: &mut [P], dt: f64);
}

/// Kick-drift-kick leapfrog. Expects accelerations to be current when a step starts.
#[derive(Clone, Debug, Default)]
pub struct LeapFrogIntegrator;

impl LeapFrogIntegrator {
    pub fn new() -> Self {
        Self
    }
}

impl<P: Particle> Integrator<P> for LeapFrogIntegrator {
    fn init(&mut self) {}

    fn integrate_pre_force(&mut self, points: &mut [P], dt: f64) {
        for point in points.iter_mut() {
            let kick = point.acceleration().scale(0.5 * dt);
            *point.velocity_mut() += kick;
            let drift = point.velocity().scale(dt);
            *point.position_mut() += drift;
        }
    }

    fn integrate_after_force(&mut self, points: &mut [P], dt: f64) {
        for point in points.iter_mut() {
            let kick = point.acceleration().scale(0.5 * dt);
            *point.velocity_mut() += kick;
        }
    }
}
