use crate::{
    force_field::ForceField,
    shared::{Integrator, LeapFrogIntegrator, Particle, SimulationSettings},
};

/// Speed of a circular orbit of radius `radius` around `central_mass`.
pub fn orbital_velocity(g: f64, central_mass: f64, radius: f64) -> f64 {
    (g * central_mass / radius).sqrt()
}

/// Particles advanced by an integrator, with forces from a [`ForceField`].
#[derive(Clone)]
pub struct Simulation<P, I = LeapFrogIntegrator>
where
    P: Particle + Sync,
    I: Integrator<P>,
{
    points: Vec<P>,
    integrator: I,
    field: ForceField,
    elapsed: f64,
}

impl<P, I> Simulation<P, I>
where
    P: Particle + Sync,
    I: Integrator<P>,
{
    pub fn new(points: Vec<P>, integrator: I, settings: SimulationSettings) -> Self {
        Self {
            points,
            integrator,
            field: ForceField::new(settings),
            elapsed: 0.0,
        }
    }

    pub fn init(&mut self) {
        self.integrator.init();
        self.elapsed = 0.0;
        self.update_forces();
    }

    pub fn update_forces(&mut self) {
        self.field.apply(&mut self.points);
    }

    pub fn step_by(&mut self, dt: f64) {
        self.integrator.integrate_pre_force(&mut self.points, dt);
        self.update_forces();
        self.integrator.integrate_after_force(&mut self.points, dt);
        self.elapsed += dt;
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn field(&self) -> &ForceField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ForceField {
        &mut self.field
    }

    pub fn add_point(&mut self, point: P) {
        self.points.push(point);
    }

    pub fn remove_point(&mut self, index: usize) {
        self.points.swap_remove(index);
    }

    pub fn get_points(&self) -> &[P] {
        &self.points
    }
}
