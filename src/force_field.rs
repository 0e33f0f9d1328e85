use rayon::prelude::*;

use crate::{
    error::{OctreeError, Result},
    shared::{PackedState, Particle, ParticleSet, STATE_STRIDE, SimulationSettings, Vec3},
    tree::{BoundingBox, Gravity, Octree, Placement},
};

/// Counters of the most recent step, for display next to the tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Two-body and point-mass evaluations across all particles.
    pub interactions: usize,
    /// Evaluations performed for the probe particle alone.
    pub probe_interactions: usize,
    pub inserted: usize,
    pub renegades: usize,
    /// Particles left out of the tree because they were outside the region.
    pub skipped: usize,
    pub theta: f64,
}

/// Rebuilds the octree over the current positions and evaluates the
/// gravitational acceleration of every particle.
///
/// A step runs in four phases: region scan, sequential insertion, sequential
/// mass aggregation, then a parallel force pass that only reads the tree.
#[derive(Clone, Debug)]
pub struct ForceField {
    settings: SimulationSettings,
    tree: Octree,
    stats: StepStats,
}

impl Default for ForceField {
    fn default() -> Self {
        Self::new(SimulationSettings::default())
    }
}

impl ForceField {
    pub fn new(settings: SimulationSettings) -> Self {
        let stats = StepStats {
            theta: settings.theta,
            ..StepStats::default()
        };
        Self {
            settings,
            tree: Octree::default(),
            stats,
        }
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SimulationSettings {
        &mut self.settings
    }

    pub fn theta(&self) -> f64 {
        self.settings.theta
    }

    pub fn set_theta(&mut self, theta: f64) {
        self.settings.theta = theta.max(0.0);
    }

    pub fn set_margin(&mut self, margin: f64) {
        self.settings.margin = margin;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.settings.verbose = verbose;
    }

    pub fn set_probe(&mut self, probe: Option<usize>) {
        self.settings.probe = probe;
    }

    pub fn tree(&self) -> &Octree {
        &self.tree
    }

    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Phases one to three: fit the region, insert every particle and
    /// aggregate masses. Particles outside the region are logged and skipped.
    pub fn rebuild<S: ParticleSet + ?Sized>(&mut self, particles: &S) -> &Octree {
        let region = BoundingBox::enclosing(particles, self.settings.margin)
            .unwrap_or_else(|| *self.tree.region());
        self.tree.reset(region);

        self.stats = StepStats {
            theta: self.settings.theta,
            ..StepStats::default()
        };

        for i in 0..particles.len() {
            match self.tree.insert(i, particles) {
                Ok(Placement::Tree) => self.stats.inserted += 1,
                Ok(Placement::Renegade) => self.stats.renegades += 1,
                Err(err) => {
                    log::warn!("{err} (skipped)");
                    self.stats.skipped += 1;
                }
            }
        }

        self.tree.compute_mass_distribution(particles);
        log::trace!(
            "rebuilt tree over {region}: {} placed, {} renegades, {} skipped",
            self.stats.inserted,
            self.stats.renegades,
            self.stats.skipped
        );
        if self.settings.verbose {
            log::debug!("tree dump\n{}", self.tree.dump());
        }

        &self.tree
    }

    /// Rebuilds the tree and writes the acceleration of particle `i` into
    /// `accelerations[i]`. Fails with `StateLayout` unless there is exactly
    /// one slot per particle.
    pub fn evaluate<S: ParticleSet + Sync + ?Sized>(
        &mut self,
        particles: &S,
        accelerations: &mut [Vec3],
    ) -> Result<()> {
        if particles.len() != accelerations.len() {
            return Err(OctreeError::StateLayout {
                reason: format!(
                    "{} acceleration slots for {} particles",
                    accelerations.len(),
                    particles.len()
                ),
            });
        }
        self.evaluate_into(particles, accelerations);
        Ok(())
    }

    fn evaluate_into<S: ParticleSet + Sync + ?Sized>(
        &mut self,
        particles: &S,
        accelerations: &mut [Vec3],
    ) {
        self.rebuild(particles);

        let gravity = Gravity::from_settings(&self.settings);
        let tree = &self.tree;
        self.stats.interactions = accelerations
            .par_iter_mut()
            .enumerate()
            .map(|(i, acc)| {
                let mut interactions = 0;
                *acc = tree.calc_force(i, particles, &gravity, &mut interactions);
                interactions
            })
            .sum();

        if let Some(probe) = self.settings.probe.filter(|&p| p < particles.len()) {
            self.stats.probe_interactions =
                self.tree.trace_openings(probe, particles, gravity.theta);
        }
    }

    pub fn accelerations<P: Particle + Sync>(&mut self, particles: &[P]) -> Vec<Vec3> {
        let mut accelerations = vec![Vec3::zeros(); particles.len()];
        self.evaluate_into(particles, &mut accelerations);
        accelerations
    }

    /// Evaluates and stores the result in each particle's acceleration.
    pub fn apply<P: Particle + Sync>(&mut self, particles: &mut [P]) {
        let accelerations = self.accelerations(particles);
        for (particle, acc) in particles.iter_mut().zip(accelerations) {
            *particle.acceleration_mut() = acc;
        }
    }

    /// Derivative of a packed state buffer: `[x, y, z, vx, vy, vz]` per
    /// particle in, `[vx, vy, vz, ax, ay, az]` per particle out.
    pub fn eval_packed(&mut self, state: &[f64], masses: &[f64], deriv: &mut [f64]) -> Result<()> {
        let packed = PackedState::new(state, masses)?;
        if deriv.len() != state.len() {
            return Err(OctreeError::StateLayout {
                reason: format!(
                    "derivative buffer holds {} values, state holds {}",
                    deriv.len(),
                    state.len()
                ),
            });
        }

        let mut accelerations = vec![Vec3::zeros(); packed.len()];
        self.evaluate_into(&packed, &mut accelerations);

        for (i, (out, acc)) in deriv
            .chunks_exact_mut(STATE_STRIDE)
            .zip(accelerations)
            .enumerate()
        {
            let v = packed.velocity(i);
            out.copy_from_slice(&[v.x, v.y, v.z, acc.x, acc.y, acc.z]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::PointParticle;

    #[test]
    fn empty_input_is_a_no_op() {
        let mut field = ForceField::default();
        let points: Vec<PointParticle> = Vec::new();
        assert!(field.accelerations(&points).is_empty());
        assert_eq!(field.stats().interactions, 0);
        assert!(field.tree().is_empty());
    }

    #[test]
    fn theta_is_clamped_and_reported() {
        let mut field = ForceField::default();
        field.set_theta(-1.0);
        assert_eq!(field.theta(), 0.0);

        field.set_theta(0.5);
        let points = vec![
            PointParticle::new(Vec3::new(1.0, 0.0, 0.0), Vec3::zeros(), 1.0),
            PointParticle::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::zeros(), 1.0),
        ];
        field.accelerations(&points);
        assert_eq!(field.stats().theta, 0.5);
        assert_eq!(field.stats().interactions, 2);
        assert_eq!(field.stats().probe_interactions, 1);
    }

    #[test]
    fn evaluate_needs_one_slot_per_particle() {
        let mut field = ForceField::default();
        let points = vec![
            PointParticle::new(Vec3::new(1.0, 0.0, 0.0), Vec3::zeros(), 1.0),
            PointParticle::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::zeros(), 1.0),
        ];
        let mut short = vec![Vec3::zeros(); 1];
        let err = field.evaluate(&points, &mut short).unwrap_err();
        assert!(matches!(err, OctreeError::StateLayout { .. }));
        assert_eq!(short[0], Vec3::zeros());

        let mut slots = vec![Vec3::zeros(); 2];
        field.evaluate(&points, &mut slots).unwrap();
        assert!(slots[0].x < 0.0 && slots[1].x > 0.0);
    }

    #[test]
    fn settings_changes_apply_to_the_next_step() {
        let points = vec![
            PointParticle::new(Vec3::new(1.0, 0.0, 0.0), Vec3::zeros(), 1.0),
            PointParticle::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::zeros(), 1.0),
        ];
        let mut field = ForceField::default();
        let before = field.accelerations(&points);

        field.settings_mut().g = 2.0;
        let after = field.accelerations(&points);
        assert!((after[0] - before[0] * 2.0).norm() < 1e-12);
    }

    #[test]
    fn packed_buffer_must_be_whole_records() {
        let mut field = ForceField::default();
        let state = [0.0; 7];
        let mut deriv = [0.0; 7];
        let err = field.eval_packed(&state, &[1.0], &mut deriv).unwrap_err();
        assert!(matches!(err, OctreeError::StateLayout { .. }));

        let state = [0.0; 12];
        let mut deriv = [0.0; 12];
        let err = field.eval_packed(&state, &[1.0], &mut deriv).unwrap_err();
        assert!(matches!(err, OctreeError::StateLayout { .. }));
    }
}
