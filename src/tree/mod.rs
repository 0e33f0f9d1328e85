//! Barnes-Hut octree.
//!
//! [`Octree`] owns the root [`OctreeNode`] and the [`RenegadeList`]. Root-only
//! operations such as [`Octree::reset`] exist only here, so inner nodes can
//! never be re-anchored.

mod bounds;
mod iter;
mod node;
mod renegade;

pub use bounds::*;
pub use iter::*;
pub use node::*;
pub use renegade::*;

use crate::{
    error::Result,
    shared::{ParticleSet, SimulationSettings, Vec3},
};

/// Physical constants of one evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gravity {
    pub g: f64,
    pub softening: f64,
    pub theta: f64,
}

impl Gravity {
    pub fn from_settings(settings: &SimulationSettings) -> Self {
        Self {
            g: settings.g,
            softening: settings.softening,
            theta: settings.theta,
        }
    }

    /// Acceleration of particle `target` due to particle `source`.
    ///
    /// Softening is added to the squared distance under the root. A particle
    /// exerts nothing on itself, which is decided by index and not by distance.
    pub fn calc_acc<S: ParticleSet + ?Sized>(
        &self,
        target: usize,
        source: usize,
        particles: &S,
    ) -> Vec3 {
        if target == source {
            return Vec3::zeros();
        }
        let r = particles.position(source) - particles.position(target);
        let dist = (r.norm_squared() + self.softening).sqrt();
        if dist > 0.0 {
            r * (self.g * particles.mass(source) / (dist * dist * dist))
        } else {
            Vec3::zeros()
        }
    }

    /// Unsoftened acceleration towards a point mass. Zero at zero distance.
    pub fn point_mass(&self, position: &Vec3, center_of_mass: &Vec3, mass: f64) -> Vec3 {
        let r = center_of_mass - position;
        let d = r.norm();
        if d > 0.0 {
            r * (self.g * mass / (d * d * d))
        } else {
            Vec3::zeros()
        }
    }
}

#[derive(Clone, Debug)]
pub struct Octree {
    root: OctreeNode,
    renegades: RenegadeList,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new(BoundingBox::cube(Vec3::zeros(), 1.0))
    }
}

impl Octree {
    pub fn new(region: BoundingBox) -> Self {
        Self {
            root: OctreeNode::new(region, 0),
            renegades: RenegadeList::new(),
        }
    }

    /// Drops every node and renegade and re-anchors the empty root at `region`.
    pub fn reset(&mut self, region: BoundingBox) {
        self.root.reset(region);
        self.renegades.clear();
    }

    /// Inserts particle `index`. Fails with `OutOfBounds`, leaving the tree
    /// untouched, when the particle lies outside the root region.
    pub fn insert<S: ParticleSet + ?Sized>(
        &mut self,
        index: usize,
        particles: &S,
    ) -> Result<Placement> {
        self.root.insert(index, particles, &mut self.renegades)
    }

    pub fn compute_mass_distribution<S: ParticleSet + ?Sized>(&mut self, particles: &S) {
        self.root.compute_mass_distribution(particles);
    }

    /// Total acceleration on particle `target`: the tree walk plus an exact
    /// sum over the renegades. `interactions` is increased by the number of
    /// two-body evaluations performed.
    pub fn calc_force<S: ParticleSet + ?Sized>(
        &self,
        target: usize,
        particles: &S,
        gravity: &Gravity,
        interactions: &mut usize,
    ) -> Vec3 {
        self.calc_tree_force(target, particles, gravity, interactions)
            + self
                .renegades
                .calc_force(target, particles, gravity, interactions)
    }

    pub fn calc_tree_force<S: ParticleSet + ?Sized>(
        &self,
        target: usize,
        particles: &S,
        gravity: &Gravity,
        interactions: &mut usize,
    ) -> Vec3 {
        let position = particles.position(target);
        self.root
            .calc_tree_force(target, &position, particles, gravity, interactions)
    }

    /// Clears every `was_approximated` flag.
    pub fn stat_reset(&mut self) {
        self.root.clear_flags();
    }

    /// Replays the walk for particle `target` and marks which nodes it
    /// approximated. Returns the interactions the full evaluation of that
    /// particle performs, renegades included.
    pub fn trace_openings<S: ParticleSet + ?Sized>(
        &mut self,
        target: usize,
        particles: &S,
        theta: f64,
    ) -> usize {
        self.stat_reset();
        let position = particles.position(target);
        let tree = self.root.trace_openings(target, &position, theta);
        tree + self.renegades.iter().filter(|&r| r != target).count()
    }

    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    pub fn renegades(&self) -> &RenegadeList {
        &self.renegades
    }

    pub fn region(&self) -> &BoundingBox {
        self.root.region()
    }

    /// Center of mass of the particles placed in the tree.
    pub fn center_of_mass(&self) -> &Vec3 {
        self.root.center_of_mass()
    }

    /// Particles inserted so far, renegades included.
    pub fn len(&self) -> usize {
        self.root.particle_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> NodeIter<'_> {
        self.root.iter()
    }

    /// Indented listing of every node with its count, mass and center of mass.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.root.dump(&mut out, None);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Particle, PointParticle};

    fn particle(x: f64, y: f64, z: f64, mass: f64) -> PointParticle {
        PointParticle::new(Vec3::new(x, y, z), Vec3::zeros(), mass)
    }

    fn build(points: &[PointParticle], half: f64) -> Octree {
        let mut tree = Octree::new(BoundingBox::cube(Vec3::zeros(), half));
        for i in 0..points.len() {
            tree.insert(i, points).unwrap();
        }
        tree.compute_mass_distribution(points);
        tree
    }

    #[test]
    fn single_particle_is_a_root_leaf() {
        let points = vec![particle(0.25, 0.5, -0.5, 3.0)];
        let tree = build(&points, 1.0);
        assert!(tree.root().is_leaf());
        assert!(tree.root().is_external());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().mass(), 3.0);
        assert_eq!(*tree.center_of_mass(), Vec3::new(0.25, 0.5, -0.5));
    }

    #[test]
    fn second_particle_subdivides() {
        let points = vec![particle(0.5, 0.5, 0.5, 1.0), particle(-0.5, -0.5, -0.5, 3.0)];
        let tree = build(&points, 1.0);
        let root = tree.root();
        assert!(!root.is_leaf());
        assert_eq!(root.particle_count(), 2);
        assert_eq!(root.children().count(), 2);
        assert_eq!(root.child(Octant::NorthEastUp).unwrap().occupant(), Some(0));
        assert_eq!(root.child(Octant::SouthWestDown).unwrap().occupant(), Some(1));
        assert_eq!(root.mass(), 4.0);
        assert_eq!(*root.center_of_mass(), Vec3::new(-0.25, -0.25, -0.25));
    }

    #[test]
    fn shared_octant_nests_deeper() {
        let points = vec![particle(0.9, 0.9, 0.9, 1.0), particle(0.4, 0.4, 0.4, 1.0)];
        let tree = build(&points, 1.0);
        let ne = tree.root().child(Octant::NorthEastUp).unwrap();
        assert_eq!(ne.depth(), 1);
        assert_eq!(ne.particle_count(), 2);
        assert_eq!(ne.child(Octant::NorthEastUp).unwrap().occupant(), Some(0));
        assert_eq!(ne.child(Octant::SouthWestDown).unwrap().occupant(), Some(1));
        assert_eq!(tree.iter().map(|(depth, _)| depth).max(), Some(2));
    }

    #[test]
    fn reset_clears_nodes_and_renegades() {
        let points = vec![
            particle(0.5, 0.5, 0.5, 1.0),
            particle(0.5, 0.5, 0.5, 1.0),
            particle(-0.5, 0.5, 0.5, 1.0),
        ];
        let mut tree = build(&points, 1.0);
        assert_eq!(tree.renegades().len(), 1);

        tree.reset(BoundingBox::cube(Vec3::new(1.0, 1.0, 1.0), 4.0));
        assert!(tree.is_empty());
        assert!(tree.renegades().is_empty());
        assert!(tree.root().is_external());
        assert_eq!(tree.region().center(), Vec3::new(1.0, 1.0, 1.0));
        assert!(tree.root().is_root());
    }

    #[test]
    fn empty_tree_exerts_nothing() {
        let points = vec![particle(0.0, 0.0, 0.0, 1.0)];
        let mut tree = Octree::default();
        tree.compute_mass_distribution(&points);
        assert_eq!(*tree.center_of_mass(), Vec3::zeros());

        let gravity = Gravity {
            g: 1.0,
            softening: 0.0,
            theta: 0.5,
        };
        let mut n = 0;
        assert_eq!(tree.calc_force(0, &points, &gravity, &mut n), Vec3::zeros());
        assert_eq!(n, 0);
    }

    #[test]
    fn self_interaction_is_zero_even_when_softened() {
        let points = vec![particle(0.0, 0.0, 0.0, 1.0)];
        let gravity = Gravity {
            g: 1.0,
            softening: 0.01,
            theta: 0.5,
        };
        assert_eq!(gravity.calc_acc(0, 0, &points), Vec3::zeros());
    }

    #[test]
    fn distant_node_is_approximated_and_flagged() {
        let points = vec![
            particle(9.0, 9.0, 9.0, 1.0),
            particle(9.5, 9.5, 9.5, 1.0),
            particle(-9.0, -9.0, -9.0, 1.0),
        ];
        let mut tree = build(&points, 10.0);
        let gravity = Gravity {
            g: 1.0,
            softening: 0.0,
            theta: 0.9,
        };

        let mut n = 0;
        let acc = tree.calc_force(2, &points, &gravity, &mut n);
        // the north-east-up octant (side 10, about 31 away) stands in for both particles
        assert_eq!(n, 1);
        assert!(acc.x > 0.0 && acc.y > 0.0 && acc.z > 0.0);

        assert_eq!(tree.trace_openings(2, &points, gravity.theta), 1);
        assert!(!tree.root().was_approximated());
        assert!(tree.root().child(Octant::NorthEastUp).unwrap().was_approximated());

        tree.stat_reset();
        assert!(tree.iter().all(|(_, node)| !node.was_approximated()));
    }

    #[test]
    fn dump_lists_every_node() {
        let points = vec![particle(0.5, 0.5, 0.5, 1.0), particle(-0.5, -0.5, -0.5, 1.0)];
        let tree = build(&points, 1.0);
        let dump = tree.dump();
        assert_eq!(dump.lines().count(), 3);
        assert!(dump.starts_with("Root: (num=2; mass=2;"));
        assert!(dump.contains("  NorthEastUp: (num=1; mass=1;"));
    }
}
