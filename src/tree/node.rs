use crate::{
    error::{OctreeError, Result},
    shared::{ParticleSet, Vec3},
};

use super::{BoundingBox, Gravity, NodeIter, Octant, RenegadeList};

/// Depth at which a leaf stops subdividing. A further distinct particle that
/// reaches a leaf this deep is sent to the renegade list instead.
pub const MAX_DEPTH: usize = 64;

/// Where an inserted particle ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Tree,
    Renegade,
}

/// One cubic region of the octree.
///
/// A node is empty, a leaf holding a single particle index, or internal with
/// a child for every octant that holds particles. Mass and center of mass are
/// only meaningful after [`super::Octree::compute_mass_distribution`].
#[derive(Clone, Debug)]
pub struct OctreeNode {
    region: BoundingBox,
    center: Vec3,
    children: [Option<Box<OctreeNode>>; 8],
    occupant: Option<usize>,
    particle_count: usize,
    mass: f64,
    center_of_mass: Vec3,
    was_approximated: bool,
    depth: usize,
}

impl OctreeNode {
    pub(super) fn new(region: BoundingBox, depth: usize) -> Self {
        let center = region.center();
        Self {
            region,
            center,
            children: Default::default(),
            occupant: None,
            particle_count: 0,
            mass: 0.0,
            center_of_mass: center,
            was_approximated: false,
            depth,
        }
    }

    pub fn region(&self) -> &BoundingBox {
        &self.region
    }

    pub fn center(&self) -> &Vec3 {
        &self.center
    }

    pub fn center_of_mass(&self) -> &Vec3 {
        &self.center_of_mass
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Particles inserted through this node, including those diverted to the
    /// renegade list below it.
    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Index of the resident particle if this is a leaf.
    pub fn occupant(&self) -> Option<usize> {
        self.occupant
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub fn is_leaf(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn is_external(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Whether the probe particle's last traced walk treated this node as one mass.
    pub fn was_approximated(&self) -> bool {
        self.was_approximated
    }

    pub fn child(&self, octant: Octant) -> Option<&OctreeNode> {
        self.children[octant.index()].as_deref()
    }

    pub fn children(&self) -> impl Iterator<Item = (Octant, &OctreeNode)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_deref().map(|c| (Octant::from_index(i), c)))
    }

    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter::new(self)
    }

    pub(super) fn reset(&mut self, region: BoundingBox) {
        *self = Self::new(region, self.depth);
    }

    pub(super) fn insert<S: ParticleSet + ?Sized>(
        &mut self,
        index: usize,
        particles: &S,
        renegades: &mut RenegadeList,
    ) -> Result<Placement> {
        let position = particles.position(index);
        if !self.region.contains(&position) {
            return Err(OctreeError::OutOfBounds {
                index,
                position,
                region: self.region,
            });
        }

        let occupant = self.occupant;
        let placement = match occupant {
            Some(resident) => {
                let resident_position = particles.position(resident);
                if resident_position == position || self.depth >= MAX_DEPTH {
                    log::trace!(
                        "particle {index} cannot be separated from {resident} at depth {}",
                        self.depth
                    );
                    renegades.push(index);
                    Placement::Renegade
                } else {
                    self.occupant = None;
                    self.insert_into_child(resident, &resident_position, particles, renegades)?;
                    self.insert_into_child(index, &position, particles, renegades)?
                }
            }
            None if self.is_external() => {
                self.occupant = Some(index);
                Placement::Tree
            }
            None => self.insert_into_child(index, &position, particles, renegades)?,
        };

        self.particle_count += 1;
        Ok(placement)
    }

    fn insert_into_child<S: ParticleSet + ?Sized>(
        &mut self,
        index: usize,
        position: &Vec3,
        particles: &S,
        renegades: &mut RenegadeList,
    ) -> Result<Placement> {
        let octant = self.region.octant_for(index, position)?;
        let depth = self.depth + 1;
        let region = &self.region;
        let child = self.children[octant.index()]
            .get_or_insert_with(|| Box::new(OctreeNode::new(region.split(octant), depth)));
        child.insert(index, particles, renegades)
    }

    pub(super) fn compute_mass_distribution<S: ParticleSet + ?Sized>(&mut self, particles: &S) {
        if let Some(resident) = self.occupant {
            self.mass = particles.mass(resident);
            self.center_of_mass = particles.position(resident);
            return;
        }

        let mut mass = 0.0;
        let mut weighted = Vec3::zeros();
        for child in self.children.iter_mut().flatten() {
            child.compute_mass_distribution(particles);
            mass += child.mass;
            weighted += child.center_of_mass.scale(child.mass);
        }

        self.mass = mass;
        self.center_of_mass = if mass != 0.0 {
            weighted / mass
        } else {
            self.center
        };
    }

    /// Whether this node may stand in for its whole subtree as seen from
    /// `position`. Zero distance to the center of mass always opens the node.
    fn can_approximate(&self, position: &Vec3, theta: f64) -> bool {
        let d = (self.center_of_mass - position).norm();
        d > 0.0 && self.region.side() / d <= theta
    }

    pub(super) fn calc_tree_force<S: ParticleSet + ?Sized>(
        &self,
        target: usize,
        position: &Vec3,
        particles: &S,
        gravity: &Gravity,
        interactions: &mut usize,
    ) -> Vec3 {
        if let Some(resident) = self.occupant {
            if resident == target {
                return Vec3::zeros();
            }
            *interactions += 1;
            return gravity.calc_acc(target, resident, particles);
        }

        if self.is_external() {
            return Vec3::zeros();
        }

        if self.can_approximate(position, gravity.theta) {
            *interactions += 1;
            return gravity.point_mass(position, &self.center_of_mass, self.mass);
        }

        self.children
            .iter()
            .flatten()
            .map(|c| c.calc_tree_force(target, position, particles, gravity, interactions))
            .fold(Vec3::zeros(), |acc, f| acc + f)
    }

    pub(super) fn clear_flags(&mut self) {
        self.was_approximated = false;
        for child in self.children.iter_mut().flatten() {
            child.clear_flags();
        }
    }

    /// Repeats the walk of [`Self::calc_tree_force`] for one particle,
    /// recording on each visited internal node whether it was approximated.
    /// Returns the number of interactions the walk performs.
    pub(super) fn trace_openings(&mut self, target: usize, position: &Vec3, theta: f64) -> usize {
        if let Some(resident) = self.occupant {
            return usize::from(resident != target);
        }
        if self.is_external() {
            return 0;
        }

        self.was_approximated = self.can_approximate(position, theta);
        if self.was_approximated {
            return 1;
        }

        self.children
            .iter_mut()
            .flatten()
            .map(|c| c.trace_openings(target, position, theta))
            .sum()
    }

    pub(super) fn dump(&self, out: &mut String, octant: Option<Octant>) {
        let indent = "  ".repeat(self.depth);
        let label = match octant {
            Some(octant) => format!("{octant:?}"),
            None => "Root".to_string(),
        };
        out.push_str(&format!(
            "{indent}{label}: (num={}; mass={}; cx={}; cy={}; cz={})\n",
            self.particle_count,
            self.mass,
            self.center_of_mass.x,
            self.center_of_mass.y,
            self.center_of_mass.z
        ));
        for (octant, child) in self.children() {
            child.dump(out, Some(octant));
        }
    }
}
