use crate::shared::{ParticleSet, Vec3};

use super::Gravity;

/// Particles that could not be given a leaf of their own, by index.
///
/// Filled during insertion, cleared when the tree is reset. Their pull on
/// other particles, and the tree's pull on them, is summed exactly.
#[derive(Clone, Debug, Default)]
pub struct RenegadeList {
    indices: Vec<usize>,
}

impl RenegadeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize) {
        self.indices.push(index);
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Brute-force acceleration on particle `target` from every renegade.
    pub fn calc_force<S: ParticleSet + ?Sized>(
        &self,
        target: usize,
        particles: &S,
        gravity: &Gravity,
        interactions: &mut usize,
    ) -> Vec3 {
        self.indices
            .iter()
            .filter(|&&r| r != target)
            .map(|&r| {
                *interactions += 1;
                gravity.calc_acc(target, r, particles)
            })
            .fold(Vec3::zeros(), |acc, a| acc + a)
    }
}
