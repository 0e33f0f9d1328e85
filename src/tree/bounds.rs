use std::fmt;

use crate::{
    error::{OctreeError, Result},
    shared::{ParticleSet, Vec3},
};

/// One eighth of a region, named by the side of the center it lies on:
/// south/north along y, west/east along x, down/up along z.
///
/// The discriminant is the child slot: bit 0 set for east, bit 1 for north,
/// bit 2 for up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Octant {
    SouthWestDown = 0,
    SouthEastDown = 1,
    NorthWestDown = 2,
    NorthEastDown = 3,
    SouthWestUp = 4,
    SouthEastUp = 5,
    NorthWestUp = 6,
    NorthEastUp = 7,
}

impl Octant {
    pub const ALL: [Octant; 8] = [
        Octant::SouthWestDown,
        Octant::SouthEastDown,
        Octant::NorthWestDown,
        Octant::NorthEastDown,
        Octant::SouthWestUp,
        Octant::SouthEastUp,
        Octant::NorthWestUp,
        Octant::NorthEastUp,
    ];

    pub fn from_index(index: usize) -> Octant {
        Self::ALL[index & 7]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_east(self) -> bool {
        self.index() & 1 != 0
    }

    pub fn is_north(self) -> bool {
        self.index() & 2 != 0
    }

    pub fn is_up(self) -> bool {
        self.index() & 4 != 0
    }
}

/// Axis-aligned box spanned by two opposite corners.
///
/// Regions built by [`BoundingBox::cube`] and [`BoundingBox::enclosing`] are
/// cubes, which the opening-angle test relies on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    corner_min: Vec3,
    corner_max: Vec3,
}

impl BoundingBox {
    /// Box from two corners. Each axis of `corner_min` must not exceed `corner_max`.
    pub fn new(corner_min: Vec3, corner_max: Vec3) -> Self {
        debug_assert!(
            (0..3).all(|i| corner_min[i] <= corner_max[i]),
            "inverted corners {corner_min:?} / {corner_max:?}"
        );
        Self {
            corner_min,
            corner_max,
        }
    }

    pub fn cube(center: Vec3, half_extent: f64) -> Self {
        let half = Vec3::repeat(half_extent);
        Self::new(center - half, center + half)
    }

    /// Smallest cube around every finite position in `particles`, centered on
    /// their mass-weighted centroid and scaled by `margin` (clamped to at least 1).
    /// The cube always contains every finite position, even at a margin of 1.
    ///
    /// Falls back to the geometric midpoint when the total mass is zero and to
    /// a unit half extent when all positions coincide. Returns `None` when no
    /// position is finite.
    pub fn enclosing<S: ParticleSet + ?Sized>(particles: &S, margin: f64) -> Option<Self> {
        let mut lo = Vec3::repeat(f64::INFINITY);
        let mut hi = Vec3::repeat(f64::NEG_INFINITY);
        let mut weighted = Vec3::zeros();
        let mut total_mass = 0.0;
        let mut found = false;

        for i in 0..particles.len() {
            let p = particles.position(i);
            if !p.iter().all(|c| c.is_finite()) {
                continue;
            }
            found = true;
            lo = lo.inf(&p);
            hi = hi.sup(&p);
            let m = particles.mass(i);
            weighted += p.scale(m);
            total_mass += m;
        }

        if !found {
            return None;
        }

        let center = if total_mass > 0.0 {
            weighted / total_mass
        } else {
            (lo + hi) * 0.5
        };
        let reach = (hi - center).sup(&(center - lo)).max();
        let mut half_extent = if reach > 0.0 {
            reach * margin.max(1.0)
        } else {
            1.0
        };

        // center ± half_extent may round inwards past the extreme positions
        let mut region = Self::cube(center, half_extent);
        while !(region.contains(&lo) && region.contains(&hi)) {
            half_extent += (center.amax() + half_extent) * f64::EPSILON;
            region = Self::cube(center, half_extent);
        }
        Some(region)
    }

    pub fn min(&self) -> &Vec3 {
        &self.corner_min
    }

    pub fn max(&self) -> &Vec3 {
        &self.corner_max
    }

    pub fn center(&self) -> Vec3 {
        self.corner_min + (self.corner_max - self.corner_min) * 0.5
    }

    /// Edge length along x, which is the edge length of a cube.
    pub fn side(&self) -> f64 {
        self.corner_max.x - self.corner_min.x
    }

    /// Inclusive on every face.
    pub fn contains(&self, point: &Vec3) -> bool {
        (0..3).all(|i| point[i] >= self.corner_min[i] && point[i] <= self.corner_max[i])
    }

    /// Octant of `point`. A coordinate equal to the center goes to the lower half.
    pub fn octant_for(&self, index: usize, point: &Vec3) -> Result<Octant> {
        if !self.contains(point) {
            return Err(OctreeError::OutOfBounds {
                index,
                position: *point,
                region: *self,
            });
        }

        let center = self.center();
        let mut slot = 0;
        if point.x > center.x {
            slot |= 1;
        }
        if point.y > center.y {
            slot |= 2;
        }
        if point.z > center.z {
            slot |= 4;
        }
        Ok(Octant::from_index(slot))
    }

    pub fn split(&self, octant: Octant) -> BoundingBox {
        let center = self.center();
        let pick = |upper: bool, axis: usize| {
            if upper {
                (center[axis], self.corner_max[axis])
            } else {
                (self.corner_min[axis], center[axis])
            }
        };
        let (x0, x1) = pick(octant.is_east(), 0);
        let (y0, y1) = pick(octant.is_north(), 1);
        let (z0, z1) = pick(octant.is_up(), 2);
        BoundingBox::new(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {}, {}) .. ({}, {}, {})]",
            self.corner_min.x,
            self.corner_min.y,
            self.corner_min.z,
            self.corner_max.x,
            self.corner_max.y,
            self.corner_max.z
        )
    }
}
