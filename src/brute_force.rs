use crate::{
    shared::{ParticleSet, Vec3},
    tree::Gravity,
};

/// Exact O(N²) accelerations with the same softened kernel the tree uses
/// for leaves and renegades. Reference for checking the approximation.
pub fn brute_force_accelerations<S: ParticleSet + ?Sized>(
    particles: &S,
    gravity: &Gravity,
) -> Vec<Vec3> {
    let n = particles.len();
    let mut accelerations = vec![Vec3::zeros(); n];

    for i in 0..n {
        for j in 0..i {
            let r = particles.position(i) - particles.position(j);
            let r_dist = (r.norm_squared() + gravity.softening).sqrt();
            if r_dist == 0.0 {
                continue;
            }
            let r_cubed = r_dist * r_dist * r_dist;
            let force = gravity.g / r_cubed;
            accelerations[i] -= r * (force * particles.mass(j));
            accelerations[j] += r * (force * particles.mass(i));
        }
    }

    accelerations
}

/// Largest `|approx - exact| / |exact|` over all particles, skipping
/// particles whose exact acceleration vanishes.
pub fn max_relative_error(approx: &[Vec3], exact: &[Vec3]) -> f64 {
    approx
        .iter()
        .zip(exact)
        .filter(|(_, e)| e.norm() > 0.0)
        .map(|(a, e)| (a - e).norm() / e.norm())
        .fold(0.0, f64::max)
}
