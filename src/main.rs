use std::time::Instant;

use bhlib::{
    brute_force::{brute_force_accelerations, max_relative_error},
    shared::{LeapFrogIntegrator, Particle, PointParticle, SimulationSettings, Vec3},
    simulation::{Simulation, orbital_velocity},
    tree::Gravity,
};
use clap::{Parser, ValueEnum};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// Uniform random cloud in a unit cube.
    Cloud,
    /// Light body on a circular orbit around a heavy one.
    Orbit,
}

#[derive(Parser, Debug)]
#[command(about = "Barnes-Hut octree gravity")]
struct Args {
    #[arg(long, value_enum, default_value = "cloud")]
    scenario: Scenario,

    /// Number of particles in the cloud.
    #[arg(short = 'n', long, default_value_t = 1000)]
    particles: usize,

    #[arg(long, default_value_t = 100)]
    steps: usize,

    #[arg(long, default_value_t = 0.001)]
    dt: f64,

    /// Opening angle.
    #[arg(long, default_value_t = 0.9)]
    theta: f64,

    #[arg(long, default_value_t = 0.01)]
    softening: f64,

    #[arg(long, default_value_t = 1.0)]
    g: f64,

    /// Scale of the region around the particles.
    #[arg(long, default_value_t = 1.05)]
    margin: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Worker threads for the force pass, 0 for one per core.
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Dump the tree after every rebuild (shown with RUST_LOG=debug).
    #[arg(long)]
    dump_tree: bool,

    /// Compare the first evaluation against the exact O(N²) sum.
    #[arg(long)]
    check: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn cloud(n: usize, seed: u64) -> Vec<PointParticle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let position = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            PointParticle::new(position, Vec3::zeros(), rng.random_range(0.5..1.5) / n as f64)
        })
        .collect()
}

fn orbit(g: f64) -> Vec<PointParticle> {
    let v = orbital_velocity(g, 1.0, 1.0);
    vec![
        PointParticle::new(Vec3::zeros(), Vec3::zeros(), 1.0),
        PointParticle::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, v, 0.0), 1e-6),
    ]
}

fn main() {
    init_logger();
    let args = Args::parse();

    if args.threads > 0 {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
        {
            log::warn!("could not size the thread pool: {err}");
        }
    }

    let settings = SimulationSettings::default()
        .with_g(args.g)
        .with_theta(args.theta)
        .with_softening(args.softening)
        .with_margin(args.margin)
        .with_verbose(args.dump_tree);

    let points = match args.scenario {
        Scenario::Cloud => cloud(args.particles, args.seed),
        Scenario::Orbit => orbit(args.g),
    };
    log::info!("{:?} with {} particles", args.scenario, points.len());

    let mut sim = Simulation::new(points, LeapFrogIntegrator::new(), settings.clone());
    sim.init();

    if args.check {
        let exact = brute_force_accelerations(sim.get_points(), &Gravity::from_settings(&settings));
        let approx: Vec<Vec3> = sim.get_points().iter().map(|p| *p.acceleration()).collect();
        log::info!(
            "max relative error against direct sum: {:.3e}",
            max_relative_error(&approx, &exact)
        );
    }

    let start = Instant::now();
    for _ in 0..args.steps {
        sim.step_by(args.dt);
    }
    let elapsed = start.elapsed();

    let stats = sim.field().stats();
    log::info!(
        "theta {}: {} interactions, probe {} | placed {}, renegades {}, skipped {}",
        stats.theta,
        stats.interactions,
        stats.probe_interactions,
        stats.inserted,
        stats.renegades,
        stats.skipped
    );
    let com = sim.field().tree().center_of_mass();
    log::info!("center of mass ({:.6}, {:.6}, {:.6})", com.x, com.y, com.z);
    println!(
        "Elapsed: {:?} for {} steps (t = {})",
        elapsed,
        args.steps,
        sim.elapsed()
    );
}
