use std::f64::consts::PI;

use jetfind_cluster::{
    Algorithm, ConeOptions, DEFAULT_MIN_CELL_ENERGY, EnergyGrid, KtOptions,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Spray `energy` over a handful of constituents around `(rapidity, azimuth)`:
/// exponentially falling energy fractions, Gaussian-ish radial spread.
fn fragment(grid: &mut EnergyGrid, rng: &mut StdRng, rapidity: f64, azimuth: f64, energy: f64) {
    let count = ((energy / 2.0) as usize).max(5);
    let fractions: Vec<f64> = (0..count)
        .map(|i| (-0.3 * i as f64).exp() * rng.gen_range(0.8..1.2))
        .collect();
    let norm: f64 = fractions.iter().sum();

    for f in fractions {
        let e = energy * f / norm;
        if e <= DEFAULT_MIN_CELL_ENERGY {
            continue;
        }
        let u: f64 = rng.gen_range(f64::EPSILON..1.0);
        let dr = (-2.0 * u.ln()).sqrt() * 0.3;
        let angle = rng.gen_range(0.0..2.0 * PI);
        grid.deposit(rapidity + dr * angle.cos(), azimuth + dr * angle.sin(), e);
    }
}

fn main() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut grid = EnergyGrid::new(20, 20)?;

    for _ in 0..3 {
        let energy = rng.gen_range(50.0..150.0);
        let rapidity = rng.gen_range(-3.0..3.0);
        let azimuth = rng.gen_range(-PI..PI);
        println!("generated jet: E={energy:.1} y={rapidity:.3} phi={azimuth:.3}");
        fragment(&mut grid, &mut rng, rapidity, azimuth, energy);
    }

    let particles = grid.to_particles(DEFAULT_MIN_CELL_ENERGY);
    println!("{} particles, {:.1} GeV on the grid", particles.len(), grid.total_energy());

    let algorithms = [
        ("cone", Algorithm::Cone(ConeOptions::default())),
        ("kT", Algorithm::Kt(KtOptions::default())),
    ];
    for (name, algorithm) in algorithms {
        let result = algorithm.cluster(&particles)?;
        println!(">{name} (R = {})", result.radius);
        for (i, jet) in result.jets.iter().enumerate() {
            println!(
                "  J{}: E={:.2} y={:.3} phi={:.3} ({} particles)",
                i + 1,
                jet.energy(),
                jet.rapidity(),
                jet.azimuth(),
                jet.len()
            );
        }
    }
    Ok(())
}
