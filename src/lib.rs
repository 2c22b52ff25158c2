//! Jet clustering engine for energy deposits on a (rapidity, azimuth) plane.
//!
//! - Input: particles with rapidity, azimuth, energy and a stable source id.
//! - Seeded cone: iterate a cone of radius R from each seed to a fixed point,
//!   then settle shared constituents with split/merge.
//! - Sequential kT recombination: greedily merge the closest pair under the
//!   kT distance, retiring clusters to the beam.
//! - Azimuth is periodic; every distance and centroid respects the ±π cut.
//!
//! Runs are pure functions of their input: no global state, no I/O.

pub mod angular;
pub mod cone;
pub mod error;
pub mod grid;
pub mod kt;
pub mod overlap;
pub mod particle;


use serde::{Deserialize, Serialize};

pub use angular::{EnergyCentroid, angular_distance, delta_azimuth, normalize_azimuth};
pub use cone::{ConeOptions, SeededConeClusterer};
pub use error::{JetError, JetResult};
pub use grid::{DEFAULT_MIN_CELL_ENERGY, EnergyGrid};
pub use kt::{KtOptions, RecombinationResult, SequentialRecombiner};
pub use overlap::{OverlapOptions, OverlapResolver, shared_energy_fraction};
pub use particle::{Jet, Particle, ProtoJet, SourceId};

/// Seeded cone search without overlap resolution.
pub fn run_seeded_cone(
    particles: &[Particle],
    radius: f64,
    seed_threshold: f64,
    max_iterations: usize,
    convergence_tolerance: f64,
) -> JetResult<Vec<ProtoJet>> {
    let options = ConeOptions {
        radius,
        seed_threshold,
        max_iterations,
        convergence_tolerance,
        ..ConeOptions::default()
    };
    SeededConeClusterer::new(particles, options).run()
}

/// Split/merge proto-jets built with cone radius `radius`.
pub fn resolve_overlaps(proto_jets: Vec<ProtoJet>, radius: f64) -> JetResult<Vec<Jet>> {
    let options = OverlapOptions {
        radius,
        ..OverlapOptions::default()
    };
    OverlapResolver::new(options).resolve(proto_jets)
}

/// kT recombination, keeping jets with pt >= `pt_cut`.
pub fn run_sequential_recombination(
    particles: &[Particle],
    radius: f64,
    pt_cut: f64,
) -> JetResult<Vec<Jet>> {
    SequentialRecombiner::new(particles, KtOptions { radius, pt_cut }).run()
}

/// Jet algorithm selected by the caller, loadable from configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Algorithm {
    Cone(ConeOptions),
    Kt(KtOptions),
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Cone(ConeOptions::default())
    }
}

impl Algorithm {
    pub fn radius(&self) -> f64 {
        match self {
            Algorithm::Cone(o) => o.radius,
            Algorithm::Kt(o) => o.radius,
        }
    }

    /// Run the selected algorithm end to end.
    pub fn cluster(&self, particles: &[Particle]) -> JetResult<ClusterResult> {
        let jets = match self {
            Algorithm::Cone(o) => SeededConeClusterer::new(particles, o.clone()).find_jets()?,
            Algorithm::Kt(o) => SequentialRecombiner::new(particles, o.clone()).run()?,
        };
        Ok(ClusterResult {
            jets,
            radius: self.radius(),
        })
    }
}

/// Final jets plus the radius they were found with, for drawing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClusterResult {
    /// Jets by descending energy.
    pub jets: Vec<Jet>,
    pub radius: f64,
}
