use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::angular::{EnergyCentroid, delta_azimuth};
use crate::error::{JetError, JetResult, ensure_non_negative, ensure_positive};
use crate::overlap::{OverlapOptions, OverlapResolver};
use crate::particle::{Jet, Particle, ProtoJet, SourceId, sort_by_energy_desc, validate_particles};

/// Options controlling the seeded cone search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConeOptions {
    /// Cone radius R in (rapidity, azimuth) units.
    pub radius: f64, // e.g., 0.8

    /// Particles with at least this energy start a cone search.
    pub seed_threshold: f64, // e.g., 10.0

    /// Upper bound on axis updates per seed.
    pub max_iterations: usize,

    /// The axis is settled once both its rapidity and azimuth move by less than this.
    pub convergence_tolerance: f64,

    /// If true, `find_jets` runs split/merge on the proto-jets.
    /// If false, every proto-jet is promoted to a jet as-is.
    pub resolve_overlaps: bool,

    /// If enabled (feature `parallel`), search independent seeds in parallel.
    pub parallel_seeds: bool,
}

impl Default for ConeOptions {
    fn default() -> Self {
        Self {
            radius: 0.8,
            seed_threshold: 10.0,
            max_iterations: 100,
            convergence_tolerance: 0.01,
            resolve_overlaps: true,
            parallel_seeds: false,
        }
    }
}

impl ConeOptions {
    pub fn validate(&self) -> JetResult<()> {
        ensure_positive("cone radius", self.radius)?;
        ensure_non_negative("seed threshold", self.seed_threshold)?;
        ensure_positive("convergence tolerance", self.convergence_tolerance)?;
        if self.max_iterations == 0 {
            return Err(JetError::InvalidParameter(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Iterative seeded cone clusterer.
///
/// Particles stay in the pool for every seed, so proto-jets from nearby seeds
/// may share constituents. Sharing is settled afterwards by
/// [`OverlapResolver`].
pub struct SeededConeClusterer<'a> {
    pub particles: &'a [Particle],
    pub options: ConeOptions,
}

impl<'a> SeededConeClusterer<'a> {
    pub fn new(particles: &'a [Particle], options: ConeOptions) -> Self {
        Self { particles, options }
    }

    /// Run the cone search and return one proto-jet per productive seed.
    ///
    /// Algorithm, per seed (highest energy first):
    /// 1) Put the axis on the seed.
    /// 2) Collect every particle with ΔR <= R from the axis.
    /// 3) Move the axis to the energy-weighted centroid of that set.
    /// 4) Repeat until the axis moves by less than the tolerance in both
    ///    coordinates, or the iteration cap is hit (kept as-is).
    ///
    /// Proto-jets come back in seed order. Seeds whose cone empties out
    /// produce nothing, and a cone reached from several seeds is kept once.
    pub fn run(&self) -> JetResult<Vec<ProtoJet>> {
        self.options.validate()?;
        validate_particles(self.particles)?;

        let seeds = self.seed_order();
        log::debug!(
            "cone search: {} particles, {} seeds above {}",
            self.particles.len(),
            seeds.len(),
            self.options.seed_threshold
        );

        let found = if self.options.parallel_seeds {
            self.search_parallel(&seeds)?
        } else {
            seeds
                .iter()
                .map(|&i| self.search(&self.particles[i]))
                .collect::<JetResult<Vec<_>>>()?
        };

        // Several seeds often settle on the same stable cone; report it once,
        // under the highest-energy seed that reached it.
        let mut seen: HashSet<Vec<SourceId>> = HashSet::new();
        let proto_jets: Vec<ProtoJet> = found
            .into_iter()
            .flatten()
            .filter(|proto| seen.insert(proto.constituents().iter().map(|p| p.source_id).collect()))
            .collect();
        log::info!(
            "cone search found {} proto-jets from {} seeds",
            proto_jets.len(),
            seeds.len()
        );
        Ok(proto_jets)
    }

    /// Full cone pipeline: search, then resolve overlaps if enabled.
    /// Jets come back sorted by descending energy.
    pub fn find_jets(&self) -> JetResult<Vec<Jet>> {
        let proto_jets = self.run()?;
        if self.options.resolve_overlaps {
            let resolver = OverlapResolver {
                options: OverlapOptions {
                    radius: self.options.radius,
                    ..OverlapOptions::default()
                },
            };
            return resolver.resolve(proto_jets);
        }
        let mut jets: Vec<Jet> = proto_jets.into_iter().map(Jet::from).collect();
        sort_by_energy_desc(&mut jets);
        Ok(jets)
    }

    #[cfg(feature = "parallel")]
    fn search_parallel(&self, seeds: &[usize]) -> JetResult<Vec<Option<ProtoJet>>> {
        use rayon::prelude::*;
        // Indexed collect keeps seed order.
        seeds
            .par_iter()
            .map(|&i| self.search(&self.particles[i]))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn search_parallel(&self, seeds: &[usize]) -> JetResult<Vec<Option<ProtoJet>>> {
        // Fallback to sequential when feature is disabled.
        seeds
            .iter()
            .map(|&i| self.search(&self.particles[i]))
            .collect()
    }

    /// Iterate one cone to a fixed point, starting at `seed`.
    fn search(&self, seed: &Particle) -> JetResult<Option<ProtoJet>> {
        let tol = self.options.convergence_tolerance;
        let mut axis = (seed.rapidity, seed.azimuth);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.options.max_iterations {
            let mut centroid = EnergyCentroid::new(axis.1);
            let mut any = false;
            for p in self.in_cone(axis) {
                centroid.add(p.rapidity, p.azimuth, p.energy);
                any = true;
            }
            if !any {
                let id = seed.source_id;
                log::debug!("seed {id:?}: cone emptied after {iterations} iterations");
                return Ok(None);
            }

            let next = centroid.finish()?;
            iterations += 1;
            let dy = (next.0 - axis.0).abs();
            let dphi = delta_azimuth(next.1, axis.1).abs();
            axis = next;
            if dy < tol && dphi < tol {
                converged = true;
                break;
            }
        }

        let constituents: Vec<Particle> = self.in_cone(axis).copied().collect();
        if constituents.is_empty() {
            log::debug!("seed {:?}: final cone is empty", seed.source_id);
            return Ok(None);
        }
        if !converged {
            log::warn!(
                "seed {:?}: no convergence within {} iterations, keeping axis ({:.4}, {:.4})",
                seed.source_id,
                self.options.max_iterations,
                axis.0,
                axis.1
            );
        }

        ProtoJet::from_cone(axis, constituents, seed.energy, iterations, converged).map(Some)
    }

    fn in_cone(&self, axis: (f64, f64)) -> impl Iterator<Item = &'a Particle> + '_ {
        let radius = self.options.radius;
        self.particles
            .iter()
            .filter(move |p| p.distance_to(axis.0, axis.1) <= radius)
    }

    /// Seed indices by descending energy; equal energies keep input order.
    fn seed_order(&self) -> Vec<usize> {
        let threshold = self.options.seed_threshold;
        let mut idx: Vec<usize> = (0..self.particles.len())
            .filter(|&i| self.particles[i].energy >= threshold)
            .collect();
        idx.sort_by(|&a, &b| self.particles[b].energy.total_cmp(&self.particles[a].energy));
        idx
    }
}
