//! Sequential kT recombination.
//!
//! Every input particle starts as a pseudo-particle. Each step finds the
//! smallest of the beam distances `d_iB = pt_i²` and pair distances
//! `d_ij = min(pt_i², pt_j²) · (ΔR_ij / R)²`. A pair minimum merges the two
//! pseudo-particles; a beam minimum retires one, emitting it as a jet when its
//! pt passes the cut. The working set shrinks by one every step.
//!
//! The minimum is searched over square roots of both distances, `pt_i` and
//! `min(pt_i, pt_j) · ΔR_ij / R`. The ordering is the same and very hard
//! pseudo-particles do not overflow to infinity.
//!
//! Distances are recomputed from scratch each step, O(n²) per step and O(n³)
//! overall. That is fine for grid-sized inputs.

use serde::{Deserialize, Serialize};

use crate::angular::angular_distance;
use crate::error::{JetError, JetResult, ensure_non_negative, ensure_positive};
use crate::particle::{Jet, Particle, centroid_of, sort_by_energy_desc, validate_particles};

/// Options controlling kT recombination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KtOptions {
    /// Radius parameter R in the pair distance.
    pub radius: f64, // e.g., 0.8

    /// Retired pseudo-particles below this pt are discarded rather than emitted.
    pub pt_cut: f64, // e.g., 10.0
}

impl Default for KtOptions {
    fn default() -> Self {
        Self {
            radius: 0.8,
            pt_cut: 10.0,
        }
    }
}

impl KtOptions {
    pub fn validate(&self) -> JetResult<()> {
        ensure_positive("kT radius", self.radius)?;
        ensure_non_negative("pt cut", self.pt_cut)
    }
}

/// Working cluster of the recombination loop.
#[derive(Debug, Clone)]
struct PseudoParticle {
    id: usize,
    rapidity: f64,
    azimuth: f64,
    energy: f64,
    /// Taken equal to energy for inputs, summed on merge.
    pt: f64,
    constituents: Vec<Particle>,
}

impl PseudoParticle {
    fn from_particle(id: usize, p: &Particle) -> Self {
        Self {
            id,
            rapidity: p.rapidity,
            azimuth: p.azimuth,
            energy: p.energy,
            pt: p.energy,
            constituents: vec![*p],
        }
    }

    /// Combine two pseudo-particles. Constituent lists are disjoint (kT
    /// partitions its input), so they are concatenated without dedup.
    fn merge(a: PseudoParticle, b: PseudoParticle, id: usize) -> JetResult<Self> {
        let reference = if a.pt >= b.pt { a.azimuth } else { b.azimuth };
        let pt = a.pt + b.pt;
        let mut constituents = a.constituents;
        constituents.extend(b.constituents);
        let (rapidity, azimuth, energy) = centroid_of(&constituents, reference)?;
        Ok(Self {
            id,
            rapidity,
            azimuth,
            energy,
            pt,
            constituents,
        })
    }

    fn into_jet(self) -> JetResult<Jet> {
        let pt = self.pt;
        Ok(Jet::with_reference(self.constituents, self.azimuth)?.with_pt(pt))
    }
}

/// Outcome of one minimisation step, as positions in the working set.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Beam(usize),
    Pair(usize, usize),
}

/// Everything a kT run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecombinationResult {
    /// Jets that passed the pt cut, by descending energy.
    pub jets: Vec<Jet>,
    /// Retired pseudo-particles that failed the pt cut, by descending energy.
    pub rejected: Vec<Jet>,
    /// Number of pair merges performed.
    pub merges: usize,
}

impl RecombinationResult {
    /// Energy of emitted plus rejected clusters; equals the input energy.
    pub fn accounted_energy(&self) -> f64 {
        self.jets
            .iter()
            .chain(self.rejected.iter())
            .map(Jet::energy)
            .sum()
    }
}

/// kT sequential recombination engine.
pub struct SequentialRecombiner<'a> {
    pub particles: &'a [Particle],
    pub options: KtOptions,
}

impl<'a> SequentialRecombiner<'a> {
    pub fn new(particles: &'a [Particle], options: KtOptions) -> Self {
        Self { particles, options }
    }

    /// Run recombination and return the jets passing the pt cut.
    pub fn run(&self) -> JetResult<Vec<Jet>> {
        Ok(self.run_detailed()?.jets)
    }

    /// Run recombination and keep the rejected clusters as well.
    pub fn run_detailed(&self) -> JetResult<RecombinationResult> {
        self.options.validate()?;
        validate_particles(self.particles)?;

        let mut working: Vec<PseudoParticle> = self
            .particles
            .iter()
            .enumerate()
            .map(|(id, p)| PseudoParticle::from_particle(id, p))
            .collect();
        let mut next_id = working.len();
        let mut result = RecombinationResult::default();

        while !working.is_empty() {
            match self.closest_step(&working)? {
                Step::Beam(i) => {
                    let retired = working.remove(i);
                    let (id, pt) = (retired.id, retired.pt);
                    let jet = retired.into_jet()?;
                    if pt >= self.options.pt_cut {
                        log::debug!("kT: pseudo-particle {id} becomes a jet (pt {pt:.3})");
                        result.jets.push(jet);
                    } else {
                        log::debug!("kT: pseudo-particle {id} below pt cut (pt {pt:.3})");
                        result.rejected.push(jet);
                    }
                }
                Step::Pair(i, j) => {
                    // j > i, so removing j first leaves i in place.
                    let b = working.remove(j);
                    let a = working.remove(i);
                    log::debug!("kT: merge {} + {} -> {next_id}", a.id, b.id);
                    working.push(PseudoParticle::merge(a, b, next_id)?);
                    next_id += 1;
                    result.merges += 1;
                }
            }
        }

        sort_by_energy_desc(&mut result.jets);
        sort_by_energy_desc(&mut result.rejected);
        log::info!(
            "kT: {} particles -> {} jets ({} below cut, {} merges)",
            self.particles.len(),
            result.jets.len(),
            result.rejected.len(),
            result.merges
        );
        Ok(result)
    }

    /// Global minimum over all beam and pair distances. The first minimum in
    /// scan order wins: beam of `i`, then pairs `(i, j > i)`, for each `i`.
    fn closest_step(&self, working: &[PseudoParticle]) -> JetResult<Step> {
        let radius = self.options.radius;
        let mut best = f64::INFINITY;
        let mut step = None;

        for (i, pi) in working.iter().enumerate() {
            if pi.pt < best {
                best = pi.pt;
                step = Some(Step::Beam(i));
            }
            for (j, pj) in working.iter().enumerate().skip(i + 1) {
                let dr = angular_distance(pi.rapidity, pi.azimuth, pj.rapidity, pj.azimuth);
                // sqrt(d_ij)
                let d_ij = pi.pt.min(pj.pt) * (dr / radius);
                if d_ij < best {
                    best = d_ij;
                    step = Some(Step::Pair(i, j));
                }
            }
        }

        step.ok_or_else(|| {
            log::error!("kT: no finite minimum with {} pseudo-particles left", working.len());
            JetError::DegenerateMinimum {
                remaining: working.len(),
            }
        })
    }
}
