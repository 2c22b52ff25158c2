//! Particle and jet data model.
//!
//! `Particle` is an immutable input value. `ProtoJet` (cone output, may
//! overlap with other proto-jets) and `Jet` (final, resolved) are separate
//! types; both keep their fields private so the energy sum always matches the
//! constituent list and no constituent appears twice.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::angular::{EnergyCentroid, angular_distance, normalize_azimuth};
use crate::error::{JetError, JetResult};

/// Opaque identity of the cell (or other source) a particle came from.
///
/// Used only to deduplicate constituents, never in any physics formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u64);

impl From<u64> for SourceId {
    fn from(id: u64) -> Self {
        SourceId(id)
    }
}

/// An energy deposit at a point of the (rapidity, azimuth) plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub source_id: SourceId,
    pub rapidity: f64,
    /// Azimuth in `(-π, π]`.
    pub azimuth: f64,
    /// Deposited energy, strictly positive.
    pub energy: f64,
}

impl Particle {
    /// Create a particle, wrapping the azimuth into `(-π, π]`.
    pub fn new(source_id: impl Into<SourceId>, rapidity: f64, azimuth: f64, energy: f64) -> Self {
        Self {
            source_id: source_id.into(),
            rapidity,
            azimuth: normalize_azimuth(azimuth),
            energy,
        }
    }

    /// ΔR from this particle to the point `(rapidity, azimuth)`.
    #[inline]
    pub fn distance_to(&self, rapidity: f64, azimuth: f64) -> f64 {
        angular_distance(self.rapidity, self.azimuth, rapidity, azimuth)
    }
}

/// Check an input particle list before any clustering state is built.
///
/// Rejects non-finite coordinates, non-positive energies and repeated
/// source ids (the latter would break constituent deduplication).
pub(crate) fn validate_particles(particles: &[Particle]) -> JetResult<()> {
    let mut seen = HashSet::with_capacity(particles.len());
    for p in particles {
        if !p.rapidity.is_finite() || !p.azimuth.is_finite() {
            return Err(JetError::InvalidParameter(format!(
                "particle {:?} has non-finite position ({}, {})",
                p.source_id, p.rapidity, p.azimuth
            )));
        }
        if !p.energy.is_finite() || p.energy <= 0.0 {
            return Err(JetError::InvalidParameter(format!(
                "particle {:?} has energy {}, expected > 0",
                p.source_id, p.energy
            )));
        }
        if !seen.insert(p.source_id) {
            return Err(JetError::InvalidParameter(format!(
                "duplicate source id {:?} in particle list",
                p.source_id
            )));
        }
    }
    // Cluster energies are sums of constituents and must stay finite.
    let total: f64 = particles.iter().map(|p| p.energy).sum();
    if !total.is_finite() {
        return Err(JetError::InvalidParameter(format!(
            "total particle energy {total} is not finite"
        )));
    }
    Ok(())
}

/// Union of two constituent lists, keeping the first occurrence of every
/// source id. Order is `a` followed by the new entries of `b`.
pub(crate) fn union_by_source(a: &[Particle], b: &[Particle]) -> Vec<Particle> {
    let mut seen: HashSet<SourceId> = HashSet::with_capacity(a.len() + b.len());
    a.iter()
        .chain(b.iter())
        .filter(|p| seen.insert(p.source_id))
        .copied()
        .collect()
}

/// Energy-weighted centroid of `constituents` in the frame of `reference_azimuth`.
/// Returns `(rapidity, azimuth, total_energy)`.
pub(crate) fn centroid_of(
    constituents: &[Particle],
    reference_azimuth: f64,
) -> JetResult<(f64, f64, f64)> {
    let mut acc = EnergyCentroid::new(reference_azimuth);
    for p in constituents {
        acc.add(p.rapidity, p.azimuth, p.energy);
    }
    let (rapidity, azimuth) = acc.finish()?;
    Ok((rapidity, azimuth, acc.total_energy()))
}

/// Azimuth of the most energetic particle, used as the averaging frame.
fn leading_azimuth(constituents: &[Particle]) -> Option<f64> {
    constituents
        .iter()
        .max_by(|a, b| a.energy.total_cmp(&b.energy))
        .map(|p| p.azimuth)
}

/// Candidate jet found by one seeded cone search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtoJet {
    rapidity: f64,
    azimuth: f64,
    energy: f64,
    constituents: Vec<Particle>,
    seed_energy: Option<f64>,
    iterations: Option<usize>,
    converged: bool,
}

impl ProtoJet {
    /// Build a proto-jet around a cone axis.
    ///
    /// `constituents` must already be unique by source id (a cone selection
    /// over a validated particle list always is).
    pub(crate) fn from_cone(
        axis: (f64, f64),
        constituents: Vec<Particle>,
        seed_energy: f64,
        iterations: usize,
        converged: bool,
    ) -> JetResult<Self> {
        let energy: f64 = constituents.iter().map(|p| p.energy).sum();
        if energy <= 0.0 {
            return Err(JetError::EmptyCluster);
        }
        Ok(Self {
            rapidity: axis.0,
            azimuth: normalize_azimuth(axis.1),
            energy,
            constituents,
            seed_energy: Some(seed_energy),
            iterations: Some(iterations),
            converged,
        })
    }

    pub fn rapidity(&self) -> f64 {
        self.rapidity
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn constituents(&self) -> &[Particle] {
        &self.constituents
    }

    /// Energy of the seed the cone search started from.
    pub fn seed_energy(&self) -> Option<f64> {
        self.seed_energy
    }

    /// Number of axis updates the cone search performed.
    pub fn iterations(&self) -> Option<usize> {
        self.iterations
    }

    /// False when the search hit the iteration cap before settling.
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn distance_to(&self, other: &ProtoJet) -> f64 {
        angular_distance(self.rapidity, self.azimuth, other.rapidity, other.azimuth)
    }
}

/// A resolved jet, as handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Jet {
    rapidity: f64,
    azimuth: f64,
    energy: f64,
    pt: Option<f64>,
    constituents: Vec<Particle>,
    seed_energy: Option<f64>,
    iterations: Option<usize>,
}

impl Jet {
    /// Build a jet from an arbitrary collection of particles.
    ///
    /// Duplicated source ids are counted once; the axis is the energy-weighted
    /// centroid of what remains.
    pub fn from_particles(particles: impl IntoIterator<Item = Particle>) -> JetResult<Self> {
        let collected: Vec<Particle> = particles.into_iter().collect();
        let constituents = union_by_source(&collected, &[]);
        let reference = leading_azimuth(&constituents).ok_or(JetError::EmptyCluster)?;
        Self::with_reference(constituents, reference)
    }

    /// Build a jet from unique constituents, averaging azimuth around `reference_azimuth`.
    pub(crate) fn with_reference(
        constituents: Vec<Particle>,
        reference_azimuth: f64,
    ) -> JetResult<Self> {
        let (rapidity, azimuth, energy) = centroid_of(&constituents, reference_azimuth)?;
        Ok(Self {
            rapidity,
            azimuth,
            energy,
            pt: None,
            constituents,
            seed_energy: None,
            iterations: None,
        })
    }

    pub(crate) fn with_pt(mut self, pt: f64) -> Self {
        self.pt = Some(pt);
        self
    }

    pub fn rapidity(&self) -> f64 {
        self.rapidity
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Accumulated transverse momentum, set for kT jets only.
    pub fn pt(&self) -> Option<f64> {
        self.pt
    }

    pub fn constituents(&self) -> &[Particle] {
        &self.constituents
    }

    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }

    pub fn seed_energy(&self) -> Option<f64> {
        self.seed_energy
    }

    pub fn iterations(&self) -> Option<usize> {
        self.iterations
    }

    pub fn distance_to(&self, other: &Jet) -> f64 {
        angular_distance(self.rapidity, self.azimuth, other.rapidity, other.azimuth)
    }
}

/// Emit a proto-jet unchanged (axis included) as a final jet.
impl From<ProtoJet> for Jet {
    fn from(proto: ProtoJet) -> Self {
        Self {
            rapidity: proto.rapidity,
            azimuth: proto.azimuth,
            energy: proto.energy,
            pt: None,
            constituents: proto.constituents,
            seed_energy: proto.seed_energy,
            iterations: proto.iterations,
        }
    }
}

/// Feed a resolved jet back into overlap resolution.
impl From<Jet> for ProtoJet {
    fn from(jet: Jet) -> Self {
        Self {
            rapidity: jet.rapidity,
            azimuth: jet.azimuth,
            energy: jet.energy,
            constituents: jet.constituents,
            seed_energy: jet.seed_energy,
            iterations: jet.iterations,
            converged: true,
        }
    }
}

/// Stable sort, highest energy first.
pub(crate) fn sort_by_energy_desc(jets: &mut [Jet]) {
    jets.sort_by(|a, b| b.energy.total_cmp(&a.energy));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_particle_new_wraps_azimuth() {
        let p = Particle::new(3u64, 0.5, 3.0 * PI / 2.0, 4.0);
        assert!((p.azimuth + PI / 2.0).abs() < 1e-12);
        assert_eq!(p.source_id, SourceId(3));
    }

    #[test]
    fn test_validate_particles() {
        let good = vec![Particle::new(0u64, 0.0, 0.0, 1.0), Particle::new(1u64, 1.0, 1.0, 2.0)];
        assert!(validate_particles(&good).is_ok());

        let negative = vec![Particle::new(0u64, 0.0, 0.0, -1.0)];
        assert!(matches!(validate_particles(&negative), Err(JetError::InvalidParameter(_))));

        let zero = vec![Particle::new(0u64, 0.0, 0.0, 0.0)];
        assert!(validate_particles(&zero).is_err());

        let dup = vec![Particle::new(5u64, 0.0, 0.0, 1.0), Particle::new(5u64, 1.0, 0.0, 1.0)];
        assert!(validate_particles(&dup).is_err());

        let nan = vec![Particle::new(0u64, f64::NAN, 0.0, 1.0)];
        assert!(validate_particles(&nan).is_err());

        let overflow = vec![
            Particle::new(0u64, 0.0, 0.0, 1e308),
            Particle::new(1u64, 0.1, 0.0, 1e308),
        ];
        assert!(matches!(validate_particles(&overflow), Err(JetError::InvalidParameter(_))));
    }

    #[test]
    fn test_union_dedups_by_source() {
        let a = vec![Particle::new(0u64, 0.0, 0.0, 1.0), Particle::new(1u64, 0.1, 0.0, 2.0)];
        let b = vec![Particle::new(1u64, 0.1, 0.0, 2.0), Particle::new(2u64, 0.2, 0.0, 3.0)];
        let u = union_by_source(&a, &b);
        let ids: Vec<u64> = u.iter().map(|p| p.source_id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_jet_from_particles_counts_once() {
        let p = Particle::new(9u64, 0.2, -0.1, 5.0);
        let q = Particle::new(10u64, 0.4, 0.1, 5.0);
        let jet = Jet::from_particles([p, q, p]).unwrap();
        assert_eq!(jet.len(), 2);
        assert!((jet.energy() - 10.0).abs() < 1e-12);
        assert!((jet.rapidity() - 0.3).abs() < 1e-12);
        assert!(jet.azimuth().abs() < 1e-12);
    }

    #[test]
    fn test_jet_from_nothing_is_empty_cluster() {
        assert_eq!(Jet::from_particles(Vec::new()), Err(JetError::EmptyCluster));
    }

    #[test]
    fn test_proto_jet_round_trip_keeps_axis() {
        let c = vec![Particle::new(0u64, 0.0, 0.0, 3.0)];
        let proto = ProtoJet::from_cone((0.01, 0.02), c, 3.0, 2, true).unwrap();
        let jet = Jet::from(proto.clone());
        assert_eq!(jet.rapidity(), 0.01);
        assert_eq!(jet.azimuth(), 0.02);
        assert_eq!(jet.iterations(), Some(2));
        assert_eq!(ProtoJet::from(jet), proto);
    }

    #[test]
    fn test_sort_by_energy_desc() {
        let mut jets: Vec<Jet> = [2.0, 7.0, 4.0]
            .iter()
            .enumerate()
            .map(|(i, &e)| Jet::from_particles([Particle::new(i as u64, 0.0, 0.0, e)]).unwrap())
            .collect();
        sort_by_energy_desc(&mut jets);
        let energies: Vec<f64> = jets.iter().map(Jet::energy).collect();
        assert_eq!(energies, vec![7.0, 4.0, 2.0]);
    }
}
