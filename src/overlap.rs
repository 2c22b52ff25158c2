use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{JetError, JetResult, ensure_positive};
use crate::particle::{Jet, ProtoJet, SourceId, sort_by_energy_desc, union_by_source};

/// Options controlling split/merge of overlapping proto-jets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapOptions {
    /// Cone radius the proto-jets were built with. Pairs at least 2R apart
    /// cannot share constituents and are never compared.
    pub radius: f64,

    /// Pairs sharing more than this fraction of their energy are merged;
    /// otherwise the softer one is dropped.
    pub merge_fraction: f64, // e.g., 0.5
}

impl Default for OverlapOptions {
    fn default() -> Self {
        Self {
            radius: 0.8,
            merge_fraction: 0.5,
        }
    }
}

impl OverlapOptions {
    pub fn validate(&self) -> JetResult<()> {
        ensure_positive("overlap radius", self.radius)?;
        if !(self.merge_fraction > 0.0 && self.merge_fraction <= 1.0) {
            return Err(JetError::InvalidParameter(format!(
                "merge_fraction must be in (0, 1], got {}",
                self.merge_fraction
            )));
        }
        Ok(())
    }
}

/// Greedy split/merge over proto-jets.
pub struct OverlapResolver {
    pub options: OverlapOptions,
}

impl OverlapResolver {
    pub fn new(options: OverlapOptions) -> Self {
        Self { options }
    }

    /// Resolve overlaps and return final jets by descending energy.
    ///
    /// Algorithm, over proto-jets in the given order:
    /// 1) For each unconsumed jet A, scan the later unconsumed jets B.
    /// 2) Pairs at least 2R apart are left alone.
    /// 3) If A and B share more than `merge_fraction` of their energy, both
    ///    are replaced by one jet over the union of their constituents and
    ///    A's scan ends.
    /// 4) Otherwise the softer of the two is dropped (A wins ties). If A is
    ///    dropped its scan ends.
    /// 5) An A that survives its scan untouched is emitted as-is.
    ///
    /// A merged jet is never compared with the jets after its partner, so the
    /// pass is repeated on its own energy-sorted output until one pass
    /// changes nothing. Every changing pass removes at least one jet, and the
    /// result has no two jets closer than 2R, so resolving it again is a no-op.
    ///
    /// The scan is order-sensitive; feed proto-jets in seed order.
    pub fn resolve(&self, proto_jets: Vec<ProtoJet>) -> JetResult<Vec<Jet>> {
        self.options.validate()?;

        let n = proto_jets.len();
        let mut pending = proto_jets;
        let mut passes = 0usize;
        loop {
            passes += 1;
            let (mut jets, changes) = self.single_pass(&pending)?;
            sort_by_energy_desc(&mut jets);
            if changes == 0 {
                log::info!(
                    "overlap resolution: {n} proto-jets -> {} jets in {passes} passes",
                    jets.len()
                );
                return Ok(jets);
            }
            pending = jets.into_iter().map(ProtoJet::from).collect();
        }
    }

    /// One greedy split/merge scan. Returns the surviving jets (unsorted) and
    /// the number of merges plus splits performed.
    fn single_pass(&self, proto_jets: &[ProtoJet]) -> JetResult<(Vec<Jet>, usize)> {
        let n = proto_jets.len();
        let reach = 2.0 * self.options.radius;
        let mut consumed = vec![false; n];
        let mut jets: Vec<Jet> = Vec::with_capacity(n);
        let (mut merges, mut splits) = (0usize, 0usize);

        for i in 0..n {
            if consumed[i] {
                continue;
            }
            let a = &proto_jets[i];
            let mut merged: Option<Jet> = None;

            for j in (i + 1)..n {
                if consumed[j] {
                    continue;
                }
                let b = &proto_jets[j];
                if a.distance_to(b) >= reach {
                    continue;
                }

                let fraction = shared_energy_fraction(a, b);
                if fraction > self.options.merge_fraction {
                    let union = union_by_source(a.constituents(), b.constituents());
                    log::debug!(
                        "merge proto-jets {i} and {j}: shared {fraction:.3}, {} constituents",
                        union.len()
                    );
                    merged = Some(Jet::with_reference(union, a.azimuth())?);
                    consumed[i] = true;
                    consumed[j] = true;
                    merges += 1;
                    break;
                }

                splits += 1;
                if a.energy() >= b.energy() {
                    log::debug!("split: drop proto-jet {j} against {i} (shared {fraction:.3})");
                    consumed[j] = true;
                } else {
                    log::debug!("split: drop proto-jet {i} against {j} (shared {fraction:.3})");
                    consumed[i] = true;
                    break;
                }
            }

            if let Some(jet) = merged {
                jets.push(jet);
            } else if !consumed[i] {
                consumed[i] = true;
                jets.push(Jet::from(a.clone()));
            }
        }

        log::debug!("overlap pass: {n} in, {} out ({merges} merges, {splits} splits)", jets.len());
        Ok((jets, merges + splits))
    }
}

/// Fraction of the pair's combined energy carried by constituents present in
/// both jets (matched by source id).
///
/// Shared constituents are counted once for each jet they sit in, so two
/// identical proto-jets share a fraction of 1.
pub fn shared_energy_fraction(a: &ProtoJet, b: &ProtoJet) -> f64 {
    let in_b: HashSet<SourceId> = b.constituents().iter().map(|p| p.source_id).collect();
    let shared: f64 = a
        .constituents()
        .iter()
        .filter(|p| in_b.contains(&p.source_id))
        .map(|p| p.energy)
        .sum();
    let total = a.energy() + b.energy();
    if total > 0.0 { 2.0 * shared / total } else { 0.0 }
}
