//! Angular metric on the (rapidity, azimuth) plane.
//!
//! Rapidity is an ordinary real line, azimuth is periodic with period 2π and
//! is kept on `(-π, π]`. All distances and centroids in this crate go through
//! this module so the azimuth branch cut is handled in exactly one place.

use std::f64::consts::{PI, TAU};

use crate::error::{JetError, JetResult};

/// Wrap `phi` into `(-π, π]`.
///
/// Values already inside the interval are returned untouched, which keeps the
/// function idempotent bit-for-bit.
#[inline]
pub fn normalize_azimuth(phi: f64) -> f64 {
    if phi > -PI && phi <= PI {
        return phi;
    }
    let wrapped = (phi + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Signed azimuth difference `phi1 - phi2`, wrapped into `(-π, π]`.
#[inline]
pub fn delta_azimuth(phi1: f64, phi2: f64) -> f64 {
    normalize_azimuth(phi1 - phi2)
}

/// ΔR = sqrt(Δy² + Δφ²) with the azimuth difference wraparound-corrected.
#[inline]
pub fn angular_distance(y1: f64, phi1: f64, y2: f64, phi2: f64) -> f64 {
    let dy = y1 - y2;
    let dphi = delta_azimuth(phi1, phi2);
    (dy * dy + dphi * dphi).sqrt()
}

/// Energy-weighted centroid accumulator.
///
/// Azimuths are unwrapped into a local frame centred on `reference` before
/// averaging, so deposits straddling ±π average to a point near the cut
/// instead of near zero. The reference should be a point inside the cluster
/// (the current cone axis, or the leading constituent).
#[derive(Debug, Clone, Copy)]
pub struct EnergyCentroid {
    reference: f64,
    energy: f64,
    weighted_rapidity: f64,
    weighted_offset: f64,
}

impl EnergyCentroid {
    pub fn new(reference_azimuth: f64) -> Self {
        Self {
            reference: normalize_azimuth(reference_azimuth),
            energy: 0.0,
            weighted_rapidity: 0.0,
            weighted_offset: 0.0,
        }
    }

    #[inline]
    pub fn add(&mut self, rapidity: f64, azimuth: f64, energy: f64) {
        self.energy += energy;
        self.weighted_rapidity += energy * rapidity;
        self.weighted_offset += energy * delta_azimuth(azimuth, self.reference);
    }

    /// Summed energy of everything added so far.
    pub fn total_energy(&self) -> f64 {
        self.energy
    }

    /// Finish the average, returning `(rapidity, azimuth)`.
    ///
    /// Fails with [`JetError::EmptyCluster`] when the accumulated energy is
    /// not strictly positive, instead of producing NaN.
    pub fn finish(&self) -> JetResult<(f64, f64)> {
        if self.energy.is_nan() || self.energy <= 0.0 {
            return Err(JetError::EmptyCluster);
        }
        let rapidity = self.weighted_rapidity / self.energy;
        let azimuth = normalize_azimuth(self.reference + self.weighted_offset / self.energy);
        Ok((rapidity, azimuth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn test_normalize_range_and_idempotence() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let x: f64 = rng.gen_range(-100.0..100.0);
            let n = normalize_azimuth(x);
            assert!(n > -PI && n <= PI, "{x} -> {n}");
            assert_eq!(normalize_azimuth(n), n);
        }
    }

    #[test]
    fn test_normalize_branch_cut() {
        assert_eq!(normalize_azimuth(PI), PI);
        assert_eq!(normalize_azimuth(-PI), PI);
        assert!((normalize_azimuth(3.0 * PI) - PI).abs() < 1e-12);
        assert!((normalize_azimuth(-0.5 * PI - TAU) + 0.5 * PI).abs() < 1e-12);
        assert_eq!(normalize_azimuth(0.25), 0.25);
    }

    #[test]
    fn test_distance_across_cut() {
        assert!(angular_distance(0.0, PI, 0.0, -PI) < 1e-12);
        let d = angular_distance(0.0, PI - 0.1, 0.0, -PI + 0.1);
        assert!((d - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_distance_symmetric() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let (y1, y2) = (rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0));
            let (p1, p2) = (rng.gen_range(-PI..PI), rng.gen_range(-PI..PI));
            let ab = angular_distance(y1, p1, y2, p2);
            let ba = angular_distance(y2, p2, y1, p1);
            assert!((ab - ba).abs() < 1e-12);
            assert!(ab >= 0.0);
        }
        assert_eq!(angular_distance(1.5, -0.3, 1.5, -0.3), 0.0);
        assert!(angular_distance(0.0, 0.0, 0.3, 0.4) > 0.0);
    }

    #[test]
    fn test_centroid_plain_mean() {
        let mut c = EnergyCentroid::new(0.0);
        c.add(0.0, 0.0, 20.0);
        c.add(0.1, 0.1, 15.0);
        let (y, phi) = c.finish().unwrap();
        assert!((y - 1.5 / 35.0).abs() < 1e-12);
        assert!((phi - 1.5 / 35.0).abs() < 1e-12);
        assert!((c.total_energy() - 35.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_wraps_near_pi() {
        // Equal deposits just either side of the cut average onto the cut,
        // not onto phi = 0.
        let mut c = EnergyCentroid::new(PI - 0.1);
        c.add(0.0, PI - 0.1, 10.0);
        c.add(0.0, -PI + 0.1, 10.0);
        let (_, phi) = c.finish().unwrap();
        assert!((phi.abs() - PI).abs() < 1e-9, "phi = {phi}");

        // The reference only picks the frame, it does not bias the result.
        let mut c = EnergyCentroid::new(-PI + 0.1);
        c.add(0.0, PI - 0.2, 30.0);
        c.add(0.0, -PI + 0.1, 10.0);
        let (_, phi) = c.finish().unwrap();
        let expected = normalize_azimuth(PI - 0.2 + 0.25 * 0.3);
        assert!(delta_azimuth(phi, expected).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_empty_is_error() {
        let c = EnergyCentroid::new(0.0);
        assert_eq!(c.finish(), Err(JetError::EmptyCluster));
    }
}
