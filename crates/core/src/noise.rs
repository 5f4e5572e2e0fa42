//! Periodic 1-D value noise
//!
//! A fixed lattice of uniform values, sampled with cubic smoothstep
//! interpolation between neighbouring entries. The lattice length is a
//! power of two so any integer index wraps with a mask, which makes the
//! field periodic with period `LATTICE_LEN / scale` and safe to sample at
//! arbitrarily large (or negative) coordinates.
//!
//! The field is generated once from a hard-coded seed, never mutated, and
//! shared read-only (`Arc<NoiseField>`) by every effect instance.

use rand::Rng;
use tracing::debug;

use crate::error::{FireError, Result};
use crate::prng::PrngStream;

/// Lattice length (must be power of 2).
pub const LATTICE_LEN: usize = 4096;

/// Index mask for wrapping lookups.
const LATTICE_MASK: i64 = (LATTICE_LEN - 1) as i64;

/// Fixed generator key for the lattice, so the noise texture is identical
/// across runs and processes.
pub const NOISE_SEED: u64 = 0x9f3a6b2d5e71c48b;

/// Cubic smoothstep `3t² − 2t³`.
#[inline]
fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Immutable value-noise lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseField {
    lattice: Vec<f64>,
}

impl NoiseField {
    /// Allocate and fill the lattice.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::NoiseAllocation`] if the lattice cannot be
    /// allocated. Callers treat this as fatal.
    pub fn build() -> Result<Self> {
        let mut lattice = Vec::new();
        lattice
            .try_reserve_exact(LATTICE_LEN)
            .map_err(|_| FireError::NoiseAllocation { len: LATTICE_LEN })?;

        let mut rng = PrngStream::with_key(NOISE_SEED);
        lattice.extend((0..LATTICE_LEN).map(|_| rng.random::<f64>()));

        debug!(len = LATTICE_LEN, "noise lattice built");
        Ok(Self { lattice })
    }

    /// Number of lattice entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lattice.len()
    }

    /// Always false; the lattice has a fixed non-zero length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lattice.is_empty()
    }

    /// Coordinate distance after which the field repeats at `scale`.
    #[must_use]
    pub fn period(scale: f64) -> f64 {
        LATTICE_LEN as f64 / scale
    }

    /// Sample the field.
    ///
    /// # Arguments
    ///
    /// * `coordinate` - Position along the field (any finite value)
    /// * `amplitude` - Output multiplier; the result lies in `[0, amplitude)`
    /// * `scale` - Lattice cells per coordinate unit (smaller = smoother)
    #[must_use]
    #[inline]
    pub fn sample(&self, coordinate: f64, amplitude: f64, scale: f64) -> f64 {
        let x = coordinate * scale;
        let floor = x.floor();
        let t = smoothstep(x - floor);

        let i = floor as i64;
        let a = self.lattice[(i & LATTICE_MASK) as usize];
        let b = self.lattice[((i + 1) & LATTICE_MASK) as usize];

        (a + t * (b - a)) * amplitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn field() -> NoiseField {
        NoiseField::build().expect("lattice allocation")
    }

    #[test]
    fn test_lattice_shape() {
        let f = field();
        assert_eq!(f.len(), LATTICE_LEN);
        assert!(LATTICE_LEN.is_power_of_two());
        assert!(f.lattice.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_build_is_reproducible() {
        assert_eq!(field(), field());
    }

    #[test]
    fn test_sample_hits_lattice_at_integers() {
        let f = field();
        for i in [0_usize, 1, 17, 4095] {
            let v = f.sample(i as f64, 1.0, 1.0);
            assert_relative_eq!(v, f.lattice[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sample_range_and_amplitude() {
        let f = field();
        for i in 0..2000 {
            let x = f64::from(i) * 0.37;
            let v = f.sample(x, 20.0, 0.125);
            assert!((0.0..20.0).contains(&v), "sample out of range: {v}");
        }
        assert_eq!(f.sample(123.4, 0.0, 0.125), 0.0);
    }

    #[test]
    fn test_sample_is_periodic() {
        let f = field();
        for scale in [1.0, 0.5, 0.125, 0.03125] {
            let period = NoiseField::period(scale);
            for i in 0..200 {
                let x = f64::from(i) * 1.7;
                assert_relative_eq!(
                    f.sample(x, 1.0, scale),
                    f.sample(x + period, 1.0, scale),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_sample_wraps_large_and_negative_coordinates() {
        let f = field();
        let v = f.sample(1.0e12 + 0.5, 1.0, 1.0);
        assert!((0.0..1.0).contains(&v));
        assert_relative_eq!(
            f.sample(-0.5, 1.0, 1.0),
            f.sample(LATTICE_LEN as f64 - 0.5, 1.0, 1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sample_is_continuous() {
        let f = field();
        // Smoothstep interpolation: tiny steps give tiny changes
        for i in 0..1000 {
            let x = f64::from(i) * 0.01;
            let d = (f.sample(x + 1e-6, 1.0, 1.0) - f.sample(x, 1.0, 1.0)).abs();
            assert!(d < 1e-5, "discontinuity at {x}: {d}");
        }
    }
}
