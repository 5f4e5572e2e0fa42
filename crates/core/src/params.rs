//! User controls and the thresholds derived from them
//!
//! Four normalized controls drive the effect. Three of them become
//! ignition thresholds through fixed response curves; the fourth scales the
//! background noise directly. The response constants were tuned by eye and
//! are kept as literals.
//!
//! Controls are nominally in `[0, 1]`. Out-of-range values are stored as
//! given; keeping them sane is the host's job.

use serde::{Deserialize, Serialize};

use crate::error::{FireError, Result};

/// Quadratic gain of the random-ignition control.
pub const K_RANDOM: f64 = 100.0;

/// Linear gain of the edge-ignition control.
pub const K_EDGE: f64 = 2.0;

/// Linear gain of the saturation-ignition control.
pub const K_SATURATION: f64 = 1.0;

/// Largest noise amplitude as a fraction of the 8-bit range.
pub const NOISE_MAX_FRACTION: f64 = 0.25;

/// Full 8-bit range used to turn fractions into pixel units.
const FULL_RANGE: f64 = 256.0;

/// Host-facing description of one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: &'static str,
    pub explanation: &'static str,
}

/// Parameter table in host index order.
pub const PARAMS: [ParamInfo; 4] = [
    ParamInfo {
        name: "random",
        explanation: "Amount of spontaneous fire",
    },
    ParamInfo {
        name: "edge",
        explanation: "Amount of fire triggered by luma edges",
    },
    ParamInfo {
        name: "saturation",
        explanation: "Amount of fire triggered by saturated colors",
    },
    ParamInfo {
        name: "noise",
        explanation: "Amount of background chroma noise",
    },
];

/// The four user controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireParams {
    /// Spontaneous ignition amount.
    pub random: f64,
    /// Edge-triggered ignition amount.
    pub edge: f64,
    /// Saturation-triggered ignition amount.
    pub saturation: f64,
    /// Background noise amount.
    pub noise: f64,
}

impl Default for FireParams {
    fn default() -> Self {
        Self {
            random: 0.01,
            edge: 0.30,
            saturation: 0.48,
            noise: 0.13,
        }
    }
}

impl FireParams {
    /// All controls at zero: no ignition, no noise.
    #[must_use]
    pub const fn off() -> Self {
        Self {
            random: 0.0,
            edge: 0.0,
            saturation: 0.0,
            noise: 0.0,
        }
    }

    /// Read a control by table index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.random),
            1 => Some(self.edge),
            2 => Some(self.saturation),
            3 => Some(self.noise),
            _ => None,
        }
    }

    /// Write a control by table index. The value is not range-checked.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::UnknownParam`] if `index` is past the table.
    pub fn set(&mut self, index: usize, value: f64) -> Result<()> {
        let slot = match index {
            0 => &mut self.random,
            1 => &mut self.edge,
            2 => &mut self.saturation,
            3 => &mut self.noise,
            _ => return Err(FireError::UnknownParam(index)),
        };
        *slot = value;
        Ok(())
    }

    /// Derive the engine thresholds.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::from(self)
    }
}

/// Values the engine compares against, derived from [`FireParams`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// A uniform roll above this ignites spontaneously.
    pub rnd_threshold: f64,
    /// An edge delta above this (plus jitter) ignites.
    pub luma_threshold: f64,
    /// A Cb/Cr divergence above this (plus jitter) ignites.
    pub chroma_threshold: f64,
    /// Peak-to-peak background noise in pixel units.
    pub noise_amplitude: f64,
    /// Whether the edge trigger is enabled at all.
    pub edge_enabled: bool,
}

impl From<&FireParams> for Thresholds {
    fn from(p: &FireParams) -> Self {
        Self {
            rnd_threshold: 1.0 - K_RANDOM * p.random * p.random,
            luma_threshold: 1.0 - K_EDGE * p.edge,
            chroma_threshold: 1.0 - K_SATURATION * p.saturation,
            noise_amplitude: p.noise * NOISE_MAX_FRACTION * FULL_RANGE,
            edge_enabled: p.edge > 0.0,
        }
    }
}
