//! SECAM Fire Core Library
//!
//! Synthesizes the "SECAM fire" artifact of over-driven analog colour
//! television: short horizontal flares of boosted chroma that ignite on
//! saturated colours, luma edges or at random, ramp up, then fade out over
//! a few columns and bleed onto the paired scanline.
//!
//! ## Pipeline
//!
//! One call to [`SecamFire::process`] handles one frame:
//! - RGBA8888 input converted to planar `Y'CbCr` 4:2:0 ([`colorspace`])
//! - Luma summed into a half-resolution edge map ([`EdgeMap`])
//! - Chroma planes burnt in place by the fire engine ([`engine`])
//! - Planes converted back to RGBA8888
//!
//! The noise lattice ([`NoiseField`]) is built once and shared by every
//! instance through an `Arc`. Each instance owns its own [`PrngStream`],
//! which keeps advancing from frame to frame.

// Error type
pub mod error;

// Building blocks
pub mod noise;
pub mod params;
pub mod prng;

// Frame storage and colour conversion
pub mod colorspace;
pub mod frame;

// Fire synthesis
pub mod effect;
pub mod engine;

pub use effect::{Schedule, SecamFire};
pub use engine::{BurnContext, BurnStats, FireState, FlarePhase};
pub use error::{FireError, Result};
pub use frame::{EdgeMap, PlanarFrame, Plane};
pub use noise::NoiseField;
pub use params::{FireParams, ParamInfo, Thresholds, PARAMS};
pub use prng::PrngStream;
