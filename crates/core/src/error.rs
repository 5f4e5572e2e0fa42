//! Error type for the effect core.
//!
//! Pixel arithmetic never fails (it saturates), so the only errors are
//! start-up allocation failure and caller contract violations that the safe
//! Rust API can detect cheaply.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FireError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FireError {
    /// The shared noise lattice could not be allocated. Fatal at start-up.
    #[error("failed to allocate noise lattice of {len} entries")]
    NoiseAllocation { len: usize },

    #[error("invalid frame dimensions {width}x{height}: both must be at least 2")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("{buffer} buffer holds {actual} pixels, expected {expected}")]
    FrameSize {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{plane} plane is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    PlaneSize {
        plane: &'static str,
        expected_width: usize,
        expected_height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("unknown parameter index {0}")]
    UnknownParam(usize),
}
