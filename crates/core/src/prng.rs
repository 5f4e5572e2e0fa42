//! Counter-based pseudo-random stream
//!
//! Every draw hashes a 64-bit counter with a fixed key using the "squares"
//! construction (Widynski 2020), so the stream is fully described by
//! `(key, counter)`. That makes it trivially reproducible and lets a frame
//! be split into independent sub-streams over disjoint counter ranges.
//!
//! The effect owns exactly one stream per instance. It is never reseeded
//! between frames: the counter keeps advancing, so frame N+1 sees different
//! ignitions than frame N while two instances fed the same frames in the
//! same order produce identical output.
//!
//! # References
//!
//! - Widynski, B. (2020) "Squares: A Fast Counter-Based RNG", <https://arxiv.org/abs/2004.06278>

use rand::RngCore;

/// Default stream key. Squares keys need irregular hex digits; this one is
/// taken from the published key set.
pub const STREAM_KEY: u64 = 0xc8e4fd154ce32f6d;

/// Scale factor mapping a 32-bit draw onto `[0, 1)`.
const INV_2_POW_32: f64 = 1.0 / 4_294_967_296.0;

/// Bit position of the frame index inside a sub-stream counter.
const SUBSTREAM_FRAME_SHIFT: u32 = 32;

/// Bit position of the scanline-pair index inside a sub-stream counter.
/// Leaves 2^20 draws per pair, enough for chroma rows up to ~260k columns.
const SUBSTREAM_PAIR_SHIFT: u32 = 20;

#[inline(always)]
fn squares32(counter: u64, key: u64) -> u32 {
    let y = counter.wrapping_mul(key);
    let z = y.wrapping_add(key);
    let mut x = y;
    x = x.wrapping_mul(x).wrapping_add(y).rotate_right(32);
    x = x.wrapping_mul(x).wrapping_add(z).rotate_right(32);
    x = x.wrapping_mul(x).wrapping_add(y).rotate_right(32);
    (x.wrapping_mul(x).wrapping_add(z) >> 32) as u32
}

/// Deterministic 32-bit generator advanced by one counter step per draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrngStream {
    key: u64,
    counter: u64,
}

impl Default for PrngStream {
    fn default() -> Self {
        Self::new()
    }
}

impl PrngStream {
    /// Stream seeded with the fixed default key, counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_key(STREAM_KEY)
    }

    /// Stream over a caller-chosen key, counter at zero.
    #[must_use]
    pub const fn with_key(key: u64) -> Self {
        Self { key, counter: 0 }
    }

    /// Independent stream for one scanline-pair of one frame.
    ///
    /// Shares this stream's key but starts at a counter derived from
    /// `frame` and `pair`, so sub-streams never overlap as long as a frame
    /// has fewer than 4096 scanline-pairs.
    #[must_use]
    pub fn substream(&self, frame: u64, pair: usize) -> Self {
        Self {
            key: self.key,
            counter: (frame << SUBSTREAM_FRAME_SHIFT) | ((pair as u64) << SUBSTREAM_PAIR_SHIFT),
        }
    }

    /// Number of draws consumed so far (the next counter value).
    #[must_use]
    pub fn position(&self) -> u64 {
        self.counter
    }

    /// Raw 32-bit draw.
    #[inline]
    pub fn draw(&mut self) -> u32 {
        let value = squares32(self.counter, self.key);
        self.counter = self.counter.wrapping_add(1);
        value
    }

    /// Uniform double in `[0, 1)` built from one raw draw.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        f64::from(self.draw()) * INV_2_POW_32
    }

    /// Integer in `[0, bound)` from one raw draw (multiply-shift, no
    /// rejection). A zero bound yields zero but still consumes a draw.
    #[inline]
    pub fn below(&mut self, bound: u32) -> u32 {
        ((u64::from(self.draw()) * u64::from(bound)) >> 32) as u32
    }
}

impl RngCore for PrngStream {
    fn next_u32(&mut self) -> u32 {
        self.draw()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.draw());
        let lo = u64::from(self.draw());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        rand::rand_core::impls::fill_bytes_via_next(self, dst);
    }
}
