//! RGBA8888 ⇄ planar `Y'CbCr` 4:2:0 conversion
//!
//! BT.601 full-range (JFIF) matrices in 16.16 fixed point. Pixels are
//! packed RGBA8888 in memory byte order (R, G, B, A), which is how frei0r
//! hosts hand frames over as `u32`.
//!
//! Chroma is the rounded mean of the four pixels in each 2×2 block;
//! on the way back every block shares its chroma sample (a trailing odd
//! row/column reuses the last one). Alpha is never converted: it is copied
//! from the input pixel to the output pixel.

use crate::frame::PlanarFrame;

const FIX_SHIFT: u32 = 16;
const FIX_HALF: i32 = 1 << (FIX_SHIFT - 1);
const CHROMA_BIAS: i32 = 128 << FIX_SHIFT;

// Forward matrix
const Y_R: i32 = 19595;
const Y_G: i32 = 38470;
const Y_B: i32 = 7471;
const CB_R: i32 = -11059;
const CB_G: i32 = -21709;
const CB_B: i32 = 32768;
const CR_R: i32 = 32768;
const CR_G: i32 = -27439;
const CR_B: i32 = -5329;

// Inverse matrix
const R_CR: i32 = 91881;
const G_CB: i32 = -22554;
const G_CR: i32 = -46802;
const B_CB: i32 = 116130;

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[inline]
fn unpack(pixel: u32) -> (i32, i32, i32) {
    let [r, g, b, _] = pixel.to_ne_bytes();
    (i32::from(r), i32::from(g), i32::from(b))
}

#[inline]
fn luma(r: i32, g: i32, b: i32) -> u8 {
    clamp_u8((Y_R * r + Y_G * g + Y_B * b + FIX_HALF) >> FIX_SHIFT)
}

#[inline]
fn cb(r: i32, g: i32, b: i32) -> i32 {
    (CB_R * r + CB_G * g + CB_B * b + CHROMA_BIAS + FIX_HALF) >> FIX_SHIFT
}

#[inline]
fn cr(r: i32, g: i32, b: i32) -> i32 {
    (CR_R * r + CR_G * g + CR_B * b + CHROMA_BIAS + FIX_HALF) >> FIX_SHIFT
}

/// Convert an interleaved RGBA frame into `frame`'s three planes.
///
/// `input` must hold exactly `frame.width() * frame.height()` pixels.
pub fn rgba_to_planar(input: &[u32], frame: &mut PlanarFrame) {
    let width = frame.width();
    debug_assert_eq!(input.len(), width * frame.height());

    for (dst, &px) in frame.luma.data_mut().iter_mut().zip(input) {
        let (r, g, b) = unpack(px);
        *dst = luma(r, g, b);
    }

    let (cw, ch) = frame.chroma_size();
    for cy in 0..ch {
        for cx in 0..cw {
            let mut sum_cb = 0;
            let mut sum_cr = 0;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (r, g, b) = unpack(input[(2 * cy + dy) * width + 2 * cx + dx]);
                sum_cb += cb(r, g, b);
                sum_cr += cr(r, g, b);
            }
            frame.cb.set(cx, cy, clamp_u8((sum_cb + 2) >> 2));
            frame.cr.set(cx, cy, clamp_u8((sum_cr + 2) >> 2));
        }
    }
}

#[inline]
fn decode_pixel(frame: &PlanarFrame, luma_row: &[u8], x: usize, cy: usize, alpha: u8) -> u32 {
    let (cw, _) = frame.chroma_size();
    let cx = (x / 2).min(cw.saturating_sub(1));
    let yv = i32::from(luma_row[x]);
    let u = i32::from(frame.cb.get(cx, cy)) - 128;
    let v = i32::from(frame.cr.get(cx, cy)) - 128;

    let r = yv + ((R_CR * v + FIX_HALF) >> FIX_SHIFT);
    let g = yv + ((G_CB * u + G_CR * v + FIX_HALF) >> FIX_SHIFT);
    let b = yv + ((B_CB * u + FIX_HALF) >> FIX_SHIFT);
    u32::from_ne_bytes([clamp_u8(r), clamp_u8(g), clamp_u8(b), alpha])
}

#[inline]
fn chroma_row(frame: &PlanarFrame, y: usize) -> usize {
    let (_, ch) = frame.chroma_size();
    (y / 2).min(ch.saturating_sub(1))
}

/// Convert `frame` back to interleaved RGBA, taking alpha from `alpha`.
///
/// `alpha` and `output` must each hold `frame.width() * frame.height()`
/// pixels; they may come from the same host frame size but never alias.
pub fn planar_to_rgba(frame: &PlanarFrame, alpha: &[u32], output: &mut [u32]) {
    let width = frame.width();
    debug_assert_eq!(output.len(), width * frame.height());
    debug_assert_eq!(alpha.len(), output.len());

    for (y, (out_row, alpha_row)) in output
        .chunks_exact_mut(width)
        .zip(alpha.chunks_exact(width))
        .enumerate()
    {
        let cy = chroma_row(frame, y);
        let luma_row = frame.luma.row(y);
        for (x, (out, &src)) in out_row.iter_mut().zip(alpha_row).enumerate() {
            *out = decode_pixel(frame, luma_row, x, cy, src.to_ne_bytes()[3]);
        }
    }
}

/// Convert `frame` back into `pixels`, keeping each pixel's own alpha.
///
/// Used when the host hands the same buffer in and out.
pub fn planar_to_rgba_in_place(frame: &PlanarFrame, pixels: &mut [u32]) {
    let width = frame.width();
    debug_assert_eq!(pixels.len(), width * frame.height());

    for (y, row) in pixels.chunks_exact_mut(width).enumerate() {
        let cy = chroma_row(frame, y);
        let luma_row = frame.luma.row(y);
        for (x, px) in row.iter_mut().enumerate() {
            *px = decode_pixel(frame, luma_row, x, cy, px.to_ne_bytes()[3]);
        }
    }
}

/// Pack an RGBA quadruple in host memory order.
#[must_use]
pub fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_ne_bytes([r, g, b, a])
}
