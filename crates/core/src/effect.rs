//! Effect instance
//!
//! Owns everything a host needs to run the effect on a stream of frames at
//! one resolution: the parameters, the PRNG stream, a handle to the shared
//! noise field and the working buffers. Buffers are allocated once in
//! [`SecamFire::new`] and reused for every frame.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::colorspace::{planar_to_rgba, planar_to_rgba_in_place, rgba_to_planar};
use crate::engine::{burn_frame, BurnContext, BurnStats};
use crate::error::{FireError, Result};
use crate::frame::{chroma_dimensions, EdgeMap, PlanarFrame, Plane};
use crate::noise::NoiseField;
use crate::params::FireParams;
use crate::prng::PrngStream;

fn check_plane(name: &'static str, plane: &Plane, width: usize, height: usize) -> Result<()> {
    if (plane.width(), plane.height()) == (width, height) {
        return Ok(());
    }
    Err(FireError::PlaneSize {
        plane: name,
        expected_width: width,
        expected_height: height,
        actual_width: plane.width(),
        actual_height: plane.height(),
    })
}

/// How scanline-pairs are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// One shared stream, pairs in order. Reference output.
    #[default]
    Sequential,
    /// Pairs on the rayon pool, one sub-stream per pair and frame.
    /// Falls back to sequential without the `parallel` feature.
    Parallel,
}

/// One SECAM-fire effect bound to a frame size.
#[derive(Debug)]
pub struct SecamFire {
    width: usize,
    height: usize,
    params: FireParams,
    schedule: Schedule,
    stream: PrngStream,
    field: Arc<NoiseField>,
    planes: PlanarFrame,
    edges: EdgeMap,
    frames: u64,
}

impl SecamFire {
    /// Create an effect for `width × height` frames.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::InvalidDimensions`] if either side is below 2
    /// (there would be no chroma sample to work on).
    pub fn new(width: u32, height: u32, field: Arc<NoiseField>) -> Result<Self> {
        if width < 2 || height < 2 {
            return Err(FireError::InvalidDimensions { width, height });
        }
        let (w, h) = (width as usize, height as usize);
        let planes = PlanarFrame::new(w, h);
        let (cw, ch) = planes.chroma_size();
        debug!(width, height, cw, ch, "secam fire instance created");

        Ok(Self {
            width: w,
            height: h,
            params: FireParams::default(),
            schedule: Schedule::default(),
            stream: PrngStream::new(),
            field,
            planes,
            edges: EdgeMap::new(w, h),
            frames: 0,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn params(&self) -> &FireParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut FireParams {
        &mut self.params
    }

    pub fn set_params(&mut self, params: FireParams) {
        self.params = params;
    }

    #[must_use]
    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
    }

    /// Frames processed since construction.
    #[must_use]
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// The instance's PRNG stream (for inspection).
    #[must_use]
    pub fn stream(&self) -> &PrngStream {
        &self.stream
    }

    /// Process one RGBA8888 frame.
    ///
    /// `time` is the host timestamp; the effect is driven by its own stream
    /// and only logs it.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::FrameSize`] if either buffer does not hold
    /// exactly `width × height` pixels. Nothing is written in that case.
    pub fn process(&mut self, time: f64, input: &[u32], output: &mut [u32]) -> Result<BurnStats> {
        let expected = self.width * self.height;
        for (buffer, actual) in [("input", input.len()), ("output", output.len())] {
            if actual != expected {
                return Err(FireError::FrameSize {
                    buffer,
                    expected,
                    actual,
                });
            }
        }

        let mut planes = std::mem::take(&mut self.planes);
        rgba_to_planar(input, &mut planes);
        let stats = self.process_planar(&mut planes);
        if stats.is_ok() {
            planar_to_rgba(&planes, input, output);
        }
        self.planes = planes;
        let stats = stats?;

        trace!(time, frame = self.frames, ignitions = stats.ignitions, "frame processed");
        Ok(stats)
    }

    /// Process one RGBA8888 frame held in a single buffer that is both
    /// input and output. Alpha stays as it was.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::FrameSize`] if `pixels` does not hold exactly
    /// `width × height` pixels. Nothing is written in that case.
    pub fn process_in_place(&mut self, time: f64, pixels: &mut [u32]) -> Result<BurnStats> {
        let expected = self.width * self.height;
        if pixels.len() != expected {
            return Err(FireError::FrameSize {
                buffer: "in-place",
                expected,
                actual: pixels.len(),
            });
        }

        let mut planes = std::mem::take(&mut self.planes);
        rgba_to_planar(pixels, &mut planes);
        let stats = self.process_planar(&mut planes);
        if stats.is_ok() {
            planar_to_rgba_in_place(&planes, pixels);
        }
        self.planes = planes;
        let stats = stats?;

        trace!(time, frame = self.frames, ignitions = stats.ignitions, "frame processed in place");
        Ok(stats)
    }

    /// Run the engine on planes the caller already converted.
    ///
    /// Luma is only read.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::PlaneSize`] if any plane of `frame` does not
    /// match the instance size. The frame is left untouched in that case.
    pub fn process_planar(&mut self, frame: &mut PlanarFrame) -> Result<BurnStats> {
        let (cw, ch) = chroma_dimensions(self.width, self.height);
        check_plane("luma", &frame.luma, self.width, self.height)?;
        check_plane("cb", &frame.cb, cw, ch)?;
        check_plane("cr", &frame.cr, cw, ch)?;

        self.edges.rebuild(&frame.luma);
        let ctx = BurnContext::new(&self.field, self.params.thresholds());

        #[cfg(feature = "parallel")]
        let stats = if self.schedule == Schedule::Parallel {
            crate::engine::burn_frame_parallel(&ctx, &self.stream, self.frames, frame, &self.edges)
        } else {
            burn_frame(&ctx, &mut self.stream, frame, &self.edges)
        };
        #[cfg(not(feature = "parallel"))]
        let stats = burn_frame(&ctx, &mut self.stream, frame, &self.edges);

        self.frames += 1;
        Ok(stats)
    }
}
