//! Frame sampling
//!
//! The sampler owns an off-screen raster buffer. On each tick it copies the
//! surface's current frame in, sizing the buffer to that frame, and hands the
//! pixels to the encoder. A frame whose data does not cover its dimensions is
//! never encoded.

use tracing::{debug, trace};

use crate::capture::RenderSurface;
use crate::encode::{Frame, FrameEncoder};
use crate::error::Result;
use crate::types::VideoFrame;

/// Off-screen RGBA raster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBuffer {
    /// Create an empty (0x0) raster
    pub fn new() -> Self {
        Self::default()
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Resize the raster, clearing it
    ///
    /// Returns true if the dimensions changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.data = vec![0; (width as usize) * (height as usize) * 4];
        true
    }

    /// Copy a whole frame into the raster, taking on the frame's size
    ///
    /// Returns false and leaves the raster untouched when the frame's data
    /// does not match its dimensions.
    pub fn draw(&mut self, frame: &VideoFrame) -> bool {
        if !frame.is_complete() {
            return false;
        }
        self.resize(frame.width, frame.height);
        self.data.copy_from_slice(&frame.data);
        true
    }
}

/// Samples a render surface into a raster and encodes it
pub struct Sampler {
    raster: RasterBuffer,
    encoder: Box<dyn FrameEncoder>,
}

impl Sampler {
    /// Create a sampler using the given encoder
    pub fn new(encoder: Box<dyn FrameEncoder>) -> Self {
        Self {
            raster: RasterBuffer::new(),
            encoder,
        }
    }

    /// The raster used by the last sample
    pub fn raster(&self) -> &RasterBuffer {
        &self.raster
    }

    /// Take one sample from the surface
    ///
    /// Returns `Ok(None)` when the surface has nothing to sample (not ready,
    /// no size yet, or no complete frame). Encoding failures are returned as
    /// errors for the caller to log; they never affect the raster.
    pub fn sample(&mut self, surface: &dyn RenderSurface) -> Result<Option<Frame>> {
        if !surface.is_ready() {
            trace!("Surface not ready, skipping sample");
            return Ok(None);
        }

        let Some(natural) = surface.natural_size() else {
            trace!("Surface has no natural size yet");
            return Ok(None);
        };

        let previous = (self.raster.width(), self.raster.height());
        if !surface.draw_into(&mut self.raster) {
            trace!("No complete frame available on surface");
            return Ok(None);
        }

        let drawn = (self.raster.width(), self.raster.height());
        if drawn != previous {
            debug!("Raster resized to {}x{}", drawn.0, drawn.1);
        }
        if drawn != natural {
            debug!(
                "Frame is {}x{} while the surface reports {}x{}",
                drawn.0, drawn.1, natural.0, natural.1
            );
        }

        self.encoder.encode(&self.raster).map(Some)
    }
}
