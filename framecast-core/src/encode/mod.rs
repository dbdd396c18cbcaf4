//! Still-image encoding
//!
//! This module provides:
//! - The [`FrameEncoder`] seam the sampler encodes through
//! - JPEG encoding of raster buffers
//! - `data:` URI packing and parsing for transmitted frames

mod data_uri;
mod jpeg;

pub use data_uri::DataUri;
pub use jpeg::JpegEncoder;

use crate::error::Result;
use crate::sampler::RasterBuffer;

/// Image encoding of a transmitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Baseline JPEG
    Jpeg,
}

impl ImageFormat {
    /// MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// A single encoded sample
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Width in pixels at sample time
    pub width: u32,
    /// Height in pixels at sample time
    pub height: u32,
    /// Encoding of `data`
    pub format: ImageFormat,
    /// Quality factor the frame was encoded with (0-1)
    pub quality: f32,
    /// Encoded image bytes
    pub data: Vec<u8>,
}

impl Frame {
    /// Encode the frame as a base64 `data:` URI
    pub fn to_data_uri(&self) -> String {
        DataUri::encode(self.format.mime_type(), &self.data)
    }
}

/// Encoder from raster pixels to a compressed still image
pub trait FrameEncoder: Send {
    /// Encode the raster's current contents
    fn encode(&mut self, raster: &RasterBuffer) -> Result<Frame>;
}
