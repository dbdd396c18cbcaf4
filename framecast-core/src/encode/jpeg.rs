//! JPEG encoding of raster buffers

use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::{DynamicImage, ImageBuffer, Rgba};

use super::{Frame, FrameEncoder, ImageFormat};
use crate::error::{FramecastError, Result};
use crate::sampler::RasterBuffer;

/// Lossy JPEG encoder with a fixed quality factor
#[derive(Debug, Clone)]
pub struct JpegEncoder {
    /// Quality on a 0-1 scale
    quality: f32,
}

impl JpegEncoder {
    /// Create an encoder with the given quality (0-1 scale)
    pub fn new(quality: f32) -> Self {
        Self {
            quality: quality.clamp(0.01, 1.0),
        }
    }

    /// Quality on a 0-1 scale
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Quality on the codec's 1-100 scale
    fn quality_percent(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&mut self, raster: &RasterBuffer) -> Result<Frame> {
        let (width, height) = (raster.width(), raster.height());
        if width == 0 || height == 0 {
            return Err(FramecastError::encoding(format!(
                "Cannot encode empty {}x{} raster",
                width, height
            )));
        }

        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, raster.pixels().to_vec()).ok_or_else(|| {
                FramecastError::encoding(format!(
                    "Raster holds {} bytes, expected {}",
                    raster.pixels().len(),
                    width as usize * height as usize * 4
                ))
            })?;

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgba8(img).to_rgb8();

        let mut data = Vec::new();
        {
            let mut encoder = ImageJpegEncoder::new_with_quality(&mut data, self.quality_percent());
            encoder.encode_image(&rgb)?;
        }

        Ok(Frame {
            width,
            height,
            format: ImageFormat::Jpeg,
            quality: self.quality,
            data,
        })
    }
}
