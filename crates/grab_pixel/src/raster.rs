//! The intermediate raster every normalization stage operates on.
//!
//! A [`Raster`] starts out holding the unfiltered rows exactly as the PNG
//! stores them (packed sub-byte samples, big-endian 16-bit samples, palette
//! indices) together with the side tables that still need applying. The
//! stages in [`crate::normalize`] rewrite it step by step until it is RGBA
//! at 8 bits per channel.

use crate::decoder::Point;
use crate::{Result, SampleError};

/// Color model of a raster, mirroring the five PNG color types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Indexed,
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl ColorModel {
    /// Number of samples per pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            ColorModel::Indexed | ColorModel::Gray => 1,
            ColorModel::GrayAlpha => 2,
            ColorModel::Rgb => 3,
            ColorModel::Rgba => 4,
        }
    }

    #[inline]
    pub fn has_alpha(self) -> bool {
        matches!(self, ColorModel::GrayAlpha | ColorModel::Rgba)
    }

    #[inline]
    pub fn is_gray(self) -> bool {
        matches!(self, ColorModel::Gray | ColorModel::GrayAlpha)
    }
}

impl From<png::ColorType> for ColorModel {
    fn from(color_type: png::ColorType) -> Self {
        match color_type {
            png::ColorType::Grayscale => ColorModel::Gray,
            png::ColorType::GrayscaleAlpha => ColorModel::GrayAlpha,
            png::ColorType::Rgb => ColorModel::Rgb,
            png::ColorType::Rgba => ColorModel::Rgba,
            png::ColorType::Indexed => ColorModel::Indexed,
        }
    }
}

/// What the PNG header says about the stored pixels.
///
/// Only used to pick normalization stages; the sampled color never depends
/// on anything here except through the stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceEncoding {
    pub width: u32,
    pub height: u32,
    /// Bits per sample: 1, 2, 4, 8 or 16
    pub bit_depth: u8,
    pub model: ColorModel,
    /// Whether a `tRNS` chunk is present
    pub has_transparency: bool,
    /// Whether rows are stored in Adam7 order
    pub interlaced: bool,
}

impl SourceEncoding {
    pub(crate) fn from_info(info: &png::Info<'_>) -> Self {
        Self {
            width: info.width,
            height: info.height,
            bit_depth: info.bit_depth as u8,
            model: info.color_type.into(),
            has_transparency: info.trns.is_some(),
            interlaced: info.interlaced,
        }
    }

    /// Returns true if `point` lies inside the declared dimensions.
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x < self.width && point.y < self.height
    }
}

/// A single transparent color from a `tRNS` chunk of a gray or RGB image.
///
/// Values are kept at the raster's current bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorKey {
    Gray(u16),
    Rgb(u16, u16, u16),
}

impl ColorKey {
    /// Parses a gray or RGB `tRNS` payload.
    ///
    /// Accepts both the on-disk layout (a big-endian `u16` per sample) and the
    /// one byte per sample form the `png` crate reports below 16 bits.
    fn parse(model: ColorModel, trns: &[u8]) -> Option<Self> {
        let channels = match model {
            ColorModel::Gray => 1,
            ColorModel::Rgb => 3,
            _ => return None,
        };
        let wide = trns.len() >= channels * 2;
        let sample = |i: usize| -> Option<u16> {
            if wide {
                trns.get(i * 2..i * 2 + 2)
                    .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
            } else {
                trns.get(i).map(|&b| b as u16)
            }
        };
        match model {
            ColorModel::Gray => Some(ColorKey::Gray(sample(0)?)),
            _ => Some(ColorKey::Rgb(sample(0)?, sample(1)?, sample(2)?)),
        }
    }
}

/// Row-major pixel buffer plus whatever side tables have not been applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub model: ColorModel,
    /// Bits per sample
    pub depth: u8,
    /// Rows of `stride()` bytes each, no padding between rows
    pub data: Vec<u8>,
    /// RGB entries from `PLTE`, consumed by palette expansion
    pub palette: Option<Vec<[u8; 3]>>,
    /// Per-index alpha from `tRNS` on an indexed image
    pub palette_alpha: Option<Vec<u8>>,
    /// Transparent color from `tRNS` on a gray or RGB image
    pub color_key: Option<ColorKey>,
}

impl Raster {
    /// Creates a raster with no side tables.
    pub fn new(width: u32, height: u32, model: ColorModel, depth: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            model,
            depth,
            data,
            palette: None,
            palette_alpha: None,
            color_key: None,
        }
    }

    /// Wraps a decoded frame, attaching the `PLTE` and `tRNS` tables from `info`.
    pub(crate) fn from_frame(encoding: &SourceEncoding, info: &png::Info<'_>, data: Vec<u8>) -> Self {
        let mut raster = Self::new(
            encoding.width,
            encoding.height,
            encoding.model,
            encoding.bit_depth,
            data,
        );

        if encoding.model == ColorModel::Indexed {
            raster.palette = info.palette.as_ref().map(|plte| {
                plte.chunks_exact(3)
                    .map(|rgb| [rgb[0], rgb[1], rgb[2]])
                    .collect()
            });
            raster.palette_alpha = info.trns.as_ref().map(|trns| trns.to_vec());
        } else if let Some(trns) = info.trns.as_ref() {
            raster.color_key = ColorKey::parse(encoding.model, trns);
        }

        raster
    }

    /// Bytes per row at the current model and depth.
    #[inline]
    pub fn stride(&self) -> usize {
        let bits = self.width as usize * self.model.channels() * self.depth as usize;
        bits.div_ceil(8)
    }

    /// Checks that the bit depth is one PNG allows for the model and that
    /// `data` holds exactly `height` rows of `stride()` bytes.
    pub fn validate(&self) -> Result<()> {
        let depth_ok = match self.model {
            ColorModel::Gray => matches!(self.depth, 1 | 2 | 4 | 8 | 16),
            ColorModel::Indexed => matches!(self.depth, 1 | 2 | 4 | 8),
            ColorModel::GrayAlpha | ColorModel::Rgb | ColorModel::Rgba => matches!(self.depth, 8 | 16),
        };
        if !depth_ok {
            return Err(SampleError::Decode(format!(
                "{:?} cannot have {} bits per sample",
                self.model, self.depth
            )));
        }

        let expected = (self.width as usize)
            .checked_mul(self.model.channels() * self.depth as usize)
            .map(|bits| bits.div_ceil(8))
            .and_then(|stride| stride.checked_mul(self.height as usize));
        if expected != Some(self.data.len()) {
            return Err(SampleError::Decode(format!(
                "{}x{} raster holds {} bytes, expected {}",
                self.width,
                self.height,
                self.data.len(),
                expected.map_or_else(|| "more than fits in memory".to_string(), |n| n.to_string())
            )));
        }
        Ok(())
    }

    /// Returns true once every stage has run: RGBA at 8 bits per channel.
    #[inline]
    pub fn is_normalized(&self) -> bool {
        self.model == ColorModel::Rgba && self.depth == 8
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // max(1) keeps chunks_exact happy for zero-width rasters, which yield no rows
        self.data.chunks_exact(self.stride().max(1))
    }

    /// The RGBA bytes at `point`, or `None` if the raster is not normalized
    /// or the point is outside it.
    pub fn pixel(&self, point: Point) -> Option<[u8; 4]> {
        if !self.is_normalized() || point.x >= self.width || point.y >= self.height {
            return None;
        }
        let offset = point.y as usize * self.stride() + point.x as usize * 4;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Iterates the samples of one packed row, widened to `u16`.
///
/// Handles 1, 2, 4, 8 (one byte) and 16 (big-endian pair) bit samples, and
/// stops after `count` samples so the padding bits at the end of a sub-byte
/// row are never yielded.
pub(crate) fn unpack_samples(row: &[u8], depth: u8, count: usize) -> impl Iterator<Item = u16> + '_ {
    let depth = depth as usize;
    (0..count).map(move |i| match depth {
        16 => u16::from_be_bytes([row[i * 2], row[i * 2 + 1]]),
        8 => row[i] as u16,
        _ => {
            let bit = i * depth;
            let shift = 8 - depth - (bit % 8);
            let mask = (1u16 << depth) - 1;
            (row[bit / 8] as u16 >> shift) & mask
        }
    })
}
