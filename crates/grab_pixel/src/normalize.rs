//! Normalization stages that turn any PNG layout into RGBA at 8 bits per channel.
//!
//! Each stage is a plain function over a [`Raster`] and does nothing when its
//! input does not need it, so the full conversion is simply [`PIPELINE`] run
//! in order. The order matters: later stages assume earlier ones already ran.
//! Every stage first checks [`Raster::validate`], so a hand-built raster with
//! an impossible depth or a short buffer is a [`SampleError::Decode`].
//!
//! | Stage                     | Applies to                         | Result                     |
//! |---------------------------|------------------------------------|----------------------------|
//! | [`strip_16`]              | 16-bit samples                     | 8-bit, high byte kept      |
//! | [`expand_palette`]        | indexed                            | RGB, or RGBA with `tRNS`   |
//! | [`expand_gray`]           | gray below 8 bits                  | 8-bit gray, bit-replicated |
//! | [`transparency_to_alpha`] | gray / RGB with a `tRNS` color key | gray+alpha / RGBA          |
//! | [`add_filler`]            | gray / RGB                         | alpha 255 appended         |
//! | [`gray_to_rgb`]           | gray+alpha                         | RGBA                       |

use crate::raster::{unpack_samples, ColorKey, ColorModel, Raster};
use crate::{Result, SampleError};

/// A single normalization step.
pub type Stage = fn(&mut Raster) -> Result<()>;

/// All stages, in the order they must run.
pub const PIPELINE: [Stage; 6] = [
    strip_16,
    expand_palette,
    expand_gray,
    transparency_to_alpha,
    add_filler,
    gray_to_rgb,
];

/// Runs every stage of [`PIPELINE`] on `raster`.
pub fn normalize(raster: &mut Raster) -> Result<()> {
    for stage in PIPELINE {
        stage(raster)?;
    }

    if !raster.is_normalized() {
        return Err(SampleError::Decode(format!(
            "cannot normalize {:?} at {} bits per sample",
            raster.model, raster.depth
        )));
    }
    Ok(())
}

/// Reduces 16-bit samples to 8 bits by keeping the most significant byte.
///
/// This truncates rather than rounds, so `0x12ff` becomes `0x12`. A pending
/// color key is resolved into alpha first, while the full 16-bit values are
/// still available to compare against.
pub fn strip_16(raster: &mut Raster) -> Result<()> {
    raster.validate()?;
    if raster.depth != 16 {
        return Ok(());
    }
    if raster.color_key.is_some() {
        transparency_to_alpha(raster)?;
    }

    // Samples are big-endian and rows have no padding at 16 bits.
    let samples = raster.data.len() / 2;
    for i in 0..samples {
        raster.data[i] = raster.data[i * 2];
    }
    raster.data.truncate(samples);
    raster.data.shrink_to_fit();
    raster.depth = 8;
    Ok(())
}

/// Replaces palette indices with their `PLTE` colors.
///
/// With a palette alpha table the output is RGBA: indices past the end of the
/// table are opaque. Indices past the end of the palette map to opaque black.
pub fn expand_palette(raster: &mut Raster) -> Result<()> {
    raster.validate()?;
    if raster.model != ColorModel::Indexed {
        return Ok(());
    }

    let palette = raster
        .palette
        .take()
        .ok_or_else(|| SampleError::Decode("indexed image without PLTE chunk".to_string()))?;
    let alpha = raster.palette_alpha.take();
    let channels = if alpha.is_some() { 4 } else { 3 };

    let width = raster.width as usize;
    let mut out = alloc_pixels(raster.width, raster.height, channels)?;
    for row in raster.rows() {
        for index in unpack_samples(row, raster.depth, width) {
            let index = index as usize;
            let rgb = palette.get(index).copied().unwrap_or([0, 0, 0]);
            out.extend_from_slice(&rgb);
            if let Some(alpha) = &alpha {
                out.push(alpha.get(index).copied().unwrap_or(0xff));
            }
        }
    }

    raster.data = out;
    raster.depth = 8;
    raster.model = if channels == 4 {
        ColorModel::Rgba
    } else {
        ColorModel::Rgb
    };
    Ok(())
}

/// Widens 1, 2 and 4-bit gray to 8 bits by bit replication.
///
/// A 2-bit `0b10` becomes `0b1010_1010`, so full scale maps to 255 rather
/// than to a value near zero. A pending gray color key is scaled the same way.
pub fn expand_gray(raster: &mut Raster) -> Result<()> {
    raster.validate()?;
    if raster.model != ColorModel::Gray || raster.depth >= 8 {
        return Ok(());
    }

    let max = (1u16 << raster.depth) - 1;
    let scale = 255 / max;

    let width = raster.width as usize;
    let mut out = alloc_pixels(raster.width, raster.height, 1)?;
    for row in raster.rows() {
        out.extend(unpack_samples(row, raster.depth, width).map(|v| (v * scale) as u8));
    }

    if let Some(ColorKey::Gray(key)) = raster.color_key.as_mut() {
        *key = (*key & max) * scale;
    }
    raster.data = out;
    raster.depth = 8;
    Ok(())
}

/// Turns a `tRNS` color key into an alpha channel.
///
/// Pixels equal to the key become fully transparent, everything else fully
/// opaque. Works at 8 and 16 bits; sub-byte gray is expanded first.
pub fn transparency_to_alpha(raster: &mut Raster) -> Result<()> {
    raster.validate()?;
    if raster.color_key.is_none() || !matches!(raster.model, ColorModel::Gray | ColorModel::Rgb) {
        return Ok(());
    }
    if raster.depth < 8 {
        expand_gray(raster)?;
    }
    let Some(key) = raster.color_key.take() else {
        return Ok(());
    };

    let wide = raster.depth == 16;
    append_alpha(raster, |px| {
        let sample = |i: usize| -> u16 {
            if wide {
                u16::from_be_bytes([px[i * 2], px[i * 2 + 1]])
            } else {
                px[i] as u16
            }
        };
        let keyed = match key {
            ColorKey::Gray(g) => sample(0) == g,
            ColorKey::Rgb(r, g, b) => sample(0) == r && sample(1) == g && sample(2) == b,
        };
        !keyed
    })
}

/// Appends a fully opaque alpha channel to gray and RGB rasters.
pub fn add_filler(raster: &mut Raster) -> Result<()> {
    raster.validate()?;
    if !matches!(raster.model, ColorModel::Gray | ColorModel::Rgb) {
        return Ok(());
    }
    if raster.depth < 8 {
        expand_gray(raster)?;
    }
    append_alpha(raster, |_| true)
}

/// Copies the luminance of gray and gray+alpha rasters into R, G and B.
///
/// Alpha, where present, is carried over unchanged.
pub fn gray_to_rgb(raster: &mut Raster) -> Result<()> {
    raster.validate()?;
    if !raster.model.is_gray() {
        return Ok(());
    }
    if raster.depth < 8 {
        expand_gray(raster)?;
    }

    let bytes = raster.depth as usize / 8;
    let src_channels = raster.model.channels();
    let dst_channels = src_channels + 2;

    let mut out = alloc_pixels(raster.width, raster.height, dst_channels * bytes)?;
    for px in raster.data.chunks_exact(src_channels * bytes) {
        let (luma, alpha) = px.split_at(bytes);
        for _ in 0..3 {
            out.extend_from_slice(luma);
        }
        out.extend_from_slice(alpha);
    }

    raster.data = out;
    raster.model = if raster.model.has_alpha() {
        ColorModel::Rgba
    } else {
        ColorModel::Rgb
    };
    Ok(())
}

/// Rebuilds a gray or RGB raster (8 or 16-bit) with one alpha sample per pixel.
fn append_alpha(raster: &mut Raster, mut opaque: impl FnMut(&[u8]) -> bool) -> Result<()> {
    let bytes = raster.depth as usize / 8;
    let src = raster.model.channels() * bytes;

    let mut out = alloc_pixels(raster.width, raster.height, src + bytes)?;
    for px in raster.data.chunks_exact(src) {
        let alpha = if opaque(px) { 0xff } else { 0x00 };
        out.extend_from_slice(px);
        out.resize(out.len() + bytes, alpha);
    }

    raster.data = out;
    raster.model = match raster.model {
        ColorModel::Gray => ColorModel::GrayAlpha,
        _ => ColorModel::Rgba,
    };
    Ok(())
}

/// Reserves room for `width * height * bytes_per_pixel` bytes.
pub(crate) fn alloc_pixels(width: u32, height: u32, bytes_per_pixel: usize) -> Result<Vec<u8>> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(bytes_per_pixel))
        .ok_or_else(|| {
            SampleError::Resource(format!(
                "raster of {width}x{height}x{bytes_per_pixel} bytes overflows"
            ))
        })?;
    alloc_bytes(len)
}

pub(crate) fn alloc_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| SampleError::Resource(format!("cannot allocate {len} bytes: {e}")))?;
    Ok(buf)
}
