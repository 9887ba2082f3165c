use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;

use thiserror::Error;

use crate::normalize::{alloc_bytes, normalize};
use crate::raster::{Raster, SourceEncoding};
use crate::{Result, SampleError, DEFAULT_MEMORY_LIMIT};

/// A pixel position, zero-based with the origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Error returned when a [`Point`] cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid point {0:?}, expected X,Y")]
pub struct ParsePointError(String);

impl FromStr for Point {
    type Err = ParsePointError;

    /// Parses `"X,Y"`, allowing whitespace around either number.
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let err = || ParsePointError(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(err)?;
        let x = x.trim().parse().map_err(|_| err())?;
        let y = y.trim().parse().map_err(|_| err())?;
        Ok(Point { x, y })
    }
}

/// One sampled color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 255 unless the image carries an alpha channel or a `tRNS` chunk
    pub a: u8,
}

impl Rgba {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Formats the color as `#RRGGBB`, dropping alpha.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Formats the color as `#RRGGBBAA`.
    pub fn to_hex_alpha(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Returns true if alpha is 255, which is always the case for images
    /// without an alpha channel or `tRNS` chunk.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.a == 0xff
    }
}

impl From<[u8; 4]> for Rgba {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Rgba> for [u8; 4] {
    fn from(c: Rgba) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGB({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Options for sampling.
#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Maximum number of bytes the PNG decoder may allocate (default: 512 MiB)
    pub memory_limit: usize,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

impl From<png::DecodingError> for SampleError {
    fn from(err: png::DecodingError) -> Self {
        match err {
            png::DecodingError::LimitsExceeded => {
                SampleError::Resource("image exceeds the decoder memory limit".to_string())
            }
            other => SampleError::Decode(other.to_string()),
        }
    }
}

/// Samples the color of one pixel from an encoded PNG.
///
/// This is the main entry point. The image is decoded, normalized to RGBA
/// with 8 bits per channel, and the 4 bytes at `point` are returned. The
/// decoded raster is dropped before this function returns, whatever the
/// outcome.
///
/// # Normalization
///
/// Every PNG layout ends up as RGBA8:
/// - 16-bit samples keep their most significant byte (truncation, not rounding)
/// - palette indices become their `PLTE` color, with alpha from `tRNS` if present
/// - 1, 2 and 4-bit gray is scaled by bit replication (`0b11` → `0xff`)
/// - a `tRNS` color key becomes alpha 0 on matching pixels
/// - images without alpha get alpha 255
/// - gray is copied into R, G and B
///
/// See [`crate::normalize`] for the individual stages.
///
/// # Example
///
/// ```ignore
/// use grab_pixel::{sample, Point, Rgba};
///
/// let png = std::fs::read("screenshot.png")?;
/// let color = sample(&png, Point::new(2, 1))?;
/// assert_eq!(color, Rgba::new(12, 200, 64, 255));
/// ```
///
/// # Errors
///
/// - [`SampleError::Decode`] if the bytes are not a valid PNG or are truncated
/// - [`SampleError::OutOfBounds`] if `point` is outside the image; this is
///   detected from the header, before any pixel data is inflated
/// - [`SampleError::Resource`] if the raster cannot be allocated
#[must_use = "this returns the sampled color"]
pub fn sample(bytes: &[u8], point: Point) -> Result<Rgba> {
    sample_with_options(bytes, point, &SampleOptions::default())
}

/// Like [`sample`], with explicit [`SampleOptions`].
pub fn sample_with_options(bytes: &[u8], point: Point, options: &SampleOptions) -> Result<Rgba> {
    sample_reader(Cursor::new(bytes), point, options)
}

/// Like [`sample`], reading the PNG from any byte stream.
///
/// Wrap files in a `BufReader`; the decoder issues many small reads.
pub fn sample_reader<R: Read>(reader: R, point: Point, options: &SampleOptions) -> Result<Rgba> {
    let mut reader = open(reader, options)?;
    let encoding = SourceEncoding::from_info(reader.info());

    if !encoding.contains(point) {
        return Err(SampleError::OutOfBounds {
            x: point.x,
            y: point.y,
            width: encoding.width,
            height: encoding.height,
        });
    }

    let size = reader.output_buffer_size();
    guard_memory(&encoding, size, options)?;
    let mut frame = alloc_bytes(size)?;
    frame.resize(size, 0);
    let output = reader.next_frame(&mut frame)?;
    frame.truncate(output.buffer_size());

    // normalize() rejects a frame whose size disagrees with the header
    let mut raster = Raster::from_frame(&encoding, reader.info(), frame);
    normalize(&mut raster)?;
    raster
        .pixel(point)
        .map(Rgba::from)
        .ok_or_else(|| SampleError::Decode("normalized raster is shorter than its header".to_string()))
}

/// Reads only the PNG header and reports how the pixels are stored.
pub fn probe(bytes: &[u8]) -> Result<SourceEncoding> {
    let reader = open(Cursor::new(bytes), &SampleOptions::default())?;
    Ok(SourceEncoding::from_info(reader.info()))
}

/// Rejects frames whose raw or normalized size exceeds the memory limit.
fn guard_memory(encoding: &SourceEncoding, frame_size: usize, options: &SampleOptions) -> Result<()> {
    let rgba_size = (encoding.width as usize)
        .checked_mul(encoding.height as usize)
        .and_then(|n| n.checked_mul(4));

    match rgba_size {
        Some(rgba_size) if frame_size <= options.memory_limit && rgba_size <= options.memory_limit => Ok(()),
        _ => Err(SampleError::Resource(format!(
            "{}x{} image exceeds the {} byte memory limit",
            encoding.width, encoding.height, options.memory_limit
        ))),
    }
}

fn open<R: Read>(reader: R, options: &SampleOptions) -> Result<png::Reader<R>> {
    let mut limits = png::Limits::default();
    limits.bytes = options.memory_limit;

    let mut decoder = png::Decoder::new_with_limits(reader, limits);
    // Raw samples only: every conversion happens in our own stages.
    decoder.set_transformations(png::Transformations::IDENTITY);
    Ok(decoder.read_info()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_parses_with_whitespace() {
        assert_eq!("12,34".parse(), Ok(Point::new(12, 34)));
        assert_eq!(" 7 , 0 ".parse(), Ok(Point::new(7, 0)));
        assert!("12".parse::<Point>().is_err());
        assert!("-1,3".parse::<Point>().is_err());
        assert!("a,b".parse::<Point>().is_err());
    }

    #[test]
    fn rgba_formats_like_the_cli() {
        let c = Rgba::new(12, 200, 64, 128);
        assert_eq!(c.to_string(), "RGB(12, 200, 64)");
        assert_eq!(c.to_hex(), "#0CC840");
        assert_eq!(c.to_hex_alpha(), "#0CC84080");
        assert!(!c.is_opaque());
    }

    #[test]
    fn limits_exceeded_maps_to_resource() {
        let err: SampleError = png::DecodingError::LimitsExceeded.into();
        assert!(matches!(err, SampleError::Resource(_)));
    }
}
