//! # grab_pixel
//!
//! Reads the exact color of a single pixel out of a PNG screenshot.
//!
//! ## Features
//!
//! - **Every PNG encoding**: indexed, grayscale, grayscale+alpha, RGB and RGBA
//!   at 1, 2, 4, 8 and 16 bits per sample, interlaced or not, with or without
//!   a `tRNS` chunk.
//! - **Bit-exact**: 16-bit samples are truncated to their most significant
//!   byte, sub-byte grays are scaled by bit replication.
//! - **No surprises**: every failure is a typed [`SampleError`]; the decoder
//!   never logs, panics or exits.
//!
//! ## Quick Start
//!
//! ```ignore
//! use grab_pixel::{sample, Point};
//!
//! let png = std::fs::read("screenshot.png")?;
//! let color = sample(&png, Point::new(120, 48))?;
//! println!("{} = {}", color, color.to_hex());
//! ```
//!
//! ### Sampling straight from a file
//!
//! ```ignore
//! use grab_pixel::{sample_reader, Point, SampleOptions};
//!
//! let file = std::io::BufReader::new(std::fs::File::open("screenshot.png")?);
//! let color = sample_reader(file, Point::new(0, 0), &SampleOptions::default())?;
//! assert!(color.a == 255);
//! ```

use thiserror::Error;

pub mod decoder;
pub mod normalize;
pub mod raster;

pub use decoder::{
    probe, sample, sample_reader, sample_with_options, ParsePointError, Point, Rgba, SampleOptions,
};
pub use raster::{ColorModel, SourceEncoding};

/// Errors that can occur while sampling a pixel.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The byte stream is not a readable PNG, or it is truncated or corrupt
    #[error("decode error: {0}")]
    Decode(String),

    /// The requested point lies outside the image
    #[error("point ({x}, {y}) is outside the {width}x{height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// The raster buffer could not be allocated
    #[error("resource error: {0}")]
    Resource(String),
}

/// Result type for sampling operations.
pub type Result<T> = core::result::Result<T, SampleError>;

/// Default upper bound on decoder memory, large enough for multi-monitor 8K captures.
pub(crate) const DEFAULT_MEMORY_LIMIT: usize = 512 * 1024 * 1024;
