#![allow(dead_code)]

//! In-memory PNG fixtures for the integration tests.

use png::{BitDepth, ColorType};

/// Describes a PNG to build with `png::Encoder`.
pub struct Fixture<'a> {
    pub width: u32,
    pub height: u32,
    pub color: ColorType,
    pub depth: BitDepth,
    pub data: &'a [u8],
    pub palette: Option<&'a [u8]>,
    pub trns: Option<&'a [u8]>,
}

impl<'a> Fixture<'a> {
    pub fn new(width: u32, height: u32, color: ColorType, depth: BitDepth, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            color,
            depth,
            data,
            palette: None,
            trns: None,
        }
    }

    pub fn palette(mut self, palette: &'a [u8]) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn trns(mut self, trns: &'a [u8]) -> Self {
        self.trns = Some(trns);
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(self.color);
            encoder.set_depth(self.depth);
            if let Some(palette) = self.palette {
                encoder.set_palette(palette.to_vec());
            }
            if let Some(trns) = self.trns {
                encoder.set_trns(trns.to_vec());
            }
            let mut writer = encoder.write_header().expect("write PNG header");
            writer.write_image_data(self.data).expect("write PNG data");
            writer.finish().expect("finish PNG");
        }
        out
    }
}

/// Shorthand for an 8-bit fixture without side tables.
pub fn encode_png(width: u32, height: u32, color: ColorType, data: &[u8]) -> Vec<u8> {
    Fixture::new(width, height, color, BitDepth::Eight, data).encode()
}

/// Deterministic pseudo-random bytes, so compressed fixtures stay large.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect()
}

/// Widens 8-bit samples to 16-bit big-endian with the given low byte.
pub fn widen_16(data: &[u8], low: u8) -> Vec<u8> {
    data.iter().flat_map(|&hi| [hi, low]).collect()
}

/// Pass origin and step (x0, y0, dx, dy) of the seven Adam7 passes.
const ADAM7: [(usize, usize, usize, usize); 7] = [
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2),
];

/// Builds an Adam7-interlaced PNG chunk by chunk; `png::Encoder` only writes
/// progressive images.
///
/// `samples` holds one value per channel per pixel in row-major order, each
/// already at `depth` bits.
pub fn adam7(
    width: u32,
    height: u32,
    color: ColorType,
    depth: u8,
    samples: &[u16],
    palette: Option<&[u8]>,
) -> Vec<u8> {
    use std::io::Write;

    let channels = color.samples();
    let (w, h) = (width as usize, height as usize);
    assert_eq!(samples.len(), w * h * channels, "one sample per channel per pixel");

    let mut raw = Vec::new();
    for (x0, y0, dx, dy) in ADAM7 {
        if x0 >= w || y0 >= h {
            continue;
        }
        for y in (y0..h).step_by(dy) {
            raw.push(0); // filter type None
            let row = (x0..w).step_by(dx).flat_map(|x| {
                let i = (y * w + x) * channels;
                samples[i..i + channels].iter().copied()
            });
            raw.extend(pack_row(row, depth));
        }
    }

    let mut zlib = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    zlib.write_all(&raw).expect("compress passes");
    let idat = zlib.finish().expect("finish zlib stream");

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[depth, color as u8, 0, 0, 1]);

    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    write_chunk(&mut out, b"IHDR", &ihdr);
    if let Some(palette) = palette {
        write_chunk(&mut out, b"PLTE", palette);
    }
    write_chunk(&mut out, b"IDAT", &idat);
    write_chunk(&mut out, b"IEND", &[]);
    out
}

/// Packs samples MSB-first at `depth` bits, padding the last byte with zeros.
fn pack_row(samples: impl Iterator<Item = u16>, depth: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let (mut acc, mut used) = (0u8, 0u8);
    for value in samples {
        match depth {
            16 => out.extend_from_slice(&value.to_be_bytes()),
            8 => out.push(value as u8),
            _ => {
                acc |= (value as u8) << (8 - depth - used);
                used += depth;
                if used == 8 {
                    out.push(acc);
                    (acc, used) = (0, 0);
                }
            }
        }
    }
    if used > 0 {
        out.push(acc);
    }
    out
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    let mut crc = crc32fast::Hasher::new();
    crc.update(kind);
    crc.update(data);

    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.finalize().to_be_bytes());
}
