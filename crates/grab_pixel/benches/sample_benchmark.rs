use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grab_pixel::{sample, Point};
use std::hint::black_box;

/// Screen-like content: flat UI panels with a gradient, so it compresses like a capture.
fn synthetic_screen(width: u32, height: u32, channels: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * channels);
    for y in 0..height {
        for x in 0..width {
            let panel = ((x / 240) + (y / 135)) % 3;
            let shade = (x * 255 / width) as u8;
            let px = [shade, 40 + panel as u8 * 60, 255 - shade, 255];
            pixels.extend_from_slice(&px[..channels]);
        }
    }
    pixels
}

fn encode(width: u32, height: u32, color: png::ColorType, pixels: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().expect("write header");
        writer.write_image_data(pixels).expect("write image data");
    }
    out
}

fn bench_screens(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_screen");
    group.sample_size(20);

    let screens = [
        ("1080p_rgb", 1920, 1080, png::ColorType::Rgb, 3),
        ("4k_rgba", 3840, 2160, png::ColorType::Rgba, 4),
    ];

    for (name, width, height, color, channels) in screens {
        let png = encode(width, height, color, &synthetic_screen(width, height, channels));
        group.throughput(Throughput::Bytes(png.len() as u64));
        group.bench_with_input(BenchmarkId::new("center", name), &png, |b, data| {
            b.iter(|| {
                let result = sample(black_box(data), Point::new(width / 2, height / 2));
                assert!(result.is_ok());
                result
            })
        });
    }

    group.finish();
}

fn bench_out_of_bounds(c: &mut Criterion) {
    let png = encode(1920, 1080, png::ColorType::Rgb, &synthetic_screen(1920, 1080, 3));
    c.bench_function("reject_out_of_bounds", |b| {
        b.iter(|| {
            let result = sample(black_box(&png), Point::new(1920, 0));
            assert!(result.is_err());
            result
        })
    });
}

criterion_group!(benches, bench_screens, bench_out_of_bounds);
criterion_main!(benches);
