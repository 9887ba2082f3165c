#![no_main]

use arbitrary::Arbitrary;
use grab_pixel::{sample, Point};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    x: u16,
    y: u16,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    // Any byte stream and any point must produce Ok or a typed error, never a panic
    let _ = sample(&input.data, Point::new(input.x as u32, input.y as u32));
});
