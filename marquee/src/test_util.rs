// test_util.rs
//
// Copyright (c) 2025  Douglas Lau
//
//! Helpers shared by unit tests
use crate::error::Result;
use crate::sink::{PixelSink, Region};
use crate::surface::Panel;
use pix::rgb::SRgb8;
use pix::Raster;

/// Pack LZW codes (code, bit width), least significant bit first
pub fn pack_codes(codes: &[(u16, u8)]) -> Vec<u8> {
    let mut bytes = vec![];
    let mut acc = 0u32;
    let mut n_bits = 0;
    for (code, width) in codes {
        acc |= u32::from(*code) << n_bits;
        n_bits += width;
        while n_bits >= 8 {
            bytes.push(acc as u8);
            acc >>= 8;
            n_bits -= 8;
        }
    }
    if n_bits > 0 {
        bytes.push(acc as u8);
    }
    bytes
}

/// Compress indices, with a clear code before every literal
pub fn compress(min_code_bits: u8, indices: &[u8]) -> Vec<u8> {
    let clear = 1 << min_code_bits;
    let width = min_code_bits + 1;
    let mut codes = vec![];
    for idx in indices {
        codes.push((clear, width));
        codes.push((u16::from(*idx), width));
    }
    codes.push((clear + 1, width));
    pack_codes(&codes)
}

/// Split data into sub-blocks, with a terminator
pub fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

/// Frame for building test GIFs
#[derive(Clone, Debug, Default)]
pub struct TestFrame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub delay_cs: u16,
    pub disposal: u8,
    pub transparent: Option<u8>,
    pub interlaced: bool,
    pub indices: Vec<u8>,
}

impl TestFrame {
    /// Create a frame at the origin
    pub fn new(width: u16, height: u16, indices: &[u8]) -> Self {
        TestFrame {
            width,
            height,
            indices: indices.to_vec(),
            ..Default::default()
        }
    }

    pub fn with_position(mut self, left: u16, top: u16) -> Self {
        self.left = left;
        self.top = top;
        self
    }

    pub fn with_delay_cs(mut self, delay_cs: u16) -> Self {
        self.delay_cs = delay_cs;
        self
    }

    pub fn with_disposal(mut self, disposal: u8) -> Self {
        self.disposal = disposal;
        self
    }

    pub fn with_transparent(mut self, idx: u8) -> Self {
        self.transparent = Some(idx);
        self
    }

    pub fn with_interlaced(mut self) -> Self {
        self.interlaced = true;
        self
    }
}

/// Number of size bits for a color table
fn table_bits(len: usize) -> u8 {
    let mut bits = 1;
    while (1 << bits) < len {
        bits += 1;
    }
    bits
}

/// Build a GIF89a with a global color table
pub fn build_gif(
    width: u16,
    height: u16,
    palette: &[[u8; 3]],
    loop_count: Option<u16>,
    frames: &[TestFrame],
) -> Vec<u8> {
    let bits = table_bits(palette.len());
    let mut gif = b"GIF89a".to_vec();
    gif.extend_from_slice(&width.to_le_bytes());
    gif.extend_from_slice(&height.to_le_bytes());
    gif.extend_from_slice(&[0x80 | (bits - 1), 0, 0]);
    for i in 0..1 << bits {
        gif.extend_from_slice(&palette.get(i).copied().unwrap_or([0; 3]));
    }
    if let Some(count) = loop_count {
        gif.extend_from_slice(b"\x21\xFF\x0BNETSCAPE2.0\x03\x01");
        gif.extend_from_slice(&count.to_le_bytes());
        gif.push(0);
    }
    let min_code_bits = bits.max(2);
    for frame in frames {
        let flags = (frame.disposal << 2) | u8::from(frame.transparent.is_some());
        gif.extend_from_slice(&[0x21, 0xF9, 0x04, flags]);
        gif.extend_from_slice(&frame.delay_cs.to_le_bytes());
        gif.extend_from_slice(&[frame.transparent.unwrap_or(0), 0]);
        gif.push(0x2C);
        for v in [frame.left, frame.top, frame.width, frame.height] {
            gif.extend_from_slice(&v.to_le_bytes());
        }
        gif.push(if frame.interlaced { 0x40 } else { 0 });
        gif.push(min_code_bits);
        gif.extend(sub_blocks(&compress(min_code_bits, &frame.indices)));
    }
    gif.push(0x3B);
    gif
}

/// 1x1 GIF with a single red pixel
pub const RED_PIXEL: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00,
    0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
    0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// Offset of the delay in `RED_PIXEL`
pub const RED_PIXEL_DELAY: usize = 23;

/// Recorded sink call
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Begin(u16, u16),
    Clear,
    ClearRegion(Region),
    Save(Region),
    Restore(Region),
    Pixel(i32, i32, SRgb8),
    Complete,
}

/// Sink which records all calls
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub size: Option<(u16, u16)>,
    pub clears: usize,
    pub cleared: Vec<Region>,
    pub pixels: Vec<(i32, i32, SRgb8)>,
    pub frames: usize,
    pub calls: Vec<Call>,
}

impl PixelSink for RecordingSink {
    fn begin(&mut self, width: u16, height: u16) {
        self.size = Some((width, height));
        self.calls.push(Call::Begin(width, height));
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.calls.push(Call::Clear);
    }

    fn clear_region(&mut self, region: Region) {
        self.cleared.push(region);
        self.calls.push(Call::ClearRegion(region));
    }

    fn save_region(&mut self, region: Region) {
        self.calls.push(Call::Save(region));
    }

    fn restore_region(&mut self, region: Region) {
        self.calls.push(Call::Restore(region));
    }

    fn draw_pixel(&mut self, x: i32, y: i32, clr: SRgb8) {
        self.pixels.push((x, y, clr));
        self.calls.push(Call::Pixel(x, y, clr));
    }

    fn frame_complete(&mut self) {
        self.frames += 1;
        self.calls.push(Call::Complete);
    }
}

/// Panel which captures every shown frame
#[derive(Debug, Default)]
pub struct CapturePanel {
    pub frames: Vec<Vec<SRgb8>>,
    pub captions: Vec<Option<String>>,
}

impl CapturePanel {
    /// Get the last shown frame
    pub fn last(&self) -> Option<&[SRgb8]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl Panel for CapturePanel {
    fn show(
        &mut self,
        raster: &Raster<SRgb8>,
        caption: Option<&str>,
    ) -> Result<()> {
        self.frames.push(raster.pixels().to_vec());
        self.captions.push(caption.map(str::to_string));
        Ok(())
    }
}

#[test]
fn packed_red_pixel() {
    assert_eq!(pack_codes(&[(4, 3), (0, 3), (5, 3)]), [0x44, 0x01]);
}
