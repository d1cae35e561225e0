// block.rs
//
// Copyright (c) 2019-2025  Douglas Lau
//
//! GIF block descriptors
use crate::error::{Error, Result};
use crate::sink::Region;
use pix::rgb::SRgb8;

/// Number of bytes per color table entry
const CHANNELS: usize = 3;

/// Block introducer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BlockCode {
    ImageDesc_,
    Extension_,
    Trailer_,
}

impl BlockCode {
    pub fn from_u8(t: u8) -> Option<Self> {
        use self::BlockCode::*;
        match t {
            b',' => Some(ImageDesc_), // (0x2C) Image separator
            b'!' => Some(Extension_), // (0x21) Extension introducer
            b';' => Some(Trailer_),   // (0x3B) GIF trailer
            _ => None,
        }
    }
}

/// Extension label
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ExtensionCode {
    PlainText_,
    GraphicControl_,
    Comment_,
    Application_,
    Unknown_(u8),
}

impl From<u8> for ExtensionCode {
    fn from(n: u8) -> Self {
        use self::ExtensionCode::*;
        match n {
            0x01 => PlainText_,
            0xF9 => GraphicControl_,
            0xFE => Comment_,
            0xFF => Application_,
            _ => Unknown_(n),
        }
    }
}

/// Method to dispose of a frame before drawing the next one
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum DisposalMethod {
    /// No disposal specified
    #[default]
    NoAction,
    /// Leave frame in place
    Keep,
    /// Restore frame region to background
    Background,
    /// Restore frame region to its previous contents
    Previous,
    /// Reserved value
    Reserved(u8),
}

impl From<u8> for DisposalMethod {
    fn from(n: u8) -> Self {
        use self::DisposalMethod::*;
        match n & 0b0111 {
            0 => NoAction,
            1 => Keep,
            2 => Background,
            3 => Previous,
            _ => Reserved(n & 0b0111),
        }
    }
}

/// Get the number of entries in a color table from packed size bits
fn color_table_len(flags: u8) -> usize {
    2 << (flags & 0b0000_0111) as usize
}

/// Table of RGB colors
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorTable {
    colors: Vec<SRgb8>,
}

impl ColorTable {
    /// Create a color table from packed RGB triples
    pub fn from_buf(buf: &[u8]) -> Self {
        let colors = buf
            .chunks_exact(CHANNELS)
            .map(|c| SRgb8::new(c[0], c[1], c[2]))
            .collect();
        ColorTable { colors }
    }

    /// Get the number of colors
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Check if the table has no colors
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Get one color
    pub fn get(&self, idx: u8) -> Option<SRgb8> {
        self.colors.get(idx as usize).copied()
    }
}

/// Logical screen descriptor, as stored in the file
#[derive(Debug, Default)]
pub(crate) struct ScreenDesc {
    pub width: u16,
    pub height: u16,
    pub flags: u8,
    pub background_color_idx: u8,
    pub pixel_aspect_ratio: u8,
}

impl ScreenDesc {
    /// Size of the block in bytes
    pub const SIZE: usize = 7;
    const COLOR_TABLE_PRESENT: u8 = 0b1000_0000;

    /// Decode a logical screen descriptor from a buffer
    pub fn from_buf(buf: &[u8; Self::SIZE]) -> Self {
        ScreenDesc {
            width: u16::from_le_bytes([buf[0], buf[1]]),
            height: u16::from_le_bytes([buf[2], buf[3]]),
            flags: buf[4],
            background_color_idx: buf[5],
            pixel_aspect_ratio: buf[6],
        }
    }

    /// Get the size of the global color table in bytes
    pub fn color_table_size(&self) -> usize {
        if self.flags & Self::COLOR_TABLE_PRESENT != 0 {
            color_table_len(self.flags) * CHANNELS
        } else {
            0
        }
    }
}

/// Whole-file information, parsed when decoding starts
#[derive(Clone, Debug, Default)]
pub struct GifDescriptor {
    /// Version (`87a` or `89a`)
    pub version: [u8; 3],
    /// Canvas width
    pub width: u16,
    /// Canvas height
    pub height: u16,
    /// Global color table
    pub global_color_table: Option<ColorTable>,
    /// Index of background color in global color table
    pub background_color_idx: u8,
    /// Pixel aspect ratio (0 means square)
    pub pixel_aspect_ratio: u8,
    /// Number of times to loop animation (zero means loop forever)
    pub loop_count: Option<u16>,
}

impl GifDescriptor {
    /// Get the background color, if defined
    pub fn background_color(&self) -> Option<SRgb8> {
        self.global_color_table
            .as_ref()
            .and_then(|t| t.get(self.background_color_idx))
    }
}

/// Graphic control extension
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphicControl {
    flags: u8,
    delay_time_cs: u16, // delay in centiseconds (hundredths of a second)
    transparent_color_idx: u8,
}

impl GraphicControl {
    const DISPOSAL_METHOD: u8 = 0b0001_1100;
    const TRANSPARENT_COLOR: u8 = 0b0000_0001;

    /// Decode a graphic control extension sub-block
    pub fn from_buf(buf: &[u8]) -> Result<Self> {
        if buf.len() == 4 {
            Ok(GraphicControl {
                flags: buf[0],
                delay_time_cs: u16::from_le_bytes([buf[1], buf[2]]),
                transparent_color_idx: buf[3],
            })
        } else {
            Err(Error::MalformedGraphicControlExtension)
        }
    }

    /// Get the disposal method
    pub fn disposal_method(&self) -> DisposalMethod {
        ((self.flags & Self::DISPOSAL_METHOD) >> 2).into()
    }

    /// Get the delay time in centiseconds
    pub fn delay_time_cs(&self) -> u16 {
        self.delay_time_cs
    }

    /// Get the transparent color index
    pub fn transparent_color(&self) -> Option<u8> {
        if self.flags & Self::TRANSPARENT_COLOR != 0 {
            Some(self.transparent_color_idx)
        } else {
            None
        }
    }
}

/// Per-frame information
#[derive(Clone, Debug, Default)]
pub struct FrameDescriptor {
    /// Left position on canvas
    pub left: u16,
    /// Top position on canvas
    pub top: u16,
    /// Frame width
    pub width: u16,
    /// Frame height
    pub height: u16,
    /// Packed image descriptor flags
    flags: u8,
    /// Local color table (overrides global)
    pub local_color_table: Option<ColorTable>,
    /// Graphic control extension preceding the frame
    pub graphic_control: Option<GraphicControl>,
}

impl FrameDescriptor {
    /// Size of the image descriptor block in bytes (without separator)
    pub(crate) const SIZE: usize = 9;
    const COLOR_TABLE_PRESENT: u8 = 0b1000_0000;
    const INTERLACED: u8 = 0b0100_0000;

    /// Decode an image descriptor from a buffer
    pub(crate) fn from_buf(buf: &[u8; Self::SIZE]) -> Self {
        FrameDescriptor {
            left: u16::from_le_bytes([buf[0], buf[1]]),
            top: u16::from_le_bytes([buf[2], buf[3]]),
            width: u16::from_le_bytes([buf[4], buf[5]]),
            height: u16::from_le_bytes([buf[6], buf[7]]),
            flags: buf[8],
            local_color_table: None,
            graphic_control: None,
        }
    }

    /// Get the size of the local color table in bytes
    pub(crate) fn color_table_size(&self) -> usize {
        if self.flags & Self::COLOR_TABLE_PRESENT != 0 {
            color_table_len(self.flags) * CHANNELS
        } else {
            0
        }
    }

    /// Check if rows are interlaced
    pub fn interlaced(&self) -> bool {
        self.flags & Self::INTERLACED != 0
    }

    /// Get the number of pixels
    pub fn image_sz(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Get the region covered on the canvas
    pub fn region(&self) -> Region {
        Region::new(
            self.left.into(),
            self.top.into(),
            self.width.into(),
            self.height.into(),
        )
    }

    /// Get the disposal method
    pub fn disposal_method(&self) -> DisposalMethod {
        self.graphic_control
            .map(|c| c.disposal_method())
            .unwrap_or_default()
    }

    /// Get the transparent color index
    pub fn transparent_color(&self) -> Option<u8> {
        self.graphic_control.and_then(|c| c.transparent_color())
    }

    /// Get the delay time in centiseconds
    pub fn delay_time_cs(&self) -> u16 {
        self.graphic_control
            .map(|c| c.delay_time_cs())
            .unwrap_or_default()
    }

    /// Get the delay time in milliseconds, substituting a default for zero
    pub fn delay_ms(&self, default_ms: u32) -> u32 {
        match self.delay_time_cs() {
            0 => default_ms,
            cs => u32::from(cs) * 10,
        }
    }
}

/// Get loop count from application extension sub-blocks
pub(crate) fn loop_count(app_id: &[u8], data: &[u8]) -> Option<u16> {
    let looping = app_id == b"NETSCAPE2.0" || app_id == b"ANIMEXTS1.0";
    if looping && data.len() == 3 && data[0] == 1 {
        Some(u16::from_le_bytes([data[1], data[2]]))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disposal() {
        assert_eq!(DisposalMethod::from(0), DisposalMethod::NoAction);
        assert_eq!(DisposalMethod::from(1), DisposalMethod::Keep);
        assert_eq!(DisposalMethod::from(2), DisposalMethod::Background);
        assert_eq!(DisposalMethod::from(3), DisposalMethod::Previous);
        assert_eq!(DisposalMethod::from(6), DisposalMethod::Reserved(6));
    }

    #[test]
    fn graphic_control() -> Result<()> {
        let gc = GraphicControl::from_buf(&[0b0000_1001, 0x2C, 0x01, 7])?;
        assert_eq!(gc.disposal_method(), DisposalMethod::Background);
        assert_eq!(gc.delay_time_cs(), 300);
        assert_eq!(gc.transparent_color(), Some(7));
        let gc = GraphicControl::from_buf(&[0b0000_0100, 0, 0, 7])?;
        assert_eq!(gc.disposal_method(), DisposalMethod::Keep);
        assert_eq!(gc.transparent_color(), None);
        assert!(GraphicControl::from_buf(&[0, 0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn frame_delay() -> Result<()> {
        let mut f = FrameDescriptor::default();
        assert_eq!(f.delay_ms(100), 100);
        f.graphic_control = Some(GraphicControl::from_buf(&[0, 0, 0, 0])?);
        assert_eq!(f.delay_ms(100), 100);
        f.graphic_control = Some(GraphicControl::from_buf(&[0, 5, 0, 0])?);
        assert_eq!(f.delay_ms(100), 50);
        Ok(())
    }

    #[test]
    fn color_table_size() {
        let s = ScreenDesc::from_buf(&[1, 0, 1, 0, 0x91, 0, 0]);
        assert_eq!(s.color_table_size(), 12);
        let s = ScreenDesc::from_buf(&[1, 0, 1, 0, 0x17, 0, 0]);
        assert_eq!(s.color_table_size(), 0);
        let f = FrameDescriptor::from_buf(&[0, 0, 0, 0, 2, 0, 2, 0, 0xC7]);
        assert_eq!(f.color_table_size(), 768);
        assert!(f.interlaced());
    }

    #[test]
    fn loop_counts() {
        assert_eq!(loop_count(b"NETSCAPE2.0", &[1, 0, 0]), Some(0));
        assert_eq!(loop_count(b"NETSCAPE2.0", &[1, 4, 1]), Some(260));
        assert_eq!(loop_count(b"ANIMEXTS1.0", &[1, 3, 0]), Some(3));
        assert_eq!(loop_count(b"XMP DataXMP", &[1, 3, 0]), None);
        assert_eq!(loop_count(b"NETSCAPE2.0", &[2, 3, 0]), None);
    }

    #[test]
    fn color_table() {
        let t = ColorTable::from_buf(&[255, 0, 0, 0, 0, 255]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(0), Some(SRgb8::new(255, 0, 0)));
        assert_eq!(t.get(1), Some(SRgb8::new(0, 0, 255)));
        assert_eq!(t.get(2), None);
    }
}
