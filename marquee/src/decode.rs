// decode.rs
//
// Copyright (c) 2019-2025  Douglas Lau
//
//! Incremental GIF frame decoding
use crate::block::{
    loop_count, BlockCode, ColorTable, DisposalMethod, ExtensionCode,
    FrameDescriptor, GifDescriptor, GraphicControl, ScreenDesc,
};
use crate::error::{Error, Result};
use crate::lzw::Decompressor;
use crate::sink::PixelSink;
use crate::stream::Stream;

/// Maximum sub-block size
const SUB_BLOCK_SZ: usize = 255;

/// Interlaced row passes (start, step)
const PASSES: [(u32, u32); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Decoder state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Not started, or reset after an error
    Idle,
    /// Header parsed, no frames decoded yet
    HeaderParsed,
    /// At least one frame decoded
    FrameReady,
    /// Trailer reached
    Exhausted,
}

/// Result of decoding one step of an animation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// A frame was drawn, to be shown for a delay
    Frame {
        /// Delay in milliseconds
        delay_ms: u32,
    },
    /// No more frames
    EndOfAnimation,
}

/// Incremental GIF decoder.
///
/// Bytes are pulled from the stream on demand; the animation is never held
/// in memory.  Each call to
/// [decode_next_frame](struct.Decoder.html#method.decode_next_frame) draws
/// one frame into a [PixelSink](trait.PixelSink.html).
///
/// ## Example
/// ```
/// use marquee::{Decoder, MemoryStream, NullSink, Step};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let gif = &[
/// #   0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00,
/// #   0x02, 0x00, 0x80, 0x01, 0x00, 0x00, 0x00, 0x00,
/// #   0xff, 0xff, 0xff, 0x2c, 0x00, 0x00, 0x00, 0x00,
/// #   0x02, 0x00, 0x02, 0x00, 0x00, 0x02, 0x03, 0x0c,
/// #   0x10, 0x05, 0x00, 0x3b,
/// # ][..];
/// let mut decoder = Decoder::new(MemoryStream::new(gif));
/// decoder.start_decoding()?;
/// while let Step::Frame { delay_ms } = decoder.decode_next_frame(&mut NullSink)? {
///     println!("frame: {} ms", delay_ms);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Decoder<S: Stream> {
    /// Byte stream
    stream: S,
    /// Stream size
    size: u64,
    /// Current state
    state: State,
    /// Delay for frames without one
    default_delay_ms: u32,
    /// Maximum image size, in pixels
    max_image_sz: Option<usize>,
    /// Animation descriptor
    descriptor: Option<GifDescriptor>,
    /// Previous frame, pending disposal
    frame: Option<FrameDescriptor>,
    /// Number of frames decoded
    frame_count: usize,
    /// Sub-block buffer
    buf: Vec<u8>,
    /// Decompressed color indices
    indices: Vec<u8>,
}

/// Writes decompressed indices into a sink
struct PixelWriter {
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    interlaced: bool,
    transparent: Option<u8>,
    table: ColorTable,
    /// Number of pixels written
    n_pixels: usize,
    /// Number of extra pixels ignored
    n_extra: usize,
}

impl<S: Stream> Decoder<S> {
    /// Create a new decoder
    pub fn new(stream: S) -> Self {
        Decoder {
            stream,
            size: 0,
            state: State::Idle,
            default_delay_ms: 100,
            max_image_sz: Some(1 << 25),
            descriptor: None,
            frame: None,
            frame_count: 0,
            buf: vec![0; SUB_BLOCK_SZ],
            indices: Vec::with_capacity(4096),
        }
    }

    /// Set the delay used for frames with zero delay
    pub fn with_default_delay_ms(mut self, delay_ms: u32) -> Self {
        self.default_delay_ms = delay_ms;
        self
    }

    /// Set the maximum image size (in pixels) to allow for decoding.
    pub fn max_image_sz(mut self, max_image_sz: Option<usize>) -> Self {
        self.max_image_sz = max_image_sz;
        self
    }

    /// Get the current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Get the animation descriptor (after decoding has started)
    pub fn descriptor(&self) -> Option<&GifDescriptor> {
        self.descriptor.as_ref()
    }

    /// Get the most recently decoded frame
    pub fn frame(&self) -> Option<&FrameDescriptor> {
        self.frame.as_ref()
    }

    /// Get the number of frames decoded since starting
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Discard the decode session
    fn reset(&mut self) {
        self.state = State::Idle;
        self.descriptor = None;
        self.frame = None;
        self.frame_count = 0;
    }

    /// Start decoding from the beginning of the stream.
    ///
    /// The header, logical screen descriptor and global color table are
    /// read, along with any loop count.
    pub fn start_decoding(&mut self) -> Result<&GifDescriptor> {
        self.reset();
        match self.read_preamble() {
            Ok(descriptor) => {
                debug!("start: {:?}", descriptor);
                self.state = State::HeaderParsed;
                Ok(self.descriptor.insert(descriptor))
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    /// Read the blocks before the first frame
    fn read_preamble(&mut self) -> Result<GifDescriptor> {
        self.size = self.stream.size()?;
        self.stream.seek(0)?;
        let mut header = [0; 6];
        self.read_exact(&mut header).map_err(short_header)?;
        if &header[..3] != b"GIF" {
            return Err(Error::MalformedHeader);
        }
        let version = [header[3], header[4], header[5]];
        if &version != b"87a" && &version != b"89a" {
            return Err(Error::UnsupportedVersion(version));
        }
        let mut buf = [0; ScreenDesc::SIZE];
        self.read_exact(&mut buf).map_err(short_header)?;
        let screen = ScreenDesc::from_buf(&buf);
        let global_color_table = match screen.color_table_size() {
            0 => None,
            sz => {
                let mut buf = vec![0; sz];
                self.read_exact(&mut buf).map_err(short_header)?;
                Some(ColorTable::from_buf(&buf))
            }
        };
        let loop_count = self.read_loop_count()?;
        Ok(GifDescriptor {
            version,
            width: screen.width,
            height: screen.height,
            global_color_table,
            background_color_idx: screen.background_color_idx,
            pixel_aspect_ratio: screen.pixel_aspect_ratio,
            loop_count,
        })
    }

    /// Scan leading extensions for a loop count
    fn read_loop_count(&mut self) -> Result<Option<u16>> {
        let mut count = None;
        loop {
            let pos = self.stream.position();
            let code = self.stream.read_byte()?;
            let label = self.stream.read_byte()?;
            match (code, label.map(ExtensionCode::from)) {
                (Some(b'!'), Some(ExtensionCode::Application_)) => {
                    let id_len = self.read_sub_block()?;
                    if id_len == 0 {
                        continue;
                    }
                    let app_id = self.buf[..id_len].to_vec();
                    let len = self.read_sub_block()?;
                    if len > 0 {
                        let data = &self.buf[..len];
                        count = count.or_else(|| loop_count(&app_id, data));
                        self.skip_sub_blocks()?;
                    }
                }
                (Some(b'!'), Some(ExtensionCode::Comment_)) => {
                    self.skip_sub_blocks()?;
                }
                _ => {
                    self.stream.seek(pos)?;
                    return Ok(count);
                }
            }
        }
    }

    /// Decode the next frame into a sink.
    ///
    /// On error, the session is discarded and decoding must be started
    /// again.
    pub fn decode_next_frame<K: PixelSink>(
        &mut self,
        sink: &mut K,
    ) -> Result<Step> {
        match self.state {
            State::Idle => return Err(Error::NotStarted),
            State::Exhausted => return Ok(Step::EndOfAnimation),
            _ => (),
        }
        match self.decode_frame(sink) {
            Ok(step) => Ok(step),
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    /// Decode blocks until a frame or the trailer
    fn decode_frame<K: PixelSink>(&mut self, sink: &mut K) -> Result<Step> {
        if self.state == State::HeaderParsed {
            let (width, height) = self.canvas_size();
            sink.begin(width, height);
            sink.clear();
        }
        let mut control = None;
        loop {
            let code = self.read_byte()?;
            match BlockCode::from_u8(code) {
                Some(BlockCode::Extension_) => {
                    let label = ExtensionCode::from(self.read_byte()?);
                    trace!("extension: {:?}", label);
                    match label {
                        ExtensionCode::GraphicControl_ => {
                            control = Some(self.read_graphic_control()?);
                        }
                        _ => self.skip_sub_blocks()?,
                    }
                }
                Some(BlockCode::ImageDesc_) => {
                    return self.decode_image(sink, control);
                }
                Some(BlockCode::Trailer_) => {
                    debug!("end after {} frames", self.frame_count);
                    self.state = State::Exhausted;
                    return Ok(Step::EndOfAnimation);
                }
                None => return Err(Error::InvalidBlockCode(code)),
            }
        }
    }

    /// Get the canvas size
    fn canvas_size(&self) -> (u16, u16) {
        self.descriptor
            .as_ref()
            .map(|d| (d.width, d.height))
            .unwrap_or_default()
    }

    /// Read a graphic control extension
    fn read_graphic_control(&mut self) -> Result<GraphicControl> {
        let len = self.read_sub_block()?;
        let control = GraphicControl::from_buf(&self.buf[..len])?;
        self.skip_sub_blocks()?;
        Ok(control)
    }

    /// Decode one image (descriptor, color table and data)
    fn decode_image<K: PixelSink>(
        &mut self,
        sink: &mut K,
        control: Option<GraphicControl>,
    ) -> Result<Step> {
        let mut buf = [0; FrameDescriptor::SIZE];
        self.read_exact(&mut buf)?;
        let mut frame = FrameDescriptor::from_buf(&buf);
        frame.graphic_control = control;
        let sz = frame.color_table_size();
        if sz > 0 {
            let mut buf = vec![0; sz];
            self.read_exact(&mut buf)?;
            frame.local_color_table = Some(ColorTable::from_buf(&buf));
        }
        debug!("frame: {:?}", frame);
        if let Some(max_image_sz) = self.max_image_sz {
            if frame.image_sz() > max_image_sz {
                return Err(Error::TooLargeImage);
            }
        }
        let table = frame
            .local_color_table
            .clone()
            .or_else(|| {
                self.descriptor
                    .as_ref()
                    .and_then(|d| d.global_color_table.clone())
            })
            .ok_or(Error::MissingColorTable)?;
        let min_code_bits = self.read_byte()?;
        if !(2..=11).contains(&min_code_bits) {
            return Err(Error::InvalidCodeSize(min_code_bits));
        }
        if let Some(prev) = self.frame.take() {
            match prev.disposal_method() {
                DisposalMethod::Background => sink.clear_region(prev.region()),
                DisposalMethod::Previous => sink.restore_region(prev.region()),
                _ => (),
            }
        }
        if frame.disposal_method() == DisposalMethod::Previous {
            sink.save_region(frame.region());
        }
        let mut writer = PixelWriter::new(&frame, table);
        self.decode_image_data(sink, min_code_bits, &mut writer)?;
        if writer.n_extra > 0 {
            warn!("ignored {} extra pixels", writer.n_extra);
        }
        sink.frame_complete();
        let delay_ms = frame.delay_ms(self.default_delay_ms);
        self.frame = Some(frame);
        self.frame_count += 1;
        self.state = State::FrameReady;
        Ok(Step::Frame { delay_ms })
    }

    /// Decompress image data sub-blocks
    fn decode_image_data<K: PixelSink>(
        &mut self,
        sink: &mut K,
        min_code_bits: u8,
        writer: &mut PixelWriter,
    ) -> Result<()> {
        let mut dec = Decompressor::new(min_code_bits);
        loop {
            let len = self.read_sub_block()?;
            if len == 0 {
                break;
            }
            self.indices.clear();
            dec.decompress(&self.buf[..len], &mut self.indices)?;
            for idx in &self.indices {
                writer.write(sink, *idx)?;
            }
            if dec.is_done() {
                // data after the end code is ignored
                return self.skip_sub_blocks();
            }
        }
        if writer.is_complete() {
            Ok(())
        } else {
            Err(Error::IncompleteImageData)
        }
    }

    /// Read one byte, failing at end of stream
    fn read_byte(&mut self) -> Result<u8> {
        self.stream.read_byte()?.ok_or(Error::UnexpectedEndOfFile)
    }

    /// Fill a buffer completely
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.stream.read_block(buf)? == buf.len() {
            Ok(())
        } else {
            Err(Error::UnexpectedEndOfFile)
        }
    }

    /// Read one sub-block into the buffer, returning its length
    fn read_sub_block(&mut self) -> Result<usize> {
        let len = usize::from(self.read_byte()?);
        if len > 0 {
            let n = self.stream.read_block(&mut self.buf[..len])?;
            if n < len {
                return Err(Error::UnexpectedEndOfFile);
            }
        }
        Ok(len)
    }

    /// Skip sub-blocks up to and including the terminator
    fn skip_sub_blocks(&mut self) -> Result<()> {
        loop {
            let len = self.read_byte()?;
            if len == 0 {
                return Ok(());
            }
            let pos = self.stream.position() + u64::from(len);
            if pos > self.size {
                return Err(Error::UnexpectedEndOfFile);
            }
            self.stream.seek(pos)?;
        }
    }
}

/// Treat a short header as malformed
fn short_header(err: Error) -> Error {
    match err {
        Error::UnexpectedEndOfFile => Error::MalformedHeader,
        _ => err,
    }
}

/// Get the canvas row of an interlaced image row
fn interlaced_row(row: u32, height: u32) -> u32 {
    let mut row = row;
    for (start, step) in PASSES {
        let rows = (height.saturating_sub(start) + step - 1) / step;
        if row < rows {
            return start + row * step;
        }
        row -= rows;
    }
    row
}

impl PixelWriter {
    /// Create a pixel writer for a frame
    fn new(frame: &FrameDescriptor, table: ColorTable) -> Self {
        PixelWriter {
            left: frame.left.into(),
            top: frame.top.into(),
            width: frame.width.into(),
            height: frame.height.into(),
            interlaced: frame.interlaced(),
            transparent: frame.transparent_color(),
            table,
            n_pixels: 0,
            n_extra: 0,
        }
    }

    /// Check if all pixels have been written
    fn is_complete(&self) -> bool {
        self.n_pixels >= self.width as usize * self.height as usize
    }

    /// Write the next pixel
    fn write<K: PixelSink>(&mut self, sink: &mut K, idx: u8) -> Result<()> {
        if self.width == 0 || self.is_complete() {
            self.n_extra += 1;
            return Ok(());
        }
        let n = self.n_pixels;
        self.n_pixels += 1;
        if self.transparent == Some(idx) {
            return Ok(());
        }
        let clr = self.table.get(idx).ok_or(Error::InvalidColorIndex(idx))?;
        let col = (n % self.width as usize) as u32;
        let row = (n / self.width as usize) as u32;
        let row = if self.interlaced {
            interlaced_row(row, self.height)
        } else {
            row
        };
        let x = self.left + col as i32;
        let y = self.top + row as i32;
        sink.draw_pixel(x, y, clr);
        Ok(())
    }
}
