// stream.rs
//
// Copyright (c) 2025  Douglas Lau
//
//! Seekable byte streams for GIF data
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Seekable byte source for one GIF file.
///
/// The position is always within `0..=size`.  Reads advance the position by
/// the number of bytes returned.
pub trait Stream {
    /// Get the total size in bytes
    fn size(&mut self) -> Result<u64>;

    /// Move to an absolute position
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Get the current position
    fn position(&self) -> u64;

    /// Read one byte, or `None` at end of stream
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Read up to `buf.len()` bytes, returning the number read
    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn size(&mut self) -> Result<u64> {
        (**self).size()
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        (**self).seek(pos)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_block(buf)
    }
}

/// Stream backed by a file
pub struct FileStream {
    /// Buffered file reader
    reader: BufReader<File>,
    /// File size, read when opened
    size: u64,
    /// Current position
    pos: u64,
}

impl FileStream {
    /// Open a file for streaming
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(FileStream {
            reader: BufReader::new(file),
            size,
            pos: 0,
        })
    }
}

impl Stream for FileStream {
    fn size(&mut self) -> Result<u64> {
        Ok(self.size)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.size {
            return Err(Error::SeekOutOfRange(pos));
        }
        // keeps the read buffer when the target is inside it
        let offset = pos as i64 - self.pos as i64;
        self.reader.seek_relative(offset)?;
        self.pos = pos;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0; 1];
        match self.read_block(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut len = 0;
        while len < buf.len() {
            match self.reader.read(&mut buf[len..]) {
                Ok(0) => break, // EOF
                Ok(n) => len += n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.pos += len as u64;
        Ok(len)
    }
}

/// Stream backed by an in-memory buffer
#[derive(Clone, Debug)]
pub struct MemoryStream<B: AsRef<[u8]>> {
    /// Buffer of GIF data
    buf: B,
    /// Current position
    pos: usize,
}

impl<B: AsRef<[u8]>> MemoryStream<B> {
    /// Create a new memory stream
    pub fn new(buf: B) -> Self {
        MemoryStream { buf, pos: 0 }
    }

    /// Get the remaining bytes
    fn remaining(&self) -> &[u8] {
        &self.buf.as_ref()[self.pos..]
    }
}

impl<B: AsRef<[u8]>> Stream for MemoryStream<B> {
    fn size(&mut self) -> Result<u64> {
        Ok(self.buf.as_ref().len() as u64)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        match usize::try_from(pos) {
            Ok(p) if p <= self.buf.as_ref().len() => {
                self.pos = p;
                Ok(())
            }
            _ => Err(Error::SeekOutOfRange(pos)),
        }
    }

    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.remaining().first().copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize> {
        let rem = self.remaining();
        let n = rem.len().min(buf.len());
        buf[..n].copy_from_slice(&rem[..n]);
        self.pos += n;
        Ok(n)
    }
}
