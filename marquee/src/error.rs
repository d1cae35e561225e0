// error.rs
//
// Copyright (c) 2019-2025  Douglas Lau
//
use std::fmt;
use std::io;

/// Errors encountered while reading, decoding or playing animations
#[derive(Debug)]
pub enum Error {
    /// A wrapped I/O error.
    Io(io::Error),
    /// Stream ended in the middle of a block.
    UnexpectedEndOfFile,
    /// Seek position beyond the end of the stream.
    SeekOutOfRange(u64),
    /// No animation file with this index.
    InvalidFileIndex(usize),
    /// Header block malformed or missing.
    MalformedHeader,
    /// GIF version not supported (87a or 89a only).
    UnsupportedVersion([u8; 3]),
    /// Invalid block introducer.
    InvalidBlockCode(u8),
    /// Graphic control extension has invalid length.
    MalformedGraphicControlExtension,
    /// LZW minimum code size out of range.
    InvalidCodeSize(u8),
    /// Compressed LZW data invalid or corrupt.
    InvalidLzwData,
    /// Image data ended before all pixels were decoded.
    IncompleteImageData,
    /// Missing color table for a frame.
    MissingColorTable,
    /// Color index outside of the active color table.
    InvalidColorIndex(u8),
    /// Frame larger than the configured maximum image size.
    TooLargeImage,
    /// Frame requested before decoding was started.
    NotStarted,
    /// No animation files available.
    NoAnimationFiles,
}

/// Broad category of an [Error](enum.Error.html)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Stream unavailable or short read
    Io,
    /// Malformed GIF data
    Format,
    /// Nothing to play
    ResourceExhausted,
}

/// Marquee result type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Get the error category
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            Io(_) | UnexpectedEndOfFile | SeekOutOfRange(_)
            | InvalidFileIndex(_) => ErrorKind::Io,
            NoAnimationFiles => ErrorKind::ResourceExhausted,
            _ => ErrorKind::Format,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(fmt),
            _ => fmt::Debug::fmt(self, fmt),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds() {
        let err = Error::from(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(Error::UnexpectedEndOfFile.kind(), ErrorKind::Io);
        assert_eq!(Error::InvalidLzwData.kind(), ErrorKind::Format);
        assert_eq!(Error::MalformedHeader.kind(), ErrorKind::Format);
        let err = Error::NoAnimationFiles;
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn display() {
        assert_eq!(Error::TooLargeImage.to_string(), "TooLargeImage");
        let err = Error::InvalidCodeSize(13);
        assert_eq!(err.to_string(), "InvalidCodeSize(13)");
    }
}
