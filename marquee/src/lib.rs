// lib.rs      marquee crate.
//
// Copyright (c) 2019-2025  Douglas Lau
//
//! Animated GIF slideshow for RGB LED matrices.
//!
//! GIF frames are decoded incrementally from a seekable
//! [Stream](trait.Stream.html), drawn into a double-buffered
//! [Compositor](struct.Compositor.html) and shown on a
//! [Panel](trait.Panel.html) by the [Presenter](struct.Presenter.html).
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod block;
pub mod buffer;
mod catalog;
mod config;
mod decode;
mod error;
mod input;
mod lzw;
mod player;
mod sink;
mod stream;
mod surface;
#[cfg(test)]
mod test_util;

pub use crate::catalog::{
    is_animation_file, list_animation_files, Catalog, Directory, Embedded,
};
pub use crate::config::Config;
pub use crate::decode::{Decoder, State, Step};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::input::{
    Button, ButtonQueue, ButtonSender, Debounce, RemoteInput,
};
pub use crate::lzw::Decompressor;
pub use crate::player::{Player, PlayerState};
pub use crate::sink::{Fit, NullSink, PixelSink, Region, ScaledSink};
pub use crate::stream::{FileStream, MemoryStream, Stream};
pub use crate::surface::{
    Brightness, Compositor, Overlay, Panel, Presenter, Surface,
};
