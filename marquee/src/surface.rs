// surface.rs
//
// Copyright (c) 2025  Douglas Lau
//
//! Presentation surface: background compositor, overlay and presenter
use crate::buffer::{
    channel, BackBuffer, ColorPlane, FrontBuffer, IndexedPlane,
};
use crate::config::Config;
use crate::error::Result;
use crate::sink::{PixelSink, Region};
use pix::rgb::{Rgb, SRgb8};
use pix::Raster;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Display driven by the presenter
pub trait Panel {
    /// Show one composed frame
    fn show(&mut self, raster: &Raster<SRgb8>, caption: Option<&str>)
        -> Result<()>;
}

/// Shared brightness level (0-255), applied at output time
#[derive(Clone, Debug, Default)]
pub struct Brightness(Arc<AtomicU8>);

impl Brightness {
    /// Create a new brightness handle
    pub fn new(level: u8) -> Self {
        Brightness(Arc::new(AtomicU8::new(level)))
    }

    /// Get the brightness level
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    /// Set the brightness level
    pub fn set(&self, level: u8) {
        self.0.store(level, Ordering::Relaxed)
    }

    /// Adjust the brightness level, clamped to `0..=max`
    pub fn adjust(&self, delta: i16, max: u8) -> u8 {
        let level = (i16::from(self.get()) + delta).clamp(0, i16::from(max));
        let level = level as u8;
        self.set(level);
        level
    }
}

/// Scale one color by a brightness level
fn dim(clr: SRgb8, level: u8) -> SRgb8 {
    let scale = |c: u8| (u16::from(c) * u16::from(level) / 255) as u8;
    SRgb8::new(
        scale(u8::from(Rgb::red(clr))),
        scale(u8::from(Rgb::green(clr))),
        scale(u8::from(Rgb::blue(clr))),
    )
}

/// Background layer, written by the decoder
pub struct Compositor {
    back: BackBuffer<ColorPlane>,
    background: SRgb8,
    saved: Option<(Region, Vec<SRgb8>)>,
}

impl Compositor {
    /// Get the surface width
    pub fn width(&self) -> u32 {
        self.back.plane().width()
    }

    /// Get the surface height
    pub fn height(&self) -> u32 {
        self.back.plane().height()
    }

    /// Get one back plane pixel
    pub fn pixel(&self, x: i32, y: i32) -> Option<SRgb8> {
        self.back.plane().get(x, y)
    }

    /// Publish the back plane for presentation
    pub fn publish(&mut self) {
        self.back.publish();
    }

    /// Clip a region to the surface
    fn clip(&self, region: Region) -> Region {
        region.clip(self.width(), self.height())
    }
}

impl PixelSink for Compositor {
    fn clear(&mut self) {
        let background = self.background;
        self.back.plane_mut().fill(background);
        self.saved = None;
    }

    fn clear_region(&mut self, region: Region) {
        let region = self.clip(region);
        let background = self.background;
        let plane = self.back.plane_mut();
        for (x, y) in region.coords() {
            plane.set(x, y, background);
        }
    }

    fn save_region(&mut self, region: Region) {
        let region = self.clip(region);
        let plane = self.back.plane();
        let pixels = region
            .coords()
            .filter_map(|(x, y)| plane.get(x, y))
            .collect();
        self.saved = Some((region, pixels));
    }

    fn restore_region(&mut self, _region: Region) {
        if let Some((region, pixels)) = self.saved.take() {
            let plane = self.back.plane_mut();
            for ((x, y), clr) in region.coords().zip(pixels) {
                plane.set(x, y, clr);
            }
        }
    }

    fn draw_pixel(&mut self, x: i32, y: i32, clr: SRgb8) {
        self.back.plane_mut().set(x, y, clr);
    }

    fn frame_complete(&mut self) {
        self.publish();
    }
}

/// Indexed overlay layer, for status captions
pub struct Overlay {
    back: BackBuffer<IndexedPlane>,
}

impl Overlay {
    /// Get the overlay width
    pub fn width(&self) -> u32 {
        self.back.plane().width()
    }

    /// Get the overlay height
    pub fn height(&self) -> u32 {
        self.back.plane().height()
    }

    /// Get one index
    pub fn index(&self, x: i32, y: i32) -> Option<u8> {
        self.back.plane().get(x, y)
    }

    /// Get the caption
    pub fn caption(&self) -> Option<&str> {
        self.back.plane().caption()
    }

    /// Set one palette color
    pub fn set_color(&mut self, index: u8, clr: SRgb8) {
        self.back.plane_mut().set_color(index, clr);
    }

    /// Draw one index (0 is transparent)
    pub fn draw_pixel(&mut self, x: i32, y: i32, index: u8) {
        self.back.plane_mut().set(x, y, index);
    }

    /// Fill a region with one index
    pub fn fill_region(&mut self, region: Region, index: u8) {
        let region = region.clip(self.width(), self.height());
        let plane = self.back.plane_mut();
        for (x, y) in region.coords() {
            plane.set(x, y, index);
        }
    }

    /// Fill the whole overlay with one index
    pub fn fill(&mut self, index: u8) {
        self.back.plane_mut().fill(index);
    }

    /// Set the caption
    pub fn set_caption(&mut self, caption: Option<String>) {
        self.back.plane_mut().set_caption(caption);
    }

    /// Publish the overlay for presentation
    pub fn publish(&mut self) {
        self.back.publish();
    }
}

/// Presentation side of the surface
pub struct Presenter {
    background: FrontBuffer<ColorPlane>,
    overlay: FrontBuffer<IndexedPlane>,
    brightness: Brightness,
    output: Raster<SRgb8>,
}

impl Presenter {
    /// Get the brightness handle
    pub fn brightness(&self) -> &Brightness {
        &self.brightness
    }

    /// Refresh the panel.
    ///
    /// Any pending planes are swapped in, then the overlay is composited
    /// over the background with the current brightness.
    pub fn refresh<P: Panel>(&mut self, panel: &mut P) -> Result<()> {
        if self.background.refresh() {
            trace!("background swapped");
        }
        if self.overlay.refresh() {
            trace!("overlay swapped");
        }
        let level = self.brightness.get();
        let overlay = self.overlay.plane();
        let bg = self.background.plane().pixels();
        for ((out, bg), idx) in self
            .output
            .pixels_mut()
            .iter_mut()
            .zip(bg)
            .zip(overlay.indices())
        {
            let clr = if idx != 0 { overlay.color(idx) } else { *bg };
            *out = dim(clr, level);
        }
        panel.show(&self.output, overlay.caption())
    }
}

/// Layered presentation surface
pub struct Surface {
    /// Background layer
    pub compositor: Compositor,
    /// Overlay layer
    pub overlay: Overlay,
    /// Presenter, which may be moved to another thread
    pub presenter: Presenter,
    /// Brightness handle
    pub brightness: Brightness,
}

impl Surface {
    /// Create a new surface
    pub fn new(config: &Config) -> Self {
        let (width, height) = (config.width, config.height);
        let background = config.background;
        let (back, front) = channel(
            || ColorPlane::new(width, height, background),
            config.swap_timeout,
        );
        let (oback, ofront) =
            channel(|| IndexedPlane::new(width, height), config.swap_timeout);
        let brightness = Brightness::new(config.brightness);
        Surface {
            compositor: Compositor {
                back,
                background,
                saved: None,
            },
            overlay: Overlay { back: oback },
            presenter: Presenter {
                background: front,
                overlay: ofront,
                brightness: brightness.clone(),
                output: Raster::with_clear(width, height),
            },
            brightness,
        }
    }
}
