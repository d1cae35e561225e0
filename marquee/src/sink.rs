// sink.rs
//
// Copyright (c) 2025  Douglas Lau
//
//! Pixel sinks receive decoded frames one pixel at a time
use pix::rgb::SRgb8;

/// Rectangular region of a surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Region {
    /// Create a new region
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Region {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the intersection with a `width` × `height` surface
    pub fn clip(self, width: u32, height: u32) -> Self {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width))
            .min(i64::from(width))
            .max(i64::from(x0));
        let y1 = (i64::from(self.y) + i64::from(self.height))
            .min(i64::from(height))
            .max(i64::from(y0));
        let width = (x1 - i64::from(x0)) as u32;
        let height = (y1 - i64::from(y0)) as u32;
        Region::new(x0, y0, width, height)
    }

    /// Check if the region is empty
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Iterate over all coordinates, row by row
    pub fn coords(self) -> impl Iterator<Item = (i32, i32)> {
        let (x, w) = (self.x, self.width as i32);
        let (y, h) = (self.y, self.height as i32);
        (y..y + h).flat_map(move |row| (x..x + w).map(move |col| (col, row)))
    }
}

/// Target for decoded pixels.
///
/// The decoder calls `begin` and `clear` before the first frame of an
/// animation, the region callbacks for frame disposal, `draw_pixel` for each
/// opaque pixel and `frame_complete` once a frame is fully decoded.
pub trait PixelSink {
    /// Start an animation with the given canvas size
    fn begin(&mut self, _width: u16, _height: u16) {}

    /// Clear the whole surface
    fn clear(&mut self);

    /// Clear one region to the background
    fn clear_region(&mut self, region: Region);

    /// Save a region before drawing over it
    fn save_region(&mut self, _region: Region) {}

    /// Restore a previously saved region
    fn restore_region(&mut self, _region: Region) {}

    /// Draw one pixel
    fn draw_pixel(&mut self, x: i32, y: i32, clr: SRgb8);

    /// Frame is complete
    fn frame_complete(&mut self);
}

impl<K: PixelSink + ?Sized> PixelSink for &mut K {
    fn begin(&mut self, width: u16, height: u16) {
        (**self).begin(width, height)
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn clear_region(&mut self, region: Region) {
        (**self).clear_region(region)
    }

    fn save_region(&mut self, region: Region) {
        (**self).save_region(region)
    }

    fn restore_region(&mut self, region: Region) {
        (**self).restore_region(region)
    }

    fn draw_pixel(&mut self, x: i32, y: i32, clr: SRgb8) {
        (**self).draw_pixel(x, y, clr)
    }

    fn frame_complete(&mut self) {
        (**self).frame_complete()
    }
}

/// Sink which discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl PixelSink for NullSink {
    fn clear(&mut self) {}
    fn clear_region(&mut self, _region: Region) {}
    fn draw_pixel(&mut self, _x: i32, _y: i32, _clr: SRgb8) {}
    fn frame_complete(&mut self) {}
}

/// Uniform fit of a canvas onto a surface.
///
/// Scale factor is `num / den`, never above 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fit {
    num: u32,
    den: u32,
    width: u32,
    height: u32,
    off_x: i32,
    off_y: i32,
}

impl Fit {
    /// Fit a `cw` × `ch` canvas onto a `sw` × `sh` surface
    pub fn new(cw: u32, ch: u32, sw: u32, sh: u32) -> Self {
        let (cw, ch) = (cw.max(1), ch.max(1));
        let (sw64, sh64) = (u64::from(sw), u64::from(sh));
        let (num, den) = if sw64 * u64::from(ch) <= sh64 * u64::from(cw) {
            (sw, cw)
        } else {
            (sh, ch)
        };
        let (num, den) = if num >= den { (1, 1) } else { (num, den) };
        let width = scale_floor(cw, num, den);
        let height = scale_floor(ch, num, den);
        let off_x = (i64::from(sw) - i64::from(width)) / 2;
        let off_y = (i64::from(sh) - i64::from(height)) / 2;
        Fit {
            num,
            den,
            width,
            height,
            off_x: off_x as i32,
            off_y: off_y as i32,
        }
    }

    /// Get the scaled width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the scaled height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the offset of the scaled canvas on the surface
    pub fn offset(&self) -> (i32, i32) {
        (self.off_x, self.off_y)
    }

    /// Map one canvas coordinate.
    ///
    /// Returns `None` unless the canvas pixel is the nearest neighbour of a
    /// surface pixel.
    fn map(&self, src: i32, scaled: u32, off: i32) -> Option<i32> {
        let src = u64::try_from(src).ok()?;
        let (num, den) = (u64::from(self.num), u64::from(self.den));
        let dst = (src * num + den - 1) / den;
        if dst * den < (src + 1) * num && dst < u64::from(scaled) {
            Some(off + dst as i32)
        } else {
            None
        }
    }

    /// Map a canvas X coordinate to the surface
    pub fn map_x(&self, x: i32) -> Option<i32> {
        self.map(x, self.width, self.off_x)
    }

    /// Map a canvas Y coordinate to the surface
    pub fn map_y(&self, y: i32) -> Option<i32> {
        self.map(y, self.height, self.off_y)
    }

    /// Map a canvas region to the surface
    pub fn map_region(&self, region: Region) -> Region {
        let (x0, x1) = self.map_span(region.x, region.width, self.width);
        let (y0, y1) = self.map_span(region.y, region.height, self.height);
        Region::new(
            self.off_x + x0 as i32,
            self.off_y + y0 as i32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        )
    }

    /// Map a span to the surface pixels sampling it
    fn map_span(&self, start: i32, len: u32, scaled: u32) -> (u64, u64) {
        let (num, den) = (u64::from(self.num), u64::from(self.den));
        let start = start.max(0) as u64;
        let end = start + u64::from(len);
        let d0 = ((start * num + den - 1) / den).min(u64::from(scaled));
        let d1 = ((end * num + den - 1) / den).min(u64::from(scaled));
        (d0, d1)
    }
}

/// Scale a dimension, rounding down
fn scale_floor(v: u32, num: u32, den: u32) -> u32 {
    (u64::from(v) * u64::from(num) / u64::from(den)) as u32
}

/// Sink adapter which fits the canvas onto a fixed size surface
pub struct ScaledSink<K: PixelSink> {
    /// Wrapped sink
    inner: K,
    /// Surface width
    width: u32,
    /// Surface height
    height: u32,
    /// Current fit
    fit: Fit,
}

impl<K: PixelSink> ScaledSink<K> {
    /// Create a new scaled sink
    pub fn new(inner: K, width: u32, height: u32) -> Self {
        ScaledSink {
            inner,
            width,
            height,
            fit: Fit::new(width, height, width, height),
        }
    }

    /// Get the current fit
    pub fn fit(&self) -> Fit {
        self.fit
    }

    /// Get a reference to the wrapped sink
    pub fn inner(&self) -> &K {
        &self.inner
    }

    /// Get a mutable reference to the wrapped sink
    pub fn inner_mut(&mut self) -> &mut K {
        &mut self.inner
    }

    /// Unwrap the inner sink
    pub fn into_inner(self) -> K {
        self.inner
    }
}

impl<K: PixelSink> PixelSink for ScaledSink<K> {
    fn begin(&mut self, width: u16, height: u16) {
        let (cw, ch) = (width.into(), height.into());
        self.fit = Fit::new(cw, ch, self.width, self.height);
        debug!("fit {}x{} => {:?}", width, height, self.fit);
        self.inner.begin(width, height);
    }

    fn clear(&mut self) {
        self.inner.clear()
    }

    fn clear_region(&mut self, region: Region) {
        self.inner.clear_region(self.fit.map_region(region))
    }

    fn save_region(&mut self, region: Region) {
        self.inner.save_region(self.fit.map_region(region))
    }

    fn restore_region(&mut self, region: Region) {
        self.inner.restore_region(self.fit.map_region(region))
    }

    fn draw_pixel(&mut self, x: i32, y: i32, clr: SRgb8) {
        if let (Some(x), Some(y)) = (self.fit.map_x(x), self.fit.map_y(y)) {
            self.inner.draw_pixel(x, y, clr);
        }
    }

    fn frame_complete(&mut self) {
        self.inner.frame_complete()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::RecordingSink;

    #[test]
    fn region_clip() {
        let r = Region::new(-2, 3, 10, 10).clip(6, 8);
        assert_eq!(r, Region::new(0, 3, 6, 5));
        assert!(Region::new(9, 9, 2, 2).clip(4, 4).is_empty());
        let coords: Vec<_> = Region::new(1, 2, 2, 2).coords().collect();
        assert_eq!(coords, [(1, 2), (2, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn fit_downscale() {
        // 128x64 onto 64x64 => half size, centered vertically
        let fit = Fit::new(128, 64, 64, 64);
        assert_eq!((fit.width(), fit.height()), (64, 32));
        assert_eq!(fit.offset(), (0, 16));
        assert_eq!(fit.map_x(0), Some(0));
        assert_eq!(fit.map_x(1), None);
        assert_eq!(fit.map_x(2), Some(1));
        assert_eq!(fit.map_x(127), None);
        assert_eq!(fit.map_x(126), Some(63));
        assert_eq!(fit.map_y(63), None);
        assert_eq!(fit.map_y(62), Some(16 + 31));
    }

    #[test]
    fn fit_no_upscale() {
        let fit = Fit::new(10, 20, 64, 64);
        assert_eq!((fit.width(), fit.height()), (10, 20));
        assert_eq!(fit.offset(), (27, 22));
        assert_eq!(fit.map_x(0), Some(27));
        assert_eq!(fit.map_y(19), Some(41));
        assert_eq!(fit.map_x(10), None);
        assert_eq!(fit.map_x(-1), None);
    }

    #[test]
    fn fit_every_surface_pixel_once() {
        let fit = Fit::new(100, 70, 64, 32);
        let xs: Vec<_> = (0..100).filter_map(|x| fit.map_x(x)).collect();
        let ys: Vec<_> = (0..70).filter_map(|y| fit.map_y(y)).collect();
        let (ox, oy) = fit.offset();
        let expected: Vec<_> = (ox..ox + fit.width() as i32).collect();
        assert_eq!(xs, expected);
        let expected: Vec<_> = (oy..oy + fit.height() as i32).collect();
        assert_eq!(ys, expected);
    }

    #[test]
    fn fit_region() {
        let fit = Fit::new(128, 128, 64, 64);
        assert_eq!(
            fit.map_region(Region::new(10, 20, 30, 40)),
            Region::new(5, 10, 15, 20)
        );
        let fit = Fit::new(8, 8, 64, 64);
        assert_eq!(
            fit.map_region(Region::new(2, 2, 4, 4)),
            Region::new(30, 30, 4, 4)
        );
    }

    #[test]
    fn scaled_sink() {
        let mut sink = ScaledSink::new(RecordingSink::default(), 4, 4);
        let red = SRgb8::new(255, 0, 0);
        sink.begin(8, 8);
        sink.draw_pixel(0, 0, red);
        sink.draw_pixel(1, 0, red);
        sink.draw_pixel(7, 7, red);
        sink.draw_pixel(6, 6, red);
        sink.clear_region(Region::new(0, 0, 8, 8));
        sink.frame_complete();
        let rec = sink.into_inner();
        assert_eq!(rec.size, Some((8, 8)));
        assert_eq!(rec.pixels, [(0, 0, red), (3, 3, red)]);
        assert_eq!(rec.cleared, [Region::new(0, 0, 4, 4)]);
        assert_eq!(rec.frames, 1);
    }
}
