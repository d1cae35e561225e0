// buffer.rs
//
// Copyright (c) 2025  Douglas Lau
//
//! Double-buffered planes shared between a writer and a presenter
use parking_lot::{Condvar, Mutex};
use pix::gray::{Gray, Gray8};
use pix::rgb::SRgb8;
use pix::Raster;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A plane of pixels which can be staged for presentation
pub trait Plane: Send {
    /// Copy all contents from another plane of the same size
    fn copy_from(&mut self, other: &Self);
}

/// Plane of RGB samples
pub struct ColorPlane {
    raster: Raster<SRgb8>,
}

impl ColorPlane {
    /// Create a plane filled with one color
    pub fn new(width: u32, height: u32, clr: SRgb8) -> Self {
        let mut plane = ColorPlane {
            raster: Raster::with_clear(width, height),
        };
        plane.fill(clr);
        plane
    }

    /// Get the width
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Get the height
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// Get all pixels, row by row
    pub fn pixels(&self) -> &[SRgb8] {
        self.raster.pixels()
    }

    /// Fill the plane with one color
    pub fn fill(&mut self, clr: SRgb8) {
        self.raster.pixels_mut().iter_mut().for_each(|p| *p = clr);
    }

    /// Get one pixel, if in bounds
    pub fn get(&self, x: i32, y: i32) -> Option<SRgb8> {
        if self.contains(x, y) {
            Some(self.raster.pixel(x, y))
        } else {
            None
        }
    }

    /// Set one pixel, ignoring out of bounds coordinates
    pub fn set(&mut self, x: i32, y: i32, clr: SRgb8) {
        if self.contains(x, y) {
            *self.raster.pixel_mut(x, y) = clr;
        }
    }

    /// Check if a coordinate is in bounds
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as u32) < self.width()
            && (y as u32) < self.height()
    }
}

impl Plane for ColorPlane {
    fn copy_from(&mut self, other: &Self) {
        self.raster.pixels_mut().copy_from_slice(other.raster.pixels());
    }
}

/// Plane of palette indices, with index 0 transparent
pub struct IndexedPlane {
    raster: Raster<Gray8>,
    palette: [SRgb8; 256],
    caption: Option<String>,
}

impl IndexedPlane {
    /// Create a fully transparent plane
    pub fn new(width: u32, height: u32) -> Self {
        IndexedPlane {
            raster: Raster::with_clear(width, height),
            palette: [SRgb8::new(0, 0, 0); 256],
            caption: None,
        }
    }

    /// Get the width
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Get the height
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// Get one palette color
    pub fn color(&self, index: u8) -> SRgb8 {
        self.palette[usize::from(index)]
    }

    /// Set one palette color
    pub fn set_color(&mut self, index: u8, clr: SRgb8) {
        self.palette[usize::from(index)] = clr;
    }

    /// Get the caption
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Set the caption
    pub fn set_caption(&mut self, caption: Option<String>) {
        self.caption = caption;
    }

    /// Get all indices, row by row
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.raster.pixels().iter().map(|p| u8::from(Gray::value(*p)))
    }

    /// Fill the plane with one index
    pub fn fill(&mut self, index: u8) {
        let v = Gray8::new(index);
        self.raster.pixels_mut().iter_mut().for_each(|p| *p = v);
    }

    /// Get one index, if in bounds
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if self.contains(x, y) {
            Some(u8::from(Gray::value(self.raster.pixel(x, y))))
        } else {
            None
        }
    }

    /// Set one index, ignoring out of bounds coordinates
    pub fn set(&mut self, x: i32, y: i32, index: u8) {
        if self.contains(x, y) {
            *self.raster.pixel_mut(x, y) = Gray8::new(index);
        }
    }

    /// Check if a coordinate is in bounds
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as u32) < self.width()
            && (y as u32) < self.height()
    }
}

impl Plane for IndexedPlane {
    fn copy_from(&mut self, other: &Self) {
        self.raster.pixels_mut().copy_from_slice(other.raster.pixels());
        self.palette = other.palette;
        self.caption.clone_from(&other.caption);
    }
}

/// Staging slot between the two halves
struct Slot<T> {
    /// Staged plane
    plane: T,
    /// Staged plane not yet taken by the presenter
    pending: bool,
}

/// Rendezvous for one double-buffered plane
struct Exchange<T> {
    slot: Mutex<Slot<T>>,
    presented: Condvar,
}

/// Writer half of a double buffer
pub struct BackBuffer<T: Plane> {
    plane: T,
    exchange: Arc<Exchange<T>>,
    timeout: Option<Duration>,
}

/// Reader half of a double buffer
pub struct FrontBuffer<T: Plane> {
    plane: T,
    exchange: Arc<Exchange<T>>,
}

/// Create a double buffer.
///
/// The `make` function is called once per plane (back, staged and front).
/// `timeout` bounds how long `publish` waits for the presenter.
pub fn channel<T, F>(
    make: F,
    timeout: Option<Duration>,
) -> (BackBuffer<T>, FrontBuffer<T>)
where
    T: Plane,
    F: Fn() -> T,
{
    let exchange = Arc::new(Exchange {
        slot: Mutex::new(Slot {
            plane: make(),
            pending: false,
        }),
        presented: Condvar::new(),
    });
    let back = BackBuffer {
        plane: make(),
        exchange: Arc::clone(&exchange),
        timeout,
    };
    let front = FrontBuffer {
        plane: make(),
        exchange,
    };
    (back, front)
}

impl<T: Plane> BackBuffer<T> {
    /// Get the back plane
    pub fn plane(&self) -> &T {
        &self.plane
    }

    /// Get the back plane for writing
    pub fn plane_mut(&mut self) -> &mut T {
        &mut self.plane
    }

    /// Publish the back plane.
    ///
    /// The whole plane is copied under the lock, so the presenter sees
    /// either the previous or the new contents.  Afterwards, wait until the
    /// presenter takes it or the timeout expires.
    pub fn publish(&mut self) {
        let mut slot = self.exchange.slot.lock();
        slot.plane.copy_from(&self.plane);
        slot.pending = true;
        if let Some(timeout) = self.timeout {
            let deadline = Instant::now() + timeout;
            while slot.pending {
                if self
                    .exchange
                    .presented
                    .wait_until(&mut slot, deadline)
                    .timed_out()
                {
                    debug!("publish timed out");
                    break;
                }
            }
        }
    }
}

impl<T: Plane> FrontBuffer<T> {
    /// Get the front plane
    pub fn plane(&self) -> &T {
        &self.plane
    }

    /// Take a pending plane, if any.
    ///
    /// Returns `true` if the front plane changed.
    pub fn refresh(&mut self) -> bool {
        let mut slot = self.exchange.slot.lock();
        if slot.pending {
            std::mem::swap(&mut slot.plane, &mut self.plane);
            slot.pending = false;
            self.exchange.presented.notify_all();
            true
        } else {
            false
        }
    }
}
