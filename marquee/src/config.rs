// config.rs
//
// Copyright (c) 2025  Douglas Lau
//
use pix::rgb::SRgb8;
use std::time::Duration;

/// Player and surface configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Background color
    pub background: SRgb8,
    /// Initial brightness
    pub brightness: u8,
    /// Maximum brightness selectable by remote
    pub max_brightness: u8,
    /// Brightness change per button press
    pub brightness_step: u8,
    /// Minimum time between accepted button presses
    pub debounce: Duration,
    /// Delay used for frames with no delay
    pub default_delay_ms: u32,
    /// Time before status captions are cleared
    pub status_timeout: Duration,
    /// Presentation refresh period
    pub refresh: Duration,
    /// Maximum wait for the presenter after publishing
    pub swap_timeout: Option<Duration>,
    /// Maximum frame size in pixels
    pub max_image_sz: Option<usize>,
    /// Time a decode error is shown before moving on
    pub error_hold: Duration,
    /// Skip files which fail to decode (otherwise retry)
    pub skip_bad_files: bool,
    /// Capacity of remote input queue
    pub input_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            width: 64,
            height: 64,
            background: SRgb8::new(0, 0, 0),
            brightness: 26,
            max_brightness: 180,
            brightness_step: 26,
            debounce: Duration::from_millis(400),
            default_delay_ms: 100,
            status_timeout: Duration::from_secs(3),
            refresh: Duration::from_millis(16),
            swap_timeout: Some(Duration::from_millis(100)),
            max_image_sz: Some(1 << 25),
            error_hold: Duration::from_secs(1),
            skip_bad_files: true,
            input_capacity: 16,
        }
    }
}

impl Config {
    /// Set the surface size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the background color
    pub fn with_background(mut self, clr: SRgb8) -> Self {
        self.background = clr;
        self
    }

    /// Set the initial brightness (clamped to the maximum)
    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = brightness.min(self.max_brightness);
        self
    }

    /// Set the debounce window
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the delay for frames with no delay
    pub fn with_default_delay_ms(mut self, ms: u32) -> Self {
        self.default_delay_ms = ms;
        self
    }

    /// Set the status caption timeout
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    /// Set the presenter refresh period
    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    /// Set the publish wait timeout (`None` to never wait)
    pub fn with_swap_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.swap_timeout = timeout;
        self
    }

    /// Set the maximum frame size in pixels
    pub fn with_max_image_sz(mut self, max_image_sz: Option<usize>) -> Self {
        self.max_image_sz = max_image_sz;
        self
    }

    /// Set the decode error hold time
    pub fn with_error_hold(mut self, hold: Duration) -> Self {
        self.error_hold = hold;
        self
    }

    /// Set whether bad files are skipped
    pub fn with_skip_bad_files(mut self, skip: bool) -> Self {
        self.skip_bad_files = skip;
        self
    }
}
