// player.rs
//
// Copyright (c) 2025  Douglas Lau
//
//! Slideshow player
use crate::catalog::Catalog;
use crate::config::Config;
use crate::decode::{Decoder, State, Step};
use crate::error::{Error, Result};
use crate::input::{Button, Debounce, RemoteInput};
use crate::sink::{PixelSink, Region, ScaledSink};
use crate::stream::Stream;
use crate::surface::{Brightness, Compositor, Overlay, Presenter, Surface};
use pix::rgb::SRgb8;
use std::time::{Duration, Instant};

/// Number of overlay rows masked behind a status caption
const STATUS_ROWS: u32 = 6;

/// Overlay palette index of the status mask
const STATUS_MASK: u8 = 1;

/// Player state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerState {
    /// Index of current animation
    pub index: usize,
    /// Number of animations
    pub file_count: usize,
    /// Brightness level
    pub brightness: u8,
    /// Next tick starts a new animation
    pub first_frame: bool,
    /// Time when the next frame is due
    pub next_frame_at: Option<Instant>,
    /// Time when the status caption was shown
    pub status_at: Option<Instant>,
    /// Status caption may be cleared after a timeout
    pub status_clear_allowed: bool,
    /// Skip to the next animation when due
    pub pending_skip: bool,
}

/// Slideshow player.
///
/// Call [tick](struct.Player.html#method.tick) repeatedly from the main
/// loop; the [Presenter](struct.Presenter.html) returned with the player
/// should be refreshed on its own cadence.
pub struct Player<C: Catalog, I: RemoteInput> {
    config: Config,
    catalog: C,
    input: I,
    debounce: Debounce,
    compositor: ScaledSink<Compositor>,
    overlay: Overlay,
    brightness: Brightness,
    decoder: Option<Decoder<Box<dyn Stream>>>,
    state: PlayerState,
}

impl<C: Catalog, I: RemoteInput> Player<C, I> {
    /// Create a new player with its presenter
    pub fn new(
        config: Config,
        catalog: C,
        input: I,
        now: Instant,
    ) -> Result<(Self, Presenter)> {
        let surface = Surface::new(&config);
        let compositor =
            ScaledSink::new(surface.compositor, config.width, config.height);
        let mut player = Player {
            debounce: Debounce::new(config.debounce),
            compositor,
            overlay: surface.overlay,
            brightness: surface.brightness,
            decoder: None,
            state: PlayerState {
                file_count: catalog.len(),
                brightness: config.brightness,
                first_frame: true,
                status_clear_allowed: true,
                ..Default::default()
            },
            config,
            catalog,
            input,
        };
        player.show_status("POWER: ON", now, true);
        if player.catalog.is_empty() {
            player.show_status("No animations", now, false);
            return Err(Error::NoAnimationFiles);
        }
        let found = format!("Found {}", player.state.file_count);
        player.show_status(&found, now, true);
        Ok((player, surface.presenter))
    }

    /// Get the player state
    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Get the background compositor
    pub fn compositor(&self) -> &Compositor {
        self.compositor.inner()
    }

    /// Get the overlay
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Get the name of the current animation
    pub fn current_name(&self) -> &str {
        self.catalog.name(self.state.index).unwrap_or_default()
    }

    /// Run one iteration of the main loop
    pub fn tick(&mut self, now: Instant) {
        self.maybe_clear_status(now);
        self.handle_input(now);
        self.play(now);
    }

    /// Show a status caption over the top rows.
    ///
    /// A caption which may not be cleared stays until the next one.
    fn show_status(&mut self, text: &str, now: Instant, allow_clear: bool) {
        info!("status: {}", text);
        let width = self.overlay.width();
        self.overlay.fill(0);
        self.overlay.set_color(STATUS_MASK, SRgb8::new(0, 0, 0));
        let mask = Region::new(0, 0, width, STATUS_ROWS);
        self.overlay.fill_region(mask, STATUS_MASK);
        self.overlay.set_caption(Some(text.to_string()));
        self.overlay.publish();
        self.state.status_at = Some(now);
        self.state.status_clear_allowed = allow_clear;
    }

    /// Clear the status caption after it times out
    fn maybe_clear_status(&mut self, now: Instant) {
        if !self.state.status_clear_allowed {
            return;
        }
        match self.state.status_at {
            Some(at)
                if now.saturating_duration_since(at)
                    > self.config.status_timeout =>
            {
                self.overlay.fill(0);
                self.overlay.set_caption(None);
                self.overlay.publish();
                self.state.status_at = None;
            }
            _ => (),
        }
    }

    /// Handle one remote button press
    fn handle_input(&mut self, now: Instant) {
        let button = match self.input.poll_button() {
            Some(button) => button,
            None => return,
        };
        if !self.debounce.accept(now) {
            debug!("debounced {:?}", button);
            return;
        }
        info!("button: {}", button.name());
        let step = i16::from(self.config.brightness_step);
        match button {
            Button::VolumeDown => self.adjust_brightness(-step, now),
            Button::VolumeUp => self.adjust_brightness(step, now),
            Button::Left => self.change_image(-1),
            Button::Right => self.change_image(1),
            _ => self.show_status(button.name(), now, true),
        }
    }

    /// Adjust the brightness level
    fn adjust_brightness(&mut self, delta: i16, now: Instant) {
        let level = self.brightness.adjust(delta, self.config.max_brightness);
        self.state.brightness = level;
        self.show_status(&format!("BRT: {}", level), now, true);
    }

    /// Change the current animation, wrapping around
    fn change_image(&mut self, delta: isize) {
        let count = self.state.file_count as isize;
        let index = (self.state.index as isize + delta).rem_euclid(count);
        self.state.index = index as usize;
        for _ in 0..2 {
            self.compositor.clear();
            self.compositor.inner_mut().publish();
        }
        self.decoder = None;
        self.state.first_frame = true;
        self.state.pending_skip = false;
    }

    /// Open the current animation
    fn open_current(&mut self, now: Instant) {
        let index = self.state.index;
        let name = self.current_name().to_string();
        match self.catalog.open(index) {
            Ok(stream) => {
                info!("opened {}: {}", index, name);
                self.show_status(&name, now, true);
                let decoder = Decoder::new(stream)
                    .with_default_delay_ms(self.config.default_delay_ms)
                    .max_image_sz(self.config.max_image_sz);
                self.decoder = Some(decoder);
            }
            Err(e) => {
                warn!("open {}: {}", name, e);
                self.show_status("Fail", now, false);
                self.fail(now);
            }
        }
    }

    /// Hold after a failure, then skip or retry
    fn fail(&mut self, now: Instant) {
        self.decoder = None;
        self.state.next_frame_at = Some(now + self.config.error_hold);
        self.state.pending_skip = self.config.skip_bad_files;
    }

    /// Draw the next frame when due
    fn play(&mut self, now: Instant) {
        if self.state.first_frame {
            self.state.first_frame = false;
            self.state.next_frame_at = None;
            self.state.pending_skip = false;
            self.open_current(now);
        }
        if let Some(at) = self.state.next_frame_at {
            if now < at {
                return;
            }
        }
        if self.state.pending_skip {
            self.change_image(1);
            return;
        }
        if self.decoder.is_none() {
            self.open_current(now);
            return;
        }
        let result = match &mut self.decoder {
            Some(decoder) => decode_step(decoder, &mut self.compositor),
            None => return,
        };
        match result {
            Ok(Step::Frame { delay_ms }) => {
                let delay = Duration::from_millis(delay_ms.into());
                self.state.next_frame_at = Some(now + delay);
            }
            Ok(Step::EndOfAnimation) => {
                let frames =
                    self.decoder.as_ref().map_or(0, |d| d.frame_count());
                if frames == 0 {
                    warn!("no frames in {}", self.current_name());
                    self.show_status("Bad file", now, false);
                    self.fail(now);
                } else {
                    debug!("restarting {}", self.current_name());
                    self.state.next_frame_at = None;
                }
            }
            Err(e) => {
                warn!("decode {}: {}", self.current_name(), e);
                self.show_status("Bad file", now, false);
                self.fail(now);
            }
        }
    }
}

/// Decode one step, starting or restarting as needed
fn decode_step<S: Stream, K: PixelSink>(
    decoder: &mut Decoder<S>,
    sink: &mut K,
) -> Result<Step> {
    if matches!(decoder.state(), State::Idle | State::Exhausted) {
        decoder.start_decoding()?;
    }
    decoder.decode_next_frame(sink)
}
