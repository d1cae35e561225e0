// input.rs
//
// Copyright (c) 2025  Douglas Lau
//
//! Remote control input
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Remote control button
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    VolumeDown,
    Play,
    VolumeUp,
    Setup,
    Up,
    Stop,
    Left,
    Enter,
    Right,
    Digit0,
    Down,
    Back,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
}

impl Button {
    /// All buttons with their raw NEC codes
    const CODES: [(u32, Button); 21] = [
        (0xFF00_BF00, Button::VolumeDown),
        (0xFE01_BF00, Button::Play),
        (0xFD02_BF00, Button::VolumeUp),
        (0xFB04_BF00, Button::Setup),
        (0xFA05_BF00, Button::Up),
        (0xF906_BF00, Button::Stop),
        (0xF708_BF00, Button::Left),
        (0xF609_BF00, Button::Enter),
        (0xF50A_BF00, Button::Right),
        (0xF30C_BF00, Button::Digit0),
        (0xF20D_BF00, Button::Down),
        (0xF10E_BF00, Button::Back),
        (0xEF10_BF00, Button::Digit1),
        (0xEE11_BF00, Button::Digit2),
        (0xED12_BF00, Button::Digit3),
        (0xEB14_BF00, Button::Digit4),
        (0xEA15_BF00, Button::Digit5),
        (0xE916_BF00, Button::Digit6),
        (0xE718_BF00, Button::Digit7),
        (0xE619_BF00, Button::Digit8),
        (0xE51A_BF00, Button::Digit9),
    ];

    /// Decode a raw remote code
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::CODES
            .iter()
            .find(|(code, _)| *code == raw)
            .map(|(_, button)| *button)
    }

    /// Get the raw remote code
    pub fn raw(self) -> u32 {
        Self::CODES
            .iter()
            .find(|(_, button)| *button == self)
            .map(|(code, _)| *code)
            .unwrap_or_default()
    }

    /// Get the button name, as shown on the status line
    pub fn name(self) -> &'static str {
        use Button::*;
        match self {
            VolumeDown => "VOL_DOWN",
            Play => "PLAY",
            VolumeUp => "VOL_UP",
            Setup => "SETUP",
            Up => "UP",
            Stop => "STOP",
            Left => "LEFT",
            Enter => "ENTER",
            Right => "RIGHT",
            Digit0 => "0",
            Down => "DOWN",
            Back => "BACK",
            Digit1 => "1",
            Digit2 => "2",
            Digit3 => "3",
            Digit4 => "4",
            Digit5 => "5",
            Digit6 => "6",
            Digit7 => "7",
            Digit8 => "8",
            Digit9 => "9",
        }
    }
}

/// Source of remote control buttons
pub trait RemoteInput {
    /// Poll for one button press
    fn poll_button(&mut self) -> Option<Button>;
}

/// Rejects presses too close to the last accepted press
#[derive(Clone, Debug)]
pub struct Debounce {
    window: Duration,
    last: Option<Instant>,
}

impl Debounce {
    /// Create a new debouncer
    pub fn new(window: Duration) -> Self {
        Debounce { window, last: None }
    }

    /// Check whether a press at `now` is accepted
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => {
                false
            }
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Bounded queue of button presses
#[derive(Clone, Debug)]
pub struct ButtonQueue {
    queue: Arc<Mutex<VecDeque<Button>>>,
    capacity: usize,
}

/// Producer handle for a [ButtonQueue](struct.ButtonQueue.html)
#[derive(Clone, Debug)]
pub struct ButtonSender {
    queue: Arc<Mutex<VecDeque<Button>>>,
    capacity: usize,
}

impl ButtonQueue {
    /// Create a new button queue
    pub fn new(capacity: usize) -> Self {
        ButtonQueue {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Get a sender for the queue
    pub fn sender(&self) -> ButtonSender {
        ButtonSender {
            queue: Arc::clone(&self.queue),
            capacity: self.capacity,
        }
    }
}

impl RemoteInput for ButtonQueue {
    fn poll_button(&mut self) -> Option<Button> {
        self.queue.lock().pop_front()
    }
}

impl ButtonSender {
    /// Send a button press.
    ///
    /// Returns `false` if the queue is full and the press was dropped.
    pub fn send(&self, button: Button) -> bool {
        let mut queue = self.queue.lock();
        if queue.len() < self.capacity {
            queue.push_back(button);
            true
        } else {
            debug!("input queue full, dropped {:?}", button);
            false
        }
    }

    /// Send a raw remote code, discarding unknown codes
    pub fn send_raw(&self, raw: u32) -> bool {
        match Button::from_raw(raw) {
            Some(button) => self.send(button),
            None => {
                debug!("unknown remote code {:08X}", raw);
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(Button::from_raw(0xFF00BF00), Some(Button::VolumeDown));
        assert_eq!(Button::from_raw(0xE51ABF00), Some(Button::Digit9));
        assert_eq!(Button::from_raw(0x12345678), None);
        for (code, button) in Button::CODES {
            assert_eq!(button.raw(), code);
        }
        assert_eq!(Button::Right.name(), "RIGHT");
    }

    #[test]
    fn debounce_close() {
        let mut d = Debounce::new(Duration::from_millis(400));
        let t = Instant::now();
        let accepted = (0..3)
            .filter(|i| d.accept(t + Duration::from_millis(i * 100)))
            .count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn debounce_apart() {
        let mut d = Debounce::new(Duration::from_millis(400));
        let t = Instant::now();
        assert!(d.accept(t));
        assert!(d.accept(t + Duration::from_millis(500)));
    }

    #[test]
    fn debounce_rejected_do_not_extend() {
        let mut d = Debounce::new(Duration::from_millis(400));
        let t = Instant::now();
        assert!(d.accept(t));
        assert!(!d.accept(t + Duration::from_millis(300)));
        assert!(d.accept(t + Duration::from_millis(400)));
    }

    #[test]
    fn queue() {
        let mut q = ButtonQueue::new(2);
        let tx = q.sender();
        assert!(tx.send_raw(0xF50ABF00));
        assert!(!tx.send_raw(0x0));
        assert!(tx.send(Button::Left));
        assert!(!tx.send(Button::Play));
        assert_eq!(q.poll_button(), Some(Button::Right));
        assert_eq!(q.poll_button(), Some(Button::Left));
        assert_eq!(q.poll_button(), None);
    }
}
