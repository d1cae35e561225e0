// main.rs      marquee command
//
// Copyright (c) 2019-2025  Douglas Lau
//
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use marquee::block::DisposalMethod;
use marquee::{
    Button, ButtonQueue, Config, Decoder, Directory, FileStream, NullSink,
    Panel, Player, Step,
};
use pix::rgb::{Rgb, SRgb8};
use pix::Raster;
use std::error::Error;
use std::ffi::OsStr;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Crate version
const VERSION: &'static str = std::env!("CARGO_PKG_VERSION");

/// Main entry point
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().format_timestamp(None).init();
    let mut out = StandardStream::stdout(ColorChoice::Always);
    match create_app().get_matches().subcommand() {
        ("play", Some(matches)) => play(matches)?,
        ("show", Some(matches)) => show(&mut out, matches)?,
        _ => panic!(),
    }
    out.reset()?;
    Ok(())
}

/// Create clap App
fn create_app() -> App<'static, 'static> {
    App::new("marquee")
        .version(VERSION)
        .setting(AppSettings::GlobalVersion)
        .about("Animated GIF slideshow")
        .setting(AppSettings::ArgRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("play")
                .about("Play a slideshow on a simulated LED matrix")
                .arg(
                    Arg::with_name("dir")
                        .default_value(".")
                        .help("directory of GIF files"),
                )
                .arg(
                    Arg::with_name("width")
                        .long("width")
                        .takes_value(true)
                        .default_value("64")
                        .help("matrix width"),
                )
                .arg(
                    Arg::with_name("height")
                        .long("height")
                        .takes_value(true)
                        .default_value("64")
                        .help("matrix height"),
                )
                .arg(
                    Arg::with_name("brightness")
                        .long("brightness")
                        .takes_value(true)
                        .help("initial brightness"),
                )
                .arg(
                    Arg::with_name("default-delay")
                        .long("default-delay")
                        .takes_value(true)
                        .help("delay (ms) for frames without one"),
                )
                .arg(
                    Arg::with_name("seconds")
                        .long("seconds")
                        .takes_value(true)
                        .help("stop after a number of seconds"),
                ),
        )
        .subcommand(
            SubCommand::with_name("show")
                .about("Show GIF frame table")
                .arg(
                    Arg::with_name("files")
                        .required(true)
                        .min_values(1)
                        .help("input file(s)"),
                ),
        )
}

/// Parse an optional numeric argument
fn parse_arg<T>(
    matches: &ArgMatches,
    name: &str,
) -> Result<Option<T>, Box<dyn Error>>
where
    T: std::str::FromStr,
    T::Err: Error + 'static,
{
    match matches.value_of(name) {
        Some(v) => Ok(Some(v.parse()?)),
        None => Ok(None),
    }
}

/// Build player configuration from arguments
fn config(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
    let mut config = Config::default();
    let width = parse_arg(matches, "width")?.unwrap_or(config.width);
    let height = parse_arg(matches, "height")?.unwrap_or(config.height);
    config = config.with_size(width, height);
    if let Some(brightness) = parse_arg(matches, "brightness")? {
        config = config.with_brightness(brightness);
    }
    if let Some(delay) = parse_arg(matches, "default-delay")? {
        config = config.with_default_delay_ms(delay);
    }
    Ok(config)
}

/// Panel drawn on the terminal with half-block cells
struct TerminalPanel {
    out: StandardStream,
    /// Last caption, to avoid redrawing the status line
    caption: Option<String>,
}

impl TerminalPanel {
    fn new() -> Self {
        TerminalPanel {
            out: StandardStream::stdout(ColorChoice::Always),
            caption: None,
        }
    }

    /// Draw one frame, two rows per line of text
    fn draw(
        &mut self,
        raster: &Raster<SRgb8>,
        caption: Option<&str>,
    ) -> std::io::Result<()> {
        let black = SRgb8::new(0, 0, 0);
        let mut spec = ColorSpec::new();
        // home cursor
        write!(self.out, "\x1b[H")?;
        for y in (0..raster.height() as i32).step_by(2) {
            for x in 0..raster.width() as i32 {
                let top = raster.pixel(x, y);
                let bottom = if y + 1 < raster.height() as i32 {
                    raster.pixel(x, y + 1)
                } else {
                    black
                };
                spec.set_fg(Some(term_color(top)))
                    .set_bg(Some(term_color(bottom)));
                self.out.set_color(&spec)?;
                write!(self.out, "\u{2580}")?;
            }
            self.out.reset()?;
            writeln!(self.out)?;
        }
        if caption != self.caption.as_deref() {
            self.caption = caption.map(str::to_string);
            // clear to end of line
            writeln!(self.out, "{}\x1b[K", caption.unwrap_or_default())?;
        }
        self.out.flush()
    }
}

impl Panel for TerminalPanel {
    fn show(
        &mut self,
        raster: &Raster<SRgb8>,
        caption: Option<&str>,
    ) -> marquee::Result<()> {
        Ok(self.draw(raster, caption)?)
    }
}

/// Convert a pixel to a terminal color
fn term_color(clr: SRgb8) -> Color {
    Color::Rgb(
        u8::from(Rgb::red(clr)),
        u8::from(Rgb::green(clr)),
        u8::from(Rgb::blue(clr)),
    )
}

/// Key input from one line of stdin
#[derive(Debug, PartialEq)]
enum Key {
    Quit,
    Press(Button),
}

/// Translate a key to a remote button
fn key_button(key: char) -> Option<Button> {
    Some(match key {
        '-' => Button::VolumeDown,
        '+' | '=' => Button::VolumeUp,
        ',' => Button::Left,
        '.' => Button::Right,
        ' ' | 'p' => Button::Play,
        's' => Button::Stop,
        'e' => Button::Enter,
        'b' | '\x08' | '\x7F' => Button::Back,
        'm' => Button::Setup,
        '0' => Button::Digit0,
        '1' => Button::Digit1,
        '2' => Button::Digit2,
        '3' => Button::Digit3,
        '4' => Button::Digit4,
        '5' => Button::Digit5,
        '6' => Button::Digit6,
        '7' => Button::Digit7,
        '8' => Button::Digit8,
        '9' => Button::Digit9,
        _ => return None,
    })
}

/// Translate the final byte of an arrow key sequence
fn arrow_button(key: char) -> Option<Button> {
    match key {
        'A' => Some(Button::Up),
        'B' => Some(Button::Down),
        'C' => Some(Button::Right),
        'D' => Some(Button::Left),
        _ => None,
    }
}

/// Parse one line of keys.
///
/// Arrow keys arrive as `ESC [ A`..`ESC [ D`; a lone `ESC` is BACK and an
/// empty line (just Enter) is ENTER.
fn parse_keys(line: &str) -> Vec<Key> {
    if line.is_empty() {
        return vec![Key::Press(Button::Enter)];
    }
    let mut keys = vec![];
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == 'q' {
            keys.push(Key::Quit);
        } else if c == '\x1B' {
            if chars.peek() == Some(&'[') {
                chars.next();
                if let Some(b) = chars.next().and_then(arrow_button) {
                    keys.push(Key::Press(b));
                }
            } else {
                keys.push(Key::Press(Button::Back));
            }
        } else if let Some(b) = key_button(c) {
            keys.push(Key::Press(b));
        }
    }
    keys
}

/// Handle play subcommand
fn play(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let config = config(matches)?;
    let seconds: Option<u64> = parse_arg(matches, "seconds")?;
    let dir = matches.value_of_os("dir").unwrap_or(OsStr::new("."));
    let catalog = Directory::new(dir)?;
    for path in catalog.files() {
        debug!("found {:?}", path);
    }
    let queue = ButtonQueue::new(config.input_capacity);
    let refresh = config.refresh;
    let start = Instant::now();
    let (mut player, mut presenter) =
        Player::new(config, catalog, queue.clone(), start)?;
    let running = Arc::new(AtomicBool::new(true));
    // clear screen
    print!("\x1b[2J");
    let run = Arc::clone(&running);
    let presenter = thread::spawn(move || -> marquee::Result<()> {
        let mut panel = TerminalPanel::new();
        while run.load(Ordering::Relaxed) {
            presenter.refresh(&mut panel)?;
            thread::sleep(refresh);
        }
        Ok(())
    });
    let sender = queue.sender();
    let run = Arc::clone(&running);
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            for key in parse_keys(&line) {
                match key {
                    Key::Quit => {
                        run.store(false, Ordering::Relaxed);
                        return;
                    }
                    Key::Press(button) => {
                        sender.send_raw(button.raw());
                    }
                }
            }
        }
    });
    let limit = seconds.map(Duration::from_secs);
    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if limit.map_or(false, |l| now.duration_since(start) >= l) {
            break;
        }
        player.tick(now);
        thread::sleep(Duration::from_millis(1));
    }
    running.store(false, Ordering::Relaxed);
    match presenter.join() {
        Ok(res) => res?,
        Err(_) => return Err("presenter thread panicked".into()),
    }
    Ok(())
}

/// Handle show subcommand
fn show(
    out: &mut StandardStream,
    matches: &ArgMatches,
) -> Result<(), Box<dyn Error>> {
    let values = matches.values_of_os("files").unwrap();
    for path in values {
        show_file(out, path)?;
    }
    Ok(())
}

/// Frame summary for the table
struct FrameRow {
    interlaced: bool,
    delay_cs: u16,
    disposal: Option<DisposalMethod>,
    width: u16,
    height: u16,
    left: u16,
    top: u16,
    colors: usize,
    transparent: Option<u8>,
}

/// Show one GIF file
fn show_file(
    out: &mut StandardStream,
    path: &OsStr,
) -> Result<(), Box<dyn Error>> {
    let mut magenta = ColorSpec::new();
    magenta.set_fg(Some(Color::Magenta));
    let mut red = ColorSpec::new();
    red.set_fg(Some(Color::Red)).set_intense(true);
    let mut yellow = ColorSpec::new();
    yellow.set_fg(Some(Color::Yellow)).set_intense(true);
    let mut bold = ColorSpec::new();
    bold.set_fg(Some(Color::White))
        .set_intense(true)
        .set_bold(true);
    out.set_color(&magenta)?;
    writeln!(out, "{:?}", path)?;
    let mut dec = Decoder::new(FileStream::open(path)?);
    let desc = match dec.start_decoding() {
        Ok(desc) => desc.clone(),
        Err(e) => {
            out.set_color(&red)?;
            writeln!(out, "{}", e)?;
            return Ok(());
        }
    };
    let mut frames = vec![];
    let mut error = None;
    loop {
        match dec.decode_next_frame(&mut NullSink) {
            Ok(Step::Frame { .. }) => {
                if let Some(f) = dec.frame() {
                    frames.push(FrameRow {
                        interlaced: f.interlaced(),
                        delay_cs: f.delay_time_cs(),
                        disposal: f
                            .graphic_control
                            .map(|gc| gc.disposal_method()),
                        width: f.width,
                        height: f.height,
                        left: f.left,
                        top: f.top,
                        colors: f
                            .local_color_table
                            .as_ref()
                            .map_or(0, |t| t.len()),
                        transparent: f.transparent_color(),
                    });
                }
            }
            Ok(Step::EndOfAnimation) => break,
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }
    let frame_digits = digits(frames.len()).max(3);
    let size_digits = 4.max(1 + digits(desc.width) + digits(desc.height));
    out.set_color(&bold)?;
    write!(
        out,
        "GIF{}, {}x{}, frames: {}",
        String::from_utf8_lossy(&desc.version),
        desc.width,
        desc.height,
        frames.len()
    )?;
    if let Some(c) = desc.loop_count {
        write!(out, ", repeat: ")?;
        if c == 0 {
            write!(out, "∞")?;
        } else {
            write!(out, "{}", c)?;
        }
    }
    writeln!(out)?;
    out.set_color(&yellow)?;
    write!(out, " {:>w$}", "Fr#", w = frame_digits)?;
    write!(out, "  Delay Disp")?;
    write!(out, " {:>w$}", "Size", w = size_digits)?;
    write!(out, " {:>w$}", "X,Y", w = size_digits)?;
    writeln!(out, " Clrs Trn")?;
    let global_clr = desc.global_color_table.as_ref().map_or(0, |t| t.len());
    for (n, f) in frames.iter().enumerate() {
        show_frame(
            f,
            out,
            (desc.width, desc.height),
            global_clr,
            n,
            frame_digits,
            size_digits,
        )?;
    }
    if let Some(e) = error {
        out.set_color(&red)?;
        writeln!(out, "error: {}", e)?;
    }
    Ok(())
}

/// Show one frame of a GIF file
fn show_frame(
    frame: &FrameRow,
    out: &mut StandardStream,
    (width, height): (u16, u16),
    global_clr: usize,
    number: usize,
    frame_digits: usize,
    size_digits: usize,
) -> Result<(), Box<dyn Error>> {
    let mut dflt = ColorSpec::new();
    dflt.set_fg(Some(Color::White));
    let mut bold = ColorSpec::new();
    bold.set_fg(Some(Color::White))
        .set_intense(true)
        .set_bold(true);
    let mut red = ColorSpec::new();
    red.set_fg(Some(Color::Red)).set_intense(true);
    out.set_color(&dflt)?;
    write!(out, "{}", if frame.interlaced { 'i' } else { ' ' })?;
    out.set_color(&bold)?;
    write!(out, "{:>w$}", number, w = frame_digits)?;
    if frame.delay_cs == 0 {
        out.set_color(&dflt)?;
    }
    write!(out, " {:6.2}", frame.delay_cs as f32 / 100f32)?;
    let d = match frame.disposal {
        Some(DisposalMethod::NoAction) => "none",
        Some(DisposalMethod::Keep) => "keep",
        Some(DisposalMethod::Background) => "bg",
        Some(DisposalMethod::Previous) => "prev",
        Some(DisposalMethod::Reserved(_)) => "res",
        None => "-",
    };
    out.set_color(match d {
        "none" | "-" => &dflt,
        "res" => &red,
        _ => &bold,
    })?;
    write!(out, " {:>4}", d)?;
    if width == frame.width && height == frame.height {
        out.set_color(&dflt)?;
    } else {
        out.set_color(&bold)?;
    }
    let size = format!("{}x{}", frame.width, frame.height);
    write!(out, " {:>w$}", size, w = size_digits)?;
    if frame.left == 0 && frame.top == 0 {
        out.set_color(&dflt)?;
    } else {
        out.set_color(&bold)?;
    }
    let origin = format!("{},{}", frame.left, frame.top);
    write!(out, " {:>w$}", origin, w = size_digits)?;
    if frame.colors > 0 {
        out.set_color(&bold)?;
        write!(out, "  {:3}", frame.colors)?;
    } else {
        out.set_color(&dflt)?;
        write!(out, " {:3}g", global_clr)?;
    }
    match frame.transparent {
        Some(tc) => {
            out.set_color(&bold)?;
            writeln!(out, " {:>3}", tc)?;
        }
        None => {
            out.set_color(&dflt)?;
            writeln!(out, " {:>3}", "-")?;
        }
    }
    Ok(())
}

/// Calculate digits in a number
fn digits<T: Into<usize>>(v: T) -> usize {
    let v = v.into();
    match v {
        0..=9 => 1,
        10..=99 => 2,
        100..=999 => 3,
        1000..=9999 => 4,
        _ => 5,
    }
}
