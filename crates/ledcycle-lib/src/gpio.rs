//! Digital line access — driver trait, Linux character-device backend, mock.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

// ── Levels and edges ──

/// Electrical level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    High,
    Low,
}

impl Level {
    /// Convert a raw line value (0 = Low, anything else = High).
    pub fn from_raw(value: u8) -> Self {
        if value == 0 { Level::Low } else { Level::High }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            Level::High => 1,
            Level::Low => 0,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::High => write!(f, "high"),
            Level::Low => write!(f, "low"),
        }
    }
}

/// A transition between two consecutive samples.
///
/// Buttons are wired active-low, so `Falling` is a press and `Rising` a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// The line rose to High.
    Rising,
    /// The line fell to Low.
    Falling,
}

impl Edge {
    /// The edge that ends at `level`.
    pub fn entering(level: Level) -> Self {
        match level {
            Level::High => Edge::Rising,
            Level::Low => Edge::Falling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Electrical drive mode of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    #[default]
    PushPull,
    OpenDrain,
    OpenSource,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::PushPull => write!(f, "push-pull"),
            OutputMode::OpenDrain => write!(f, "open-drain"),
            OutputMode::OpenSource => write!(f, "open-source"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push-pull" | "pushpull" => Ok(OutputMode::PushPull),
            "open-drain" | "opendrain" => Ok(OutputMode::OpenDrain),
            "open-source" | "opensource" => Ok(OutputMode::OpenSource),
            other => Err(format!(
                "unknown output mode '{other}' (expected push-pull, open-drain or open-source)"
            )),
        }
    }
}

// ── Error type ──

/// Peripheral errors. `reason` carries the driver's own message.
#[derive(Debug)]
pub enum GpioError {
    ChipUnavailable(String),
    OpenFailed { pin: u32, reason: String },
    ReadFailed { pin: u32, reason: String },
    WriteFailed { pin: u32, reason: String },
    CloseFailed { pin: u32, reason: String },
    WrongDirection { pin: u32, direction: Direction },
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpioError::ChipUnavailable(e) => write!(f, "GPIO chip unavailable: {e}"),
            GpioError::OpenFailed { pin, reason } => {
                write!(f, "Could not open GPIO {pin}: {reason}")
            }
            GpioError::ReadFailed { pin, reason } => {
                write!(f, "Unable to read GPIO {pin}: {reason}")
            }
            GpioError::WriteFailed { pin, reason } => {
                write!(f, "Unable to write GPIO {pin}: {reason}")
            }
            GpioError::CloseFailed { pin, reason } => {
                write!(f, "Could not close GPIO {pin}: {reason}")
            }
            GpioError::WrongDirection { pin, direction } => {
                write!(f, "GPIO {pin} is opened as {direction}")
            }
        }
    }
}

impl std::error::Error for GpioError {}

pub type Result<T> = std::result::Result<T, GpioError>;

// ── Traits ──

/// One opened line. Dropping it releases the line silently; call
/// [`close`](DigitalLine::close) to observe release errors.
pub trait DigitalLine {
    fn pin(&self) -> u32;
    fn direction(&self) -> Direction;
    fn read_level(&mut self) -> Result<Level>;
    /// Drive the line. Input lines reject this with
    /// [`GpioError::WrongDirection`].
    fn write_level(&mut self, level: Level) -> Result<()>;
    fn close(self) -> Result<()>
    where
        Self: Sized;

    /// Writes are only valid on lines opened as outputs.
    fn ensure_output(&self) -> Result<()> {
        match self.direction() {
            Direction::Output => Ok(()),
            direction => Err(GpioError::WrongDirection {
                pin: self.pin(),
                direction,
            }),
        }
    }
}

/// Opens lines on one GPIO controller.
pub trait GpioDriver {
    type Line: DigitalLine;

    fn open_input(&mut self, pin: u32) -> Result<Self::Line>;
    fn open_output(&mut self, pin: u32, mode: OutputMode, initial: Level) -> Result<Self::Line>;
}

// ── Linux implementation ──

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use gpio_cdev::{Chip, LineHandle, LineRequestFlags};

    /// Consumer label shown by `gpioinfo` for lines we hold.
    const CONSUMER: &str = "ledcycle";

    /// GPIO controller accessed through the Linux character device
    /// (`/dev/gpiochipN`).
    pub struct CdevGpio {
        chip: Chip,
    }

    impl CdevGpio {
        pub fn open(path: &str) -> Result<Self> {
            let chip =
                Chip::new(path).map_err(|e| GpioError::ChipUnavailable(format!("{path}: {e}")))?;
            log::debug!("[gpio] {path} ({} lines)", chip.num_lines());
            Ok(CdevGpio { chip })
        }

        fn request(&mut self, pin: u32, flags: LineRequestFlags, default: u8) -> Result<LineHandle> {
            self.chip
                .get_line(pin)
                .and_then(|line| line.request(flags, default, CONSUMER))
                .map_err(|e| GpioError::OpenFailed {
                    pin,
                    reason: e.to_string(),
                })
        }
    }

    pub struct CdevLine {
        pin: u32,
        direction: Direction,
        handle: LineHandle,
    }

    impl GpioDriver for CdevGpio {
        type Line = CdevLine;

        fn open_input(&mut self, pin: u32) -> Result<CdevLine> {
            let handle = self.request(pin, LineRequestFlags::INPUT, 0)?;
            Ok(CdevLine {
                pin,
                direction: Direction::Input,
                handle,
            })
        }

        fn open_output(&mut self, pin: u32, mode: OutputMode, initial: Level) -> Result<CdevLine> {
            let flags = match mode {
                OutputMode::PushPull => LineRequestFlags::OUTPUT,
                OutputMode::OpenDrain => LineRequestFlags::OUTPUT | LineRequestFlags::OPEN_DRAIN,
                OutputMode::OpenSource => {
                    LineRequestFlags::OUTPUT | LineRequestFlags::OPEN_SOURCE
                }
            };
            let handle = self.request(pin, flags, initial.as_raw())?;
            Ok(CdevLine {
                pin,
                direction: Direction::Output,
                handle,
            })
        }
    }

    impl DigitalLine for CdevLine {
        fn pin(&self) -> u32 {
            self.pin
        }

        fn direction(&self) -> Direction {
            self.direction
        }

        fn read_level(&mut self) -> Result<Level> {
            self.handle
                .get_value()
                .map(Level::from_raw)
                .map_err(|e| GpioError::ReadFailed {
                    pin: self.pin,
                    reason: e.to_string(),
                })
        }

        fn write_level(&mut self, level: Level) -> Result<()> {
            self.ensure_output()?;
            self.handle
                .set_value(level.as_raw())
                .map_err(|e| GpioError::WriteFailed {
                    pin: self.pin,
                    reason: e.to_string(),
                })
        }

        fn close(self) -> Result<()> {
            // The kernel releases the line when the handle's fd is closed.
            drop(self.handle);
            Ok(())
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::{CdevGpio, CdevLine};

// ── Mock driver for testing ──

/// In-memory GPIO controller for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::rc::Rc;

    #[derive(Default)]
    struct Board {
        /// Scripted samples per input pin, consumed one per read.
        scripts: HashMap<u32, VecDeque<Level>>,
        /// Last value returned per pin; repeated once the script runs dry.
        last_read: HashMap<u32, Level>,
        reads: HashMap<u32, usize>,
        outputs: HashMap<u32, Level>,
        writes: Vec<(u32, Level)>,
        open: HashMap<u32, Direction>,
        closed: Vec<u32>,
        fail_open: HashSet<u32>,
        fail_read: HashSet<u32>,
        fail_write: HashSet<u32>,
        fail_close: HashSet<u32>,
    }

    /// Mock controller. Clones share the same board, so a test can keep one
    /// clone for inspection while the code under test owns another.
    #[derive(Clone, Default)]
    pub struct MockGpio {
        board: Rc<RefCell<Board>>,
    }

    impl MockGpio {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue samples for an input pin. Idle inputs read High (pull-up).
        pub fn script_input(&self, pin: u32, levels: &[Level]) {
            self.board
                .borrow_mut()
                .scripts
                .entry(pin)
                .or_default()
                .extend(levels.iter().copied());
        }

        /// Current driven level of an output pin.
        pub fn output_level(&self, pin: u32) -> Option<Level> {
            self.board.borrow().outputs.get(&pin).copied()
        }

        /// Every `write_level` call in order (initial levels are not included).
        pub fn writes(&self) -> Vec<(u32, Level)> {
            self.board.borrow().writes.clone()
        }

        pub fn reads(&self, pin: u32) -> usize {
            self.board.borrow().reads.get(&pin).copied().unwrap_or(0)
        }

        pub fn is_open(&self, pin: u32) -> bool {
            self.board.borrow().open.contains_key(&pin)
        }

        pub fn open_count(&self) -> usize {
            self.board.borrow().open.len()
        }

        /// Pins in the order they were closed.
        pub fn closed(&self) -> Vec<u32> {
            self.board.borrow().closed.clone()
        }

        pub fn fail_open(&self, pin: u32) {
            self.board.borrow_mut().fail_open.insert(pin);
        }

        pub fn fail_read(&self, pin: u32) {
            self.board.borrow_mut().fail_read.insert(pin);
        }

        pub fn fail_write(&self, pin: u32) {
            self.board.borrow_mut().fail_write.insert(pin);
        }

        pub fn fail_close(&self, pin: u32) {
            self.board.borrow_mut().fail_close.insert(pin);
        }

        fn open(&self, pin: u32, direction: Direction, initial: Option<Level>) -> Result<MockLine> {
            let mut board = self.board.borrow_mut();
            if board.fail_open.contains(&pin) {
                return Err(GpioError::OpenFailed {
                    pin,
                    reason: "mock: open failure injected".into(),
                });
            }
            if board.open.contains_key(&pin) {
                return Err(GpioError::OpenFailed {
                    pin,
                    reason: "mock: line busy".into(),
                });
            }
            board.open.insert(pin, direction);
            if let Some(level) = initial {
                board.outputs.insert(pin, level);
            }
            Ok(MockLine {
                pin,
                direction,
                board: Rc::clone(&self.board),
            })
        }
    }

    pub struct MockLine {
        pin: u32,
        direction: Direction,
        board: Rc<RefCell<Board>>,
    }

    impl GpioDriver for MockGpio {
        type Line = MockLine;

        fn open_input(&mut self, pin: u32) -> Result<MockLine> {
            self.open(pin, Direction::Input, None)
        }

        fn open_output(&mut self, pin: u32, _mode: OutputMode, initial: Level) -> Result<MockLine> {
            self.open(pin, Direction::Output, Some(initial))
        }
    }

    impl DigitalLine for MockLine {
        fn pin(&self) -> u32 {
            self.pin
        }

        fn direction(&self) -> Direction {
            self.direction
        }

        fn read_level(&mut self) -> Result<Level> {
            let mut board = self.board.borrow_mut();
            if board.fail_read.contains(&self.pin) {
                return Err(GpioError::ReadFailed {
                    pin: self.pin,
                    reason: "mock: read failure injected".into(),
                });
            }
            *board.reads.entry(self.pin).or_default() += 1;
            if self.direction == Direction::Output {
                return Ok(board.outputs.get(&self.pin).copied().unwrap_or(Level::High));
            }
            let scripted = board
                .scripts
                .get_mut(&self.pin)
                .and_then(|queue| queue.pop_front());
            let level = scripted
                .or_else(|| board.last_read.get(&self.pin).copied())
                .unwrap_or(Level::High);
            board.last_read.insert(self.pin, level);
            Ok(level)
        }

        fn write_level(&mut self, level: Level) -> Result<()> {
            self.ensure_output()?;
            let mut board = self.board.borrow_mut();
            if board.fail_write.contains(&self.pin) {
                return Err(GpioError::WriteFailed {
                    pin: self.pin,
                    reason: "mock: write failure injected".into(),
                });
            }
            board.outputs.insert(self.pin, level);
            board.writes.push((self.pin, level));
            Ok(())
        }

        fn close(self) -> Result<()> {
            let mut board = self.board.borrow_mut();
            board.open.remove(&self.pin);
            board.closed.push(self.pin);
            if board.fail_close.contains(&self.pin) {
                return Err(GpioError::CloseFailed {
                    pin: self.pin,
                    reason: "mock: close failure injected".into(),
                });
            }
            Ok(())
        }
    }
}
