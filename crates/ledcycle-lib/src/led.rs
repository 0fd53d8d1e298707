//! Tri-color LED state machine.
//!
//! LEDs are active-low: the lit LED is driven Low, the other two High.
//! Exactly one line is Low between transitions.

use std::fmt;

use serde::Serialize;

use crate::error::{LedCycleError, Result};
use crate::gpio::{self, DigitalLine, Edge, GpioDriver, Level, OutputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    Red,
    Green,
    Blue,
}

impl LedColor {
    /// Cycle order.
    pub const ALL: [LedColor; 3] = [LedColor::Red, LedColor::Green, LedColor::Blue];

    pub fn index(self) -> usize {
        match self {
            LedColor::Red => 0,
            LedColor::Green => 1,
            LedColor::Blue => 2,
        }
    }

    /// Wraps modulo 3.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            LedColor::Red => "RED",
            LedColor::Green => "GREEN",
            LedColor::Blue => "BLUE",
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Three output lines in cycle order plus the one currently lit.
pub struct LedSet<L> {
    lines: [L; 3],
    current: LedColor,
}

impl<L: DigitalLine> LedSet<L> {
    /// Wrap lines that are already driven: `current` Low, the others High.
    pub fn new(lines: [L; 3], current: LedColor) -> Self {
        LedSet { lines, current }
    }

    /// Open the red, green and blue lines with red lit.
    ///
    /// If any line fails to open, the ones already opened are closed again
    /// before the error is returned.
    pub fn open<G>(gpio: &mut G, pins: [u32; 3], mode: OutputMode) -> Result<Self>
    where
        G: GpioDriver<Line = L>,
    {
        let start = LedColor::Red;
        let mut opened: Vec<L> = Vec::with_capacity(3);
        for color in LedColor::ALL {
            let pin = pins[color.index()];
            let initial = if color == start {
                Level::Low
            } else {
                Level::High
            };
            log::debug!("[led] opening {color} LED on GPIO {pin} ({mode})");
            match gpio.open_output(pin, mode, initial) {
                Ok(line) => opened.push(line),
                Err(e) => {
                    for line in opened {
                        let pin = line.pin();
                        if let Err(close_err) = line.close() {
                            log::warn!("[led] could not release GPIO {pin}: {close_err}");
                        }
                    }
                    return Err(e.into());
                }
            }
        }
        let lines: [L; 3] = opened
            .try_into()
            .map_err(|_| LedCycleError::Resource("LED set: expected three lines".into()))?;
        Ok(LedSet::new(lines, start))
    }

    pub fn current(&self) -> LedColor {
        self.current
    }

    /// React to an edge on the switch button.
    ///
    /// Only a press (`Falling`) advances the color. The old LED is switched
    /// off before the new one is switched on, so the transition passes
    /// through a brief all-dark state rather than a two-lit one.
    /// Returns the newly lit color, if any.
    ///
    /// If switching the new LED on fails, `current` already names it and
    /// every LED is dark; the caller treats the error as fatal.
    pub fn on_edge(&mut self, edge: Edge) -> gpio::Result<Option<LedColor>> {
        if edge != Edge::Falling {
            return Ok(None);
        }
        self.lines[self.current.index()].write_level(Level::High)?;
        self.current = self.current.next();
        self.lines[self.current.index()].write_level(Level::Low)?;
        log::info!("{}", self.current.label());
        Ok(Some(self.current))
    }

    pub fn pins(&self) -> [u32; 3] {
        [
            self.lines[0].pin(),
            self.lines[1].pin(),
            self.lines[2].pin(),
        ]
    }

    /// Give the lines back, in cycle order, for release.
    pub fn into_lines(self) -> [L; 3] {
        self.lines
    }
}
