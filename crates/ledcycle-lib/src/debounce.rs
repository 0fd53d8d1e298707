//! Edge detection for polled inputs.
//!
//! Sampling a held button every tick would report "pressed" on every tick.
//! Comparing each sample against the last observed level turns level
//! sampling into edge detection: one event per physical transition.

use crate::gpio::{self, DigitalLine, Edge, Level};

/// Level-change filter. Starts at High (idle, pulled-up button).
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    last: Level,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(Level::High)
    }
}

impl EdgeDetector {
    pub fn new(initial: Level) -> Self {
        EdgeDetector { last: initial }
    }

    /// Feed a sample. Returns the edge if it differs from the previous one.
    pub fn update(&mut self, level: Level) -> Option<Edge> {
        if level == self.last {
            return None;
        }
        self.last = level;
        Some(Edge::entering(level))
    }

    pub fn last_level(&self) -> Level {
        self.last
    }
}

/// An input line paired with its edge detector.
pub struct DebouncedInput<L> {
    line: L,
    detector: EdgeDetector,
}

impl<L: DigitalLine> DebouncedInput<L> {
    pub fn new(line: L) -> Self {
        DebouncedInput {
            line,
            detector: EdgeDetector::default(),
        }
    }

    /// Sample the line once. A read error leaves the last level untouched.
    pub fn poll(&mut self) -> gpio::Result<Option<Edge>> {
        let level = self.line.read_level()?;
        Ok(self.detector.update(level))
    }

    pub fn last_level(&self) -> Level {
        self.detector.last_level()
    }

    pub fn pin(&self) -> u32 {
        self.line.pin()
    }

    pub fn into_line(self) -> L {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::GpioDriver;
    use crate::gpio::mock::MockGpio;
    use Level::{High, Low};

    #[test]
    fn initial_level_is_high() {
        assert_eq!(EdgeDetector::default().last_level(), High);
    }

    #[test]
    fn repeated_high_reports_nothing() {
        let mut d = EdgeDetector::default();
        for _ in 0..10 {
            assert_eq!(d.update(High), None);
        }
    }

    #[test]
    fn press_and_release_report_once_each() {
        let mut d = EdgeDetector::default();
        assert_eq!(d.update(Low), Some(Edge::Falling));
        assert_eq!(d.update(Low), None);
        assert_eq!(d.update(Low), None);
        assert_eq!(d.update(High), Some(Edge::Rising));
        assert_eq!(d.update(High), None);
    }

    #[test]
    fn custom_initial_level() {
        let mut d = EdgeDetector::new(Low);
        assert_eq!(d.update(Low), None);
        assert_eq!(d.update(High), Some(Edge::Rising));
    }

    #[test]
    fn input_follows_scripted_samples() {
        let mut gpio = MockGpio::new();
        gpio.script_input(12, &[High, Low, Low, High, Low]);
        let mut input = DebouncedInput::new(gpio.open_input(12).unwrap());

        let edges: Vec<_> = (0..5).map(|_| input.poll().unwrap()).collect();
        assert_eq!(
            edges,
            vec![
                None,
                Some(Edge::Falling),
                None,
                Some(Edge::Rising),
                Some(Edge::Falling)
            ]
        );
        assert_eq!(input.last_level(), Low);
    }

    #[test]
    fn read_error_keeps_last_level() {
        let mut gpio = MockGpio::new();
        gpio.script_input(12, &[Low]);
        let mut input = DebouncedInput::new(gpio.open_input(12).unwrap());
        assert_eq!(input.poll().unwrap(), Some(Edge::Falling));

        gpio.fail_read(12);
        assert!(input.poll().is_err());
        assert_eq!(input.last_level(), Low);
    }

    #[test]
    fn into_line_returns_same_pin() {
        let mut gpio = MockGpio::new();
        let input = DebouncedInput::new(gpio.open_input(13).unwrap());
        assert_eq!(input.pin(), 13);
        assert_eq!(input.into_line().pin(), 13);
    }
}
