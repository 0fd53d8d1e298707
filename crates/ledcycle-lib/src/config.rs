//! Runtime settings — pin assignment, poll period, output drive mode.
//!
//! There is no settings file: the binary fills [`Settings`] from its
//! command-line flags, whose defaults are the constants below.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::gpio::OutputMode;

pub const DEFAULT_CHIP: &str = "/dev/gpiochip0";
pub const DEFAULT_SWITCH_PIN: u32 = 12;
pub const DEFAULT_EXIT_PIN: u32 = 13;
pub const DEFAULT_RED_PIN: u32 = 8;
pub const DEFAULT_GREEN_PIN: u32 = 9;
pub const DEFAULT_BLUE_PIN: u32 = 10;
/// Button sampling period. Handlers must finish well inside it.
pub const DEFAULT_POLL_PERIOD_MS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// GPIO character device, e.g. `/dev/gpiochip0`.
    pub chip: String,
    /// Button that advances the LED color.
    pub switch_pin: u32,
    /// Button that stops the application.
    pub exit_pin: u32,
    pub red_pin: u32,
    pub green_pin: u32,
    pub blue_pin: u32,
    pub poll_period_ms: u64,
    pub output_mode: OutputMode,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            chip: DEFAULT_CHIP.into(),
            switch_pin: DEFAULT_SWITCH_PIN,
            exit_pin: DEFAULT_EXIT_PIN,
            red_pin: DEFAULT_RED_PIN,
            green_pin: DEFAULT_GREEN_PIN,
            blue_pin: DEFAULT_BLUE_PIN,
            poll_period_ms: DEFAULT_POLL_PERIOD_MS,
            output_mode: OutputMode::default(),
        }
    }
}

/// Validation errors that [`Settings::validate`] can return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A zero period would disarm the poll timers.
    ZeroPeriod,
    EmptyChipPath,
    /// Two roles were assigned the same pin.
    DuplicatePin {
        pin: u32,
        first: &'static str,
        second: &'static str,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ZeroPeriod => write!(f, "poll period must be at least 1 ms"),
            ValidationError::EmptyChipPath => write!(f, "GPIO chip path is empty"),
            ValidationError::DuplicatePin { pin, first, second } => {
                write!(f, "pin {pin} is assigned to both {first} and {second}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl Settings {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    /// LED pins in cycle order: red, green, blue.
    pub fn led_pins(&self) -> [u32; 3] {
        [self.red_pin, self.green_pin, self.blue_pin]
    }

    /// Every pin with the name of the role it plays.
    pub fn pin_roles(&self) -> [(&'static str, u32); 5] {
        [
            ("switch button", self.switch_pin),
            ("exit button", self.exit_pin),
            ("red LED", self.red_pin),
            ("green LED", self.green_pin),
            ("blue LED", self.blue_pin),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.chip.trim().is_empty() {
            return Err(ValidationError::EmptyChipPath);
        }
        if self.poll_period_ms == 0 {
            return Err(ValidationError::ZeroPeriod);
        }
        let roles = self.pin_roles();
        for (i, &(first, pin)) in roles.iter().enumerate() {
            if let Some(&(second, _)) = roles[i + 1..].iter().find(|(_, p)| *p == pin) {
                return Err(ValidationError::DuplicatePin { pin, first, second });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_board_wiring() {
        let s = Settings::default();
        assert_eq!(s.switch_pin, 12);
        assert_eq!(s.exit_pin, 13);
        assert_eq!(s.led_pins(), [8, 9, 10]);
        assert_eq!(s.poll_period(), Duration::from_millis(1));
        assert_eq!(s.output_mode, OutputMode::PushPull);
    }

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn zero_period_rejected() {
        let s = Settings {
            poll_period_ms: 0,
            ..Settings::default()
        };
        assert_eq!(s.validate(), Err(ValidationError::ZeroPeriod));
    }

    #[test]
    fn empty_chip_rejected() {
        let s = Settings {
            chip: "  ".into(),
            ..Settings::default()
        };
        assert_eq!(s.validate(), Err(ValidationError::EmptyChipPath));
    }

    #[test]
    fn duplicate_pin_names_both_roles() {
        let s = Settings {
            blue_pin: 12,
            ..Settings::default()
        };
        let err = s.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicatePin {
                pin: 12,
                first: "switch button",
                second: "blue LED",
            }
        );
        assert_eq!(
            err.to_string(),
            "pin 12 is assigned to both switch button and blue LED"
        );
    }

    #[test]
    fn duplicate_led_pins_rejected() {
        let s = Settings {
            green_pin: 8,
            ..Settings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(ValidationError::DuplicatePin { pin: 8, .. })
        ));
    }

    #[test]
    fn serializes_output_mode_kebab_case() {
        let json = serde_json::to_value(Settings {
            output_mode: OutputMode::OpenDrain,
            ..Settings::default()
        })
        .unwrap();
        assert_eq!(json["output_mode"], "open-drain");
        assert_eq!(json["chip"], "/dev/gpiochip0");
        assert_eq!(json["poll_period_ms"], 1);
        assert_eq!(json.as_object().unwrap().len(), 8);
    }
}
