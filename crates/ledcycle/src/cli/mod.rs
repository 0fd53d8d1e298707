//! CLI subcommands — run the control loop, show resolved settings.

mod config_cmd;
mod run;

use clap::{Args, Subcommand};
use serde::Serialize;

pub(super) use ledcycle_lib::config::{self, Settings};
pub(super) use ledcycle_lib::error::Result;
pub(super) use ledcycle_lib::gpio::OutputMode;

const PADDING: usize = 2;

/// Alignment width for key/value output: longest key plus padding.
pub(super) fn kv_width(keys: &[&str]) -> usize {
    keys.iter().map(|k| k.len()).max().map_or(0, |w| w + PADDING)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

/// Pin assignment and timing flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct PinArgs {
    /// GPIO character device
    #[arg(long, default_value = config::DEFAULT_CHIP)]
    chip: String,
    /// Pin of the button that advances the LED color
    #[arg(long, default_value_t = config::DEFAULT_SWITCH_PIN)]
    switch_pin: u32,
    /// Pin of the button that stops the application
    #[arg(long, default_value_t = config::DEFAULT_EXIT_PIN)]
    exit_pin: u32,
    /// Pin of the red LED (active-low)
    #[arg(long, default_value_t = config::DEFAULT_RED_PIN)]
    red_pin: u32,
    /// Pin of the green LED (active-low)
    #[arg(long, default_value_t = config::DEFAULT_GREEN_PIN)]
    green_pin: u32,
    /// Pin of the blue LED (active-low)
    #[arg(long, default_value_t = config::DEFAULT_BLUE_PIN)]
    blue_pin: u32,
    /// Button sampling period in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_POLL_PERIOD_MS)]
    period_ms: u64,
    /// LED output drive: push-pull, open-drain or open-source
    #[arg(long, default_value_t = OutputMode::PushPull)]
    output_mode: OutputMode,
}

impl PinArgs {
    pub(super) fn to_settings(&self) -> Settings {
        Settings {
            chip: self.chip.clone(),
            switch_pin: self.switch_pin,
            exit_pin: self.exit_pin,
            red_pin: self.red_pin,
            green_pin: self.green_pin,
            blue_pin: self.blue_pin,
            poll_period_ms: self.period_ms,
            output_mode: self.output_mode,
        }
    }
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub version: String,
    pub settings: Settings,
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the control loop until the exit button, a signal, or an I/O error
    Run {
        #[command(flatten)]
        pins: PinArgs,
    },

    /// Show the resolved settings and whether they are valid
    Config {
        #[command(flatten)]
        pins: PinArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cmd: Command) -> Result<()> {
    match cmd {
        Command::Run { pins } => run::cmd_run(&pins.to_settings()),
        Command::Config { pins, json } => config_cmd::cmd_config(&pins.to_settings(), json),
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn kv_width_uses_longest_key() {
        // "Switch button:" = 14 + PADDING
        assert_eq!(kv_width(&["Chip:", "Switch button:"]), 16);
    }

    #[test]
    fn kv_width_empty() {
        assert_eq!(kv_width(&[]), 0);
    }

    #[test]
    fn format_kv_pads_key() {
        assert_eq!(format_kv("Key:", "value", 10), "Key:      value");
    }

    #[test]
    fn format_kv_long_key_not_truncated() {
        assert_eq!(format_kv("ExactWidth:", "val", 10), "ExactWidth:val");
    }
}

#[cfg(test)]
mod args_tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Command,
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["ledcycle"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn run_defaults_match_settings_defaults() {
        let Command::Run { pins } = parse(&["run"]) else {
            panic!("expected run");
        };
        assert_eq!(pins.to_settings(), Settings::default());
    }

    #[test]
    fn config_flags_override_defaults() {
        let Command::Config { pins, json } = parse(&[
            "config",
            "--json",
            "--switch-pin",
            "4",
            "--period-ms",
            "5",
            "--output-mode",
            "open-drain",
        ]) else {
            panic!("expected config");
        };
        assert!(json);
        let s = pins.to_settings();
        assert_eq!(s.switch_pin, 4);
        assert_eq!(s.poll_period_ms, 5);
        assert_eq!(s.output_mode, OutputMode::OpenDrain);
        assert_eq!(s.exit_pin, config::DEFAULT_EXIT_PIN);
    }

    #[test]
    fn bad_output_mode_rejected() {
        let argv = ["ledcycle", "run", "--output-mode", "tristate"];
        assert!(TestCli::try_parse_from(argv).is_err());
    }

    #[test]
    fn config_output_has_expected_fields() {
        let output = ConfigOutput {
            version: "0.1.0".into(),
            settings: Settings::default(),
            valid: true,
            error: None,
        };
        let json = serde_json::to_value(&output).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(json["settings"]["switch_pin"], 12);
        assert!(json["error"].is_null());
    }
}
