//! `run` subcommand — poll the buttons and cycle the LED until told to stop.

use ledcycle_lib::shutdown::TerminationFlag;

use super::{Result, Settings};

/// Run the application. Failures are logged, never surfaced as a non-zero
/// exit status.
pub(super) fn cmd_run(settings: &Settings) -> Result<()> {
    log::info!("Starting application");

    let flag = TerminationFlag::new();
    install_signal_handler(&flag);

    if let Err(e) = start(settings, &flag) {
        log::error!("{e}");
    }

    log::info!("Application exiting");
    Ok(())
}

#[cfg(not(windows))]
fn install_signal_handler(flag: &TerminationFlag) {
    let handler_flag = flag.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.request()) {
        log::warn!("signal handler not installed: {e}");
    }
}

#[cfg(windows)]
fn install_signal_handler(_flag: &TerminationFlag) {}

#[cfg(target_os = "linux")]
fn start(settings: &Settings, flag: &TerminationFlag) -> Result<()> {
    use ledcycle_lib::app;
    use ledcycle_lib::gpio::CdevGpio;
    use ledcycle_lib::mux::{EpollMux, Multiplexer};

    let mux = EpollMux::new()?;
    let gpio = match CdevGpio::open(&settings.chip) {
        Ok(gpio) => gpio,
        Err(e) => {
            flag.request();
            if let Err(close_err) = mux.close() {
                log::warn!("[mux] close: {close_err}");
            }
            return Err(e.into());
        }
    };
    log::debug!(
        "[run] chip={} period={:?} mode={}",
        settings.chip,
        settings.poll_period(),
        settings.output_mode
    );
    app::run(settings, flag, gpio, mux)
}

#[cfg(not(target_os = "linux"))]
fn start(_settings: &Settings, flag: &TerminationFlag) -> Result<()> {
    flag.request();
    Err(ledcycle_lib::LedCycleError::Resource(
        "GPIO character devices are only available on Linux".into(),
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use nix::sys::signal::{Signal, raise};

    // The only test in this binary that installs the process-wide handler.
    #[test]
    fn sigterm_requests_termination() {
        let flag = TerminationFlag::new();
        install_signal_handler(&flag);
        assert!(!flag.is_requested());

        raise(Signal::SIGTERM).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !flag.is_requested() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(flag.is_requested());
    }
}
