//! Application loop — wires buttons, LEDs and the scheduler, runs until asked
//! to stop, then releases everything.
//!
//! All state except the [`TerminationFlag`] is owned by [`App`] and touched
//! only from the dispatch thread. Initialization is fail-fast: the first
//! error stops acquisition, and teardown releases whatever was acquired.

use crate::config::Settings;
use crate::debounce::DebouncedInput;
use crate::error::{LedCycleError, Result};
use crate::gpio::{self, DigitalLine, Edge, GpioDriver};
use crate::led::{LedColor, LedSet};
use crate::mux::Multiplexer;
use crate::scheduler::{Scheduler, TimerHandle};
use crate::shutdown::TerminationFlag;

/// What a poll timer is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    SwitchButton,
    ExitButton,
}

/// Exit button: a press requests termination.
pub struct ExitControl<L> {
    input: DebouncedInput<L>,
    flag: TerminationFlag,
}

impl<L: DigitalLine> ExitControl<L> {
    pub fn new(input: DebouncedInput<L>, flag: TerminationFlag) -> Self {
        ExitControl { input, flag }
    }

    /// Returns `true` if this edge requested termination.
    pub fn on_edge(&self, edge: Edge) -> bool {
        if edge != Edge::Falling {
            return false;
        }
        log::info!("Terminating app");
        self.flag.request();
        true
    }

    pub fn poll(&mut self) -> gpio::Result<bool> {
        match self.input.poll()? {
            Some(edge) => Ok(self.on_edge(edge)),
            None => Ok(false),
        }
    }

    pub fn into_input(self) -> DebouncedInput<L> {
        self.input
    }
}

pub struct App<L, M> {
    flag: TerminationFlag,
    scheduler: Option<Scheduler<M, PollTarget>>,
    switch_button: Option<DebouncedInput<L>>,
    exit_button: Option<ExitControl<L>>,
    leds: Option<LedSet<L>>,
    switch_timer: Option<TimerHandle>,
    exit_timer: Option<TimerHandle>,
}

impl<L: DigitalLine, M: Multiplexer> App<L, M> {
    /// An application with nothing acquired yet.
    pub fn new(flag: TerminationFlag) -> Self {
        App {
            flag,
            scheduler: None,
            switch_button: None,
            exit_button: None,
            leds: None,
            switch_timer: None,
            exit_timer: None,
        }
    }

    /// Acquire peripherals and register the poll timers.
    ///
    /// Order: multiplexer, switch input, exit input, LEDs (red lit), switch
    /// timer, exit timer. Stops at the first failure; everything acquired up
    /// to that point stays owned by `self` for [`teardown`](Self::teardown).
    pub fn init<G>(&mut self, settings: &Settings, gpio: &mut G, mux: M) -> Result<()>
    where
        G: GpioDriver<Line = L>,
    {
        let scheduler = self.scheduler.insert(Scheduler::new(mux));
        settings.validate()?;

        log::debug!("[init] opening switch button on GPIO {}", settings.switch_pin);
        let line = gpio.open_input(settings.switch_pin)?;
        self.switch_button = Some(DebouncedInput::new(line));

        log::debug!("[init] opening exit button on GPIO {}", settings.exit_pin);
        let line = gpio.open_input(settings.exit_pin)?;
        self.exit_button = Some(ExitControl::new(
            DebouncedInput::new(line),
            self.flag.clone(),
        ));

        self.leds = Some(LedSet::open(
            gpio,
            settings.led_pins(),
            settings.output_mode,
        )?);

        let period = settings.poll_period();
        self.switch_timer = Some(scheduler.create_timer(period, PollTarget::SwitchButton)?);
        self.exit_timer = Some(scheduler.create_timer(period, PollTarget::ExitButton)?);
        log::debug!("[init] polling both buttons every {period:?}");
        Ok(())
    }

    /// One wait-and-dispatch cycle.
    pub fn step(&mut self) -> Result<()> {
        let scheduler = self
            .scheduler
            .as_mut()
            .ok_or_else(|| LedCycleError::Io("dispatch before initialization".into()))?;
        let switch_button = &mut self.switch_button;
        let leds = &mut self.leds;
        let exit_button = &mut self.exit_button;
        scheduler.wait_and_dispatch(|target, _expirations| match target {
            PollTarget::SwitchButton => poll_switch(switch_button, leds),
            PollTarget::ExitButton => poll_exit(exit_button),
        })
    }

    /// Dispatch until termination is requested. Any error requests
    /// termination and is returned once the loop has stopped.
    pub fn run_loop(&mut self) -> Result<()> {
        let mut outcome = Ok(());
        while !self.flag.is_requested() {
            if let Err(e) = self.step() {
                log::error!("{e}");
                self.flag.request();
                outcome = Err(e);
            }
        }
        outcome
    }

    /// Release everything acquired, in order: LEDs, switch timer, exit timer,
    /// switch input, exit input, multiplexer. Failures are logged and do not
    /// stop later releases. Returns how many releases failed.
    pub fn teardown(&mut self) -> usize {
        log::debug!("Closing peripherals and handlers");
        let mut failures = 0;

        if let Some(leds) = self.leds.take() {
            for (color, line) in LedColor::ALL.into_iter().zip(leds.into_lines()) {
                failures += release(&format!("{color} LED"), line.close().map_err(Into::into));
            }
        }
        if let Some(scheduler) = self.scheduler.as_mut() {
            if let Some(timer) = self.switch_timer.take() {
                failures += release("switch button timer", scheduler.remove_timer(timer));
            }
            if let Some(timer) = self.exit_timer.take() {
                failures += release("exit button timer", scheduler.remove_timer(timer));
            }
        }
        if let Some(input) = self.switch_button.take() {
            failures += release("switch button", input.into_line().close().map_err(Into::into));
        }
        if let Some(exit) = self.exit_button.take() {
            let line = exit.into_input().into_line();
            failures += release("exit button", line.close().map_err(Into::into));
        }
        if let Some(mut scheduler) = self.scheduler.take() {
            failures += release("multiplexer", scheduler.close());
        }
        failures
    }

    pub fn current_led(&self) -> Option<LedColor> {
        self.leds.as_ref().map(LedSet::current)
    }

    pub fn timer(&self, target: PollTarget) -> Option<TimerHandle> {
        match target {
            PollTarget::SwitchButton => self.switch_timer,
            PollTarget::ExitButton => self.exit_timer,
        }
    }

    pub fn termination_flag(&self) -> &TerminationFlag {
        &self.flag
    }
}

fn poll_switch<L: DigitalLine>(
    switch_button: &mut Option<DebouncedInput<L>>,
    leds: &mut Option<LedSet<L>>,
) -> Result<()> {
    let (Some(button), Some(leds)) = (switch_button.as_mut(), leds.as_mut()) else {
        return Err(LedCycleError::Io("switch button polled before initialization".into()));
    };
    if let Some(edge) = button.poll()? {
        leds.on_edge(edge)?;
    }
    Ok(())
}

fn poll_exit<L: DigitalLine>(exit_button: &mut Option<ExitControl<L>>) -> Result<()> {
    let Some(exit) = exit_button.as_mut() else {
        return Err(LedCycleError::Io("exit button polled before initialization".into()));
    };
    exit.poll()?;
    Ok(())
}

/// Log a failed release. Returns 1 on failure so callers can count.
fn release(name: &str, result: Result<()>) -> usize {
    match result {
        Ok(()) => 0,
        Err(e) => {
            log::warn!("could not close {name}: {e}");
            1
        }
    }
}

/// Run the application to completion: init, dispatch loop, teardown.
///
/// Returns the error that stopped the application, if any. Teardown has
/// already happened by the time this returns either way.
pub fn run<G, M>(settings: &Settings, flag: &TerminationFlag, mut gpio: G, mux: M) -> Result<()>
where
    G: GpioDriver,
    M: Multiplexer,
{
    let mut app = App::new(flag.clone());
    let result = match app.init(settings, &mut gpio, mux) {
        Ok(()) => app.run_loop(),
        Err(e) => {
            log::error!("{e}");
            flag.request();
            Err(e)
        }
    };
    app.teardown();
    result
}
