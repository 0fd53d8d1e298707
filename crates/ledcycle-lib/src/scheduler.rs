//! Periodic poll scheduler — timers bound to handler values, one blocking wait.
//!
//! Handlers are plain values (typically a small `Copy` enum) mapped by timer
//! token. [`Scheduler::wait_and_dispatch`] hands each ready handler back to
//! the caller's dispatch closure, so the scheduler never borrows the state
//! the handlers act on.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{LedCycleError, Result};
use crate::mux::{Multiplexer, Token};

/// Identity of one registered timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(Token);

impl TimerHandle {
    pub fn token(self) -> Token {
        self.0
    }
}

/// Lifecycle: created with a multiplexer, timers registered, waited on any
/// number of times, then closed. Nothing happens after close.
pub struct Scheduler<M, H> {
    mux: Option<M>,
    handlers: BTreeMap<Token, H>,
    next_token: Token,
    ready: Vec<Token>,
}

impl<M: Multiplexer, H: Copy> Scheduler<M, H> {
    pub fn new(mux: M) -> Self {
        Scheduler {
            mux: Some(mux),
            handlers: BTreeMap::new(),
            next_token: 0,
            ready: Vec::new(),
        }
    }

    /// Register a periodic timer that dispatches `handler` on every tick.
    pub fn create_timer(&mut self, period: Duration, handler: H) -> Result<TimerHandle> {
        if period.is_zero() {
            return Err(LedCycleError::Resource(
                "timer period must be non-zero".into(),
            ));
        }
        let mux = self
            .mux
            .as_mut()
            .ok_or_else(|| LedCycleError::Resource("scheduler is closed".into()))?;
        let token = self.next_token;
        mux.add_periodic_timer(period, token)?;
        self.next_token += 1;
        self.handlers.insert(token, handler);
        Ok(TimerHandle(token))
    }

    /// Block until at least one timer is ready, then run `dispatch` for every
    /// ready timer before returning. A wait interrupted by a signal returns
    /// `Ok` without dispatching anything.
    ///
    /// Each timer's readiness is consumed before its handler runs; `dispatch`
    /// also receives the number of elapsed periods. The first error (wait,
    /// consume, unknown token, or handler) stops dispatch and is returned.
    pub fn wait_and_dispatch<F>(&mut self, mut dispatch: F) -> Result<()>
    where
        F: FnMut(H, u64) -> Result<()>,
    {
        let mux = self
            .mux
            .as_mut()
            .ok_or_else(|| LedCycleError::Io("scheduler is closed".into()))?;
        self.ready.clear();
        mux.wait(&mut self.ready)?;
        for token in self.ready.drain(..) {
            let handler = *self.handlers.get(&token).ok_or_else(|| {
                LedCycleError::Io(format!("readiness token {token} matches no timer"))
            })?;
            let expirations = mux.consume_timer_event(token)?;
            if expirations > 1 {
                log::trace!("[sched] timer {token}: {} ticks missed", expirations - 1);
            }
            dispatch(handler, expirations)?;
        }
        Ok(())
    }

    /// Deregister one timer.
    pub fn remove_timer(&mut self, timer: TimerHandle) -> Result<()> {
        let mux = self
            .mux
            .as_mut()
            .ok_or_else(|| LedCycleError::Io("scheduler is closed".into()))?;
        self.handlers.remove(&timer.0);
        mux.remove_timer(timer.0)
    }

    pub fn timer_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.mux.is_none()
    }

    /// Close the multiplexer. Timers still registered are removed first;
    /// their failures are logged, only the multiplexer's own close error is
    /// returned. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut mux) = self.mux.take() else {
            return Ok(());
        };
        for token in std::mem::take(&mut self.handlers).into_keys() {
            if let Err(e) = mux.remove_timer(token) {
                log::warn!("[sched] could not remove timer {token}: {e}");
            }
        }
        mux.close()
    }
}
