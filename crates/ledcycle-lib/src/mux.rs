//! Readiness multiplexing — periodic timer sources behind one blocking wait.
//!
//! [`Multiplexer`] is the narrow interface the scheduler consumes. The Linux
//! backend is epoll with one timerfd per source; [`mock::MockMux`] scripts
//! readiness for tests.

use std::time::Duration;

use crate::error::Result;

/// Identifies a timer source in wait results.
pub type Token = u64;

pub trait Multiplexer {
    /// Register a timer that fires every `period`, first one period from now.
    /// Fails with a `Resource` error.
    fn add_periodic_timer(&mut self, period: Duration, token: Token) -> Result<()>;

    /// Block until at least one source is ready and append the ready tokens
    /// to `ready`. An interrupted wait may return with nothing appended.
    fn wait(&mut self, ready: &mut Vec<Token>) -> Result<()>;

    /// Consume a timer's pending readiness. Returns how many periods elapsed
    /// since the last consume (more than one means ticks were missed).
    fn consume_timer_event(&mut self, token: Token) -> Result<u64>;

    /// Deregister and close one timer.
    fn remove_timer(&mut self, token: Token) -> Result<()>;

    /// Close the multiplexer. Timers still registered are dropped with it.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

// ── Linux implementation ──

#[cfg(target_os = "linux")]
mod linux_impl {
    use std::collections::HashMap;
    use std::os::fd::{AsFd, AsRawFd, IntoRawFd};

    use nix::errno::Errno;
    use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
    use nix::sys::time::TimeSpec;
    use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};

    use super::*;
    use crate::error::LedCycleError;

    /// Upper bound on events returned by one `epoll_wait`.
    const MAX_EVENTS: usize = 8;

    pub struct EpollMux {
        epoll: Epoll,
        timers: HashMap<Token, TimerFd>,
    }

    impl EpollMux {
        pub fn new() -> Result<Self> {
            let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)
                .map_err(|e| LedCycleError::Resource(format!("epoll_create: {e}")))?;
            Ok(EpollMux {
                epoll,
                timers: HashMap::new(),
            })
        }
    }

    impl Multiplexer for EpollMux {
        fn add_periodic_timer(&mut self, period: Duration, token: Token) -> Result<()> {
            if self.timers.contains_key(&token) {
                return Err(LedCycleError::Resource(format!(
                    "timer {token}: already registered"
                )));
            }
            let timer = TimerFd::new(ClockId::CLOCK_MONOTONIC, TimerFlags::TFD_CLOEXEC)
                .map_err(|e| LedCycleError::Resource(format!("timerfd_create: {e}")))?;
            timer
                .set(
                    Expiration::Interval(TimeSpec::from_duration(period)),
                    TimerSetTimeFlags::empty(),
                )
                .map_err(|e| LedCycleError::Resource(format!("timerfd_settime: {e}")))?;
            self.epoll
                .add(&timer, EpollEvent::new(EpollFlags::EPOLLIN, token))
                .map_err(|e| LedCycleError::Resource(format!("epoll_ctl add: {e}")))?;
            self.timers.insert(token, timer);
            Ok(())
        }

        fn wait(&mut self, ready: &mut Vec<Token>) -> Result<()> {
            let mut events = [EpollEvent::empty(); MAX_EVENTS];
            let count = match self.epoll.wait(&mut events, EpollTimeout::NONE) {
                Ok(n) => n,
                // A signal arrived; let the caller re-check the termination flag.
                Err(Errno::EINTR) => return Ok(()),
                Err(e) => return Err(LedCycleError::Io(format!("epoll_wait: {e}"))),
            };
            ready.extend(events[..count].iter().map(|ev| ev.data()));
            Ok(())
        }

        fn consume_timer_event(&mut self, token: Token) -> Result<u64> {
            let timer = self
                .timers
                .get(&token)
                .ok_or_else(|| LedCycleError::Io(format!("timer {token}: not registered")))?;
            let mut buf = [0u8; 8];
            let n = nix::unistd::read(timer.as_fd().as_raw_fd(), &mut buf)
                .map_err(|e| LedCycleError::Io(format!("timerfd read: {e}")))?;
            if n != buf.len() {
                return Err(LedCycleError::Io(format!(
                    "timerfd read: expected 8 bytes, got {n}"
                )));
            }
            Ok(u64::from_ne_bytes(buf))
        }

        fn remove_timer(&mut self, token: Token) -> Result<()> {
            let timer = self
                .timers
                .remove(&token)
                .ok_or_else(|| LedCycleError::Io(format!("timer {token}: not registered")))?;
            self.epoll
                .delete(&timer)
                .map_err(|e| LedCycleError::Io(format!("epoll_ctl del: {e}")))
        }

        fn close(self) -> Result<()> {
            let EpollMux { epoll, timers } = self;
            drop(timers);
            nix::unistd::close(epoll.0.into_raw_fd())
                .map_err(|e| LedCycleError::Io(format!("close epoll: {e}")))
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::EpollMux;

// ── Mock multiplexer for testing ──

/// Scriptable multiplexer for unit and integration tests.
///
/// Each `wait` pops the next scripted ready set; once the script is empty,
/// every registered timer is reported ready. Waits past the limit fail, so a
/// loop under test can never spin forever.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use crate::error::LedCycleError;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashSet, VecDeque};
    use std::rc::Rc;

    /// Default cap on `wait` calls.
    pub const DEFAULT_WAIT_LIMIT: usize = 1000;

    /// One recorded call, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MuxCall {
        Add(Token),
        Wait,
        Consume(Token),
        Remove(Token),
        Close,
    }

    struct MuxState {
        timers: BTreeMap<Token, Duration>,
        script: VecDeque<Vec<Token>>,
        calls: Vec<MuxCall>,
        wait_limit: usize,
        waits: usize,
        expirations: u64,
        closed: bool,
        fail_add: bool,
        fail_wait: bool,
        fail_consume: HashSet<Token>,
        fail_remove: HashSet<Token>,
        fail_close: bool,
    }

    impl Default for MuxState {
        fn default() -> Self {
            MuxState {
                timers: BTreeMap::new(),
                script: VecDeque::new(),
                calls: Vec::new(),
                wait_limit: DEFAULT_WAIT_LIMIT,
                waits: 0,
                expirations: 1,
                closed: false,
                fail_add: false,
                fail_wait: false,
                fail_consume: HashSet::new(),
                fail_remove: HashSet::new(),
                fail_close: false,
            }
        }
    }

    /// Clones share state: keep one for inspection, hand another to the
    /// scheduler.
    #[derive(Clone, Default)]
    pub struct MockMux {
        state: Rc<RefCell<MuxState>>,
    }

    impl MockMux {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the ready set for the next `wait`.
        pub fn push_ready(&self, tokens: &[Token]) {
            self.state.borrow_mut().script.push_back(tokens.to_vec());
        }

        pub fn set_wait_limit(&self, limit: usize) {
            self.state.borrow_mut().wait_limit = limit;
        }

        /// Expiration count reported by `consume_timer_event`.
        pub fn set_expirations(&self, count: u64) {
            self.state.borrow_mut().expirations = count;
        }

        pub fn fail_add(&self) {
            self.state.borrow_mut().fail_add = true;
        }

        pub fn fail_wait(&self) {
            self.state.borrow_mut().fail_wait = true;
        }

        pub fn fail_consume(&self, token: Token) {
            self.state.borrow_mut().fail_consume.insert(token);
        }

        pub fn fail_remove(&self, token: Token) {
            self.state.borrow_mut().fail_remove.insert(token);
        }

        pub fn fail_close(&self) {
            self.state.borrow_mut().fail_close = true;
        }

        pub fn calls(&self) -> Vec<MuxCall> {
            self.state.borrow().calls.clone()
        }

        pub fn waits(&self) -> usize {
            self.state.borrow().waits
        }

        pub fn timers(&self) -> Vec<(Token, Duration)> {
            self.state
                .borrow()
                .timers
                .iter()
                .map(|(&t, &d)| (t, d))
                .collect()
        }

        pub fn is_closed(&self) -> bool {
            self.state.borrow().closed
        }
    }

    impl Multiplexer for MockMux {
        fn add_periodic_timer(&mut self, period: Duration, token: Token) -> Result<()> {
            let mut st = self.state.borrow_mut();
            st.calls.push(MuxCall::Add(token));
            if st.fail_add {
                return Err(LedCycleError::Resource(
                    "mock: timer registration failure injected".into(),
                ));
            }
            if st.timers.contains_key(&token) {
                return Err(LedCycleError::Resource(format!(
                    "timer {token}: already registered"
                )));
            }
            st.timers.insert(token, period);
            Ok(())
        }

        fn wait(&mut self, ready: &mut Vec<Token>) -> Result<()> {
            let mut st = self.state.borrow_mut();
            st.calls.push(MuxCall::Wait);
            st.waits += 1;
            if st.closed {
                return Err(LedCycleError::Io("mock: wait on closed multiplexer".into()));
            }
            if st.fail_wait {
                return Err(LedCycleError::Io("mock: wait failure injected".into()));
            }
            if st.waits > st.wait_limit {
                return Err(LedCycleError::Io(format!(
                    "mock: wait limit of {} reached",
                    st.wait_limit
                )));
            }
            match st.script.pop_front() {
                Some(tokens) => ready.extend(tokens),
                None => {
                    let all: Vec<Token> = st.timers.keys().copied().collect();
                    ready.extend(all);
                }
            }
            Ok(())
        }

        fn consume_timer_event(&mut self, token: Token) -> Result<u64> {
            let mut st = self.state.borrow_mut();
            st.calls.push(MuxCall::Consume(token));
            if st.fail_consume.contains(&token) {
                return Err(LedCycleError::Io(format!(
                    "timer {token}: mock consume failure injected"
                )));
            }
            if !st.timers.contains_key(&token) {
                return Err(LedCycleError::Io(format!("timer {token}: not registered")));
            }
            Ok(st.expirations)
        }

        fn remove_timer(&mut self, token: Token) -> Result<()> {
            let mut st = self.state.borrow_mut();
            st.calls.push(MuxCall::Remove(token));
            if st.timers.remove(&token).is_none() {
                return Err(LedCycleError::Io(format!("timer {token}: not registered")));
            }
            if st.fail_remove.contains(&token) {
                return Err(LedCycleError::Io(format!(
                    "timer {token}: mock remove failure injected"
                )));
            }
            Ok(())
        }

        fn close(self) -> Result<()> {
            let mut st = self.state.borrow_mut();
            st.calls.push(MuxCall::Close);
            st.closed = true;
            st.timers.clear();
            if st.fail_close {
                return Err(LedCycleError::Io("mock: close failure injected".into()));
            }
            Ok(())
        }
    }
}
