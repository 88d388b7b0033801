//! Single-threaded cooperative event loop.
//!
//! The grid runs on one logical thread driven by discrete events: user
//! interaction, image-load notifications, and idle-time callbacks. Nothing
//! blocks; waiting is expressed by handing a [`Task`] to the loop, which runs
//! it later when the host says so.
//!
//! The host drives time explicitly:
//!
//! - [`EventLoop::signal_idle`]: the host has spare time; queued idle tasks run.
//! - [`EventLoop::advance`]: the monotonic clock moves forward; timers and
//!   idle tasks whose timeout expired run in deadline order.
//!
//! Because the clock only moves when the host advances it, a whole session is
//! deterministic and replayable in tests.
//!
//! Tasks are removed from the queue before they run, so a running task may
//! schedule more work without re-entering a borrow of the loop state.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

/// A deferred continuation.
pub type Task = Box<dyn FnOnce()>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeferError {
    #[error("event loop has shut down")]
    Closed,
}

struct IdleEntry {
    seq: u64,
    deadline: Duration,
    task: Task,
}

#[derive(Default)]
struct LoopState {
    now: Duration,
    next_seq: u64,
    idle: VecDeque<IdleEntry>,
    timers: BTreeMap<(Duration, u64), Task>,
    closed: bool,
}

impl LoopState {
    fn seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Remove the earliest task due at or before `limit`, timers and expired
    /// idle entries together, ordered by `(deadline, seq)`.
    fn pop_due(&mut self, limit: Duration) -> Option<(Duration, Task)> {
        let timer = self.timers.keys().next().copied();
        let idle = self
            .idle
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| (e.deadline, e.seq))
            .map(|(pos, e)| (pos, (e.deadline, e.seq)));

        match (timer, idle) {
            (Some(key), Some((pos, idle_key))) if idle_key < key => {
                self.take_idle(pos, limit)
            }
            (Some(key), _) if key.0 <= limit => {
                let task = self.timers.remove(&key)?;
                Some((key.0, task))
            }
            (None, Some((pos, _))) => self.take_idle(pos, limit),
            _ => None,
        }
    }

    fn take_idle(&mut self, pos: usize, limit: Duration) -> Option<(Duration, Task)> {
        if self.idle.get(pos)?.deadline > limit {
            return None;
        }
        let entry = self.idle.remove(pos)?;
        Some((entry.deadline, entry.task))
    }
}

/// Handle to the host event loop. Clones share the same queue and clock.
#[derive(Clone, Default)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current monotonic time since the loop was created.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Queue `task` for the next idle period. It runs no later than
    /// `timeout` from now even if the host never reports idle time.
    pub fn request_idle(&self, task: Task, timeout: Duration) -> Result<(), DeferError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(DeferError::Closed);
        }
        let seq = state.seq();
        let deadline = state.now + timeout;
        state.idle.push_back(IdleEntry {
            seq,
            deadline,
            task,
        });
        Ok(())
    }

    /// Run `task` once `delay` has elapsed.
    pub fn set_timeout(&self, task: Task, delay: Duration) -> Result<(), DeferError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(DeferError::Closed);
        }
        let seq = state.seq();
        let deadline = state.now + delay;
        state.timers.insert((deadline, seq), task);
        Ok(())
    }

    /// The host has idle time: run every idle task queued before this call.
    ///
    /// Idle tasks queued while these run wait for the next idle period.
    /// Returns the number of tasks run.
    pub fn signal_idle(&self) -> usize {
        let queued = self.state.borrow().idle.len();
        let mut ran = 0;
        for _ in 0..queued {
            let entry = self.state.borrow_mut().idle.pop_front();
            match entry {
                Some(entry) => {
                    (entry.task)();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Move the clock forward by `dt`, running every timer and expired idle
    /// task in deadline order. Returns the number of tasks run.
    pub fn advance(&self, dt: Duration) -> usize {
        let target = self.now() + dt;
        let mut ran = 0;
        loop {
            let due = self.state.borrow_mut().pop_due(target);
            let Some((at, task)) = due else { break };
            {
                let mut state = self.state.borrow_mut();
                state.now = state.now.max(at);
            }
            task();
            ran += 1;
        }
        self.state.borrow_mut().now = target;
        ran
    }

    /// Run until nothing is queued: signal idle, then jump the clock to the
    /// next timer, repeatedly. Returns the number of tasks run.
    pub fn run_to_completion(&self) -> usize {
        let mut ran = 0;
        loop {
            ran += self.signal_idle();
            let next = self.state.borrow().timers.keys().next().map(|k| k.0);
            match next {
                Some(deadline) => {
                    let now = self.now();
                    ran += self.advance(deadline.saturating_sub(now));
                }
                None if self.pending() == 0 => return ran,
                None => {}
            }
        }
    }

    /// Number of queued tasks (idle and timers).
    pub fn pending(&self) -> usize {
        let state = self.state.borrow();
        state.idle.len() + state.timers.len()
    }

    /// Refuse further deferrals. Already queued tasks still run.
    pub fn shutdown(&self) {
        self.state.borrow_mut().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventLoop")
            .field("now", &state.now)
            .field("idle", &state.idle.len())
            .field("timers", &state.timers.len())
            .field("closed", &state.closed)
            .finish()
    }
}
