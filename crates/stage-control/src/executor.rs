//! Owner-thread executor
//!
//! Serializes work onto the application's single owner thread. The request
//! thread enqueues a task and blocks on a completion slot; the owner thread
//! drains the queue once per host tick. If the owner thread does not get to
//! the task within the caller's budget, the wait is abandoned and the slot is
//! marked so the stale task is skipped, or its result discarded if it was
//! already running.
//!
//! The task channel is owned here; there is no global queue. Fire-and-forget
//! posts share the same channel as blocking calls, so a deferred action is
//! guaranteed to run before anything enqueued after it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;

use stage_protocol::tokens;

/// The owner thread is gone; nothing can be scheduled anymore
#[derive(Error, Debug)]
#[error("Owner-thread task channel is closed")]
pub struct PostError;

enum Job {
    /// Blocking call with a waiting request thread
    Call {
        task: Box<dyn FnOnce() -> String + Send>,
        slot: Arc<CompletionSlot>,
    },
    /// Fire-and-forget action for the next tick
    Post(Box<dyn FnOnce() + Send>),
}

enum SlotState {
    Pending,
    Done(String),
    Abandoned,
}

struct CompletionSlot {
    state: Mutex<SlotState>,
    cond: Condvar,
}

impl CompletionSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // A panicking task is caught before it can poison the lock, but be
        // tolerant anyway.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Dispatcher half: enqueues work and waits for results
pub struct OwnerThreadExecutor {
    tx: Sender<Job>,
    default_timeout: Duration,
}

/// Handle for fire-and-forget scheduling onto the owner thread
#[derive(Clone)]
pub struct DeferredPoster {
    tx: Sender<Job>,
}

/// Owner half: held by the host and drained once per tick
pub struct OwnerTick {
    rx: Receiver<Job>,
}

impl OwnerThreadExecutor {
    /// Create the executor pair
    pub fn new(default_timeout: Duration) -> (Self, OwnerTick) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                tx,
                default_timeout,
            },
            OwnerTick { rx },
        )
    }

    /// A poster for deferring actions to the next tick
    pub fn poster(&self) -> DeferredPoster {
        DeferredPoster {
            tx: self.tx.clone(),
        }
    }

    /// Run a task on the owner thread with the default budget
    pub fn run(&self, task: impl FnOnce() -> String + Send + 'static) -> String {
        self.run_with_timeout(task, self.default_timeout)
    }

    /// Run a task on the owner thread, blocking the caller up to `timeout`.
    ///
    /// Returns the task's result, or `error:timeout` if the owner thread did
    /// not complete it in time.
    pub fn run_with_timeout(
        &self,
        task: impl FnOnce() -> String + Send + 'static,
        timeout: Duration,
    ) -> String {
        let slot = Arc::new(CompletionSlot::new());
        let job = Job::Call {
            task: Box::new(task),
            slot: Arc::clone(&slot),
        };

        if self.tx.send(job).is_err() {
            tracing::warn!("Owner-thread channel closed; request cannot be dispatched");
            return tokens::ERROR_TIMEOUT.to_string();
        }

        let guard = slot.lock();
        let (mut guard, _) = slot
            .cond
            .wait_timeout_while(guard, timeout, |state| matches!(state, SlotState::Pending))
            .unwrap_or_else(|e| e.into_inner());

        // Take the result if it arrived; leave the slot abandoned otherwise
        // so the owner thread skips the task or discards its result.
        match std::mem::replace(&mut *guard, SlotState::Abandoned) {
            SlotState::Done(result) => result,
            _ => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Command timeout");
                tokens::ERROR_TIMEOUT.to_string()
            }
        }
    }
}

impl DeferredPoster {
    /// Schedule an action for the next tick without waiting for it
    pub fn post(&self, action: impl FnOnce() + Send + 'static) -> Result<(), PostError> {
        self.tx.send(Job::Post(Box::new(action))).map_err(|_| PostError)
    }
}

impl OwnerTick {
    /// Drain and execute all queued work. Called by the host's owner thread.
    ///
    /// Task panics are caught and turned into `error:command_exception`; they
    /// never propagate into the host loop.
    pub fn tick(&self) {
        while let Ok(job) = self.rx.try_recv() {
            match job {
                Job::Post(action) => {
                    if catch_unwind(AssertUnwindSafe(action)).is_err() {
                        tracing::error!("Deferred action panicked");
                    }
                }
                Job::Call { task, slot } => {
                    if matches!(*slot.lock(), SlotState::Abandoned) {
                        tracing::debug!("Skipping abandoned task");
                        continue;
                    }

                    let result = match catch_unwind(AssertUnwindSafe(task)) {
                        Ok(result) => result,
                        Err(_) => {
                            tracing::error!("Command execution panicked");
                            tokens::ERROR_COMMAND_EXCEPTION.to_string()
                        }
                    };

                    let mut state = slot.lock();
                    if matches!(*state, SlotState::Abandoned) {
                        tracing::debug!("Discarding result of abandoned task");
                        continue;
                    }
                    *state = SlotState::Done(result);
                    slot.cond.notify_one();
                }
            }
        }
    }
}
