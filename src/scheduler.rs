//! Debounced repaint scheduling.
//!
//! The first store mutation while idle arms a one-shot trigger; further
//! mutations before it fires are absorbed. When the trigger fires the host's
//! repaint hook runs and the scheduler is idle again. `stop()` cancels an
//! armed trigger without firing it.

use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Cancellation handle for a task armed on a [`Timer`].
pub trait TimerHandle: Send {
    fn cancel(&self);
}

/// One-shot delayed task primitive, independent of any particular event loop.
pub trait Timer: Send + Sync {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> Box<dyn TimerHandle>;
}

/// [`Timer`] backed by a tokio runtime: spawn, sleep, run.
#[derive(Clone, Debug)]
pub struct TokioTimer {
    handle: Handle,
}

impl TokioTimer {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Timer on the runtime of the calling context.
    ///
    /// Panics outside a tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

struct TokioTimerHandle(JoinHandle<()>);

impl TimerHandle for TokioTimerHandle {
    fn cancel(&self) {
        self.0.abort();
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> Box<dyn TimerHandle> {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Box::new(TokioTimerHandle(join))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaintState {
    Idle,
    PendingRepaint,
}

struct Slot {
    state: RepaintState,
    // Bumped on every arm and every stop; a trigger only fires if its
    // generation is still current.
    generation: u64,
    pending: Option<Box<dyn TimerHandle>>,
}

struct Inner {
    delay: Duration,
    timer: Arc<dyn Timer>,
    repaint: Box<dyn Fn() + Send + Sync>,
    slot: Mutex<Slot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, generation: u64) {
        {
            let mut slot = self.lock();
            if slot.state != RepaintState::PendingRepaint || slot.generation != generation {
                return;
            }
            slot.state = RepaintState::Idle;
            slot.pending = None;
        }
        debug!("repaint trigger fired");
        (self.repaint)();
    }
}

/// Coalesces bursts of store mutations into one delayed repaint.
pub struct UpdateScheduler {
    inner: Arc<Inner>,
}

impl UpdateScheduler {
    pub fn new<F>(delay: Duration, timer: Arc<dyn Timer>, repaint: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                delay,
                timer,
                repaint: Box::new(repaint),
                slot: Mutex::new(Slot {
                    state: RepaintState::Idle,
                    generation: 0,
                    pending: None,
                }),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    pub fn state(&self) -> RepaintState {
        self.inner.lock().state
    }

    /// Record a store mutation. Returns `true` if this call armed a new trigger.
    pub fn notify(&self) -> bool {
        let mut slot = self.inner.lock();
        if slot.state == RepaintState::PendingRepaint {
            return false;
        }

        slot.state = RepaintState::PendingRepaint;
        slot.generation += 1;
        let generation = slot.generation;

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = self.inner.timer.schedule(
            self.inner.delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(generation);
                }
            }),
        );
        slot.pending = Some(handle);
        debug!("repaint armed ({:?})", self.inner.delay);
        true
    }

    /// Cancel any armed trigger and return to idle without repainting.
    ///
    /// Returns `true` if a trigger was pending.
    pub fn stop(&self) -> bool {
        let mut slot = self.inner.lock();
        slot.generation += 1;
        let was_pending = slot.state == RepaintState::PendingRepaint;
        slot.state = RepaintState::Idle;
        if let Some(handle) = slot.pending.take() {
            handle.cancel();
        }
        if was_pending {
            debug!("pending repaint cancelled");
        }
        was_pending
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
