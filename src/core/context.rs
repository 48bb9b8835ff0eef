//! Per-thread scheduling state and its thread-local binding.
//!
//! Every thread that participates in the scheduler, whether a pool-owned
//! worker or an adopted external thread, owns a `WorkerContext`: a
//! work-stealing queue that it alone pushes to and pops from, and a small
//! RNG for picking steal victims. The context is installed in thread-local
//! storage so the submission APIs can find the calling thread's queue.

use std::cell::RefCell;

use crossbeam_deque::{Steal, Stealer, Worker as WorkerQueue};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use super::Shared;
use crate::sync::{Arc, Ordering};

pub(crate) struct WorkerContext {
    index: u32,
    /// Unique bit for this context, handy in logs.
    bit: u64,
    is_worker: bool,
    queue: WorkerQueue<u16>,
    rng: SmallRng,
}

impl WorkerContext {
    pub fn new(index: u32, is_worker: bool) -> (Self, Stealer<u16>) {
        // The owner end is LIFO: a thread drains its most recent work first
        // while thieves take the oldest entries from the other end.
        let queue = WorkerQueue::new_lifo();
        let stealer = queue.stealer();
        let ctx = WorkerContext {
            index,
            bit: 1u64 << index,
            is_worker,
            queue,
            rng: SmallRng::from_entropy(),
        };
        (ctx, stealer)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn bit(&self) -> u64 {
        self.bit
    }

    pub fn is_worker(&self) -> bool {
        self.is_worker
    }

    pub fn push(&self, job_index: u16) {
        self.queue.push(job_index);
    }

    pub fn pop(&self) -> Option<u16> {
        self.queue.pop()
    }

    /// Local queue first, then a single steal attempt from a random victim.
    pub fn fetch_job(&mut self, shared: &Shared) -> Option<u16> {
        if let Some(index) = self.queue.pop() {
            return Some(index);
        }
        self.steal_one(shared)
    }

    fn steal_one(&mut self, shared: &Shared) -> Option<u16> {
        // Unclaimed adoption slots are excluded; their queues are empty
        // anyway. Relaxed is fine, the slot table itself is pre-initialized.
        let victims = shared.worker_count + shared.adopted.load(Ordering::Relaxed);
        debug_assert!(victims > 0);
        // Biased when the victim count is not a power of two; uniform enough.
        let victim = self.rng.next_u32() % victims;
        if victim == self.index {
            return None;
        }
        match shared.stealers[victim as usize].steal() {
            Steal::Success(index) => Some(index),
            // Losing a race is treated the same as an empty queue: the
            // caller retries on its next pass or goes to sleep.
            Steal::Empty | Steal::Retry => None,
        }
    }
}

pub(crate) struct WorkerBinding {
    pub ctx: WorkerContext,
    pub shared: Arc<Shared>,
}

thread_local! {
    static CURRENT: RefCell<Option<WorkerBinding>> = RefCell::new(None);
}

/// Installs the calling thread's context. Panics if one is already
/// installed.
pub(crate) fn bind(binding: WorkerBinding) {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        assert!(
            current.is_none(),
            "thread is already attached to a job system"
        );
        *current = Some(binding);
    });
}

pub(crate) fn unbind() -> Option<WorkerBinding> {
    CURRENT.with(|current| current.borrow_mut().take())
}

/// Runs `f` with the calling thread's binding, if any.
///
/// The borrow only lasts for the duration of `f`; job functions re-enter
/// this module (to push children, say) strictly after `f` returns.
pub(crate) fn with_current<R>(f: impl FnOnce(Option<&mut WorkerBinding>) -> R) -> R {
    CURRENT.with(|current| f(current.borrow_mut().as_mut()))
}

pub(crate) fn current_shared() -> Option<Arc<Shared>> {
    with_current(|binding| binding.map(|b| Arc::clone(&b.shared)))
}
