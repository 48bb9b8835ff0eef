//! A fork-join job scheduler built around per-worker queues and random work
//! stealing.
//!
//! Jobs are short-lived units of compute arranged in a parent/child tree.
//! Each job tracks the completion of its entire subtree through an atomic
//! counter, so waiting on a job waits on everything it spawned,
//! transitively. Waiting threads never park while there is runnable work:
//! they pick up and execute queued jobs themselves instead of blocking.
//!
//! What we want:
//! - Workers that have nothing to execute get off the CPU (a condition
//!   variable sleep) rather than spinning.
//! - Threads the scheduler does not own can temporarily join the pool
//!   ([`JobSystem::adopt`]) to submit work and help execute it.
//! - Job records come from a fixed-size pool; steady-state scheduling does
//!   not allocate.
//! - No need to scale to very large thread counts; the sweet spot is a
//!   handful of workers sized to the machine's physical cores.

mod core;
pub mod helpers;
mod platform;

pub use crate::core::job::{JobHandle, JobRef, RetainedJob, RunFlags, JOB_STORAGE_SIZE};
pub use crate::core::sync;
pub use crate::core::system::{JobSystem, JobSystemBuilder, JobSystemId, WorkerHook};
pub use crate::platform::ThreadPriority;
