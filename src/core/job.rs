//! The pooled job record and the handles that reference it.
//!
//! A job is a function plus a small inline buffer holding the function's
//! captured state, a link to its parent, and two atomic counters:
//!
//! - `running_jobs` aggregates the job's own execution and every live
//!   descendant. It starts at one (the job itself) and each new child adds
//!   one. When it reaches zero the whole subtree is done.
//! - `ref_count` counts live references: the queue entry, retained handles,
//!   the completion walk. When it reaches zero the record goes back to the
//!   pool.
//!
//! Closures are written directly into the record's inline storage, so
//! scheduling a job performs no heap allocation. The closure type must fit
//! in [`JOB_STORAGE_SIZE`] bytes, which is checked at compile time.

use std::cell::UnsafeCell;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;

use super::Shared;
use crate::sync::{fence, Arc, AtomicI32, Ordering};
use crate::JobSystem;

/// Capacity of the job pool. Bounds the number of jobs in flight at any
/// moment (queued, executing, or not yet finalized).
pub(crate) const MAX_JOB_COUNT: usize = 4096;

/// Parent links are pool indices; this sentinel marks the absence of a parent.
pub(crate) const PARENT_NONE: u16 = 0x7fff;

/// Size of a job's inline closure storage, in bytes.
pub const JOB_STORAGE_SIZE: usize = 48;

#[repr(align(16))]
struct JobStorage([MaybeUninit<u8>; JOB_STORAGE_SIZE]);

pub(crate) type ExecFn = unsafe fn(*mut u8, &JobSystem, JobRef);
pub(crate) type DropFn = unsafe fn(*mut u8);

pub(crate) struct Job {
    /// Position of this record in the pool. Fixed for the pool's lifetime.
    index: u16,
    parent: UnsafeCell<u16>,
    exec_fn: UnsafeCell<Option<ExecFn>>,
    drop_fn: UnsafeCell<Option<DropFn>>,
    storage: UnsafeCell<JobStorage>,
    running_jobs: AtomicI32,
    ref_count: AtomicI32,
}

// The non-atomic fields are written by the creating thread before the job is
// published to a queue, and only touched afterwards by the single thread
// that pops, executes or finalizes the job.
unsafe impl Send for Job {}
unsafe impl Sync for Job {}

impl Job {
    pub(crate) fn new(index: u16) -> Self {
        Job {
            index,
            parent: UnsafeCell::new(PARENT_NONE),
            exec_fn: UnsafeCell::new(None),
            drop_fn: UnsafeCell::new(None),
            storage: UnsafeCell::new(JobStorage([MaybeUninit::uninit(); JOB_STORAGE_SIZE])),
            running_jobs: AtomicI32::new(0),
            ref_count: AtomicI32::new(0),
        }
    }

    /// Called by the pool when handing the slot out. The slot is not visible
    /// to any other thread between the free-list pop and the first
    /// publication, so relaxed stores are enough.
    pub(crate) fn reset(&self) {
        self.running_jobs.store(1, Ordering::Relaxed);
        self.ref_count.store(1, Ordering::Relaxed);
        unsafe {
            *self.parent.get() = PARENT_NONE;
            *self.exec_fn.get() = None;
            *self.drop_fn.get() = None;
        }
    }

    pub(crate) fn index(&self) -> u16 {
        self.index
    }

    pub(crate) fn parent_index(&self) -> u16 {
        unsafe { *self.parent.get() }
    }

    pub(crate) fn set_parent(&self, parent: u16) {
        unsafe { *self.parent.get() = parent }
    }

    /// Moves `func` into the record's inline storage and installs the erased
    /// entry points for it.
    ///
    /// Safety: must be called once, before the job is published, by the
    /// thread that allocated it.
    pub(crate) unsafe fn init<F>(&self, func: F)
    where
        F: FnOnce(&JobSystem, JobRef) + Send,
    {
        const {
            assert!(
                std::mem::size_of::<F>() <= JOB_STORAGE_SIZE,
                "job closure does not fit in a job's inline storage"
            );
            assert!(std::mem::align_of::<F>() <= std::mem::align_of::<JobStorage>());
        }
        (*self.storage.get()).0.as_mut_ptr().cast::<F>().write(func);
        *self.exec_fn.get() = Some(call_erased::<F>);
        *self.drop_fn.get() = Some(drop_erased::<F>);
    }

    pub(crate) fn storage_ptr(&self) -> *mut u8 {
        unsafe { (*self.storage.get()).0.as_mut_ptr().cast() }
    }

    /// Takes the function, transferring ownership of the stored closure to
    /// the caller. Returns `None` for synchronization-only jobs. Clearing
    /// the entry is what enforces at-most-once execution.
    pub(crate) fn take_exec(&self) -> Option<ExecFn> {
        unsafe {
            let exec = (*self.exec_fn.get()).take();
            if exec.is_some() {
                *self.drop_fn.get() = None;
            }
            exec
        }
    }

    /// Drops a closure that was stored but never executed.
    pub(crate) fn drop_payload(&self) {
        unsafe {
            if let Some(drop_fn) = (*self.drop_fn.get()).take() {
                drop_fn(self.storage_ptr());
            }
        }
    }

    /// Registers one more unit of live work (a new child). No action depends
    /// on the new value, relaxed is enough.
    pub(crate) fn add_running(&self) -> i32 {
        self.running_jobs.fetch_add(1, Ordering::Relaxed)
    }

    /// Retires one unit of work. Release, so that the thread that observes
    /// zero also observes every write made under this counter.
    pub(crate) fn dec_running(&self) -> i32 {
        self.running_jobs.fetch_sub(1, Ordering::Release)
    }

    pub(crate) fn has_completed(&self) -> bool {
        self.running_jobs.load(Ordering::Relaxed) <= 0
    }

    pub(crate) fn add_ref(&self) {
        // No action is taken on the incremented value, relaxed is enough.
        self.ref_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns true when this released the last reference; the caller then
    /// owns the slot and must recycle it.
    ///
    /// Release on the decrement so our prior accesses complete before
    /// another thread destroys the record; acquire fence before handing the
    /// slot back so this thread observes everyone else's accesses too.
    pub(crate) fn release_ref(&self) -> bool {
        let prev = self.ref_count.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0);
        if prev == 1 {
            fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }
}

unsafe fn call_erased<F>(storage: *mut u8, system: &JobSystem, job: JobRef)
where
    F: FnOnce(&JobSystem, JobRef) + Send,
{
    let func = storage.cast::<F>().read();
    func(system, job);
}

unsafe fn drop_erased<F>(storage: *mut u8) {
    storage.cast::<F>().drop_in_place()
}

/// A borrowed, copyable reference to a job, used to parent new jobs.
///
/// The reference passed to a job's function designates the running job
/// itself, so a job can attach children to its own completion.
#[derive(Copy, Clone)]
pub struct JobRef<'a> {
    pub(crate) job: &'a Job,
}

impl<'a> JobRef<'a> {
    pub(crate) fn new(job: &'a Job) -> Self {
        JobRef { job }
    }

    /// Whether the job and all of its descendants have finished.
    pub fn is_complete(&self) -> bool {
        let complete = self.job.has_completed();
        if complete {
            // Pair with the release decrement that retired the subtree.
            fence(Ordering::Acquire);
        }
        complete
    }
}

/// Exclusive handle to a job that has not been submitted yet.
///
/// Dropping the handle without running the job aborts it: the stored closure
/// is dropped unexecuted but completion still propagates to the parent
/// chain, so a waiter on an ancestor does not hang and the slot returns to
/// the pool.
#[must_use]
pub struct JobHandle {
    pub(crate) job: NonNull<Job>,
    pub(crate) shared: Arc<Shared>,
}

unsafe impl Send for JobHandle {}

impl JobHandle {
    /// Borrows this job to use it as the parent of new jobs.
    pub fn as_job(&self) -> JobRef<'_> {
        JobRef::new(unsafe { self.job.as_ref() })
    }

    pub(crate) fn into_parts(self) -> (NonNull<Job>, Arc<Shared>) {
        let this = ManuallyDrop::new(self);
        (this.job, unsafe { std::ptr::read(&this.shared) })
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        let job = unsafe { self.job.as_ref() };
        job.drop_payload();
        super::finish(&self.shared, job);
    }
}

/// A reference to a submitted job, returned by
/// [`run_and_retain`](JobSystem::run_and_retain).
///
/// Keeps the record alive so the job can be waited on after submission. The
/// reference is released by [`wait`](JobSystem::wait) or by dropping the
/// handle.
#[must_use]
pub struct RetainedJob {
    pub(crate) job: NonNull<Job>,
    pub(crate) shared: Arc<Shared>,
}

unsafe impl Send for RetainedJob {}
unsafe impl Sync for RetainedJob {}

impl RetainedJob {
    pub fn as_job(&self) -> JobRef<'_> {
        JobRef::new(unsafe { self.job.as_ref() })
    }

    /// Whether the job and all of its descendants have finished.
    pub fn is_complete(&self) -> bool {
        self.as_job().is_complete()
    }
}

impl Drop for RetainedJob {
    fn drop(&mut self) {
        super::release(&self.shared, unsafe { self.job.as_ref() });
    }
}

/// Flags accepted by [`run_with_flags`](JobSystem::run_with_flags).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunFlags(u32);

impl RunFlags {
    pub const NONE: RunFlags = RunFlags(0);
    /// Do not wake a sleeping worker for this job. Useful when submitting a
    /// batch: let the last submission (or the submitter's own wait) pick up
    /// the slack.
    pub const DONT_SIGNAL: RunFlags = RunFlags(1);

    pub fn contains(self, other: RunFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for RunFlags {
    type Output = RunFlags;
    fn bitor(self, rhs: RunFlags) -> RunFlags {
        RunFlags(self.0 | rhs.0)
    }
}

#[test]
fn run_flags() {
    assert!(RunFlags::DONT_SIGNAL.contains(RunFlags::DONT_SIGNAL));
    assert!(!RunFlags::NONE.contains(RunFlags::DONT_SIGNAL));
    assert!((RunFlags::NONE | RunFlags::DONT_SIGNAL).contains(RunFlags::DONT_SIGNAL));
    assert_eq!(RunFlags::default(), RunFlags::NONE);
}
