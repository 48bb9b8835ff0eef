pub mod context;
pub mod job;
pub mod pool;
pub mod shutdown;
pub mod system;
/// basic std::sync types reexported here so that we can hook loom into them
/// for testing.
pub mod sync;

use std::panic::{self, AssertUnwindSafe};

use crossbeam_deque::Stealer;
use crossbeam_utils::CachePadded;

use crate::platform;
use crate::sync::{fence, thread, Arc, AtomicU16, AtomicU32, Condvar, Mutex, Ordering};
use context::{WorkerBinding, WorkerContext};
use job::{Job, JobRef, MAX_JOB_COUNT, PARENT_NONE};
use pool::JobPool;
use shutdown::Shutdown;
use system::{JobSystem, JobSystemBuilder, WorkerHooks};

/// Data accessible by every thread participating in one scheduler.
///
/// If you are familiar with rayon's code, this is somewhat equivalent to
/// their `Registry` struct.
pub(crate) struct Shared {
    pub id: system::JobSystemId,
    /// Number of pool-owned worker threads.
    pub worker_count: u32,
    /// Number of adoption slots claimed so far. Steal victim selection only
    /// considers claimed slots.
    pub adopted: AtomicU32,
    pub pool: JobPool,
    /// One steal handle per context: workers first, adoption slots after.
    pub stealers: Vec<CachePadded<Stealer<u16>>>,
    /// Contexts for not-yet-adopted slots, claimed by `adopt`.
    pub adopt_slots: Mutex<Vec<Option<WorkerContext>>>,
    /// Jobs sitting in some queue or currently executing. Drives the sleep
    /// protocol: a worker only parks when this is zero. A hint, not a
    /// synchronization point.
    pub active_jobs: AtomicU32,
    pub sleep: Sleep,
    pub shutdown: Shutdown,
    /// Pool index of the job used as the implicit parent when callers pass
    /// none, or `PARENT_NONE` when unset.
    pub master_job: AtomicU16,
    pub priority: platform::ThreadPriority,
    pub pin_workers: bool,
    pub hooks: WorkerHooks,
}

/// Workers with nothing left to execute block here.
///
/// The mutex guards only the wait predicate (exit flag and active job
/// count); it is never held while a job executes.
pub(crate) struct Sleep {
    mutex: Mutex<()>,
    cond: Condvar,
}

impl Sleep {
    fn new() -> Self {
        Sleep {
            mutex: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Blocks until there may be work again or shutdown begins.
    ///
    /// Sleeping only while `active_jobs` is zero closes the classic missed
    /// wakeup: as long as any job is in flight somewhere, a worker that
    /// keeps losing steal races stays in its fetch loop instead of parking.
    pub fn wait_for_work(&self, shared: &Shared) {
        let mut guard = self.mutex.lock().unwrap();
        while !shared.shutdown.exit_requested()
            && shared.active_jobs.load(Ordering::Relaxed) == 0
        {
            guard = self.cond.wait(guard).unwrap();
        }
    }

    /// Wakes one sleeping worker. Taking and immediately releasing the
    /// mutex orders the notification after a concurrent sleeper's predicate
    /// check.
    pub fn notify_one(&self) {
        drop(self.mutex.lock().unwrap());
        self.cond.notify_one();
    }

    /// Flips the exit flag under the mutex and wakes everyone.
    pub fn request_exit(&self, shutdown: &Shutdown) {
        {
            let _guard = self.mutex.lock().unwrap();
            shutdown.request_exit();
        }
        self.cond.notify_all();
    }
}

pub(crate) fn init(params: JobSystemBuilder) -> JobSystem {
    let worker_count = params.resolved_worker_count();
    let adoptable_count = params.adoptable_count;
    let total = worker_count + adoptable_count;
    assert!(
        total > 0,
        "a job system needs at least one worker thread or adoption slot"
    );
    assert!(total <= 64, "at most 64 contexts (workers + adoptable) are supported");

    let mut stealers = Vec::with_capacity(total as usize);
    let mut contexts = Vec::with_capacity(total as usize);
    for i in 0..total {
        let (ctx, stealer) = WorkerContext::new(i, i < worker_count);
        stealers.push(CachePadded::new(stealer));
        contexts.push(Some(ctx));
    }
    let adopt_slots = contexts.split_off(worker_count as usize);

    let shared = Arc::new(Shared {
        id: system::JobSystemId::next(),
        worker_count,
        adopted: AtomicU32::new(0),
        pool: JobPool::new(MAX_JOB_COUNT),
        stealers,
        adopt_slots: Mutex::new(adopt_slots),
        active_jobs: AtomicU32::new(0),
        sleep: Sleep::new(),
        shutdown: Shutdown::new(),
        master_job: AtomicU16::new(PARENT_NONE),
        priority: params.priority,
        pin_workers: params.pin_workers,
        hooks: WorkerHooks {
            start: params.start_handler,
            exit: params.exit_handler,
        },
    });

    for (i, slot) in contexts.into_iter().enumerate() {
        let ctx = slot.unwrap();
        let worker = Worker {
            shared: Arc::clone(&shared),
        };

        let mut builder = thread::Builder::new().name((params.name_handler)(i as u32));
        if let Some(stack_size) = params.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || {
                profiling::register_thread!("Worker");
                worker.run(ctx);
            })
            .expect("failed to spawn worker thread");
        shared.shutdown.register(handle);
    }

    JobSystem { shared }
}

struct Worker {
    shared: Arc<Shared>,
}

impl Worker {
    fn run(self, ctx: WorkerContext) {
        let index = ctx.index();
        platform::set_current_thread_priority(self.shared.priority);
        if self.shared.pin_workers {
            platform::pin_current_thread(index as usize);
        }
        log::trace!("worker {} (bit {:#x}) starting", index, ctx.bit());

        if let Some(handler) = &self.shared.hooks.start {
            handler.run(index);
        }

        let system = JobSystem {
            shared: Arc::clone(&self.shared),
        };
        context::bind(WorkerBinding {
            ctx,
            shared: Arc::clone(&self.shared),
        });

        loop {
            if !execute_one(&self.shared, &system) {
                self.shared.sleep.wait_for_work(&self.shared);
            }
            if self.shared.shutdown.exit_requested() {
                break;
            }
        }

        // Once every worker has exited nothing will steal from this queue
        // again; abort the leftovers so parent counters and slots settle.
        drain_local_queue(&self.shared);

        let binding = context::unbind().unwrap();
        if let Some(handler) = &self.shared.hooks.exit {
            handler.run(binding.ctx.index());
        }
        log::trace!("worker {} exiting", index);
    }
}

/// Executes at most one job: local pop first, then one steal attempt from a
/// random victim. Returns false if neither produced a job.
pub(crate) fn execute_one(shared: &Shared, system: &JobSystem) -> bool {
    let fetched = context::with_current(|binding| {
        let binding = binding.expect("job execution requires a worker or adopted thread");
        debug_assert!(Arc::ptr_eq(&binding.shared, &system.shared));
        binding.ctx.fetch_job(shared)
    });

    let Some(index) = fetched else {
        return false;
    };

    let job = shared.pool.get(index);

    let active = shared.active_jobs.fetch_sub(1, Ordering::Relaxed);
    debug_assert!(active > 0, "active job count underflow");

    if let Some(exec) = job.take_exec() {
        profiling::scope!("job");
        let result = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            exec(job.storage_ptr(), system, JobRef::new(job))
        }));
        if let Err(payload) = result {
            // A panicking job still completes; unwinding any further would
            // take the worker, and with it the whole pool, down.
            log::error!("job panicked: {}", panic_message(&payload));
        }
    }

    finish(shared, job);
    true
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Terminates `job` and walks completion up the parent chain.
///
/// A node's running count is its own execution plus one per live child, so
/// only the thread that drives the count to zero finalizes the node and
/// moves on to its parent; every other path stops at the decrement. The
/// release on the decrement pairs with the acquire fence below (and with
/// the acquire on the waiter side), which is what makes a subtree's side
/// effects visible to whoever observes its completion.
pub(crate) fn finish(shared: &Shared, job: &Job) {
    let mut job = job;
    loop {
        let running = job.dec_running();
        assert!(running > 0, "job terminated twice");
        if running != 1 {
            // Live children remain; the last of them finalizes this node.
            return;
        }
        fence(Ordering::Acquire);
        let parent_index = job.parent_index();
        release(shared, job);
        if parent_index == PARENT_NONE {
            return;
        }
        job = shared.pool.get(parent_index);
    }
}

/// Drops one reference; the last one returns the slot to the pool.
pub(crate) fn release(shared: &Shared, job: &Job) {
    if job.release_ref() {
        job.drop_payload();
        shared.pool.recycle(job);
    }
}

/// Aborts every job still in the calling thread's queue: closures are
/// dropped unexecuted but completion still propagates, so ancestors settle
/// and slots return to the pool.
pub(crate) fn drain_local_queue(shared: &Shared) {
    loop {
        let popped = context::with_current(|binding| binding.and_then(|b| b.ctx.pop()));
        let Some(index) = popped else {
            return;
        };
        let job = shared.pool.get(index);
        let active = shared.active_jobs.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(active > 0);
        log::debug!("aborting queued job {} during shutdown", index);
        finish(shared, job);
    }
}
