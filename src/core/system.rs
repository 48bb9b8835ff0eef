//! The public scheduler facade and its builder.

use std::ptr::NonNull;

use crossbeam_utils::Backoff;

use super::context::{self, WorkerBinding};
use super::job::{Job, JobHandle, JobRef, RetainedJob, RunFlags, PARENT_NONE};
use super::Shared;
use crate::platform::{self, ThreadPriority};
use crate::sync::{Arc, Ordering};

// Use std's atomic type explicitly here because loom's doesn't support
// static initialization.
static NEXT_SYSTEM_ID: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);

/// A unique id per scheduler, to sanity-check that threads and handles are
/// not mixed up between instances when there are several of them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobSystemId(pub(crate) u32);

impl JobSystemId {
    pub(crate) fn next() -> Self {
        JobSystemId(NEXT_SYSTEM_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }
}

/// A reference to a job scheduler.
///
/// Cloning is cheap and every clone refers to the same pool of workers.
#[derive(Clone)]
pub struct JobSystem {
    pub(crate) shared: Arc<Shared>,
}

impl JobSystem {
    /// Creates a scheduler with `worker_count` pool-owned threads and room
    /// for `adoptable_count` external threads to join later.
    ///
    /// `worker_count` is taken literally; zero is valid and leaves all
    /// execution to adopted threads. Use the builder to get the
    /// hardware-based default instead.
    pub fn new(worker_count: u32, adoptable_count: u32) -> Self {
        Self::builder()
            .with_worker_threads(worker_count)
            .with_adoptable_threads(adoptable_count)
            .build()
    }

    pub fn builder() -> JobSystemBuilder {
        JobSystemBuilder {
            worker_count: None,
            adoptable_count: 1,
            priority: ThreadPriority::Normal,
            pin_workers: false,
            stack_size: None,
            start_handler: None,
            exit_handler: None,
            name_handler: Box::new(|index| format!("job-worker#{}", index)),
        }
    }

    /// The scheduler the calling thread belongs to, if any.
    pub fn current() -> Option<JobSystem> {
        context::current_shared().map(|shared| JobSystem { shared })
    }

    pub fn id(&self) -> JobSystemId {
        self.shared.id
    }

    pub fn worker_count(&self) -> u32 {
        self.shared.worker_count
    }

    /// Number of jobs currently queued or executing.
    pub fn active_job_count(&self) -> u32 {
        self.shared.active_jobs.load(Ordering::Relaxed)
    }

    pub fn exit_requested(&self) -> bool {
        self.shared.shutdown.exit_requested()
    }

    /// Allocates a job that will run `func` when executed.
    ///
    /// The closure is stored inline in the job record and must fit in
    /// [`JOB_STORAGE_SIZE`](crate::JOB_STORAGE_SIZE) bytes, which is
    /// enforced at compile time. The function receives the scheduler and a
    /// reference to the job itself, so it can attach children to its own
    /// completion.
    ///
    /// Without an explicit parent the job is attached to the master job if
    /// one is set (see [`set_master_job`](JobSystem::set_master_job)).
    /// Creating a child of a job that already completed is a caller bug.
    pub fn create<F>(&self, parent: Option<JobRef>, func: F) -> JobHandle
    where
        F: FnOnce(&JobSystem, JobRef) + Send + 'static,
    {
        let job = self.allocate(parent);
        unsafe { job.init(func) };
        self.handle_for(job)
    }

    /// Allocates a job with no function: a pure synchronization node whose
    /// completion simply aggregates its children's.
    pub fn create_empty(&self, parent: Option<JobRef>) -> JobHandle {
        let job = self.allocate(parent);
        self.handle_for(job)
    }

    fn allocate(&self, parent: Option<JobRef>) -> &Job {
        let parent_index = match parent {
            Some(parent) => parent.job.index(),
            None => self.shared.master_job.load(Ordering::Relaxed),
        };
        let job = self.shared.pool.allocate();
        if parent_index != PARENT_NONE {
            let parent_job = self.shared.pool.get(parent_index);
            // Pin the parent's running count so it cannot terminate while
            // this child is outstanding.
            let running = parent_job.add_running();
            assert!(
                running > 0,
                "cannot create a child of a job that already completed"
            );
            job.set_parent(parent_index);
        }
        job
    }

    fn handle_for(&self, job: &Job) -> JobHandle {
        JobHandle {
            job: NonNull::from(job),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Submits a job for execution, consuming the handle.
    ///
    /// Must be called from a worker or adopted thread: the job goes into
    /// the calling thread's own queue.
    pub fn run(&self, job: JobHandle) {
        self.run_with_flags(job, RunFlags::NONE);
    }

    pub fn run_with_flags(&self, job: JobHandle, flags: RunFlags) {
        profiling::scope!("run");
        let (job_ptr, handle_shared) = job.into_parts();
        assert!(
            Arc::ptr_eq(&handle_shared, &self.shared),
            "job belongs to a different job system"
        );
        let job = unsafe { job_ptr.as_ref() };

        // Count the job as active before it becomes stealable: a thief
        // could otherwise pop and finish it while the counter still reads
        // zero.
        let active = self.shared.active_jobs.fetch_add(1, Ordering::Relaxed);

        context::with_current(|binding| {
            let binding = binding.expect("run() must be called from a worker or adopted thread");
            debug_assert!(Arc::ptr_eq(&binding.shared, &self.shared));
            binding.ctx.push(job.index());
        });

        if !flags.contains(RunFlags::DONT_SIGNAL) && active > 0 {
            // Other work was already live, so some worker may have just
            // lost a steal race and be headed for the condvar. When we are
            // the only producer the calling thread gets to the job first
            // and nobody needs waking.
            self.shared.sleep.notify_one();
        }
    }

    /// Submits a job and keeps a reference to it so it can be waited on.
    pub fn run_and_retain(&self, job: JobHandle, flags: RunFlags) -> RetainedJob {
        unsafe { job.job.as_ref() }.add_ref();
        let retained = RetainedJob {
            job: job.job,
            shared: Arc::clone(&self.shared),
        };
        self.run_with_flags(job, flags);
        retained
    }

    /// Blocks until the job's whole subtree has completed, executing queued
    /// jobs in the meantime, then releases the reference.
    ///
    /// Must be called from a worker or adopted thread: the waiter never
    /// parks, it helps drain the queues instead, which is also what makes
    /// waiting on a child from inside a job function safe.
    ///
    /// Returns early when a shutdown is requested; callers that can race
    /// with shutdown should check [`exit_requested`](JobSystem::exit_requested)
    /// and treat results as invalid then.
    pub fn wait(&self, job: RetainedJob) {
        context::with_current(|binding| {
            let binding = binding.expect("wait() must be called from a worker or adopted thread");
            assert!(
                Arc::ptr_eq(&binding.shared, &self.shared),
                "thread belongs to a different job system"
            );
        });
        assert!(
            Arc::ptr_eq(&job.shared, &self.shared),
            "job belongs to a different job system"
        );

        profiling::scope!("wait");
        let backoff = Backoff::new();
        while !job.is_complete() && !self.exit_requested() {
            if super::execute_one(&self.shared, self) {
                backoff.reset();
            } else {
                backoff.spin();
            }
        }
        // Dropping the retained reference may recycle the slot.
        drop(job);
    }

    /// Convenience for `wait(run_and_retain(job, NONE))`.
    pub fn run_and_wait(&self, job: JobHandle) {
        let retained = self.run_and_retain(job, RunFlags::NONE);
        self.wait(retained);
    }

    /// Installs `job` as the implicit parent for jobs created without one,
    /// which lets the scheduler's entire output be waited on through a
    /// single node. The job must stay alive and unterminated while it is
    /// set.
    pub fn set_master_job(&self, job: Option<JobRef>) {
        let index = job.map_or(PARENT_NONE, |j| j.job.index());
        self.shared.master_job.store(index, Ordering::Relaxed);
    }

    /// Attaches the calling thread to this scheduler so it can submit jobs,
    /// help execute them, and be stolen from. Calling it again on a thread
    /// this scheduler already adopted is a no-op; a thread belonging to a
    /// different scheduler is a caller bug.
    pub fn adopt(&self) {
        if let Some(shared) = context::current_shared() {
            assert!(
                Arc::ptr_eq(&shared, &self.shared),
                "thread is already attached to a different job system"
            );
            return;
        }

        let claimed = self.shared.adopted.fetch_add(1, Ordering::Relaxed);
        let ctx = {
            let mut slots = self.shared.adopt_slots.lock().unwrap();
            assert!(
                (claimed as usize) < slots.len(),
                "no adoption slots left: adopt() called more than {} times",
                slots.len()
            );
            slots[claimed as usize].take().unwrap()
        };
        // The slot's queue became a steal target the moment the counter was
        // bumped; it is pre-initialized and empty, so that is harmless.

        platform::set_current_thread_priority(self.shared.priority);
        log::trace!("adopting thread as context {} (bit {:#x})", ctx.index(), ctx.bit());
        context::bind(WorkerBinding {
            ctx,
            shared: Arc::clone(&self.shared),
        });
    }

    /// Detaches an adopted thread. The adoption slot is not reused, but its
    /// queue remains a valid steal target for anything left in it.
    pub fn emancipate(&self) {
        let binding = context::unbind().expect("emancipate() called on a thread that was not adopted");
        assert!(
            Arc::ptr_eq(&binding.shared, &self.shared),
            "thread was adopted by a different job system"
        );
        assert!(!binding.ctx.is_worker(), "pool-owned workers cannot emancipate");
        log::trace!("emancipating context {}", binding.ctx.index());

        if self.exit_requested() {
            // Nobody will steal from this queue once the pool is gone;
            // abort the leftovers so parent counters and slots settle.
            while let Some(index) = binding.ctx.pop() {
                let job = self.shared.pool.get(index);
                let active = self.shared.active_jobs.fetch_sub(1, Ordering::Relaxed);
                debug_assert!(active > 0);
                log::debug!("aborting queued job {} during shutdown", index);
                super::finish(&self.shared, job);
            }
        }
    }

    /// Signals every worker to exit and joins the threads the scheduler
    /// owns. Jobs still queued on those workers are aborted, not executed.
    /// Adopted threads are not joined; they leave through
    /// [`emancipate`](JobSystem::emancipate).
    ///
    /// Idempotent: later calls find nothing left to join.
    pub fn shutdown(&self) {
        log::debug!("job system {:?} shutting down", self.shared.id);
        self.shared.sleep.request_exit(&self.shared.shutdown);
        self.shared.shutdown.join_all();
    }
}

pub(crate) const MAX_WORKERS: u32 = 32;

/// One worker per physical core, minus one for the thread driving the
/// scheduler. On SMT machines half of the logical cores are left idle to
/// avoid contending over execution units on cache-bound jobs.
fn default_worker_count() -> u32 {
    let logical = num_cpus::get() as u32;
    let physical = num_cpus::get_physical() as u32;
    let base = if logical > physical { logical / 2 } else { logical };
    base.saturating_sub(1).min(MAX_WORKERS)
}

pub struct JobSystemBuilder {
    pub(crate) worker_count: Option<u32>,
    pub(crate) adoptable_count: u32,
    pub(crate) priority: ThreadPriority,
    pub(crate) pin_workers: bool,
    pub(crate) stack_size: Option<usize>,
    pub(crate) start_handler: Option<Box<dyn WorkerHook>>,
    pub(crate) exit_handler: Option<Box<dyn WorkerHook>>,
    pub(crate) name_handler: Box<dyn Fn(u32) -> String>,
}

impl JobSystemBuilder {
    /// Overrides the worker thread count. Zero is valid: all execution is
    /// then carried by adopted threads. Counts above 32 are clamped.
    pub fn with_worker_threads(mut self, count: u32) -> Self {
        self.worker_count = Some(count.min(MAX_WORKERS));
        self
    }

    /// Number of external threads that may later call
    /// [`adopt`](JobSystem::adopt).
    pub fn with_adoptable_threads(mut self, count: u32) -> Self {
        self.adoptable_count = count;
        self
    }

    /// Scheduling priority requested for worker and adopted threads.
    pub fn with_thread_priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Pin each worker to a core, round-robin over the visible set.
    pub fn with_pinned_workers(mut self, pin: bool) -> Self {
        self.pin_workers = pin;
        self
    }

    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn with_thread_names<F>(mut self, handler: F) -> Self
    where
        F: Fn(u32) -> String + 'static,
    {
        self.name_handler = Box::new(handler);
        self
    }

    /// Called on each worker thread right after it starts.
    pub fn with_start_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.start_handler = Some(Box::new(handler));
        self
    }

    /// Called on each worker thread right before it exits.
    pub fn with_exit_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.exit_handler = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> JobSystem {
        super::init(self)
    }

    pub(crate) fn resolved_worker_count(&self) -> u32 {
        self.worker_count.unwrap_or_else(default_worker_count)
    }
}

pub(crate) struct WorkerHooks {
    pub start: Option<Box<dyn WorkerHook>>,
    pub exit: Option<Box<dyn WorkerHook>>,
}

pub trait WorkerHook: Send + Sync {
    fn run(&self, worker_index: u32);
}

impl<F> WorkerHook for F
where
    F: Fn(u32) + Send + Sync + 'static,
{
    fn run(&self, worker_index: u32) {
        self(worker_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::MAX_JOB_COUNT;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn adopted_system(workers: u32) -> JobSystem {
        let system = JobSystem::new(workers, 2);
        system.adopt();
        system
    }

    fn teardown(system: &JobSystem) {
        system.shutdown();
        system.emancipate();
    }

    #[test]
    fn thousand_children() {
        let system = adopted_system(4);
        let counter = Arc::new(AtomicU32::new(0));

        let root = system.create_empty(None);
        for _ in 0..1000 {
            let counter = Arc::clone(&counter);
            let child = system.create(Some(root.as_job()), move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
            system.run(child);
        }
        system.run_and_wait(root);

        assert_eq!(counter.load(Ordering::Relaxed), 1000);
        assert_eq!(system.active_job_count(), 0);
        teardown(&system);
    }

    #[test]
    fn nested_spawns() {
        let system = adopted_system(2);
        let invocations = Arc::new(AtomicU32::new(0));

        let invocations_root = Arc::clone(&invocations);
        let root = system.create(None, move |system, this| {
            invocations_root.fetch_add(1, Ordering::Relaxed);
            for _ in 0..2 {
                let invocations_child = Arc::clone(&invocations_root);
                let child = system.create(Some(this), move |system, this| {
                    invocations_child.fetch_add(1, Ordering::Relaxed);
                    for _ in 0..2 {
                        let invocations_leaf = Arc::clone(&invocations_child);
                        let leaf = system.create(Some(this), move |_, _| {
                            invocations_leaf.fetch_add(1, Ordering::Relaxed);
                        });
                        system.run(leaf);
                    }
                });
                system.run(child);
            }
        });
        system.run_and_wait(root);

        // The root, two children and four grandchildren.
        assert_eq!(invocations.load(Ordering::Relaxed), 7);
        teardown(&system);
    }

    #[test]
    fn deep_parent_chain() {
        let system = adopted_system(2);
        let deepest = Arc::new(AtomicU32::new(0));

        let root = system.create_empty(None);
        let mut chain = vec![root];
        for _ in 0..63 {
            let next = system.create_empty(Some(chain.last().unwrap().as_job()));
            chain.push(next);
        }

        let deepest_flag = Arc::clone(&deepest);
        let leaf = system.create(Some(chain.last().unwrap().as_job()), move |_, _| {
            deepest_flag.store(1, Ordering::Release);
        });
        system.run(leaf);

        let mut retained_root = None;
        for (i, handle) in chain.into_iter().enumerate().rev() {
            if i == 0 {
                retained_root = Some(system.run_and_retain(handle, RunFlags::NONE));
            } else {
                system.run(handle);
            }
        }
        system.wait(retained_root.unwrap());

        assert_eq!(deepest.load(Ordering::Acquire), 1);
        teardown(&system);
    }

    #[test]
    fn ten_thousand_jobs() {
        let system = adopted_system(8);
        let counter = Arc::new(AtomicU32::new(0));

        // Submit in waves to stay well under the pool capacity.
        for _ in 0..10 {
            let root = system.create_empty(None);
            for _ in 0..1000 {
                let counter = Arc::clone(&counter);
                let job = system.create(Some(root.as_job()), move |_, _| {
                    counter.fetch_add(1, Ordering::Relaxed);
                });
                system.run(job);
            }
            system.run_and_wait(root);
        }

        assert_eq!(counter.load(Ordering::Relaxed), 10_000);
        assert_eq!(system.active_job_count(), 0);
        teardown(&system);
    }

    #[test]
    fn adopted_thread_only() {
        let system = JobSystem::new(0, 1);
        system.adopt();
        let counter = Arc::new(AtomicU32::new(0));

        let root = system.create_empty(None);
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            let job = system.create(Some(root.as_job()), move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
            system.run(job);
        }
        system.run_and_wait(root);

        assert_eq!(counter.load(Ordering::Relaxed), 100);
        system.shutdown();
        system.emancipate();
    }

    #[test]
    fn adoption_and_emancipation() {
        let system = JobSystem::new(4, 2);
        let executed = Arc::new(AtomicU32::new(0));

        let mut threads = Vec::new();
        for _ in 0..2 {
            let system = system.clone();
            let executed = Arc::clone(&executed);
            threads.push(std::thread::spawn(move || {
                system.adopt();
                assert!(JobSystem::current().is_some());

                let root = system.create_empty(None);
                for _ in 0..100 {
                    let executed = Arc::clone(&executed);
                    let job = system.create(Some(root.as_job()), move |_, _| {
                        executed.fetch_add(1, Ordering::Relaxed);
                    });
                    system.run(job);
                }
                system.run_and_wait(root);

                system.emancipate();
                assert!(JobSystem::current().is_none());
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(executed.load(Ordering::Relaxed), 200);
        system.shutdown();
    }

    #[test]
    fn shutdown_with_queued_jobs() {
        for _ in 0..20 {
            let system = JobSystem::new(2, 1);
            system.adopt();
            for _ in 0..8 {
                let job = system.create(None, |_, _| {
                    std::thread::yield_now();
                });
                system.run(job);
            }
            system.shutdown();
            system.emancipate();
            // Every slot is back, whether the jobs ran or were aborted.
            assert_eq!(system.shared.pool.available(), MAX_JOB_COUNT);
        }
    }

    #[test]
    fn wait_from_inside_a_job() {
        let system = adopted_system(2);
        let observed = Arc::new(AtomicU32::new(0));

        let observed_outer = Arc::clone(&observed);
        let root = system.create(None, move |system, this| {
            let observed_inner = Arc::clone(&observed_outer);
            let child = system.create(Some(this), move |_, _| {
                observed_inner.store(7, Ordering::Relaxed);
            });
            let child = system.run_and_retain(child, RunFlags::NONE);
            system.wait(child);
        });
        system.run_and_wait(root);

        assert_eq!(observed.load(Ordering::Relaxed), 7);
        teardown(&system);
    }

    #[test]
    fn completion_makes_writes_visible() {
        struct SendPtr(*mut u8);
        unsafe impl Send for SendPtr {}

        let system = adopted_system(4);
        let mut values = vec![0u8; 256].into_boxed_slice();

        let root = system.create_empty(None);
        for i in 0..values.len() {
            let slot = SendPtr(&mut values[i] as *mut u8);
            let job = system.create(Some(root.as_job()), move |_, _| {
                let slot = slot;
                unsafe {
                    *slot.0 = 1;
                }
            });
            system.run(job);
        }
        system.run_and_wait(root);

        // Waiting on the root must publish every plain write made by the
        // children.
        assert!(values.iter().all(|v| *v == 1));
        teardown(&system);
    }

    #[test]
    fn panicking_job_still_completes() {
        let system = adopted_system(2);
        let after = Arc::new(AtomicU32::new(0));

        let root = system.create_empty(None);
        let boom = system.create(Some(root.as_job()), |_, _| {
            panic!("boom");
        });
        let after_clone = Arc::clone(&after);
        let fine = system.create(Some(root.as_job()), move |_, _| {
            after_clone.fetch_add(1, Ordering::Relaxed);
        });
        system.run(boom);
        system.run(fine);
        system.run_and_wait(root);

        assert_eq!(after.load(Ordering::Relaxed), 1);
        teardown(&system);
    }

    #[test]
    fn dropping_a_handle_aborts_the_job() {
        let system = adopted_system(1);
        let executed = Arc::new(AtomicU32::new(0));
        let payload = Arc::new(());

        let root = system.create_empty(None);
        {
            let executed = Arc::clone(&executed);
            let payload = Arc::clone(&payload);
            let job = system.create(Some(root.as_job()), move |_, _| {
                let _keep = &payload;
                executed.fetch_add(1, Ordering::Relaxed);
            });
            drop(job);
        }
        system.run_and_wait(root);

        assert_eq!(executed.load(Ordering::Relaxed), 0);
        // The closure's captures were dropped with it.
        assert_eq!(Arc::strong_count(&payload), 1);
        teardown(&system);
    }

    #[test]
    fn workers_wake_for_new_work() {
        let system = JobSystem::new(2, 1);
        system.adopt();
        let counter = Arc::new(AtomicU32::new(0));

        // Give the workers time to park.
        std::thread::sleep(std::time::Duration::from_millis(20));

        for _ in 0..2 {
            let counter = Arc::clone(&counter);
            let job = system.create(None, move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
            system.run(job);
        }

        // Both jobs sit in this thread's queue; the wake signal must rouse
        // a worker to steal them without any help from us.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while counter.load(Ordering::Relaxed) != 2 {
            assert!(std::time::Instant::now() < deadline, "jobs were never stolen");
            std::thread::yield_now();
        }

        system.shutdown();
        system.emancipate();
    }

    #[test]
    fn master_job_collects_orphans() {
        let system = adopted_system(2);
        let counter = Arc::new(AtomicU32::new(0));

        let master = system.create_empty(None);
        system.set_master_job(Some(master.as_job()));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            let job = system.create(None, move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
            system.run(job);
        }
        system.set_master_job(None);
        system.run_and_wait(master);

        assert_eq!(counter.load(Ordering::Relaxed), 10);
        teardown(&system);
    }

    #[test]
    fn current_is_scoped_to_attached_threads() {
        assert!(JobSystem::current().is_none());
        let system = JobSystem::new(1, 1);
        system.adopt();
        assert_eq!(JobSystem::current().unwrap().id(), system.id());

        let ok = Arc::new(AtomicU32::new(0));
        let ok_clone = Arc::clone(&ok);
        let root = system.create(None, move |system, _| {
            if let Some(current) = JobSystem::current() {
                if current.id() == system.id() {
                    ok_clone.store(1, Ordering::Relaxed);
                }
            }
        });
        system.run_and_wait(root);
        assert_eq!(ok.load(Ordering::Relaxed), 1);

        system.shutdown();
        system.emancipate();
    }

    #[test]
    #[should_panic(expected = "different job system")]
    fn adoption_by_two_systems_is_a_bug() {
        let first = JobSystem::new(1, 1);
        let second = JobSystem::new(1, 1);
        first.adopt();
        second.adopt();
    }

    #[test]
    #[should_panic(expected = "different job system")]
    fn handles_do_not_cross_systems() {
        let first = JobSystem::new(1, 1);
        let second = JobSystem::new(1, 1);
        first.adopt();
        let job = second.create(None, |_, _| {});
        first.run(job);
    }
}
