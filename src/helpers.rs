//! Small conveniences composed from the core operations.

use crate::{JobRef, JobSystem, RunFlags};

/// Runs `a` and `b` as sibling jobs and returns once both have completed.
///
/// The calling thread must be a worker or adopted thread; it executes
/// queued work (typically `a` or `b` themselves) while it waits.
pub fn join<A, B>(system: &JobSystem, a: A, b: B)
where
    A: FnOnce(&JobSystem, JobRef) + Send + 'static,
    B: FnOnce(&JobSystem, JobRef) + Send + 'static,
{
    let fork = system.create_empty(None);
    let first = system.create(Some(fork.as_job()), a);
    let second = system.create(Some(fork.as_job()), b);
    // The caller is about to wait and will pick the first job up itself;
    // only the second one is worth waking a worker for.
    system.run_with_flags(first, RunFlags::DONT_SIGNAL);
    system.run(second);
    system.run_and_wait(fork);
}

#[test]
fn nested_joins() {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    let system = JobSystem::new(3, 1);
    system.adopt();

    let count = Arc::new(AtomicU32::new(0));

    for _ in 0..100 {
        let count_a = Arc::clone(&count);
        let count_b = Arc::clone(&count);
        join(
            &system,
            move |system, _| {
                let left = Arc::clone(&count_a);
                let right = Arc::clone(&count_a);
                join(
                    system,
                    move |_, _| {
                        left.fetch_add(1, Ordering::Relaxed);
                    },
                    move |_, _| {
                        right.fetch_add(1, Ordering::Relaxed);
                    },
                );
            },
            move |system, _| {
                let left = Arc::clone(&count_b);
                let right = Arc::clone(&count_b);
                join(
                    system,
                    move |_, _| {
                        left.fetch_add(1, Ordering::Relaxed);
                    },
                    move |_, _| {
                        right.fetch_add(1, Ordering::Relaxed);
                    },
                );
            },
        );

        assert_eq!(count.load(Ordering::Relaxed), 4);
        count.store(0, Ordering::Relaxed);
    }

    system.shutdown();
    system.emancipate();
}
