//! Shutdown is an atomic flag plus the table of worker threads to join.
//!
//! Workers observe the flag at the top of their loop and in the sleep
//! predicate. Joining is idempotent: the handles are drained on the first
//! call and later calls find nothing to do. Adopted threads are never
//! registered here, they leave through `emancipate` instead.

use crate::sync::{thread, AtomicBool, Mutex, Ordering};

pub(crate) struct Shutdown {
    exit_requested: AtomicBool,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Shutdown {
            exit_requested: AtomicBool::new(false),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, handle: thread::JoinHandle<()>) {
        self.threads.lock().unwrap().push(handle);
    }

    /// Relaxed is enough: the flag only ever flips once, and the store that
    /// matters for the sleep protocol happens under the sleep mutex.
    pub fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::Relaxed);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::Relaxed)
    }

    pub fn join_all(&self) {
        let handles = std::mem::take(&mut *self.threads.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

#[test]
fn shutdown_is_idempotent() {
    use crate::JobSystem;
    use std::sync::atomic::{AtomicU32, Ordering};

    static STARTED: AtomicU32 = AtomicU32::new(0);
    static EXITED: AtomicU32 = AtomicU32::new(0);

    let system = JobSystem::builder()
        .with_worker_threads(3)
        .with_start_handler(|_index| {
            STARTED.fetch_add(1, Ordering::SeqCst);
        })
        .with_exit_handler(|_index| {
            EXITED.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    system.shutdown();
    system.shutdown();

    assert_eq!(STARTED.load(Ordering::SeqCst), 3);
    assert_eq!(EXITED.load(Ordering::SeqCst), 3);
}
