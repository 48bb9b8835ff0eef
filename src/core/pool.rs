//! Fixed-capacity pool of job records.
//!
//! Records live in one contiguous slab so a job can name its parent with a
//! 16 bit pool index instead of a pointer. Free slots are recycled through a
//! lock-free queue; allocation never touches the heap after construction.

use crossbeam_queue::ArrayQueue;
use crossbeam_utils::CachePadded;

use super::job::Job;

pub(crate) struct JobPool {
    slots: Box<[CachePadded<Job>]>,
    free: ArrayQueue<u16>,
}

impl JobPool {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity <= u16::MAX as usize);
        let slots: Box<[CachePadded<Job>]> = (0..capacity)
            .map(|i| CachePadded::new(Job::new(i as u16)))
            .collect();
        let free = ArrayQueue::new(capacity);
        for i in 0..capacity as u16 {
            let _ = free.push(i);
        }
        JobPool { slots, free }
    }

    /// Hands out a freshly reset record. Running out of slots means the
    /// embedder under-sized the pool for its peak number of in-flight jobs,
    /// which is not recoverable from here.
    pub fn allocate(&self) -> &Job {
        let index = self
            .free
            .pop()
            .expect("job pool exhausted: too many jobs in flight");
        let job = &*self.slots[index as usize];
        job.reset();
        job
    }

    /// Returns a slot to the free list. The caller must have released the
    /// last reference to it.
    pub fn recycle(&self, job: &Job) {
        let result = self.free.push(job.index());
        assert!(result.is_ok(), "recycled a job slot that was already free");
    }

    pub fn get(&self, index: u16) -> &Job {
        &self.slots[index as usize]
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.free.len()
    }
}
