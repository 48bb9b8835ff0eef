pub use std::sync::atomic::Ordering;

#[cfg(not(loom))] pub use std::{
    sync::{
        Arc, Mutex, Condvar,
        atomic::{fence, AtomicBool, AtomicI32, AtomicU16, AtomicU32},
    },
    thread,
};


#[cfg(loom)] pub use loom::{
    sync::{
        Arc, Mutex, Condvar,
        atomic::{fence, AtomicBool, AtomicI32, AtomicU16, AtomicU32},
    },
    thread
};
