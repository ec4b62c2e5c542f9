#[cfg(not(feature = "enable-runtime-benchmarking"))]
#[macro_export]
macro_rules! start_bench {
    ($stopwatch_path:ident, $name:ident) => {};
}

#[cfg(not(feature = "enable-runtime-benchmarking"))]
#[macro_export]
macro_rules! end_bench {
    ($name:expr) => {};
}

#[cfg(feature = "enable-runtime-benchmarking")]
#[macro_export]
macro_rules! start_bench {
    ($stopwatch_path:ident, $name:ident) => {
        let $name = $stopwatch_path::Stopwatch::start_new();
    };
}

#[cfg(feature = "enable-runtime-benchmarking")]
#[macro_export]
macro_rules! end_bench {
    ($name:ident) => {
        let dur = $name.elapsed();
        let s = dur.as_secs();
        let mut us = dur.subsec_nanos() / 1000;
        let ms = us / 1000;
        us -= ms * 1000;
        debug!("'{}' took {}s {}ms {}us", stringify!($name), s, ms, us);
    };
}

#[macro_use]
extern crate log;

extern crate fxhash;

pub extern crate epoll;
pub extern crate evdev;
pub extern crate stopwatch;

/// Decoding of raw evdev records into per-finger contacts, and the worker
/// that reads them from a device node
pub mod input;
