//! Structured logging via the `log` facade, backed by the console.
//!
//! Grounded in the dependency the broader xv6-in-Rust corpus already carries (`log = "0.4.20"`)
//! even where it goes largely unused; here it actually backs `log::debug!`/`log::error!`, which
//! `crate::err!`/`crate::try_log!` call into on the failure path of fallible kernel operations.

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::println;

struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        println!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

/// Installs the kernel logger as the global `log` sink.
///
/// # Safety
/// Must be called at most once, before any other hart can have issued a `log::*!` call.
pub unsafe fn init() {
    log::set_logger(&LOGGER).expect("logger already set");
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    log::set_max_level(level);
}
