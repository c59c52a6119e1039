//! `schedcore`: a pluggable process scheduling core for a teaching-grade RISC-V kernel.
//!
//! Implements process lifecycle (alloc/free/fork/exit/wait/kill/reparent) and a single shared
//! ready heap servable under either of two policies — shortest-job-first with an exponentially
//! averaged burst estimate, or a CFS-like accumulated-execution-time scheme. See [`proc`] for the
//! lifecycle and dispatcher, [`proc::heap`] for the heap itself, and [`proc::policy`] for the
//! policy types.
//!
//! Built with `#![cfg_attr(not(test), no_std)]`: on the real target this is a freestanding kernel
//! binary; under `cargo test` it links `std` so the suite can run as ordinary host tests, with the
//! handful of real-hardware-only seams (`riscv::interrupts`, `swtch::swtch`) swapped for host
//! stand-ins (see those modules' docs).

#![cfg_attr(not(test), no_std)]

pub mod abi;
pub mod console;
pub mod error;
pub mod file;
pub mod logger;
pub mod memlayout;
pub mod param;
pub mod proc;
pub mod riscv;
pub mod spinlock;
pub mod swtch;
pub mod sync;
pub mod syscall;
pub mod sysproc;
pub mod vm;

/// Boot entry point: brings up logging, allocates and dispatches `init`, then never returns.
#[cfg(not(test))]
pub fn main() -> ! {
    unsafe { logger::init() };

    println!();
    println!("schedcore kernel is booting");
    println!();

    proc::userinit();

    proc::scheduler();
}

#[cfg(not(test))]
pub fn panic_handler(info: &core::panic::PanicInfo<'_>) -> ! {
    println!("kernel panic: {}", info);
    loop {
        core::hint::spin_loop();
    }
}
