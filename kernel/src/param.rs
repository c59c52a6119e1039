//! Compile-time kernel configuration.

/// Maximum number of CPUs.
pub const NCPU: usize = 8;

/// Maximum number of live processes.
pub const NPROC: usize = 64;

/// Maximum number of open files per process.
pub const NOFILE: usize = 16;

/// Maximum length of a path, including the null terminator.
pub const MAXPATH: usize = 128;

/// Maximum length of a process name, including the null terminator.
pub const MAXPROCNAME: usize = 16;

/// Default scheduling policy weight for the exponential burst average (percent, out of 100).
pub const DEFAULT_ALPHA: u32 = 50;

/// Lower bound, in ticks, for any dynamically computed CFS quantum.
pub const MIN_CFS_TIMESLICE: usize = 1;
