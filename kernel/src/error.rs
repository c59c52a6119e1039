//! Kernel-internal error type and location-annotated propagation macros.
//!
//! These are purely a debugging aid: the user-visible syscall ABI still reports plain negative
//! integers (see [`crate::syscall`]); this enum is only used on the Rust side of that boundary.

use core::fmt::Display;

/// Kernel error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// No free process slot.
    OutOfProc,
    /// A collaborator (page table, trapframe, file table) failed to allocate.
    Alloc,
    /// A syscall argument was out of range.
    InvalidArgument,
    /// `wait` found no children, or the caller is killed.
    NoChildren,
    /// `kill` was given a pid that does not match any live process.
    NoSuchProcess,
}

impl Display for KernelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KernelError::OutOfProc => write!(f, "out of proc"),
            KernelError::Alloc => write!(f, "alloc error"),
            KernelError::InvalidArgument => write!(f, "invalid argument"),
            KernelError::NoChildren => write!(f, "no children"),
            KernelError::NoSuchProcess => write!(f, "no such process"),
        }
    }
}

/// Return an error, logging file:line. Use instead of `return Err(...)`.
#[macro_export]
macro_rules! err {
    ($e:expr) => {{
        #[cfg(debug_assertions)]
        {
            log::error!("errored at {}:{}: {}", file!(), line!(), $e);
        }
        return Err($e.into());
    }};
}

/// Propagate an error with location logging. Use instead of `?` when the failure path matters.
#[macro_export]
macro_rules! try_log {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => {
                #[cfg(debug_assertions)]
                log::debug!("  at {}:{}", file!(), line!());
                return Err(e.into());
            }
        }
    };
}

/// Pass through a `Result`, logging location on the error path without returning.
#[macro_export]
macro_rules! log_err {
    ($e:expr) => {
        match $e {
            Ok(v) => Ok(v),
            Err(e) => {
                #[cfg(debug_assertions)]
                log::debug!("  at {}:{}", file!(), line!());
                Err(e)
            }
        }
    };
}
