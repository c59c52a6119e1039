//! Re-exports the syscall ABI surface that `user` programs are allowed to depend on, so they never
//! need to reach into kernel internals directly.

pub use crate::param::{MAXPATH, MAXPROCNAME};
pub use crate::proc::policy::{ERR_INVALID_A, ERR_INVALID_ALGORITHM_OR_PREEMPTIVE};
pub use crate::syscall::Syscall;
