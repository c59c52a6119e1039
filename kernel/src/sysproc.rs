//! Process-related system call implementations.

use core::sync::atomic::Ordering;

use crate::console;
use crate::proc::{self, Channel};
use crate::syscall::{ERR_GENERIC, SyscallArgs};

/// Largest single `write` this stand-in console path will copy out of user memory at once.
const WRITE_CHUNK: usize = 256;

pub fn sys_fork(_args: &SyscallArgs) -> Result<i32, i32> {
    proc::fork().map(|pid| pid as i32).map_err(|_| ERR_GENERIC)
}

pub fn sys_exit(args: &SyscallArgs) -> ! {
    proc::exit(args.get_int(0))
}

pub fn sys_wait(args: &SyscallArgs) -> Result<i32, i32> {
    let status_addr = args.get_raw(0);
    proc::wait(status_addr).map(|pid| pid as i32).map_err(|_| ERR_GENERIC)
}

pub fn sys_kill(args: &SyscallArgs) -> Result<i32, i32> {
    let pid = args.get_int(0).max(0) as usize;
    proc::kill(pid).map(|()| 0).map_err(|_| ERR_GENERIC)
}

pub fn sys_getpid(args: &SyscallArgs) -> Result<i32, i32> {
    Ok(args.proc().inner.lock().pid as i32)
}

pub fn sys_sleep(args: &SyscallArgs) -> Result<i32, i32> {
    let duration = args.get_int(0).max(0) as usize;

    let mut guard = proc::TICKS_LOCK.lock();
    let start = proc::TICKS.load(Ordering::Relaxed);

    while proc::TICKS.load(Ordering::Relaxed) - start < duration {
        if args.proc().inner.lock().killed {
            return Err(ERR_GENERIC);
        }
        guard = proc::sleep(Channel::Ticks, guard);
    }

    Ok(0)
}

pub fn sys_uptime(_args: &SyscallArgs) -> Result<i32, i32> {
    Ok(proc::TICKS.load(Ordering::Relaxed) as i32)
}

/// `chsched(algorithm, is_preemptive, a)`: validates and applies a new scheduling policy,
/// returning 0 on success or one of [`crate::proc::policy::ERR_INVALID_ALGORITHM_OR_PREEMPTIVE`] /
/// [`crate::proc::policy::ERR_INVALID_A`] on failure (spec §6, §7).
pub fn sys_chsched(args: &SyscallArgs) -> Result<i32, i32> {
    let algorithm = args.get_int(0);
    let is_preemptive = args.get_int(1);
    let a = args.get_int(2);

    match proc::change_policy(algorithm, is_preemptive, a) {
        0 => Ok(0),
        code => Err(code),
    }
}

/// `write(fd, buf, len)`: the one surviving sliver of the dropped file-system syscall surface.
/// There is only one console and no descriptor table, so `fd` is accepted but ignored; every byte
/// goes to the same out-of-scope UART stand-in (ambient I/O, not a scheduling operation).
pub fn sys_write(args: &SyscallArgs) -> Result<i32, i32> {
    let _fd = args.get_raw(0);
    let src_addr = args.get_raw(1);
    let len = args.get_raw(2);

    let proc = args.proc();
    let mut written = 0;
    let mut buf = [0u8; WRITE_CHUNK];

    while written < len {
        let chunk = core::cmp::min(WRITE_CHUNK, len - written);
        let inner = proc.inner.lock();
        if inner.killed {
            return Err(ERR_GENERIC);
        }
        drop(inner);

        proc::copy_from_user(proc, src_addr + written, &mut buf[..chunk]).map_err(|_| ERR_GENERIC)?;
        console::write_bytes(&buf[..chunk]);
        written += chunk;
    }

    Ok(written as i32)
}
