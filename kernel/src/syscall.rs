//! System call dispatch.
//!
//! Unlike the teacher's POSIX-flavoured `SysError`, this kernel's only external contract is
//! `chsched`'s two negative codes (spec §6, §7); everything else just needs "zero or a negative
//! failure code" in `a0`, so syscalls here return a plain `i32` on error rather than an enum.

use crate::proc::{Proc, current_proc};
use crate::sysproc::*;
use crate::vm::TrapFrame;

/// Catch-all error code for syscalls with no dedicated failure code of their own.
pub const ERR_GENERIC: i32 = -1;

/// Wrapper for extracting typed syscall arguments out of the trapframe.
pub struct SyscallArgs<'a> {
    trapframe: &'a TrapFrame,
    proc: &'static Proc,
}

impl<'a> SyscallArgs<'a> {
    fn new(trapframe: &'a TrapFrame, proc: &'static Proc) -> Self {
        Self { trapframe, proc }
    }

    pub fn proc(&self) -> &'static Proc {
        self.proc
    }

    /// Returns the argument at the given index as a raw register value.
    pub fn get_raw(&self, index: usize) -> usize {
        match index {
            0 => self.trapframe.a0,
            1 => self.trapframe.a1,
            2 => self.trapframe.a2,
            _ => panic!("invalid syscall argument index {}", index),
        }
    }

    /// Returns the argument at the given index as a signed integer.
    pub fn get_int(&self, index: usize) -> i32 {
        self.get_raw(index) as i32
    }
}

/// System call numbers.
///
/// `Write` has no counterpart in the scheduling core proper; it is the one syscall that survives
/// from the dropped file-system surface, pared down to an unbuffered, fd-agnostic console write so
/// that user programs have any way at all to report what they did (spec's ambient I/O, not one of
/// its scheduling operations).
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Fork = 1,
    Exit = 2,
    Wait = 3,
    Kill = 4,
    Getpid = 5,
    Sleep = 6,
    Uptime = 7,
    ChSched = 8,
    Write = 9,
}

impl TryFrom<usize> for Syscall {
    type Error = i32;

    fn try_from(value: usize) -> Result<Self, i32> {
        match value {
            1 => Ok(Syscall::Fork),
            2 => Ok(Syscall::Exit),
            3 => Ok(Syscall::Wait),
            4 => Ok(Syscall::Kill),
            5 => Ok(Syscall::Getpid),
            6 => Ok(Syscall::Sleep),
            7 => Ok(Syscall::Uptime),
            8 => Ok(Syscall::ChSched),
            9 => Ok(Syscall::Write),
            _ => Err(ERR_GENERIC),
        }
    }
}

/// Handles a system call, writing the result (or the negated error code) into `trapframe.a0`.
///
/// # Safety
/// Called from the (out-of-scope) trap handler with the trapframe of the process that trapped.
pub unsafe fn syscall(trapframe: &mut TrapFrame) {
    let proc = current_proc().expect("syscall: no current proc");
    let args = SyscallArgs::new(trapframe, proc);

    let result = match Syscall::try_from(trapframe.a7) {
        Ok(syscall) => match syscall {
            Syscall::Fork => sys_fork(&args),
            Syscall::Exit => sys_exit(&args),
            Syscall::Wait => sys_wait(&args),
            Syscall::Kill => sys_kill(&args),
            Syscall::Getpid => sys_getpid(&args),
            Syscall::Sleep => sys_sleep(&args),
            Syscall::Uptime => sys_uptime(&args),
            Syscall::ChSched => sys_chsched(&args),
            Syscall::Write => sys_write(&args),
        },
        Err(code) => Err(code),
    };

    trapframe.a0 = match result {
        Ok(v) => v as usize,
        Err(code) => {
            #[cfg(debug_assertions)]
            log::debug!("syscall {} failed with {}", trapframe.a7, code);
            code as usize
        }
    };
}
