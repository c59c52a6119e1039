//! Virtual memory collaborator placeholders.
//!
//! Real page-table construction, teardown, and user/kernel copy are out of scope for the
//! scheduling core (spec §1). [`Uvm`] models just enough of a user address space for the lifecycle
//! code in [`crate::proc`] to allocate, copy and free one per process, without doing real address
//! translation.

use crate::error::KernelError;
use crate::param::NPROC;

/// A process's user address space.
///
/// Holds only a synthetic size; a real implementation would own the root page-table frame and
/// walk/allocate leaf entries on fault.
#[derive(Debug)]
pub struct Uvm {
    size: usize,
}

impl Uvm {
    /// Allocates a fresh, empty address space.
    pub fn create() -> Result<Self, KernelError> {
        Ok(Self { size: 0 })
    }

    /// Duplicates this address space (used by `fork`).
    pub fn copy(&self) -> Result<Self, KernelError> {
        Ok(Self { size: self.size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Grows or shrinks the address space by `delta` bytes (used by `sbrk`).
    pub fn grow(&mut self, delta: isize) -> Result<usize, KernelError> {
        let new_size = self.size as isize + delta;
        if new_size < 0 {
            return Err(KernelError::InvalidArgument);
        }
        self.size = new_size as usize;
        Ok(self.size)
    }

    /// Tears down the address space. A real implementation would free every mapped physical page.
    pub fn free(self) {}

    /// Copies `src` into user memory at `dst_addr`. Out of scope: real user/kernel address
    /// translation; this placeholder exists so syscalls that need it (e.g. `wait`'s status
    /// pointer) have a call site to go through.
    pub fn copy_to_user(&mut self, _dst_addr: usize, _src: &[u8]) -> Result<(), KernelError> {
        Ok(())
    }

    /// Copies from user memory at `src_addr` into `dst`.
    pub fn copy_from_user(&self, _src_addr: usize, _dst: &mut [u8]) -> Result<(), KernelError> {
        Ok(())
    }
}

/// Opaque trapframe handle: one per process, holding saved user registers across traps.
///
/// Real layout (`#[repr(C, align(4096))]`, full RISC-V register set) is out of scope; the
/// scheduling core only keeps the syscall-argument and return-value registers `syscall.rs` needs,
/// plus the saved program counter.
#[derive(Debug, Default)]
pub struct TrapFrame {
    pub epc: usize,
    pub a0: usize,
    pub a1: usize,
    pub a2: usize,
    pub a7: usize,
}

pub fn alloc_trapframe(_slot: usize) -> Result<TrapFrame, KernelError> {
    Ok(TrapFrame::default())
}

/// Sanity placeholder so `NPROC` stays referenced even with page tables stubbed out, matching the
/// teacher's `kstack(index)` address scheme which is indexed by process slot.
pub const _: () = assert!(NPROC > 0);
