//! RISC-V register access.
//!
//! The `interrupts` module is cfg-gated: on the real target it is raw `sstatus` CSR assembly, on
//! the host test target it is a thread-local flag so that [`crate::spinlock`]'s nesting discipline
//! can be exercised by `cargo test` without real hardware.

pub const PGSHIFT: usize = 12;
pub const PGSIZE: usize = 1 << PGSHIFT;

pub const PTE_V: usize = 1 << 0;
pub const PTE_R: usize = 1 << 1;
pub const PTE_W: usize = 1 << 2;
pub const PTE_X: usize = 1 << 3;
pub const PTE_U: usize = 1 << 4;

pub const fn pa_to_pte(pa: usize) -> usize {
    (pa >> 12) << 10
}

pub const fn pte_to_pa(pte: usize) -> usize {
    (pte >> 10) << 12
}

pub const fn pte_flags(pte: usize) -> usize {
    pte & 0x3FF
}

#[cfg(not(test))]
pub mod registers {
    pub mod sstatus {
        use core::arch::asm;

        pub const SPP: usize = 1 << 8;
        pub const SPIE: usize = 1 << 5;
        pub const SIE: usize = 1 << 1;

        #[inline]
        pub unsafe fn read() -> usize {
            let bits: usize;
            unsafe { asm!("csrr {}, sstatus", out(reg) bits) };
            bits
        }

        #[inline]
        pub unsafe fn write(bits: usize) {
            unsafe { asm!("csrw sstatus, {}", in(reg) bits) };
        }
    }
}

#[cfg(not(test))]
pub mod interrupts {
    use super::registers::sstatus;

    #[inline]
    pub fn enable() {
        unsafe { sstatus::write(sstatus::read() | sstatus::SIE) };
    }

    #[inline]
    pub fn disable() {
        unsafe { sstatus::write(sstatus::read() & !sstatus::SIE) };
    }

    #[inline]
    pub fn get() -> bool {
        unsafe { (sstatus::read() & sstatus::SIE) != 0 }
    }
}

/// Host-side stand-in for the interrupt-enable bit. Real hardware keeps this in `sstatus`; under
/// test there is only ever one simulated hart, so a plain cell is enough to drive the same
/// push_off/pop_off nesting logic that `SpinLock` relies on.
#[cfg(test)]
pub mod interrupts {
    use core::cell::Cell;

    std::thread_local! {
        static ENABLED: Cell<bool> = const { Cell::new(true) };
    }

    pub fn enable() {
        ENABLED.with(|e| e.set(true));
    }

    pub fn disable() {
        ENABLED.with(|e| e.set(false));
    }

    pub fn get() -> bool {
        ENABLED.with(|e| e.get())
    }
}
