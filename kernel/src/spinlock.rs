//! Spin locks.
//!
//! `SpinLock<T>` is locked whenever its owning-CPU pointer is non-null. Acquiring one disables
//! interrupts on the local hart for as long as the guard lives, via [`crate::proc::InterruptLock`],
//! so that an interrupt handler can never observe a half-updated protected value.

use core::cell::UnsafeCell;
use core::hint;
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::proc::{Cpu, InterruptLock, pop_off};

#[derive(Debug)]
pub struct SpinLock<T> {
    name: &'static str,
    cpu: AtomicPtr<Cpu>,
    data: UnsafeCell<T>,
}

// Safety: `data` is only ever reachable through a guard that holds exclusive access, or through
// `&mut self`/`into_inner` which already require exclusive access to the lock itself.
unsafe impl<T> Sync for SpinLock<T> where T: Send {}

pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    _intr_lock: InterruptLock,
}

unsafe impl<T> Sync for SpinLockGuard<'_, T> where T: Sync {}

impl<T> SpinLock<T> {
    pub const fn new(value: T, name: &'static str) -> Self {
        Self {
            name,
            cpu: AtomicPtr::new(ptr::null_mut()),
            data: UnsafeCell::new(value),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Safety: caller must have interrupts disabled (true while `InterruptLock` is live).
    unsafe fn holding(&self) -> bool {
        self.cpu.load(Ordering::Relaxed) == crate::proc::mycpu()
    }

    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let intr_lock = InterruptLock::new();

        unsafe {
            assert!(!self.holding(), "acquire {}: already held on this cpu", self.name);

            loop {
                if self
                    .cpu
                    .compare_exchange(
                        ptr::null_mut(),
                        crate::proc::mycpu(),
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    break;
                }
                hint::spin_loop();
            }
        }

        SpinLockGuard {
            lock: self,
            _intr_lock: intr_lock,
        }
    }

    /// Explicit, symmetric alternative to `drop(guard)`, used where the call site wants to make
    /// the release point visually obvious (e.g. `sleep`'s release-then-block sequence).
    pub fn unlock(guard: SpinLockGuard<'_, T>) {
        drop(guard);
    }

    /// Releases the lock without a live guard object.
    ///
    /// # Safety
    /// Caller must currently be holding this lock (e.g. across a context switch that does not
    /// return into the frame that called `lock()`, such as a freshly forked process's first
    /// dispatch). Using the lock or a stale guard afterwards is undefined behaviour.
    pub unsafe fn force_unlock(&self) {
        unsafe {
            assert!(self.holding(), "force_unlock {}: not held", self.name);
            self.cpu.store(ptr::null_mut(), Ordering::Release);
            pop_off();
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// # Safety
    /// Caller must ensure no other reference (guard or otherwise) is live.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut_unchecked(&self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        unsafe {
            assert!(self.lock.holding(), "release {}: not held", self.lock.name);
        }
        self.lock.cpu.store(ptr::null_mut(), Ordering::Release);
    }
}

impl<'a, T> SpinLockGuard<'a, T> {
    /// Returns the lock this guard came from, so a caller can release the guard and later
    /// reacquire the same lock (e.g. [`crate::proc::sleep`]'s release-then-block-then-reacquire).
    pub fn source(&self) -> &'a SpinLock<T> {
        self.lock
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}
