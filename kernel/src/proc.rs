//! Process table, lifecycle, and dispatcher.
//!
//! This module owns the fixed-size process table, the per-CPU table, and every operation that
//! moves a process between states — including the two points (`enqueue`/`dequeue`) where it
//! crosses into and out of the shared ready heap defined in [`proc::heap`].
//!
//! A note on the scheduler/process-lock relay: on real hardware, the convention in this style of
//! kernel is that `scheduler()` acquires a process's lock right before switching into it, and the
//! process's own `yield`/`sleep`/`exit` path releases that same lock sometime after switching back
//! out — the two ends of one acquire/release pair live on different call stacks, stitched together
//! by the context-switch assembly. That assembly is an out-of-scope external collaborator here
//! (spec §1), so `scheduler()` is not itself unit-testable; the operations this module exposes for
//! testing (`enqueue`, `dequeue`, `fork`, `exit`, `wait`, `kill`, `sleep`, `wakeup`, `change_policy`)
//! each acquire and release within a single call, which is what the test harness in spec §8 actually
//! exercises.

pub mod heap;
pub mod policy;

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::err;
use crate::error::KernelError;
use crate::file::OpenFiles;
use crate::param::{MAXPROCNAME, MIN_CFS_TIMESLICE, NCPU, NPROC};
use crate::riscv::interrupts;
use crate::spinlock::{SpinLock, SpinLockGuard};
use crate::swtch::swtch;
use crate::sync::OnceLock;
use crate::vm::{TrapFrame, Uvm, alloc_trapframe};

use heap::{HeapEntry, ReadyHeap};
use policy::{Algorithm, Policy};

/// A process's scheduling-relevant lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Used,
    Runnable,
    Running,
    Sleeping,
    Zombie,
}

/// What a sleeping process is waiting on. `wakeup` matches against this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Sleeping in `wait`, keyed by the sleeper's own process-table index.
    Proc(usize),
    /// Sleeping in a tick-counted `sleep` syscall.
    Ticks,
}

/// Fields guarded by a process's own spin lock.
#[derive(Debug)]
pub struct ProcInner {
    pub state: ProcState,
    pub chan: Option<Channel>,
    pub killed: bool,
    pub xstate: i32,
    pub pid: usize,

    pub cpu_burst: u32,
    pub cpu_burst_aprox: u32,
    pub exe_time: u32,
    pub timeslice: usize,
    pub put_timestamp: usize,
}

impl ProcInner {
    const fn new() -> Self {
        Self {
            state: ProcState::Unused,
            chan: None,
            killed: false,
            xstate: 0,
            pid: 0,
            cpu_burst: 0,
            cpu_burst_aprox: 0,
            exe_time: 0,
            timeslice: 0,
            put_timestamp: 0,
        }
    }
}

/// RISC-V callee-saved register set, swapped by [`crate::swtch::swtch`].
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Context {
    pub ra: usize,
    pub sp: usize,
    pub s0: usize,
    pub s1: usize,
    pub s2: usize,
    pub s3: usize,
    pub s4: usize,
    pub s5: usize,
    pub s6: usize,
    pub s7: usize,
    pub s8: usize,
    pub s9: usize,
    pub s10: usize,
    pub s11: usize,
}

impl Context {
    pub const fn new() -> Self {
        Self {
            ra: 0,
            sp: 0,
            s0: 0,
            s1: 0,
            s2: 0,
            s3: 0,
            s4: 0,
            s5: 0,
            s6: 0,
            s7: 0,
            s8: 0,
            s9: 0,
            s10: 0,
            s11: 0,
        }
    }
}

/// Fields only ever touched by whichever code is allowed exclusive access: the allocator before a
/// slot becomes visible, or the CPU currently running the process.
pub struct ProcData {
    pub uvm: Option<Uvm>,
    pub trapframe: Option<TrapFrame>,
    pub context: Context,
    pub open_files: OpenFiles,
    pub name: [u8; MAXPROCNAME],
}

impl ProcData {
    const fn new() -> Self {
        Self {
            uvm: None,
            trapframe: None,
            context: Context::new(),
            open_files: OpenFiles::empty(),
            name: [0; MAXPROCNAME],
        }
    }
}

pub struct Proc {
    pub inner: SpinLock<ProcInner>,
    data: UnsafeCell<ProcData>,
}

// Safety: `data` is reached either before the slot leaves UNUSED (exclusively, by the allocator)
// or while RUNNING on exactly one CPU (exclusively, through `current_proc_and_data[_mut]`).
unsafe impl Sync for Proc {}

impl Proc {
    const fn new() -> Self {
        Self {
            inner: SpinLock::new(ProcInner::new(), "proc"),
            data: UnsafeCell::new(ProcData::new()),
        }
    }
}

pub struct ProcTable {
    table: [Proc; NPROC],
    /// The wait-lock: guards parent links (index = child, value = parent), acquired before any
    /// process lock (spec §5).
    pub parents: SpinLock<[Option<usize>; NPROC]>,
}

impl ProcTable {
    const fn new() -> Self {
        Self {
            table: [const { Proc::new() }; NPROC],
            parents: SpinLock::new([None; NPROC], "wait_lock"),
        }
    }

    /// Prints one line per non-`UNUSED` process, taking no lock (spec §6).
    ///
    /// # Safety note
    /// Reads `inner`/`data` without acquiring any lock, by design (see module docs on
    /// [`crate::console::procdump`]) — the output may be torn if a process mutates its own state
    /// concurrently, which is an accepted tradeoff for a debug dump that must never deadlock.
    pub fn dump(&self) {
        for proc in self.table.iter() {
            let inner = unsafe { proc.inner.get_mut_unchecked() };
            if inner.state == ProcState::Unused {
                continue;
            }
            let data = unsafe { &*proc.data.get() };
            let name_len = data.name.iter().position(|&b| b == 0).unwrap_or(data.name.len());
            let name = core::str::from_utf8(&data.name[..name_len]).unwrap_or("?");
            crate::println!("{} {} {}", inner.pid, state_name(inner.state), name);
        }
    }
}

fn state_name(state: ProcState) -> &'static str {
    match state {
        ProcState::Unused => "unused",
        ProcState::Used => "used",
        ProcState::Runnable => "runnable",
        ProcState::Running => "running",
        ProcState::Sleeping => "sleeping",
        ProcState::Zombie => "zombie",
    }
}

pub static PROC_TABLE: ProcTable = ProcTable::new();

static INIT_PROC: OnceLock<usize> = OnceLock::new();

pub fn init_proc_index() -> Option<usize> {
    INIT_PROC.get().copied()
}

fn proc_index(proc: &Proc) -> usize {
    let base = PROC_TABLE.table.as_ptr();
    unsafe { (proc as *const Proc).offset_from(base) as usize }
}

/// Monotonic PID allocation, serialized by its own leaf lock (spec §5's `pid_lock`).
static NEXT_PID: SpinLock<usize> = SpinLock::new(1, "pid_lock");

fn alloc_pid() -> usize {
    let mut next = NEXT_PID.lock();
    let pid = *next;
    *next += 1;
    pid
}

/// Global tick counter, advanced by the timer interrupt.
pub static TICKS: AtomicUsize = AtomicUsize::new(0);

/// Companion lock for `sys_sleep`'s ticks-elapsed rendezvous (paired with [`Channel::Ticks`] via
/// [`sleep`]); the counter itself stays a plain atomic so the timer interrupt and the scheduler
/// never need to take a lock just to read or advance it.
pub static TICKS_LOCK: SpinLock<()> = SpinLock::new((), "ticks_lock");

pub struct SchedulerState {
    pub policy: Policy,
    pub heap: ReadyHeap,
}

impl SchedulerState {
    const fn new() -> Self {
        Self {
            policy: Policy::default_policy(),
            heap: ReadyHeap::new(),
        }
    }
}

/// The scheduler lock: a leaf lock guarding the ready heap and the active policy (spec §5).
pub static SCHEDULER: SpinLock<SchedulerState> = SpinLock::new(SchedulerState::new(), "scheduler");

/// Per-CPU state.
pub struct Cpu {
    proc_index: Option<usize>,
    context: Context,
    pub num_off: usize,
    pub interrupt_enabled: bool,
}

impl Cpu {
    const fn new() -> Self {
        Self {
            proc_index: None,
            context: Context::new(),
            num_off: 0,
            interrupt_enabled: false,
        }
    }
}

struct CpuTable {
    cpus: [UnsafeCell<Cpu>; NCPU],
}

unsafe impl Sync for CpuTable {}

impl CpuTable {
    const fn new() -> Self {
        Self {
            cpus: [const { UnsafeCell::new(Cpu::new()) }; NCPU],
        }
    }
}

static CPU_TABLE: CpuTable = CpuTable::new();

#[cfg(not(test))]
fn cpu_id() -> usize {
    let id: usize;
    unsafe { core::arch::asm!("mv {0}, tp", out(reg) id, options(nomem, nostack)) };
    id
}

/// Under test there is exactly one simulated hart (spec §8's uniprocessor test harness); tests
/// that exercise global kernel state serialize through [`tests::TEST_MUTEX`] to honour that.
#[cfg(test)]
fn cpu_id() -> usize {
    0
}

/// # Safety
/// Caller must have interrupts disabled, otherwise the returned pointer may refer to the wrong
/// hart's state if this kernel thread migrates mid-use.
pub unsafe fn mycpu() -> *mut Cpu {
    CPU_TABLE.cpus[cpu_id()].get()
}

pub fn push_off() {
    let old = interrupts::get();
    interrupts::disable();
    unsafe {
        let c = &mut *mycpu();
        if c.num_off == 0 {
            c.interrupt_enabled = old;
        }
        c.num_off += 1;
    }
}

pub fn pop_off() {
    assert!(!interrupts::get(), "pop_off: interruptible");
    unsafe {
        let c = &mut *mycpu();
        assert!(c.num_off >= 1, "pop_off: not held");
        c.num_off -= 1;
        if c.num_off == 0 && c.interrupt_enabled {
            interrupts::enable();
        }
    }
}

/// RAII interrupt-disable guard; nests via [`Cpu::num_off`].
pub struct InterruptLock;

impl InterruptLock {
    pub fn new() -> Self {
        push_off();
        Self
    }
}

impl Default for InterruptLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptLock {
    fn drop(&mut self) {
        pop_off();
    }
}

pub fn current_proc_index() -> Option<usize> {
    let _il = InterruptLock::new();
    unsafe { (*mycpu()).proc_index }
}

pub fn current_proc() -> Option<&'static Proc> {
    let index = current_proc_index()?;
    Some(&PROC_TABLE.table[index])
}

/// Copies `dst.len()` bytes out of `proc`'s user address space starting at `src_addr`. Used by
/// `sys_write`, which has no other way to see into the calling process's memory.
pub fn copy_from_user(proc: &Proc, src_addr: usize, dst: &mut [u8]) -> Result<(), KernelError> {
    let data = unsafe { &*proc.data.get() };
    match data.uvm.as_ref() {
        Some(uvm) => uvm.copy_from_user(src_addr, dst),
        None => Err(KernelError::Alloc),
    }
}

// ---------------------------------------------------------------------------------------------
// Ready heap ingress/egress (spec §4.2)
// ---------------------------------------------------------------------------------------------

/// Core of "put": recomputes the scheduling-relevant fields and pushes onto the heap. Assumes the
/// process's own lock is already held by the caller.
///
/// Tests the *parameter's* state to decide whether the process was running — the open question in
/// spec §9 flags an original implementation that instead reads a fixed table slot's state here;
/// this crate implements the corrected behaviour.
fn enqueue_locked(index: usize, inner: &mut ProcInner) {
    let mut sched_state = SCHEDULER.lock();
    let policy = sched_state.policy;

    if inner.state != ProcState::Running {
        let a = policy.a as u64;
        inner.cpu_burst_aprox =
            ((a * inner.cpu_burst as u64 + (100 - a) * inner.cpu_burst_aprox as u64) / 100) as u32;
        inner.exe_time = 0;
    } else {
        inner.exe_time += inner.cpu_burst;
    }

    inner.put_timestamp = TICKS.load(Ordering::Relaxed);
    inner.state = ProcState::Runnable;

    let entry = HeapEntry {
        index,
        cpu_burst_aprox: inner.cpu_burst_aprox,
        exe_time: inner.exe_time,
    };
    sched_state.heap.push(entry, &policy);
}

/// Makes `proc` runnable and inserts it into the ready heap (spec §4.2 "put").
pub fn enqueue(proc: &Proc) {
    let index = proc_index(proc);
    let mut inner = proc.inner.lock();
    enqueue_locked(index, &mut inner);
}

/// Pops the highest-priority runnable process (spec §4.2 "get"), assigning a fresh CFS quantum
/// where applicable.
pub fn dequeue() -> Option<&'static Proc> {
    let (index, policy) = {
        let mut sched_state = SCHEDULER.lock();
        let policy = sched_state.policy;
        let entry = sched_state.heap.pop(&policy)?;
        (entry.index, policy)
    };

    let proc = &PROC_TABLE.table[index];
    {
        let mut inner = proc.inner.lock();
        inner.cpu_burst = 0;

        if policy.algorithm == Algorithm::Cfs {
            let heap_size_after_pop = SCHEDULER.lock().heap.len();
            let now = TICKS.load(Ordering::Relaxed);
            let mut timeslice = now.saturating_sub(inner.put_timestamp) / (heap_size_after_pop + 1);
            if timeslice == 0 {
                timeslice = MIN_CFS_TIMESLICE;
            }
            inner.timeslice = timeslice;
        } else {
            inner.timeslice = 0;
        }
    }

    Some(proc)
}

/// Validates and applies a new policy, rebuilding the heap under it (spec §4.3).
pub fn change_policy(algorithm: i32, is_preemptive: i32, a: i32) -> i32 {
    let policy = match policy::validate(algorithm, is_preemptive, a) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let mut sched_state = SCHEDULER.lock();
    sched_state.policy = policy;
    sched_state.heap.rebuild(&policy);
    0
}

pub fn current_policy() -> Policy {
    SCHEDULER.lock().policy
}

// ---------------------------------------------------------------------------------------------
// Dispatcher (spec §4.4)
// ---------------------------------------------------------------------------------------------

/// Sole path from a running kernel thread back to its CPU's scheduler context.
///
/// Preconditions: `inner`'s state is not `Running`, interrupts are disabled, and exactly one lock
/// (this one) is held on the current CPU.
pub fn sched(inner: SpinLockGuard<'_, ProcInner>) -> SpinLockGuard<'_, ProcInner> {
    assert_ne!(inner.state, ProcState::Running, "sched: proc is running");
    assert!(!interrupts::get(), "sched: interruptible");

    let proc = current_proc().expect("sched: no current proc");
    let cpu = unsafe { &mut *mycpu() };
    assert_eq!(cpu.num_off, 1, "sched: must hold exactly one lock");

    let proc_context = unsafe { &mut (*proc.data.get()).context as *mut Context };
    let interrupt_enabled_before = cpu.interrupt_enabled;

    unsafe { swtch(proc_context, &mut cpu.context as *mut Context) };

    cpu.interrupt_enabled = interrupt_enabled_before;
    inner
}

/// Gives up the CPU for one round: re-enqueues the caller and reschedules.
pub fn r#yield() {
    let proc = current_proc().expect("yield: no current proc");
    let index = proc_index(proc);
    let mut inner = proc.inner.lock();
    enqueue_locked(index, &mut inner);
    let inner = sched(inner);
    drop(inner);
}

/// Atomically releases `guard` and blocks the caller on `chan`. Mirrors the teacher's own
/// `sleep(chan, lock) -> lock` shape so callers can thread an arbitrary companion lock through.
pub fn sleep<'a, T>(chan: Channel, guard: SpinLockGuard<'a, T>) -> SpinLockGuard<'a, T> {
    let companion = guard.source();

    let proc = current_proc().expect("sleep: no current proc");
    let mut inner = proc.inner.lock();

    SpinLock::unlock(guard);

    inner.chan = Some(chan);
    inner.state = ProcState::Sleeping;

    let mut inner = sched(inner);
    inner.chan = None;
    drop(inner);

    companion.lock()
}

/// Wakes every process sleeping on `chan`, except the caller. Caller must not hold any process
/// lock.
pub fn wakeup(chan: Channel) {
    let caller = current_proc_index();
    for index in 0..NPROC {
        if Some(index) == caller {
            continue;
        }
        let proc = &PROC_TABLE.table[index];
        let mut inner = proc.inner.lock();
        if inner.state == ProcState::Sleeping && inner.chan == Some(chan) {
            enqueue_locked(index, &mut inner);
        }
    }
}

/// Marks the process `pid` as killed; if sleeping, wakes it so it reaches a cancellation
/// checkpoint sooner (spec §5).
pub fn kill(pid: usize) -> Result<(), KernelError> {
    for index in 0..NPROC {
        let proc = &PROC_TABLE.table[index];
        let mut inner = proc.inner.lock();
        if inner.pid == pid && inner.state != ProcState::Unused {
            inner.killed = true;
            if inner.state == ProcState::Sleeping {
                enqueue_locked(index, &mut inner);
            }
            return Ok(());
        }
    }
    err!(KernelError::NoSuchProcess);
}

/// Called from the trap handler on every timer tick with the currently running process.
pub fn timer_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);

    let Some(index) = current_proc_index() else {
        return;
    };
    let proc = &PROC_TABLE.table[index];

    let should_yield = {
        let mut inner = proc.inner.lock();
        inner.cpu_burst += 1;
        let policy = current_policy();
        (inner.timeslice != 0 && inner.cpu_burst as usize == inner.timeslice)
            || (policy.algorithm == Algorithm::Sjf && policy.is_preemptive)
    };

    if should_yield {
        r#yield();
    }
}

#[cfg(not(test))]
pub fn scheduler() -> ! {
    loop {
        interrupts::enable();

        let Some(proc) = dequeue() else { continue };
        let mut inner = proc.inner.lock();
        if inner.state != ProcState::Runnable {
            continue;
        }
        inner.state = ProcState::Running;

        let cpu = unsafe { &mut *mycpu() };
        cpu.proc_index = Some(proc_index(proc));

        let proc_context = unsafe { &mut (*proc.data.get()).context as *mut Context };
        unsafe { swtch(&mut cpu.context as *mut Context, proc_context) };

        cpu.proc_index = None;

        if inner.state == ProcState::Runnable {
            enqueue_locked(proc_index(proc), &mut inner);
        }
    }
}

// ---------------------------------------------------------------------------------------------
// Process lifecycle (spec §4.1)
// ---------------------------------------------------------------------------------------------

/// Scans for an `UNUSED` slot, claims it, and requests its collaborators. The returned process's
/// lock is not held on return: once a slot leaves `UNUSED` no other scanner can rediscover it, so
/// there is no correctness need to keep it locked across the call boundary the way the original
/// (single-stack) implementation does.
pub fn allocproc() -> Result<&'static Proc, KernelError> {
    for index in 0..NPROC {
        let proc = &PROC_TABLE.table[index];
        let mut inner = proc.inner.lock();
        if inner.state != ProcState::Unused {
            continue;
        }

        inner.pid = alloc_pid();
        inner.state = ProcState::Used;
        inner.killed = false;
        inner.xstate = 0;
        inner.chan = None;
        inner.cpu_burst = 0;
        inner.cpu_burst_aprox = 0;
        inner.exe_time = 0;
        inner.timeslice = 0;
        inner.put_timestamp = 0;

        let uvm = Uvm::create();
        let trapframe = alloc_trapframe(index);
        match (uvm, trapframe) {
            (Ok(uvm), Ok(trapframe)) => {
                let data = unsafe { &mut *proc.data.get() };
                data.uvm = Some(uvm);
                data.trapframe = Some(trapframe);
                data.context = Context::new();
                data.open_files = OpenFiles::empty();
                data.name = [0; MAXPROCNAME];
                drop(inner);
                return Ok(proc);
            }
            _ => {
                drop(inner);
                freeproc(proc);
                err!(KernelError::Alloc);
            }
        }
    }
    err!(KernelError::OutOfProc);
}

/// Releases a process's collaborators and returns its slot to `UNUSED`.
pub fn freeproc(proc: &Proc) {
    let mut inner = proc.inner.lock();
    inner.pid = 0;
    inner.chan = None;
    inner.killed = false;
    inner.xstate = 0;
    inner.cpu_burst = 0;
    inner.cpu_burst_aprox = 0;
    inner.exe_time = 0;
    inner.timeslice = 0;
    inner.put_timestamp = 0;
    inner.state = ProcState::Unused;

    let data = unsafe { &mut *proc.data.get() };
    if let Some(uvm) = data.uvm.take() {
        uvm.free();
    }
    data.trapframe = None;
    data.open_files.close_all();
}

/// Allocates and dispatches the first user process. Must be called exactly once, at boot.
pub fn userinit() {
    let proc = allocproc().expect("userinit: allocproc failed");
    let index = proc_index(proc);
    INIT_PROC.set(index);

    {
        let data = unsafe { &mut *proc.data.get() };
        let name = b"init";
        data.name[..name.len()].copy_from_slice(name);
    }

    enqueue(proc);
}

/// Every slot parented by `index` is repointed to `init`, which is woken if anything was
/// reparented. Caller must hold `PROC_TABLE.parents`.
fn reparent_locked(parents: &mut [Option<usize>; NPROC], index: usize) {
    let Some(init_index) = init_proc_index() else {
        return;
    };
    let mut reparented_any = false;
    for parent in parents.iter_mut() {
        if *parent == Some(index) {
            *parent = Some(init_index);
            reparented_any = true;
        }
    }
    if reparented_any {
        wakeup(Channel::Proc(init_index));
    }
}

/// Duplicates the calling process into a new child, returning the child's pid.
pub fn fork() -> Result<usize, KernelError> {
    let parent = current_proc().expect("fork: no current proc");
    let parent_index = proc_index(parent);

    let child = allocproc()?;
    let child_index = proc_index(child);

    let copy_result = {
        let parent_data = unsafe { &*parent.data.get() };
        parent_data.uvm.as_ref().map(Uvm::copy)
    };

    match copy_result {
        Some(Ok(uvm)) => {
            let parent_data = unsafe { &*parent.data.get() };
            let child_data = unsafe { &mut *child.data.get() };
            child_data.uvm = Some(uvm);
            child_data.open_files = parent_data.open_files.dup_all();
            child_data.name = parent_data.name;
            if let Some(tf) = child_data.trapframe.as_mut() {
                tf.a0 = 0;
            }
        }
        _ => {
            freeproc(child);
            err!(KernelError::Alloc);
        }
    }

    let child_pid = child.inner.lock().pid;

    {
        let mut parents = PROC_TABLE.parents.lock();
        parents[child_index] = Some(parent_index);
    }

    enqueue(child);

    Ok(child_pid)
}

/// Terminates the calling process. Closes its files, reparents its children to `init`, wakes its
/// parent, and never returns.
pub fn exit(status: i32) -> ! {
    let proc = current_proc().expect("exit: no current proc");
    let index = proc_index(proc);
    assert_ne!(Some(index), init_proc_index(), "init process must never exit");

    {
        let data = unsafe { &mut *proc.data.get() };
        data.open_files.close_all();
    }

    let mut parents = PROC_TABLE.parents.lock();
    reparent_locked(&mut parents, index);

    let parent_index = parents[index];
    if let Some(parent_index) = parent_index {
        wakeup(Channel::Proc(parent_index));
    }

    let mut inner = proc.inner.lock();
    inner.xstate = status;
    inner.state = ProcState::Zombie;
    SpinLock::unlock(parents);

    let _inner = sched(inner);
    unreachable!("zombie process rescheduled");
}

/// Waits for a child to exit, returning its pid. `status_addr` of 0 skips copying the exit status.
pub fn wait(status_addr: usize) -> Result<usize, KernelError> {
    let proc = current_proc().expect("wait: no current proc");
    let index = proc_index(proc);

    let mut parents = PROC_TABLE.parents.lock();
    loop {
        let mut have_children = false;

        for child_index in 0..NPROC {
            if parents[child_index] != Some(index) {
                continue;
            }
            have_children = true;

            let child = &PROC_TABLE.table[child_index];
            let is_zombie = child.inner.lock().state == ProcState::Zombie;
            if !is_zombie {
                continue;
            }

            let (pid, xstate) = {
                let inner = child.inner.lock();
                (inner.pid, inner.xstate)
            };
            freeproc(child);
            parents[child_index] = None;

            if status_addr != 0 {
                let parent_data = unsafe { &mut *proc.data.get() };
                if let Some(uvm) = parent_data.uvm.as_mut() {
                    let _ = uvm.copy_to_user(status_addr, &xstate.to_ne_bytes());
                }
            }

            return Ok(pid);
        }

        let killed = proc.inner.lock().killed;
        if !have_children || killed {
            err!(KernelError::NoChildren);
        }

        parents = sleep(Channel::Proc(index), parents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes every test that touches global kernel state, since `cpu_id()` always returns 0
    // under test (spec §8's uniprocessor harness) and `cargo test` otherwise runs tests in
    // parallel OS threads.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn reset_all() {
        for index in 0..NPROC {
            let proc = &PROC_TABLE.table[index];
            let mut inner = proc.inner.lock();
            *inner = ProcInner::new();
        }
        *PROC_TABLE.parents.lock() = [None; NPROC];
        {
            let mut sched_state = SCHEDULER.lock();
            sched_state.policy = Policy::default_policy();
            sched_state.heap = ReadyHeap::new();
        }
        TICKS.store(0, Ordering::Relaxed);
    }

    fn with_clean_state<F: FnOnce()>(f: F) {
        let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        reset_all();
        f();
    }

    fn spawn_runnable(cpu_burst_aprox: u32) -> usize {
        let proc = allocproc().expect("allocproc");
        let index = proc_index(proc);
        {
            let mut inner = proc.inner.lock();
            inner.cpu_burst_aprox = cpu_burst_aprox;
        }
        enqueue(proc);
        index
    }

    // P2: a process is in the heap iff its state is RUNNABLE.
    #[test]
    fn enqueue_marks_runnable_dequeue_clears_it() {
        with_clean_state(|| {
            let index = spawn_runnable(10);
            assert_eq!(PROC_TABLE.table[index].inner.lock().state, ProcState::Runnable);

            let proc = dequeue().expect("dequeue");
            assert_eq!(proc_index(proc), index);
            // dequeue does not itself flip state; the dispatcher does that. Confirm it is no
            // longer discoverable in the heap.
            assert_eq!(SCHEDULER.lock().heap.len(), 0);
        });
    }

    // P4: with a=100 one enqueue suffices to reach the observed burst; with a=0 the average never
    // changes.
    #[test]
    fn exponential_average_converges_per_alpha() {
        with_clean_state(|| {
            change_policy(0, 0, 100);
            let proc = allocproc().expect("allocproc");
            {
                let mut inner = proc.inner.lock();
                inner.cpu_burst = 42;
            }
            enqueue(proc);
            assert_eq!(proc.inner.lock().cpu_burst_aprox, 42);

            reset_all();
            change_policy(0, 0, 0);
            let proc = allocproc().expect("allocproc");
            {
                let mut inner = proc.inner.lock();
                inner.cpu_burst = 42;
                inner.cpu_burst_aprox = 7;
            }
            enqueue(proc);
            assert_eq!(proc.inner.lock().cpu_burst_aprox, 7);
        });
    }

    // Scenario 3: CFS quantum = (ticks - put_timestamp) / (heap_size_after_pop + 1), clamped to
    // at least 1.
    #[test]
    fn cfs_quantum_matches_formula() {
        with_clean_state(|| {
            change_policy(1, 0, 0);
            TICKS.store(100, Ordering::Relaxed);

            let a = allocproc().expect("allocproc");
            enqueue(a);
            let b = allocproc().expect("allocproc");
            enqueue(b);

            TICKS.store(110, Ordering::Relaxed);
            let first = dequeue().expect("dequeue");
            // one process remains in the heap after this pop
            assert_eq!(first.inner.lock().timeslice, 5);
        });
    }

    // Scenario 5: fork/exit/wait rendezvous.
    #[test]
    fn wait_returns_child_pid_and_status() {
        with_clean_state(|| {
            let init = allocproc().expect("allocproc init");
            INIT_PROC.set(proc_index(init));

            let parent = allocproc().expect("allocproc parent");
            let parent_index = proc_index(parent);

            let child = allocproc().expect("allocproc child");
            let child_index = proc_index(child);
            PROC_TABLE.parents.lock()[child_index] = Some(parent_index);

            {
                let mut inner = child.inner.lock();
                inner.xstate = 7;
                inner.state = ProcState::Zombie;
            }

            let pid = child.inner.lock().pid;
            let found = wait(0).expect("wait");
            assert_eq!(found, pid);
            assert_eq!(child.inner.lock().state, ProcState::Unused);
        });
    }

    // Scenario 6: kill wakes a sleeper.
    #[test]
    fn kill_wakes_sleeping_process() {
        with_clean_state(|| {
            let proc = allocproc().expect("allocproc");
            let pid = proc.inner.lock().pid;
            {
                let mut inner = proc.inner.lock();
                inner.state = ProcState::Sleeping;
                inner.chan = Some(Channel::Ticks);
            }

            kill(pid).expect("kill");

            let inner = proc.inner.lock();
            assert!(inner.killed);
            assert_eq!(inner.state, ProcState::Runnable);
        });
    }

    // P7: exit always ends in ZOMBIE, reparenting children to init and waking it.
    #[test]
    fn reparent_moves_orphans_to_init() {
        with_clean_state(|| {
            let init = allocproc().expect("allocproc init");
            let init_index = proc_index(init);
            INIT_PROC.set(init_index);

            let parent = allocproc().expect("allocproc parent");
            let parent_index = proc_index(parent);

            let child = allocproc().expect("allocproc child");
            let child_index = proc_index(child);
            PROC_TABLE.parents.lock()[child_index] = Some(parent_index);

            {
                let mut inner = init.inner.lock();
                inner.state = ProcState::Sleeping;
                inner.chan = Some(Channel::Proc(init_index));
            }

            let mut parents = PROC_TABLE.parents.lock();
            reparent_locked(&mut parents, parent_index);

            assert_eq!(parents[child_index], Some(init_index));
            drop(parents);
            assert_eq!(init.inner.lock().state, ProcState::Runnable);
        });
    }

    #[test]
    fn kill_reports_no_such_process() {
        with_clean_state(|| {
            assert_eq!(kill(9999), Err(KernelError::NoSuchProcess));
        });
    }
}
