#![no_std]
#![no_main]

use user::*;

/// Ticks each worker burns before exiting, long enough to be visible in `uptime` deltas.
const WORK_TICKS: usize = 10;

const WORKERS: usize = 4;

#[unsafe(no_mangle)]
fn main(_args: Args) {
    println!("PID: {}  |  Uptime: {} ticks", getpid(), uptime());
    println!();

    demo_process_management();
    demo_policy_switch();

    println!("done");
}

/// Demonstrates the process table and ready heap juggling several runnable processes at once: a
/// batch of children are forked, each burns a fixed number of ticks, and the parent waits for all
/// of them to become zombies and be reaped.
fn demo_process_management() {
    println!("[1] Process Management");
    println!("    Forking {} worker processes...", WORKERS);

    let mut child_pids = [0usize; WORKERS];
    for slot in child_pids.iter_mut() {
        match fork().unwrap_or_else(|_| exit_with_msg("demo: fork failed")) {
            0 => {
                let _ = sleep(WORK_TICKS);
                exit(0);
            }
            pid => *slot = pid,
        }
    }

    for (i, &pid) in child_pids.iter().enumerate() {
        println!("    Worker {}: PID {}", i + 1, pid);
    }

    let mut status = 0;
    for _ in 0..WORKERS {
        wait(&mut status).expect("demo: wait failed");
    }
    println!("    All {} workers reaped.", WORKERS);
    println!();
}

/// Demonstrates `chsched`: switches from the default SJF policy to CFS and back, forking a couple
/// of short-lived workers under each so the two policies actually get exercised.
fn demo_policy_switch() {
    println!("[2] Policy Switch");

    println!("    chsched(CFS, preemptive, a=0) -> {}", chsched(1, 1, 0));
    run_and_reap(2);

    println!("    chsched(SJF, preemptive, a=50) -> {}", chsched(0, 1, 50));
    run_and_reap(2);

    println!();
}

fn run_and_reap(count: usize) {
    for _ in 0..count {
        if fork().unwrap_or_else(|_| exit_with_msg("demo: fork failed")) == 0 {
            let _ = sleep(WORK_TICKS / 2);
            exit(0);
        }
    }
    let mut status = 0;
    for _ in 0..count {
        wait(&mut status).expect("demo: wait failed");
    }
}
