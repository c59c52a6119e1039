#![no_std]
#![no_main]

use user::*;

/// Ticks to wait between reap attempts while `init` has no children at all. `wait` would
/// otherwise return immediately with no children to block on, turning an idle `init` into a busy
/// spin on the one CPU this kernel targets.
const IDLE_POLL_TICKS: usize = 10;

/// `init` has nothing to exec and no shell to babysit in this system; its only job is the one the
/// kernel actually needs from pid 1 — reap whatever gets reparented to it once its parent exits.
#[unsafe(no_mangle)]
fn main(_args: Args) {
    loop {
        if wait(&mut 0).is_err() {
            let _ = sleep(IDLE_POLL_TICKS);
        }
    }
}
