#![no_std]
#![no_main]

use user::*;

/// Forks once; the child exits immediately and the parent sleeps, so the child sits as a zombie
/// (exited but unreaped) until the parent itself exits without ever calling `wait`, at which point
/// `init` reparents and reaps it.
#[unsafe(no_mangle)]
fn main(_args: Args) {
    if fork().unwrap_or_else(|_| exit_with_msg("zombie: fork failed")) > 0 {
        let _ = sleep(5);
    }
    exit(0);
}
