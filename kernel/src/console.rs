//! Console output.
//!
//! The UART itself is an out-of-scope external collaborator (see spec §1); [`uart_putc`] is the
//! single seam a real driver would plug into. Everything above that — the `print!`/`println!`
//! macros and the lock-free process dump — belongs to this crate.

use core::fmt;

use crate::spinlock::SpinLock;

pub static CONSOLE: SpinLock<Console> = SpinLock::new(Console::new(), "console");

pub struct Console;

impl Console {
    const fn new() -> Self {
        Self
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &b in s.as_bytes() {
            uart_putc(b);
        }
        Ok(())
    }
}

/// Pushes a single byte out to the UART.
///
/// On the real target this would poll the UART's transmit-ready bit and write to its data
/// register; that hardware driver is out of scope here, so this is a minimal stand-in.
#[cfg(not(test))]
fn uart_putc(_byte: u8) {}

#[cfg(test)]
fn uart_putc(byte: u8) {
    use std::io::Write as _;
    let _ = std::io::stdout().write_all(&[byte]);
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    let _ = CONSOLE.lock().write_fmt(args);
}

/// Writes raw bytes to the console, for `sys_write` — user programs have no notion of the
/// kernel's own `print!`/`println!` formatting machinery, just a byte buffer.
pub fn write_bytes(bytes: &[u8]) {
    let _console = CONSOLE.lock();
    for &b in bytes {
        uart_putc(b);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::console::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::console::_print(format_args!("{}\n", format_args!($($arg)*))));
}

/// Prints one line per non-`UNUSED` process: `pid state-name process-name`.
///
/// Takes no lock, so it can be triggered from a wedged machine (e.g. a debug interrupt handler)
/// without risking a deadlock on whatever lock the faulting code held.
pub fn procdump() {
    println!();
    crate::proc::PROC_TABLE.dump();
}
