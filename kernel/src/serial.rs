//! Console output abstraction.
//!
//! The PL011 UART driver is out of scope for this crate; what lives here is
//! the `Write`-style trait core code logs through, plus a semihosting-backed
//! implementation so boot messages and `#[test_case]` output have somewhere
//! to go before a real driver is attached. A platform wires up `set_console`
//! once its UART is initialized; everything above this module is agnostic
//! to which backend is in use.

use core::fmt;
use spin::Mutex;

/// Anything the logger and panic handler can write formatted text to.
pub trait Console: fmt::Write + Send {}
impl<T: fmt::Write + Send> Console for T {}

struct SemihostingConsole;

impl fmt::Write for SemihostingConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        crate::arch_impl::current::semihosting_write_str(s);
        Ok(())
    }
}

static CONSOLE: Mutex<Option<&'static mut dyn Console>> = Mutex::new(None);
static mut SEMIHOSTING: SemihostingConsole = SemihostingConsole;

/// Attaches a real console backend (e.g. a PL011 driver living outside this
/// crate). Until this is called, output goes through ARM semihosting.
pub fn set_console(console: &'static mut dyn Console) {
    *CONSOLE.lock() = Some(console);
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    let mut guard = CONSOLE.lock();
    match guard.as_mut() {
        Some(console) => {
            let _ = console.write_fmt(args);
        }
        None => {
            // SAFETY: single-core, and the semihosting trap itself is the
            // only synchronization semihosting needs.
            let sh = unsafe { &mut *core::ptr::addr_of_mut!(SEMIHOSTING) };
            let _ = sh.write_fmt(args);
        }
    }
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! serial_println {
    () => { $crate::serial_print!("\n") };
    ($fmt:expr) => { $crate::serial_print!(concat!($fmt, "\n")) };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::serial_print!(concat!($fmt, "\n"), $($arg)*)
    };
}

pub use serial_println;
