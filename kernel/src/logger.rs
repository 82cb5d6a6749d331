//! Installs the single `log` facade logger used kernel-wide.
//!
//! Every subsystem logs through `log::info!`/`log::warn!`/etc.; nothing
//! constructs its own ad hoc logger. Output goes through `serial` so the
//! backend (semihosting during boot, a UART driver once attached) stays
//! swappable underneath.

use log::{LevelFilter, Log, Metadata, Record};

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        crate::serial::serial_println!(
            "[{:>5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// Installs the logger. Must run before any other subsystem logs, and
/// before interrupts are unmasked: `log::set_logger` is not safe to race.
pub fn init() {
    log::set_logger(&LOGGER).expect("logger already installed");
    let level = if cfg!(feature = "testing") {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    log::set_max_level(level);
}
