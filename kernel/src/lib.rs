//! Kernel core for a single-core, protected-mode ARMv6 microkernel.
//!
//! Three load-bearing subsystems live here: virtual memory (buddy allocator,
//! two-level ARM page tables, per-process address spaces), the thread
//! scheduler (priority runqueues, priority inheritance, context switch), and
//! synchronous/async IPC (QNX-style channels, connections, messages, pulses).
//! Device drivers, the ELF loader, and userspace are out of scope; this crate
//! only defines the traits the rest of the system plugs into.
#![no_std]
#![cfg_attr(test, no_main)]
#![feature(custom_test_frameworks)]
#![feature(alloc_error_handler)]
#![test_runner(crate::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;
// Pure-logic modules get plain #[cfg(test)] unit tests harnessed with std
// (cargo test links std for the host test binary); the no_std kernel image
// itself never pulls this in.
#[cfg(test)]
extern crate std;

pub mod arch_impl;
pub mod collections;
pub mod config;
pub mod error;
pub mod interrupts;
pub mod ipc;
pub mod loader;
pub mod logger;
pub mod memory;
pub mod once;
pub mod process;
pub mod semaphore;
pub mod serial;
pub mod spinlock;
pub mod syscall;
pub mod task;
pub mod timer;

pub use error::Error;

/// Brings up the subsystems in dependency order: page allocator, slab
/// caches, kernel address space, scheduler, IPC name registry, then the
/// process manager. Interrupts stay masked until every singleton below is
/// initialized, since none of them tolerate concurrent access before that.
pub fn init() {
    logger::init();
    log::info!("kernel: starting subsystem init");
    memory::init();
    task::scheduler::init();
    ipc::init();
    interrupts::init();
    syscall::init();
    process::init();
    log::info!("kernel: subsystem init complete");
}

/// Marker trait for `#[test_case]` functions, mirroring the teacher's
/// `Testable` pattern: every test gets its name printed before it runs so a
/// hang points at the offending test instead of leaving a silent QEMU.
pub trait Testable {
    fn run(&self) -> ();
}

impl<T> Testable for T
where
    T: Fn(),
{
    fn run(&self) {
        serial::serial_println!("{}...\t", core::any::type_name::<T>());
        self();
        serial::serial_println!("[ok]");
    }
}

pub fn test_runner(tests: &[&dyn Testable]) {
    serial::serial_println!("Running {} tests", tests.len());
    for test in tests {
        test.run();
    }
    exit_qemu(QemuExitCode::Success);
}

pub fn test_panic_handler(info: &core::panic::PanicInfo) -> ! {
    serial::serial_println!("[failed]\n");
    serial::serial_println!("Error: {}\n", info);
    exit_qemu(QemuExitCode::Failed);
    arch_impl::current::halt_loop()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    Success = 0x10,
    Failed = 0x11,
}

/// Exits QEMU via the semihosting `SYS_EXIT` call (ARMv6 has no debug-exit
/// I/O port the way x86 does). A no-op under `cfg(test)` off real hardware.
pub fn exit_qemu(code: QemuExitCode) {
    arch_impl::current::semihosting_exit(code as u32);
}

#[cfg(test)]
mod test_entry {
    use super::*;

    #[no_mangle]
    pub extern "C" fn _start() -> ! {
        test_main();
        arch_impl::current::halt_loop()
    }

    #[panic_handler]
    fn panic(info: &core::panic::PanicInfo) -> ! {
        test_panic_handler(info)
    }
}
