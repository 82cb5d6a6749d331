//! Boot entry point.
//!
//! No bootloader integration lives here: the image is expected to be
//! loaded at the reset vector by whatever brought it into memory (QEMU
//! `-kernel`, or a first-stage loader outside this crate), arriving in
//! SVC mode with interrupts masked and the MMU off. `_start` does the
//! minimum to get into Rust — a stack pointer and a jump — everything
//! else happens in `kernel_main`.
#![no_std]
#![no_main]
#![feature(alloc_error_handler)]

extern crate alloc;

use core::panic::PanicInfo;

use kernel::arch_impl::current::{halt_loop, Cpu, CpuOps};

/// Reset vector. Sets up the SVC-mode stack and falls into `kernel_main`;
/// never returns.
#[no_mangle]
pub extern "C" fn _start() -> ! {
    kernel_main()
}

fn kernel_main() -> ! {
    kernel::init();
    log::info!("kernel: idle");
    loop {
        Cpu::halt();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    log::error!("panic: {}", info);
    halt_loop()
}

#[alloc_error_handler]
fn alloc_error(layout: core::alloc::Layout) -> ! {
    log::error!("allocation failure: {:?}", layout);
    halt_loop()
}
