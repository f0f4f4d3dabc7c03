// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_std]
#![no_main]

use core::cell::RefCell;
use cortex_m::interrupt::{self, Mutex};
use cortex_m_rt::{entry, exception};
use panic_halt as _;

use f0blink_core::board::{configure_led_output, LED, TOGGLE_PERIOD_TICKS};
use f0blink_core::{Level, RegisterAccess, Toggler, WaitPolicy};

#[cfg(not(feature = "bounded-wait"))]
const WAIT_POLICY: WaitPolicy = WaitPolicy::Forever;
#[cfg(feature = "bounded-wait")]
const WAIT_POLICY: WaitPolicy = WaitPolicy::Bounded { max_polls: 100_000 };

// Shared with the SysTick handler; filled in before the tick is enabled.
static TOGGLER: Mutex<RefCell<Option<Toggler>>> = Mutex::new(RefCell::new(None));

/// Volatile access to the memory-mapped peripherals.
struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    /// Callers must not race another `Mmio` on the same read-modify-write.
    unsafe fn steal() -> Self {
        Mmio { _private: () }
    }
}

impl RegisterAccess for Mmio {
    fn read(&mut self, addr: u32) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    fn write(&mut self, addr: u32, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}

#[entry]
fn main() -> ! {
    // SysTick only ever writes GPIOB BSRR, which nothing here modifies
    let mut regs = unsafe { Mmio::steal() };

    let toggler = Toggler::new(LED, TOGGLE_PERIOD_TICKS);
    interrupt::free(|cs| *TOGGLER.borrow(cs).borrow_mut() = Some(toggler));

    let configured = f0blink_core::configure(&mut regs, WAIT_POLICY);

    // First toggle is 1000 ticks away; PB3 is an output long before then
    configure_led_output(&mut regs);

    if configured.is_err() {
        // Clock never came up: LED on, stay at reset clocks
        LED.set(&mut regs, Level::High);
        loop {
            cortex_m::asm::nop();
        }
    }

    loop {
        core::hint::spin_loop();
    }
}

#[exception]
fn SysTick() {
    interrupt::free(|cs| {
        let mut regs = unsafe { Mmio::steal() };
        if let Some(toggler) = TOGGLER.borrow(cs).borrow_mut().as_mut() {
            toggler.on_tick(&mut regs);
        }
    });
}
