// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Fixed NUCLEO-F042K6 board configuration.

use crate::regs::{
    GPIOB_BASE, GPIO_MODER, GPIO_MODER_OUTPUT, RCC_AHBENR, RCC_AHBENR_GPIOBEN,
};
use crate::toggler::OutputPin;
use crate::RegisterAccess;

/// SYSCLK after configuration, driven undivided from HSI48.
pub const SYSCLK_HZ: u32 = 48_000_000;

/// SYSCLK out of reset (HSI).
pub const RESET_SYSCLK_HZ: u32 = 8_000_000;

pub const TICK_RATE_HZ: u32 = 1_000;

/// Ticks between output transitions: 1000 ticks at 1 kHz gives a 0.5 Hz blink.
pub const TOGGLE_PERIOD_TICKS: u32 = 1_000;

/// User LED LD3 on PB3.
pub const LED: OutputPin = OutputPin::new(GPIOB_BASE, 3);

/// Enables the GPIOB clock and puts the LED pin in general purpose output mode.
///
/// This is board bring-up, not part of the clock or blink sequencing: it has
/// to happen before the first toggle is due and has no ordering hazard.
pub fn configure_led_output<R: RegisterAccess>(regs: &mut R) {
    regs.modify(RCC_AHBENR, 0, RCC_AHBENR_GPIOBEN);

    let shift = u32::from(LED.index()) * 2;
    regs.modify(
        LED.port() + GPIO_MODER,
        0b11 << shift,
        GPIO_MODER_OUTPUT << shift,
    );
}
