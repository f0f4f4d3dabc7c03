// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! STM32F042 register map (RM0091) restricted to what the blinker touches.

// FLASH interface
pub const FLASH_BASE: u32 = 0x4002_2000;
pub const FLASH_ACR: u32 = FLASH_BASE;
pub const FLASH_ACR_LATENCY: u32 = 0x1;

// Reset and clock control
pub const RCC_BASE: u32 = 0x4002_1000;
pub const RCC_CR: u32 = RCC_BASE;
pub const RCC_CFGR: u32 = RCC_BASE + 0x04;
pub const RCC_AHBENR: u32 = RCC_BASE + 0x14;
pub const RCC_CR2: u32 = RCC_BASE + 0x34;

pub const RCC_CR_HSION: u32 = 1 << 0;
pub const RCC_CR_HSIRDY: u32 = 1 << 1;

pub const RCC_CR2_HSI48ON: u32 = 1 << 16;
pub const RCC_CR2_HSI48RDY: u32 = 1 << 17;

pub const RCC_CFGR_SW: u32 = 0b11;
pub const RCC_CFGR_SW_HSI: u32 = 0b00;
pub const RCC_CFGR_SW_HSI48: u32 = 0b11;
pub const RCC_CFGR_SWS: u32 = 0b11 << 2;
pub const RCC_CFGR_SWS_HSI48: u32 = 0b11 << 2;
pub const RCC_CFGR_HPRE: u32 = 0xF << 4;
pub const RCC_CFGR_HPRE_DIV1: u32 = 0;
pub const RCC_CFGR_PPRE: u32 = 0x7 << 8;
pub const RCC_CFGR_PPRE_DIV1: u32 = 0;

pub const RCC_AHBENR_GPIOBEN: u32 = 1 << 18;

// GPIO port B
pub const GPIOB_BASE: u32 = 0x4800_0400;

pub const GPIO_MODER: u32 = 0x00;
pub const GPIO_OTYPER: u32 = 0x04;
pub const GPIO_OSPEEDR: u32 = 0x08;
pub const GPIO_PUPDR: u32 = 0x0C;
pub const GPIO_IDR: u32 = 0x10;
pub const GPIO_ODR: u32 = 0x14;
pub const GPIO_BSRR: u32 = 0x18;
pub const GPIO_LCKR: u32 = 0x1C;
pub const GPIO_AFRL: u32 = 0x20;
pub const GPIO_AFRH: u32 = 0x24;
pub const GPIO_BRR: u32 = 0x28;

pub const GPIO_MODER_OUTPUT: u32 = 0b01;

// SysTick (Cortex-M0 private peripheral bus)
pub const SYST_BASE: u32 = 0xE000_E010;
pub const SYST_CSR: u32 = SYST_BASE;
pub const SYST_RVR: u32 = SYST_BASE + 0x04;
pub const SYST_CVR: u32 = SYST_BASE + 0x08;
pub const SYST_CALIB: u32 = SYST_BASE + 0x0C;

pub const SYST_CSR_ENABLE: u32 = 1 << 0;
pub const SYST_CSR_TICKINT: u32 = 1 << 1;
pub const SYST_CSR_CLKSOURCE: u32 = 1 << 2;
pub const SYST_CSR_COUNTFLAG: u32 = 1 << 16;

/// The reload register is 24 bits wide.
pub const SYST_RVR_MAX: u32 = 0x00FF_FFFF;

// System control block
pub const SCB_BASE: u32 = 0xE000_ED00;
pub const SCB_SHPR3: u32 = SCB_BASE + 0x20;

/// The F0 implements two priority bits, left aligned in each byte.
pub const NVIC_PRIO_BITS: u32 = 2;

/// Exception number of SysTick in the vector table.
pub const SYSTICK_EXCEPTION: u32 = 15;
