// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use f0blink_core::board::{RESET_SYSCLK_HZ, SYSCLK_HZ};
use f0blink_core::regs::{
    RCC_CFGR_HPRE, RCC_CFGR_SW, RCC_CFGR_SWS, RCC_CFGR_SW_HSI, RCC_CFGR_SW_HSI48,
    RCC_CR2_HSI48ON, RCC_CR2_HSI48RDY, RCC_CR_HSION, RCC_CR_HSIRDY,
};
use std::cell::Cell;

const CR: u32 = 0x00;
const CFGR: u32 = 0x04;
const AHBENR: u32 = 0x14;
const APB2ENR: u32 = 0x18;
const APB1ENR: u32 = 0x1C;
const CR2: u32 = 0x34;

/// AHBENR reset value: SRAM and FLITF clocks enabled.
const AHBENR_RESET: u32 = 0x0000_0014;

/// STM32F0 reset and clock control, reduced to the HSI/HSI48 clock path.
///
/// HSI48RDY rises on the `hsi48_ready_polls`-th read of CR2 after HSI48ON is
/// set (never, if `None`). SWS follows SW after `switch_polls` reads of CFGR,
/// and only once the selected oscillator is ready, as on the silicon.
#[derive(Debug, serde::Serialize)]
pub struct Rcc {
    cr: u32,
    cfgr: u32,
    ahbenr: u32,
    apb2enr: u32,
    apb1enr: u32,
    cr2: u32,
    sws: Cell<u32>,
    hsi48_ready: Cell<bool>,
    hsi48_ready_polls: Option<u32>,
    switch_polls: u32,
    #[serde(skip)]
    hsi48_polls: Cell<u32>,
    #[serde(skip)]
    pending_switch_polls: Cell<u32>,
}

impl Rcc {
    pub fn new(hsi48_ready_polls: Option<u32>, switch_polls: u32) -> Self {
        Self {
            cr: RCC_CR_HSION | RCC_CR_HSIRDY,
            cfgr: 0,
            ahbenr: AHBENR_RESET,
            apb2enr: 0,
            apb1enr: 0,
            cr2: 0,
            sws: Cell::new(RCC_CFGR_SW_HSI << 2),
            hsi48_ready: Cell::new(false),
            hsi48_ready_polls,
            switch_polls: switch_polls.max(1),
            hsi48_polls: Cell::new(0),
            pending_switch_polls: Cell::new(0),
        }
    }

    pub fn hsi48_ready(&self) -> bool {
        self.hsi48_ready.get()
    }

    /// Clock source currently driving SYSCLK, as encoded in CFGR.SW.
    pub fn active_source(&self) -> u32 {
        self.sws.get() >> 2
    }

    pub fn sysclk_hz(&self) -> u32 {
        match self.active_source() {
            RCC_CFGR_SW_HSI48 => SYSCLK_HZ,
            _ => RESET_SYSCLK_HZ,
        }
    }

    pub fn hclk_hz(&self) -> u32 {
        let hpre = (self.cfgr & RCC_CFGR_HPRE) >> 4;
        let shift = match hpre {
            0b1000 => 1,
            0b1001 => 2,
            0b1010 => 3,
            0b1011 => 4,
            0b1100 => 6,
            0b1101 => 7,
            0b1110 => 8,
            0b1111 => 9,
            _ => 0,
        };
        self.sysclk_hz() >> shift
    }

    pub fn ahbenr(&self) -> u32 {
        self.ahbenr
    }

    fn source_ready(&self, sw: u32) -> bool {
        match sw {
            RCC_CFGR_SW_HSI => true,
            RCC_CFGR_SW_HSI48 => self.hsi48_ready.get(),
            // HSE and PLL are not modelled and never come up.
            _ => false,
        }
    }

    fn read_cr2(&self) -> u32 {
        if self.cr2 & RCC_CR2_HSI48ON != 0 && !self.hsi48_ready.get() {
            let polls = self.hsi48_polls.get() + 1;
            self.hsi48_polls.set(polls);
            if matches!(self.hsi48_ready_polls, Some(n) if polls >= n) {
                self.hsi48_ready.set(true);
                tracing::debug!("RCC: HSI48 ready after {} polls", polls);
            }
        }
        let rdy = if self.hsi48_ready.get() {
            RCC_CR2_HSI48RDY
        } else {
            0
        };
        (self.cr2 & !RCC_CR2_HSI48RDY) | rdy
    }

    fn read_cfgr(&self) -> u32 {
        let requested = self.cfgr & RCC_CFGR_SW;
        if self.active_source() != requested && self.source_ready(requested) {
            let polls = self.pending_switch_polls.get() + 1;
            if polls >= self.switch_polls {
                self.sws.set(requested << 2);
                self.pending_switch_polls.set(0);
                tracing::debug!("RCC: SYSCLK switched to source {:#b}", requested);
            } else {
                self.pending_switch_polls.set(polls);
            }
        }
        (self.cfgr & !RCC_CFGR_SWS) | self.sws.get()
    }

    fn write_cr2(&mut self, value: u32) {
        self.cr2 = value & !RCC_CR2_HSI48RDY;
        if value & RCC_CR2_HSI48ON == 0 {
            if self.active_source() == RCC_CFGR_SW_HSI48 {
                // The hardware refuses to stop the oscillator feeding SYSCLK.
                self.cr2 |= RCC_CR2_HSI48ON;
                return;
            }
            self.hsi48_ready.set(false);
            self.hsi48_polls.set(0);
        }
    }
}

impl crate::Peripheral for Rcc {
    fn read(&self, offset: u32) -> SimResult<u32> {
        Ok(match offset {
            CR => self.cr,
            CFGR => self.read_cfgr(),
            AHBENR => self.ahbenr,
            APB2ENR => self.apb2enr,
            APB1ENR => self.apb1enr,
            CR2 => self.read_cr2(),
            _ => 0,
        })
    }

    fn write(&mut self, offset: u32, value: u32) -> SimResult<()> {
        match offset {
            CR => self.cr = value | RCC_CR_HSIRDY,
            CFGR => {
                self.cfgr = value & !RCC_CFGR_SWS;
                self.pending_switch_polls.set(0);
            }
            AHBENR => self.ahbenr = value,
            APB2ENR => self.apb2enr = value,
            APB1ENR => self.apb1enr = value,
            CR2 => self.write_cr2(value),
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
