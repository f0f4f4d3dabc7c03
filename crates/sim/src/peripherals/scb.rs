// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;

/// System Control Block (SCB), the subset present on a Cortex-M0.
#[derive(Debug, serde::Serialize)]
pub struct Scb {
    pub cpuid: u32,
    pub icsr: u32,
    pub aircr: u32,
    pub scr: u32,
    pub ccr: u32,
    pub shpr2: u32,
    pub shpr3: u32,
}

impl Default for Scb {
    fn default() -> Self {
        Self::new()
    }
}

impl Scb {
    pub fn new() -> Self {
        Self {
            cpuid: 0x410C_C200, // Cortex-M0 r0p0
            icsr: 0,
            aircr: 0xFA05_0000,
            scr: 0,
            ccr: 0x0000_0204,
            shpr2: 0,
            shpr3: 0,
        }
    }

    /// Priority byte of the SysTick exception.
    pub fn systick_priority(&self) -> u8 {
        (self.shpr3 >> 24) as u8
    }

    fn read_reg(&self, offset: u32) -> u32 {
        match offset {
            0x00 => self.cpuid,
            0x04 => self.icsr,
            0x0C => self.aircr,
            0x10 => self.scr,
            0x14 => self.ccr,
            0x1C => self.shpr2,
            0x20 => self.shpr3,
            _ => 0,
        }
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        match offset {
            0x04 => self.icsr = value,
            0x0C => self.aircr = 0xFA05_0000 | (value & 0x0000_FFFF),
            0x10 => self.scr = value,
            // Only the implemented priority bits stick.
            0x1C => self.shpr2 = value & 0xC000_0000,
            0x20 => self.shpr3 = value & 0xC0C0_0000,
            _ => {}
        }
    }
}

impl crate::Peripheral for Scb {
    fn read(&self, offset: u32) -> SimResult<u32> {
        Ok(self.read_reg(offset))
    }

    fn write(&mut self, offset: u32, value: u32) -> SimResult<()> {
        self.write_reg(offset, value);
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
