// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use f0blink_core::regs::FLASH_ACR_LATENCY;
use std::cell::Cell;

const ACR: u32 = 0x00;

/// Flash interface, ACR only.
///
/// A new LATENCY value becomes visible after `latch_polls` reads of ACR.
#[derive(Debug, serde::Serialize)]
pub struct Flash {
    acr: u32,
    latency: Cell<u32>,
    latch_polls: u32,
    #[serde(skip)]
    pending: Cell<Option<(u32, u32)>>,
}

impl Flash {
    pub fn new(latch_polls: u32) -> Self {
        Self {
            acr: 0,
            latency: Cell::new(0),
            latch_polls: latch_polls.max(1),
            pending: Cell::new(None),
        }
    }

    /// Wait states currently applied to flash reads.
    pub fn latency(&self) -> u32 {
        self.latency.get()
    }

    fn read_acr(&self) -> u32 {
        if let Some((target, polls)) = self.pending.get() {
            let polls = polls + 1;
            if polls >= self.latch_polls {
                self.latency.set(target);
                self.pending.set(None);
                tracing::debug!("FLASH: latency {} latched", target);
            } else {
                self.pending.set(Some((target, polls)));
            }
        }
        (self.acr & !FLASH_ACR_LATENCY) | self.latency.get()
    }
}

impl crate::Peripheral for Flash {
    fn read(&self, offset: u32) -> SimResult<u32> {
        Ok(match offset {
            ACR => self.read_acr(),
            _ => 0,
        })
    }

    fn write(&mut self, offset: u32, value: u32) -> SimResult<()> {
        if offset == ACR {
            self.acr = value;
            let target = value & FLASH_ACR_LATENCY;
            if target != self.latency.get() {
                self.pending.set(Some((target, 0)));
            } else {
                self.pending.set(None);
            }
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
