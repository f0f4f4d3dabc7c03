// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use f0blink_core::regs::{
    SYST_CSR_CLKSOURCE, SYST_CSR_COUNTFLAG, SYST_CSR_ENABLE, SYST_CSR_TICKINT, SYST_RVR_MAX,
};
use std::cell::Cell;

/// SysTick counts HCLK/8 when CLKSOURCE is clear.
const EXTERNAL_DIVIDER: u64 = 8;

/// SysTick timer.
/// Standard address: 0xE000_E010
///
/// The counter reloads from RVR on the clock after it reads zero and raises
/// the exception when it decrements from 1 to 0, so with a reload of N the
/// exception fires every N + 1 counter clocks.
#[derive(Debug, Default, serde::Serialize)]
pub struct Systick {
    csr: u32,
    rvr: u32,
    cvr: u32,
    calib: u32,
    countflag: Cell<bool>,
    /// HCLK cycles accumulated towards the next HCLK/8 counter clock.
    #[serde(skip)]
    prescale: u64,
}

impl Systick {
    pub fn new() -> Self {
        Self {
            calib: 0x4000_0000, // No reference clock, no skew
            ..Default::default()
        }
    }

    fn enabled(&self) -> bool {
        self.csr & SYST_CSR_ENABLE != 0 && self.rvr != 0
    }

    fn divider(&self) -> u64 {
        if self.csr & SYST_CSR_CLKSOURCE != 0 {
            1
        } else {
            EXTERNAL_DIVIDER
        }
    }

    /// Counter clocks until the next wrap to zero.
    fn counts_to_wrap(&self) -> u64 {
        if self.cvr == 0 {
            u64::from(self.rvr) + 1
        } else {
            u64::from(self.cvr)
        }
    }

    /// Steps the counter by `counts` counter clocks, returning the number of wraps.
    fn count(&mut self, counts: u64) -> u64 {
        if counts == 0 {
            return 0;
        }
        let period = u64::from(self.rvr) + 1;
        let first = self.counts_to_wrap();
        if counts < first {
            self.cvr = if self.cvr == 0 {
                // The first clock only reloads.
                self.rvr - (counts as u32 - 1)
            } else {
                self.cvr - counts as u32
            };
            return 0;
        }

        let rest = counts - first;
        let wraps = 1 + rest / period;
        let partial = rest % period;
        self.cvr = if partial == 0 {
            0
        } else {
            self.rvr - (partial as u32 - 1)
        };
        wraps
    }
}

impl crate::Peripheral for Systick {
    fn read(&self, offset: u32) -> SimResult<u32> {
        Ok(match offset {
            0x00 => {
                let flag = if self.countflag.replace(false) {
                    SYST_CSR_COUNTFLAG
                } else {
                    0
                };
                self.csr | flag
            }
            0x04 => self.rvr,
            0x08 => self.cvr,
            0x0C => self.calib,
            _ => 0,
        })
    }

    fn write(&mut self, offset: u32, value: u32) -> SimResult<()> {
        match offset {
            0x00 => self.csr = value & (SYST_CSR_ENABLE | SYST_CSR_TICKINT | SYST_CSR_CLKSOURCE),
            0x04 => self.rvr = value & SYST_RVR_MAX,
            0x08 => {
                // Any write clears the counter and COUNTFLAG.
                self.cvr = 0;
                self.countflag.set(false);
            }
            _ => {}
        }
        Ok(())
    }

    fn cycles_until_event(&self) -> Option<u64> {
        if !self.enabled() {
            return None;
        }
        let divider = self.divider();
        Some(self.counts_to_wrap() * divider - self.prescale)
    }

    fn advance(&mut self, cycles: u64) -> u64 {
        if !self.enabled() {
            return 0;
        }
        let divider = self.divider();
        let total = self.prescale + cycles;
        self.prescale = total % divider;

        let wraps = self.count(total / divider);
        if wraps > 0 {
            self.countflag.set(true);
        }
        if self.csr & SYST_CSR_TICKINT != 0 {
            wraps
        } else {
            0
        }
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

#[cfg(test)]
mod tests {
    use super::Systick;
    use crate::Peripheral;

    fn running(reload: u32, csr: u32) -> Systick {
        let mut systick = Systick::new();
        systick.write(0x04, reload).unwrap();
        systick.write(0x08, 0).unwrap();
        systick.write(0x00, csr).unwrap();
        systick
    }

    #[test]
    fn test_disabled_never_fires() {
        let mut systick = running(99, 0b110);
        assert_eq!(systick.cycles_until_event(), None);
        assert_eq!(systick.advance(10_000), 0);
    }

    #[test]
    fn test_period_is_reload_plus_one() {
        let mut systick = running(99, 0b111);
        assert_eq!(systick.cycles_until_event(), Some(100));

        assert_eq!(systick.advance(99), 0);
        assert_eq!(systick.cycles_until_event(), Some(1));
        assert_eq!(systick.advance(1), 1);
        assert_eq!(systick.cycles_until_event(), Some(100));
        assert_eq!(systick.advance(1_000), 10);
    }

    #[test]
    fn test_advance_matches_single_steps() {
        let mut bulk = running(6, 0b111);
        let mut single = running(6, 0b111);

        let bulk_wraps = bulk.advance(53);
        let single_wraps: u64 = (0..53).map(|_| single.advance(1)).sum();

        assert_eq!(bulk_wraps, single_wraps);
        assert_eq!(bulk.read(0x08).unwrap(), single.read(0x08).unwrap());
    }

    #[test]
    fn test_countflag_without_tickint() {
        let mut systick = running(9, 0b101);
        assert_eq!(systick.advance(10), 0);
        assert_eq!(systick.read(0x00).unwrap() >> 16, 1);
        // Cleared by the read.
        assert_eq!(systick.read(0x00).unwrap() >> 16, 0);
    }

    #[test]
    fn test_hclk_div8_clock_source() {
        let mut systick = running(9, 0b011);
        assert_eq!(systick.cycles_until_event(), Some(80));
        assert_eq!(systick.advance(79), 0);
        assert_eq!(systick.cycles_until_event(), Some(1));
        assert_eq!(systick.advance(1), 1);
    }

    #[test]
    fn test_reload_is_24_bit() {
        let mut systick = Systick::new();
        systick.write(0x04, 0xFFFF_FFFF).unwrap();
        assert_eq!(systick.read(0x04).unwrap(), 0x00FF_FFFF);
    }
}
