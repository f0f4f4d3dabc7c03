// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::regs::GPIO_BSRR;
use crate::RegisterAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// One pin of a GPIO port, addressed by port base and pin index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPin {
    port: u32,
    index: u8,
}

impl OutputPin {
    pub const fn new(port: u32, index: u8) -> Self {
        Self { port, index }
    }

    pub const fn port(&self) -> u32 {
        self.port
    }

    pub const fn index(&self) -> u8 {
        self.index
    }

    pub const fn mask(&self) -> u32 {
        1 << self.index
    }

    /// BSRR word that drives this pin to `level`: the low half sets, the high half resets.
    pub const fn bsrr_word(&self, level: Level) -> u32 {
        match level {
            Level::High => self.mask(),
            Level::Low => self.mask() << 16,
        }
    }

    /// Drives the pin with a single BSRR store, so no read-modify-write of ODR
    /// can race with other writers of the port.
    pub fn set<R: RegisterAccess>(&self, regs: &mut R, level: Level) {
        regs.write(self.port + GPIO_BSRR, self.bsrr_word(level));
    }
}

/// Tick counter and output state driven from the SysTick exception.
///
/// Every `period`-th tick the output level is inverted. The counter wraps on
/// overflow; only its value modulo the period is observed.
#[derive(Debug, Clone)]
pub struct Toggler {
    pin: OutputPin,
    period: u32,
    tick_count: u32,
    level: Level,
}

impl Toggler {
    /// Panics if `period` is zero.
    pub const fn new(pin: OutputPin, period: u32) -> Self {
        assert!(period > 0, "toggle period must be non-zero");
        Self {
            pin,
            period,
            tick_count: 0,
            level: Level::Low,
        }
    }

    pub fn pin(&self) -> OutputPin {
        self.pin
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Tick handler body. Runs in interrupt context: constant time, no waiting.
    pub fn on_tick<R: RegisterAccess>(&mut self, regs: &mut R) {
        self.tick_count = self.tick_count.wrapping_add(1);
        if self.tick_count % self.period == 0 {
            self.level = self.level.toggled();
            self.pin.set(regs, self.level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{LED, TOGGLE_PERIOD_TICKS};
    use crate::fake::{Access, FakeRegs};
    use crate::regs::GPIOB_BASE;

    const BSRR: u32 = GPIOB_BASE + GPIO_BSRR;

    fn run(toggler: &mut Toggler, regs: &mut FakeRegs, ticks: u32) -> Vec<Level> {
        (0..ticks)
            .map(|_| {
                toggler.on_tick(regs);
                toggler.level()
            })
            .collect()
    }

    #[test]
    fn test_bsrr_words() {
        assert_eq!(LED.bsrr_word(Level::High), 1 << 3);
        assert_eq!(LED.bsrr_word(Level::Low), 1 << 19);
    }

    #[test]
    fn test_flips_only_on_period_multiples() {
        let mut toggler = Toggler::new(LED, TOGGLE_PERIOD_TICKS);
        let mut regs = FakeRegs::default();
        let levels = run(&mut toggler, &mut regs, 3_500);

        let flips: Vec<u32> = (1..levels.len())
            .filter(|&i| levels[i] != levels[i - 1])
            .map(|i| i as u32 + 1)
            .collect();
        assert_eq!(flips, vec![1_000, 2_000, 3_000]);
        assert_eq!(levels[998], Level::Low);
        assert_eq!(levels[999], Level::High);
    }

    #[test]
    fn test_two_thousand_ticks_toggle_twice() {
        let mut toggler = Toggler::new(LED, TOGGLE_PERIOD_TICKS);
        let mut regs = FakeRegs::default();
        run(&mut toggler, &mut regs, 2_000);

        assert_eq!(regs.writes_to(BSRR), vec![1 << 3, 1 << 19]);
        assert_eq!(toggler.tick_count(), 2_000);
        assert_eq!(toggler.level(), Level::Low);
    }

    #[test]
    fn test_toggle_count_is_floor_of_ticks_over_period() {
        for ticks in [0u32, 1, 999, 1_000, 1_001, 4_999, 5_000, 12_345] {
            let mut toggler = Toggler::new(LED, TOGGLE_PERIOD_TICKS);
            let mut regs = FakeRegs::default();
            run(&mut toggler, &mut regs, ticks);
            assert_eq!(
                regs.writes_to(BSRR).len() as u32,
                ticks / TOGGLE_PERIOD_TICKS,
                "ticks = {}",
                ticks
            );
        }
    }

    #[test]
    fn test_level_is_periodic() {
        let mut toggler = Toggler::new(LED, TOGGLE_PERIOD_TICKS);
        let mut regs = FakeRegs::default();
        let levels = run(&mut toggler, &mut regs, 6_000);

        // Period in ticks of the output waveform is two toggle periods.
        for t in 2_000..levels.len() {
            assert_eq!(levels[t], levels[t - 2_000], "tick {}", t + 1);
        }
        for t in 1_000..levels.len() {
            assert_ne!(levels[t], levels[t - 1_000], "tick {}", t + 1);
        }

        // Whether a tick flips the pin repeats every toggle period.
        let flipped = |t: usize| levels[t] != levels[t - 1];
        for t in 1_001..levels.len() {
            assert_eq!(flipped(t), flipped(t - 1_000), "tick {}", t + 1);
        }
    }

    #[test]
    fn test_only_writes_bsrr() {
        let mut toggler = Toggler::new(LED, 10);
        let mut regs = FakeRegs::default();
        run(&mut toggler, &mut regs, 100);

        assert!(regs
            .log
            .iter()
            .all(|a| matches!(a, Access::Write(addr, _) if *addr == BSRR)));
        assert_eq!(regs.log.len(), 10);
    }

    #[test]
    fn test_counter_wraps() {
        let mut toggler = Toggler::new(LED, 4);
        toggler.tick_count = u32::MAX;
        let mut regs = FakeRegs::default();

        toggler.on_tick(&mut regs);
        assert_eq!(toggler.tick_count(), 0);
        assert_eq!(toggler.level(), Level::High);
    }
}
