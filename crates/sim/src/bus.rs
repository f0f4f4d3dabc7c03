// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::flash::Flash;
use crate::peripherals::gpio::GpioPort;
use crate::peripherals::rcc::Rcc;
use crate::peripherals::scb::Scb;
use crate::peripherals::systick::Systick;
use crate::{Peripheral, SimResult, SimulationError, SimulationObserver};
use f0blink_config::OscillatorConfig;
use f0blink_core::clock::flash_wait_states;
use f0blink_core::regs::{FLASH_BASE, GPIOB_BASE, RCC_BASE, SCB_BASE, SYSTICK_EXCEPTION, SYST_BASE};
use f0blink_core::RegisterAccess;
use std::sync::Arc;

pub struct PeripheralEntry {
    pub name: String,
    pub base: u32,
    pub size: u32,
    pub irq: Option<u32>,
    pub dev: Box<dyn Peripheral>,
}

/// Conditions that would misbehave or fault on the silicon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusFault {
    #[error("{error}")]
    Access { error: SimulationError },
    #[error("SYSCLK at {sysclk_hz} Hz with {wait_states} flash wait states")]
    FlashWaitStates { sysclk_hz: u32, wait_states: u32 },
}

pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    faults: Vec<BusFault>,
    flash_violation: bool,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new(&OscillatorConfig::default())
    }
}

impl SystemBus {
    /// STM32F042 memory map with the peripherals the blinker touches.
    pub fn new(oscillator: &OscillatorConfig) -> Self {
        Self {
            peripherals: vec![
                PeripheralEntry {
                    name: "flash".to_string(),
                    base: FLASH_BASE,
                    size: 0x400,
                    irq: None,
                    dev: Box::new(Flash::new(oscillator.flash_latch_polls)),
                },
                PeripheralEntry {
                    name: "rcc".to_string(),
                    base: RCC_BASE,
                    size: 0x400,
                    irq: None,
                    dev: Box::new(Rcc::new(
                        oscillator.hsi48_ready_polls,
                        oscillator.clock_switch_polls,
                    )),
                },
                PeripheralEntry {
                    name: "gpiob".to_string(),
                    base: GPIOB_BASE,
                    size: 0x400,
                    irq: None,
                    dev: Box::new(GpioPort::new()),
                },
                PeripheralEntry {
                    name: "systick".to_string(),
                    base: SYST_BASE,
                    size: 0x10,
                    irq: Some(SYSTICK_EXCEPTION),
                    dev: Box::new(Systick::new()),
                },
                PeripheralEntry {
                    name: "scb".to_string(),
                    base: SCB_BASE,
                    size: 0x40,
                    irq: None,
                    dev: Box::new(Scb::new()),
                },
            ],
            observers: Vec::new(),
            faults: Vec::new(),
            flash_violation: false,
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    fn find(&self, addr: u32) -> SimResult<(usize, u32)> {
        if addr % 4 != 0 {
            return Err(SimulationError::Misaligned(addr));
        }
        self.peripherals
            .iter()
            .position(|p| addr >= p.base && addr - p.base < p.size)
            .map(|index| (index, addr - self.peripherals[index].base))
            .ok_or(SimulationError::Unmapped(addr))
    }

    pub fn read_u32(&self, addr: u32) -> SimResult<u32> {
        let (index, offset) = self.find(addr)?;
        let value = self.peripherals[index].dev.read(offset)?;
        for observer in &self.observers {
            observer.on_register_read(addr, value);
        }
        Ok(value)
    }

    pub fn write_u32(&mut self, addr: u32, value: u32) -> SimResult<()> {
        let (index, offset) = self.find(addr)?;
        self.peripherals[index].dev.write(offset, value)?;
        for observer in &self.observers {
            observer.on_register_write(addr, value);
        }
        Ok(())
    }

    pub fn peripheral<T: 'static>(&self, name: &str) -> Option<&T> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any())
            .and_then(|any| any.downcast_ref::<T>())
    }

    pub fn peripheral_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any_mut())
            .and_then(|any| any.downcast_mut::<T>())
    }

    pub fn rcc(&self) -> Option<&Rcc> {
        self.peripheral::<Rcc>("rcc")
    }

    pub fn gpiob(&self) -> Option<&GpioPort> {
        self.peripheral::<GpioPort>("gpiob")
    }

    pub fn sysclk_hz(&self) -> u32 {
        self.rcc().map_or(0, Rcc::sysclk_hz)
    }

    pub fn hclk_hz(&self) -> u32 {
        self.rcc().map_or(0, Rcc::hclk_hz)
    }

    pub fn flash_latency(&self) -> u32 {
        self.peripheral::<Flash>("flash").map_or(0, Flash::latency)
    }

    pub fn faults(&self) -> &[BusFault] {
        &self.faults
    }

    /// Core clock cycles until the earliest pending peripheral interrupt.
    pub fn next_event_in(&self) -> Option<u64> {
        self.peripherals
            .iter()
            .filter_map(|p| p.dev.cycles_until_event())
            .min()
    }

    /// Advances every peripheral by `cycles` and returns the exception numbers
    /// raised, in peripheral order.
    pub fn advance(&mut self, cycles: u64) -> Vec<u32> {
        let mut exceptions = Vec::new();
        for p in &mut self.peripherals {
            let raised = p.dev.advance(cycles);
            if raised == 0 {
                continue;
            }
            match p.irq {
                Some(irq) => exceptions.extend(std::iter::repeat(irq).take(raised as usize)),
                None => tracing::warn!("{} raised an interrupt with no line assigned", p.name),
            }
        }
        exceptions
    }

    fn record_fault(&mut self, fault: BusFault) {
        tracing::warn!("Bus fault: {}", fault);
        self.faults.push(fault);
    }

    /// Raising SYSCLK beyond what the programmed wait states allow corrupts
    /// instruction fetches on the silicon.
    fn check_clock_invariants(&mut self) {
        let sysclk_hz = self.sysclk_hz();
        let wait_states = self.flash_latency();
        let violation = wait_states < flash_wait_states(sysclk_hz);
        if violation && !self.flash_violation {
            self.record_fault(BusFault::FlashWaitStates {
                sysclk_hz,
                wait_states,
            });
        }
        self.flash_violation = violation;
    }
}

impl RegisterAccess for SystemBus {
    fn read(&mut self, addr: u32) -> u32 {
        let value = match self.read_u32(addr) {
            Ok(value) => value,
            Err(error) => {
                self.record_fault(BusFault::Access { error });
                0
            }
        };
        self.check_clock_invariants();
        value
    }

    fn write(&mut self, addr: u32, value: u32) {
        if let Err(error) = self.write_u32(addr, value) {
            self.record_fault(BusFault::Access { error });
        }
        self.check_clock_invariants();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use f0blink_core::regs::{GPIO_BSRR, RCC_CFGR, RCC_CR2, RCC_CR2_HSI48ON};

    #[test]
    fn test_unmapped_access_is_a_fault() {
        let mut bus = SystemBus::default();
        assert_eq!(bus.read_u32(0x6000_0000), Err(SimulationError::Unmapped(0x6000_0000)));

        assert_eq!(RegisterAccess::read(&mut bus, 0x6000_0000), 0);
        assert_eq!(
            bus.faults(),
            &[BusFault::Access {
                error: SimulationError::Unmapped(0x6000_0000)
            }]
        );
    }

    #[test]
    fn test_misaligned_access() {
        let bus = SystemBus::default();
        assert_eq!(
            bus.read_u32(GPIOB_BASE + 2),
            Err(SimulationError::Misaligned(GPIOB_BASE + 2))
        );
    }

    #[test]
    fn test_routes_to_peripheral() {
        let mut bus = SystemBus::default();
        bus.write_u32(GPIOB_BASE + GPIO_BSRR, 1 << 3).unwrap();
        assert_eq!(bus.gpiob().unwrap().odr(), 1 << 3);
    }

    #[test]
    fn test_switch_without_wait_states_is_flagged() {
        let mut bus = SystemBus::default();
        bus.write(RCC_CR2, RCC_CR2_HSI48ON);
        while bus.read(RCC_CR2) & (1 << 17) == 0 {}
        bus.write(RCC_CFGR, 0b11);
        bus.read(RCC_CFGR);

        assert_eq!(bus.sysclk_hz(), 48_000_000);
        assert_eq!(
            bus.faults(),
            &[BusFault::FlashWaitStates {
                sysclk_hz: 48_000_000,
                wait_states: 0
            }]
        );
    }

    #[test]
    fn test_idle_bus_has_no_events() {
        let mut bus = SystemBus::default();
        assert_eq!(bus.next_event_in(), None);
        assert!(bus.advance(1_000_000).is_empty());
    }
}
