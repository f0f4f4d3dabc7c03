// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{BusFault, SystemBus};
use f0blink_config::{OscillatorConfig, SimulationManifest};
use f0blink_core::board::{configure_led_output, LED};
use f0blink_core::regs::SYSTICK_EXCEPTION;
use f0blink_core::{ClockError, Clocks, Level, OutputPin, WaitPolicy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Handler registered for the SysTick exception.
pub trait TickHandler {
    fn on_tick(&mut self, bus: &mut SystemBus);
}

impl<F> TickHandler for F
where
    F: FnMut(&mut SystemBus),
{
    fn on_tick(&mut self, bus: &mut SystemBus) {
        self(bus)
    }
}

/// A level change observed on the probed pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinEdge {
    pub cycle: u64,
    pub high: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub cycles: u64,
    pub ticks: u64,
    pub toggles: u64,
    pub elapsed_secs: f64,
    /// Full square-wave periods per second on the probed pin.
    pub observed_frequency_hz: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub total_cycles: u64,
    pub ticks: u64,
    pub sysclk_hz: u32,
    pub hclk_hz: u32,
    pub probe_high: bool,
    pub peripherals: BTreeMap<String, serde_json::Value>,
    pub faults: Vec<BusFault>,
}

/// NUCLEO-F042K6 on the simulated bus, with the LED pin probed.
///
/// Time only advances inside [`Board::run_for`]; register polling during
/// clock configuration is modelled in polls, not cycles.
pub struct Board {
    bus: SystemBus,
    probe: OutputPin,
    total_cycles: u64,
    ticks: u64,
    probe_level: Level,
    waveform: Vec<PinEdge>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(&OscillatorConfig::default())
    }
}

impl Board {
    pub fn new(oscillator: &OscillatorConfig) -> Self {
        Self {
            bus: SystemBus::new(oscillator),
            probe: LED,
            total_cycles: 0,
            ticks: 0,
            probe_level: Level::Low,
            waveform: Vec::new(),
        }
    }

    pub fn from_manifest(manifest: &SimulationManifest) -> Self {
        tracing::info!("Building board '{}'", manifest.name);
        Self::new(&manifest.oscillator)
    }

    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn waveform(&self) -> &[PinEdge] {
        &self.waveform
    }

    /// Runs the clock bring-up against the simulated registers.
    pub fn configure_clocks(&mut self, policy: WaitPolicy) -> Result<Clocks, ClockError> {
        let clocks = f0blink_core::configure(&mut self.bus, policy)?;
        tracing::info!(
            "Clocks configured: SYSCLK {} Hz, SysTick {} Hz",
            self.bus.sysclk_hz(),
            clocks.tick_rate_hz
        );
        Ok(clocks)
    }

    pub fn configure_led(&mut self) {
        configure_led_output(&mut self.bus);
    }

    /// Advances simulated time by `duration` at the current HCLK, invoking
    /// `handler` once per SysTick exception.
    pub fn run_for(&mut self, duration: Duration, handler: &mut dyn TickHandler) -> RunSummary {
        let hclk = u128::from(self.bus.hclk_hz());
        let budget = (duration.as_nanos() * hclk / 1_000_000_000) as u64;
        let start_ticks = self.ticks;
        let start_edges = self.waveform.len();

        tracing::debug!("Running {:?} ({} cycles at {} Hz)", duration, budget, hclk);

        let mut remaining = budget;
        while remaining > 0 {
            let step = self
                .bus
                .next_event_in()
                .map_or(remaining, |next| next.min(remaining));
            let exceptions = self.bus.advance(step);
            self.total_cycles += step;
            remaining -= step;

            for exception in exceptions {
                self.dispatch(exception, handler);
            }
        }

        let toggles = (self.waveform.len() - start_edges) as u64;
        let elapsed_secs = duration.as_secs_f64();
        let observed_frequency_hz = if elapsed_secs > 0.0 {
            toggles as f64 / 2.0 / elapsed_secs
        } else {
            0.0
        };

        RunSummary {
            cycles: budget,
            ticks: self.ticks - start_ticks,
            toggles,
            elapsed_secs,
            observed_frequency_hz,
        }
    }

    fn dispatch(&mut self, exception: u32, handler: &mut dyn TickHandler) {
        for observer in &self.bus.observers {
            observer.on_exception(exception, self.total_cycles);
        }
        if exception != SYSTICK_EXCEPTION {
            tracing::warn!("No handler for exception {}", exception);
            return;
        }

        self.ticks += 1;
        handler.on_tick(&mut self.bus);
        self.sample_probe();
    }

    fn sample_probe(&mut self) {
        let Some(gpio) = self.bus.gpiob() else {
            return;
        };
        let level = gpio.output_level(self.probe.index());
        if level != self.probe_level {
            tracing::debug!(
                "PB{} -> {:?} at cycle {}",
                self.probe.index(),
                level,
                self.total_cycles
            );
            self.probe_level = level;
            self.waveform.push(PinEdge {
                cycle: self.total_cycles,
                high: level.is_high(),
            });
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            total_cycles: self.total_cycles,
            ticks: self.ticks,
            sysclk_hz: self.bus.sysclk_hz(),
            hclk_hz: self.bus.hclk_hz(),
            probe_high: self.probe_level.is_high(),
            peripherals: self
                .bus
                .peripherals
                .iter()
                .map(|p| (p.name.clone(), p.dev.snapshot()))
                .collect(),
            faults: self.bus.faults().to_vec(),
        }
    }
}
