// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod board;
pub mod bus;
pub mod peripherals;
pub mod trace;

use std::any::Any;

pub use board::{Board, BoardSnapshot, PinEdge, RunSummary, TickHandler};
pub use bus::{BusFault, SystemBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, serde::Serialize)]
pub enum SimulationError {
    #[error("Unmapped register access at {0:#010x}")]
    Unmapped(u32),
    #[error("Misaligned register access at {0:#010x}")]
    Misaligned(u32),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing bus and exception activity.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_register_read(&self, _addr: u32, _value: u32) {}
    fn on_register_write(&self, _addr: u32, _value: u32) {}
    fn on_exception(&self, _exception: u32, _cycle: u64) {}
}

/// Trait representing a memory-mapped peripheral, addressed in whole words.
///
/// `read` takes `&self`; models whose status bits evolve with polling keep
/// that state in `Cell`s.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u32) -> SimResult<u32>;
    fn write(&mut self, offset: u32, value: u32) -> SimResult<()>;

    /// Core clock cycles until this peripheral next raises its interrupt, if ever.
    fn cycles_until_event(&self) -> Option<u64> {
        None
    }

    /// Advances the peripheral by `cycles` core clock cycles and returns how
    /// many interrupt requests it raised.
    fn advance(&mut self, _cycles: u64) -> u64 {
        0
    }

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
