// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod clock;
pub mod regs;
pub mod toggler;

pub use clock::{configure, ClockError, ClockStep, Clocks, WaitPolicy};
pub use toggler::{Level, OutputPin, Toggler};

/// Word-granular access to the memory-mapped register space.
///
/// Firmware implements this with volatile pointer accesses, the simulator
/// with its system bus. Reads take `&mut self` because status registers
/// on real silicon (and in the simulator) change between polls.
pub trait RegisterAccess {
    fn read(&mut self, addr: u32) -> u32;
    fn write(&mut self, addr: u32, value: u32);

    /// Read-modify-write: clears `clear`, then sets `set`.
    fn modify(&mut self, addr: u32, clear: u32, set: u32) {
        let value = self.read(addr);
        self.write(addr, (value & !clear) | set);
    }
}

impl<R: RegisterAccess + ?Sized> RegisterAccess for &mut R {
    fn read(&mut self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::RegisterAccess;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Access {
        Read(u32, u32),
        Write(u32, u32),
    }

    /// Plain register file with an ordered access log.
    #[derive(Debug, Default)]
    pub struct FakeRegs {
        pub values: HashMap<u32, u32>,
        pub log: Vec<Access>,
    }

    impl FakeRegs {
        pub fn writes_to(&self, addr: u32) -> Vec<u32> {
            self.log
                .iter()
                .filter_map(|a| match *a {
                    Access::Write(at, v) if at == addr => Some(v),
                    _ => None,
                })
                .collect()
        }
    }

    impl RegisterAccess for FakeRegs {
        fn read(&mut self, addr: u32) -> u32 {
            let value = self.values.get(&addr).copied().unwrap_or(0);
            self.log.push(Access::Read(addr, value));
            value
        }

        fn write(&mut self, addr: u32, value: u32) {
            self.values.insert(addr, value);
            self.log.push(Access::Write(addr, value));
        }
    }
}
