// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use f0blink_core::regs::{
    GPIO_AFRH, GPIO_AFRL, GPIO_BRR, GPIO_BSRR, GPIO_IDR, GPIO_LCKR, GPIO_MODER, GPIO_ODR,
    GPIO_OSPEEDR, GPIO_OTYPER, GPIO_PUPDR,
};
use f0blink_core::Level;

/// STM32F0 GPIO port.
#[derive(Debug, Default, serde::Serialize)]
pub struct GpioPort {
    moder: u32,   // 0x00: mode register
    otyper: u32,  // 0x04: output type register
    ospeedr: u32, // 0x08: output speed register
    pupdr: u32,   // 0x0C: pull-up/pull-down register
    idr: u32,     // 0x10: input data register
    odr: u32,     // 0x14: output data register
    lckr: u32,    // 0x1C: configuration lock register
    afrl: u32,    // 0x20: alternate function low register
    afrh: u32,    // 0x24: alternate function high register
}

impl GpioPort {
    /// Port B resets with every pin as a floating input.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn odr(&self) -> u32 {
        self.odr
    }

    pub fn output_level(&self, pin: u8) -> Level {
        Level::from(self.odr & (1 << pin) != 0)
    }

    /// Two-bit MODER field of `pin`.
    pub fn mode(&self, pin: u8) -> u32 {
        (self.moder >> (u32::from(pin) * 2)) & 0b11
    }

    fn read_reg(&self, offset: u32) -> u32 {
        match offset {
            GPIO_MODER => self.moder,
            GPIO_OTYPER => self.otyper,
            GPIO_OSPEEDR => self.ospeedr,
            GPIO_PUPDR => self.pupdr,
            GPIO_IDR => self.idr,
            GPIO_ODR => self.odr,
            GPIO_LCKR => self.lckr,
            GPIO_AFRL => self.afrl,
            GPIO_AFRH => self.afrh,
            // BSRR and BRR are write-only.
            _ => 0,
        }
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        match offset {
            GPIO_MODER => self.moder = value,
            GPIO_OTYPER => self.otyper = value & 0xFFFF,
            GPIO_OSPEEDR => self.ospeedr = value,
            GPIO_PUPDR => self.pupdr = value,
            GPIO_ODR => self.odr = value & 0xFFFF,
            GPIO_BSRR => {
                // Lower 16 bits set, upper 16 bits reset; set wins.
                let set = value & 0xFFFF;
                let reset = (value >> 16) & 0xFFFF;
                self.odr &= !reset;
                self.odr |= set;
            }
            GPIO_LCKR => self.lckr = value,
            GPIO_AFRL => self.afrl = value,
            GPIO_AFRH => self.afrh = value,
            GPIO_BRR => {
                let reset = value & 0xFFFF;
                self.odr &= !reset;
            }
            _ => {}
        }
        // Output pins read back their driven level.
        self.idr = self.odr;
    }
}

impl crate::Peripheral for GpioPort {
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

#[cfg(test)]
mod tests {
    use super::GpioPort;
    use crate::Peripheral;
    use f0blink_core::Level;

    #[test]
    fn test_gpio_reset_values() {
        let gpio = GpioPort::new();
        assert_eq!(gpio.read(0x00).unwrap(), 0);
        assert_eq!(gpio.odr(), 0);
    }

    #[test]
    fn test_gpio_moder_and_odr() {
        let mut gpio = GpioPort::new();
        gpio.write(0x00, 0x0000_0040).unwrap();
        assert_eq!(gpio.mode(3), 0b01);

        gpio.write(0x14, 0x1234).unwrap();
        assert_eq!(gpio.read(0x14).unwrap(), 0x1234);
    }

    #[test]
    fn test_gpio_bsrr_set_and_reset() {
        let mut gpio = GpioPort::new();

        // Set pin 3.
        gpio.write(0x18, 1 << 3).unwrap();
        assert_eq!(gpio.output_level(3), Level::High);

        // Reset pin 3.
        gpio.write(0x18, 1 << 19).unwrap();
        assert_eq!(gpio.output_level(3), Level::Low);
        assert_eq!(gpio.odr(), 0);
    }

    #[test]
    fn test_gpio_bsrr_set_wins() {
        let mut gpio = GpioPort::new();
        gpio.write(0x18, (1 << 19) | (1 << 3)).unwrap();
        assert_eq!(gpio.output_level(3), Level::High);
    }

    #[test]
    fn test_gpio_bsrr_leaves_other_pins() {
        let mut gpio = GpioPort::new();
        gpio.write(0x14, 0x00F0).unwrap();
        gpio.write(0x18, 1 << 3).unwrap();
        assert_eq!(gpio.odr(), 0x00F8);
    }

    #[test]
    fn test_gpio_brr() {
        let mut gpio = GpioPort::new();
        gpio.write(0x14, 0xFFFF).unwrap();
        gpio.write(0x28, 0x0001).unwrap();
        assert_eq!(gpio.odr(), 0xFFFE);
        assert_eq!(gpio.read(0x28).unwrap(), 0);
    }
}
