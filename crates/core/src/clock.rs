// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Clock tree bring-up: HSI (8 MHz) to HSI48 with matching flash latency,
//! followed by the SysTick time base.

use crate::board::{SYSCLK_HZ, TICK_RATE_HZ};
use crate::regs::*;
use crate::RegisterAccess;
use core::fmt;

/// How long a status poll may spin before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Spin until the hardware reports the expected state, however long that takes.
    #[default]
    Forever,
    /// Give up after `max_polls` reads and report [`ClockError::Timeout`].
    Bounded { max_polls: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStep {
    FlashLatency,
    Hsi48Ready,
    ClockSwitch,
}

impl fmt::Display for ClockStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClockStep::FlashLatency => "flash latency readback",
            ClockStep::Hsi48Ready => "HSI48 ready",
            ClockStep::ClockSwitch => "SYSCLK switch to HSI48",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("{step} did not complete after {polls} polls")]
    Timeout { step: ClockStep, polls: u32 },
    #[error("SysTick reload {reload:#x} does not fit the 24-bit counter")]
    ReloadOutOfRange { reload: u32 },
}

/// Frozen clock frequencies, recorded once configuration completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clocks {
    pub sysclk_hz: u32,
    pub hclk_hz: u32,
    pub pclk_hz: u32,
    pub tick_rate_hz: u32,
}

impl Clocks {
    /// Core clock cycles between two SysTick exceptions.
    pub fn tick_period_cycles(&self) -> u32 {
        self.hclk_hz / self.tick_rate_hz
    }
}

/// Flash wait states needed at `sysclk_hz` (RM0091 3.5.1).
pub const fn flash_wait_states(sysclk_hz: u32) -> u32 {
    if sysclk_hz <= 24_000_000 {
        0
    } else {
        1
    }
}

/// Polls `ready` until it returns true or the policy runs out.
///
/// Returns the number of polls it took, counting the successful one.
pub fn wait_until<F>(policy: WaitPolicy, step: ClockStep, mut ready: F) -> Result<u32, ClockError>
where
    F: FnMut() -> bool,
{
    let mut polls: u32 = 0;
    loop {
        polls = polls.saturating_add(1);
        if ready() {
            return Ok(polls);
        }
        if let WaitPolicy::Bounded { max_polls } = policy {
            if polls >= max_polls {
                return Err(ClockError::Timeout { step, polls });
            }
        }
        core::hint::spin_loop();
    }
}

/// Brings SYSCLK to 48 MHz on HSI48 and starts a 1 kHz SysTick.
///
/// Each step's hardware effect is a precondition of the next one, so the
/// order below must not change: the flash latency has to be latched before
/// the core clock goes above 24 MHz, and SW may only select HSI48 once the
/// oscillator reports ready.
///
/// With [`WaitPolicy::Forever`] this only returns once every status bit has
/// flipped; a dead oscillator hangs here.
pub fn configure<R: RegisterAccess>(regs: &mut R, policy: WaitPolicy) -> Result<Clocks, ClockError> {
    set_flash_latency(regs, policy, flash_wait_states(SYSCLK_HZ))?;
    enable_hsi48(regs, policy)?;
    select_hsi48(regs, policy)?;
    start_systick(regs, SYSCLK_HZ / TICK_RATE_HZ)?;

    Ok(Clocks {
        sysclk_hz: SYSCLK_HZ,
        hclk_hz: SYSCLK_HZ,
        pclk_hz: SYSCLK_HZ,
        tick_rate_hz: TICK_RATE_HZ,
    })
}

fn set_flash_latency<R: RegisterAccess>(
    regs: &mut R,
    policy: WaitPolicy,
    wait_states: u32,
) -> Result<(), ClockError> {
    regs.modify(FLASH_ACR, FLASH_ACR_LATENCY, wait_states & FLASH_ACR_LATENCY);
    wait_until(policy, ClockStep::FlashLatency, || {
        regs.read(FLASH_ACR) & FLASH_ACR_LATENCY == wait_states
    })?;
    Ok(())
}

fn enable_hsi48<R: RegisterAccess>(regs: &mut R, policy: WaitPolicy) -> Result<(), ClockError> {
    regs.modify(RCC_CR2, 0, RCC_CR2_HSI48ON);
    wait_until(policy, ClockStep::Hsi48Ready, || {
        regs.read(RCC_CR2) & RCC_CR2_HSI48RDY != 0
    })?;
    Ok(())
}

fn select_hsi48<R: RegisterAccess>(regs: &mut R, policy: WaitPolicy) -> Result<(), ClockError> {
    regs.modify(
        RCC_CFGR,
        RCC_CFGR_HPRE | RCC_CFGR_PPRE | RCC_CFGR_SW,
        RCC_CFGR_HPRE_DIV1 | RCC_CFGR_PPRE_DIV1 | RCC_CFGR_SW_HSI48,
    );
    wait_until(policy, ClockStep::ClockSwitch, || {
        regs.read(RCC_CFGR) & RCC_CFGR_SWS == RCC_CFGR_SWS_HSI48
    })?;
    Ok(())
}

/// Same register sequence as CMSIS `SysTick_Config`: reload, lowest
/// priority, clear the counter, then enable.
fn start_systick<R: RegisterAccess>(regs: &mut R, ticks: u32) -> Result<(), ClockError> {
    let reload = ticks.wrapping_sub(1);
    if ticks == 0 || reload > SYST_RVR_MAX {
        return Err(ClockError::ReloadOutOfRange { reload });
    }

    let lowest = ((1 << NVIC_PRIO_BITS) - 1) << (8 - NVIC_PRIO_BITS);

    regs.write(SYST_RVR, reload);
    regs.modify(SCB_SHPR3, 0xFF << 24, lowest << 24);
    regs.write(SYST_CVR, 0);
    regs.write(
        SYST_CSR,
        SYST_CSR_CLKSOURCE | SYST_CSR_TICKINT | SYST_CSR_ENABLE,
    );
    Ok(())
}
