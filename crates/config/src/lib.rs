// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use f0blink_core::WaitPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default schema version for YAML manifests
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_name() -> String {
    "nucleo-f042k6".to_string()
}

fn default_duration_ms() -> u64 {
    10_000
}

fn default_hsi48_ready_polls() -> Option<u32> {
    Some(5)
}

fn default_one() -> u32 {
    1
}

fn default_max_polls() -> u32 {
    100_000
}

/// How the simulated oscillators and status fields respond to polling.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OscillatorConfig {
    /// Poll of `RCC_CR2` on which HSI48RDY rises. `null` keeps it low forever.
    #[serde(default = "default_hsi48_ready_polls")]
    pub hsi48_ready_polls: Option<u32>,
    /// Reads of `FLASH_ACR` before a new LATENCY value reads back.
    #[serde(default = "default_one")]
    pub flash_latch_polls: u32,
    /// Reads of `RCC_CFGR` before SWS reflects a new SW selection.
    #[serde(default = "default_one")]
    pub clock_switch_polls: u32,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            hsi48_ready_polls: default_hsi48_ready_polls(),
            flash_latch_polls: default_one(),
            clock_switch_polls: default_one(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaitPolicyKind {
    #[default]
    Forever,
    Bounded,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    #[serde(default)]
    pub policy: WaitPolicyKind,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            policy: WaitPolicyKind::default(),
            max_polls: default_max_polls(),
        }
    }
}

impl WaitConfig {
    pub fn to_policy(&self) -> WaitPolicy {
        match self.policy {
            WaitPolicyKind::Forever => WaitPolicy::Forever,
            WaitPolicyKind::Bounded => WaitPolicy::Bounded {
                max_polls: self.max_polls,
            },
        }
    }
}

/// Simulation run description.
///
/// Board constants (48 MHz SYSCLK, 1 kHz tick, 1000-tick toggle period, PB3)
/// are fixed in `f0blink-core`; only the simulated hardware behaviour and
/// the run length are configurable here.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SimulationManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default)]
    pub oscillator: OscillatorConfig,
    #[serde(default)]
    pub wait: WaitConfig,
}

impl Default for SimulationManifest {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: default_name(),
            duration_ms: default_duration_ms(),
            oscillator: OscillatorConfig::default(),
            wait: WaitConfig::default(),
        }
    }
}

impl SimulationManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read simulation manifest at {:?}", path))?;
        let manifest: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse simulation manifest {:?}", path))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.duration_ms == 0 {
            anyhow::bail!("'duration_ms' must be greater than zero");
        }

        if self.oscillator.hsi48_ready_polls == Some(0) {
            anyhow::bail!("'oscillator.hsi48_ready_polls' must be greater than zero or null");
        }
        if self.oscillator.flash_latch_polls == 0 {
            anyhow::bail!("'oscillator.flash_latch_polls' must be greater than zero");
        }
        if self.oscillator.clock_switch_polls == 0 {
            anyhow::bail!("'oscillator.clock_switch_polls' must be greater than zero");
        }

        match self.wait.policy {
            WaitPolicyKind::Bounded if self.wait.max_polls == 0 => {
                anyhow::bail!("'wait.max_polls' must be greater than zero for a bounded policy");
            }
            WaitPolicyKind::Forever if self.oscillator.hsi48_ready_polls.is_none() => {
                anyhow::bail!(
                    "An oscillator that never becomes ready needs 'wait.policy: bounded'; \
                     the unbounded wait would never return"
                );
            }
            _ => {}
        }

        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}
