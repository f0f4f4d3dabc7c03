// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationObserver;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceEvent {
    Read { addr: u32, value: u32 },
    Write { addr: u32, value: u32 },
    Exception { number: u32, cycle: u64 },
}

impl TraceEvent {
    pub fn is_read_of(&self, at: u32) -> bool {
        matches!(*self, TraceEvent::Read { addr, .. } if addr == at)
    }

    pub fn is_write_to(&self, at: u32) -> bool {
        matches!(*self, TraceEvent::Write { addr, .. } if addr == at)
    }

    pub fn value(&self) -> Option<u32> {
        match *self {
            TraceEvent::Read { value, .. } | TraceEvent::Write { value, .. } => Some(value),
            TraceEvent::Exception { .. } => None,
        }
    }
}

/// Observer that keeps every bus access and exception in order.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    events: Mutex<Vec<TraceEvent>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Index of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&TraceEvent) -> bool) -> Option<usize> {
        self.events
            .lock()
            .ok()
            .and_then(|events| events.iter().position(pred))
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn push(&self, event: TraceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl SimulationObserver for TraceRecorder {
    fn on_register_read(&self, addr: u32, value: u32) {
        self.push(TraceEvent::Read { addr, value });
    }

    fn on_register_write(&self, addr: u32, value: u32) {
        self.push(TraceEvent::Write { addr, value });
    }

    fn on_exception(&self, number: u32, cycle: u64) {
        self.push(TraceEvent::Exception { number, cycle });
    }
}
