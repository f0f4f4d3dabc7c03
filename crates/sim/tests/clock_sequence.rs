// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use f0blink_config::OscillatorConfig;
use f0blink_core::regs::*;
use f0blink_core::{ClockError, ClockStep, WaitPolicy};
use f0blink_sim::peripherals::scb::Scb;
use f0blink_sim::trace::{TraceEvent, TraceRecorder};
use f0blink_sim::Board;
use std::sync::Arc;

fn traced_board(oscillator: OscillatorConfig) -> (Board, Arc<TraceRecorder>) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let mut board = Board::new(&oscillator);
    let trace = Arc::new(TraceRecorder::new());
    board.bus_mut().add_observer(trace.clone());
    (board, trace)
}

fn oscillator(hsi48_ready_polls: Option<u32>) -> OscillatorConfig {
    OscillatorConfig {
        hsi48_ready_polls,
        ..OscillatorConfig::default()
    }
}

#[test]
fn test_configure_reaches_48mhz_without_faults() {
    let (mut board, _trace) = traced_board(OscillatorConfig::default());
    let clocks = board.configure_clocks(WaitPolicy::Forever).unwrap();

    assert_eq!(clocks.sysclk_hz, 48_000_000);
    assert_eq!(board.bus().sysclk_hz(), 48_000_000);
    assert_eq!(board.bus().hclk_hz(), 48_000_000);
    assert_eq!(board.bus().flash_latency(), 1);
    assert!(board.bus().rcc().unwrap().hsi48_ready());
    assert!(board.bus().faults().is_empty(), "{:?}", board.bus().faults());

    let scb = board.bus().peripheral::<Scb>("scb").unwrap();
    assert_eq!(scb.systick_priority(), 0xC0);
}

#[test]
fn test_switch_begins_after_fifth_ready_poll() {
    let (mut board, trace) = traced_board(oscillator(Some(5)));
    board.configure_clocks(WaitPolicy::Forever).unwrap();

    let events = trace.events();
    let hsi48_on = trace
        .position(|e| e.is_write_to(RCC_CR2) && e.value().unwrap() & RCC_CR2_HSI48ON != 0)
        .unwrap();
    let ready = trace
        .position(|e| e.is_read_of(RCC_CR2) && e.value().unwrap() & RCC_CR2_HSI48RDY != 0)
        .unwrap();
    let first_cfgr = trace
        .position(|e| e.is_read_of(RCC_CFGR) || e.is_write_to(RCC_CFGR))
        .unwrap();

    let polls: Vec<&TraceEvent> = events[hsi48_on..ready + 1]
        .iter()
        .filter(|e| e.is_read_of(RCC_CR2))
        .collect();
    assert_eq!(polls.len(), 5);
    assert!(polls[..4]
        .iter()
        .all(|e| e.value().unwrap() & RCC_CR2_HSI48RDY == 0));
    assert!(ready < first_cfgr);
}

#[test]
fn test_flash_latency_latched_before_oscillator_enable() {
    let (mut board, trace) = traced_board(OscillatorConfig {
        flash_latch_polls: 4,
        ..OscillatorConfig::default()
    });
    board.configure_clocks(WaitPolicy::Forever).unwrap();

    let latency_write = trace.position(|e| e.is_write_to(FLASH_ACR)).unwrap();
    let latched = trace
        .position(|e| e.is_read_of(FLASH_ACR) && e.value().unwrap() & FLASH_ACR_LATENCY == 1)
        .unwrap();
    let hsi48_on = trace
        .position(|e| e.is_write_to(RCC_CR2) && e.value().unwrap() & RCC_CR2_HSI48ON != 0)
        .unwrap();

    assert!(latency_write < latched);
    assert!(latched < hsi48_on);

    let acr_polls = trace.events()[latency_write..latched + 1]
        .iter()
        .filter(|e| e.is_read_of(FLASH_ACR))
        .count();
    assert_eq!(acr_polls, 4);
}

#[test]
fn test_systick_programmed_after_switch_completes() {
    let (mut board, trace) = traced_board(OscillatorConfig {
        clock_switch_polls: 3,
        ..OscillatorConfig::default()
    });
    board.configure_clocks(WaitPolicy::Forever).unwrap();

    let switched = trace
        .position(|e| {
            e.is_read_of(RCC_CFGR) && e.value().unwrap() & RCC_CFGR_SWS == RCC_CFGR_SWS_HSI48
        })
        .unwrap();
    let reload = trace.position(|e| e.is_write_to(SYST_RVR)).unwrap();
    let enable = trace.position(|e| e.is_write_to(SYST_CSR)).unwrap();

    assert!(switched < reload);
    assert!(reload < enable);
    assert_eq!(
        trace.events()[enable],
        TraceEvent::Write {
            addr: SYST_CSR,
            value: SYST_CSR_CLKSOURCE | SYST_CSR_TICKINT | SYST_CSR_ENABLE
        }
    );
}

#[test]
fn test_dead_oscillator_times_out_under_bounded_policy() {
    let (mut board, trace) = traced_board(oscillator(None));
    let err = board
        .configure_clocks(WaitPolicy::Bounded { max_polls: 250 })
        .unwrap_err();

    assert_eq!(
        err,
        ClockError::Timeout {
            step: ClockStep::Hsi48Ready,
            polls: 250
        }
    );
    assert_eq!(board.bus().sysclk_hz(), 8_000_000);
    assert!(trace.position(|e| e.is_write_to(RCC_CFGR)).is_none());
    assert!(trace.position(|e| e.is_write_to(SYST_CSR)).is_none());
    assert_eq!(board.bus().next_event_in(), None);
}

#[test]
fn test_slow_switch_times_out_at_clock_switch_step() {
    let (mut board, _trace) = traced_board(OscillatorConfig {
        clock_switch_polls: 50,
        ..OscillatorConfig::default()
    });
    let err = board
        .configure_clocks(WaitPolicy::Bounded { max_polls: 10 })
        .unwrap_err();

    assert!(matches!(
        err,
        ClockError::Timeout {
            step: ClockStep::ClockSwitch,
            ..
        }
    ));
}
