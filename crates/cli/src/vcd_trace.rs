// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use f0blink_sim::PinEdge;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use vcd::{TimescaleUnit, Value, Writer};

/// Writes the probed LED waveform as a one-bit VCD trace with a 1 us timescale.
pub fn write_waveform(
    path: &Path,
    edges: &[PinEdge],
    end_cycle: u64,
    hclk_hz: u32,
) -> anyhow::Result<()> {
    let cycles_per_us = u64::from(hclk_hz / 1_000_000).max(1);
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);

    {
        let mut writer = Writer::new(&mut buf);

        // Header
        writer.timescale(1, TimescaleUnit::US)?;
        writer.add_module("top")?;
        writer.add_module("gpiob")?;
        let pb3 = writer.add_wire(1, "pb3")?;
        writer.upscope()?; // gpiob
        writer.upscope()?; // top
        writer.enddefinitions()?;

        // Initial value
        writer.timestamp(0)?;
        writer.change_scalar(pb3, Value::V0)?;

        for edge in edges {
            writer.timestamp(edge.cycle / cycles_per_us)?;
            writer.change_scalar(pb3, level(edge.high))?;
        }

        writer.timestamp(end_cycle / cycles_per_us)?;
    }

    buf.flush()?;
    Ok(())
}

fn level(high: bool) -> Value {
    if high {
        Value::V1
    } else {
        Value::V0
    }
}

#[cfg(test)]
mod tests {
    use super::write_waveform;
    use f0blink_sim::PinEdge;

    #[test]
    fn test_vcd_contains_edges() {
        let path = std::env::temp_dir().join(format!("f0blink-vcd-{}.vcd", std::process::id()));
        let edges = [
            PinEdge {
                cycle: 48_000_000,
                high: true,
            },
            PinEdge {
                cycle: 96_000_000,
                high: false,
            },
        ];
        write_waveform(&path, &edges, 120_000_000, 48_000_000).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(text.contains("$timescale 1 us $end"));
        assert!(text.contains("pb3"));
        assert!(text.contains("#1000000"));
        assert!(text.contains("#2000000"));
        assert!(text.contains("#2500000"));
    }
}
