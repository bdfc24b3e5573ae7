// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] turns recorded events into [Chrome Trace Event Format][format]
//! JSON. Each display becomes a process track; vsync control lands on a
//! separate track so it does not interleave with the cycle.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use hwcomp_core::backend::Completion;
use hwcomp_core::trace::DrawComponent;

use crate::recorder::RecordedEvent;

/// Process id used for device-wide events.
const DEVICE_PID: u32 = 1000;

fn component_name(component: DrawComponent) -> String {
    match component {
        DrawComponent::Strategy(kind) => format!("draw:{kind:?}"),
        DrawComponent::GpuCopy => "draw:GpuCopy".to_owned(),
        DrawComponent::ExternalCommit => "commit:external".to_owned(),
    }
}

fn micros(duration: core::time::Duration) -> f64 {
    duration.as_nanos() as f64 / 1000.0
}

/// Converts one recorded event into a trace event object.
#[must_use]
pub fn to_trace_event(event: &RecordedEvent) -> Value {
    match event {
        RecordedEvent::StrategySelected(e) => json!({
            "ph": "i",
            "name": format!("{:?}", e.strategy),
            "cat": "Select",
            "ts": e.at.as_micros_f64(),
            "pid": e.display.0,
            "tid": 0,
            "s": "p",
            "args": {
                "frame_index": e.frame_index,
                "overlay_in_use": e.overlay_in_use,
                "mixed_composition": e.mixed_composition,
            }
        }),
        RecordedEvent::Draw(e) => json!({
            "ph": "i",
            "name": component_name(e.component),
            "cat": "Commit",
            "ts": e.at.as_micros_f64(),
            "pid": e.display.0,
            "tid": 0,
            "s": "t",
            "args": {
                "frame_index": e.frame_index,
                "ok": e.ok,
            }
        }),
        RecordedEvent::Submit(e) => json!({
            "ph": "i",
            "name": "Submit",
            "cat": "Commit",
            "ts": e.at.as_micros_f64(),
            "pid": e.display.0,
            "tid": 0,
            "s": "t",
            "args": {
                "frame_index": e.frame_index,
                "ok": e.ok,
            }
        }),
        RecordedEvent::Completion(e) => json!({
            "ph": "i",
            "name": format!("wait:{}", e.stage),
            "cat": "Commit",
            "ts": e.at.as_micros_f64(),
            "pid": e.display.0,
            "tid": 0,
            "s": "t",
            "args": {
                "frame_index": e.frame_index,
                "timed_out": e.outcome == Completion::TimedOut,
            }
        }),
        RecordedEvent::BuffersReleased(e) => json!({
            "ph": "C",
            "name": format!("released:{:?}", e.kind),
            "cat": "Buffers",
            "ts": e.at.as_micros_f64(),
            "pid": e.display.0,
            "args": {
                "count": e.count,
            }
        }),
        RecordedEvent::VsyncControl(e) => json!({
            "ph": "i",
            "name": if e.enabled { "vsync:on" } else { "vsync:off" },
            "cat": "Vsync",
            "ts": e.at.as_micros_f64(),
            "pid": DEVICE_PID,
            "tid": 0,
            "s": "p",
            "args": {
                "redundant": e.redundant,
                "ok": e.ok,
            }
        }),
        RecordedEvent::CycleSummary(s) => json!({
            "ph": "X",
            "name": format!("cycle {}", s.frame_index),
            "cat": "Summary",
            "ts": s.started.as_micros_f64(),
            "dur": micros(s.finished.saturating_since(s.started)),
            "pid": s.display.0,
            "tid": 1,
            "args": {
                "strategy": format!("{:?}", s.strategy),
                "draws": s.draws,
                "failed_draws": s.failed_draws,
                "timed_out": s.timed_out,
                "released": s.released,
            }
        }),
    }
}

/// Writes `events` as a JSON array of trace event objects, suitable for
/// `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// # Errors
///
/// Returns any I/O error from `writer`.
pub fn export(events: &[RecordedEvent], writer: &mut dyn Write) -> io::Result<()> {
    let values: Vec<Value> = events.iter().map(to_trace_event).collect();
    serde_json::to_writer_pretty(writer, &values)?;
    Ok(())
}
