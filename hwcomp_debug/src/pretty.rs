// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`] destination (default: stderr). Timestamps print in
//! microseconds.

use std::io::Write;

use hwcomp_core::backend::Completion;
use hwcomp_core::trace::{
    BuffersReleasedEvent, CompletionEvent, CycleSummary, DrawComponent, DrawEvent, ReleaseKind,
    StrategySelectedEvent, SubmitEvent, TraceSink, VsyncControlEvent,
};

/// Writes human-readable trace lines to a [`Write`] destination.
pub struct PrettyPrintSink<W: Write + Send = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write + Send> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }
}

impl<W: Write + Send> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn component_name(component: DrawComponent) -> String {
    match component {
        DrawComponent::Strategy(kind) => format!("{kind:?}"),
        DrawComponent::GpuCopy => "GpuCopy".to_owned(),
        DrawComponent::ExternalCommit => "ExternalCommit".to_owned(),
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "ok" } else { "FAILED" }
}

impl<W: Write + Send> TraceSink for PrettyPrintSink<W> {
    fn on_strategy_selected(&mut self, e: &StrategySelectedEvent) {
        let _ = writeln!(
            self.writer,
            "[select] frame={} display={} strategy={:?} overlay={} mixed={} at {:.1}µs",
            e.frame_index,
            e.display.0,
            e.strategy,
            e.overlay_in_use,
            e.mixed_composition,
            e.at.as_micros_f64(),
        );
    }

    fn on_draw(&mut self, e: &DrawEvent) {
        let _ = writeln!(
            self.writer,
            "[draw] frame={} display={} {} {} at {:.1}µs",
            e.frame_index,
            e.display.0,
            component_name(e.component),
            status(e.ok),
            e.at.as_micros_f64(),
        );
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        let _ = writeln!(
            self.writer,
            "[submit] frame={} display={} {} at {:.1}µs",
            e.frame_index,
            e.display.0,
            status(e.ok),
            e.at.as_micros_f64(),
        );
    }

    fn on_completion(&mut self, e: &CompletionEvent) {
        let outcome = match e.outcome {
            Completion::Signaled => "signaled",
            Completion::TimedOut => "TIMED OUT",
        };
        let _ = writeln!(
            self.writer,
            "[wait:{}] frame={} display={} {} at {:.1}µs",
            e.stage,
            e.frame_index,
            e.display.0,
            outcome,
            e.at.as_micros_f64(),
        );
    }

    fn on_buffers_released(&mut self, e: &BuffersReleasedEvent) {
        let kind = match e.kind {
            ReleaseKind::All => "all",
            ReleaseKind::Previous => "previous",
        };
        let _ = writeln!(
            self.writer,
            "[release:{kind}] frame={} display={} count={}",
            e.frame_index, e.display.0, e.count,
        );
    }

    fn on_vsync_control(&mut self, e: &VsyncControlEvent) {
        let _ = writeln!(
            self.writer,
            "[vsync] enabled={}{} {} at {:.1}µs",
            e.enabled,
            if e.redundant { " (redundant)" } else { "" },
            status(e.ok),
            e.at.as_micros_f64(),
        );
    }

    fn on_cycle_summary(&mut self, s: &CycleSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} display={} strategy={:?} draws={}/{} timed_out={} released={} took={:.1}µs",
            s.frame_index,
            s.display.0,
            s.strategy,
            s.draws - s.failed_draws,
            s.draws,
            s.timed_out,
            s.released,
            s.finished.saturating_since(s.started).as_nanos() as f64 / 1000.0,
        );
    }
}
