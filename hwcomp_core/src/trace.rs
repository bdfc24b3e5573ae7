// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instrumentation hooks for the composition cycle.
//!
//! The composer reports every decision and hardware interaction of a cycle
//! to a [`TraceSink`]. All sink methods default to no-ops, so a sink only
//! overrides the events it cares about.
//!
//! [`Tracer`] is the composer's handle on an optional sink. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing. When **on**,
//! each method checks for an installed sink (one branch), stamps the event
//! with the installed clock and dispatches.
//!
//! [`CycleSummaryBuilder`] folds the events of one display's cycle into a
//! [`CycleSummary`].

use crate::backend::{Completion, CompletionStage};
use crate::display::DisplayId;
use crate::strategy::CompositionStrategy;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What produced a draw event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawComponent {
    /// The selected strategy's draw step.
    Strategy(CompositionStrategy),
    /// The GPU-copy compositor.
    GpuCopy,
    /// The external display commit.
    ExternalCommit,
}

/// Which buffers a release covered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReleaseKind {
    /// Everything the display held (blank, empty list, missing target).
    All,
    /// The previous frame's buffers at the end of a commit.
    Previous,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when prepare settles on a strategy for a display.
#[derive(Clone, Copy, Debug)]
pub struct StrategySelectedEvent {
    /// Cycle counter.
    pub frame_index: u64,
    /// Display the decision applies to.
    pub display: DisplayId,
    /// The selected strategy.
    pub strategy: CompositionStrategy,
    /// Whether overlay hardware is in use.
    pub overlay_in_use: bool,
    /// Whether some layers are still composed by the GPU.
    pub mixed_composition: bool,
    /// When the decision was made.
    pub at: HostTime,
}

/// Emitted after each draw step of a commit.
#[derive(Clone, Copy, Debug)]
pub struct DrawEvent {
    /// Cycle counter.
    pub frame_index: u64,
    /// Display being drawn.
    pub display: DisplayId,
    /// Which component drew.
    pub component: DrawComponent,
    /// Whether the draw succeeded.
    pub ok: bool,
    /// When the draw returned.
    pub at: HostTime,
}

/// Emitted after the frame is submitted for presentation.
#[derive(Clone, Copy, Debug)]
pub struct SubmitEvent {
    /// Cycle counter.
    pub frame_index: u64,
    /// Display submitted.
    pub display: DisplayId,
    /// Whether the submission succeeded.
    pub ok: bool,
    /// When the submission returned.
    pub at: HostTime,
}

/// Emitted after a bounded completion wait.
#[derive(Clone, Copy, Debug)]
pub struct CompletionEvent {
    /// Cycle counter.
    pub frame_index: u64,
    /// Display waited on.
    pub display: DisplayId,
    /// Which signal was awaited.
    pub stage: CompletionStage,
    /// Outcome of the wait.
    pub outcome: Completion,
    /// When the wait returned.
    pub at: HostTime,
}

/// Emitted when buffers are handed back to their producer.
#[derive(Clone, Copy, Debug)]
pub struct BuffersReleasedEvent {
    /// Cycle counter.
    pub frame_index: u64,
    /// Display that held the buffers.
    pub display: DisplayId,
    /// Which buffers were released.
    pub kind: ReleaseKind,
    /// How many buffers were released.
    pub count: usize,
    /// When the release happened.
    pub at: HostTime,
}

/// Emitted for every vsync enable/disable request.
#[derive(Clone, Copy, Debug)]
pub struct VsyncControlEvent {
    /// Requested state.
    pub enabled: bool,
    /// Whether the request repeated the previous one.
    pub redundant: bool,
    /// Whether hardware programming succeeded.
    pub ok: bool,
    /// When the request was handled.
    pub at: HostTime,
}

/// Per-display cycle summary produced by [`CycleSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct CycleSummary {
    /// Cycle counter.
    pub frame_index: u64,
    /// Display summarized.
    pub display: DisplayId,
    /// Strategy selected during prepare.
    pub strategy: CompositionStrategy,
    /// When the commit started.
    pub started: HostTime,
    /// When the commit finished.
    pub finished: HostTime,
    /// Number of draw steps that ran.
    pub draws: u32,
    /// Number of draw steps that failed.
    pub failed_draws: u32,
    /// Whether a completion wait timed out.
    pub timed_out: bool,
    /// Buffers released at the end of the cycle.
    pub released: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the composer.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when prepare selects a strategy for a display.
    fn on_strategy_selected(&mut self, e: &StrategySelectedEvent) {
        _ = e;
    }

    /// Called after each draw step.
    fn on_draw(&mut self, e: &DrawEvent) {
        _ = e;
    }

    /// Called after a frame submission.
    fn on_submit(&mut self, e: &SubmitEvent) {
        _ = e;
    }

    /// Called after a bounded completion wait.
    fn on_completion(&mut self, e: &CompletionEvent) {
        _ = e;
    }

    /// Called when buffers are released.
    fn on_buffers_released(&mut self, e: &BuffersReleasedEvent) {
        _ = e;
    }

    /// Called for every vsync control request.
    fn on_vsync_control(&mut self, e: &VsyncControlEvent) {
        _ = e;
    }

    /// Called with a per-display cycle summary at the end of set.
    fn on_cycle_summary(&mut self, s: &CycleSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Reads the clock used to stamp events.
pub type TraceClock = fn() -> HostTime;

/// The composer's handle on an optional [`TraceSink`].
///
/// Event constructors receive the current time from the installed
/// [`TraceClock`], so nothing reads a clock while tracing is off.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<(Box<dyn TraceSink + Send>, TraceClock)>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

impl Tracer {
    /// Creates a tracer dispatching to `sink`, stamping events with `clock`.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink + Send>, clock: TraceClock) -> Self {
        #[cfg(feature = "trace")]
        {
            Self {
                sink: Some((sink, clock)),
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (sink, clock);
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    /// Whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Reads the trace clock, or returns zero when tracing is off.
    #[inline]
    #[must_use]
    pub fn now(&self) -> HostTime {
        #[cfg(feature = "trace")]
        if let Some((_, clock)) = &self.sink {
            return clock();
        }
        HostTime(0)
    }

    #[cfg(feature = "trace")]
    #[inline]
    fn dispatch(&mut self, f: impl FnOnce(&mut dyn TraceSink, HostTime)) {
        if let Some((sink, clock)) = &mut self.sink {
            f(sink.as_mut(), clock());
        }
    }

    /// Emits a [`StrategySelectedEvent`] built by `e`.
    #[inline]
    pub fn strategy_selected(&mut self, e: impl FnOnce(HostTime) -> StrategySelectedEvent) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, at| s.on_strategy_selected(&e(at)));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DrawEvent`] built by `e`.
    #[inline]
    pub fn draw(&mut self, e: impl FnOnce(HostTime) -> DrawEvent) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, at| s.on_draw(&e(at)));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SubmitEvent`] built by `e`.
    #[inline]
    pub fn submit(&mut self, e: impl FnOnce(HostTime) -> SubmitEvent) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, at| s.on_submit(&e(at)));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CompletionEvent`] built by `e`.
    #[inline]
    pub fn completion(&mut self, e: impl FnOnce(HostTime) -> CompletionEvent) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, at| s.on_completion(&e(at)));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BuffersReleasedEvent`] built by `e`.
    #[inline]
    pub fn buffers_released(&mut self, e: impl FnOnce(HostTime) -> BuffersReleasedEvent) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, at| s.on_buffers_released(&e(at)));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`VsyncControlEvent`] built by `e`.
    #[inline]
    pub fn vsync_control(&mut self, e: impl FnOnce(HostTime) -> VsyncControlEvent) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, at| s.on_vsync_control(&e(at)));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a finished [`CycleSummary`].
    #[inline]
    pub fn cycle_summary(&mut self, summary: &CycleSummary) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, _| s.on_cycle_summary(summary));
        #[cfg(not(feature = "trace"))]
        {
            _ = summary;
        }
    }
}

// ---------------------------------------------------------------------------
// CycleSummaryBuilder
// ---------------------------------------------------------------------------

/// Folds one display's commit events into a [`CycleSummary`].
#[derive(Debug)]
pub struct CycleSummaryBuilder {
    summary: CycleSummary,
}

impl CycleSummaryBuilder {
    /// Starts a summary for `display` at `started`.
    #[must_use]
    pub fn new(
        frame_index: u64,
        display: DisplayId,
        strategy: CompositionStrategy,
        started: HostTime,
    ) -> Self {
        Self {
            summary: CycleSummary {
                frame_index,
                display,
                strategy,
                started,
                finished: started,
                draws: 0,
                failed_draws: 0,
                timed_out: false,
                released: 0,
            },
        }
    }

    /// Records a draw step.
    pub fn draw(&mut self, ok: bool) {
        self.summary.draws += 1;
        if !ok {
            self.summary.failed_draws += 1;
        }
    }

    /// Records a completion wait.
    pub fn completion(&mut self, outcome: Completion) {
        self.summary.timed_out |= outcome == Completion::TimedOut;
    }

    /// Records released buffers.
    pub fn released(&mut self, count: usize) {
        self.summary.released += count;
    }

    /// Consumes the builder and produces the final [`CycleSummary`].
    #[must_use]
    pub fn finish(mut self, finished: HostTime) -> CycleSummary {
        self.summary.finished = finished.max(self.summary.started);
        self.summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
