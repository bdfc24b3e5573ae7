// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! The composer owns its trace sink, so [`RecorderSink`] writes into a buffer
//! shared with a [`Recording`] handle that the host keeps. Events are stored
//! as [`RecordedEvent`] values in arrival order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hwcomp_core::trace::{
    BuffersReleasedEvent, CompletionEvent, CycleSummary, DrawEvent, StrategySelectedEvent,
    SubmitEvent, TraceSink, VsyncControlEvent,
};

/// A recorded trace event.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`StrategySelectedEvent`].
    StrategySelected(StrategySelectedEvent),
    /// A [`DrawEvent`].
    Draw(DrawEvent),
    /// A [`SubmitEvent`].
    Submit(SubmitEvent),
    /// A [`CompletionEvent`].
    Completion(CompletionEvent),
    /// A [`BuffersReleasedEvent`].
    BuffersReleased(BuffersReleasedEvent),
    /// A [`VsyncControlEvent`].
    VsyncControl(VsyncControlEvent),
    /// A [`CycleSummary`].
    CycleSummary(CycleSummary),
}

impl RecordedEvent {
    /// Cycle counter of the event, if it belongs to a cycle.
    #[must_use]
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            Self::StrategySelected(e) => Some(e.frame_index),
            Self::Draw(e) => Some(e.frame_index),
            Self::Submit(e) => Some(e.frame_index),
            Self::Completion(e) => Some(e.frame_index),
            Self::BuffersReleased(e) => Some(e.frame_index),
            Self::CycleSummary(s) => Some(s.frame_index),
            Self::VsyncControl(_) => None,
        }
    }
}

type Shared = Arc<Mutex<Vec<RecordedEvent>>>;

fn lock(events: &Shared) -> MutexGuard<'_, Vec<RecordedEvent>> {
    events.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Host-side view of the events recorded by a [`RecorderSink`].
#[derive(Clone, Debug, Default)]
pub struct Recording {
    events: Shared,
}

impl Recording {
    /// Creates an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sink appending to this recording.
    #[must_use]
    pub fn sink(&self) -> RecorderSink {
        RecorderSink {
            events: self.events.clone(),
        }
    }

    /// Copies out every event recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        lock(&self.events).clone()
    }

    /// Removes and returns every event recorded so far.
    pub fn drain(&self) -> Vec<RecordedEvent> {
        core::mem::take(&mut *lock(&self.events))
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }
}

/// A [`TraceSink`] appending to a shared [`Recording`].
#[derive(Debug)]
pub struct RecorderSink {
    events: Shared,
}

impl RecorderSink {
    fn push(&mut self, event: RecordedEvent) {
        lock(&self.events).push(event);
    }
}

impl TraceSink for RecorderSink {
    fn on_strategy_selected(&mut self, e: &StrategySelectedEvent) {
        self.push(RecordedEvent::StrategySelected(*e));
    }

    fn on_draw(&mut self, e: &DrawEvent) {
        self.push(RecordedEvent::Draw(*e));
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        self.push(RecordedEvent::Submit(*e));
    }

    fn on_completion(&mut self, e: &CompletionEvent) {
        self.push(RecordedEvent::Completion(*e));
    }

    fn on_buffers_released(&mut self, e: &BuffersReleasedEvent) {
        self.push(RecordedEvent::BuffersReleased(*e));
    }

    fn on_vsync_control(&mut self, e: &VsyncControlEvent) {
        self.push(RecordedEvent::VsyncControl(*e));
    }

    fn on_cycle_summary(&mut self, s: &CycleSummary) {
        self.push(RecordedEvent::CycleSummary(*s));
    }
}
