// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered record of every collaborator call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hwcomp_core::backend::{ExternalKind, OverlayState};
use hwcomp_core::display::DisplayId;
use hwcomp_core::layer::BufferHandle;
use hwcomp_core::strategy::CompositionStrategy;

/// One observed collaborator call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// A strategy's `reset`.
    StrategyReset(CompositionStrategy, DisplayId),
    /// A strategy's `prepare`, with its answer.
    StrategyPrepare(CompositionStrategy, DisplayId, bool),
    /// A strategy's `draw`.
    StrategyDraw(CompositionStrategy, DisplayId),
    /// The GPU-copy engine's `prepare`, with its answer.
    GpuCopyPrepare(DisplayId, bool),
    /// The GPU-copy engine's `draw`.
    GpuCopyDraw(DisplayId),
    /// An overlay state change request.
    Overlay(OverlayState),
    /// The overlay was told which external display is attached.
    OverlayExternal(Option<ExternalKind>),
    /// The external display completed an attach.
    ExternalOnline,
    /// The external display handled a detach.
    ExternalOffline,
    /// The external vsync interrupt was switched.
    ExternalVsync(bool),
    /// The mirrored frame was committed.
    ExternalCommit,
    /// The external output was torn down.
    ExternalTeardown,
    /// A frame was submitted.
    Submit(DisplayId),
    /// A post completion wait.
    WaitPost(DisplayId),
    /// A pan completion wait.
    WaitPan(DisplayId),
    /// The primary vsync interrupt was programmed.
    VsyncProgram(bool),
    /// A buffer went back to its producer.
    Release(DisplayId, BufferHandle),
}

/// Shared, append-only list of [`Call`]s. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn calls(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `call`.
    pub fn record(&self, call: Call) {
        self.calls().push(call);
    }

    /// Copies out every call so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Call> {
        self.calls().clone()
    }

    /// Removes and returns every call so far.
    pub fn take(&self) -> Vec<Call> {
        core::mem::take(&mut *self.calls())
    }

    /// How many recorded calls satisfy `pred`.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| pred(call)).count()
    }

    /// Whether `call` was recorded.
    #[must_use]
    pub fn contains(&self, call: &Call) -> bool {
        self.calls().contains(call)
    }

    /// Index of the first occurrence of `call`.
    #[must_use]
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    /// Buffers released for `display`, in release order.
    #[must_use]
    pub fn released(&self, display: DisplayId) -> Vec<BufferHandle> {
        self.calls()
            .iter()
            .filter_map(|call| match call {
                Call::Release(d, buffer) if *d == display => Some(*buffer),
                _ => None,
            })
            .collect()
    }
}
