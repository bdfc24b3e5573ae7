// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display identification and per-display composition state.
//!
//! [`DisplayId`] is a lightweight handle for a display slot. The composer
//! owns exactly one [`DisplayContext`] per slot for its whole lifetime;
//! strategies see it by mutable reference during prepare and draw.

use core::fmt;
use std::sync::Arc;

use kurbo::Rect;

use crate::buffer::BufferLockSet;
use crate::gate::SessionGate;
use crate::layer::LayerStats;
use crate::strategy::CompositionStrategy;

/// Identifies a display slot.
///
/// Slot 0 is the primary panel. Core passes the value through to
/// collaborators without interpreting it further.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DisplayId(pub u32);

impl DisplayId {
    /// The primary built-in panel.
    pub const PRIMARY: Self = Self(0);

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayId({})", self.0)
    }
}

/// Composition state of one display slot.
///
/// Reset at the start of every prepare, written by the selector, read by the
/// commit engine. Strategies may lock buffers through
/// [`buffers_mut`](Self::buffers_mut) but never change the selected strategy.
#[derive(Debug)]
pub struct DisplayContext {
    id: DisplayId,
    bounds: Rect,
    gate: Arc<SessionGate>,
    buffers: BufferLockSet,
    pub(crate) strategy: CompositionStrategy,
    pub(crate) overlay_in_use: bool,
    pub(crate) mixed_composition: bool,
    pub(crate) gpu_copy_in_use: bool,
    pub(crate) stats: LayerStats,
    pub(crate) prepared_frame: Option<u64>,
    pub(crate) hold_previous: bool,
}

impl DisplayContext {
    /// Creates the context for slot `id` covering `bounds`.
    #[must_use]
    pub fn new(id: DisplayId, bounds: Rect, gate: Arc<SessionGate>, buffers: BufferLockSet) -> Self {
        Self {
            id,
            bounds,
            gate,
            buffers,
            strategy: CompositionStrategy::Closed,
            overlay_in_use: false,
            mixed_composition: false,
            gpu_copy_in_use: false,
            stats: LayerStats::default(),
            prepared_frame: None,
            hold_previous: false,
        }
    }

    /// The display slot.
    #[must_use]
    pub fn id(&self) -> DisplayId {
        self.id
    }

    /// Visible area of the display in layer coordinates.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The strategy selected for the current frame.
    #[must_use]
    pub fn strategy(&self) -> CompositionStrategy {
        self.strategy
    }

    /// Whether an overlay-backed strategy claimed the current frame.
    #[must_use]
    pub fn overlay_in_use(&self) -> bool {
        self.overlay_in_use
    }

    /// Whether some layers still need GPU composition next to the overlay.
    #[must_use]
    pub fn mixed_composition(&self) -> bool {
        self.mixed_composition
    }

    /// Whether the GPU-copy compositor claimed layers this frame.
    #[must_use]
    pub fn gpu_copy_in_use(&self) -> bool {
        self.gpu_copy_in_use
    }

    /// Layer statistics gathered during the last prepare.
    #[must_use]
    pub fn stats(&self) -> &LayerStats {
        &self.stats
    }

    /// Whether a secure content session is active on the device.
    #[must_use]
    pub fn secure_session(&self) -> bool {
        self.gate.is_secure_session()
    }

    /// Whether an external display attach is waiting to complete.
    #[must_use]
    pub fn attach_pending(&self) -> bool {
        self.gate.is_attach_pending()
    }

    /// Buffers held for this display.
    #[must_use]
    pub fn buffers(&self) -> &BufferLockSet {
        &self.buffers
    }

    /// Mutable access for strategies that lock buffers during prepare.
    pub fn buffers_mut(&mut self) -> &mut BufferLockSet {
        &mut self.buffers
    }

    /// Clears per-frame selection state ahead of a new prepare.
    pub(crate) fn begin_frame(&mut self, frame_index: u64) {
        self.overlay_in_use = false;
        self.mixed_composition = false;
        self.gpu_copy_in_use = false;
        self.prepared_frame = Some(frame_index);
    }

    /// Drops every claim on the frame: strategy `Closed`, no overlay.
    pub(crate) fn mark_closed(&mut self) {
        self.strategy = CompositionStrategy::Closed;
        self.overlay_in_use = false;
        self.mixed_composition = false;
        self.gpu_copy_in_use = false;
    }
}
