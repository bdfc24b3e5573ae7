// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Staggered buffer release.
//!
//! A buffer locked for frame N may still be scanned out until frame N+1 has
//! been panned, so [`BufferLockSet`] keeps two generations: the buffers
//! locked for the frame being composed (`current`) and the ones handed over
//! from the frame before (`previous`). [`BufferLockSet::unlock_previous`]
//! runs at the end of every commit and shifts the generations by one.
//!
//! Every release goes through a [`BufferRelease`] collaborator and every
//! handle is released at most once per lock.

use core::fmt;
use std::sync::Arc;

use crate::display::DisplayId;
use crate::layer::BufferHandle;

/// Hands a buffer back to its producer.
pub trait BufferRelease: Send + Sync {
    /// Releases `buffer`, previously locked on `display`.
    fn release(&self, display: DisplayId, buffer: BufferHandle);
}

/// Buffers held by one display across two frames.
pub struct BufferLockSet {
    display: DisplayId,
    current: Vec<BufferHandle>,
    previous: Vec<BufferHandle>,
    releaser: Arc<dyn BufferRelease>,
}

impl fmt::Debug for BufferLockSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferLockSet")
            .field("display", &self.display)
            .field("current", &self.current)
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}

impl BufferLockSet {
    /// Creates an empty set whose releases go to `releaser`.
    #[must_use]
    pub fn new(display: DisplayId, releaser: Arc<dyn BufferRelease>) -> Self {
        Self {
            display,
            current: Vec::new(),
            previous: Vec::new(),
            releaser,
        }
    }

    /// Locks `buffer` for the frame being composed.
    ///
    /// Returns `false` if the buffer was already locked for this frame. A
    /// buffer still held from the previous frame moves into the current
    /// generation instead of being locked twice.
    pub fn lock(&mut self, buffer: BufferHandle) -> bool {
        if self.current.contains(&buffer) {
            return false;
        }
        if let Some(pos) = self.previous.iter().position(|b| *b == buffer) {
            self.previous.swap_remove(pos);
        }
        self.current.push(buffer);
        true
    }

    /// Whether `buffer` is held in either generation.
    #[must_use]
    pub fn is_locked(&self, buffer: BufferHandle) -> bool {
        self.current.contains(&buffer) || self.previous.contains(&buffer)
    }

    /// Buffers locked for the frame being composed.
    #[must_use]
    pub fn current(&self) -> &[BufferHandle] {
        &self.current
    }

    /// Buffers handed over from the previous frame.
    #[must_use]
    pub fn previous(&self) -> &[BufferHandle] {
        &self.previous
    }

    /// Total number of held buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len() + self.previous.len()
    }

    /// Whether no buffer is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }

    /// Releases the previous generation and promotes the current one.
    ///
    /// Returns the number of buffers released.
    pub fn unlock_previous(&mut self) -> usize {
        let previous = core::mem::take(&mut self.previous);
        let released = self.release(previous);
        self.previous = core::mem::take(&mut self.current);
        released
    }

    /// Releases every held buffer immediately.
    ///
    /// Returns the number of buffers released.
    pub fn unlock_all(&mut self) -> usize {
        let mut held = core::mem::take(&mut self.previous);
        held.append(&mut self.current);
        self.release(held)
    }

    fn release(&self, buffers: Vec<BufferHandle>) -> usize {
        for buffer in &buffers {
            self.releaser.release(self.display, *buffer);
        }
        buffers.len()
    }
}
