// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A bounded hotplug event queue.
//!
//! The host reads uevents on whatever thread owns its netlink socket and
//! forwards decoded events through a [`HotplugSender`]. The composer's hotplug
//! loop drains the matching [`QueuedHotplugSource`]. When the loop falls
//! behind, the oldest queued event is dropped: only the latest cable state
//! matters.

use core::time::Duration;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use hwcomp_core::backend::{HotplugEvent, HotplugSource};
use tracing::debug;

#[derive(Debug)]
struct Pending {
    events: VecDeque<HotplugEvent>,
    capacity: usize,
    dropped: u64,
}

impl Pending {
    fn push(&mut self, event: HotplugEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }
}

#[derive(Debug)]
struct Shared {
    pending: Mutex<Pending>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a connected sender and source holding at most `capacity` events.
///
/// A `capacity` of zero is treated as one.
#[must_use]
pub fn hotplug_queue(capacity: usize) -> (HotplugSender, QueuedHotplugSource) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        pending: Mutex::new(Pending {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }),
        ready: Condvar::new(),
    });
    (
        HotplugSender {
            shared: shared.clone(),
        },
        QueuedHotplugSource { shared },
    )
}

/// Producer half of [`hotplug_queue`]. Cheap to clone.
#[derive(Clone, Debug)]
pub struct HotplugSender {
    shared: Arc<Shared>,
}

impl HotplugSender {
    /// Queues `event`, evicting the oldest one if the queue is full.
    pub fn send(&self, event: HotplugEvent) {
        let mut pending = self.shared.lock();
        pending.push(event);
        drop(pending);
        self.shared.ready.notify_one();
    }

    /// Decodes a raw uevent with [`parse_uevent`](crate::parse_uevent) and
    /// queues it if it is an HDMI switch event.
    ///
    /// Returns whether an event was queued.
    pub fn send_uevent(&self, message: &[u8]) -> bool {
        match crate::parse_uevent(message) {
            Some(event) => {
                debug!(?event, "hdmi uevent");
                self.send(event);
                true
            }
            None => false,
        }
    }

    /// Number of events evicted because the queue was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.shared.lock().dropped
    }
}

/// Consumer half of [`hotplug_queue`]; hand it to the composer.
#[derive(Debug)]
pub struct QueuedHotplugSource {
    shared: Arc<Shared>,
}

impl QueuedHotplugSource {
    /// Number of events waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().events.len()
    }

    /// Whether no event is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HotplugSource for QueuedHotplugSource {
    fn next_event(&mut self, timeout: Duration) -> Option<HotplugEvent> {
        let pending = self.shared.lock();
        let (mut pending, _) = self
            .shared
            .ready
            .wait_timeout_while(pending, timeout, |p| p.events.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        pending.events.pop_front()
    }
}
