// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device-wide gate on accelerated composition.
//!
//! [`SessionGate`] holds the two conditions under which the selector stops
//! offering frames to accelerated strategies: an active secure content
//! session and an external-display attach that has not completed yet. The
//! hotplug loop writes pending events; the frame-producer thread consumes
//! them at the start of `prepare` without ever blocking on the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, TryLockError};

use crate::backend::HotplugEvent;

/// Secure-session flag plus the pending hotplug slot.
#[derive(Debug, Default)]
pub struct SessionGate {
    secure: AtomicBool,
    attach_pending: AtomicBool,
    online_pending: AtomicBool,
    pending: Mutex<Option<HotplugEvent>>,
}

impl SessionGate {
    /// Creates an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters or leaves a secure content session.
    pub fn set_secure_session(&self, active: bool) {
        self.secure.store(active, Ordering::Release);
    }

    /// Whether a secure content session is active.
    #[must_use]
    pub fn is_secure_session(&self) -> bool {
        self.secure.load(Ordering::Acquire)
    }

    /// Stores a hotplug event for the next prepare.
    ///
    /// A newer event replaces one that was not consumed yet.
    pub fn post_hotplug(&self, event: HotplugEvent) {
        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let online = matches!(event, HotplugEvent::Online(_));
        *slot = Some(event);
        self.online_pending.store(online, Ordering::Release);
        self.attach_pending.store(true, Ordering::Release);
    }

    /// Whether a hotplug event is waiting to be consumed.
    #[must_use]
    pub fn is_attach_pending(&self) -> bool {
        self.attach_pending.load(Ordering::Acquire)
    }

    /// Removes the pending event if `ready` accepts it.
    ///
    /// Returns `None` without waiting if the hotplug loop holds the slot.
    pub fn take_pending_with(
        &self,
        ready: impl FnOnce(&HotplugEvent) -> bool,
    ) -> Option<HotplugEvent> {
        if !self.is_attach_pending() {
            return None;
        }
        let mut slot = match self.pending.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        if !slot.as_ref().is_some_and(ready) {
            return None;
        }
        self.attach_pending.store(false, Ordering::Release);
        self.online_pending.store(false, Ordering::Release);
        slot.take()
    }

    /// Whether the pending event is an attach (as opposed to a detach).
    ///
    /// Never touches the slot, so a post in flight cannot hide the attach.
    #[must_use]
    pub(crate) fn pending_is_online(&self) -> bool {
        self.is_attach_pending() && self.online_pending.load(Ordering::Acquire)
    }
}
