// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `hwcomp-hotplug` thread.

use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::backend::{CallbackSlot, HotplugSource};
use crate::error::{ComposerError, EAGAIN, Result};
use crate::gate::SessionGate;

/// Forwards hotplug events into the [`SessionGate`] and asks the host for a
/// new frame so the next prepare consumes them.
#[derive(Debug)]
pub(crate) struct HotplugLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HotplugLoop {
    pub(crate) fn spawn(
        mut source: Box<dyn HotplugSource>,
        gate: Arc<SessionGate>,
        callbacks: Arc<CallbackSlot>,
        poll: Duration,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let loop_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("hwcomp-hotplug".into())
            .spawn(move || {
                while !loop_stop.load(Ordering::Acquire) {
                    let Some(event) = source.next_event(poll) else {
                        continue;
                    };
                    info!(?event, "external display hotplug");
                    gate.post_hotplug(event);
                    if let Some(callbacks) = callbacks.get() {
                        callbacks.invalidate();
                    }
                }
                debug!("hotplug loop exiting");
            })
            .map_err(|err| ComposerError::HardwareProgramming {
                errno: err.raw_os_error().unwrap_or(EAGAIN),
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for HotplugLoop {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("hotplug loop panicked");
        }
    }
}
