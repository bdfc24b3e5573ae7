// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vsync control and signaling.
//!
//! Vsync delivery is split between two threads:
//!
//! - the frame-producer thread calls [`VsyncControl::enable`] through
//!   `event_control`, which programs the interrupt and flips the shared
//!   [`VsyncState`];
//! - the vsync loop (thread `hwcomp-vsync`) parks on the [`VsyncState`]
//!   condvar while vsync is disabled and otherwise forwards timestamps from
//!   its [`VsyncSource`] to the registered callbacks.
//!
//! Every wait in the loop is bounded, so dropping the loop always joins.

use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::backend::{CallbackSlot, ExternalDisplay, ExternalKind, VsyncHardware, VsyncSource};
use crate::display::DisplayId;
use crate::error::{ComposerError, EAGAIN, Result};
use crate::time::HostTime;

#[derive(Debug, Default)]
struct VsyncFlags {
    enabled: bool,
    shutdown: bool,
}

/// Enabled flag and shutdown flag shared with the vsync loop.
#[derive(Debug, Default)]
pub struct VsyncState {
    flags: Mutex<VsyncFlags>,
    changed: Condvar,
}

impl VsyncState {
    /// Creates a disabled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flags(&self) -> MutexGuard<'_, VsyncFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether vsync delivery is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.flags().enabled
    }

    /// Enables or disables delivery. Enabling wakes a parked loop.
    pub fn set_enabled(&self, enabled: bool) {
        let mut flags = self.flags();
        flags.enabled = enabled;
        if enabled {
            self.changed.notify_all();
        }
    }

    /// Asks the loop to exit and wakes it.
    pub fn shutdown(&self) {
        self.flags().shutdown = true;
        self.changed.notify_all();
    }

    /// Blocks while delivery is disabled.
    ///
    /// Returns `false` once shutdown was requested.
    pub fn wait_until_enabled(&self) -> bool {
        let flags = self
            .changed
            .wait_while(self.flags(), |f| !f.enabled && !f.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
        !flags.shutdown
    }

    /// Sleeps up to `timeout`, returning early on shutdown.
    fn park(&self, timeout: Duration) {
        drop(
            self.changed
                .wait_timeout_while(self.flags(), timeout, |f| !f.shutdown)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }
}

/// The two states of the vsync control state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VsyncMode {
    /// No vsync callbacks are delivered.
    #[default]
    Disabled,
    /// Vsync callbacks are delivered.
    Enabled,
}

impl VsyncMode {
    fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

/// What an accepted vsync request did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VsyncTransition {
    /// The request differed from the previous one and was applied.
    Changed,
    /// The request repeated the previous one; nothing was reprogrammed.
    Redundant,
}

/// The vsync enable/disable state machine.
pub struct VsyncControl {
    state: Arc<VsyncState>,
    hardware: Box<dyn VsyncHardware>,
    hardware_vsync: bool,
    last_request: VsyncMode,
}

impl core::fmt::Debug for VsyncControl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VsyncControl")
            .field("state", &self.state)
            .field("hardware_vsync", &self.hardware_vsync)
            .field("last_request", &self.last_request)
            .finish_non_exhaustive()
    }
}

impl VsyncControl {
    /// Creates a disabled state machine.
    ///
    /// With `hardware_vsync == false` the interrupt is never programmed.
    #[must_use]
    pub fn new(hardware: Box<dyn VsyncHardware>, hardware_vsync: bool) -> Self {
        Self {
            state: Arc::new(VsyncState::new()),
            hardware,
            hardware_vsync,
            last_request: VsyncMode::Disabled,
        }
    }

    /// The state shared with the vsync loop.
    #[must_use]
    pub fn state(&self) -> &Arc<VsyncState> {
        &self.state
    }

    /// The last request that was fully applied.
    #[must_use]
    pub fn mode(&self) -> VsyncMode {
        self.last_request
    }

    /// Enables or disables vsync delivery.
    ///
    /// The loop state always follows the request. The primary interrupt is
    /// programmed unless software vsync is configured, and the request is
    /// mirrored to a configured HDMI display. A request equal to the last
    /// applied one does nothing.
    ///
    /// # Errors
    ///
    /// Returns the primary programming failure if there was one, otherwise
    /// the external display's failure. A failed request is retried in full
    /// when repeated.
    pub fn enable(
        &mut self,
        enabled: bool,
        external: &mut dyn ExternalDisplay,
    ) -> Result<VsyncTransition> {
        let requested = VsyncMode::from_enabled(enabled);
        if requested == self.last_request {
            debug!(?requested, "vsync already in requested state");
            return Ok(VsyncTransition::Redundant);
        }

        let primary = if self.hardware_vsync {
            self.hardware.program(enabled)
        } else {
            Ok(())
        };
        if let Err(err) = &primary {
            warn!(%err, enabled, "vsync interrupt programming failed");
        }

        self.state.set_enabled(enabled);
        debug!(from = ?self.last_request, to = ?requested, "vsync state changed");

        let mirrored = if external.is_configured() && external.attached() == Some(ExternalKind::Hdmi)
        {
            external.enable_vsync(enabled)
        } else {
            Ok(())
        };
        if let Err(err) = &mirrored {
            warn!(%err, enabled, "external vsync programming failed");
        }

        primary.and(mirrored)?;
        self.last_request = requested;
        Ok(VsyncTransition::Changed)
    }
}

/// The `hwcomp-vsync` thread.
#[derive(Debug)]
pub(crate) struct VsyncLoop {
    state: Arc<VsyncState>,
    handle: Option<JoinHandle<()>>,
}

impl VsyncLoop {
    /// Starts the loop delivering vsyncs for `display` from `source`.
    pub(crate) fn spawn(
        state: Arc<VsyncState>,
        mut source: Box<dyn VsyncSource>,
        callbacks: Arc<CallbackSlot>,
        display: DisplayId,
        timeout: Duration,
    ) -> Result<Self> {
        let loop_state = state.clone();
        let handle = thread::Builder::new()
            .name("hwcomp-vsync".into())
            .spawn(move || {
                while loop_state.wait_until_enabled() {
                    match source.wait_for_vsync(timeout) {
                        Ok(Some(timestamp)) => {
                            if let Some(callbacks) = callbacks.get() {
                                callbacks.vsync(display, timestamp);
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(%err, "vsync wait failed");
                            loop_state.park(timeout);
                        }
                    }
                }
                debug!("vsync loop exiting");
            })
            .map_err(|err| ComposerError::HardwareProgramming {
                errno: err.raw_os_error().unwrap_or(EAGAIN),
            })?;
        Ok(Self {
            state,
            handle: Some(handle),
        })
    }
}

impl Drop for VsyncLoop {
    fn drop(&mut self) {
        self.state.shutdown();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("vsync loop panicked");
        }
    }
}

/// A [`VsyncSource`] pacing at a fixed period, for targets without a vsync
/// interrupt.
#[derive(Debug)]
pub struct SoftVsyncSource {
    period: Duration,
    clock: fn() -> HostTime,
    next: Option<HostTime>,
}

impl SoftVsyncSource {
    /// Creates a source ticking every `period` on `clock`.
    #[must_use]
    pub fn new(period: Duration, clock: fn() -> HostTime) -> Self {
        Self {
            period,
            clock,
            next: None,
        }
    }

    fn advance(&self, from: HostTime) -> HostTime {
        from.checked_add(self.period).unwrap_or(HostTime(u64::MAX))
    }
}

impl VsyncSource for SoftVsyncSource {
    fn wait_for_vsync(&mut self, timeout: Duration) -> Result<Option<HostTime>> {
        let now = (self.clock)();
        let mut deadline = self.next.unwrap_or_else(|| self.advance(now));
        if deadline < now {
            // Missed ticks are dropped, not replayed.
            deadline = self.advance(now);
        }

        let remaining = deadline.saturating_since(now);
        if remaining > timeout {
            self.next = Some(deadline);
            thread::sleep(timeout);
            return Ok(None);
        }

        thread::sleep(remaining);
        self.next = Some(self.advance(deadline));
        Ok(Some(deadline))
    }
}
