// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator contract for display hardware integrations.
//!
//! `hwcomp_core` decides and sequences; everything that touches pixels or
//! hardware lives behind the traits in this module (plus [`Strategy`],
//! [`GpuCopy`] and [`BufferRelease`]). A platform integration provides:
//!
//! - **Overlay engine**: the [`OverlayEngine`] state machine shared by all
//!   overlay-backed strategies.
//! - **External display**: an [`ExternalDisplay`] driving HDMI or wireless
//!   output, or [`NoExternalDisplay`] on panels without one.
//! - **Presentation**: a [`PresentationBackend`] that swaps buffers and
//!   reports the post and pan completion signals.
//! - **Vsync**: a [`VsyncHardware`] switch for the interrupt and a
//!   [`VsyncSource`] that delivers timestamps to the vsync loop.
//! - **Hotplug**: an optional [`HotplugSource`] of external-display events.
//!
//! The host receives notifications through [`ComposerCallbacks`].
//!
//! # Threading
//!
//! Collaborators handed to the composer by value are only ever called from
//! the frame-producer thread. [`VsyncSource`] and [`HotplugSource`] move onto
//! their own loop threads; [`ComposerCallbacks`] is called from both loops.
//!
//! [`Strategy`]: crate::strategy::Strategy
//! [`GpuCopy`]: crate::strategy::GpuCopy
//! [`BufferRelease`]: crate::buffer::BufferRelease

use core::fmt;
use core::time::Duration;
use std::sync::{Arc, PoisonError, RwLock};

use crate::display::DisplayId;
use crate::error::Result;
use crate::layer::PresentTarget;
use crate::time::HostTime;

/// Configuration state of the overlay hardware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OverlayState {
    /// No overlay pipe is in use.
    #[default]
    Closed,
    /// Video on the primary panel.
    VideoPanel,
    /// Video on the primary panel and the external display.
    VideoPanelAndExternal,
    /// Video plus a picture-in-picture pipe.
    PipPanel,
    /// Video on the external display only.
    ExternalOnly,
    /// UI mirrored to the external display.
    UiMirror,
    /// Display-processor bypass of one layer.
    Bypass1Layer,
    /// Display-processor bypass of two layers.
    Bypass2Layer,
    /// Display-processor bypass of three layers.
    Bypass3Layer,
}

/// Which kind of external display is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExternalKind {
    /// Wired HDMI on framebuffer 1; can drive vsync.
    Hdmi,
    /// Wireless display.
    Wifi,
}

/// The overlay hardware shared by the overlay-backed strategies.
pub trait OverlayEngine: Send {
    /// The current overlay state.
    fn state(&self) -> OverlayState;

    /// Moves the overlay into `state`.
    ///
    /// Moving to [`OverlayState::Closed`] idles every pipe.
    fn set_state(&mut self, state: OverlayState) -> Result<()>;

    /// Records which external display is attached, if any.
    fn set_external_kind(&mut self, kind: Option<ExternalKind>) {
        _ = kind;
    }
}

/// An external display (HDMI or wireless).
pub trait ExternalDisplay: Send {
    /// The attached display kind, or `None` when nothing is attached.
    fn attached(&self) -> Option<ExternalKind>;

    /// Whether the display finished mode negotiation and can be driven.
    fn is_configured(&self) -> bool;

    /// Completes an attach announced by a hotplug event.
    fn process_online(&mut self, event: &str) -> Result<()>;

    /// Handles a detach announced by a hotplug event.
    fn process_offline(&mut self) -> Result<()>;

    /// Switches the external vsync interrupt.
    fn enable_vsync(&mut self, enabled: bool) -> Result<()>;

    /// Commits the mirrored frame.
    fn commit(&mut self) -> Result<()>;

    /// Tears the external output down.
    fn teardown(&mut self);
}

/// An [`ExternalDisplay`] that is never attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExternalDisplay;

impl ExternalDisplay for NoExternalDisplay {
    fn attached(&self) -> Option<ExternalKind> {
        None
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn process_online(&mut self, _event: &str) -> Result<()> {
        Ok(())
    }

    fn process_offline(&mut self) -> Result<()> {
        Ok(())
    }

    fn enable_vsync(&mut self, _enabled: bool) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn teardown(&mut self) {}
}

/// Outcome of a bounded wait on a hardware completion signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Completion {
    /// The hardware signaled within the bound.
    Signaled,
    /// The bound expired first.
    TimedOut,
}

/// Which hardware completion signal a wait observes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompletionStage {
    /// The framebuffer post reached the display processor.
    Post,
    /// The panel switched to the new framebuffer.
    Pan,
}

impl fmt::Display for CompletionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Post => "post",
            Self::Pan => "pan",
        })
    }
}

/// Buffer swap and completion signals.
pub trait PresentationBackend: Send {
    /// Submits the composed frame in `target` for presentation.
    fn submit(&mut self, display: DisplayId, target: &PresentTarget) -> Result<()>;

    /// Waits up to `timeout` for the framebuffer post to complete.
    fn wait_for_post(&mut self, display: DisplayId, timeout: Duration) -> Completion;

    /// Waits up to `timeout` for the panel to pan to the new buffer.
    fn wait_for_pan(&mut self, display: DisplayId, timeout: Duration) -> Completion;
}

/// Switch for the primary display's vsync interrupt.
pub trait VsyncHardware: Send {
    /// Enables or disables vsync interrupt delivery.
    fn program(&mut self, enabled: bool) -> Result<()>;
}

/// Delivers vsync timestamps to the vsync loop.
pub trait VsyncSource: Send {
    /// Blocks up to `timeout` for the next vsync.
    ///
    /// Returns `Ok(None)` if the bound expired without a vsync.
    fn wait_for_vsync(&mut self, timeout: Duration) -> Result<Option<HostTime>>;
}

/// A hotplug notification for the external display.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HotplugEvent {
    /// A display was connected; carries the raw event payload.
    Online(String),
    /// The display was disconnected.
    Offline,
}

/// Produces hotplug events for the hotplug loop.
pub trait HotplugSource: Send {
    /// Blocks up to `timeout` for the next event.
    fn next_event(&mut self, timeout: Duration) -> Option<HotplugEvent>;
}

/// Notifications from the composer to its host.
pub trait ComposerCallbacks: Send + Sync {
    /// A vsync occurred on `display` at `timestamp`.
    fn vsync(&self, display: DisplayId, timestamp: HostTime);

    /// The host should start a new prepare/set cycle.
    fn invalidate(&self) {}
}

/// Shared slot for the registered callbacks, read by both loop threads.
#[derive(Default)]
pub(crate) struct CallbackSlot(RwLock<Option<Arc<dyn ComposerCallbacks>>>);

impl fmt::Debug for CallbackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSlot")
            .field("registered", &self.get().is_some())
            .finish()
    }
}

impl CallbackSlot {
    pub(crate) fn set(&self, callbacks: Arc<dyn ComposerCallbacks>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(callbacks);
    }

    pub(crate) fn get(&self) -> Option<Arc<dyn ComposerCallbacks>> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
