// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The composer: one per open display device.
//!
//! [`Composer`] owns a [`DisplayContext`] per configured display slot, the
//! collaborator pipeline, the vsync state machine and the helper threads.
//! The frame producer drives it with [`prepare`](Composer::prepare) and
//! [`set`](Composer::set) once per refresh cycle; the remaining entry points
//! may be called between cycles from the same thread.

use core::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::backend::{
    CallbackSlot, ComposerCallbacks, ExternalDisplay, HotplugSource, OverlayEngine, OverlayState,
    PresentationBackend, VsyncHardware, VsyncSource,
};
use crate::buffer::{BufferLockSet, BufferRelease};
use crate::config::ComposerConfig;
use crate::display::{DisplayContext, DisplayId};
use crate::error::{ComposerError, Result};
use crate::gate::SessionGate;
use crate::hotplug::HotplugLoop;
use crate::strategy::{GpuCopy, Strategy, StrategyChain};
use crate::trace::{BuffersReleasedEvent, ReleaseKind, Tracer, VsyncControlEvent};
use crate::vsync::{VsyncControl, VsyncLoop, VsyncMode, VsyncTransition};

/// Events a host can switch on and off through
/// [`event_control`](Composer::event_control).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Per-refresh vsync callbacks.
    Vsync,
}

impl TryFrom<i32> for Event {
    type Error = ComposerError;

    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Vsync),
            _ => Err(ComposerError::invalid_argument("event", raw)),
        }
    }
}

/// Parameters readable through [`query`](Composer::query).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryParam {
    /// Whether a background layer is supported (always `0`).
    BackgroundLayerSupported,
    /// Refresh period in nanoseconds.
    VsyncPeriod,
}

impl TryFrom<i32> for QueryParam {
    type Error = ComposerError;

    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Self::BackgroundLayerSupported),
            1 => Ok(Self::VsyncPeriod),
            _ => Err(ComposerError::invalid_argument("query parameter", raw)),
        }
    }
}

/// Everything the composer delegates to the platform.
pub struct Collaborators {
    /// Accelerated strategies, in any order.
    pub strategies: Vec<Box<dyn Strategy>>,
    /// The GPU-copy compositor, if the target has one.
    pub gpu_copy: Option<Box<dyn GpuCopy>>,
    /// Overlay hardware.
    pub overlay: Box<dyn OverlayEngine>,
    /// External display driver.
    pub external: Box<dyn ExternalDisplay>,
    /// Buffer swap and completion signals.
    pub presentation: Box<dyn PresentationBackend>,
    /// Vsync interrupt switch.
    pub vsync_hardware: Box<dyn VsyncHardware>,
    /// Timestamps for the vsync loop.
    pub vsync_source: Box<dyn VsyncSource>,
    /// Hotplug events for the hotplug loop, if the target reports them.
    pub hotplug_source: Option<Box<dyn HotplugSource>>,
    /// Hands released buffers back to their producer.
    pub buffer_release: Arc<dyn BufferRelease>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("strategies", &self.strategies.len())
            .field("gpu_copy", &self.gpu_copy.is_some())
            .field("hotplug_source", &self.hotplug_source.is_some())
            .finish_non_exhaustive()
    }
}

/// Collaborators used during prepare and set.
pub(crate) struct Pipeline {
    pub(crate) chain: StrategyChain,
    pub(crate) gpu_copy: Option<Box<dyn GpuCopy>>,
    pub(crate) overlay: Box<dyn OverlayEngine>,
    pub(crate) external: Box<dyn ExternalDisplay>,
    pub(crate) presentation: Box<dyn PresentationBackend>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("chain", &self.chain)
            .field("overlay", &self.overlay.state())
            .field("external", &self.external.attached())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Moves the overlay to `Closed`. Failures are logged, not returned.
    pub(crate) fn idle_overlay(&mut self) {
        if let Err(err) = self.overlay.set_state(OverlayState::Closed) {
            warn!(%err, "failed to idle overlay");
        }
    }

    /// Idles the overlay, closes `ctx` and releases everything it holds.
    ///
    /// Returns the number of released buffers.
    pub(crate) fn close(&mut self, ctx: &mut DisplayContext) -> usize {
        self.idle_overlay();
        ctx.mark_closed();
        ctx.buffers_mut().unlock_all()
    }
}

#[derive(Debug, Default)]
struct Loops {
    vsync: Option<VsyncLoop>,
    hotplug: Option<HotplugLoop>,
}

struct Sources {
    vsync: Option<Box<dyn VsyncSource>>,
    hotplug: Option<Box<dyn HotplugSource>>,
}

impl fmt::Debug for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sources")
            .field("vsync", &self.vsync.is_some())
            .field("hotplug", &self.hotplug.is_some())
            .finish()
    }
}

/// Per-device composition engine.
#[derive(Debug)]
pub struct Composer {
    pub(crate) config: ComposerConfig,
    pub(crate) displays: Vec<DisplayContext>,
    pub(crate) pipeline: Pipeline,
    pub(crate) gate: Arc<SessionGate>,
    pub(crate) tracer: Tracer,
    pub(crate) frame_index: u64,
    vsync: VsyncControl,
    callbacks: Arc<CallbackSlot>,
    sources: Sources,
    loops: Loops,
}

impl Composer {
    /// Creates a composer for `config` driving `collaborators`.
    ///
    /// No thread is started until [`register_callbacks`](Self::register_callbacks).
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::Config`] if the configuration or the strategy
    /// set is unusable.
    pub fn new(config: ComposerConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let Collaborators {
            strategies,
            gpu_copy,
            overlay,
            external,
            presentation,
            vsync_hardware,
            vsync_source,
            hotplug_source,
            buffer_release,
        } = collaborators;

        let chain = StrategyChain::new(strategies)?;
        let gate = Arc::new(SessionGate::new());
        let displays = (0_u32..)
            .map(DisplayId)
            .zip(config.displays())
            .map(|(id, bounds)| {
                let buffers = BufferLockSet::new(id, buffer_release.clone());
                DisplayContext::new(id, bounds, gate.clone(), buffers)
            })
            .collect::<Vec<_>>();

        info!(
            displays = displays.len(),
            mdp = ?config.mdp_version,
            overlay = config.has_overlay,
            hardware_vsync = config.hardware_vsync,
            strategies = ?chain,
            "composer created"
        );

        Ok(Self {
            vsync: VsyncControl::new(vsync_hardware, config.hardware_vsync),
            config,
            displays,
            pipeline: Pipeline {
                chain,
                gpu_copy,
                overlay,
                external,
                presentation,
            },
            gate,
            tracer: Tracer::none(),
            frame_index: 0,
            callbacks: Arc::new(CallbackSlot::default()),
            sources: Sources {
                vsync: Some(vsync_source),
                hotplug: hotplug_source,
            },
            loops: Loops::default(),
        })
    }

    /// The configuration the composer was built with.
    #[must_use]
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Every display context, primary first.
    #[must_use]
    pub fn displays(&self) -> &[DisplayContext] {
        &self.displays
    }

    /// The context of `display`, if the slot exists.
    #[must_use]
    pub fn display(&self, display: DisplayId) -> Option<&DisplayContext> {
        self.displays.get(display.index())
    }

    /// The device-wide secure/attach gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    /// Enters or leaves a secure content session.
    pub fn set_secure_session(&self, active: bool) {
        info!(active, "secure session");
        self.gate.set_secure_session(active);
    }

    /// Number of prepare calls so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Current overlay hardware state.
    #[must_use]
    pub fn overlay_state(&self) -> OverlayState {
        self.pipeline.overlay.state()
    }

    /// The last vsync request that was fully applied.
    #[must_use]
    pub fn vsync_mode(&self) -> VsyncMode {
        self.vsync.mode()
    }

    /// Installs a tracer receiving every subsequent cycle event.
    pub fn set_tracer(&mut self, tracer: Tracer) {
        self.tracer = tracer;
    }

    /// Registers the host callbacks and starts the helper threads.
    ///
    /// Registering again replaces the callbacks; the threads keep running.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::HardwareProgramming`] if a thread could not
    /// be spawned.
    pub fn register_callbacks(&mut self, callbacks: Arc<dyn ComposerCallbacks>) -> Result<()> {
        self.callbacks.set(callbacks);

        if self.loops.vsync.is_none()
            && let Some(source) = self.sources.vsync.take()
        {
            self.loops.vsync = Some(VsyncLoop::spawn(
                self.vsync.state().clone(),
                source,
                self.callbacks.clone(),
                DisplayId::PRIMARY,
                self.config.vsync_wait_timeout,
            )?);
            debug!("vsync loop started");
        }

        if self.loops.hotplug.is_none()
            && let Some(source) = self.sources.hotplug.take()
        {
            self.loops.hotplug = Some(HotplugLoop::spawn(
                source,
                self.gate.clone(),
                self.callbacks.clone(),
                self.config.hotplug_poll_timeout,
            )?);
            debug!("hotplug loop started");
        }
        Ok(())
    }

    /// Switches `event` delivery for `display`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::InvalidArgument`] for an unknown display and
    /// the programming failure reported by [`VsyncControl::enable`].
    pub fn event_control(
        &mut self,
        display: DisplayId,
        event: Event,
        enabled: bool,
    ) -> Result<VsyncTransition> {
        self.check_display(display)?;
        match event {
            Event::Vsync => {
                let outcome = self.vsync.enable(enabled, self.pipeline.external.as_mut());
                self.tracer.vsync_control(|at| VsyncControlEvent {
                    enabled,
                    redundant: outcome == Ok(VsyncTransition::Redundant),
                    ok: outcome.is_ok(),
                    at,
                });
                outcome
            }
        }
    }

    /// Blanks or unblanks `display`.
    ///
    /// Blanking idles the overlay, closes the display and releases every
    /// buffer it holds. Unblanking does nothing; the next prepare selects a
    /// strategy as usual.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::InvalidArgument`] for an unknown display.
    pub fn blank(&mut self, display: DisplayId, blank: bool) -> Result<()> {
        self.check_display(display)?;
        if !blank {
            return Ok(());
        }
        let ctx = &mut self.displays[display.index()];
        let count = self.pipeline.close(ctx);
        info!(display = ?ctx.id(), released = count, "display blanked");
        let frame_index = self.frame_index;
        self.tracer.buffers_released(|at| BuffersReleasedEvent {
            frame_index,
            display,
            kind: ReleaseKind::All,
            count,
            at,
        });
        Ok(())
    }

    /// Reads a device parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::Config`] if the vsync period does not fit the
    /// integer contract.
    pub fn query(&self, param: QueryParam) -> Result<i32> {
        match param {
            QueryParam::BackgroundLayerSupported => Ok(0),
            QueryParam::VsyncPeriod => {
                let period = i32::try_from(self.config.vsync_period_nanos())
                    .map_err(|_| ComposerError::Config("vsync period exceeds i32"))?;
                debug!(fps = self.config.fps, period, "vsync period queried");
                Ok(period)
            }
        }
    }

    pub(crate) fn check_display(&self, id: DisplayId) -> Result<()> {
        if id.index() < self.displays.len() {
            Ok(())
        } else {
            error!(display = ?id, slots = self.displays.len(), "unknown display");
            Err(ComposerError::invalid_argument("display", id.0))
        }
    }

    pub(crate) fn check_display_count(&self, count: usize) -> Result<()> {
        if count <= self.displays.len() {
            Ok(())
        } else {
            error!(count, slots = self.displays.len(), "more layer lists than displays");
            Err(ComposerError::invalid_argument(
                "display count",
                i64::try_from(count).unwrap_or(i64::MAX),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_events_decode() {
        assert_eq!(Event::try_from(0), Ok(Event::Vsync));
        assert_eq!(
            Event::try_from(3),
            Err(ComposerError::invalid_argument("event", 3))
        );
    }

    #[test]
    fn raw_query_params_decode() {
        assert_eq!(
            QueryParam::try_from(0),
            Ok(QueryParam::BackgroundLayerSupported)
        );
        assert_eq!(QueryParam::try_from(1), Ok(QueryParam::VsyncPeriod));
        assert!(QueryParam::try_from(-1).is_err());
        assert!(QueryParam::try_from(2).is_err());
    }
}
