// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strategy selection: the prepare half of a cycle.

use tracing::{debug, info, warn};

use crate::backend::{HotplugEvent, OverlayState};
use crate::composer::{Composer, Pipeline};
use crate::config::MdpVersion;
use crate::display::DisplayContext;
use crate::error::Result;
use crate::layer::{LayerComposition, LayerList, LayerStats};
use crate::strategy::CompositionStrategy;
use crate::trace::{BuffersReleasedEvent, ReleaseKind, StrategySelectedEvent, Tracer};

impl Composer {
    /// Selects a composition strategy for every display that has a list.
    ///
    /// `lists[i]` belongs to display slot `i`; `None`, an empty list or a
    /// slot past the end of `lists` means the display has nothing to show
    /// and is closed. Every layer's [`LayerComposition`] is updated so the
    /// caller knows which layers it must still compose on the GPU.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::InvalidArgument`] if there are more lists than
    /// display slots. No display is touched in that case.
    ///
    /// [`ComposerError::InvalidArgument`]: crate::error::ComposerError::InvalidArgument
    pub fn prepare(&mut self, lists: &mut [Option<LayerList>]) -> Result<()> {
        self.check_display_count(lists.len())?;
        self.frame_index += 1;
        let frame_index = self.frame_index;

        if self.gate.is_secure_session() {
            self.prepare_secure(lists);
            return Ok(());
        }

        let attached = self.pipeline.external.attached();
        self.pipeline.overlay.set_external_kind(attached);
        self.complete_pending_hotplug();
        let attach_blocked = self.gate.pending_is_online();
        if attach_blocked {
            debug!("external attach pending; accelerated composition held back");
        }

        // Slots past the end of `lists` have no list this cycle.
        for (index, ctx) in self.displays.iter_mut().enumerate() {
            ctx.begin_frame(frame_index);
            match lists.get_mut(index).and_then(Option::as_mut) {
                Some(list) if !list.is_empty() => {
                    self.pipeline.select(ctx, list, attach_blocked);
                }
                _ => {
                    let count = self.pipeline.close(ctx);
                    let display = ctx.id();
                    self.tracer.buffers_released(|at| BuffersReleasedEvent {
                        frame_index,
                        display,
                        kind: ReleaseKind::All,
                        count,
                        at,
                    });
                }
            }
            report_selection(&mut self.tracer, frame_index, ctx);
        }
        Ok(())
    }

    /// Secure session: no strategy runs, the external output is torn down.
    fn prepare_secure(&mut self, lists: &mut [Option<LayerList>]) {
        let frame_index = self.frame_index;
        for (index, ctx) in self.displays.iter_mut().enumerate() {
            ctx.begin_frame(frame_index);
            self.pipeline.reset(ctx);
            match lists.get_mut(index).and_then(Option::as_mut) {
                Some(list) if !list.is_empty() => {
                    mark_all(list, LayerComposition::Gpu);
                    ctx.stats = LayerStats::gather(list, ctx.bounds());
                    ctx.strategy = CompositionStrategy::GpuFallback;
                }
                _ => {
                    self.pipeline.close(ctx);
                }
            }
            report_selection(&mut self.tracer, frame_index, ctx);
        }

        self.pipeline.idle_overlay();
        if self.pipeline.external.attached().is_some() {
            info!("secure session: tearing down external display");
            self.pipeline.external.teardown();
        }
    }

    /// Consumes a pending hotplug event once the hardware can take it.
    ///
    /// Attach completes once the display processor is at least MDP 4.2 or the
    /// overlay left three-layer bypass; detach is always consumed.
    fn complete_pending_hotplug(&mut self) {
        let ready = self.config.mdp_version >= MdpVersion::V4_2
            || self.pipeline.overlay.state() != OverlayState::Bypass3Layer;
        let Some(event) = self
            .gate
            .take_pending_with(|event| ready || *event == HotplugEvent::Offline)
        else {
            return;
        };

        let external = &mut self.pipeline.external;
        let outcome = match &event {
            HotplugEvent::Online(payload) => external.process_online(payload),
            HotplugEvent::Offline => external.process_offline(),
        };
        match outcome {
            Ok(()) => info!(?event, attached = ?external.attached(), "hotplug event processed"),
            Err(err) => warn!(%err, ?event, "hotplug event failed"),
        }
        let attached = external.attached();
        self.pipeline.overlay.set_external_kind(attached);
    }
}

impl Pipeline {
    /// Drops per-frame strategy and GPU-copy state for `ctx`'s display.
    pub(crate) fn reset(&mut self, ctx: &DisplayContext) {
        self.chain.reset(ctx.id());
        if let Some(gpu_copy) = &mut self.gpu_copy {
            gpu_copy.reset(ctx.id());
        }
    }

    /// Runs the selection chain for one display with a non-empty list.
    pub(crate) fn select(
        &mut self,
        ctx: &mut DisplayContext,
        list: &mut LayerList,
        attach_blocked: bool,
    ) {
        self.reset(ctx);
        ctx.stats = LayerStats::gather(list, ctx.bounds());

        mark_all(list, LayerComposition::Gpu);
        ctx.gpu_copy_in_use = match &mut self.gpu_copy {
            Some(gpu_copy) => gpu_copy.prepare(ctx, list),
            None => false,
        };

        let claimed = if attach_blocked {
            None
        } else {
            self.chain.select(ctx, list)
        };

        match claimed {
            Some(strategy) => {
                ctx.strategy = strategy;
                ctx.overlay_in_use = true;
            }
            None => {
                ctx.strategy = CompositionStrategy::GpuFallback;
                ctx.overlay_in_use = false;
                self.idle_overlay();
            }
        }

        // A strategy may have taken over layers the GPU-copy engine claimed.
        ctx.gpu_copy_in_use &= list
            .layers()
            .iter()
            .any(|layer| layer.composition == LayerComposition::GpuCopy);
        ctx.mixed_composition = ctx.overlay_in_use && list.needs_gpu();
    }
}

fn mark_all(list: &mut LayerList, composition: LayerComposition) {
    for layer in list.layers_mut() {
        layer.composition = composition;
    }
}

fn report_selection(tracer: &mut Tracer, frame_index: u64, ctx: &DisplayContext) {
    debug!(
        display = ?ctx.id(),
        strategy = ?ctx.strategy(),
        overlay = ctx.overlay_in_use(),
        mixed = ctx.mixed_composition(),
        "strategy selected"
    );
    tracer.strategy_selected(|at| StrategySelectedEvent {
        frame_index,
        display: ctx.id(),
        strategy: ctx.strategy(),
        overlay_in_use: ctx.overlay_in_use(),
        mixed_composition: ctx.mixed_composition(),
        at,
    });
}
