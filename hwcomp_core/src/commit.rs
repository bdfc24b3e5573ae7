// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw, submit and completion sequencing: the set half of a cycle.

use tracing::{error, warn};

use crate::backend::{Completion, CompletionStage};
use crate::composer::{Composer, Pipeline};
use crate::config::ComposerConfig;
use crate::display::DisplayContext;
use crate::error::{ComposerError, Result};
use crate::layer::LayerList;
use crate::strategy::{CompositionStrategy, DrawStage};
use crate::trace::{
    BuffersReleasedEvent, CompletionEvent, CycleSummaryBuilder, DrawComponent, DrawEvent,
    ReleaseKind, SubmitEvent, Tracer,
};

/// One slot in the pre-swap draw sequence.
#[derive(Clone, Copy, Debug)]
enum DrawStep {
    Strategy(CompositionStrategy),
    GpuCopy,
}

/// Pre-swap draw order. Only the selected strategy's slot runs.
const DRAW_ORDER: [DrawStep; 6] = [
    DrawStep::Strategy(CompositionStrategy::VideoOverlay),
    DrawStep::Strategy(CompositionStrategy::PictureInPicture),
    DrawStep::Strategy(CompositionStrategy::ExternalOnly),
    DrawStep::Strategy(CompositionStrategy::UiMirror),
    DrawStep::GpuCopy,
    DrawStep::Strategy(CompositionStrategy::HardwareComposition),
];

/// Per-display commit bookkeeping threaded through the pipeline.
struct CommitScope<'a> {
    frame_index: u64,
    config: &'a ComposerConfig,
    tracer: &'a mut Tracer,
    summary: &'a mut CycleSummaryBuilder,
}

impl CommitScope<'_> {
    fn draw(&mut self, ctx: &DisplayContext, component: DrawComponent, result: &Result<()>) {
        if let Err(err) = result {
            warn!(display = ?ctx.id(), ?component, %err, "draw step failed");
        }
        self.summary.draw(result.is_ok());
        let frame_index = self.frame_index;
        self.tracer.draw(|at| DrawEvent {
            frame_index,
            display: ctx.id(),
            component,
            ok: result.is_ok(),
            at,
        });
    }

    fn completion(
        &mut self,
        ctx: &mut DisplayContext,
        stage: CompletionStage,
        outcome: Completion,
    ) -> Result<()> {
        self.summary.completion(outcome);
        let frame_index = self.frame_index;
        let id = ctx.id();
        self.tracer.completion(|at| CompletionEvent {
            frame_index,
            display: id,
            stage,
            outcome,
            at,
        });
        match outcome {
            Completion::Signaled => Ok(()),
            Completion::TimedOut => {
                error!(display = ?id, %stage, "completion wait timed out");
                ctx.hold_previous = true;
                Err(ComposerError::Timeout { display: id, stage })
            }
        }
    }
}

impl Composer {
    /// Renders and presents the frames prepared by the last
    /// [`prepare`](Self::prepare), then releases the previous frame's buffers.
    ///
    /// Each display with a list and a presentation target runs its draw steps,
    /// is submitted and, on overlay hardware, waits for the post and pan
    /// completions. A display without a list or a target is closed and its
    /// buffers are released. Failures on one display never stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::InvalidArgument`] (touching nothing) if there
    /// are more lists than display slots; otherwise the first per-display
    /// submission failure or completion timeout, after every display was
    /// processed.
    pub fn set(&mut self, lists: &[Option<LayerList>]) -> Result<()> {
        self.check_display_count(lists.len())?;
        let frame_index = self.frame_index;
        let mut first_error = None;
        let mut summaries = Vec::with_capacity(self.displays.len());

        for (index, ctx) in self.displays.iter_mut().enumerate() {
            let list = lists.get(index).and_then(Option::as_ref);
            if ctx.prepared_frame != Some(frame_index) {
                warn!(display = ?ctx.id(), frame_index, "set without a matching prepare");
            }
            ctx.hold_previous = false;
            let mut summary =
                CycleSummaryBuilder::new(frame_index, ctx.id(), ctx.strategy(), self.tracer.now());

            let committed = match list {
                Some(list) => {
                    let mut scope = CommitScope {
                        frame_index,
                        config: &self.config,
                        tracer: &mut self.tracer,
                        summary: &mut summary,
                    };
                    self.pipeline.commit(ctx, list, &mut scope)
                }
                None => Ok(()),
            };
            let close = match committed {
                Ok(()) => list.is_none(),
                Err(err @ ComposerError::InvalidDisplayState(_)) => {
                    warn!(%err, "closing display");
                    true
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                    false
                }
            };
            if close {
                let count = self.pipeline.close(ctx);
                summary.released(count);
                let id = ctx.id();
                self.tracer.buffers_released(|at| BuffersReleasedEvent {
                    frame_index,
                    display: id,
                    kind: ReleaseKind::All,
                    count,
                    at,
                });
            }
            summaries.push(summary);
        }

        // Staggered release across every display, including those without a
        // list this cycle.
        for (index, ctx) in self.displays.iter_mut().enumerate() {
            if ctx.hold_previous {
                continue;
            }
            let count = ctx.buffers_mut().unlock_previous();
            if let Some(summary) = summaries.get_mut(index) {
                summary.released(count);
            }
            if count > 0 {
                let display = ctx.id();
                self.tracer.buffers_released(|at| BuffersReleasedEvent {
                    frame_index,
                    display,
                    kind: ReleaseKind::Previous,
                    count,
                    at,
                });
            }
        }

        if self.tracer.is_active() {
            for summary in summaries {
                let finished = self.tracer.now();
                self.tracer.cycle_summary(&summary.finish(finished));
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Pipeline {
    /// Draws, submits and waits for one display.
    ///
    /// Fails with [`ComposerError::InvalidDisplayState`] before touching any
    /// collaborator if the list has no presentation target.
    fn commit(
        &mut self,
        ctx: &mut DisplayContext,
        list: &LayerList,
        scope: &mut CommitScope<'_>,
    ) -> Result<()> {
        let display = ctx.id();
        let Some(target) = list.target() else {
            return Err(ComposerError::InvalidDisplayState(display));
        };

        for step in DRAW_ORDER {
            match step {
                DrawStep::Strategy(kind) => {
                    if ctx.strategy() != kind {
                        continue;
                    }
                    let Some(strategy) = self.chain.get_mut(kind) else {
                        continue;
                    };
                    if strategy.draw_stage() != DrawStage::BeforeSwap {
                        continue;
                    }
                    let result = strategy.draw(ctx, list);
                    scope.draw(ctx, DrawComponent::Strategy(kind), &result);
                }
                DrawStep::GpuCopy => {
                    if !ctx.gpu_copy_in_use() {
                        continue;
                    }
                    let Some(gpu_copy) = &mut self.gpu_copy else {
                        continue;
                    };
                    let result = gpu_copy.draw(ctx, list, target);
                    scope.draw(ctx, DrawComponent::GpuCopy, &result);
                }
            }
        }

        let submitted = self.presentation.submit(display, target);
        let frame_index = scope.frame_index;
        let ok = submitted.is_ok();
        scope.tracer.submit(|at| SubmitEvent {
            frame_index,
            display,
            ok,
            at,
        });
        if let Err(err) = submitted {
            error!(display = ?ctx.id(), %err, "frame submission failed");
            return Err(err);
        }

        if !scope.config.has_overlay {
            return Ok(());
        }

        let post = self
            .presentation
            .wait_for_post(display, scope.config.post_timeout);
        scope.completion(ctx, CompletionStage::Post, post)?;

        // Mirroring and the external commit only start once the post landed.
        if let Some(strategy) = self.chain.get_mut(ctx.strategy())
            && strategy.draw_stage() == DrawStage::AfterPost
        {
            let kind = strategy.kind();
            let result = strategy.draw(ctx, list);
            scope.draw(ctx, DrawComponent::Strategy(kind), &result);
        }
        if self.external.attached().is_some() {
            let result = self.external.commit();
            scope.draw(ctx, DrawComponent::ExternalCommit, &result);
        }

        let pan = self
            .presentation
            .wait_for_pan(display, scope.config.pan_timeout);
        scope.completion(ctx, CompletionStage::Pan, pan)
    }
}
