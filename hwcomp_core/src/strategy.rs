// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition strategies and their priority chain.
//!
//! A [`Strategy`] is the collaborator behind one accelerated composition
//! path: it decides during prepare whether it can render the frame and
//! renders it during set. [`StrategyChain`] holds the registered strategies
//! in fixed priority order and asks them in turn; the first one to accept
//! claims the display for the frame.
//!
//! The GPU-copy engine is not a strategy. It claims individual layers next to
//! whichever strategy won (see [`GpuCopy`]).

use crate::display::{DisplayContext, DisplayId};
use crate::error::{ComposerError, Result};
use crate::layer::{LayerList, PresentTarget};

/// The composition path chosen for one display for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompositionStrategy {
    /// A full-screen video layer scanned out on an overlay pipe.
    VideoOverlay,
    /// Video on an overlay with a second picture-in-picture pipe.
    PictureInPicture,
    /// Video shown only on the external display.
    ExternalOnly,
    /// UI mirrored to the external display through the overlay.
    UiMirror,
    /// All layers composed by the display processor.
    HardwareComposition,
    /// Everything composed on the GPU.
    GpuFallback,
    /// The display is not composing.
    #[default]
    Closed,
}

impl CompositionStrategy {
    /// The accelerated strategies, highest priority first.
    pub const PRIORITY: [Self; 5] = [
        Self::VideoOverlay,
        Self::PictureInPicture,
        Self::ExternalOnly,
        Self::UiMirror,
        Self::HardwareComposition,
    ];

    /// Position in [`PRIORITY`](Self::PRIORITY), or `None` for the
    /// non-accelerated tags.
    #[must_use]
    pub fn priority(self) -> Option<usize> {
        Self::PRIORITY.iter().position(|s| *s == self)
    }

    /// Whether this strategy uses overlay or display-processor hardware.
    #[must_use]
    pub fn is_accelerated(self) -> bool {
        self.priority().is_some()
    }

    /// When this strategy's draw step runs during set.
    #[must_use]
    pub const fn default_draw_stage(self) -> DrawStage {
        match self {
            Self::UiMirror => DrawStage::AfterPost,
            _ => DrawStage::BeforeSwap,
        }
    }
}

/// Position of a draw step within the commit sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawStage {
    /// Before the frame is submitted.
    BeforeSwap,
    /// After the post-completion wait, next to the external commit.
    AfterPost,
}

/// One accelerated composition path.
pub trait Strategy: Send {
    /// Which tag this strategy claims frames under.
    fn kind(&self) -> CompositionStrategy;

    /// When the draw step runs. Defaults to the tag's usual stage.
    fn draw_stage(&self) -> DrawStage {
        self.kind().default_draw_stage()
    }

    /// Drops any state carried over from the previous frame on `display`.
    fn reset(&mut self, display: DisplayId);

    /// Decides whether this strategy renders the frame.
    ///
    /// On acceptance the strategy marks the layers it handles and locks the
    /// buffers it will scan out through [`DisplayContext::buffers_mut`].
    fn prepare(&mut self, ctx: &mut DisplayContext, layers: &mut LayerList) -> bool;

    /// Renders the frame claimed during prepare.
    fn draw(&mut self, ctx: &mut DisplayContext, layers: &LayerList) -> Result<()>;
}

/// The GPU-copy (blit engine) compositor.
pub trait GpuCopy: Send {
    /// Drops per-frame state for `display`.
    fn reset(&mut self, display: DisplayId) {
        _ = display;
    }

    /// Claims layers it can compose and marks them; returns whether any
    /// layer was claimed.
    fn prepare(&mut self, ctx: &mut DisplayContext, layers: &mut LayerList) -> bool;

    /// Composes the claimed layers into `target`.
    fn draw(
        &mut self,
        ctx: &mut DisplayContext,
        layers: &LayerList,
        target: &PresentTarget,
    ) -> Result<()>;
}

/// Registered strategies in priority order.
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl core::fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.kind()))
            .finish()
    }
}

impl StrategyChain {
    /// Builds a chain from `strategies`, ordering them by priority.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::Config`] if two strategies claim the same tag
    /// or a strategy claims a non-accelerated tag.
    pub fn new(mut strategies: Vec<Box<dyn Strategy>>) -> Result<Self> {
        if strategies.iter().any(|s| !s.kind().is_accelerated()) {
            return Err(ComposerError::Config(
                "strategies must claim an accelerated composition tag",
            ));
        }
        strategies.sort_by_key(|s| s.kind().priority());
        if strategies
            .windows(2)
            .any(|pair| pair[0].kind() == pair[1].kind())
        {
            return Err(ComposerError::Config("duplicate composition strategy"));
        }
        Ok(Self { strategies })
    }

    /// The registered tags, highest priority first.
    pub fn kinds(&self) -> impl Iterator<Item = CompositionStrategy> + '_ {
        self.strategies.iter().map(|s| s.kind())
    }

    /// Resets every strategy for `display`.
    pub fn reset(&mut self, display: DisplayId) {
        for strategy in &mut self.strategies {
            strategy.reset(display);
        }
    }

    /// Offers the frame to each strategy in priority order and returns the
    /// first tag that accepts it.
    pub fn select(
        &mut self,
        ctx: &mut DisplayContext,
        layers: &mut LayerList,
    ) -> Option<CompositionStrategy> {
        self.strategies
            .iter_mut()
            .find_map(|s| s.prepare(ctx, layers).then(|| s.kind()))
    }

    /// The strategy registered for `kind`, if any.
    pub fn get_mut(&mut self, kind: CompositionStrategy) -> Option<&mut (dyn Strategy + 'static)> {
        self.strategies
            .iter_mut()
            .find(|s| s.kind() == kind)
            .map(|s| &mut **s)
    }
}
