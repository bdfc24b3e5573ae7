// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A composer device wired to fakes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use hwcomp_core::backend::{HotplugEvent, HotplugSource};
use hwcomp_core::composer::{Collaborators, Composer};
use hwcomp_core::config::ComposerConfig;
use hwcomp_core::device::{COMPOSER_DEVICE_NAME, ComposerDevice};
use hwcomp_core::error::Result;
use hwcomp_core::layer::LayerList;
use hwcomp_core::strategy::{CompositionStrategy, GpuCopy, Strategy};
use hwcomp_core::time::HostTime;

use crate::fakes::{
    ChannelHotplugSource, ChannelVsyncSource, Claim, ExternalHandle, FakeExternal, FakeGpuCopy,
    FakeOverlay, FakePresentation, FakeVsyncHardware, GpuCopyHandle, JournalRelease,
    OverlayHandle, PresentationHandle, RecordingCallbacks, ScriptedStrategy, StrategyHandle,
    VsyncHardwareHandle,
};
use crate::journal::Journal;

/// Claim rule each strategy gets from [`RigBuilder::standard_strategies`].
///
/// [`ExternalOnly`](CompositionStrategy::ExternalOnly) and
/// [`UiMirror`](CompositionStrategy::UiMirror) start out declining; they only
/// make sense with an external display, so tests switch them on through
/// [`StrategyHandle::set_accepting`].
pub const STANDARD_CLAIMS: [(CompositionStrategy, Claim); 5] = [
    (CompositionStrategy::VideoOverlay, Claim::FullscreenVideo),
    (CompositionStrategy::PictureInPicture, Claim::AnyVideo),
    (CompositionStrategy::ExternalOnly, Claim::AnyVideo),
    (CompositionStrategy::UiMirror, Claim::Everything),
    (CompositionStrategy::HardwareComposition, Claim::Everything),
];

fn needs_external(kind: CompositionStrategy) -> bool {
    matches!(
        kind,
        CompositionStrategy::ExternalOnly | CompositionStrategy::UiMirror
    )
}

/// Builds a [`Rig`].
#[derive(Debug)]
pub struct RigBuilder {
    config: ComposerConfig,
    strategies: Vec<(CompositionStrategy, Claim, bool)>,
    gpu_copy: bool,
    hotplug: bool,
}

impl RigBuilder {
    /// Starts a rig for `config` with no strategies.
    #[must_use]
    pub fn new(config: ComposerConfig) -> Self {
        Self {
            config,
            strategies: Vec::new(),
            gpu_copy: false,
            hotplug: false,
        }
    }

    /// Registers a scripted strategy.
    #[must_use]
    pub fn strategy(mut self, kind: CompositionStrategy, claim: Claim) -> Self {
        self.strategies.push((kind, claim, true));
        self
    }

    /// Registers one scripted strategy per accelerated tag, with
    /// [`STANDARD_CLAIMS`].
    #[must_use]
    pub fn standard_strategies(mut self) -> Self {
        self.strategies
            .extend(STANDARD_CLAIMS.map(|(kind, claim)| (kind, claim, !needs_external(kind))));
        self
    }

    /// Adds a GPU-copy engine.
    #[must_use]
    pub fn gpu_copy(mut self) -> Self {
        self.gpu_copy = true;
        self
    }

    /// Adds a hotplug source.
    #[must_use]
    pub fn hotplug(mut self) -> Self {
        self.hotplug = true;
        self
    }

    /// Opens the device.
    ///
    /// # Errors
    ///
    /// Returns any error of [`ComposerDevice::open`].
    pub fn build(self) -> Result<Rig> {
        let journal = Journal::new();

        let mut strategies: Vec<Box<dyn Strategy>> = Vec::with_capacity(self.strategies.len());
        let mut handles = BTreeMap::new();
        for (kind, claim, accepting) in self.strategies {
            let (strategy, handle) = ScriptedStrategy::new(kind, claim, journal.clone());
            handle.set_accepting(accepting);
            strategies.push(Box::new(strategy));
            handles.insert(kind, handle);
        }

        let (gpu_copy, gpu_copy_handle) = if self.gpu_copy {
            let (engine, handle) = FakeGpuCopy::new(journal.clone());
            (Some(Box::new(engine) as Box<dyn GpuCopy>), Some(handle))
        } else {
            (None, None)
        };

        let (overlay, overlay_handle) = FakeOverlay::new(journal.clone());
        let (external, external_handle) = FakeExternal::new(journal.clone());
        let (presentation, presentation_handle) = FakePresentation::new(journal.clone());
        let (vsync_hardware, vsync_handle) = FakeVsyncHardware::new(journal.clone());
        let (vsync_source, vsync_tx) = ChannelVsyncSource::new();
        let (hotplug_source, hotplug_tx) = if self.hotplug {
            let (source, tx) = ChannelHotplugSource::new();
            (Some(Box::new(source) as Box<dyn HotplugSource>), Some(tx))
        } else {
            (None, None)
        };

        let collaborators = Collaborators {
            strategies,
            gpu_copy,
            overlay: Box::new(overlay),
            external: Box::new(external),
            presentation: Box::new(presentation),
            vsync_hardware: Box::new(vsync_hardware),
            vsync_source: Box::new(vsync_source),
            hotplug_source,
            buffer_release: JournalRelease::new(journal.clone()),
        };
        let device = ComposerDevice::open(COMPOSER_DEVICE_NAME, self.config, collaborators)?;

        Ok(Rig {
            device,
            journal,
            strategies: handles,
            gpu_copy: gpu_copy_handle,
            overlay: overlay_handle,
            external: external_handle,
            presentation: presentation_handle,
            vsync_hardware: vsync_handle,
            vsync_tx,
            hotplug_tx,
            callbacks: RecordingCallbacks::new(),
        })
    }
}

/// An open [`ComposerDevice`] plus handles on every fake behind it.
#[derive(Debug)]
pub struct Rig {
    /// The device under test.
    pub device: ComposerDevice,
    /// Every collaborator call, in order.
    pub journal: Journal,
    /// Controls of the registered strategies.
    pub strategies: BTreeMap<CompositionStrategy, StrategyHandle>,
    /// Controls of the GPU-copy engine, if one was added.
    pub gpu_copy: Option<GpuCopyHandle>,
    /// The overlay hardware.
    pub overlay: OverlayHandle,
    /// The external display.
    pub external: ExternalHandle,
    /// Completion scripting.
    pub presentation: PresentationHandle,
    /// The primary vsync switch.
    pub vsync_hardware: VsyncHardwareHandle,
    /// Feeds the vsync loop.
    pub vsync_tx: Sender<HostTime>,
    /// Feeds the hotplug loop, if a hotplug source was added.
    pub hotplug_tx: Option<Sender<HotplugEvent>>,
    /// Host callbacks, registered by [`register_callbacks`](Self::register_callbacks).
    pub callbacks: Arc<RecordingCallbacks>,
}

impl Rig {
    /// The composer behind the device.
    #[must_use]
    pub fn composer(&self) -> &Composer {
        self.device.composer()
    }

    /// Mutable access to the composer behind the device.
    pub fn composer_mut(&mut self) -> &mut Composer {
        self.device.composer_mut()
    }

    /// Controls of the strategy registered under `kind`.
    ///
    /// # Panics
    ///
    /// Panics if no such strategy was registered.
    #[must_use]
    pub fn strategy(&self, kind: CompositionStrategy) -> &StrategyHandle {
        &self.strategies[&kind]
    }

    /// Registers [`callbacks`](Self::callbacks) and starts the helper
    /// threads.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Composer::register_callbacks`].
    pub fn register_callbacks(&mut self) -> Result<()> {
        let callbacks = self.callbacks.clone();
        self.composer_mut().register_callbacks(callbacks)
    }

    /// Runs prepare then set on `lists`, returning both results.
    pub fn cycle(&mut self, lists: &mut [Option<LayerList>]) -> (Result<()>, Result<()>) {
        let prepared = self.composer_mut().prepare(lists);
        let set = self.composer_mut().set(lists);
        (prepared, set)
    }

    /// Sends an HDMI hotplug event through the hotplug loop.
    ///
    /// Returns `false` if the rig has no hotplug source or the loop is gone.
    pub fn send_hotplug(&self, event: HotplugEvent) -> bool {
        self.hotplug_tx
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }
}
