// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scriptable fakes for every composer collaborator.
//!
//! Each fake comes with a cloneable handle that stays with the test after the
//! fake itself moved into the composer. Handles change behavior between
//! cycles and read back state; every call lands in the shared [`Journal`].

use core::time::Duration;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use hwcomp_core::backend::{
    Completion, ComposerCallbacks, ExternalDisplay, ExternalKind, HotplugEvent, HotplugSource,
    OverlayEngine, OverlayState, PresentationBackend, VsyncHardware, VsyncSource,
};
use hwcomp_core::buffer::BufferRelease;
use hwcomp_core::display::{DisplayContext, DisplayId};
use hwcomp_core::error::{ComposerError, Result};
use hwcomp_core::layer::{BufferHandle, ContentKind, LayerComposition, LayerList, PresentTarget};
use hwcomp_core::strategy::{CompositionStrategy, GpuCopy, Strategy};
use hwcomp_core::time::HostTime;

use crate::journal::{Call, Journal};

/// Errno reported by scripted hardware failures (`EIO`).
pub const FAKE_ERRNO: i32 = 5;

fn scripted_failure() -> ComposerError {
    ComposerError::HardwareProgramming { errno: FAKE_ERRNO }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// --- Strategies ---

/// Which frames a [`ScriptedStrategy`] accepts, and which layers it takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    /// Accepts frames with a full-screen video layer and takes that layer.
    FullscreenVideo,
    /// Accepts frames with any video layer and takes every video layer.
    AnyVideo,
    /// Accepts every frame and takes every layer without the skip flag.
    Everything,
}

#[derive(Debug)]
struct StrategyKnobs {
    accepting: AtomicBool,
    failing_draw: AtomicBool,
}

/// Runtime controls of a [`ScriptedStrategy`].
#[derive(Clone, Debug)]
pub struct StrategyHandle {
    kind: CompositionStrategy,
    knobs: Arc<StrategyKnobs>,
}

impl StrategyHandle {
    /// The strategy's tag.
    #[must_use]
    pub fn kind(&self) -> CompositionStrategy {
        self.kind
    }

    /// Makes the strategy decline every frame (or accept again).
    pub fn set_accepting(&self, accepting: bool) {
        self.knobs.accepting.store(accepting, Ordering::Relaxed);
    }

    /// Makes every draw fail (or succeed again).
    pub fn set_failing_draw(&self, failing: bool) {
        self.knobs.failing_draw.store(failing, Ordering::Relaxed);
    }
}

/// A [`Strategy`] whose acceptance follows a [`Claim`] rule.
///
/// On acceptance it marks the claimed layers
/// [`Overlay`](LayerComposition::Overlay) and locks their buffers.
#[derive(Debug)]
pub struct ScriptedStrategy {
    kind: CompositionStrategy,
    claim: Claim,
    knobs: Arc<StrategyKnobs>,
    journal: Journal,
}

impl ScriptedStrategy {
    /// Creates a strategy for `kind` and its control handle.
    #[must_use]
    pub fn new(kind: CompositionStrategy, claim: Claim, journal: Journal) -> (Self, StrategyHandle) {
        let knobs = Arc::new(StrategyKnobs {
            accepting: AtomicBool::new(true),
            failing_draw: AtomicBool::new(false),
        });
        let handle = StrategyHandle {
            kind,
            knobs: knobs.clone(),
        };
        (
            Self {
                kind,
                claim,
                knobs,
                journal,
            },
            handle,
        )
    }

    fn accepts(&self, ctx: &DisplayContext) -> bool {
        if !self.knobs.accepting.load(Ordering::Relaxed) {
            return false;
        }
        let stats = ctx.stats();
        match self.claim {
            Claim::FullscreenVideo => stats.fullscreen_video,
            Claim::AnyVideo => stats.video_count > 0,
            Claim::Everything => stats.layer_count > stats.skip_count,
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn kind(&self) -> CompositionStrategy {
        self.kind
    }

    fn reset(&mut self, display: DisplayId) {
        self.journal.record(Call::StrategyReset(self.kind, display));
    }

    fn prepare(&mut self, ctx: &mut DisplayContext, layers: &mut LayerList) -> bool {
        let accepted = self.accepts(ctx);
        self.journal
            .record(Call::StrategyPrepare(self.kind, ctx.id(), accepted));
        if !accepted {
            return false;
        }
        let fullscreen_index = ctx.stats().first_video;
        for (index, layer) in layers.layers_mut().iter_mut().enumerate() {
            let take = match self.claim {
                Claim::FullscreenVideo => Some(index) == fullscreen_index,
                Claim::AnyVideo => layer.content == ContentKind::Video,
                Claim::Everything => !layer.flags.skip,
            };
            if take {
                layer.composition = LayerComposition::Overlay;
                if let Some(buffer) = layer.buffer {
                    ctx.buffers_mut().lock(buffer);
                }
            }
        }
        true
    }

    fn draw(&mut self, ctx: &mut DisplayContext, _layers: &LayerList) -> Result<()> {
        self.journal.record(Call::StrategyDraw(self.kind, ctx.id()));
        if self.knobs.failing_draw.load(Ordering::Relaxed) {
            return Err(scripted_failure());
        }
        Ok(())
    }
}

// --- GPU copy ---

/// Runtime controls of a [`FakeGpuCopy`].
#[derive(Clone, Debug)]
pub struct GpuCopyHandle {
    claiming: Arc<AtomicBool>,
}

impl GpuCopyHandle {
    /// Makes the engine claim opaque RGB layers (or nothing).
    pub fn set_claiming(&self, claiming: bool) {
        self.claiming.store(claiming, Ordering::Relaxed);
    }
}

/// A [`GpuCopy`] engine claiming opaque RGB layers without the skip flag.
#[derive(Debug)]
pub struct FakeGpuCopy {
    claiming: Arc<AtomicBool>,
    journal: Journal,
}

impl FakeGpuCopy {
    /// Creates an engine that starts out claiming nothing.
    #[must_use]
    pub fn new(journal: Journal) -> (Self, GpuCopyHandle) {
        let claiming = Arc::new(AtomicBool::new(false));
        (
            Self {
                claiming: claiming.clone(),
                journal,
            },
            GpuCopyHandle { claiming },
        )
    }
}

impl GpuCopy for FakeGpuCopy {
    fn prepare(&mut self, ctx: &mut DisplayContext, layers: &mut LayerList) -> bool {
        let mut claimed = false;
        if self.claiming.load(Ordering::Relaxed) {
            for layer in layers.layers_mut() {
                if layer.content == ContentKind::Rgb && !layer.flags.skip {
                    layer.composition = LayerComposition::GpuCopy;
                    claimed = true;
                }
            }
        }
        self.journal.record(Call::GpuCopyPrepare(ctx.id(), claimed));
        claimed
    }

    fn draw(
        &mut self,
        ctx: &mut DisplayContext,
        _layers: &LayerList,
        _target: &PresentTarget,
    ) -> Result<()> {
        self.journal.record(Call::GpuCopyDraw(ctx.id()));
        Ok(())
    }
}

// --- Overlay ---

/// Shared view of a [`FakeOverlay`].
#[derive(Clone, Debug)]
pub struct OverlayHandle {
    state: Arc<Mutex<OverlayState>>,
}

impl OverlayHandle {
    /// Current overlay state.
    #[must_use]
    pub fn state(&self) -> OverlayState {
        *lock(&self.state)
    }

    /// Forces the overlay into `state`, as a strategy would.
    pub fn force(&self, state: OverlayState) {
        *lock(&self.state) = state;
    }
}

/// An [`OverlayEngine`] that only tracks its state.
#[derive(Debug)]
pub struct FakeOverlay {
    state: Arc<Mutex<OverlayState>>,
    journal: Journal,
}

impl FakeOverlay {
    /// Creates a closed overlay.
    #[must_use]
    pub fn new(journal: Journal) -> (Self, OverlayHandle) {
        let state = Arc::new(Mutex::new(OverlayState::Closed));
        (
            Self {
                state: state.clone(),
                journal,
            },
            OverlayHandle { state },
        )
    }
}

impl OverlayEngine for FakeOverlay {
    fn state(&self) -> OverlayState {
        *lock(&self.state)
    }

    fn set_state(&mut self, state: OverlayState) -> Result<()> {
        self.journal.record(Call::Overlay(state));
        *lock(&self.state) = state;
        Ok(())
    }

    fn set_external_kind(&mut self, kind: Option<ExternalKind>) {
        self.journal.record(Call::OverlayExternal(kind));
    }
}

// --- External display ---

#[derive(Debug, Default)]
struct ExternalState {
    attached: Option<ExternalKind>,
    configured: bool,
    failing_vsync: bool,
    failing_commit: bool,
    last_online: Option<String>,
}

/// Shared view and controls of a [`FakeExternal`].
#[derive(Clone, Debug)]
pub struct ExternalHandle {
    state: Arc<Mutex<ExternalState>>,
}

impl ExternalHandle {
    /// Attaches a display of `kind`, configured or not, without a hotplug
    /// event.
    pub fn attach(&self, kind: ExternalKind, configured: bool) {
        let mut state = lock(&self.state);
        state.attached = Some(kind);
        state.configured = configured;
    }

    /// The attached kind.
    #[must_use]
    pub fn attached(&self) -> Option<ExternalKind> {
        lock(&self.state).attached
    }

    /// Payload of the last completed attach.
    #[must_use]
    pub fn last_online(&self) -> Option<String> {
        lock(&self.state).last_online.clone()
    }

    /// Makes external vsync programming fail (or succeed again).
    pub fn set_failing_vsync(&self, failing: bool) {
        lock(&self.state).failing_vsync = failing;
    }

    /// Makes the mirrored commit fail (or succeed again).
    pub fn set_failing_commit(&self, failing: bool) {
        lock(&self.state).failing_commit = failing;
    }
}

/// An [`ExternalDisplay`] that attaches configured HDMI on every online
/// event.
#[derive(Debug)]
pub struct FakeExternal {
    state: Arc<Mutex<ExternalState>>,
    journal: Journal,
}

impl FakeExternal {
    /// Creates a detached display.
    #[must_use]
    pub fn new(journal: Journal) -> (Self, ExternalHandle) {
        let state = Arc::new(Mutex::new(ExternalState::default()));
        (
            Self {
                state: state.clone(),
                journal,
            },
            ExternalHandle { state },
        )
    }
}

impl ExternalDisplay for FakeExternal {
    fn attached(&self) -> Option<ExternalKind> {
        lock(&self.state).attached
    }

    fn is_configured(&self) -> bool {
        lock(&self.state).configured
    }

    fn process_online(&mut self, event: &str) -> Result<()> {
        self.journal.record(Call::ExternalOnline);
        let mut state = lock(&self.state);
        state.attached = Some(ExternalKind::Hdmi);
        state.configured = true;
        state.last_online = Some(event.to_owned());
        Ok(())
    }

    fn process_offline(&mut self) -> Result<()> {
        self.journal.record(Call::ExternalOffline);
        let mut state = lock(&self.state);
        state.attached = None;
        state.configured = false;
        Ok(())
    }

    fn enable_vsync(&mut self, enabled: bool) -> Result<()> {
        self.journal.record(Call::ExternalVsync(enabled));
        if lock(&self.state).failing_vsync {
            return Err(scripted_failure());
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.journal.record(Call::ExternalCommit);
        if lock(&self.state).failing_commit {
            return Err(scripted_failure());
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.journal.record(Call::ExternalTeardown);
        let mut state = lock(&self.state);
        state.attached = None;
        state.configured = false;
    }
}

// --- Presentation ---

#[derive(Debug, Default)]
struct PresentationScript {
    posts: VecDeque<Completion>,
    pans: VecDeque<Completion>,
    failing_submit: bool,
    timeouts_seen: Vec<Duration>,
}

/// Controls of a [`FakePresentation`].
#[derive(Clone, Debug)]
pub struct PresentationHandle {
    script: Arc<Mutex<PresentationScript>>,
}

impl PresentationHandle {
    /// Queues the outcome of an upcoming post wait. Unscripted waits signal.
    pub fn script_post(&self, outcome: Completion) {
        lock(&self.script).posts.push_back(outcome);
    }

    /// Queues the outcome of an upcoming pan wait. Unscripted waits signal.
    pub fn script_pan(&self, outcome: Completion) {
        lock(&self.script).pans.push_back(outcome);
    }

    /// Makes submission fail (or succeed again).
    pub fn set_failing_submit(&self, failing: bool) {
        lock(&self.script).failing_submit = failing;
    }

    /// Bounds passed to every completion wait so far.
    #[must_use]
    pub fn timeouts_seen(&self) -> Vec<Duration> {
        lock(&self.script).timeouts_seen.clone()
    }
}

/// A [`PresentationBackend`] replaying scripted completions.
#[derive(Debug)]
pub struct FakePresentation {
    script: Arc<Mutex<PresentationScript>>,
    journal: Journal,
}

impl FakePresentation {
    /// Creates a backend whose waits all signal.
    #[must_use]
    pub fn new(journal: Journal) -> (Self, PresentationHandle) {
        let script = Arc::new(Mutex::new(PresentationScript::default()));
        (
            Self {
                script: script.clone(),
                journal,
            },
            PresentationHandle { script },
        )
    }
}

impl PresentationBackend for FakePresentation {
    fn submit(&mut self, display: DisplayId, _target: &PresentTarget) -> Result<()> {
        self.journal.record(Call::Submit(display));
        if lock(&self.script).failing_submit {
            return Err(scripted_failure());
        }
        Ok(())
    }

    fn wait_for_post(&mut self, display: DisplayId, timeout: Duration) -> Completion {
        self.journal.record(Call::WaitPost(display));
        let mut script = lock(&self.script);
        script.timeouts_seen.push(timeout);
        script.posts.pop_front().unwrap_or(Completion::Signaled)
    }

    fn wait_for_pan(&mut self, display: DisplayId, timeout: Duration) -> Completion {
        self.journal.record(Call::WaitPan(display));
        let mut script = lock(&self.script);
        script.timeouts_seen.push(timeout);
        script.pans.pop_front().unwrap_or(Completion::Signaled)
    }
}

// --- Vsync ---

/// Controls of a [`FakeVsyncHardware`].
#[derive(Clone, Debug)]
pub struct VsyncHardwareHandle {
    failing: Arc<AtomicBool>,
}

impl VsyncHardwareHandle {
    /// Makes interrupt programming fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

/// A [`VsyncHardware`] switch that journals every write.
#[derive(Debug)]
pub struct FakeVsyncHardware {
    failing: Arc<AtomicBool>,
    journal: Journal,
}

impl FakeVsyncHardware {
    /// Creates a switch that accepts every write.
    #[must_use]
    pub fn new(journal: Journal) -> (Self, VsyncHardwareHandle) {
        let failing = Arc::new(AtomicBool::new(false));
        (
            Self {
                failing: failing.clone(),
                journal,
            },
            VsyncHardwareHandle { failing },
        )
    }
}

impl VsyncHardware for FakeVsyncHardware {
    fn program(&mut self, enabled: bool) -> Result<()> {
        self.journal.record(Call::VsyncProgram(enabled));
        if self.failing.load(Ordering::Relaxed) {
            return Err(scripted_failure());
        }
        Ok(())
    }
}

/// A [`VsyncSource`] fed by the test through an mpsc channel.
#[derive(Debug)]
pub struct ChannelVsyncSource {
    rx: Receiver<HostTime>,
}

impl ChannelVsyncSource {
    /// Creates the source and the sender that feeds it.
    #[must_use]
    pub fn new() -> (Self, Sender<HostTime>) {
        let (tx, rx) = mpsc::channel();
        (Self { rx }, tx)
    }
}

impl VsyncSource for ChannelVsyncSource {
    fn wait_for_vsync(&mut self, timeout: Duration) -> Result<Option<HostTime>> {
        match self.rx.recv_timeout(timeout) {
            Ok(timestamp) => Ok(Some(timestamp)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // Nobody feeds us any more; behave like a silent panel.
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

// --- Hotplug ---

/// A [`HotplugSource`] fed by the test through an mpsc channel.
#[derive(Debug)]
pub struct ChannelHotplugSource {
    rx: Receiver<HotplugEvent>,
}

impl ChannelHotplugSource {
    /// Creates the source and the sender that feeds it.
    #[must_use]
    pub fn new() -> (Self, Sender<HotplugEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { rx }, tx)
    }
}

impl HotplugSource for ChannelHotplugSource {
    fn next_event(&mut self, timeout: Duration) -> Option<HotplugEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

// --- Host side ---

/// [`ComposerCallbacks`] that record what they receive.
#[derive(Debug, Default)]
pub struct RecordingCallbacks {
    vsyncs: Mutex<Vec<(DisplayId, HostTime)>>,
    invalidations: AtomicU32,
    arrived: Condvar,
}

impl RecordingCallbacks {
    /// Creates callbacks with nothing recorded.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every vsync delivered so far.
    #[must_use]
    pub fn vsyncs(&self) -> Vec<(DisplayId, HostTime)> {
        lock(&self.vsyncs).clone()
    }

    /// How many times a new cycle was requested.
    #[must_use]
    pub fn invalidations(&self) -> u32 {
        self.invalidations.load(Ordering::Acquire)
    }

    /// Waits up to `timeout` until at least `count` vsyncs arrived.
    ///
    /// Returns whether they did.
    pub fn wait_for_vsyncs(&self, count: usize, timeout: Duration) -> bool {
        let vsyncs = lock(&self.vsyncs);
        let (vsyncs, _) = self
            .arrived
            .wait_timeout_while(vsyncs, timeout, |v| v.len() < count)
            .unwrap_or_else(PoisonError::into_inner);
        vsyncs.len() >= count
    }

    /// Waits up to `timeout` until at least `count` invalidations arrived.
    ///
    /// Returns whether they did.
    pub fn wait_for_invalidations(&self, count: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.invalidations() < count {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

impl ComposerCallbacks for RecordingCallbacks {
    fn vsync(&self, display: DisplayId, timestamp: HostTime) {
        lock(&self.vsyncs).push((display, timestamp));
        self.arrived.notify_all();
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::AcqRel);
    }
}

/// A [`BufferRelease`] that journals every released buffer.
#[derive(Debug)]
pub struct JournalRelease {
    journal: Journal,
}

impl JournalRelease {
    /// Creates a releaser writing into `journal`.
    #[must_use]
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self { journal })
    }
}

impl BufferRelease for JournalRelease {
    fn release(&self, display: DisplayId, buffer: BufferHandle) {
        self.journal.record(Call::Release(display, buffer));
    }
}
