// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated composer session exercising every decision path.
//!
//! Drives a dual-display composer built from the harness fakes through video
//! playback, an HDMI attach, UI mirroring, a post timeout, a secure session
//! and a blank. Cycle events go to a
//! [`PrettyPrintSink`](hwcomp_debug::pretty::PrettyPrintSink) on stdout and a
//! [`Recording`](hwcomp_debug::recorder::Recording) that is exported as
//! Chrome trace JSON (first argument, default `hwcomp-trace.json`).
//! Diagnostics from the composer itself go to stderr through
//! `tracing-subscriber`.

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Stdout};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use hwcomp_core::backend::{Completion, HotplugEvent};
use hwcomp_core::composer::Event;
use hwcomp_core::config::ComposerConfig;
use hwcomp_core::display::DisplayId;
use hwcomp_core::layer::LayerList;
use hwcomp_core::strategy::CompositionStrategy;
use hwcomp_core::time::HostTime;
use hwcomp_core::trace::{
    BuffersReleasedEvent, CompletionEvent, CycleSummary, DrawEvent, StrategySelectedEvent,
    SubmitEvent, TraceSink, Tracer, VsyncControlEvent,
};
use hwcomp_debug::chrome;
use hwcomp_debug::pretty::PrettyPrintSink;
use hwcomp_debug::recorder::{RecorderSink, Recording};
use hwcomp_harness::{Rig, RigBuilder, frames};

/// Forwards every event to two sinks.
struct Tee<A, B>(A, B);

impl<A: TraceSink, B: TraceSink> TraceSink for Tee<A, B> {
    fn on_strategy_selected(&mut self, e: &StrategySelectedEvent) {
        self.0.on_strategy_selected(e);
        self.1.on_strategy_selected(e);
    }

    fn on_draw(&mut self, e: &DrawEvent) {
        self.0.on_draw(e);
        self.1.on_draw(e);
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        self.0.on_submit(e);
        self.1.on_submit(e);
    }

    fn on_completion(&mut self, e: &CompletionEvent) {
        self.0.on_completion(e);
        self.1.on_completion(e);
    }

    fn on_buffers_released(&mut self, e: &BuffersReleasedEvent) {
        self.0.on_buffers_released(e);
        self.1.on_buffers_released(e);
    }

    fn on_vsync_control(&mut self, e: &VsyncControlEvent) {
        self.0.on_vsync_control(e);
        self.1.on_vsync_control(e);
    }

    fn on_cycle_summary(&mut self, s: &CycleSummary) {
        self.0.on_cycle_summary(s);
        self.1.on_cycle_summary(s);
    }
}

fn clock() -> HostTime {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let elapsed = EPOCH.get_or_init(Instant::now).elapsed();
    HostTime(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
}

/// Runs one prepare/set cycle and prints the outcome per display.
fn cycle(rig: &mut Rig, label: &str, mut lists: Vec<Option<LayerList>>) {
    let (prepared, set) = rig.cycle(&mut lists);
    let strategies: Vec<CompositionStrategy> = rig
        .composer()
        .displays()
        .iter()
        .map(|ctx| ctx.strategy())
        .collect();
    println!("== {label}: strategies={strategies:?} prepare={prepared:?} set={set:?}");
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hwcomp-trace.json".to_owned());

    let mut rig = RigBuilder::new(ComposerConfig::mdp42())
        .standard_strategies()
        .gpu_copy()
        .hotplug()
        .build()?;
    let recording = Recording::new();
    let sink: Tee<PrettyPrintSink<Stdout>, RecorderSink> =
        Tee(PrettyPrintSink::with_writer(std::io::stdout()), recording.sink());
    rig.composer_mut().set_tracer(Tracer::new(Box::new(sink), clock));
    rig.register_callbacks()?;

    let config = *rig.composer().config();
    let panel = config.primary;
    let hdmi = config.external.ok_or("mdp42 preset has an external slot")?;

    // Vsync on; the fake source delivers three ticks one period apart.
    rig.composer_mut()
        .event_control(DisplayId::PRIMARY, Event::Vsync, true)?;
    for tick in 1..=3 {
        rig.vsync_tx.send(HostTime(tick * config.vsync_period_nanos()))?;
    }
    if rig.callbacks.wait_for_vsyncs(3, Duration::from_secs(1)) {
        println!("== vsync: {:?}", rig.callbacks.vsyncs());
    }

    let mut frame = 0;
    let mut next = || {
        frame += 1;
        frame
    };

    for _ in 0..3 {
        let f = next();
        cycle(&mut rig, "video playback", vec![Some(frames::video_frame(panel, f)), None]);
    }

    rig.send_hotplug(HotplugEvent::Online("change@/devices/virtual/switch/hdmi".into()));
    rig.callbacks.wait_for_invalidations(1, Duration::from_secs(1));
    let f = next();
    cycle(&mut rig, "hdmi attach", vec![Some(frames::ui_frame(panel, f, 3)), None]);

    rig.strategy(CompositionStrategy::UiMirror).set_accepting(true);
    let f = next();
    cycle(
        &mut rig,
        "ui mirror",
        vec![Some(frames::ui_frame(panel, f, 2)), Some(frames::ui_frame(hdmi, f, 1))],
    );

    rig.presentation.script_post(Completion::TimedOut);
    let f = next();
    cycle(&mut rig, "post timeout", vec![Some(frames::ui_frame(panel, f, 2)), None]);

    rig.composer().set_secure_session(true);
    for _ in 0..2 {
        let f = next();
        cycle(&mut rig, "secure session", vec![Some(frames::video_frame(panel, f)), None]);
    }
    rig.composer().set_secure_session(false);

    rig.gpu_copy
        .as_ref()
        .ok_or("rig was built with a GPU-copy engine")?
        .set_claiming(true);
    rig.strategy(CompositionStrategy::HardwareComposition)
        .set_accepting(false);
    rig.strategy(CompositionStrategy::UiMirror).set_accepting(false);
    let f = next();
    cycle(&mut rig, "gpu copy", vec![Some(frames::ui_frame(panel, f, 2)), None]);

    rig.composer_mut().blank(DisplayId::PRIMARY, true)?;
    rig.composer_mut()
        .event_control(DisplayId::PRIMARY, Event::Vsync, false)?;

    let events = recording.drain();
    let mut writer = BufWriter::new(File::create(&output)?);
    chrome::export(&events, &mut writer)?;
    println!("== wrote {} events to {output}", events.len());
    Ok(())
}
