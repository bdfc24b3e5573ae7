// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use hwcomp_core::backend::NoExternalDisplay;
use hwcomp_core::composer::Collaborators;
use hwcomp_core::config::ComposerConfig;
use hwcomp_core::device::{
    COMPOSER_DEVICE_NAME, ComposerDevice, QUERY_BACKGROUND_LAYER_SUPPORTED, QUERY_VSYNC_PERIOD,
};
use hwcomp_core::error::{ComposerError, EINVAL};
use hwcomp_core::layer::LayerList;
use hwcomp_core::strategy::{CompositionStrategy, Strategy};

use super::{primary_bounds, standard_rig};
use crate::fakes::{
    ChannelVsyncSource, Claim, FakeOverlay, FakePresentation, FakeVsyncHardware, JournalRelease,
    ScriptedStrategy,
};
use crate::frames;
use crate::journal::Journal;
use crate::rig::RigBuilder;

fn collaborators(strategies: &[CompositionStrategy]) -> Collaborators {
    let journal = Journal::new();
    Collaborators {
        strategies: strategies
            .iter()
            .map(|kind| {
                let (strategy, _) =
                    ScriptedStrategy::new(*kind, Claim::Everything, journal.clone());
                Box::new(strategy) as Box<dyn Strategy>
            })
            .collect(),
        gpu_copy: None,
        overlay: Box::new(FakeOverlay::new(journal.clone()).0),
        external: Box::new(NoExternalDisplay),
        presentation: Box::new(FakePresentation::new(journal.clone()).0),
        vsync_hardware: Box::new(FakeVsyncHardware::new(journal.clone()).0),
        vsync_source: Box::new(ChannelVsyncSource::new().0),
        hotplug_source: None,
        buffer_release: JournalRelease::new(journal),
    }
}

#[test]
fn only_the_composer_device_opens() {
    let err = ComposerDevice::open("gpu0", ComposerConfig::mdp40(), collaborators(&[]))
        .unwrap_err();
    assert_eq!(err, ComposerError::UnknownDevice("gpu0".into()));
    assert_eq!(err.status(), -EINVAL);

    ComposerDevice::open(COMPOSER_DEVICE_NAME, ComposerConfig::mdp40(), collaborators(&[]))
        .unwrap()
        .close();
}

#[test]
fn unusable_setups_are_rejected_at_open() {
    let mut zero_fps = ComposerConfig::mdp40();
    zero_fps.fps = 0;
    assert!(matches!(
        ComposerDevice::open(COMPOSER_DEVICE_NAME, zero_fps, collaborators(&[])),
        Err(ComposerError::Config(_))
    ));

    let duplicated = collaborators(&[
        CompositionStrategy::UiMirror,
        CompositionStrategy::UiMirror,
    ]);
    assert!(matches!(
        ComposerDevice::open(COMPOSER_DEVICE_NAME, ComposerConfig::mdp40(), duplicated),
        Err(ComposerError::Config(_))
    ));

    let fallback = collaborators(&[CompositionStrategy::GpuFallback]);
    assert!(matches!(
        ComposerDevice::open(COMPOSER_DEVICE_NAME, ComposerConfig::mdp40(), fallback),
        Err(ComposerError::Config(_))
    ));
}

#[test]
fn queries_report_through_the_out_parameter() {
    let rig = standard_rig();
    let mut value = -1;
    assert_eq!(rig.device.query(QUERY_VSYNC_PERIOD, &mut value), 0);
    assert_eq!(value, 16_666_666, "60 Hz");

    assert_eq!(rig.device.query(QUERY_BACKGROUND_LAYER_SUPPORTED, &mut value), 0);
    assert_eq!(value, 0);

    value = 42;
    assert_eq!(rig.device.query(9, &mut value), -EINVAL);
    assert_eq!(value, 42, "untouched on failure");
}

#[test]
fn prepare_and_set_report_integer_status() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);

    let mut lists = [Some(frames::video_frame(bounds, 1))];
    assert_eq!(rig.device.prepare(&mut lists), 0);
    assert_eq!(rig.device.set(&lists), 0);

    let mut too_many = [None, None];
    assert_eq!(rig.device.prepare(&mut too_many), -EINVAL);
    assert_eq!(rig.device.set(&too_many), -EINVAL);

    let mut nothing: [Option<LayerList>; 0] = [];
    assert_eq!(rig.device.prepare(&mut nothing), 0, "no displays to prepare");
}

#[test]
fn callbacks_register_once_and_close_joins_the_loops() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp42())
        .standard_strategies()
        .hotplug()
        .build()
        .unwrap();
    let callbacks = rig.callbacks.clone();
    assert_eq!(rig.device.register_callbacks(callbacks.clone()), 0);
    assert_eq!(
        rig.device.register_callbacks(callbacks),
        0,
        "registering again only swaps the callbacks"
    );
    assert_eq!(rig.device.close(), 0);
}
