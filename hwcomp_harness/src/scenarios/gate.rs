// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::time::Duration;

use hwcomp_core::backend::{ExternalKind, HotplugEvent, OverlayState};
use hwcomp_core::config::ComposerConfig;
use hwcomp_core::display::DisplayId;
use hwcomp_core::error::EINVAL;
use hwcomp_core::strategy::CompositionStrategy;

use super::{primary, primary_bounds, standard_rig};
use crate::frames;
use crate::journal::Call;
use crate::rig::RigBuilder;

fn online() -> HotplugEvent {
    HotplugEvent::Online("change@/devices/virtual/switch/hdmi".into())
}

#[test]
fn attach_waits_for_three_layer_bypass_to_end() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);
    rig.overlay.force(OverlayState::Bypass3Layer);
    rig.composer().gate().post_hotplug(online());

    let mut lists = [Some(frames::video_frame(bounds, 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert!(!rig.journal.contains(&Call::ExternalOnline));
    assert!(primary(&rig).attach_pending(), "attach still pending");
    assert_eq!(
        primary(&rig).strategy(),
        CompositionStrategy::GpuFallback,
        "accelerated paths are held back while an attach is pending"
    );
    assert_eq!(rig.overlay.state(), OverlayState::Closed);
    rig.composer_mut().set(&lists).unwrap();

    let mut lists = [Some(frames::video_frame(bounds, 2))];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert!(rig.journal.contains(&Call::ExternalOnline));
    assert!(
        rig.journal
            .contains(&Call::OverlayExternal(Some(ExternalKind::Hdmi)))
    );
    assert!(!primary(&rig).attach_pending(), "attach consumed");
    assert_eq!(rig.external.attached(), Some(ExternalKind::Hdmi));
    assert_eq!(primary(&rig).strategy(), CompositionStrategy::VideoOverlay);
}

#[test]
fn newer_display_processors_attach_immediately() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp42())
        .standard_strategies()
        .build()
        .unwrap();
    rig.overlay.force(OverlayState::Bypass3Layer);
    rig.composer().gate().post_hotplug(online());
    let mut lists = [Some(frames::video_frame(primary_bounds(&rig), 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();

    assert!(rig.journal.contains(&Call::ExternalOnline));
    assert_eq!(
        rig.external.last_online().as_deref(),
        Some("change@/devices/virtual/switch/hdmi")
    );
    assert_eq!(primary(&rig).strategy(), CompositionStrategy::VideoOverlay);
}

#[test]
fn detach_is_always_consumed() {
    let mut rig = standard_rig();
    rig.external.attach(ExternalKind::Hdmi, true);
    rig.overlay.force(OverlayState::Bypass3Layer);
    rig.composer().gate().post_hotplug(HotplugEvent::Offline);

    let mut lists = [Some(frames::video_frame(primary_bounds(&rig), 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert!(rig.journal.contains(&Call::ExternalOffline));
    assert_eq!(rig.external.attached(), None);
    assert_eq!(primary(&rig).strategy(), CompositionStrategy::VideoOverlay);
}

#[test]
fn hotplug_loop_feeds_the_next_prepare() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp42())
        .standard_strategies()
        .hotplug()
        .build()
        .unwrap();
    rig.register_callbacks().unwrap();

    assert!(rig.send_hotplug(online()));
    assert!(
        rig.callbacks
            .wait_for_invalidations(1, Duration::from_secs(5)),
        "the loop asks for a new cycle"
    );
    assert!(rig.composer().gate().is_attach_pending());

    let mut lists = [Some(frames::video_frame(primary_bounds(&rig), 1)), None];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert_eq!(rig.external.attached(), Some(ExternalKind::Hdmi));
}

#[test]
fn blank_closes_the_display_whatever_it_was_doing() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);
    for frame in 1..=2 {
        let mut lists = [Some(frames::video_frame(bounds, frame))];
        rig.cycle(&mut lists).1.unwrap();
    }
    assert_eq!(primary(&rig).buffers().len(), 1);

    assert_eq!(rig.device.blank(0, 1), 0);
    let ctx = primary(&rig);
    assert_eq!(ctx.strategy(), CompositionStrategy::Closed);
    assert!(!ctx.overlay_in_use(), "blanked displays hold no overlay");
    assert!(ctx.buffers().is_empty(), "blanking releases every buffer");
    assert_eq!(rig.overlay.state(), OverlayState::Closed);

    assert_eq!(rig.device.blank(0, 0), 0, "unblank is a no-op");
    assert_eq!(primary(&rig).strategy(), CompositionStrategy::Closed);
    assert_eq!(rig.device.blank(0, 1), 0, "blanking twice is harmless");
}

#[test]
fn blank_rejects_unknown_displays() {
    let mut rig = standard_rig();
    assert_eq!(rig.device.blank(1, 1), -EINVAL);
    assert_eq!(rig.device.blank(-3, 1), -EINVAL);
    assert!(
        rig.composer()
            .display(DisplayId(1))
            .is_none(),
        "single-panel target"
    );
}
