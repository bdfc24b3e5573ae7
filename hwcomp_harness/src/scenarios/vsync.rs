// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::time::Duration;
use std::thread;

use hwcomp_core::backend::ExternalKind;
use hwcomp_core::composer::Event;
use hwcomp_core::config::ComposerConfig;
use hwcomp_core::device::EVENT_VSYNC;
use hwcomp_core::display::DisplayId;
use hwcomp_core::error::{ComposerError, EINVAL};
use hwcomp_core::time::HostTime;
use hwcomp_core::vsync::{VsyncMode, VsyncTransition};

use super::standard_rig;
use crate::fakes::FAKE_ERRNO;
use crate::journal::Call;
use crate::rig::{Rig, RigBuilder};

const P: DisplayId = DisplayId::PRIMARY;
const DELIVERY: Duration = Duration::from_secs(5);

fn programs(rig: &Rig) -> usize {
    rig.journal.count(|c| matches!(c, Call::VsyncProgram(_)))
}

#[test]
fn repeated_enable_programs_hardware_once() {
    let mut rig = standard_rig();
    let composer = rig.composer_mut();
    assert_eq!(
        composer.event_control(P, Event::Vsync, true),
        Ok(VsyncTransition::Changed)
    );
    assert_eq!(
        composer.event_control(P, Event::Vsync, true),
        Ok(VsyncTransition::Redundant)
    );
    assert_eq!(composer.vsync_mode(), VsyncMode::Enabled);
    assert_eq!(programs(&rig), 1);

    rig.composer_mut()
        .event_control(P, Event::Vsync, false)
        .unwrap();
    rig.composer_mut()
        .event_control(P, Event::Vsync, false)
        .unwrap();
    assert_eq!(rig.composer().vsync_mode(), VsyncMode::Disabled);
    assert_eq!(programs(&rig), 2);
}

#[test]
fn disabling_while_disabled_is_redundant() {
    let mut rig = standard_rig();
    assert_eq!(
        rig.composer_mut().event_control(P, Event::Vsync, false),
        Ok(VsyncTransition::Redundant)
    );
    assert_eq!(programs(&rig), 0);
}

#[test]
fn programming_failure_is_returned_and_retried() {
    let mut rig = standard_rig();
    rig.vsync_hardware.set_failing(true);
    assert_eq!(
        rig.composer_mut().event_control(P, Event::Vsync, true),
        Err(ComposerError::HardwareProgramming { errno: FAKE_ERRNO })
    );
    assert_eq!(rig.composer().vsync_mode(), VsyncMode::Disabled);

    rig.vsync_hardware.set_failing(false);
    assert_eq!(
        rig.composer_mut().event_control(P, Event::Vsync, true),
        Ok(VsyncTransition::Changed),
        "a failed request is not remembered as applied"
    );
    assert_eq!(programs(&rig), 2);
}

#[test]
fn hdmi_display_mirrors_the_request() {
    let mut rig = standard_rig();
    rig.external.attach(ExternalKind::Hdmi, true);
    rig.composer_mut()
        .event_control(P, Event::Vsync, true)
        .unwrap();
    assert!(rig.journal.contains(&Call::ExternalVsync(true)));

    rig.external.set_failing_vsync(true);
    assert_eq!(
        rig.composer_mut().event_control(P, Event::Vsync, false),
        Err(ComposerError::HardwareProgramming { errno: FAKE_ERRNO }),
        "the external failure surfaces although the panel succeeded"
    );
    assert!(rig.journal.contains(&Call::VsyncProgram(false)));
}

#[test]
fn unconfigured_or_wireless_displays_are_not_mirrored() {
    let mut rig = standard_rig();
    rig.external.attach(ExternalKind::Hdmi, false);
    rig.composer_mut()
        .event_control(P, Event::Vsync, true)
        .unwrap();
    rig.external.attach(ExternalKind::Wifi, true);
    rig.composer_mut()
        .event_control(P, Event::Vsync, false)
        .unwrap();
    assert_eq!(
        rig.journal
            .count(|c| matches!(c, Call::ExternalVsync(_))),
        0
    );
}

#[test]
fn software_vsync_never_touches_hardware() {
    let mut rig = RigBuilder::new(ComposerConfig::gpu_only()).build().unwrap();
    rig.composer_mut()
        .event_control(P, Event::Vsync, true)
        .unwrap();
    assert_eq!(programs(&rig), 0);
    assert_eq!(rig.composer().vsync_mode(), VsyncMode::Enabled);
}

#[test]
fn loop_delivers_while_enabled_and_parks_when_disabled() {
    let mut rig = standard_rig();
    rig.register_callbacks().unwrap();

    rig.composer_mut()
        .event_control(P, Event::Vsync, true)
        .unwrap();
    rig.vsync_tx.send(HostTime(100)).unwrap();
    assert!(rig.callbacks.wait_for_vsyncs(1, DELIVERY), "enabled loop delivers");
    assert_eq!(rig.callbacks.vsyncs(), [(P, HostTime(100))]);

    rig.composer_mut()
        .event_control(P, Event::Vsync, false)
        .unwrap();
    // Let an in-flight wait run out so the loop is parked.
    thread::sleep(rig.composer().config().vsync_wait_timeout * 3);
    rig.vsync_tx.send(HostTime(200)).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(rig.callbacks.vsyncs().len(), 1, "parked loop stays quiet");

    rig.composer_mut()
        .event_control(P, Event::Vsync, true)
        .unwrap();
    assert!(
        rig.callbacks.wait_for_vsyncs(2, DELIVERY),
        "the queued vsync is delivered once re-enabled"
    );
    assert_eq!(rig.callbacks.vsyncs()[1], (P, HostTime(200)));
}

#[test]
fn raw_event_control_is_validated() {
    let mut rig = standard_rig();
    assert_eq!(rig.device.event_control(0, EVENT_VSYNC, 1), 0);
    assert_eq!(rig.device.event_control(0, EVENT_VSYNC, 1), 0, "redundant is success");
    assert_eq!(rig.device.event_control(0, 7, 1), -EINVAL);
    assert_eq!(rig.device.event_control(0, EVENT_VSYNC, 2), -EINVAL);
    assert_eq!(rig.device.event_control(-1, EVENT_VSYNC, 0), -EINVAL);
    assert_eq!(rig.device.event_control(1, EVENT_VSYNC, 0), -EINVAL);
    assert_eq!(rig.composer().vsync_mode(), VsyncMode::Enabled);

    rig.vsync_hardware.set_failing(true);
    assert_eq!(rig.device.event_control(0, EVENT_VSYNC, 0), -FAKE_ERRNO);
}
