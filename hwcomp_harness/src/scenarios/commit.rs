// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use hwcomp_core::backend::{Completion, CompletionStage, ExternalKind, OverlayState};
use hwcomp_core::config::ComposerConfig;
use hwcomp_core::display::DisplayId;
use hwcomp_core::error::{ComposerError, ETIMEDOUT};
use hwcomp_core::strategy::CompositionStrategy;
use hwcomp_core::time::HostTime;
use hwcomp_core::trace::{DrawComponent, ReleaseKind, Tracer};
use hwcomp_debug::recorder::{RecordedEvent, Recording};

use super::{index_of, primary, primary_bounds, standard_rig};
use crate::fakes::FAKE_ERRNO;
use crate::frames::{self, buffer};
use crate::journal::Call;
use crate::rig::RigBuilder;

const P: DisplayId = DisplayId::PRIMARY;

#[test]
fn draw_then_submit_then_post_then_pan() {
    let mut rig = standard_rig();
    let mut lists = [Some(frames::video_frame(primary_bounds(&rig), 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();
    rig.journal.take();
    rig.composer_mut().set(&lists).unwrap();

    let calls = rig.journal.take();
    let draw = index_of(&calls, &Call::StrategyDraw(CompositionStrategy::VideoOverlay, P));
    let submit = index_of(&calls, &Call::Submit(P));
    let post = index_of(&calls, &Call::WaitPost(P));
    let pan = index_of(&calls, &Call::WaitPan(P));
    assert!(draw < submit && submit < post && post < pan, "{calls:?}");
    assert!(
        !calls.contains(&Call::ExternalCommit),
        "nothing attached, nothing to commit"
    );

    let config = rig.composer().config();
    assert_eq!(
        rig.presentation.timeouts_seen(),
        [config.post_timeout, config.pan_timeout],
        "both waits are bounded by the configured timeouts"
    );
}

#[test]
fn only_the_selected_strategy_draws() {
    let mut rig = standard_rig();
    let mut lists = [Some(frames::ui_frame(primary_bounds(&rig), 1, 2))];
    rig.cycle(&mut lists).1.unwrap();

    let draws: Vec<_> = rig
        .journal
        .snapshot()
        .into_iter()
        .filter(|call| matches!(call, Call::StrategyDraw(..)))
        .collect();
    assert_eq!(
        draws,
        [Call::StrategyDraw(CompositionStrategy::HardwareComposition, P)]
    );
}

#[test]
fn gpu_copy_draws_before_submission() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp40())
        .gpu_copy()
        .build()
        .unwrap();
    rig.gpu_copy.as_ref().unwrap().set_claiming(true);
    let mut lists = [Some(frames::ui_frame(primary_bounds(&rig), 1, 1))];
    rig.cycle(&mut lists).1.unwrap();

    let calls = rig.journal.snapshot();
    assert!(
        index_of(&calls, &Call::GpuCopyDraw(P)) < index_of(&calls, &Call::Submit(P)),
        "{calls:?}"
    );
}

#[test]
fn targets_without_overlay_skip_completion_waits() {
    let mut rig = RigBuilder::new(ComposerConfig::gpu_only()).build().unwrap();
    let mut lists = [Some(frames::ui_frame(primary_bounds(&rig), 1, 1))];
    rig.cycle(&mut lists).1.unwrap();

    assert!(rig.journal.contains(&Call::Submit(P)));
    assert_eq!(
        rig.journal
            .count(|c| matches!(c, Call::WaitPost(_) | Call::WaitPan(_))),
        0
    );
}

#[test]
fn mirror_draw_and_external_commit_follow_the_post() {
    let mut rig = standard_rig();
    rig.external.attach(ExternalKind::Hdmi, true);
    rig.strategy(CompositionStrategy::UiMirror).set_accepting(true);
    let mut lists = [Some(frames::ui_frame(primary_bounds(&rig), 1, 2))];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert_eq!(primary(&rig).strategy(), CompositionStrategy::UiMirror);
    rig.journal.take();

    rig.composer_mut().set(&lists).unwrap();
    let calls = rig.journal.take();
    let submit = index_of(&calls, &Call::Submit(P));
    let post = index_of(&calls, &Call::WaitPost(P));
    let mirror = index_of(&calls, &Call::StrategyDraw(CompositionStrategy::UiMirror, P));
    let commit = index_of(&calls, &Call::ExternalCommit);
    let pan = index_of(&calls, &Call::WaitPan(P));
    assert!(submit < post, "{calls:?}");
    assert!(post < mirror && post < commit, "{calls:?}");
    assert!(mirror < pan && commit < pan, "{calls:?}");
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, Call::StrategyDraw(..)))
            .count(),
        1,
        "the mirror draws once, after the post"
    );
}

#[test]
fn previous_frame_buffers_are_released_after_the_next_submission() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);

    let mut lists = [Some(frames::video_frame(bounds, 1))];
    rig.cycle(&mut lists).1.unwrap();
    assert!(
        rig.journal.take().iter().all(|c| !matches!(c, Call::Release(..))),
        "frame 1 is still on screen"
    );

    let mut lists = [Some(frames::video_frame(bounds, 2))];
    rig.cycle(&mut lists).1.unwrap();
    let calls = rig.journal.take();
    let released = index_of(&calls, &Call::Release(P, buffer(1, 0)));
    assert!(index_of(&calls, &Call::Submit(P)) < released, "{calls:?}");
    assert!(
        !calls.contains(&Call::Release(P, buffer(2, 0))),
        "frame 2 is still in flight"
    );
    assert_eq!(primary(&rig).buffers().previous(), &[buffer(2, 0)]);

    let mut lists = [Some(frames::video_frame(bounds, 3))];
    rig.cycle(&mut lists).1.unwrap();
    assert_eq!(rig.journal.released(P), [buffer(2, 0)]);
}

#[test]
fn reused_buffer_is_not_released_while_still_shown() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);
    for _ in 0..3 {
        let mut lists = [Some(frames::video_frame(bounds, 7))];
        rig.cycle(&mut lists).1.unwrap();
    }
    assert!(
        rig.journal.released(P).is_empty(),
        "the same buffer was relocked every frame"
    );
    assert_eq!(primary(&rig).buffers().len(), 1);
}

#[test]
fn missing_target_closes_the_display_instead_of_drawing() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);
    let mut lists = [Some(frames::video_frame(bounds, 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert!(primary(&rig).overlay_in_use(), "prepared for the overlay");

    lists[0].as_mut().unwrap().set_target(None);
    rig.journal.take();
    assert_eq!(rig.device.set(&lists), 0);

    let calls = rig.journal.take();
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, Call::StrategyDraw(..) | Call::Submit(_))),
        "{calls:?}"
    );
    assert!(calls.contains(&Call::Overlay(OverlayState::Closed)));
    assert!(calls.contains(&Call::Release(P, buffer(1, 0))));
    let ctx = primary(&rig);
    assert_eq!(ctx.strategy(), CompositionStrategy::Closed);
    assert!(ctx.buffers().is_empty(), "every buffer went back");
}

#[test]
fn a_broken_display_does_not_stop_the_others() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp42())
        .standard_strategies()
        .build()
        .unwrap();
    let config = *rig.composer().config();
    let mut lists = [
        Some(frames::ui_frame(config.primary, 1, 1)),
        Some(frames::ui_frame(config.external.unwrap(), 1, 1)),
    ];
    rig.composer_mut().prepare(&mut lists).unwrap();
    lists[0].as_mut().unwrap().set_target(None);
    rig.composer_mut().set(&lists).unwrap();

    assert!(!rig.journal.contains(&Call::Submit(P)));
    assert!(rig.journal.contains(&Call::Submit(DisplayId(1))));
    assert!(rig.journal.contains(&Call::WaitPan(DisplayId(1))));
}

#[test]
fn post_timeout_is_reported_and_holds_buffers() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);
    rig.presentation.script_post(Completion::TimedOut);

    let mut lists = [Some(frames::video_frame(bounds, 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert_eq!(rig.device.set(&lists), -ETIMEDOUT);
    assert!(
        !rig.journal.contains(&Call::WaitPan(P)),
        "the cycle stops at the failed wait"
    );

    let mut lists = [Some(frames::video_frame(bounds, 2))];
    let (_, set) = rig.cycle(&mut lists);
    set.unwrap();
    assert!(
        rig.journal.released(P).is_empty(),
        "frame 1 may still be scanning out"
    );

    let mut lists = [Some(frames::video_frame(bounds, 3))];
    rig.cycle(&mut lists).1.unwrap();
    assert_eq!(rig.journal.released(P), [buffer(1, 0), buffer(2, 0)]);
}

#[test]
fn pan_timeout_names_the_stage() {
    let mut rig = standard_rig();
    rig.presentation.script_pan(Completion::TimedOut);
    let mut lists = [Some(frames::video_frame(primary_bounds(&rig), 1))];
    let (_, set) = rig.cycle(&mut lists);
    assert_eq!(
        set,
        Err(ComposerError::Timeout {
            display: P,
            stage: CompletionStage::Pan
        })
    );
}

#[test]
fn failed_submission_skips_the_waits() {
    let mut rig = standard_rig();
    rig.presentation.set_failing_submit(true);
    let mut lists = [Some(frames::video_frame(primary_bounds(&rig), 1))];
    let (_, set) = rig.cycle(&mut lists);
    assert_eq!(
        set,
        Err(ComposerError::HardwareProgramming { errno: FAKE_ERRNO })
    );
    assert!(!rig.journal.contains(&Call::WaitPost(P)));
}

#[test]
fn failed_draw_is_logged_not_fatal() {
    let mut rig = standard_rig();
    rig.strategy(CompositionStrategy::VideoOverlay)
        .set_failing_draw(true);
    rig.external.attach(ExternalKind::Hdmi, true);
    rig.external.set_failing_commit(true);
    let mut lists = [Some(frames::video_frame(primary_bounds(&rig), 1))];
    let (_, set) = rig.cycle(&mut lists);
    set.unwrap();
    assert!(rig.journal.contains(&Call::Submit(P)));
    assert!(rig.journal.contains(&Call::WaitPan(P)));
}

fn fixed_clock() -> HostTime {
    HostTime(1_000)
}

#[test]
fn cycle_is_traced() {
    let mut rig = standard_rig();
    let recording = Recording::new();
    rig.composer_mut()
        .set_tracer(Tracer::new(Box::new(recording.sink()), fixed_clock));

    let bounds = primary_bounds(&rig);
    for frame in 1..=2 {
        let mut lists = [Some(frames::video_frame(bounds, frame))];
        rig.cycle(&mut lists).1.unwrap();
    }

    let events = recording.snapshot();
    assert!(events.iter().all(|e| e.frame_index().is_some()), "{events:?}");
    assert!(events.iter().any(|e| matches!(
        e,
        RecordedEvent::Draw(d)
            if d.component == DrawComponent::Strategy(CompositionStrategy::VideoOverlay) && d.ok
    )));
    let released: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RecordedEvent::BuffersReleased(r) => Some((r.frame_index, r.kind, r.count)),
            _ => None,
        })
        .collect();
    assert_eq!(released, [(2, ReleaseKind::Previous, 1)]);

    let summaries: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RecordedEvent::CycleSummary(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1].strategy, CompositionStrategy::VideoOverlay);
    assert_eq!(summaries[1].draws, 1);
    assert_eq!(summaries[1].released, 1);
    assert!(!summaries[1].timed_out, "every wait signaled");
}
