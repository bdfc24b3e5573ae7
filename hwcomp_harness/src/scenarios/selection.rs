// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use hwcomp_core::backend::{ExternalKind, OverlayState};
use hwcomp_core::config::ComposerConfig;
use hwcomp_core::display::DisplayId;
use hwcomp_core::error::ComposerError;
use hwcomp_core::layer::{LayerComposition, LayerList};
use hwcomp_core::strategy::CompositionStrategy;

use super::{layers, prepares, primary, primary_bounds, standard_rig};
use crate::fakes::Claim;
use crate::frames::{self, buffer};
use crate::journal::Call;
use crate::rig::RigBuilder;

#[test]
fn fullscreen_video_takes_the_overlay() {
    let mut rig = standard_rig();
    let mut lists = [Some(frames::video_frame(primary_bounds(&rig), 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();

    let ctx = primary(&rig);
    assert_eq!(ctx.strategy(), CompositionStrategy::VideoOverlay);
    assert!(ctx.overlay_in_use(), "video overlay uses the overlay");
    assert!(ctx.mixed_composition(), "the UI layer still needs the GPU");
    assert_eq!(ctx.buffers().current(), &[buffer(1, 0)]);

    let compositions: Vec<_> = layers(&lists, 0)
        .layers()
        .iter()
        .map(|layer| layer.composition)
        .collect();
    assert_eq!(
        compositions,
        [LayerComposition::Overlay, LayerComposition::Gpu]
    );
}

#[test]
fn chain_runs_in_priority_order_and_stops_at_first_claim() {
    let mut rig = standard_rig();
    let mut lists = [Some(frames::windowed_video_frame(primary_bounds(&rig), 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();

    assert_eq!(
        primary(&rig).strategy(),
        CompositionStrategy::PictureInPicture
    );
    assert_eq!(
        prepares(&rig.journal.snapshot()),
        [
            (CompositionStrategy::VideoOverlay, false),
            (CompositionStrategy::PictureInPicture, true),
        ],
        "lower-priority strategies are never asked once one claims"
    );
}

#[test]
fn registration_order_does_not_change_the_outcome() {
    let mut reversed = RigBuilder::new(ComposerConfig::mdp40())
        .strategy(CompositionStrategy::HardwareComposition, Claim::Everything)
        .strategy(CompositionStrategy::PictureInPicture, Claim::AnyVideo)
        .strategy(CompositionStrategy::VideoOverlay, Claim::FullscreenVideo)
        .build()
        .unwrap();
    let bounds = reversed.composer().config().primary;

    for frame in 1..=3 {
        let mut lists = [Some(frames::video_frame(bounds, frame))];
        reversed.composer_mut().prepare(&mut lists).unwrap();
        assert_eq!(
            primary(&reversed).strategy(),
            CompositionStrategy::VideoOverlay,
            "frame {frame}"
        );
        reversed.composer_mut().set(&lists).unwrap();
    }
}

#[test]
fn every_strategy_is_reset_every_frame() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);
    for frame in 1..=2 {
        let mut lists = [Some(frames::ui_frame(bounds, frame, 2))];
        rig.composer_mut().prepare(&mut lists).unwrap();
    }
    let resets = rig
        .journal
        .count(|call| matches!(call, Call::StrategyReset(_, DisplayId::PRIMARY)));
    assert_eq!(resets, 2 * CompositionStrategy::PRIORITY.len());
}

#[test]
fn declined_frame_falls_back_and_idles_the_overlay() {
    let mut rig = standard_rig();
    rig.overlay.force(OverlayState::VideoPanel);
    let mut lists = [Some(frames::skip_frame(primary_bounds(&rig), 1))];
    rig.composer_mut().prepare(&mut lists).unwrap();

    let ctx = primary(&rig);
    assert_eq!(ctx.strategy(), CompositionStrategy::GpuFallback);
    assert!(!ctx.overlay_in_use(), "nothing claimed the overlay");
    assert!(!ctx.mixed_composition(), "GPU-only frames are not mixed");
    assert_eq!(rig.overlay.state(), OverlayState::Closed);
    assert!(
        layers(&lists, 0)
            .layers()
            .iter()
            .all(|layer| layer.composition == LayerComposition::Gpu)
    );
}

#[test]
fn empty_list_closes_the_display_and_releases_everything() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);
    let mut lists = [Some(frames::video_frame(bounds, 1))];
    let (prepared, set) = rig.cycle(&mut lists);
    prepared.unwrap();
    set.unwrap();
    assert!(
        rig.journal.released(DisplayId::PRIMARY).is_empty(),
        "frame 1 buffers are still on screen"
    );

    let mut lists = [Some(LayerList::new())];
    assert_eq!(rig.device.prepare(&mut lists), 0);

    let ctx = primary(&rig);
    assert_eq!(ctx.strategy(), CompositionStrategy::Closed);
    assert!(!ctx.overlay_in_use(), "closed displays hold no overlay");
    assert!(ctx.buffers().is_empty(), "closing releases every buffer");
    assert_eq!(rig.journal.released(DisplayId::PRIMARY), [buffer(1, 0)]);
    assert_eq!(rig.overlay.state(), OverlayState::Closed);
}

#[test]
fn absent_list_closes_the_display() {
    let mut rig = standard_rig();
    let mut lists = [None];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert_eq!(primary(&rig).strategy(), CompositionStrategy::Closed);
    assert!(prepares(&rig.journal.snapshot()).is_empty());
}

#[test]
fn strategy_takes_layers_from_gpu_copy() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp40())
        .standard_strategies()
        .gpu_copy()
        .build()
        .unwrap();
    rig.gpu_copy.as_ref().unwrap().set_claiming(true);
    let mut lists = [Some(frames::ui_frame(primary_bounds(&rig), 1, 2))];
    rig.composer_mut().prepare(&mut lists).unwrap();

    let ctx = primary(&rig);
    assert_eq!(ctx.strategy(), CompositionStrategy::HardwareComposition);
    assert!(
        !ctx.gpu_copy_in_use(),
        "hardware composition took every layer the copy engine claimed"
    );
    assert!(!ctx.mixed_composition(), "every layer is on the overlay");
    assert!(
        rig.journal
            .contains(&Call::GpuCopyPrepare(DisplayId::PRIMARY, true))
    );
}

#[test]
fn gpu_copy_runs_beside_gpu_fallback() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp40())
        .gpu_copy()
        .build()
        .unwrap();
    rig.gpu_copy.as_ref().unwrap().set_claiming(true);
    let mut lists = [Some(frames::ui_frame(primary_bounds(&rig), 1, 2))];
    rig.composer_mut().prepare(&mut lists).unwrap();

    let ctx = primary(&rig);
    assert_eq!(ctx.strategy(), CompositionStrategy::GpuFallback);
    assert!(ctx.gpu_copy_in_use(), "the copy engine keeps its layers");
    assert!(!ctx.overlay_in_use(), "no overlay strategy was registered");
}

#[test]
fn secure_session_disables_acceleration_and_external_output() {
    let mut rig = standard_rig();
    rig.external.attach(ExternalKind::Hdmi, true);
    rig.composer().set_secure_session(true);
    let bounds = primary_bounds(&rig);

    for frame in 1..=3 {
        let mut lists = [Some(frames::video_frame(bounds, frame))];
        let (prepared, set) = rig.cycle(&mut lists);
        prepared.unwrap();
        set.unwrap();

        let ctx = primary(&rig);
        assert_eq!(ctx.strategy(), CompositionStrategy::GpuFallback, "frame {frame}");
        assert!(!ctx.overlay_in_use(), "frame {frame}");
        assert!(
            layers(&lists, 0)
                .layers()
                .iter()
                .all(|layer| layer.composition == LayerComposition::Gpu),
            "frame {frame}"
        );
    }
    assert!(
        prepares(&rig.journal.snapshot()).is_empty(),
        "no strategy is consulted during a secure session"
    );
    assert_eq!(rig.journal.count(|c| *c == Call::ExternalTeardown), 1);
    assert_eq!(rig.external.attached(), None);

    rig.composer().set_secure_session(false);
    let mut lists = [Some(frames::video_frame(bounds, 4))];
    rig.composer_mut().prepare(&mut lists).unwrap();
    assert_eq!(primary(&rig).strategy(), CompositionStrategy::VideoOverlay);
}

#[test]
fn each_display_gets_exactly_one_strategy() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp42())
        .standard_strategies()
        .build()
        .unwrap();
    let config = *rig.composer().config();
    let external = config.external.unwrap();
    let mut lists = [
        Some(frames::video_frame(config.primary, 1)),
        Some(frames::ui_frame(external, 1, 3)),
    ];
    rig.composer_mut().prepare(&mut lists).unwrap();

    let strategies: Vec<_> = rig
        .composer()
        .displays()
        .iter()
        .map(|ctx| ctx.strategy())
        .collect();
    assert_eq!(
        strategies,
        [
            CompositionStrategy::VideoOverlay,
            CompositionStrategy::HardwareComposition
        ]
    );
    let claims = prepares(&rig.journal.snapshot())
        .into_iter()
        .filter(|(_, accepted)| *accepted)
        .count();
    assert_eq!(claims, 2, "one claim per display");
}

#[test]
fn displays_missing_from_a_short_list_slice_are_closed() {
    let mut rig = RigBuilder::new(ComposerConfig::mdp42())
        .standard_strategies()
        .build()
        .unwrap();
    let config = *rig.composer().config();
    let hdmi = DisplayId(1);
    let mut lists = [
        Some(frames::ui_frame(config.primary, 1, 2)),
        Some(frames::video_frame(config.external.unwrap(), 1)),
    ];
    rig.cycle(&mut lists).1.unwrap();
    let ctx = rig.composer().display(hdmi).unwrap();
    assert_eq!(ctx.strategy(), CompositionStrategy::VideoOverlay);
    assert!(ctx.overlay_in_use());

    // The host stops passing the external display after an unplug.
    let mut lists = [Some(frames::ui_frame(config.primary, 2, 2))];
    let (prepared, set) = rig.cycle(&mut lists);
    prepared.unwrap();
    set.unwrap();

    let ctx = rig.composer().display(hdmi).unwrap();
    assert_eq!(ctx.strategy(), CompositionStrategy::Closed);
    assert!(!ctx.overlay_in_use(), "a closed display holds no overlay");
    assert!(ctx.buffers().is_empty(), "closing releases every buffer");
    assert_eq!(rig.journal.released(hdmi), [buffer(1, 0)]);
    assert_eq!(
        rig.journal.count(|c| *c == Call::Submit(hdmi)),
        1,
        "only the first cycle submitted the external display"
    );
}

#[test]
fn too_many_lists_touch_nothing() {
    let mut rig = standard_rig();
    let bounds = primary_bounds(&rig);
    let mut lists = [
        Some(frames::video_frame(bounds, 1)),
        Some(frames::video_frame(bounds, 1)),
    ];
    let err = rig.composer_mut().prepare(&mut lists).unwrap_err();
    assert!(
        matches!(err, ComposerError::InvalidArgument { what: "display count", value: 2 }),
        "{err:?}"
    );
    assert_eq!(rig.composer().frame_index(), 0);
    assert!(rig.journal.snapshot().is_empty(), "no collaborator was called");
}
