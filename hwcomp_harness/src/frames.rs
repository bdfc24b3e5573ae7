// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canned layer lists.

use kurbo::Rect;

use hwcomp_core::layer::{BufferHandle, Layer, LayerFlags, LayerList, PresentTarget};

/// The presentation target used by every canned frame.
pub const TARGET: PresentTarget = PresentTarget {
    display: 1,
    surface: 2,
};

/// Buffer handles of frame `frame`, layer `layer`: unique per frame so
/// staggered release is observable.
#[must_use]
pub fn buffer(frame: u64, layer: u64) -> BufferHandle {
    BufferHandle((frame << 8) | layer)
}

/// A full-screen video layer under one UI layer.
#[must_use]
pub fn video_frame(bounds: Rect, frame: u64) -> LayerList {
    let controls = Rect::new(bounds.x0, bounds.y1 - 64.0, bounds.x1, bounds.y1);
    LayerList::with_target(
        vec![
            Layer::video(buffer(frame, 0), bounds),
            Layer::new(buffer(frame, 1), controls),
        ],
        TARGET,
    )
}

/// A windowed video layer over a full-screen UI layer.
#[must_use]
pub fn windowed_video_frame(bounds: Rect, frame: u64) -> LayerList {
    let window = Rect::new(bounds.x0, bounds.y0, bounds.center().x, bounds.center().y);
    LayerList::with_target(
        vec![
            Layer::new(buffer(frame, 0), bounds),
            Layer::video(buffer(frame, 1), window),
        ],
        TARGET,
    )
}

/// `count` stacked full-screen UI layers.
#[must_use]
pub fn ui_frame(bounds: Rect, frame: u64, count: u64) -> LayerList {
    LayerList::with_target(
        (0..count)
            .map(|layer| Layer::new(buffer(frame, layer), bounds))
            .collect(),
        TARGET,
    )
}

/// A UI frame whose only layer the producer must compose itself.
#[must_use]
pub fn skip_frame(bounds: Rect, frame: u64) -> LayerList {
    let layer = Layer::new(buffer(frame, 0), bounds).with_flags(LayerFlags {
        skip: true,
        secure: false,
    });
    LayerList::with_target(vec![layer], TARGET)
}
