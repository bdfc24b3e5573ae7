// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer descriptors submitted once per frame per display.
//!
//! A [`LayerList`] is owned by the caller for the duration of one
//! prepare/set pair. The selector writes each layer's [`LayerComposition`]
//! back into the list so the caller knows which layers it still has to
//! compose on the GPU.

use core::fmt;

use kurbo::Rect;

/// An opaque handle to a graphics buffer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferHandle(pub u64);

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferHandle({:#x})", self.0)
    }
}

/// What kind of content a layer carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// RGB user-interface content.
    #[default]
    Rgb,
    /// YUV video content, eligible for overlay planes.
    Video,
}

/// Per-layer flags set by the producer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerFlags {
    /// The producer must compose this layer itself; no hardware path may
    /// claim it.
    pub skip: bool,
    /// The buffer is protected content.
    pub secure: bool,
}

/// Which path composes a layer this frame. Written during prepare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerComposition {
    /// Composed by the GPU into the framebuffer target.
    #[default]
    Gpu,
    /// Composed by the GPU-copy engine.
    GpuCopy,
    /// Scanned out by an overlay pipe or the hardware compositor.
    Overlay,
}

/// One visual layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Buffer to present, if any.
    pub buffer: Option<BufferHandle>,
    /// Destination rectangle in display coordinates.
    pub display_frame: Rect,
    /// Source crop in buffer coordinates.
    pub source_crop: Rect,
    /// Content kind.
    pub content: ContentKind,
    /// Producer flags.
    pub flags: LayerFlags,
    /// Composition decision for this frame.
    pub composition: LayerComposition,
}

impl Layer {
    /// Creates an opaque RGB layer showing `buffer` at `display_frame`.
    #[must_use]
    pub fn new(buffer: BufferHandle, display_frame: Rect) -> Self {
        Self {
            buffer: Some(buffer),
            display_frame,
            source_crop: Rect::from_origin_size((0.0, 0.0), display_frame.size()),
            content: ContentKind::Rgb,
            flags: LayerFlags::default(),
            composition: LayerComposition::Gpu,
        }
    }

    /// Creates a YUV video layer.
    #[must_use]
    pub fn video(buffer: BufferHandle, display_frame: Rect) -> Self {
        Self {
            content: ContentKind::Video,
            ..Self::new(buffer, display_frame)
        }
    }

    /// Returns the layer with the given flags.
    #[must_use]
    pub fn with_flags(mut self, flags: LayerFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether the layer carries video content.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.content == ContentKind::Video
    }

    /// Whether this layer's destination overlaps `other`'s with non-zero area.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.display_frame.intersect(other.display_frame).area() > 0.0
    }
}

/// Native handles of the surface a display presents into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PresentTarget {
    /// Native display connection (e.g. an EGL display).
    pub display: u64,
    /// Native window surface (e.g. an EGL surface).
    pub surface: u64,
}

/// Ordered layers for one display plus its presentation target.
///
/// Layers are ordered back to front.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerList {
    layers: Vec<Layer>,
    target: Option<PresentTarget>,
}

impl LayerList {
    /// Creates an empty list without a presentation target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list of `layers` presenting into `target`.
    #[must_use]
    pub fn with_target(layers: Vec<Layer>, target: PresentTarget) -> Self {
        Self {
            layers,
            target: Some(target),
        }
    }

    /// Appends a layer on top.
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// The layers, back to front.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Mutable access to the layers.
    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the list has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The presentation target, if the display currently has one.
    #[must_use]
    pub fn target(&self) -> Option<&PresentTarget> {
        self.target.as_ref()
    }

    /// Replaces the presentation target.
    pub fn set_target(&mut self, target: Option<PresentTarget>) {
        self.target = target;
    }

    /// Whether any layer is still composed by the GPU or the GPU-copy engine.
    #[must_use]
    pub fn needs_gpu(&self) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.composition != LayerComposition::Overlay)
    }
}

/// Shape of a frame's layer list, gathered before strategies run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayerStats {
    /// Total number of layers.
    pub layer_count: usize,
    /// Number of video layers.
    pub video_count: usize,
    /// Index of the bottom-most video layer.
    pub first_video: Option<usize>,
    /// Number of layers flagged `skip`.
    pub skip_count: usize,
    /// Whether any video layer carries protected content.
    pub secure_video: bool,
    /// Whether any two layers overlap.
    pub has_overlap: bool,
    /// Whether a video layer covers the whole display.
    pub fullscreen_video: bool,
}

impl LayerStats {
    /// Gathers statistics for `list` on a display covering `bounds`.
    #[must_use]
    pub fn gather(list: &LayerList, bounds: Rect) -> Self {
        let layers = list.layers();
        let mut stats = Self {
            layer_count: layers.len(),
            ..Self::default()
        };

        for (index, layer) in layers.iter().enumerate() {
            if layer.flags.skip {
                stats.skip_count += 1;
            }
            if layer.is_video() {
                stats.video_count += 1;
                stats.first_video.get_or_insert(index);
                stats.secure_video |= layer.flags.secure;
                // Covering means clipping to the display leaves the display.
                stats.fullscreen_video |= bounds.intersect(layer.display_frame) == bounds;
            }
            if !stats.has_overlap {
                stats.has_overlap = layers[index + 1..]
                    .iter()
                    .any(|above| layer.overlaps(above));
            }
        }

        stats
    }
}
