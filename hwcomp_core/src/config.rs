// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composer configuration and per-target presets.

use core::fmt;
use core::time::Duration;

use kurbo::Rect;

use crate::error::{ComposerError, Result};

/// Revision of the mobile display processor.
///
/// Encoded as `major * 100 + minor * 10`, so `MdpVersion(420)` is MDP 4.2.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MdpVersion(pub u32);

impl MdpVersion {
    /// MDP 4.0.
    pub const V4_0: Self = Self(400);
    /// MDP 4.1.
    pub const V4_1: Self = Self(410);
    /// MDP 4.2; external attach no longer waits for three-layer bypass to end.
    pub const V4_2: Self = Self(420);
}

impl fmt::Debug for MdpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MdpVersion({}.{})", self.0 / 100, (self.0 % 100) / 10)
    }
}

/// Static description of the display hardware the composer drives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComposerConfig {
    /// Bounds of the primary panel.
    pub primary: Rect,
    /// Bounds of the external display slot, if the target has one.
    pub external: Option<Rect>,
    /// Whether the target has overlay hardware. Without it, set skips the
    /// post and pan waits.
    pub has_overlay: bool,
    /// Display processor revision.
    pub mdp_version: MdpVersion,
    /// Panel refresh rate in frames per second.
    pub fps: u32,
    /// Whether vsync is a hardware interrupt. When `false` the interrupt is
    /// never programmed and a software source paces the vsync loop.
    pub hardware_vsync: bool,
    /// Bound on the frame-post completion wait.
    pub post_timeout: Duration,
    /// Bound on the pan completion wait.
    pub pan_timeout: Duration,
    /// Bound on each vsync wait in the vsync loop.
    pub vsync_wait_timeout: Duration,
    /// Bound on each event wait in the hotplug loop.
    pub hotplug_poll_timeout: Duration,
}

const PANEL_720P: Rect = Rect::new(0.0, 0.0, 1280.0, 720.0);

impl ComposerConfig {
    /// MDP 4.0 target with overlay hardware and hardware vsync.
    #[must_use]
    pub const fn mdp40() -> Self {
        Self {
            primary: PANEL_720P,
            external: None,
            has_overlay: true,
            mdp_version: MdpVersion::V4_0,
            fps: 60,
            hardware_vsync: true,
            post_timeout: Duration::from_millis(50),
            pan_timeout: Duration::from_millis(50),
            vsync_wait_timeout: Duration::from_millis(100),
            hotplug_poll_timeout: Duration::from_millis(250),
        }
    }

    /// MDP 4.2 target with overlay hardware, hardware vsync and an HDMI slot.
    #[must_use]
    pub const fn mdp42() -> Self {
        Self {
            external: Some(Rect::new(0.0, 0.0, 1920.0, 1080.0)),
            mdp_version: MdpVersion::V4_2,
            ..Self::mdp40()
        }
    }

    /// Target without overlay hardware or a vsync interrupt.
    #[must_use]
    pub const fn gpu_only() -> Self {
        Self {
            has_overlay: false,
            hardware_vsync: false,
            ..Self::mdp40()
        }
    }

    /// Returns the configuration with the given external display slot.
    #[must_use]
    pub const fn with_external(mut self, bounds: Option<Rect>) -> Self {
        self.external = bounds;
        self
    }

    /// Number of display slots.
    #[must_use]
    pub const fn display_count(&self) -> usize {
        if self.external.is_some() { 2 } else { 1 }
    }

    /// Bounds of every display slot, primary first.
    pub fn displays(&self) -> impl Iterator<Item = Rect> {
        core::iter::once(self.primary).chain(self.external)
    }

    /// Refresh period in nanoseconds.
    #[must_use]
    pub const fn vsync_period_nanos(&self) -> u64 {
        if self.fps == 0 {
            0
        } else {
            1_000_000_000 / self.fps as u64
        }
    }

    /// Refresh period.
    #[must_use]
    pub const fn vsync_period(&self) -> Duration {
        Duration::from_nanos(self.vsync_period_nanos())
    }

    /// Checks the configuration for values the composer cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::Config`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(ComposerError::Config("fps must be non-zero"));
        }
        if self.displays().any(|r| r.is_zero_area()) {
            return Err(ComposerError::Config("display bounds must have area"));
        }
        let timeouts = [
            self.post_timeout,
            self.pan_timeout,
            self.vsync_wait_timeout,
            self.hotplug_poll_timeout,
        ];
        if timeouts.contains(&Duration::ZERO) {
            return Err(ComposerError::Config("timeouts must be non-zero"));
        }
        Ok(())
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self::mdp40()
    }
}
