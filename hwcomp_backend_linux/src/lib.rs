// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linux integration pieces for `hwcomp_core`.
//!
//! - [`now`]: `CLOCK_MONOTONIC` host time, usable as the trace clock and as
//!   the clock of [`SoftVsyncSource`](hwcomp_core::vsync::SoftVsyncSource).
//! - [`SysfsVsyncSource`]: vsync timestamps read from the framebuffer
//!   driver's `vsync_event` sysfs node.
//! - [`parse_uevent`]: decodes HDMI switch uevents into
//!   [`HotplugEvent`](hwcomp_core::backend::HotplugEvent)s.
//! - [`QueuedHotplugSource`]: a bounded queue between the host's uevent
//!   reader and the composer's hotplug loop.

#![cfg(unix)]

mod hotplug;
mod time;
mod uevent;
mod vsync;

pub use hotplug::{HotplugSender, QueuedHotplugSource, hotplug_queue};
pub use time::now;
pub use uevent::parse_uevent;
pub use vsync::{SysfsVsyncSource, parse_vsync_event};
