// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time.

use hwcomp_core::time::HostTime;
use rustix::time::{ClockId, Timespec, clock_gettime};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Converts a kernel timespec to [`HostTime`], clamping negative fields to
/// zero and saturating on overflow.
pub(crate) fn host_time(ts: Timespec) -> HostTime {
    let secs = u64::try_from(ts.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(ts.tv_nsec).unwrap_or(0);
    HostTime(secs.saturating_mul(NANOS_PER_SEC).saturating_add(nanos))
}

/// Current `CLOCK_MONOTONIC` time.
///
/// This is the clock the framebuffer driver stamps vsync events with, so
/// timestamps from [`SysfsVsyncSource`](crate::SysfsVsyncSource) and this
/// function are directly comparable.
#[must_use]
pub fn now() -> HostTime {
    host_time(clock_gettime(ClockId::Monotonic))
}
