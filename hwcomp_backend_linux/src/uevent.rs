// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! HDMI switch uevent decoding.
//!
//! A kernel uevent is a NUL-separated list of records: an `action@devpath`
//! header followed by `KEY=value` pairs. The HDMI driver reports cable state
//! through the `switch` class as `SWITCH_NAME=hdmi` with `SWITCH_STATE=0|1`.

use hwcomp_core::backend::HotplugEvent;
use tracing::trace;

const HDMI_SWITCH: &str = "hdmi";

fn records(message: &[u8]) -> impl Iterator<Item = &str> {
    message
        .split(|&b| b == 0)
        .filter(|record| !record.is_empty())
        .filter_map(|record| core::str::from_utf8(record).ok())
}

fn field<'a>(message: &'a [u8], key: &str) -> Option<&'a str> {
    records(message).find_map(|record| {
        record
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

fn is_hdmi_switch(message: &[u8]) -> bool {
    if let Some(name) = field(message, "SWITCH_NAME") {
        return name == HDMI_SWITCH;
    }
    // Older drivers omit SWITCH_NAME; fall back to the device path.
    records(message).next().is_some_and(|header| {
        header
            .split_once('@')
            .is_some_and(|(_, devpath)| devpath.ends_with("/switch/hdmi"))
    })
}

/// Decodes an HDMI switch uevent.
///
/// Returns [`HotplugEvent::Online`] carrying the whole message (records
/// joined by newlines) when the cable was connected,
/// [`HotplugEvent::Offline`] when it was removed, and `None` for any other
/// uevent.
#[must_use]
pub fn parse_uevent(message: &[u8]) -> Option<HotplugEvent> {
    if !is_hdmi_switch(message) {
        return None;
    }
    let event = match field(message, "SWITCH_STATE")? {
        "1" => HotplugEvent::Online(records(message).collect::<Vec<_>>().join("\n")),
        "0" => HotplugEvent::Offline,
        other => {
            trace!(state = other, "ignoring unknown hdmi switch state");
            return None;
        }
    };
    Some(event)
}
