// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vsync timestamps from the framebuffer driver.
//!
//! The driver exposes the last vsync as `VSYNC=<nanoseconds>` in
//! `/sys/class/graphics/fb<N>/vsync_event` and raises `POLLPRI` on the node
//! each time it changes. Every read has to start again at offset zero.

use core::time::Duration;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};

use hwcomp_core::backend::VsyncSource;
use hwcomp_core::error::{ComposerError, Result};
use hwcomp_core::time::HostTime;
use rustix::event::{PollFd, PollFlags, poll};
use rustix::fs::{Mode, OFlags, open};
use rustix::io::{Errno, pread};
use rustix::time::Timespec;
use tracing::{debug, warn};

/// Largest payload the driver writes, with room for a trailing newline.
const EVENT_CAPACITY: usize = 64;

fn hardware_error(errno: Errno) -> ComposerError {
    ComposerError::HardwareProgramming {
        errno: errno.raw_os_error(),
    }
}

fn timespec(timeout: Duration) -> Timespec {
    Timespec {
        tv_sec: i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX),
        tv_nsec: timeout.subsec_nanos().into(),
    }
}

/// Parses a `VSYNC=<nanoseconds>` payload.
///
/// Trailing NUL bytes and whitespace are ignored. Returns `None` for anything
/// else, including an empty payload.
#[must_use]
pub fn parse_vsync_event(payload: &[u8]) -> Option<HostTime> {
    let text = core::str::from_utf8(payload).ok()?;
    let text = text.trim_end_matches(|c: char| c == '\0' || c.is_ascii_whitespace());
    let nanos = text.strip_prefix("VSYNC=")?;
    nanos.parse().ok().map(HostTime)
}

/// A [`VsyncSource`] backed by a framebuffer's `vsync_event` sysfs node.
#[derive(Debug)]
pub struct SysfsVsyncSource {
    fd: OwnedFd,
    path: PathBuf,
}

impl SysfsVsyncSource {
    /// Opens the vsync node of framebuffer `fb`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::HardwareProgramming`] with the driver's errno
    /// if the node cannot be opened.
    pub fn open(fb: u32) -> Result<Self> {
        Self::open_path(format!("/sys/class/graphics/fb{fb}/vsync_event"))
    }

    /// Opens a vsync node at an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::HardwareProgramming`] if `path` cannot be
    /// opened for reading.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let fd = open(&path, OFlags::RDONLY | OFlags::CLOEXEC, Mode::empty()).map_err(|errno| {
            warn!(path = %path.display(), %errno, "cannot open vsync node");
            hardware_error(errno)
        })?;
        debug!(path = %path.display(), "vsync node opened");
        Ok(Self { fd, path })
    }

    /// The node this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_timestamp(&self) -> Result<Option<HostTime>> {
        let mut buf = [0_u8; EVENT_CAPACITY];
        let len = pread(&self.fd, &mut buf[..], 0).map_err(hardware_error)?;
        let timestamp = parse_vsync_event(&buf[..len]);
        if timestamp.is_none() {
            warn!(path = %self.path.display(), "malformed vsync event");
        }
        Ok(timestamp)
    }
}

impl VsyncSource for SysfsVsyncSource {
    fn wait_for_vsync(&mut self, timeout: Duration) -> Result<Option<HostTime>> {
        let timeout = timespec(timeout);
        let mut fds = [PollFd::new(&self.fd, PollFlags::PRI | PollFlags::ERR)];
        match poll(&mut fds, Some(&timeout)) {
            Ok(0) | Err(Errno::INTR) => return Ok(None),
            Ok(_) => {}
            Err(errno) => return Err(hardware_error(errno)),
        }
        let revents = fds[0].revents();
        if !revents.intersects(PollFlags::PRI | PollFlags::ERR) {
            return Ok(None);
        }
        self.read_timestamp()
    }
}
