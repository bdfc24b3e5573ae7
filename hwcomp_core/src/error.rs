// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error kinds and their integer status mapping.
//!
//! Every fallible operation returns [`ComposerError`]. The integer device
//! contract in [`device`](crate::device) reports failures as negated errno
//! values, produced by [`ComposerError::status`].

use thiserror::Error;

use crate::backend::CompletionStage;
use crate::display::DisplayId;

// Linux errno values: the integer contract mirrors the Linux display drivers
// the composer sits on. Other targets receive the same numbers.

/// `ENODEV`: no such device.
pub const ENODEV: i32 = 19;
/// `EINVAL`: invalid argument.
pub const EINVAL: i32 = 22;
/// `EAGAIN`: resource temporarily unavailable.
pub const EAGAIN: i32 = 11;
/// `ETIMEDOUT`: operation timed out.
pub const ETIMEDOUT: i32 = 110;

/// Failures reported by the composer and its collaborators.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ComposerError {
    /// An event, query parameter or display index the device does not support.
    #[error("unsupported {what}: {value}")]
    InvalidArgument {
        /// Which argument was rejected.
        what: &'static str,
        /// The rejected raw value.
        value: i64,
    },
    /// A hardware control write (ioctl, sysfs, register) failed.
    #[error("hardware programming failed (errno {errno})")]
    HardwareProgramming {
        /// Positive errno reported by the driver.
        errno: i32,
    },
    /// A bounded completion wait expired before the hardware signaled.
    #[error("timed out waiting for {stage} completion on {display:?}")]
    Timeout {
        /// Display whose completion signal never arrived.
        display: DisplayId,
        /// Which completion signal was awaited.
        stage: CompletionStage,
    },
    /// A display had no presentation target when one was required.
    #[error("{0:?} has no presentation target")]
    InvalidDisplayState(DisplayId),
    /// The composer configuration was rejected at construction.
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    /// A device was opened under a name this crate does not provide.
    #[error("unknown device {0:?}")]
    UnknownDevice(String),
}

impl ComposerError {
    /// Convenience constructor for [`ComposerError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(what: &'static str, value: impl Into<i64>) -> Self {
        Self::InvalidArgument {
            what,
            value: value.into(),
        }
    }

    /// Returns the positive errno equivalent of this error.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } | Self::Config(_) | Self::UnknownDevice(_) => EINVAL,
            Self::HardwareProgramming { errno } => *errno,
            Self::Timeout { .. } => ETIMEDOUT,
            Self::InvalidDisplayState(_) => ENODEV,
        }
    }

    /// Returns the negated errno used as an integer status (never zero).
    #[must_use]
    pub const fn status(&self) -> i32 {
        let errno = self.errno();
        if errno > 0 { -errno } else { -EINVAL }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = ComposerError> = core::result::Result<T, E>;
