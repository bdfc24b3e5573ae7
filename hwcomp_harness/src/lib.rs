// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scriptable fakes and a test rig for `hwcomp_core`.
//!
//! [`RigBuilder`] opens a [`ComposerDevice`](hwcomp_core::device::ComposerDevice)
//! whose collaborators are the fakes in [`fakes`]. Every fake writes into one
//! shared [`Journal`], so a test can assert on the exact order of draw,
//! submit, wait and release calls across a cycle.
//!
//! ```
//! use hwcomp_core::config::ComposerConfig;
//! use hwcomp_core::strategy::CompositionStrategy;
//! use hwcomp_harness::{RigBuilder, frames};
//!
//! let mut rig = RigBuilder::new(ComposerConfig::mdp40())
//!     .standard_strategies()
//!     .build()
//!     .unwrap();
//! let bounds = rig.composer().config().primary;
//! let mut lists = [Some(frames::video_frame(bounds, 1))];
//! let (prepared, set) = rig.cycle(&mut lists);
//! assert!(prepared.is_ok() && set.is_ok());
//! assert_eq!(
//!     rig.composer().displays()[0].strategy(),
//!     CompositionStrategy::VideoOverlay
//! );
//! ```

pub mod fakes;
pub mod frames;
mod journal;
mod rig;

pub use journal::{Call, Journal};
pub use rig::{Rig, RigBuilder, STANDARD_CLAIMS};

#[cfg(test)]
mod scenarios;
