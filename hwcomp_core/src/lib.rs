// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame composition decisions for hardware display pipelines.
//!
//! `hwcomp_core` decides, once per refresh cycle and per display, which
//! composition path renders the frame (a video overlay, picture-in-picture,
//! external-only output, UI mirroring, hardware composition or plain GPU
//! composition), then drives that path through buffer submission and the
//! hardware completion signals. The pixel-pushing components themselves are
//! collaborators behind the traits in [`backend`] and [`strategy`].
//!
//! # Architecture
//!
//! Each refresh cycle runs the two halves of the device contract in strict
//! alternation on the frame-producer thread:
//!
//! ```text
//!   LayerList[] ──► Composer::prepare() ──► CompositionStrategy per display
//!                        │                      (+ overlay_in_use, locks)
//!                        ▼
//!                  Composer::set() ──► draw ─► submit ─► wait post
//!                        │                                  │
//!                        │           mirror draw + external commit
//!                        │                                  │
//!                        ▼                                  ▼
//!              release previous-frame buffers  ◄──────  wait pan
//! ```
//!
//! Two helper threads run beside it, started by
//! [`Composer::register_callbacks`](composer::Composer::register_callbacks):
//!
//! - the vsync loop parks on [`VsyncState`](vsync::VsyncState) while vsync
//!   is disabled and otherwise forwards vsync timestamps to the registered
//!   [`ComposerCallbacks`](backend::ComposerCallbacks);
//! - the hotplug loop posts external-display events into the
//!   [`SessionGate`](gate::SessionGate), where the next `prepare` picks them
//!   up.
//!
//! # Modules
//!
//! **[`composer`]**: The [`Composer`](composer::Composer) owning one
//! [`DisplayContext`](display::DisplayContext) per display slot.
//!
//! **[`strategy`]**: Strategy tags, the collaborator trait and the ordered
//! priority chain.
//!
//! **[`buffer`]**: Staggered buffer release bookkeeping.
//!
//! **[`vsync`]**: Vsync control state machine and signaling loop.
//!
//! **[`device`]**: Integer-status device contract wrapping the composer.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) hooks for cycle
//! instrumentation.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod buffer;
mod commit;
pub mod composer;
pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod gate;
mod hotplug;
pub mod layer;
mod select;
pub mod strategy;
pub mod time;
pub mod trace;
pub mod vsync;
