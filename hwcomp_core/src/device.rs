// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer-status device contract.
//!
//! [`ComposerDevice`] exposes the [`Composer`] entry points the way a
//! hardware composer module does: raw integer arguments in, `0` for success
//! or a negated errno out. Raw event and query codes are decoded here.

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::ComposerCallbacks;
use crate::composer::{Collaborators, Composer, Event, QueryParam};
use crate::config::ComposerConfig;
use crate::display::DisplayId;
use crate::error::{ComposerError, Result};
use crate::layer::LayerList;

/// Name under which the composer device is opened.
pub const COMPOSER_DEVICE_NAME: &str = "composer";

/// Raw code of the vsync event.
pub const EVENT_VSYNC: i32 = 0;
/// Raw code of the background-layer support query.
pub const QUERY_BACKGROUND_LAYER_SUPPORTED: i32 = 0;
/// Raw code of the vsync period query.
pub const QUERY_VSYNC_PERIOD: i32 = 1;

/// Maps a result to the integer status convention.
#[must_use]
pub fn status<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => err.status(),
    }
}

fn decode_display(raw: i32) -> Result<DisplayId> {
    u32::try_from(raw)
        .map(DisplayId)
        .map_err(|_| ComposerError::invalid_argument("display", raw))
}

fn decode_flag(what: &'static str, raw: i32) -> Result<bool> {
    match raw {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(ComposerError::invalid_argument(what, raw)),
    }
}

/// An open composer device.
#[derive(Debug)]
pub struct ComposerDevice {
    composer: Composer,
}

impl ComposerDevice {
    /// Opens the device called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::UnknownDevice`] unless `name` is
    /// [`COMPOSER_DEVICE_NAME`], and any error of [`Composer::new`].
    pub fn open(
        name: &str,
        config: ComposerConfig,
        collaborators: Collaborators,
    ) -> Result<Self> {
        if name != COMPOSER_DEVICE_NAME {
            return Err(ComposerError::UnknownDevice(name.to_owned()));
        }
        if !config.hardware_vsync {
            info!("hardware vsync unavailable; pacing vsync in software");
        }
        Ok(Self {
            composer: Composer::new(config, collaborators)?,
        })
    }

    /// The wrapped composer.
    #[must_use]
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Mutable access to the wrapped composer.
    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// [`Composer::prepare`] with an integer status.
    pub fn prepare(&mut self, lists: &mut [Option<LayerList>]) -> i32 {
        status(&self.composer.prepare(lists))
    }

    /// [`Composer::set`] with an integer status.
    pub fn set(&mut self, lists: &[Option<LayerList>]) -> i32 {
        status(&self.composer.set(lists))
    }

    /// [`Composer::event_control`] decoding raw display, event and flag.
    pub fn event_control(&mut self, display: i32, event: i32, enabled: i32) -> i32 {
        let result = decode_display(display).and_then(|display| {
            let event = Event::try_from(event)?;
            let enabled = decode_flag("event state", enabled)?;
            self.composer.event_control(display, event, enabled)
        });
        status(&result)
    }

    /// [`Composer::blank`] decoding raw display and flag.
    ///
    /// Any non-zero `blank` blanks the display.
    pub fn blank(&mut self, display: i32, blank: i32) -> i32 {
        let result = decode_display(display).and_then(|d| self.composer.blank(d, blank != 0));
        status(&result)
    }

    /// [`Composer::query`] decoding the raw parameter; writes `value` on
    /// success only.
    pub fn query(&self, param: i32, value: &mut i32) -> i32 {
        let result = QueryParam::try_from(param).and_then(|p| self.composer.query(p));
        if let Ok(v) = result {
            *value = v;
        }
        status(&result)
    }

    /// [`Composer::register_callbacks`] with an integer status.
    pub fn register_callbacks(&mut self, callbacks: Arc<dyn ComposerCallbacks>) -> i32 {
        status(&self.composer.register_callbacks(callbacks))
    }

    /// Closes the device, joining its helper threads.
    pub fn close(self) -> i32 {
        debug!("closing composer device");
        drop(self.composer);
        0
    }
}
