// Copyright 2026 the hwcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end cycles against the fakes.

mod commit;
mod device;
mod gate;
mod selection;
mod vsync;

use kurbo::Rect;

use hwcomp_core::config::ComposerConfig;
use hwcomp_core::display::{DisplayContext, DisplayId};
use hwcomp_core::layer::LayerList;
use hwcomp_core::strategy::CompositionStrategy;

use crate::journal::Call;
use crate::rig::{Rig, RigBuilder};

/// MDP 4.0 rig with every standard strategy.
fn standard_rig() -> Rig {
    RigBuilder::new(ComposerConfig::mdp40())
        .standard_strategies()
        .build()
        .unwrap()
}

fn primary_bounds(rig: &Rig) -> Rect {
    rig.composer().config().primary
}

fn primary(rig: &Rig) -> &DisplayContext {
    rig.composer().display(DisplayId::PRIMARY).unwrap()
}

fn layers(lists: &[Option<LayerList>], display: usize) -> &LayerList {
    lists[display].as_ref().unwrap()
}

/// Strategy prepare calls in `calls`, as `(tag, accepted)` pairs.
fn prepares(calls: &[Call]) -> Vec<(CompositionStrategy, bool)> {
    calls
        .iter()
        .filter_map(|call| match call {
            Call::StrategyPrepare(kind, _, accepted) => Some((*kind, *accepted)),
            _ => None,
        })
        .collect()
}

fn index_of(calls: &[Call], call: &Call) -> usize {
    calls
        .iter()
        .position(|c| c == call)
        .unwrap_or_else(|| panic!("{call:?} not in {calls:?}"))
}
