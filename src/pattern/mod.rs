/*
 *  pattern/mod.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Pattern selection, generator registry and the tick-driven runner
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub mod generators;

use crate::frame::PixelFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern \"{0}\" failed: {1}")]
    Failed(String, String),
    #[error("pattern \"{name}\" produced a {got:?} frame for a {want:?} canvas")]
    WrongDimensions {
        name: String,
        got: (u32, u32),
        want: (u32, u32),
    },
}

/// Free-form knobs a generator may consult. Everything a generator draws is
/// derived from `(W, H, frame_counter, params)` alone, so pattern switches
/// and layout reloads reset cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternParams {
    /// Primary color for generators that take one.
    pub color: Option<[u8; 3]>,
    /// Animation speed multiplier.
    pub speed: f32,
    /// Cell / line pitch in pixels for tiled generators.
    pub scale: u32,
}

impl Default for PatternParams {
    fn default() -> Self {
        PatternParams {
            color: None,
            speed: 1.0,
            scale: 4,
        }
    }
}

/// What the controller should show: incoming frames only, or a named
/// generator driven by the tick counter.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternSelection {
    External,
    Internal {
        name: String,
        params: PatternParams,
    },
}

impl PatternSelection {
    pub fn name(&self) -> &str {
        match self {
            PatternSelection::External => "external",
            PatternSelection::Internal { name, .. } => name,
        }
    }
}

/// A generator is a pure function of canvas size, tick counter and params.
pub type Generator = fn(u32, u32, u64, &PatternParams) -> Result<PixelFrame, PatternError>;

const REGISTRY: &[(&str, Generator)] = &[
    ("solid", generators::solid),
    ("corners", generators::corners),
    ("cross", generators::cross),
    ("checkerboard", generators::checkerboard),
    ("grid", generators::grid),
    ("rainbow", generators::rainbow),
    ("wave", generators::wave),
    ("plasma", generators::plasma),
    ("dot", generators::dot),
    // deliberately failing generator for exercising the failure path
    ("selftest_fault", generators::selftest_fault),
];

pub fn lookup(name: &str) -> Option<Generator> {
    REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, g)| *g)
}

/// Names offered on the control surface. The diagnostic generator is
/// selectable but not advertised.
pub fn list_patterns() -> Vec<&'static str> {
    REGISTRY
        .iter()
        .map(|(n, _)| *n)
        .filter(|n| *n != "selftest_fault")
        .collect()
}

struct Active {
    name: String,
    params: PatternParams,
    generator: Generator,
    counter: u64,
}

/// Owns at most one active generator and its frame counter.
///
/// The counter starts at 0 on every selection change and is reset by the
/// controller on layout swaps and on waking from sleep. A failing generator
/// deactivates itself; the controller then reverts the published selection.
pub struct PatternRunner {
    selection: PatternSelection,
    active: Option<Active>,
}

impl PatternRunner {
    pub fn new() -> Self {
        PatternRunner {
            selection: PatternSelection::External,
            active: None,
        }
    }

    /// Adopt a newly published selection. A no-op when unchanged, so the
    /// counter keeps running across ticks.
    pub fn apply_selection(&mut self, sel: &PatternSelection) {
        if self.selection == *sel {
            return;
        }
        self.selection = sel.clone();
        self.active = match sel {
            PatternSelection::External => None,
            PatternSelection::Internal { name, params } => lookup(name).map(|generator| Active {
                name: name.clone(),
                params: *params,
                generator,
                counter: 0,
            }),
        };
    }

    pub fn selection(&self) -> &PatternSelection {
        &self.selection
    }

    /// Restart the active generator's animation from frame 0.
    pub fn reset_counter(&mut self) {
        if let Some(a) = &mut self.active {
            a.counter = 0;
        }
    }

    /// Produce this tick's generated frame, or `None` when external frames
    /// have the canvas. On failure the runner goes inactive and hands the
    /// error up.
    pub fn tick(&mut self, width: u32, height: u32) -> Option<Result<PixelFrame, PatternError>> {
        let active = self.active.as_mut()?;
        match (active.generator)(width, height, active.counter, &active.params) {
            Ok(frame) if frame.dimensions() == (width, height) => {
                active.counter += 1;
                Some(Ok(frame))
            }
            Ok(frame) => {
                let err = PatternError::WrongDimensions {
                    name: active.name.clone(),
                    got: frame.dimensions(),
                    want: (width, height),
                };
                self.active = None;
                Some(Err(err))
            }
            Err(e) => {
                self.active = None;
                Some(Err(e))
            }
        }
    }
}

impl Default for PatternRunner {
    fn default() -> Self {
        Self::new()
    }
}
