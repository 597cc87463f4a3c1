/*
 *  layout.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Panel grid layout model - parsing and validation
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

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation and load errors for layout documents.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout document parse error: {0}")]
    Document(#[from] serde_json::Error),
    #[error("I/O error reading layout: {0}")]
    Io(#[from] std::io::Error),
    #[error("duplicate chain index {0}")]
    DuplicateChainIndex(u32),
    #[error("duplicate grid position ({0}, {1})")]
    DuplicateGridPosition(u32, u32),
    #[error("panel {id}: position ({col}, {row}) outside the {grid_width}x{grid_height} grid")]
    OutOfBoundsPosition {
        id: u32,
        col: u32,
        row: u32,
        grid_width: u32,
        grid_height: u32,
    },
    #[error("rotation {0} is not one of 0, 90, 180, 270")]
    RotationNotMultipleOf90(u16),
    #[error("grid and panel dimensions must be non-zero")]
    ZeroDimension,
    #[error("chain indices of {0} panels do not form 0..{0}")]
    UnitCountMismatch(usize),
}

/// Intra-unit wiring of the LED chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wiring {
    /// Every row left-to-right.
    Sequential,
    /// Even rows left-to-right, odd rows reversed (serpentine routing).
    Snake,
    /// Serpentine by columns instead of rows.
    VerticalSnake,
}

/// Physical mounting orientation of a unit relative to canvas-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(deg: u16) -> Result<Self, LayoutError> {
        match deg {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(LayoutError::RotationNotMultipleOf90(other)),
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// Persisted layout description, as stored on disk and carried by the
/// control surface. Raw and unvalidated; `Layout::parse` turns it into a
/// usable `Layout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDoc {
    pub grid: GridDoc,
    pub panels: Vec<PanelDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridDoc {
    pub grid_width: u32,
    pub grid_height: u32,
    pub panel_width: u32,
    pub panel_height: u32,
    pub wiring_pattern: Wiring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelDoc {
    /// Chain index: the panel's position in the physical data chain.
    pub id: u32,
    /// Grid coordinate as [col, row].
    pub position: [u32; 2],
    pub rotation: u16,
}

/// One validated panel of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub chain_index: u32,
    pub col: u32,
    pub row: u32,
    pub rotation: Rotation,
}

/// Immutable, validated description of the whole panel grid.
///
/// Replaced only through the hot-reload arbiter; all derived state (canvas
/// size, index table) is recomputed from scratch on replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub grid_width: u32,
    pub grid_height: u32,
    pub panel_width: u32,
    pub panel_height: u32,
    pub wiring: Wiring,
    /// Units ordered by chain index.
    pub units: Vec<Unit>,
}

impl Layout {
    /// Validate a raw document into a `Layout`.
    pub fn parse(doc: &LayoutDoc) -> Result<Layout, LayoutError> {
        let g = &doc.grid;
        if g.grid_width == 0 || g.grid_height == 0 || g.panel_width == 0 || g.panel_height == 0 {
            return Err(LayoutError::ZeroDimension);
        }

        let count = doc.panels.len();
        if count == 0 {
            return Err(LayoutError::UnitCountMismatch(0));
        }

        let mut seen_chain = vec![false; count];
        let mut seen_pos: HashSet<(u32, u32)> = HashSet::with_capacity(count);
        let mut units = Vec::with_capacity(count);

        for p in &doc.panels {
            let idx = p.id as usize;
            if idx >= count {
                // An id past the panel count can never complete a permutation
                return Err(LayoutError::UnitCountMismatch(count));
            }
            if seen_chain[idx] {
                return Err(LayoutError::DuplicateChainIndex(p.id));
            }
            seen_chain[idx] = true;

            let (col, row) = (p.position[0], p.position[1]);
            if col >= g.grid_width || row >= g.grid_height {
                return Err(LayoutError::OutOfBoundsPosition {
                    id: p.id,
                    col,
                    row,
                    grid_width: g.grid_width,
                    grid_height: g.grid_height,
                });
            }
            if !seen_pos.insert((col, row)) {
                return Err(LayoutError::DuplicateGridPosition(col, row));
            }

            units.push(Unit {
                chain_index: p.id,
                col,
                row,
                rotation: Rotation::from_degrees(p.rotation)?,
            });
        }

        units.sort_by_key(|u| u.chain_index);

        Ok(Layout {
            grid_width: g.grid_width,
            grid_height: g.grid_height,
            panel_width: g.panel_width,
            panel_height: g.panel_height,
            wiring: g.wiring_pattern,
            units,
        })
    }

    pub fn from_json_str(s: &str) -> Result<Layout, LayoutError> {
        let doc: LayoutDoc = serde_json::from_str(s)?;
        Layout::parse(&doc)
    }

    pub fn from_file(path: &Path) -> Result<Layout, LayoutError> {
        let s = std::fs::read_to_string(path)?;
        Layout::from_json_str(&s)
    }

    /// Canvas size (W, H) in pixels.
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.grid_width * self.panel_width,
            self.grid_height * self.panel_height,
        )
    }

    /// Total LEDs in the chain.
    pub fn led_count(&self) -> usize {
        self.units.len() * (self.panel_width * self.panel_height) as usize
    }
}
