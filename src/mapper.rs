/*
 *  mapper.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Virtual canvas to physical LED index mapping
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

use crate::frame::{PixelFrame, Rgb};
use crate::layout::{Layout, Rotation, Unit, Wiring};

/// Sentinel for canvas pixels over a grid cell with no panel mounted.
const NO_LED: u32 = u32::MAX;

/// Precomputed virtual-pixel -> physical-LED lookup for one layout.
///
/// Built once per layout and immutable for its lifetime. On a layout change
/// the table is rebuilt whole, never patched.
#[derive(Debug, Clone)]
pub struct IndexTable {
    width: u32,
    height: u32,
    led_count: usize,
    /// Element at v = y*W + x is the physical index lighting that pixel.
    table: Vec<u32>,
}

impl IndexTable {
    /// Build the lookup table for a validated layout.
    ///
    /// For every canvas pixel: locate the covering unit, undo its mounting
    /// rotation to recover chip-local coordinates, then apply the intra-unit
    /// wiring to get the offset into that unit's chain segment.
    pub fn build(layout: &Layout) -> IndexTable {
        let (w, h) = layout.canvas_size();
        let pw = layout.panel_width;
        let ph = layout.panel_height;
        let per_unit = pw * ph;

        // Dense cell -> unit lookup; cells without a panel stay None
        let cells = layout.grid_width * layout.grid_height;
        let mut grid: Vec<Option<&Unit>> = vec![None; cells as usize];
        for u in &layout.units {
            grid[(u.row * layout.grid_width + u.col) as usize] = Some(u);
        }

        let mut table = vec![NO_LED; (w * h) as usize];

        for y in 0..h {
            for x in 0..w {
                let (col, row) = (x / pw, y / ph);
                let unit = match grid[(row * layout.grid_width + col) as usize] {
                    Some(u) => u,
                    None => continue,
                };

                let (lx, ly) = (x % pw, y % ph);

                // Inverse of the unit's mounting rotation. For 90/270 the
                // chip-local rectangle has its row length and column height
                // swapped relative to the canvas cell.
                let (cx, cy, cw, ch) = match unit.rotation {
                    Rotation::Deg0 => (lx, ly, pw, ph),
                    Rotation::Deg90 => (ly, pw - 1 - lx, ph, pw),
                    Rotation::Deg180 => (pw - 1 - lx, ph - 1 - ly, pw, ph),
                    Rotation::Deg270 => (ph - 1 - ly, lx, ph, pw),
                };

                let k = match layout.wiring {
                    Wiring::Sequential => cy * cw + cx,
                    Wiring::Snake => {
                        let c = if cy % 2 == 0 { cx } else { cw - 1 - cx };
                        cy * cw + c
                    }
                    Wiring::VerticalSnake => {
                        let r = if cx % 2 == 0 { cy } else { ch - 1 - cy };
                        cx * ch + r
                    }
                };

                table[(y * w + x) as usize] = unit.chain_index * per_unit + k;
            }
        }

        IndexTable {
            width: w,
            height: h,
            led_count: layout.led_count(),
            table,
        }
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn led_count(&self) -> usize {
        self.led_count
    }

    /// Physical index for a canvas pixel, `None` over an unpopulated cell.
    pub fn physical_index(&self, x: u32, y: u32) -> Option<u32> {
        let p = *self.table.get((y * self.width + x) as usize)?;
        if p == NO_LED {
            None
        } else {
            Some(p)
        }
    }

    /// Scatter a canvas frame into physical chain order: phys[p] = frame[v].
    ///
    /// `phys` is resized to the chain length and pre-blanked; LEDs not
    /// addressed by any canvas pixel stay black. The caller owns the buffer
    /// so the hot path does not allocate per tick.
    pub fn map_frame(&self, frame: &PixelFrame, phys: &mut Vec<Rgb>) {
        debug_assert_eq!(frame.dimensions(), (self.width, self.height));

        phys.clear();
        phys.resize(self.led_count, Rgb::BLACK);

        let pixels = frame.as_slice();
        for (v, &p) in self.table.iter().enumerate() {
            if p != NO_LED {
                phys[p as usize] = pixels[v];
            }
        }
    }
}
