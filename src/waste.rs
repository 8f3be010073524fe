//! Maximal-empty-rectangle scan over a rasterized sheet.

use serde::{Deserialize, Serialize};

use crate::types::{EPSILON, Placement, StockSheet, WasteBlock};

/// Grid cells per inch used when nothing else is asked for (eighth inch).
pub const DEFAULT_RESOLUTION: u32 = 8;

/// Which end of the sheet the scan starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    /// Row 0 first, blocks grow towards larger `y`.
    FromTop,
    /// Last row first, blocks grow towards smaller `y`.
    #[default]
    FromBottom,
}

/// Inches to whole cells, rounding down.
pub(crate) fn cells_floor(inches: f64, resolution: u32) -> usize {
    (inches * resolution as f64 + EPSILON).floor().max(0.0) as usize
}

/// Inches to whole cells, rounding up.
pub(crate) fn cells_ceil(inches: f64, resolution: u32) -> usize {
    (inches * resolution as f64 - EPSILON).ceil().max(0.0) as usize
}

/// A rectangle in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CellRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Row-major occupancy of the sheet.
#[derive(Debug, Clone)]
pub(crate) struct OccupancyGrid {
    cols: usize,
    rows: usize,
    taken: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            taken: vec![false; cols * rows],
        }
    }

    /// Covers the whole stock; a trailing partial cell counts as a cell.
    pub fn for_stock(stock: &StockSheet, resolution: u32) -> Self {
        Self::new(
            cells_ceil(stock.width.inches(), resolution),
            cells_ceil(stock.height.inches(), resolution),
        )
    }

    /// Marks a cell rectangle as covered, clipped to the grid.
    pub fn fill(&mut self, rect: CellRect) {
        let x_end = (rect.x + rect.w).min(self.cols);
        let y_end = (rect.y + rect.h).min(self.rows);
        for y in rect.y.min(y_end)..y_end {
            let row = y * self.cols;
            self.taken[row + rect.x.min(x_end)..row + x_end].fill(true);
        }
    }

    /// Marks every cell a placement touches.
    pub fn fill_placement(&mut self, p: &Placement, resolution: u32) {
        let x = cells_floor(p.x, resolution);
        let y = cells_floor(p.y, resolution);
        self.fill(CellRect {
            x,
            y,
            w: cells_ceil(p.right(), resolution).saturating_sub(x),
            h: cells_ceil(p.bottom(), resolution).saturating_sub(y),
        });
    }

    fn is_free(&self, x: usize, y: usize) -> bool {
        !self.taken[y * self.cols + x]
    }

    fn run_is_free(&self, x: usize, y: usize, w: usize) -> bool {
        let row = y * self.cols;
        self.taken[row + x..row + x + w].iter().all(|t| !t)
    }

    /// Top-most, then left-most origin of a free `w` x `h` window that also
    /// keeps `gap` cells clear to its right and below, where the grid allows.
    pub fn first_free_window(&self, w: usize, h: usize, gap: usize) -> Option<(usize, usize)> {
        if w == 0 || h == 0 || w > self.cols || h > self.rows {
            return None;
        }

        // Summed-area table of taken cells.
        let stride = self.cols + 1;
        let mut sums = vec![0u32; stride * (self.rows + 1)];
        for y in 0..self.rows {
            let mut run = 0;
            for x in 0..self.cols {
                run += u32::from(self.taken[y * self.cols + x]);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + run;
            }
        }
        let taken_in = |x: usize, y: usize, w: usize, h: usize| {
            (sums[(y + h) * stride + x + w] + sums[y * stride + x])
                - (sums[y * stride + x + w] + sums[(y + h) * stride + x])
        };

        (0..=self.rows - h).find_map(|y| {
            let clear_h = (h + gap).min(self.rows - y);
            (0..=self.cols - w).find_map(|x| {
                let clear_w = (w + gap).min(self.cols - x);
                (taken_in(x, y, clear_w, clear_h) == 0).then_some((x, y))
            })
        })
    }

    /// Greedy maximal-rectangle decomposition of the free cells.
    ///
    /// Each unvisited free cell seeds a block: grow along the row while cells
    /// stay free, then grow along the scan axis while the whole run stays
    /// free. The blocks tile the free area exactly.
    pub fn free_blocks(&self, direction: ScanDirection) -> Vec<CellRect> {
        let mut visited = self.clone();
        let mut blocks = Vec::new();

        let rows: Box<dyn Iterator<Item = usize>> = match direction {
            ScanDirection::FromTop => Box::new(0..self.rows),
            ScanDirection::FromBottom => Box::new((0..self.rows).rev()),
        };

        for y in rows {
            for x in 0..self.cols {
                if !visited.is_free(x, y) {
                    continue;
                }

                let mut w = 0;
                while x + w < self.cols && visited.is_free(x + w, y) {
                    w += 1;
                }

                let mut h = 1;
                loop {
                    let next = match direction {
                        ScanDirection::FromTop => y + h,
                        ScanDirection::FromBottom => match y.checked_sub(h) {
                            Some(next) => next,
                            None => break,
                        },
                    };
                    if next >= self.rows || !visited.run_is_free(x, next, w) {
                        break;
                    }
                    h += 1;
                }

                let top = match direction {
                    ScanDirection::FromTop => y,
                    ScanDirection::FromBottom => y + 1 - h,
                };
                let block = CellRect { x, y: top, w, h };
                visited.fill(block);
                blocks.push(block);
            }
        }

        blocks
    }
}

/// Finds the uncovered rectangles of `stock` around `placements`, on a grid
/// of `resolution` cells per inch.
///
/// The blocks tile the uncovered area without gaps or overlaps when
/// placements sit on the grid. Blocks touching the far edges are trimmed to
/// the stock, so off-grid stock sizes are covered exactly.
pub fn scan(
    stock: &StockSheet,
    placements: &[Placement],
    direction: ScanDirection,
    resolution: u32,
) -> Vec<WasteBlock> {
    let resolution = resolution.max(1);
    let mut grid = OccupancyGrid::for_stock(stock, resolution);
    for p in placements {
        grid.fill_placement(p, resolution);
    }

    let scale = resolution as f64;
    let (stock_w, stock_h) = (stock.width.inches(), stock.height.inches());
    grid.free_blocks(direction)
        .into_iter()
        .map(|b| {
            let (x, y) = (b.x as f64 / scale, b.y as f64 / scale);
            WasteBlock {
                x,
                y,
                width: ((b.x + b.w) as f64 / scale).min(stock_w) - x,
                height: ((b.y + b.h) as f64 / scale).min(stock_h) - y,
            }
        })
        .collect()
}

/// End-of-layout remnant report.
pub fn find_all_waste_blocks(stock: &StockSheet, placements: &[Placement]) -> Vec<WasteBlock> {
    scan(stock, placements, ScanDirection::FromBottom, DEFAULT_RESOLUTION)
}
