//! Row-by-row packing, used when the skyline gets stuck.
//!
//! Each row is the subset of remaining pieces whose widths fill the sheet
//! width best, found with a 0/1 knapsack over cell widths. Rows stack from
//! the top until nothing else fits.

use tracing::debug;

use crate::skyline::Grid;
use crate::types::{Piece, Placement};

/// Output of the row packer.
#[derive(Debug, Clone, Default)]
pub struct RowLayout {
    pub placements: Vec<Placement>,
    /// Pieces no row could take, in input order.
    pub remaining: Vec<Piece>,
    /// First free `y`, in cells.
    pub used_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Skip,
    Take { rotated: bool },
}

/// An orientation usable in the current row, in cells.
#[derive(Debug, Clone, Copy)]
struct RowFit {
    w: usize,
    h: usize,
    rotated: bool,
}

fn row_options(grid: &Grid, piece: &Piece, height_left: usize) -> Vec<RowFit> {
    piece
        .orientations()
        .map(|(w, h, rotated)| RowFit {
            w: grid.cells(w),
            h: grid.cells(h),
            rotated,
        })
        .filter(|o| o.w <= grid.cols && o.h <= height_left)
        .collect()
}

/// Picks the widest row from `pieces`. Returns `(index, option)` pairs in
/// input order, or an empty vec when nothing fits.
fn best_row(grid: &Grid, pieces: &[Piece], height_left: usize) -> Vec<(usize, RowFit)> {
    // A kerf follows every piece; the last one may run off the edge.
    let capacity = grid.cols + grid.kerf;
    let options: Vec<Vec<RowFit>> = pieces
        .iter()
        .map(|p| row_options(grid, p, height_left))
        .collect();

    let mut reachable = vec![false; capacity + 1];
    reachable[0] = true;
    let mut steps: Vec<Vec<Option<Step>>> = Vec::with_capacity(pieces.len());

    for opts in &options {
        let mut next = vec![false; capacity + 1];
        let mut layer = vec![None; capacity + 1];
        for width in 0..=capacity {
            // Skipping wins when possible, so earlier pieces end up in the row.
            let step = if reachable[width] {
                Some(Step::Skip)
            } else {
                opts.iter()
                    .find(|o| {
                        let cost = o.w + grid.kerf;
                        width >= cost && reachable[width - cost]
                    })
                    .map(|o| Step::Take { rotated: o.rotated })
            };
            if step.is_some() {
                next[width] = true;
                layer[width] = step;
            }
        }
        reachable = next;
        steps.push(layer);
    }

    let Some(mut width) = (1..=capacity).rev().find(|&w| reachable[w]) else {
        return Vec::new();
    };

    let mut row = Vec::new();
    for (i, layer) in steps.iter().enumerate().rev() {
        match layer[width] {
            Some(Step::Take { rotated }) => {
                let option = options[i]
                    .iter()
                    .copied()
                    .find(|o| o.rotated == rotated);
                if let Some(o) = option {
                    width -= o.w + grid.kerf;
                    row.push((i, o));
                }
            }
            Some(Step::Skip) | None => {}
        }
    }
    row.reverse();
    row
}

/// Packs `pieces` into full-width rows from the top of the sheet.
pub(crate) fn optimize_rows(grid: &Grid, pieces: &[Piece]) -> RowLayout {
    let mut remaining: Vec<Piece> = pieces.to_vec();
    let mut placements = Vec::new();
    let mut y = 0;

    while !remaining.is_empty() && y < grid.rows {
        let row = best_row(grid, &remaining, grid.rows - y);
        if row.is_empty() {
            break;
        }

        let mut x = 0;
        let mut row_height = 0;
        for &(i, option) in &row {
            placements.push(grid.placement(&remaining[i], x, y, option.rotated));
            x += option.w + grid.kerf;
            row_height = row_height.max(option.h);
        }
        debug!(pieces = row.len(), y = grid.inches(y), "row packed");

        let taken: Vec<usize> = row.iter().map(|&(i, _)| i).collect();
        remaining = remaining
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !taken.contains(i))
            .map(|(_, p)| p)
            .collect();
        y += row_height + grid.kerf;
    }

    RowLayout {
        placements,
        remaining,
        used_rows: y.min(grid.rows),
    }
}
