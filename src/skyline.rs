//! Height-map ("skyline") placement of rectangles on a single sheet.
//!
//! The sheet is cut into columns `1 / resolution` inches wide. Each column
//! remembers the lowest `y` below which everything is spoken for, so a piece
//! spanning some columns can safely rest at the highest of their values.

use tracing::debug;

use crate::types::{Piece, Placement, StockSheet, Unplaced, UnplacedReason};
use crate::waste::{CellRect, OccupancyGrid, ScanDirection, cells_ceil, cells_floor};

/// Grid geometry shared by the skyline and the row packer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Grid {
    pub resolution: u32,
    pub cols: usize,
    pub rows: usize,
    pub kerf: usize,
}

impl Grid {
    pub fn new(stock: &StockSheet, resolution: u32, kerf: f64) -> Self {
        Self {
            resolution,
            cols: cells_floor(stock.width.inches(), resolution),
            rows: cells_floor(stock.height.inches(), resolution),
            kerf: cells_ceil(kerf, resolution),
        }
    }

    /// Whole cells a length needs; never zero.
    pub fn cells(&self, inches: f64) -> usize {
        cells_ceil(inches, self.resolution).max(1)
    }

    pub fn inches(&self, cells: usize) -> f64 {
        cells as f64 / self.resolution as f64
    }

    /// Does `piece` fit an empty sheet in some orientation?
    pub fn fits_empty(&self, piece: &Piece) -> bool {
        piece
            .orientations()
            .any(|(w, h, _)| self.cells(w) <= self.cols && self.cells(h) <= self.rows)
    }

    pub fn placement(&self, piece: &Piece, x: usize, y: usize, rotated: bool) -> Placement {
        let (width, height) = if rotated {
            (piece.height, piece.width)
        } else {
            (piece.width, piece.height)
        };
        Placement {
            x: self.inches(x),
            y: self.inches(y),
            width,
            height,
            rotated,
            source: piece.source,
            label: piece.label.clone(),
            is_bracket: piece.is_bracket,
        }
    }
}

/// Result of a skyline run that is allowed to ask for the fallback.
#[derive(Debug)]
pub enum PackOutcome {
    /// Every piece was either placed or reported unplaced.
    Done(Vec<Unplaced>),
    /// A piece that fits an empty sheet could not be seated. Holds that
    /// piece and everything after it.
    NeedsFallback(Vec<Piece>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    x: usize,
    y: usize,
    rotated: bool,
}

/// Working state of one packing run: the height map plus what has been
/// placed so far.
#[derive(Debug, Clone)]
pub struct PlacementSession {
    grid: Grid,
    heights: Vec<usize>,
    footprints: Vec<CellRect>,
    placements: Vec<Placement>,
    reuse_waste: bool,
}

impl PlacementSession {
    pub(crate) fn new(grid: Grid, reuse_waste: bool) -> Self {
        Self {
            grid,
            heights: vec![0; grid.cols],
            footprints: Vec::new(),
            placements: Vec::new(),
            reuse_waste,
        }
    }

    /// Starts from placements made by another strategy.
    pub(crate) fn seeded(grid: Grid, reuse_waste: bool, placements: Vec<Placement>) -> Self {
        let mut session = Self::new(grid, reuse_waste);
        for p in placements {
            let x = cells_floor(p.x, grid.resolution);
            let y = cells_floor(p.y, grid.resolution);
            let w = grid.cells(p.width);
            let h = grid.cells(p.height);
            session.occupy(x, y, w, h);
            session.placements.push(p);
        }
        session
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn into_placements(self) -> Vec<Placement> {
        self.placements
    }

    /// Places pieces in order, stopping at the first one that fits an empty
    /// sheet but not this one.
    pub fn try_place_all(&mut self, pieces: &[Piece]) -> PackOutcome {
        let mut unplaced = Vec::new();
        for (i, piece) in pieces.iter().enumerate() {
            if self.place(piece) {
                continue;
            }
            if self.grid.fits_empty(piece) {
                return PackOutcome::NeedsFallback(pieces[i..].to_vec());
            }
            unplaced.push(no_room(piece));
        }
        PackOutcome::Done(unplaced)
    }

    /// Places pieces in order, reporting the ones that do not fit.
    pub fn place_all(&mut self, pieces: &[Piece]) -> Vec<Unplaced> {
        pieces
            .iter()
            .filter(|piece| !self.place(piece))
            .map(no_room)
            .collect()
    }

    /// Seats one piece on the skyline, or in free space beneath it.
    pub fn place(&mut self, piece: &Piece) -> bool {
        let candidate = self
            .skyline_candidate(piece)
            .or_else(|| self.reuse_waste.then(|| self.hole_candidate(piece)).flatten());

        let Some(Candidate { x, y, rotated }) = candidate else {
            debug!(label = %piece.label, "no position on sheet");
            return false;
        };

        let placement = self.grid.placement(piece, x, y, rotated);
        let (w, h) = (
            self.grid.cells(placement.width),
            self.grid.cells(placement.height),
        );
        self.occupy(x, y, w, h);
        debug!(
            label = %piece.label,
            x = placement.x,
            y = placement.y,
            rotated,
            "placed"
        );
        self.placements.push(placement);
        true
    }

    /// Lowest-then-leftmost position over both orientations. The original
    /// orientation wins ties.
    fn skyline_candidate(&self, piece: &Piece) -> Option<Candidate> {
        piece
            .orientations()
            .filter_map(|(w, h, rotated)| {
                self.lowest_fit(self.grid.cells(w), self.grid.cells(h))
                    .map(|(x, y)| Candidate { x, y, rotated })
            })
            .min_by_key(|c| (c.y, c.x, c.rotated))
    }

    /// Lowest `y` (then lowest `x`) for a `w` x `h` cell footprint. The
    /// kerf gap to the right counts towards the columns that must be clear.
    fn lowest_fit(&self, w: usize, h: usize) -> Option<(usize, usize)> {
        let Grid { cols, rows, kerf, .. } = self.grid;
        if w > cols || h > rows {
            return None;
        }

        let mut best: Option<(usize, usize)> = None;
        for x in 0..=cols - w {
            let span = (w + kerf).min(cols - x);
            let y = self.heights[x..x + span].iter().copied().max().unwrap_or(0);
            if y + h > rows {
                continue;
            }
            if best.is_none_or(|(_, best_y)| y < best_y) {
                best = Some((x, y));
            }
        }
        best
    }

    /// Free space under the skyline: the first waste block that holds the
    /// piece, else the first free window anywhere on the sheet.
    fn hole_candidate(&self, piece: &Piece) -> Option<Candidate> {
        let Grid { cols, rows, kerf, .. } = self.grid;
        let mut occupancy = OccupancyGrid::new(cols, rows);
        for footprint in &self.footprints {
            occupancy.fill(*footprint);
        }

        self.block_candidate(&occupancy, piece).or_else(|| {
            // Blocks can split an L-shaped hole that still holds the piece.
            piece
                .orientations()
                .filter_map(|(w, h, rotated)| {
                    occupancy
                        .first_free_window(self.grid.cells(w), self.grid.cells(h), kerf)
                        .map(|(x, y)| Candidate { x, y, rotated })
                })
                .min_by_key(|c| (c.y, c.x, c.rotated))
        })
    }

    /// First block, scanning from the top, that holds the piece plus its kerf.
    fn block_candidate(&self, occupancy: &OccupancyGrid, piece: &Piece) -> Option<Candidate> {
        let Grid { cols, rows, kerf, .. } = self.grid;
        occupancy
            .free_blocks(ScanDirection::FromTop)
            .into_iter()
            .find_map(|block| {
                piece.orientations().find_map(|(w, h, rotated)| {
                    let (w, h) = (self.grid.cells(w), self.grid.cells(h));
                    if block.x + w > cols || block.y + h > rows {
                        return None;
                    }
                    let need_w = (w + kerf).min(cols - block.x);
                    let need_h = (h + kerf).min(rows - block.y);
                    (need_w <= block.w && need_h <= block.h).then_some(Candidate {
                        x: block.x,
                        y: block.y,
                        rotated,
                    })
                })
            })
    }

    /// Records a footprint and raises the height map over it.
    fn occupy(&mut self, x: usize, y: usize, w: usize, h: usize) {
        let Grid { cols, rows, kerf, .. } = self.grid;
        let x_end = (x + w + kerf).min(cols);
        let top = (y + h + kerf).min(rows);
        for column in &mut self.heights[x.min(x_end)..x_end] {
            *column = (*column).max(top);
        }
        self.footprints.push(CellRect {
            x,
            y,
            w: x_end.saturating_sub(x),
            h: top.saturating_sub(y),
        });
    }
}

fn no_room(piece: &Piece) -> Unplaced {
    Unplaced {
        source: piece.source,
        label: piece.label.clone(),
        reason: UnplacedReason::NoRoom,
    }
}
