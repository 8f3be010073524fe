use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::group::{expand, expand_linear, reorder};
use crate::pipe::segment;
use crate::rows::optimize_rows;
use crate::skyline::{Grid, PackOutcome, PlacementSession};
use crate::types::{
    CutPiece, CutRequest, Layout, LinearCut, Piece, PipeLayout, Placement, StockPipe, StockSheet,
    Unplaced, UnplacedReason,
};
use crate::waste::{self, DEFAULT_RESOLUTION, ScanDirection, cells_ceil};

/// Tunables for one packing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    /// Height-map columns per inch.
    pub resolution: u32,
    /// Blade kerf in inches, left between neighbouring pieces.
    pub kerf: f64,
    /// Switch to the row packer once when the skyline gets stuck.
    pub allow_fallback: bool,
    /// Grid cells per inch for the end-of-layout waste report.
    pub waste_resolution: u32,
    /// Try holes under the skyline before giving up on a piece.
    pub reuse_waste: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            kerf: 0.0,
            allow_fallback: true,
            waste_resolution: DEFAULT_RESOLUTION,
            reuse_waste: true,
        }
    }
}

/// Finest grid accepted, in cells per inch.
pub const MAX_RESOLUTION: u32 = 64;

/// Most cells one sheet grid may hold.
pub const MAX_GRID_CELLS: usize = 1 << 24;

impl PackOptions {
    pub fn validate(&self) -> Result<()> {
        for resolution in [self.resolution, self.waste_resolution] {
            if resolution == 0 || resolution > MAX_RESOLUTION {
                return Err(Error::InvalidOptions(format!(
                    "resolution must be between 1 and {MAX_RESOLUTION} cells per inch, got {resolution}"
                )));
            }
        }
        if !self.kerf.is_finite() || self.kerf < 0.0 {
            return Err(Error::InvalidOptions(format!(
                "kerf must be a non-negative length, got {}",
                self.kerf
            )));
        }
        Ok(())
    }

    /// Checks the options and that the grids they imply for `stock` stay
    /// within [`MAX_GRID_CELLS`].
    pub fn validate_for(&self, stock: &StockSheet) -> Result<()> {
        self.validate()?;
        for resolution in [self.resolution, self.waste_resolution] {
            let cells = cells_ceil(stock.width.inches(), resolution)
                .checked_mul(cells_ceil(stock.height.inches(), resolution))
                .filter(|&cells| cells <= MAX_GRID_CELLS);
            if cells.is_none() {
                return Err(Error::InvalidOptions(format!(
                    "{stock} at {resolution} cells per inch exceeds {MAX_GRID_CELLS} grid cells"
                )));
            }
        }
        Ok(())
    }
}

/// Packs one sheet.
pub struct Solver {
    stock: StockSheet,
    options: PackOptions,
    pieces: Vec<CutPiece>,
}

impl Solver {
    pub fn new(stock: StockSheet, options: PackOptions, pieces: Vec<CutPiece>) -> Self {
        Self {
            stock,
            options,
            pieces,
        }
    }

    /// Expands, orders and places the cut list, then reports waste.
    ///
    /// Fails only on bad input (non-positive sizes, zero quantities, bad
    /// options). Pieces that do not fit are returned in `unplaced`.
    pub fn solve(&self) -> Result<Layout> {
        self.stock.validate()?;
        self.options.validate_for(&self.stock)?;
        let normalized = self
            .pieces
            .iter()
            .map(CutPiece::normalized)
            .collect::<Result<Vec<_>>>()?;

        Ok(place(&self.stock, &reorder(&expand(&normalized)), &self.options))
    }
}

/// Places already-ordered pieces on `stock` and reports the waste.
///
/// Pieces larger than the sheet on both axes are reported as degenerate and
/// skipped. The rest go to the skyline; on the first piece it cannot seat,
/// the whole list is re-laid once in rows, and the skyline seats whatever
/// the rows left out.
///
/// `options` must pass [`PackOptions::validate_for`] on `stock`.
pub fn place(stock: &StockSheet, ordered: &[Piece], options: &PackOptions) -> Layout {
    let mut unplaced = Vec::new();
    let mut candidates = Vec::new();
    for piece in ordered {
        match piece.degenerate_for(stock) {
            Some(err) => {
                warn!(error = %err, "skipping piece");
                unplaced.push(Unplaced {
                    source: piece.source,
                    label: piece.label.clone(),
                    reason: UnplacedReason::Degenerate(err),
                });
            }
            None => candidates.push(piece.clone()),
        }
    }

    let (placements, rest, used_fallback) = run_strategies(stock, &candidates, options);
    unplaced.extend(rest);

    let waste = waste::scan(
        stock,
        &placements,
        ScanDirection::FromBottom,
        options.waste_resolution.max(1),
    );

    info!(
        stock = %stock,
        placed = placements.len(),
        unplaced = unplaced.len(),
        waste_blocks = waste.len(),
        used_fallback,
        "sheet packed"
    );

    Layout {
        stock: stock.clone(),
        placements,
        unplaced,
        waste,
        used_fallback,
    }
}

fn run_strategies(
    stock: &StockSheet,
    pieces: &[Piece],
    options: &PackOptions,
) -> (Vec<Placement>, Vec<Unplaced>, bool) {
    let grid = Grid::new(stock, options.resolution.max(1), options.kerf.max(0.0));
    let mut session = PlacementSession::new(grid, options.reuse_waste);

    if !options.allow_fallback {
        let unplaced = session.place_all(pieces);
        return (session.into_placements(), unplaced, false);
    }

    match session.try_place_all(pieces) {
        PackOutcome::Done(unplaced) => (session.into_placements(), unplaced, false),
        PackOutcome::NeedsFallback(stuck) => {
            warn!(
                label = %stuck[0].label,
                pending = stuck.len(),
                discarded = session.placements().len(),
                "skyline stuck, re-laying all pieces in rows"
            );
            let rows = optimize_rows(&grid, pieces);
            info!(
                rows_height = grid.inches(rows.used_rows),
                in_rows = rows.placements.len(),
                "row layout built"
            );
            let mut session = PlacementSession::seeded(grid, options.reuse_waste, rows.placements);
            let unplaced = session.place_all(&rows.remaining);
            (session.into_placements(), unplaced, true)
        }
    }
}

/// Packs `pieces` onto `stock` with default options.
pub fn pack_sheet(stock: &StockSheet, pieces: &[CutPiece]) -> Result<Layout> {
    pack_sheet_with(stock, pieces, &PackOptions::default())
}

pub fn pack_sheet_with(
    stock: &StockSheet,
    pieces: &[CutPiece],
    options: &PackOptions,
) -> Result<Layout> {
    Solver::new(stock.clone(), options.clone(), pieces.to_vec()).solve()
}

/// Cuts `cuts` from `stock` in the order given, with no kerf.
pub fn pack_pipe(stock: &StockPipe, cuts: &[LinearCut]) -> Result<PipeLayout> {
    pack_pipe_with(stock, cuts, &PackOptions::default())
}

/// Only `kerf` is read from `options`.
pub fn pack_pipe_with(
    stock: &StockPipe,
    cuts: &[LinearCut],
    options: &PackOptions,
) -> Result<PipeLayout> {
    options.validate()?;
    stock.validate()?;
    let normalized = cuts
        .iter()
        .map(LinearCut::normalized)
        .collect::<Result<Vec<_>>>()?;
    let layout = segment(stock, &expand_linear(&normalized), options.kerf);
    info!(
        length = %stock.length,
        cuts = layout.cuts.len(),
        unplaced = layout.unplaced.len(),
        leftover = layout.leftover,
        "pipe segmented"
    );
    Ok(layout)
}

/// Either kind of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stock {
    Sheet(StockSheet),
    Pipe(StockPipe),
}

/// One independent packing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub stock: Stock,
    pub cuts: Vec<CutRequest>,
    #[serde(default)]
    pub options: PackOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Packed {
    Sheet(Layout),
    Pipe(PipeLayout),
}

impl Job {
    pub fn run(&self) -> Result<Packed> {
        match &self.stock {
            Stock::Sheet(sheet) => {
                let pieces = self
                    .cuts
                    .iter()
                    .map(|c| match c {
                        CutRequest::Rectangular(p) => Ok(p.clone()),
                        CutRequest::Linear(_) => Err(Error::MixedCutKinds {
                            stock: "sheet",
                            cut: "linear",
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                pack_sheet_with(sheet, &pieces, &self.options).map(Packed::Sheet)
            }
            Stock::Pipe(pipe) => {
                let cuts = self
                    .cuts
                    .iter()
                    .map(|c| match c {
                        CutRequest::Linear(l) => Ok(l.clone()),
                        CutRequest::Rectangular(_) => Err(Error::MixedCutKinds {
                            stock: "pipe",
                            cut: "rectangular",
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                pack_pipe_with(pipe, &cuts, &self.options).map(Packed::Pipe)
            }
        }
    }
}

/// Runs independent jobs in parallel. Results keep the input order.
pub fn pack_jobs(jobs: &[Job]) -> Vec<Result<Packed>> {
    jobs.par_iter().map(Job::run).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Dimension, Unit, parse_inches};
    use proptest::prelude::*;

    fn dim(s: &str) -> Dimension {
        parse_inches(s).unwrap()
    }

    fn sheet(w: &str, h: &str) -> StockSheet {
        StockSheet::new(dim(w), dim(h)).unwrap()
    }

    fn cut(w: &str, h: &str, qty: u32) -> CutPiece {
        CutPiece::new(dim(w), dim(h), qty)
    }

    /// Validates a complete layout:
    /// 1. Every placement lies within the stock
    /// 2. No two placements overlap
    /// 3. Placed plus unplaced equals the expanded request count
    /// 4. Rotation swaps the source dimensions, never scales them
    /// 5. Waste blocks plus placements cover the sheet exactly
    fn assert_layout_valid(layout: &Layout, pieces: &[CutPiece]) {
        let stock = &layout.stock;
        let (sw, sh) = (stock.width.inches(), stock.height.inches());
        let expanded = expand(pieces);

        assert_eq!(
            layout.placements.len() + layout.unplaced.len(),
            expanded.len(),
            "conservation"
        );

        for (i, p) in layout.placements.iter().enumerate() {
            assert!(p.x >= 0.0 && p.y >= 0.0, "piece {i} at negative offset");
            assert!(p.right() <= sw + 1e-9, "piece {i} ({}) exceeds width", p.label);
            assert!(p.bottom() <= sh + 1e-9, "piece {i} ({}) exceeds height", p.label);

            let source = &expanded[p.source];
            if p.rotated {
                assert_eq!((p.width, p.height), (source.height, source.width));
            } else {
                assert_eq!((p.width, p.height), (source.width, source.height));
            }
            for (j, q) in layout.placements.iter().enumerate().skip(i + 1) {
                assert!(
                    !p.overlaps(q),
                    "piece {i} ({} @ ({},{})) overlaps piece {j} ({} @ ({},{}))",
                    p.label,
                    p.x,
                    p.y,
                    q.label,
                    q.x,
                    q.y
                );
            }
        }

        let mut sources: Vec<usize> = layout
            .placements
            .iter()
            .map(|p| p.source)
            .chain(layout.unplaced.iter().map(|u| u.source))
            .collect();
        sources.sort_unstable();
        assert_eq!(sources, (0..expanded.len()).collect::<Vec<_>>());
    }

    fn assert_waste_tiles(layout: &Layout) {
        let waste: f64 = layout.waste.iter().map(|w| w.area()).sum();
        assert!(
            (waste + layout.used_area() - layout.stock.area()).abs() < 1e-6,
            "waste {waste} + used {} != stock {}",
            layout.used_area(),
            layout.stock.area()
        );
        for w in &layout.waste {
            let block = Placement {
                x: w.x,
                y: w.y,
                width: w.width,
                height: w.height,
                rotated: false,
                source: 0,
                label: String::new(),
                is_bracket: false,
            };
            assert!(layout.placements.iter().all(|p| !p.overlaps(&block)));
        }
    }

    #[test]
    fn test_full_sheet_piece() {
        let stock = sheet("48", "96");
        let pieces = vec![cut("48", "96", 1)];
        let layout = pack_sheet(&stock, &pieces).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert_eq!(layout.placements.len(), 1);
        let p = &layout.placements[0];
        assert_eq!((p.x, p.y, p.width, p.height), (0.0, 0.0, 48.0, 96.0));
        assert!(layout.waste.is_empty());
        assert!(layout.unplaced.is_empty());
    }

    #[test]
    fn test_two_tall_pieces_one_unplaced() {
        let stock = sheet("48", "96");
        let pieces = vec![cut("48", "50", 2)];
        let layout = pack_sheet(&stock, &pieces).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert_eq!(layout.placements.len(), 1);
        assert_eq!(layout.placements[0].y, 0.0);
        assert_eq!(layout.unplaced.len(), 1);
        assert_eq!(layout.unplaced[0].reason, UnplacedReason::NoRoom);
        assert_waste_tiles(&layout);
    }

    #[test]
    fn test_piece_too_long_either_way() {
        let stock = sheet("10", "10");
        let pieces = vec![cut("12", "5", 1)];
        let layout = pack_sheet(&stock, &pieces).unwrap();
        assert!(layout.placements.is_empty());
        assert_eq!(layout.unplaced_labels(), vec!["12 x 5"]);
        assert!(!layout.used_fallback);
    }

    #[test]
    fn test_degenerate_piece_does_not_abort() {
        let stock = sheet("10", "10");
        let pieces = vec![cut("12", "12", 1), cut("5", "5", 2)];
        let layout = pack_sheet(&stock, &pieces).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert_eq!(layout.placements.len(), 2);
        assert!(matches!(
            layout.unplaced[0].reason,
            UnplacedReason::Degenerate(_)
        ));
    }

    #[test]
    fn test_bad_input_is_an_error() {
        let stock = sheet("10", "10");
        assert!(matches!(
            pack_sheet(&stock, &[cut("0", "5", 1)]),
            Err(Error::InvalidDimension { .. })
        ));
        assert!(matches!(
            pack_sheet(&stock, &[cut("5", "5", 0)]),
            Err(Error::InvalidDimension { .. })
        ));
        let options = PackOptions {
            kerf: -1.0,
            ..PackOptions::default()
        };
        assert!(matches!(
            pack_sheet_with(&stock, &[cut("5", "5", 1)], &options),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_grid_size_is_bounded() {
        let stock = sheet("48", "96");
        let pieces = [cut("5", "5", 1)];
        for options in [
            PackOptions {
                resolution: u32::MAX,
                ..PackOptions::default()
            },
            PackOptions {
                waste_resolution: MAX_RESOLUTION + 1,
                ..PackOptions::default()
            },
        ] {
            assert!(matches!(
                pack_sheet_with(&stock, &pieces, &options),
                Err(Error::InvalidOptions(_))
            ));
        }

        // Fine enough on its own, but too many cells for a huge sheet.
        let huge = sheet("4800", "9600");
        assert!(matches!(
            pack_sheet(&huge, &pieces),
            Err(Error::InvalidOptions(_))
        ));

        let finest = PackOptions {
            resolution: 16,
            waste_resolution: 16,
            ..PackOptions::default()
        };
        assert_eq!(
            pack_sheet_with(&stock, &pieces, &finest).unwrap().placements.len(),
            1
        );
    }

    #[test]
    fn test_free_window_found_without_fallback() {
        let stock = sheet("10", "10");
        let piece = |source: usize, w: f64, h: f64| Piece {
            source,
            width: w,
            height: h,
            allow_rotation: false,
            is_bracket: false,
            label: format!("p{source}"),
        };
        let ordered = vec![
            piece(0, 4.0, 8.0),
            piece(1, 10.0, 2.0),
            piece(2, 3.0, 3.0),
            piece(3, 6.0, 5.0),
        ];
        let options = PackOptions {
            allow_fallback: false,
            ..PackOptions::default()
        };
        let layout = place(&stock, &ordered, &options);

        assert!(layout.unplaced.is_empty(), "unplaced {:?}", layout.unplaced_labels());
        let last = &layout.placements[3];
        assert_eq!((last.x, last.y), (4.0, 3.0));
        assert_waste_tiles(&layout);
    }

    #[test]
    fn test_metric_stock_waste_tiles() {
        let stock = StockSheet::from_unit(1220.0, 2440.0, Unit::Millimeter).unwrap();
        let pieces = vec![cut("24", "24", 1)];
        let layout = pack_sheet(&stock, &pieces).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert_waste_tiles(&layout);
        let right = stock.width.inches();
        assert!(
            layout
                .waste
                .iter()
                .any(|w| (w.x + w.width - right).abs() < 1e-9)
        );
    }

    #[test]
    fn test_fallback_engaged() {
        // The skyline strands the last 28-wide piece next to an 8 in notch;
        // the rows packer pairs 20 + 28 in every row and fills the sheet.
        let stock = sheet("48", "30");
        let pieces = vec![
            cut("20", "10", 3).with_rotation(false),
            cut("28", "10", 3).with_rotation(false),
        ];
        let layout = pack_sheet(&stock, &pieces).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert_waste_tiles(&layout);
        assert_eq!(layout.placements.len(), 6);
    }

    #[test]
    fn test_place_keeps_caller_order() {
        let stock = sheet("10", "10");
        let piece = |source: usize, w: f64, h: f64| Piece {
            source,
            width: w,
            height: h,
            allow_rotation: false,
            is_bracket: false,
            label: format!("p{source}"),
        };
        let ordered = vec![piece(0, 4.0, 4.0), piece(1, 10.0, 5.0), piece(2, 20.0, 20.0)];
        let layout = place(&stock, &ordered, &PackOptions::default());

        let at: Vec<_> = layout
            .placements
            .iter()
            .map(|p| (p.source, p.x, p.y))
            .collect();
        assert_eq!(at, vec![(0, 0.0, 0.0), (1, 0.0, 4.0)]);
        assert_eq!(layout.unplaced.len(), 1);
        assert!(matches!(
            layout.unplaced[0].reason,
            UnplacedReason::Degenerate(_)
        ));
        assert_waste_tiles(&layout);
    }

    #[test]
    fn test_fallback_disabled() {
        let stock = sheet("48", "96");
        let pieces = vec![cut("48", "50", 2)];
        let options = PackOptions {
            allow_fallback: false,
            ..PackOptions::default()
        };
        let layout = pack_sheet_with(&stock, &pieces, &options).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert!(!layout.used_fallback);
        assert_eq!(layout.unplaced.len(), 1);
    }

    #[test]
    fn test_cabinet_cut_list() {
        let stock = sheet("48", "96");
        let pieces = vec![
            cut("9", "31 3/8", 12),
            cut("12", "31 3/8", 3),
        ];
        let layout = pack_sheet(&stock, &pieces).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert_waste_tiles(&layout);
        assert!(layout.unplaced.is_empty());
        assert!(layout.waste_percent() > 0.0 && layout.waste_percent() < 100.0);
    }

    #[test]
    fn test_kerf_reduces_capacity() {
        let stock = sheet("100", "100");
        let pieces = vec![cut("50", "100", 2).with_rotation(false)];

        let layout = pack_sheet(&stock, &pieces).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert_eq!(layout.placements.len(), 2);

        let options = PackOptions {
            kerf: 0.125,
            ..PackOptions::default()
        };
        let layout = pack_sheet_with(&stock, &pieces, &options).unwrap();
        assert_layout_valid(&layout, &pieces);
        assert_eq!(layout.placements.len(), 1);
    }

    #[test]
    fn test_brackets_are_annotation_only() {
        let stock = sheet("24", "24");
        let plain = vec![cut("6 1/2", "16 1/2", 3)];
        let bracketed = vec![cut("6 1/2", "16 1/2", 3).bracket(true)];
        let a = pack_sheet(&stock, &plain).unwrap();
        let b = pack_sheet(&stock, &bracketed).unwrap();
        let coords = |l: &Layout| -> Vec<(f64, f64, bool)> {
            l.placements.iter().map(|p| (p.x, p.y, p.rotated)).collect()
        };
        assert_eq!(coords(&a), coords(&b));
        assert!(b.placements.iter().all(|p| p.is_bracket));
    }

    #[test]
    fn test_deterministic_output() {
        let stock = sheet("48", "96");
        let pieces = vec![
            cut("6 1/2", "16 1/2", 35),
            cut("19 1/2", "6 1/2", 4),
            cut("4 1/2", "13 1/2", 2),
        ];
        let a = serde_json::to_string(&pack_sheet(&stock, &pieces).unwrap()).unwrap();
        let b = serde_json::to_string(&pack_sheet(&stock, &pieces).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pipe_scenarios() {
        let cuts = vec![LinearCut::new(dim("40"), 3)];

        let layout = pack_pipe(&StockPipe::new(dim("120")).unwrap(), &cuts).unwrap();
        assert_eq!(layout.cuts.len(), 3);
        assert!(layout.unplaced.is_empty());
        assert_eq!(layout.leftover, 0.0);

        let layout = pack_pipe(&StockPipe::new(dim("100")).unwrap(), &cuts).unwrap();
        assert_eq!(layout.cuts.len(), 2);
        assert_eq!(layout.unplaced.len(), 1);
        assert_eq!(layout.leftover, 20.0);
        assert_eq!(layout.leftover_label(), "20");
    }

    #[test]
    fn test_jobs_run_in_order() {
        let jobs = vec![
            Job {
                stock: Stock::Sheet(sheet("48", "96")),
                cuts: vec![CutRequest::Rectangular(cut("24", "48", 4))],
                options: PackOptions::default(),
            },
            Job {
                stock: Stock::Pipe(StockPipe::new(dim("100")).unwrap()),
                cuts: vec![CutRequest::Linear(LinearCut::new(dim("40"), 3))],
                options: PackOptions::default(),
            },
            Job {
                stock: Stock::Pipe(StockPipe::new(dim("100")).unwrap()),
                cuts: vec![CutRequest::Rectangular(cut("1", "1", 1))],
                options: PackOptions::default(),
            },
        ];
        let results = pack_jobs(&jobs);
        assert_eq!(results.len(), 3);
        match &results[0] {
            Ok(Packed::Sheet(layout)) => assert_eq!(layout.placements.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
        match &results[1] {
            Ok(Packed::Pipe(layout)) => assert_eq!(layout.leftover, 20.0),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(results[2], Err(Error::MixedCutKinds { .. })));
    }

    #[test]
    fn test_job_from_json() {
        let job: Job = serde_json::from_str(
            r#"{
                "stock": { "kind": "sheet", "width": 48, "height": "96" },
                "cuts": [
                    { "kind": "rectangular", "width": "24 3/8", "height": "12 1/2", "qty": 2 }
                ],
                "options": { "kerf": 0.125 }
            }"#,
        )
        .unwrap();
        assert_eq!(job.options.kerf, 0.125);
        assert_eq!(job.options.resolution, 8);
        match job.run().unwrap() {
            Packed::Sheet(layout) => {
                assert_eq!(layout.placements.len(), 2);
                assert_eq!(layout.placements[0].label, "24 3/8 x 12 1/2");
            }
            Packed::Pipe(_) => panic!("expected a sheet"),
        }
    }

    fn eighths(max: u32) -> impl Strategy<Value = f64> {
        (1..=max * 8).prop_map(|n| n as f64 / 8.0)
    }

    fn millimetres(max: u32) -> impl Strategy<Value = f64> {
        (25..=max).prop_map(|mm| mm as f64 / 25.4)
    }

    fn piece_strategy() -> impl Strategy<Value = CutPiece> {
        (eighths(30), eighths(30), 1u32..4, any::<bool>()).prop_map(|(w, h, qty, rot)| {
            CutPiece::new(Dimension::from_inches(w), Dimension::from_inches(h), qty)
                .with_rotation(rot)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn layouts_hold_invariants(
            width in prop_oneof![eighths(48), millimetres(1220)],
            height in prop_oneof![eighths(48), millimetres(1220)],
            pieces in prop::collection::vec(piece_strategy(), 1..8),
            kerf in prop_oneof![Just(0.0), Just(0.125)],
        ) {
            let stock = StockSheet::new(
                Dimension::from_inches(width),
                Dimension::from_inches(height),
            ).unwrap();
            let options = PackOptions { kerf, ..PackOptions::default() };
            let layout = pack_sheet_with(&stock, &pieces, &options).unwrap();
            assert_layout_valid(&layout, &pieces);
            assert_waste_tiles(&layout);

            let again = pack_sheet_with(&stock, &pieces, &options).unwrap();
            prop_assert_eq!(layout, again);
        }
    }
}
