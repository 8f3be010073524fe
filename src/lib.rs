//! Cut layout optimizer for sheet and pipe stock.
//!
//! [`pack_sheet`] places rectangles on a single sheet with a skyline packer,
//! falling back once to a row packer, and reports the leftover rectangles.
//! [`pack_pipe`] cuts lengths from a pipe in order.

pub mod error;
pub mod group;
pub mod measure;
pub mod pipe;
pub mod render;
mod rows;
mod skyline;
pub mod solver;
pub mod types;
pub mod waste;

pub use error::{DegenerateInput, Error, ParseError, ParseErrorKind, Result};
pub use measure::{Dimension, Unit, format_inches, parse_inches};
pub use solver::{
    Job, MAX_GRID_CELLS, MAX_RESOLUTION, PackOptions, Packed, Solver, Stock, pack_jobs, pack_pipe,
    pack_pipe_with, pack_sheet, pack_sheet_with, place,
};
pub use types::{
    CutPiece, CutRequest, Layout, LinearCut, LinearPlacement, Piece, PipeLayout, Placement,
    StockPipe, StockSheet, Unplaced, UnplacedReason, WasteBlock,
};
pub use waste::{ScanDirection, find_all_waste_blocks, scan};
