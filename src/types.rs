use serde::{Deserialize, Serialize};

use crate::error::{DegenerateInput, Error, Result};
use crate::measure::{Dimension, Unit, format_inches};

/// Slack used when comparing inch values that came out of float arithmetic.
pub const EPSILON: f64 = 1e-9;

fn ensure_positive(what: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidDimension { what, value })
    }
}

/// A flat rectangular sheet, dimensions in inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSheet {
    pub width: Dimension,
    pub height: Dimension,
}

impl StockSheet {
    pub fn new(width: Dimension, height: Dimension) -> Result<Self> {
        ensure_positive("stock width", width.inches())?;
        ensure_positive("stock height", height.inches())?;
        Ok(Self { width, height })
    }

    /// Builds a sheet from raw values in `unit`, normalized to inches.
    pub fn from_unit(width: f64, height: f64, unit: Unit) -> Result<Self> {
        Self::new(
            Dimension::from_unit(width, unit),
            Dimension::from_unit(height, unit),
        )
    }

    pub fn area(&self) -> f64 {
        self.width.inches() * self.height.inches()
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("stock width", self.width.inches())?;
        ensure_positive("stock height", self.height.inches())
    }
}

impl std::fmt::Display for StockSheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.width, self.height)
    }
}

/// Linear stock. Only the length takes part in segmenting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPipe {
    pub length: Dimension,
    #[serde(default)]
    pub diameter: Option<Dimension>,
}

impl StockPipe {
    pub fn new(length: Dimension) -> Result<Self> {
        ensure_positive("pipe length", length.inches())?;
        Ok(Self {
            length,
            diameter: None,
        })
    }

    pub fn from_unit(length: f64, unit: Unit) -> Result<Self> {
        Self::new(Dimension::from_unit(length, unit))
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("pipe length", self.length.inches())
    }
}

/// A requested rectangle, `quantity` times over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPiece {
    pub width: Dimension,
    pub height: Dimension,
    #[serde(default = "default_quantity", alias = "qty")]
    pub quantity: u32,
    #[serde(default = "default_true")]
    pub allow_rotation: bool,
    #[serde(default)]
    pub is_bracket: bool,
    #[serde(default)]
    pub label: String,
}

fn default_quantity() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl CutPiece {
    /// Rotation is allowed unless the piece is square.
    pub fn new(width: Dimension, height: Dimension, quantity: u32) -> Self {
        let label = format!("{} x {}", width.text(), height.text());
        let allow_rotation = width != height;
        Self {
            width,
            height,
            quantity,
            allow_rotation,
            is_bracket: false,
            label,
        }
    }

    pub fn with_rotation(mut self, allow: bool) -> Self {
        self.allow_rotation = allow && self.width != self.height;
        self
    }

    pub fn bracket(mut self, is_bracket: bool) -> Self {
        self.is_bracket = is_bracket;
        self
    }

    pub fn area(&self) -> f64 {
        self.width.inches() * self.height.inches()
    }

    /// Can this piece be turned 90 degrees? Square pieces never are.
    pub fn rotatable(&self) -> bool {
        self.allow_rotation && self.width != self.height
    }

    /// Fills in a missing label and checks sizes and quantity.
    pub(crate) fn normalized(&self) -> Result<Self> {
        ensure_positive("piece width", self.width.inches())?;
        ensure_positive("piece height", self.height.inches())?;
        if self.quantity == 0 {
            return Err(Error::InvalidDimension {
                what: "piece quantity",
                value: 0.0,
            });
        }
        let mut piece = self.clone();
        if piece.label.is_empty() {
            piece.label = format!("{} x {}", piece.width.text(), piece.height.text());
        }
        piece.allow_rotation = piece.rotatable();
        Ok(piece)
    }
}

/// A requested length of linear stock, `quantity` times over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearCut {
    pub length: Dimension,
    #[serde(default = "default_quantity", alias = "qty")]
    pub quantity: u32,
    #[serde(default)]
    pub label: String,
}

impl LinearCut {
    pub fn new(length: Dimension, quantity: u32) -> Self {
        let label = length.text().to_string();
        Self {
            length,
            quantity,
            label,
        }
    }

    pub(crate) fn normalized(&self) -> Result<Self> {
        ensure_positive("cut length", self.length.inches())?;
        if self.quantity == 0 {
            return Err(Error::InvalidDimension {
                what: "cut quantity",
                value: 0.0,
            });
        }
        let mut cut = self.clone();
        if cut.label.is_empty() {
            cut.label = cut.length.text().to_string();
        }
        Ok(cut)
    }
}

/// One line of a cut list, for either kind of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CutRequest {
    Linear(LinearCut),
    Rectangular(CutPiece),
}

/// A single physical piece after quantity expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// Position in the expanded request list (caller order).
    pub source: usize,
    pub width: f64,
    pub height: f64,
    pub allow_rotation: bool,
    pub is_bracket: bool,
    pub label: String,
}

impl Piece {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Orientations worth trying, original first.
    pub fn orientations(&self) -> impl Iterator<Item = (f64, f64, bool)> {
        let rotated = (self.allow_rotation && self.width != self.height)
            .then_some((self.height, self.width, true));
        std::iter::once((self.width, self.height, false)).chain(rotated)
    }

    /// `Some` when the piece exceeds the stock on both axes in every
    /// orientation it may take.
    pub fn degenerate_for(&self, stock: &StockSheet) -> Option<DegenerateInput> {
        let (sw, sh) = (stock.width.inches(), stock.height.inches());
        let hopeless = self
            .orientations()
            .all(|(w, h, _)| w > sw + EPSILON && h > sh + EPSILON);
        hopeless.then(|| DegenerateInput {
            label: self.label.clone(),
            width: self.width,
            height: self.height,
            stock_width: sw,
            stock_height: sh,
        })
    }
}

/// Where one piece landed on the sheet. `x`/`y` are the top-left offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotated: bool,
    pub source: usize,
    pub label: String,
    pub is_bracket: bool,
}

impl Placement {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Open-rectangle intersection; touching edges do not overlap.
    pub fn overlaps(&self, other: &Placement) -> bool {
        self.x < other.right() - EPSILON
            && other.x < self.right() - EPSILON
            && self.y < other.bottom() - EPSILON
            && other.y < self.bottom() - EPSILON
    }
}

/// An uncovered rectangle of stock left over after placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WasteBlock {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WasteBlock {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn label(&self) -> String {
        format!("{} x {}", format_inches(self.width), format_inches(self.height))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnplacedReason {
    /// Could fit some stock, but not what was left of this one.
    NoRoom,
    /// Cannot fit this stock in any orientation.
    Degenerate(DegenerateInput),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unplaced {
    pub source: usize,
    pub label: String,
    #[serde(flatten)]
    pub reason: UnplacedReason,
}

/// Result of packing one sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub stock: StockSheet,
    /// In placement order.
    pub placements: Vec<Placement>,
    pub unplaced: Vec<Unplaced>,
    pub waste: Vec<WasteBlock>,
    /// True when the row-based fallback produced this layout.
    pub used_fallback: bool,
}

impl Layout {
    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    pub fn unplaced_labels(&self) -> Vec<&str> {
        self.unplaced.iter().map(|u| u.label.as_str()).collect()
    }

    pub fn used_area(&self) -> f64 {
        self.placements.iter().map(Placement::area).sum()
    }

    pub fn waste_area(&self) -> f64 {
        self.stock.area() - self.used_area()
    }

    pub fn waste_percent(&self) -> f64 {
        let stock_area = self.stock.area();
        if stock_area <= 0.0 {
            return 0.0;
        }
        self.waste_area() / stock_area * 100.0
    }
}

/// One accepted cut along a pipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearPlacement {
    pub offset: f64,
    pub length: f64,
    pub source: usize,
    pub label: String,
}

/// Result of segmenting one pipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipeLayout {
    pub stock: StockPipe,
    pub cuts: Vec<LinearPlacement>,
    pub unplaced: Vec<Unplaced>,
    /// Scrap at the end of the pipe, inches.
    pub leftover: f64,
}

impl PipeLayout {
    /// Accepted cut lengths followed by the leftover, if any, as a final
    /// scrap segment.
    pub fn segments(&self) -> Vec<f64> {
        let mut segments: Vec<f64> = self.cuts.iter().map(|c| c.length).collect();
        if self.leftover > EPSILON {
            segments.push(self.leftover);
        }
        segments
    }

    pub fn leftover_label(&self) -> String {
        format_inches(self.leftover)
    }
}
