//! Error types for the cut optimizer.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for cut optimizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a measurement string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    Empty,
    Malformed,
    ZeroDenominator,
    Negative,
    NonFinite,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ParseErrorKind::Empty => "empty measurement",
            ParseErrorKind::Malformed => "expected a decimal, a fraction or a mixed number",
            ParseErrorKind::ZeroDenominator => "fraction has a zero denominator",
            ParseErrorKind::Negative => "measurement is negative",
            ParseErrorKind::NonFinite => "measurement is not a finite number",
        };
        f.write_str(text)
    }
}

/// A measurement string that is not a decimal, fraction or mixed number.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("invalid measurement '{input}': {kind}")]
pub struct ParseError {
    pub input: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(input: &str, kind: ParseErrorKind) -> Self {
        Self {
            input: input.to_string(),
            kind,
        }
    }
}

/// A piece that exceeds the stock on both axes in every allowed orientation.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error(
    "piece {label} ({width} x {height} in) cannot fit stock {stock_width} x {stock_height} in in any orientation"
)]
pub struct DegenerateInput {
    pub label: String,
    pub width: f64,
    pub height: f64,
    pub stock_width: f64,
    pub stock_height: f64,
}

/// Errors that can occur while preparing or running a packing request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Measurement text could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A piece cannot conceivably fit the stock.
    #[error(transparent)]
    Degenerate(#[from] DegenerateInput),

    /// A size or quantity that must be positive was not.
    #[error("{what} must be positive, got {value}")]
    InvalidDimension { what: &'static str, value: f64 },

    /// Unknown length unit.
    #[error("unknown unit '{0}', expected in, ft or mm")]
    InvalidUnit(String),

    /// Option values outside their usable range.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A sheet job carrying pipe cuts, or the other way round.
    #[error("{stock} stock cannot take {cut} cuts")]
    MixedCutKinds {
        stock: &'static str,
        cut: &'static str,
    },
}
