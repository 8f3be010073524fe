//! Measurement parsing for shop-floor lengths like `24 3/8`, `1/2` or `60.25"`.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, ParseError, ParseErrorKind};

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Largest denominator used when formatting inches as a mixed fraction.
const MAX_DENOMINATOR: u64 = 16;

/// A parsed length: canonical inches plus the text it was written as.
///
/// Equality and ordering only look at the canonical value, so `"1/2"` and
/// `"0.5"` compare equal.
#[derive(Debug, Clone, Serialize)]
pub struct Dimension {
    inches: f64,
    text: String,
}

impl Dimension {
    /// Builds a dimension from a value already in inches, rendering the
    /// display text as a mixed fraction.
    pub fn from_inches(inches: f64) -> Self {
        Self {
            inches,
            text: format_inches(inches),
        }
    }

    /// Builds a dimension from a value in `unit`.
    pub fn from_unit(value: f64, unit: Unit) -> Self {
        Self::from_inches(unit.to_inches(value))
    }

    pub fn inches(&self) -> f64 {
        self.inches
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.inches == other.inches
    }
}

impl PartialOrd for Dimension {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.inches.partial_cmp(&other.inches)
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Dimension {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_inches(s)
    }
}

/// Accepts a JSON number (inches), a measurement string, or the serialized
/// `{ "inches", "text" }` form.
impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
            Full { inches: f64, text: String },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(inches) => {
                if !inches.is_finite() {
                    return Err(serde::de::Error::custom("measurement must be finite"));
                }
                Ok(Dimension::from_inches(inches))
            }
            Raw::Text(text) => parse_inches(&text).map_err(serde::de::Error::custom),
            Raw::Full { inches, text } => Ok(Dimension { inches, text }),
        }
    }
}

/// Length units accepted for stock dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    #[serde(alias = "in", alias = "inches")]
    Inch,
    #[serde(alias = "ft", alias = "feet")]
    Foot,
    #[serde(alias = "mm")]
    Millimeter,
}

impl Unit {
    pub fn to_inches(self, value: f64) -> f64 {
        match self {
            Unit::Inch => value,
            Unit::Foot => value * 12.0,
            Unit::Millimeter => value / MM_PER_INCH,
        }
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "inch" | "inches" | "\"" => Ok(Unit::Inch),
            "ft" | "foot" | "feet" | "'" => Ok(Unit::Foot),
            "mm" | "millimeter" | "millimeters" => Ok(Unit::Millimeter),
            other => Err(Error::InvalidUnit(other.to_string())),
        }
    }
}

/// Parses a decimal (`60.25`), a plain fraction (`1/2`) or a mixed number
/// (`24 3/8`) into inches. A trailing inch mark (`"`, `in`, `inch`) is
/// ignored.
pub fn parse_inches(text: &str) -> Result<Dimension, ParseError> {
    let display = text.trim();
    let body = strip_inch_mark(display);

    if body.is_empty() {
        return Err(ParseError::new(text, ParseErrorKind::Empty));
    }
    if body.starts_with('-') {
        return Err(ParseError::new(text, ParseErrorKind::Negative));
    }

    let tokens: Vec<&str> = body.split_whitespace().collect();
    let inches = match tokens.as_slice() {
        [single] if single.contains('/') => parse_fraction(text, single)?,
        [single] => parse_decimal(text, single)?,
        [whole, fraction] => {
            let whole = whole
                .parse::<u64>()
                .map_err(|_| ParseError::new(text, ParseErrorKind::Malformed))?;
            whole as f64 + parse_fraction(text, fraction)?
        }
        _ => return Err(ParseError::new(text, ParseErrorKind::Malformed)),
    };

    Ok(Dimension {
        inches,
        text: tokens.join(" "),
    })
}

fn strip_inch_mark(s: &str) -> &str {
    let lower = s.to_ascii_lowercase();
    for mark in ["inches", "inch", "in", "\""] {
        if lower.ends_with(mark) {
            return s[..s.len() - mark.len()].trim_end();
        }
    }
    s
}

fn parse_fraction(input: &str, token: &str) -> Result<f64, ParseError> {
    let (num, den) = token
        .split_once('/')
        .ok_or_else(|| ParseError::new(input, ParseErrorKind::Malformed))?;
    let num = num
        .parse::<u64>()
        .map_err(|_| ParseError::new(input, ParseErrorKind::Malformed))?;
    let den = den
        .parse::<u64>()
        .map_err(|_| ParseError::new(input, ParseErrorKind::Malformed))?;
    if den == 0 {
        return Err(ParseError::new(input, ParseErrorKind::ZeroDenominator));
    }
    Ok(num as f64 / den as f64)
}

fn parse_decimal(input: &str, token: &str) -> Result<f64, ParseError> {
    // f64::from_str also takes "inf" and "NaN"; those are not lengths.
    if !token.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '+') {
        return Err(ParseError::new(input, ParseErrorKind::Malformed));
    }
    let value = token
        .parse::<f64>()
        .map_err(|_| ParseError::new(input, ParseErrorKind::Malformed))?;
    if !value.is_finite() {
        return Err(ParseError::new(input, ParseErrorKind::NonFinite));
    }
    Ok(value)
}

/// Renders inches as a mixed fraction with a denominator of at most 16,
/// e.g. `24.375` -> `"24 3/8"`, `0.5` -> `"1/2"`, `12.0` -> `"12"`.
pub fn format_inches(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    let mut whole = magnitude.trunc() as u64;
    let (mut num, den) = closest_fraction(magnitude - whole as f64);
    if num == den {
        whole += 1;
        num = 0;
    }

    match (whole, num) {
        (w, 0) => format!("{sign}{w}"),
        (0, n) => format!("{sign}{n}/{den}"),
        (w, n) => format!("{sign}{w} {n}/{den}"),
    }
}

/// Closest fraction to `frac` (in `[0, 1)`) with denominator up to
/// [`MAX_DENOMINATOR`], reduced; smaller denominators win ties.
fn closest_fraction(frac: f64) -> (u64, u64) {
    let mut best = (0, 1);
    let mut best_err = frac;
    for den in 2..=MAX_DENOMINATOR {
        let num = (frac * den as f64).round() as u64;
        let err = (frac - num as f64 / den as f64).abs();
        if err + 1e-12 < best_err {
            best = (num, den);
            best_err = err;
        }
    }
    let g = gcd(best.0, best.1);
    if g > 1 { (best.0 / g, best.1 / g) } else { best }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}
