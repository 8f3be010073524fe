//! Sequential cutting of linear stock.

use tracing::debug;

use crate::error::DegenerateInput;
use crate::types::{EPSILON, LinearPlacement, PipeLayout, StockPipe, Unplaced, UnplacedReason};

/// Takes cuts in the given order until the next one would run past the end
/// of the pipe. That cut and every later one are reported unplaced; what is
/// left of the pipe becomes `leftover`.
///
/// `cuts` are `(source, length, label)` triples, lengths in inches. A kerf
/// is consumed after every cut that leaves material behind it.
pub fn segment(stock: &StockPipe, cuts: &[(usize, f64, String)], kerf: f64) -> PipeLayout {
    let length = stock.length.inches();
    let mut placed = Vec::new();
    let mut unplaced = Vec::new();
    let mut cursor = 0.0;

    for (i, (source, cut, label)) in cuts.iter().enumerate() {
        if cursor + cut > length + EPSILON {
            debug!(label = %label, cursor, "pipe exhausted");
            unplaced = cuts[i..]
                .iter()
                .map(|(source, cut, label)| Unplaced {
                    source: *source,
                    label: label.clone(),
                    reason: if *cut > length + EPSILON {
                        UnplacedReason::Degenerate(DegenerateInput {
                            label: label.clone(),
                            width: *cut,
                            height: 0.0,
                            stock_width: length,
                            stock_height: 0.0,
                        })
                    } else {
                        UnplacedReason::NoRoom
                    },
                })
                .collect();
            break;
        }

        placed.push(LinearPlacement {
            offset: cursor,
            length: *cut,
            source: *source,
            label: label.clone(),
        });
        cursor = (cursor + cut + kerf).min(length);
    }

    let leftover = (length - cursor).max(0.0);
    PipeLayout {
        stock: stock.clone(),
        cuts: placed,
        unplaced,
        leftover: if leftover > EPSILON { leftover } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::Dimension;

    fn pipe(length: f64) -> StockPipe {
        StockPipe::new(Dimension::from_inches(length)).unwrap()
    }

    fn cuts(lengths: &[f64]) -> Vec<(usize, f64, String)> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &l)| (i, l, format!("{l}")))
            .collect()
    }

    #[test]
    fn test_exact_fill() {
        let layout = segment(&pipe(120.0), &cuts(&[40.0, 40.0, 40.0]), 0.0);
        assert_eq!(layout.cuts.len(), 3);
        assert!(layout.unplaced.is_empty());
        assert_eq!(layout.leftover, 0.0);
        assert_eq!(layout.segments(), vec![40.0, 40.0, 40.0]);
    }

    #[test]
    fn test_overflow_stops() {
        let layout = segment(&pipe(100.0), &cuts(&[40.0, 40.0, 40.0]), 0.0);
        assert_eq!(layout.cuts.len(), 2);
        assert_eq!(layout.unplaced.len(), 1);
        assert_eq!(layout.unplaced[0].reason, UnplacedReason::NoRoom);
        assert_eq!(layout.leftover, 20.0);
        assert_eq!(layout.segments(), vec![40.0, 40.0, 20.0]);
        assert_eq!(layout.cuts[1].offset, 40.0);
    }

    #[test]
    fn test_no_reordering_after_overflow() {
        // The 10 would fit, but cutting stops at the first overflow.
        let layout = segment(&pipe(100.0), &cuts(&[60.0, 50.0, 10.0]), 0.0);
        assert_eq!(layout.cuts.len(), 1);
        assert_eq!(layout.unplaced.len(), 2);
        assert_eq!(layout.leftover, 40.0);
    }

    #[test]
    fn test_cut_longer_than_pipe() {
        let layout = segment(&pipe(50.0), &cuts(&[60.0]), 0.0);
        assert!(layout.cuts.is_empty());
        assert!(matches!(
            layout.unplaced[0].reason,
            UnplacedReason::Degenerate(_)
        ));
        assert_eq!(layout.leftover, 50.0);
    }

    #[test]
    fn test_kerf_between_cuts() {
        let layout = segment(&pipe(100.0), &cuts(&[49.875, 50.0]), 0.125);
        assert_eq!(layout.cuts.len(), 2);
        assert_eq!(layout.cuts[1].offset, 50.0);
        assert_eq!(layout.leftover, 0.0);
    }
}
