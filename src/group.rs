//! Quantity expansion and nesting-friendly ordering of cut lists.

use crate::types::{CutPiece, LinearCut, Piece};

/// Anything with a footprint that can be grouped for nesting.
pub trait Nestable {
    /// Width and height as entered, in inches.
    fn size(&self) -> (f64, f64);
    /// May the piece be turned 90 degrees?
    fn rotatable(&self) -> bool;
    /// How many physical pieces this entry stands for.
    fn count(&self) -> usize;
}

impl Nestable for CutPiece {
    fn size(&self) -> (f64, f64) {
        (self.width.inches(), self.height.inches())
    }

    fn rotatable(&self) -> bool {
        CutPiece::rotatable(self)
    }

    fn count(&self) -> usize {
        self.quantity as usize
    }
}

impl Nestable for Piece {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn rotatable(&self) -> bool {
        self.allow_rotation
    }

    fn count(&self) -> usize {
        1
    }
}

/// Expands each request into `quantity` single pieces, keeping caller order.
pub fn expand(pieces: &[CutPiece]) -> Vec<Piece> {
    pieces
        .iter()
        .flat_map(|p| std::iter::repeat_n(p, p.quantity as usize))
        .enumerate()
        .map(|(source, p)| Piece {
            source,
            width: p.width.inches(),
            height: p.height.inches(),
            allow_rotation: p.rotatable(),
            is_bracket: p.is_bracket,
            label: p.label.clone(),
        })
        .collect()
}

/// Expands linear cuts into single lengths `(source, length, label)`.
pub fn expand_linear(cuts: &[LinearCut]) -> Vec<(usize, f64, String)> {
    cuts.iter()
        .flat_map(|c| std::iter::repeat_n(c, c.quantity as usize))
        .enumerate()
        .map(|(source, c)| (source, c.length.inches(), c.label.clone()))
        .collect()
}

/// Group key: exact size, order-insensitive when the piece may rotate.
fn group_key<T: Nestable>(piece: &T) -> (bool, u64, u64) {
    let (w, h) = piece.size();
    if piece.rotatable() {
        let (a, b) = if w <= h { (w, h) } else { (h, w) };
        (true, a.to_bits(), b.to_bits())
    } else {
        (false, w.to_bits(), h.to_bits())
    }
}

struct Group<'a, T> {
    key: (bool, u64, u64),
    members: Vec<&'a T>,
    width: f64,
    height: f64,
    count: usize,
}

impl<T> Group<'_, T> {
    fn portrait(&self) -> bool {
        self.height >= self.width
    }
}

/// Orders pieces so identical sizes sit together and narrow pieces come
/// first.
///
/// Groups sort ascending by width; ties prefer portrait groups, then larger
/// groups, then larger pieces. A group's width and height are those of its
/// first member as entered. Members keep their relative order, and fully
/// tied groups keep first-appearance order.
pub fn reorder<T: Nestable + Clone>(pieces: &[T]) -> Vec<T> {
    let mut groups: Vec<Group<'_, T>> = Vec::new();
    for piece in pieces {
        let key = group_key(piece);
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => {
                group.members.push(piece);
                group.count += piece.count();
            }
            None => {
                let (width, height) = piece.size();
                groups.push(Group {
                    key,
                    members: vec![piece],
                    width,
                    height,
                    count: piece.count(),
                });
            }
        }
    }

    groups.sort_by(|a, b| {
        a.width
            .total_cmp(&b.width)
            .then_with(|| b.portrait().cmp(&a.portrait()))
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| (b.width * b.height).total_cmp(&(a.width * a.height)))
    });

    groups
        .into_iter()
        .flat_map(|g| g.members.into_iter().cloned())
        .collect()
}
