use crate::types::{Layout, PipeLayout};

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// Character-cell box in the preview grid.
#[derive(Debug, Clone, Copy)]
struct CellBox {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

/// ASCII preview of a sheet: pieces boxed and labelled, waste dotted.
pub fn render_sheet(layout: &Layout) -> String {
    let (sheet_w, sheet_h) = (layout.stock.width.inches(), layout.stock.height.inches());
    let scale = f64::min(MAX_WIDTH / sheet_w, MAX_HEIGHT / sheet_h);
    let grid_w = (sheet_w * scale).round() as usize;
    let grid_h = (sheet_h * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];
    let to_cells = |x: f64, y: f64, w: f64, h: f64| CellBox {
        x: (x * scale).round() as usize,
        y: (y * scale).round() as usize,
        w: (w * scale).round() as usize,
        h: (h * scale).round() as usize,
    };

    for block in &layout.waste {
        let b = to_cells(block.x, block.y, block.width, block.height);
        shade(&mut grid, b);
    }

    // Draw stock border first
    draw_rect(&mut grid, CellBox { x: 0, y: 0, w: grid_w, h: grid_h });

    for p in &layout.placements {
        let b = to_cells(p.x, p.y, p.width, p.height);
        if b.w == 0 || b.h == 0 {
            continue;
        }

        clear(&mut grid, b);
        draw_rect(&mut grid, b);
        if p.is_bracket {
            draw_diagonal(&mut grid, b);
        }

        let label = if p.rotated {
            format!("{}*", p.label)
        } else {
            p.label.clone()
        };
        write_label(&mut grid, b, &label);
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

/// One line per pipe segment, leftover last.
pub fn render_pipe(layout: &PipeLayout) -> String {
    let mut result = String::new();
    for cut in &layout.cuts {
        result.push_str(&format!(
            "  [{:>8.3} .. {:>8.3}] {}\n",
            cut.offset,
            cut.offset + cut.length,
            cut.label
        ));
    }
    if layout.leftover > 0.0 {
        let start = layout.stock.length.inches() - layout.leftover;
        result.push_str(&format!(
            "  [{:>8.3} .. {:>8.3}] leftover {}\n",
            start,
            layout.stock.length.inches(),
            layout.leftover_label()
        ));
    }
    result
}

fn write_label(grid: &mut [Vec<char>], b: CellBox, label: &str) {
    let label_chars: Vec<char> = label.chars().collect();
    if b.w <= 2 || b.h == 0 {
        return;
    }
    let cx = b.x + b.w / 2;
    let cy = b.y + b.h / 2;
    let start_x = cx.saturating_sub(label_chars.len() / 2);

    for (i, &ch) in label_chars.iter().enumerate() {
        let x = start_x + i;
        if x > b.x && x < b.x + b.w && cy > b.y && cy < b.y + b.h && cy < grid.len() {
            if let Some(cell) = grid[cy].get_mut(x) {
                *cell = ch;
            }
        }
    }
}

fn fill(grid: &mut [Vec<char>], b: CellBox, ch: char) {
    for row in grid.iter_mut().skip(b.y).take(b.h) {
        for cell in row.iter_mut().skip(b.x).take(b.w) {
            *cell = ch;
        }
    }
}

fn shade(grid: &mut [Vec<char>], b: CellBox) {
    fill(grid, b, '.');
}

fn clear(grid: &mut [Vec<char>], b: CellBox) {
    fill(grid, b, ' ');
}

fn draw_diagonal(grid: &mut [Vec<char>], b: CellBox) {
    let steps = b.w.max(1);
    for i in 1..steps {
        let x = b.x + i;
        let y = b.y + i * b.h / steps;
        if y > b.y && y < b.y + b.h && y < grid.len() && x < grid[y].len() {
            grid[y][x] = '\\';
        }
    }
}

#[allow(clippy::needless_range_loop)]
fn draw_rect(grid: &mut [Vec<char>], b: CellBox) {
    let CellBox { x, y, w, h } = b;
    let rows = grid.len();
    let cols = if rows > 0 { grid[0].len() } else { return };

    // Horizontal edges
    for i in x..=x + w {
        if i < cols {
            if y < rows {
                grid[y][i] = if grid[y][i] == '|' || grid[y][i] == '+' {
                    '+'
                } else {
                    '-'
                };
            }
            if y + h < rows {
                grid[y + h][i] = if grid[y + h][i] == '|' || grid[y + h][i] == '+' {
                    '+'
                } else {
                    '-'
                };
            }
        }
    }

    // Vertical edges
    for j in y..=y + h {
        if j < rows {
            if x < cols {
                grid[j][x] = if grid[j][x] == '-' || grid[j][x] == '+' {
                    '+'
                } else {
                    '|'
                };
            }
            if x + w < cols {
                grid[j][x + w] = if grid[j][x + w] == '-' || grid[j][x + w] == '+' {
                    '+'
                } else {
                    '|'
                };
            }
        }
    }

    // Corners
    for &cx in &[x, x + w] {
        for &cy in &[y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::Dimension;
    use crate::solver::{pack_pipe, pack_sheet};
    use crate::types::{CutPiece, LinearCut, StockPipe, StockSheet};

    fn stock(w: f64, h: f64) -> StockSheet {
        StockSheet::new(Dimension::from_inches(w), Dimension::from_inches(h)).unwrap()
    }

    fn cut(w: f64, h: f64, qty: u32) -> CutPiece {
        CutPiece::new(Dimension::from_inches(w), Dimension::from_inches(h), qty)
    }

    #[test]
    fn test_render_single_piece() {
        let layout = pack_sheet(&stock(100.0, 50.0), &[cut(100.0, 50.0, 1)]).unwrap();
        let output = render_sheet(&layout);
        assert!(output.contains('+'));
        assert!(output.contains('-'));
        assert!(output.contains('|'));
        assert!(output.contains("100 x 50"));
        assert!(!output.contains('.'));
    }

    #[test]
    fn test_render_shows_waste() {
        let layout = pack_sheet(&stock(100.0, 100.0), &[cut(50.0, 100.0, 1)]).unwrap();
        let output = render_sheet(&layout);
        assert!(output.contains("50 x 100"));
        assert!(output.contains('.'));
    }

    #[test]
    fn test_render_empty() {
        let layout = pack_sheet(&stock(100.0, 100.0), &[]).unwrap();
        let output = render_sheet(&layout);
        // Should still draw the stock border
        assert!(output.contains('+'));
    }

    #[test]
    fn test_render_pipe() {
        let pipe = StockPipe::new(Dimension::from_inches(100.0)).unwrap();
        let layout = pack_pipe(&pipe, &[LinearCut::new(Dimension::from_inches(40.0), 2)]).unwrap();
        let output = render_pipe(&layout);
        assert_eq!(output.lines().count(), 3);
        assert!(output.contains("leftover 20"));
    }
}
