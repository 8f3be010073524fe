use clap::{Args, Parser, Subcommand};
use cut_optimizer::render;
use cut_optimizer::solver::{PackOptions, pack_pipe_with, pack_sheet_with};
use cut_optimizer::types::{CutPiece, LinearCut, StockPipe, StockSheet};
use cut_optimizer::{Dimension, Unit, parse_inches};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "cut_optimizer",
    about = "Sheet and pipe cut layout optimizer"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log placement decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Lay rectangles out on one sheet
    Sheet(SheetArgs),
    /// Cut lengths from one pipe, in order
    Pipe(PipeArgs),
}

#[derive(Args)]
struct SheetArgs {
    /// Stock sheet dimensions (WxH, e.g. 48x96 or "4x8" with --unit ft)
    #[arg(long)]
    stock: String,

    /// Unit of the stock dimensions: in, ft or mm
    #[arg(long, default_value = "in", value_parser = parse_unit)]
    unit: Unit,

    /// Cut pieces in inches as WxH[:qty][:b] (e.g. "24 3/8x12 1/2:3", 9x31:2:b)
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Blade kerf in inches (default: 0)
    #[arg(long, default_value = "0", value_parser = parse_length)]
    kerf: f64,

    /// Height-map columns per inch
    #[arg(long, default_value_t = 8)]
    resolution: u32,

    /// Disable piece rotation
    #[arg(long)]
    no_rotate: bool,

    /// Never switch to the row packer
    #[arg(long)]
    no_fallback: bool,

    /// Show ASCII layout of the sheet
    #[arg(long)]
    layout: bool,
}

#[derive(Args)]
struct PipeArgs {
    /// Pipe length
    #[arg(long)]
    length: String,

    /// Unit of the pipe length: in, ft or mm
    #[arg(long, default_value = "in", value_parser = parse_unit)]
    unit: Unit,

    /// Cut lengths in inches as LEN[:qty] (e.g. 40:3 "24 3/8")
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Blade kerf in inches (default: 0)
    #[arg(long, default_value = "0", value_parser = parse_length)]
    kerf: f64,

    /// Show every segment including the leftover
    #[arg(long)]
    layout: bool,
}

fn parse_unit(s: &str) -> Result<Unit, String> {
    s.parse::<Unit>().map_err(|e| e.to_string())
}

fn parse_length(s: &str) -> Result<f64, String> {
    parse_inches(s).map(|d| d.inches()).map_err(|e| e.to_string())
}

fn parse_in_unit(s: &str, unit: Unit) -> Result<Dimension, String> {
    let value = parse_inches(s).map_err(|e| e.to_string())?;
    Ok(match unit {
        Unit::Inch => value,
        _ => Dimension::from_unit(value.inches(), unit),
    })
}

fn parse_stock(s: &str, unit: Unit) -> Result<StockSheet, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("invalid dimensions '{}', expected WxH", s))?;
    StockSheet::new(parse_in_unit(w, unit)?, parse_in_unit(h, unit)?).map_err(|e| e.to_string())
}

fn parse_qty(s: &str, input: &str) -> Result<u32, String> {
    let qty = s
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", input))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", input));
    }
    Ok(qty)
}

fn parse_cut(s: &str, allow_rotate: bool) -> Result<CutPiece, String> {
    let mut parts = s.split(':');
    let dims = parts.next().unwrap_or_default();
    let (w, h) = dims
        .split_once('x')
        .ok_or_else(|| format!("invalid cut '{}', expected WxH[:qty][:b]", s))?;
    let width = parse_inches(w).map_err(|e| e.to_string())?;
    let height = parse_inches(h).map_err(|e| e.to_string())?;

    let mut qty = 1;
    let mut bracket = false;
    for part in parts {
        match part.trim() {
            "b" | "bracket" => bracket = true,
            other => qty = parse_qty(other, s)?,
        }
    }

    Ok(CutPiece::new(width, height, qty)
        .with_rotation(allow_rotate)
        .bracket(bracket))
}

fn parse_linear_cut(s: &str) -> Result<LinearCut, String> {
    let (length, qty) = match s.split_once(':') {
        Some((length, qty)) => (length, parse_qty(qty, s)?),
        None => (s, 1),
    };
    let length = parse_inches(length).map_err(|e| e.to_string())?;
    Ok(LinearCut::new(length, qty))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => fail(e),
    }
}

fn run_sheet(args: SheetArgs, json: bool) {
    let stock = parse_stock(&args.stock, args.unit).unwrap_or_else(|e| fail(e));

    let pieces: Vec<CutPiece> = args
        .cuts
        .iter()
        .map(|c| parse_cut(c, !args.no_rotate))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));

    let options = PackOptions {
        resolution: args.resolution,
        kerf: args.kerf,
        allow_fallback: !args.no_fallback,
        ..PackOptions::default()
    };
    let layout = pack_sheet_with(&stock, &pieces, &options).unwrap_or_else(|e| fail(e));

    if json {
        print_json(&layout);
        return;
    }

    println!("Sheet {}:", layout.stock);
    for p in &layout.placements {
        let rot = if p.rotated { " [rotated]" } else { "" };
        let bracket = if p.is_bracket { " [bracket]" } else { "" };
        println!(
            "  {} @ ({}, {}){}{}",
            p.label,
            cut_optimizer::format_inches(p.x),
            cut_optimizer::format_inches(p.y),
            rot,
            bracket
        );
    }
    if args.layout {
        print!("{}", render::render_sheet(&layout));
    }
    if !layout.unplaced.is_empty() {
        println!("Unplaced ({}):", layout.unplaced.len());
        for u in &layout.unplaced {
            println!("  {}", u.label);
        }
    }
    if !layout.waste.is_empty() {
        println!("Waste blocks:");
        for w in &layout.waste {
            println!(
                "  {} @ ({}, {})",
                w.label(),
                cut_optimizer::format_inches(w.x),
                cut_optimizer::format_inches(w.y)
            );
        }
    }
    println!();

    println!(
        "Summary: {} placed, {} unplaced, {:.1}% waste{}",
        layout.placed_count(),
        layout.unplaced.len(),
        layout.waste_percent(),
        if layout.used_fallback {
            " (row layout)"
        } else {
            ""
        },
    );
}

fn run_pipe(args: PipeArgs, json: bool) {
    let length = parse_in_unit(&args.length, args.unit).unwrap_or_else(|e| fail(e));
    let stock = StockPipe::new(length).unwrap_or_else(|e| fail(e));

    let cuts: Vec<LinearCut> = args
        .cuts
        .iter()
        .map(|c| parse_linear_cut(c))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));

    let options = PackOptions {
        kerf: args.kerf,
        ..PackOptions::default()
    };
    let layout = pack_pipe_with(&stock, &cuts, &options).unwrap_or_else(|e| fail(e));

    if json {
        print_json(&layout);
        return;
    }

    println!("Pipe {}:", layout.stock.length);
    if args.layout {
        print!("{}", render::render_pipe(&layout));
    } else {
        for c in &layout.cuts {
            println!("  {} @ {}", c.label, cut_optimizer::format_inches(c.offset));
        }
    }
    if !layout.unplaced.is_empty() {
        println!("Unplaced ({}):", layout.unplaced.len());
        for u in &layout.unplaced {
            println!("  {}", u.label);
        }
    }
    println!();
    println!(
        "Summary: {} cut{}, leftover {}",
        layout.cuts.len(),
        if layout.cuts.len() == 1 { "" } else { "s" },
        layout.leftover_label(),
    );
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_max_level(Level::DEBUG)
            .init();
    }

    match cli.command {
        Command::Sheet(args) => run_sheet(args, cli.json),
        Command::Pipe(args) => run_pipe(args, cli.json),
    }
}
