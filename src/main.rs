use std::process::exit;

use anyhow::Context;
use clap::Parser;
use log::{debug, error, info, LevelFilter};
use palette_picker::{
    BlackWhiteFilter, ExtractOptions, PaletteStore, Region, ResizeFilter, TargetSize,
};
use simplelog::{Config, SimpleLogger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::EnumString, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
enum OutputFormat {
    /// One hex code per line
    #[default]
    Hex,
    /// Hex code, population and share of the analyzed pixels
    Table,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(
        short = 'd',
        long = "debug",
        help = "debug mode (0: warnings, 1: info, 2: debug, 3: trace)",
        default_value_t = 0
    )]
    debug: u8,

    #[arg(
        short = 'n',
        long = "max-colors",
        help = "maximum number of colors in the palette",
        default_value_t = palette_picker::extract::DEFAULT_MAX_COLORS
    )]
    max_colors: usize,

    #[arg(
        short = 's',
        long = "size",
        help = "image is shrunk to fit WIDTHxHEIGHT before analysis",
        default_value = "200x200"
    )]
    size: TargetSize,

    #[arg(
        short = 'f',
        long = "filter",
        help = "resize filter: nearest, triangle, catmull-rom, gaussian, lanczos3",
        default_value = "nearest"
    )]
    filter: ResizeFilter,

    #[arg(
        long = "bits",
        help = "histogram precision per channel (1-8)",
        default_value_t = palette_picker::extract::DEFAULT_QUANTIZE_BITS
    )]
    bits: u8,

    #[arg(
        long = "region",
        num_args = 4,
        value_names = ["X", "Y", "W", "H"],
        help = "only analyze this area of the image"
    )]
    region: Option<Vec<u32>>,

    #[arg(long = "skip-black-white", help = "leave near-black and near-white colors out")]
    skip_black_white: bool,

    #[arg(long = "format", help = "output format: hex, table", default_value = "hex")]
    format: OutputFormat,

    #[arg(help = "image file to analyze", required = true)]
    image_file: String,
}

fn options_from(args: &Args) -> ExtractOptions {
    let mut options = ExtractOptions::new(args.size, args.max_colors)
        .with_quantize_bits(args.bits)
        .with_resize_filter(args.filter);
    if let Some([x, y, width, height]) = args.region.as_deref() {
        options = options.with_region(Region {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        });
    }
    if args.skip_black_white {
        options = options.with_filter(BlackWhiteFilter);
    }
    options
}

fn run(args: &Args) -> anyhow::Result<()> {
    let options = options_from(args);
    debug!("{options:?}");

    let bytes = std::fs::read(&args.image_file).with_context(|| format!("reading {}", args.image_file))?;
    let store = PaletteStore::new(options);
    store
        .select_image(&bytes)
        .with_context(|| format!("loading {}", args.image_file))?;
    store.extract_current()?;

    let state = store.snapshot();
    if let Some(e) = state.last_error {
        anyhow::bail!("extracting palette from {}: {e}", args.image_file);
    }

    let palette = state.palette;
    info!("{} colors extracted from {}", palette.len(), args.image_file);
    let total: u64 = palette.iter().map(|s| s.population() as u64).sum();
    for swatch in &palette {
        match args.format {
            OutputFormat::Hex => println!("{}", swatch.hex()),
            OutputFormat::Table => {
                let share = swatch.population() as f64 * 100.0 / total.max(1) as f64;
                println!("{}\t{}\t{:.1}%", swatch.hex(), swatch.population(), share);
            }
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = match args.debug {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::init(level, Config::default()).unwrap();

    if let Err(e) = run(&args) {
        error!("{e:#}");
        exit(1);
    }
}
