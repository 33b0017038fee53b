//! spiralplan - search-and-rescue coverage planning
//!
//! Generates an inward spiral over a search region, maps it between the local
//! grid, latitude/longitude and a reference image, and renders the result as
//! an overlay on that image.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use spiralplan::config::Config;
use spiralplan::mission::plan_mission;
use spiralplan::render::{draw_overlay, ImageCanvas};
use spiralplan::spiral::{plan_spiral, DEFAULT_STEP_SIZE, DEFAULT_THRESHOLD};
use spiralplan::{Frame, Point2D, Quadrilateral, SpiralParams};

/// spiralplan - inward spiral search paths across local, geographic and image frames
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "spiralplan.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan the configured searches and render them over the reference image (default)
    Plan {
        /// Print the plan as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Skip writing the overlay image
        #[arg(long)]
        no_render: bool,

        /// Overlay output path (overrides the config file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a spiral from four corners and print it as JSON
    Spiral {
        /// Corner as "x,y"; give exactly four, starting corner first
        #[arg(long = "corner", required = true, value_parser = parse_point, allow_hyphen_values = true)]
        corners: Vec<Point2D>,

        /// Spacing between spiral legs
        #[arg(long, default_value_t = DEFAULT_STEP_SIZE)]
        step: f64,

        /// Subdivide legs longer than step * threshold
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },

    /// Map points between frames using the configured calibration
    Map {
        /// Source frame (local, geographic, pixel)
        #[arg(long)]
        from: Frame,

        /// Destination frame (local, geographic, pixel)
        #[arg(long)]
        to: Frame,

        /// Point as "x,y"; repeat for several
        #[arg(long = "point", required = true, value_parser = parse_point, allow_hyphen_values = true)]
        points: Vec<Point2D>,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Parse "x,y" into a point
fn parse_point(s: &str) -> std::result::Result<Point2D, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{}\"", s))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in \"{}\": {}", s, e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in \"{}\": {}", s, e))?;
    Ok(Point2D::new(x, y))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for JSON output. RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(args.verbose)));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("spiralplan v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::Plan {
        json: false,
        no_render: false,
        output: None,
    }) {
        Command::Plan {
            json,
            no_render,
            output,
        } => run_plan(&args.config, json, no_render, output),
        Command::Spiral {
            corners,
            step,
            threshold,
        } => run_spiral(&corners, SpiralParams::new(step, threshold)),
        Command::Map { from, to, points } => run_map(&args.config, from, to, &points),
        Command::Init { force } => run_init(&args.config, force),
    }
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Pixel size of the configured reference image (or blank canvas)
fn image_size(config: &Config) -> Result<(u32, u32)> {
    match &config.render.image {
        Some(path) => image::image_dimensions(path)
            .with_context(|| format!("Failed to read reference image size from {:?}", path)),
        None => Ok((config.render.width, config.render.height)),
    }
}

fn run_plan(config_path: &Path, json: bool, no_render: bool, output: Option<PathBuf>) -> Result<()> {
    let config = Config::load_or_create(config_path)?;

    let canvas = if no_render {
        None
    } else {
        Some(ImageCanvas::from_config(&config.render)?)
    };
    let (width, height) = match &canvas {
        Some(c) => c.dimensions(),
        None => image_size(&config)?,
    };
    info!("Pixel frame: {}x{}", width, height);

    let chain = config.frame_chain(width, height)?;
    let plan = plan_mission(&config, &chain)?;

    for search in &plan.searches {
        for (i, corner) in search.corners.local.iter().enumerate() {
            info!("{} corner {}: local ({:.3}, {:.3})", search.label, i, corner.x, corner.y);
        }
    }
    for poi in &plan.points_of_interest {
        info!("{}: pixel ({:.1}, {:.1})", poi.label, poi.pixel.x, poi.pixel.y);
    }

    if let Some(mut canvas) = canvas {
        draw_overlay(&mut canvas, &plan.overlay(), &config.render);
        let path = output.unwrap_or_else(|| config.render.output.clone());
        canvas.save(&path)?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?
        );
    }

    Ok(())
}

fn run_spiral(corners: &[Point2D], params: SpiralParams) -> Result<()> {
    let corners: [Point2D; 4] = match corners.try_into() {
        Ok(c) => c,
        Err(_) => bail!("expected exactly 4 corners, got {}", corners.len()),
    };

    let path = plan_spiral(&Quadrilateral::new(corners), &params)?;
    info!(
        "{} rings, {} legs, {} waypoints",
        path.rings,
        path.legs.len(),
        path.waypoints.len()
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&path).context("Failed to serialize spiral")?
    );
    Ok(())
}

fn run_map(config_path: &Path, from: Frame, to: Frame, points: &[Point2D]) -> Result<()> {
    let config = Config::load_or_create(config_path)?;
    let (width, height) = image_size(&config)?;
    let chain = config.frame_chain(width, height)?;

    let mapped = chain
        .map_path(points, from, to)
        .with_context(|| format!("Failed to map points from {} to {}", from, to))?;

    for (p, m) in points.iter().zip(mapped.iter()) {
        println!("{},{} -> {},{}", p.x, p.y, m.x, m.y);
    }
    Ok(())
}

fn run_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{:?} already exists, pass --force to overwrite it",
            config_path
        );
    }
    Config::default().save(config_path)
}
