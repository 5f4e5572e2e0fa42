use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::RgbaImage;
use secam_fire_core::{FireParams, NoiseField, Schedule, SecamFire};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// SECAM fire effect demo: burns a still image over a run of frames
#[derive(Parser, Debug)]
#[command(name = "secam-fire-demo")]
#[command(about = "Render SECAM fire frames to PNG files", long_about = None)]
struct Args {
    /// Input PNG (a synthetic colour-bar pattern is used when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Synthetic pattern width in pixels
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Synthetic pattern height in pixels
    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Number of frames to render
    #[arg(short, long, default_value_t = 8)]
    frames: u32,

    /// Output directory for frame_NNNN.png files
    #[arg(short, long, default_value = "secam-out")]
    output: PathBuf,

    /// JSON preset with any of random/edge/saturation/noise
    #[arg(short, long)]
    preset: Option<PathBuf>,

    /// Amount of spontaneous fire (0-1)
    #[arg(long)]
    random: Option<f64>,

    /// Amount of fire triggered by luma edges (0-1)
    #[arg(long)]
    edge: Option<f64>,

    /// Amount of fire triggered by saturated colours (0-1)
    #[arg(long)]
    saturation: Option<f64>,

    /// Amount of background chroma noise (0-1)
    #[arg(long)]
    noise: Option<f64>,

    /// Burn scanline-pairs in parallel (reproducible, differs from sequential output)
    #[arg(long)]
    parallel: bool,

    /// Print per-frame statistics without writing PNG files
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn params(&self) -> Result<FireParams> {
        let mut params = match &self.preset {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading preset {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing preset {}", path.display()))?
            }
            None => FireParams::default(),
        };

        let overrides = [self.random, self.edge, self.saturation, self.noise];
        for (index, value) in overrides.into_iter().enumerate() {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    bail!("control values must be within 0-1, got {value}");
                }
                params.set(index, value)?;
            }
        }
        Ok(params)
    }
}

/// Colour bars over the top two thirds, a luma ramp below.
fn synthetic_pattern(width: u32, height: u32) -> RgbaImage {
    const BARS: [[u8; 3]; 8] = [
        [235, 235, 235],
        [235, 235, 16],
        [16, 235, 235],
        [16, 235, 16],
        [235, 16, 235],
        [235, 16, 16],
        [16, 16, 235],
        [16, 16, 16],
    ];

    RgbaImage::from_fn(width, height, |x, y| {
        if y < height * 2 / 3 {
            let bar = (x * BARS.len() as u32 / width) as usize;
            let [r, g, b] = BARS[bar.min(BARS.len() - 1)];
            image::Rgba([r, g, b, 255])
        } else {
            let v = (x * 255 / width.max(1)) as u8;
            image::Rgba([v, v, v, 255])
        }
    })
}

fn load_frame(args: &Args) -> Result<RgbaImage> {
    match &args.input {
        Some(path) => Ok(image::open(path)
            .with_context(|| format!("opening {}", path.display()))?
            .to_rgba8()),
        None => Ok(synthetic_pattern(args.width, args.height)),
    }
}

fn to_pixels(image: &RgbaImage) -> Vec<u32> {
    image
        .as_raw()
        .chunks_exact(4)
        .map(|px| u32::from_ne_bytes([px[0], px[1], px[2], px[3]]))
        .collect()
}

fn to_image(width: u32, height: u32, pixels: &[u32]) -> Result<RgbaImage> {
    let bytes = pixels.iter().flat_map(|px| px.to_ne_bytes()).collect();
    RgbaImage::from_raw(width, height, bytes).context("pixel buffer does not match frame size")
}

fn save_frame(dir: &Path, index: u32, image: &RgbaImage) -> Result<()> {
    let path = dir.join(format!("frame_{index:04}.png"));
    image
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), "frame written");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let params = args.params()?;
    let source = load_frame(&args)?;
    let (width, height) = source.dimensions();

    println!("=== SECAM Fire Demo ===\n");
    println!("Frame: {width}x{height}, {} frame(s)", args.frames);
    println!(
        "Controls: random {:.3}, edge {:.3}, saturation {:.3}, noise {:.3}",
        params.random, params.edge, params.saturation, params.noise
    );

    let field = Arc::new(NoiseField::build()?);
    let mut effect = SecamFire::new(width, height, field)?;
    effect.set_params(params);
    if args.parallel {
        effect.set_schedule(Schedule::Parallel);
    }
    info!(schedule = ?effect.schedule(), "effect ready");

    if !args.dry_run {
        fs::create_dir_all(&args.output)
            .with_context(|| format!("creating {}", args.output.display()))?;
    }

    let input = to_pixels(&source);
    let mut output = vec![0_u32; input.len()];
    let mut total_ignitions = 0;
    let started = Instant::now();

    println!("\nFrame | Pairs | Ignitions");
    println!("------|-------|----------");
    for index in 0..args.frames {
        let time = f64::from(index) / 25.0;
        let stats = effect.process(time, &input, &mut output)?;
        total_ignitions += stats.ignitions;
        println!("{index:5} | {:5} | {:9}", stats.pairs, stats.ignitions);

        if !args.dry_run {
            save_frame(&args.output, index, &to_image(width, height, &output)?)?;
        }
    }

    let elapsed = started.elapsed();
    println!("\n=== Done ===");
    println!("Total ignitions: {total_ignitions}");
    println!(
        "Time: {:.1} ms ({:.2} ms/frame)",
        elapsed.as_secs_f64() * 1000.0,
        elapsed.as_secs_f64() * 1000.0 / f64::from(args.frames.max(1))
    );
    if !args.dry_run {
        println!("Frames written to {}", args.output.display());
    }
    Ok(())
}
