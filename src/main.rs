use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use arucosize::{DictionaryKind, MeasureConfig, Pipeline};

#[derive(Parser)]
#[command(name = "arucosize")]
#[command(about = "Measure an object framed by ArUco markers in a photo")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// JSON configuration file (missing fields use defaults)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Real side length of the reference marker
    #[arg(long, value_name = "F")]
    marker_size: Option<f64>,

    /// Unit of the marker size, reported with the result
    #[arg(long, value_name = "S")]
    unit: Option<String>,

    /// Marker dictionary the markers were printed from
    #[arg(long, value_enum)]
    dictionary: Option<DictionaryArg>,

    /// Save an annotated image to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Use OpenCV's ArUco detector instead of the built-in one
    #[cfg(feature = "opencv")]
    #[arg(long)]
    opencv: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DictionaryArg {
    #[value(name = "4x4-50")]
    Dict4x4_50,
    #[value(name = "4x4-100")]
    Dict4x4_100,
}

impl From<DictionaryArg> for DictionaryKind {
    fn from(arg: DictionaryArg) -> Self {
        match arg {
            DictionaryArg::Dict4x4_50 => DictionaryKind::Aruco4x4_50,
            DictionaryArg::Dict4x4_100 => DictionaryKind::Aruco4x4_100,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = match &args.config {
        Some(path) => MeasureConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MeasureConfig::default(),
    };
    if let Some(size) = args.marker_size {
        config = config.with_marker_size(size);
    }
    if let Some(unit) = &args.unit {
        config = config.with_unit(unit.clone());
    }
    if let Some(dictionary) = args.dictionary {
        config = config.with_dictionary(dictionary.into());
    }

    let mut pipeline = Pipeline::new(config)?.with_verbose(args.verbose);

    #[cfg(feature = "opencv")]
    if args.opencv {
        let detector = arucosize::detection::opencv_backend::OpenCvArucoDetector::new(
            pipeline.config().marker.dictionary,
            pipeline.config().detector.clone(),
        )?;
        pipeline = pipeline.with_detector(Arc::new(detector));
    }

    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    if args.verbose {
        println!("Loading image: {:?}", args.image_path);
    }
    let bytes = tokio::fs::read(&args.image_path)
        .await
        .with_context(|| format!("Failed to read image {}", args.image_path.display()))?;

    let pipeline = Arc::new(pipeline);
    let worker = Arc::clone(&pipeline);
    let measurement = tokio::task::spawn_blocking(move || {
        let image = arucosize::decode_image(&bytes)?;
        worker.run(&image)
    })
    .await??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&measurement.result)?);
        return Ok(());
    }

    println!("\n=== Measurement Results ===");
    println!("Width:  {} {}", measurement.result.width, measurement.result.unit);
    println!("Height: {} {}", measurement.result.height, measurement.result.unit);
    println!("{}", measurement.result.message);

    if args.verbose {
        println!("\nMarkers used:");
        for marker in &measurement.markers {
            let tl = marker.top_left();
            println!("  #{} at ({:.1}, {:.1}) - side: {:.1}px", marker.id, tl.x, tl.y, marker.side_length());
        }
        println!("Scale: {:.6} {}/px", measurement.ratio, measurement.result.unit);
    }

    Ok(())
}
