use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use labelcrop::analysis::build_standard_pipeline;
use labelcrop::{
    AnalysisConfig, ArtifactKind, ArtifactStore, Color, DedupMode, FixtureClient, OutputFormat,
    RecognitionConfig, RetryingClient,
};

#[derive(Parser)]
#[command(name = "labelcrop")]
#[command(about = "Outline and crop recognized labels and text in an image")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Recorded label-detection response
    #[arg(long, value_name = "JSON")]
    labels: PathBuf,

    /// Recorded text-detection response (no text when omitted)
    #[arg(long, value_name = "JSON")]
    text: Option<PathBuf>,

    /// Root directory for run outputs; each run gets its own subdirectory
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    out: PathBuf,

    /// Image format for rendered images and crops
    #[arg(long, value_enum, default_value_t = OutputFormat::Jpeg)]
    format: OutputFormat,

    /// Maximum number of labels to request
    #[arg(long, default_value_t = 100)]
    max_labels: usize,

    /// Attempts per recognition call, including the first
    #[arg(long, default_value_t = 10)]
    max_attempts: u32,

    /// Color for text outlines (name or #rrggbb)
    #[arg(long, default_value = "aqua")]
    polygon_color: Color,

    /// Crop every label's boxes, even when two labels have identical boxes
    #[arg(long)]
    no_group_dedup: bool,

    /// Save step outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// `RUST_LOG` directives when set and valid, otherwise `debug`/`info` from `--verbose`
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose, rust_log.as_deref()))
        .init();

    let bytes = std::fs::read(&args.image_path)
        .with_context(|| format!("Failed to read image {}", args.image_path.display()))?;

    let config = AnalysisConfig::new()
        .with_max_labels(args.max_labels)
        .with_polygon_color(args.polygon_color)
        .with_format(args.format)
        .with_dedup(if args.no_group_dedup { DedupMode::Off } else { DedupMode::Group });

    let mut fixture = FixtureClient::new(&args.labels);
    if let Some(text) = &args.text {
        fixture = fixture.with_text(text);
    }
    let client = RetryingClient::new(
        fixture,
        RecognitionConfig::new().with_max_attempts(args.max_attempts),
    );

    let mut pipeline = build_standard_pipeline(config, Arc::new(client));
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let source_name = args
        .image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.image_path.display().to_string());
    let run = pipeline.run(source_name, bytes)?;
    let run_dir = ArtifactStore::new(&args.out).persist(&run)?;

    println!("\n=== Image Analysis Results ===");
    println!("Labels: {}", run.labels.len());
    for label in &run.labels {
        println!(
            "  {} ({:.1}%) - {} instance(s)",
            label.name,
            label.confidence,
            label.instances.len()
        );
    }

    println!("Text elements: {}", run.texts.len());
    if args.verbose {
        for text in &run.texts {
            println!("  {}", text.text);
        }
    }

    println!("Isolated elements: {}", run.crop_count);
    if let Some(report) = run.artifact(ArtifactKind::Report) {
        println!("\nReport: {}", run_dir.join(&report.file_name).display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn verbose_flag_sets_default_level() {
        assert_eq!(log_filter(false, None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(true, None).max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn rust_log_overrides_verbose_flag() {
        let filter = log_filter(false, Some("labelcrop=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }
}
