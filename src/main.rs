use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use pixelsqueeze::codec::{
    CompressionVariant, OutputFormat, RawFormat, ResizeQuality, ResizeSpec,
};
use pixelsqueeze::config::EngineConfig;
use pixelsqueeze::engine::{CompressionRequest, CompressionResult, Engine, JobKind};
use pixelsqueeze::quality::QualityMetrics;

/// Pixelsqueeze - adaptive image compression and quality assessment
#[derive(Parser, Debug)]
#[command(name = "pixelsqueeze")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode one image at a fixed quality
    Encode(EncodeArgs),
    /// Encode one image as close as possible to a byte size
    Target {
        #[command(flatten)]
        encode: EncodeArgs,
        /// Desired output size in bytes
        #[arg(long)]
        size: u64,
    },
    /// Decode a camera RAW file and re-encode it
    Raw {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long, default_value = "jpeg")]
        format: OutputFormat,
        #[arg(short, long)]
        quality: Option<u8>,
    },
    /// Compare a compressed image with its original
    Assess { original: PathBuf, compressed: PathBuf },
}

#[derive(ClapArgs, Debug)]
struct EncodeArgs {
    input: PathBuf,
    #[arg(short, long)]
    output: PathBuf,
    /// Output format, guessed from the output extension when omitted
    #[arg(short, long)]
    format: Option<OutputFormat>,
    #[arg(short, long)]
    quality: Option<u8>,
    #[arg(long, default_value = "standard")]
    variant: CompressionVariant,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long, default_value = "lanczos")]
    resize_quality: ResizeQuality,
    /// Fix orientation, stretch contrast and strip metadata
    #[arg(long)]
    web: bool,
    /// Also report PSNR/SSIM against the input
    #[arg(long)]
    assess: bool,
}

#[derive(Serialize)]
struct Report {
    #[serde(flatten)]
    result: CompressionResult,
    compression_ratio: f64,
    percentage_saved: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<QualityMetrics>,
}

impl Report {
    fn new(result: CompressionResult, quality: Option<QualityMetrics>) -> Self {
        Self {
            compression_ratio: result.compression_ratio(),
            percentage_saved: result.percentage_saved(),
            result,
            quality,
        }
    }
}

fn output_format(explicit: Option<OutputFormat>, output: &Path) -> Result<OutputFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("Cannot infer format from '{}', pass --format", output.display()))?;
    Ok(ext.parse()?)
}

fn build_request(engine: &Engine, args: &EncodeArgs) -> Result<CompressionRequest> {
    let format = output_format(args.format, &args.output)?;
    let mut request = engine
        .request(args.input.clone(), format)
        .with_variant(args.variant)
        .with_web_optimize(args.web)
        .with_output(&args.output);
    if let Some(quality) = args.quality {
        request = request.with_quality(quality);
    }
    if args.width.is_some() || args.height.is_some() {
        request = request.with_resize(
            ResizeSpec::new(args.width, args.height).with_quality(args.resize_quality),
        );
    }
    Ok(request)
}

async fn run_encode(engine: &Engine, args: EncodeArgs, target: Option<u64>) -> Result<Report> {
    let mut request = build_request(engine, &args)?;
    if let Some(size) = target {
        request = request.with_target_size(size);
    }

    let deadline = engine.timeout_policy().deadline(JobKind::Encode);
    let result = engine.compress_guarded(request, deadline).await?;

    let quality = if args.assess {
        // Resized outputs fail the dimension check and are reported as skipped
        let original = std::fs::read(&args.input)?;
        let compressed = std::fs::read(&args.output)?;
        engine.try_assess(&original, &compressed)
    } else {
        None
    };
    Ok(Report::new(result, quality))
}

async fn run(args: Args, config: EngineConfig) -> Result<()> {
    let engine = Engine::new(config);

    let report = match args.command {
        Command::Encode(encode) => serde_json::to_value(run_encode(&engine, encode, None).await?)?,
        Command::Target { encode, size } => {
            if size == 0 {
                bail!("--size must be greater than 0");
            }
            serde_json::to_value(run_encode(&engine, encode, Some(size)).await?)?
        }
        Command::Raw {
            input,
            output,
            format,
            quality,
        } => {
            if RawFormat::from_path(&input).is_none() {
                bail!(
                    "{} is not a camera RAW file, use the encode command instead",
                    input.display()
                );
            }
            let mut request = engine.request(input, format).with_output(output);
            if let Some(quality) = quality {
                request = request.with_quality(quality);
            }
            let deadline = engine.timeout_policy().deadline(JobKind::Raw);
            let result = engine.compress_guarded(request, deadline).await?;
            serde_json::to_value(Report::new(result, None))?
        }
        Command::Assess {
            original,
            compressed,
        } => {
            let original = std::fs::read(&original)
                .with_context(|| format!("Failed to read {}", original.display()))?;
            let compressed = std::fs::read(&compressed)
                .with_context(|| format!("Failed to read {}", compressed.display()))?;
            let metrics = pixelsqueeze::quality::assess_quality_bytes(&original, &compressed)?;
            serde_json::to_value(metrics)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path).map_err(anyhow::Error::msg)?,
        None => EngineConfig::default(),
    };
    config.validate().map_err(anyhow::Error::msg)?;

    pixelsqueeze::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        config_file = ?args.config,
        scratch_dir = ?config.scratch_dir,
        raw_decoder = %config.raw.decoder_program,
        "Configuration loaded successfully"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    runtime.block_on(run(args, config))
}
