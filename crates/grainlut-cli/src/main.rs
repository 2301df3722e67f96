//! grainlut: grade still images with a tiled color-cube LUT from the shell.

mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use grainlut_core::config::{DEFAULT_COMPRESSION_QUALITY, DEFAULT_LUT_DIMENSION};
use grainlut_core::{ApplyLutRequest, BlendMode, ColorCube, LutPipeline, OutputFormat, encode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "grainlut", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grade an image through a LUT and print the output locator.
    Apply(ApplyArgs),
    /// Write an identity LUT in the tiled layout.
    IdentityLut(IdentityLutArgs),
    /// List the blend modes accepted for grain.
    BlendModes(BlendModesArgs),
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input image path or file:// URI.
    #[arg(long = "in")]
    input: String,

    /// Tiled LUT image path or file:// URI.
    #[arg(long)]
    lut: String,

    /// Cache key for the LUT. Defaults to the LUT locator.
    #[arg(long)]
    filter_id: Option<String>,

    /// Cube side length.
    #[arg(long, default_value_t = DEFAULT_LUT_DIMENSION)]
    dimension: u32,

    /// Output quality in [0, 1]. 1.0 selects lossless output.
    #[arg(long, default_value_t = DEFAULT_COMPRESSION_QUALITY)]
    quality: f32,

    /// Grain texture to composite before grading.
    #[arg(long)]
    grain: Option<String>,

    /// Grain opacity in [0, 1].
    #[arg(long, requires = "grain")]
    grain_opacity: Option<f32>,

    /// Grain blend mode name (see `blend-modes`).
    #[arg(long, requires = "grain")]
    blend_mode: Option<String>,

    /// JSON pipeline configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory output is written to. Overrides the configuration.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Output container. Overrides the configuration.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,
}

#[derive(Parser, Debug)]
struct IdentityLutArgs {
    /// Cube side length.
    #[arg(long, default_value_t = DEFAULT_LUT_DIMENSION)]
    dimension: u32,

    /// Tiles per row. Defaults to one row of `dimension` tiles.
    #[arg(long)]
    columns: Option<u32>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct BlendModesArgs {
    /// Print as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Auto,
    Png,
    Jpeg,
}

impl From<FormatChoice> for OutputFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Auto => OutputFormat::Auto,
            FormatChoice::Png => OutputFormat::Png,
            FormatChoice::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => apply(args).await,
        Command::IdentityLut(args) => identity_lut(args),
        Command::BlendModes(args) => blend_modes(args),
    }
}

async fn apply(args: ApplyArgs) -> anyhow::Result<()> {
    let config = config::load(
        args.config.as_deref(),
        args.cache_dir,
        args.format.map(Into::into),
    )?;
    let pipeline = LutPipeline::new(config);

    if let Some(grain) = &args.grain {
        pipeline
            .set_grain_image(grain.as_str())
            .await
            .with_context(|| format!("load grain {grain}"))?;
        if let Some(opacity) = args.grain_opacity {
            pipeline.set_grain_opacity(opacity);
        }
        if let Some(mode) = args.blend_mode {
            pipeline.set_grain_blend_mode(mode);
        }
    }

    let filter_id = args.filter_id.unwrap_or_else(|| args.lut.clone());
    let request = ApplyLutRequest::new(&args.input, filter_id, &args.lut)
        .lut_dimension(args.dimension)
        .compression_quality(args.quality)
        .with_grain(args.grain.is_some());

    let output = pipeline
        .apply_lut(request)
        .await
        .with_context(|| format!("apply {} to {}", args.lut, args.input))?;
    println!("{output}");
    Ok(())
}

fn identity_lut(args: IdentityLutArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.dimension >= 2, "dimension must be at least 2");
    let columns = args.columns.unwrap_or(args.dimension);
    let raster = ColorCube::identity(args.dimension).to_tiled_raster(columns);

    let artifact = encode::encode(&raster, OutputFormat::Png, 1.0).context("encode LUT")?;
    std::fs::write(&args.out, &artifact.bytes)
        .with_context(|| format!("write {}", args.out.display()))?;
    tracing::info!(
        path = %args.out.display(),
        width = raster.width,
        height = raster.height,
        "identity LUT written"
    );
    Ok(())
}

fn blend_modes(args: BlendModesArgs) -> anyhow::Result<()> {
    if args.json {
        let modes: Vec<_> = BlendMode::all()
            .map(|mode| serde_json::json!({ "mode": mode, "aliases": mode.aliases() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&modes)?);
    } else {
        for mode in BlendMode::all() {
            let aliases = mode.aliases().get(1..).unwrap_or_default();
            println!("{:<12} {}", mode.name(), aliases.join(", "));
        }
    }
    Ok(())
}
