//! `assetctl` - command-line front end for the asset pipeline.
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use asset_pipeline::constants::DEFAULT_CONFIG_FILE;
use asset_pipeline::logging::init_tracing;
use asset_pipeline::pipeline::Upload;
use asset_pipeline::{AssetPipeline, Error, FormatChoice, MetadataUpdate, PipelineConfig};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "assetctl", version, about = "Image asset pipeline")]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcode images into derivatives and archive the originals
    Optimize {
        /// Image files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Target width in pixels (0 keeps native width)
        #[arg(long)]
        width: Option<u32>,
        /// Encoder quality 1-100 (JPEG only)
        #[arg(long)]
        quality: Option<u32>,
        /// Output format: webp, jpeg or both
        #[arg(long)]
        format: Option<FormatChoice>,
    },
    /// List derivatives
    List,
    /// Read or edit metadata records
    #[command(subcommand)]
    Meta(MetaCommand),
    /// Write a JPEG thumbnail for an asset
    Thumb {
        path: String,
        /// Output file
        #[arg(long, short)]
        output: PathBuf,
        /// Bounding box edge in pixels (16-1024)
        #[arg(long)]
        size: Option<u32>,
    },
    /// Rename an asset within its date bucket
    Rename { path: String, new_name: String },
    /// Delete assets (archived originals are kept)
    Delete {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Export metadata records (all assets when no paths are given)
    Export { paths: Vec<String> },
    /// Remove metadata records whose derivative is gone
    Reconcile,
    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum MetaCommand {
    /// Show the record for an asset
    Get { path: String },
    /// Merge fields into the record for an asset
    Set {
        path: String,
        #[command(flatten)]
        fields: MetaFields,
    },
}

#[derive(Args)]
struct MetaFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    alt_text: Option<String>,
    #[arg(long)]
    caption: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Comma-separated keywords; an empty value clears them
    #[arg(long)]
    keywords: Option<String>,
}

impl From<MetaFields> for MetadataUpdate {
    fn from(fields: MetaFields) -> Self {
        Self {
            title: fields.title,
            alt_text: fields.alt_text,
            caption: fields.caption,
            description: fields.description,
            keywords: fields
                .keywords
                .map(|list| list.split(',').map(str::to_string).collect()),
        }
    }
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Validate the configuration file
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(&cli.config)?;
    init_tracing(&config.logging)?;

    if let Command::Config(ConfigCommand::Check) = cli.command {
        return check_config(&config);
    }

    let pipeline = AssetPipeline::open(&config).map_err(|e| public(&e, config.dev_mode))?;
    run(cli.command, &pipeline, &config).await
}

async fn run(command: Command, pipeline: &AssetPipeline, config: &PipelineConfig) -> Result<()> {
    let dev = pipeline.dev_mode();
    match command {
        Command::Optimize {
            files,
            width,
            quality,
            format,
        } => {
            let options = config.optimize_options(width, quality, format);
            let uploads = files
                .iter()
                .map(|path| read_upload(path))
                .collect::<Result<Vec<_>>>()?;
            print_json(&pipeline.optimize_batch(uploads, options).await)
        },
        Command::List => print_json(&pipeline.list_assets_async().await.map_err(|e| public(&e, dev))?),
        Command::Meta(MetaCommand::Get { path }) => {
            print_json(&pipeline.get_metadata_async(path).await.map_err(|e| public(&e, dev))?)
        },
        Command::Meta(MetaCommand::Set { path, fields }) => {
            let update = MetadataUpdate::from(fields);
            if update.is_empty() {
                anyhow::bail!("Nothing to update: pass at least one of --title, --alt-text, --caption, --description, --keywords");
            }
            let record = pipeline
                .update_metadata_async(path, update)
                .await
                .map_err(|e| public(&e, dev))?;
            print_json(&record)
        },
        Command::Thumb { path, output, size } => {
            let bytes = pipeline.thumbnail(path, size).await.map_err(|e| public(&e, dev))?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write thumbnail: {}", output.display()))?;
            print_json(&serde_json::json!({
                "output": output.display().to_string(),
                "bytes": bytes.len(),
            }))
        },
        Command::Rename { path, new_name } => {
            print_json(&pipeline.rename_async(path, new_name).await.map_err(|e| public(&e, dev))?)
        },
        Command::Delete { paths } => {
            print_json(&pipeline.bulk_delete_async(paths).await.map_err(|e| public(&e, dev))?)
        },
        Command::Export { paths } => {
            let selection = (!paths.is_empty()).then_some(paths);
            print_json(&pipeline.export_records_async(selection).await.map_err(|e| public(&e, dev))?)
        },
        Command::Reconcile => {
            print_json(&pipeline.reconcile_async().await.map_err(|e| public(&e, dev))?)
        },
        Command::Config(ConfigCommand::Check) => check_config(config),
    }
}

fn check_config(config: &PipelineConfig) -> Result<()> {
    let result = config.validate()?;
    for warning in &result.warnings {
        warn!("{warning}");
    }
    print_json(&serde_json::json!({
        "valid": true,
        "warnings": result.warnings,
        "derivativeRoot": config.derivative_root().display().to_string(),
        "archiveRoot": config.archive_root().display().to_string(),
        "metadataRoot": config.metadata_root().display().to_string(),
    }))
}

fn read_upload(path: &Path) -> Result<Upload> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .with_context(|| format!("Not a file: {}", path.display()))?
        .to_string_lossy()
        .into_owned();
    Ok(Upload::new(filename, data))
}

fn public(error: &Error, dev_mode: bool) -> anyhow::Error {
    anyhow::anyhow!("{} (status {})", error.public_message(dev_mode), error.status_code())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
