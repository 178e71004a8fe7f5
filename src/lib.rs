//! Image asset pipeline.
//!
//! Ingests uploaded images, transcodes them into date-bucketed derivatives,
//! archives the originals, keeps one editable metadata record per derivative
//! and serves thumbnails through an LRU+TTL cache.
//!
//! # Modules
//!
//! - [`security`] - Untrusted path resolution and filename validation
//! - [`metadata`] - Per-asset JSON metadata store
//! - [`cache`] - Thumbnail and metadata caches
//! - [`transcode`] - WebP/JPEG derivative generation
//! - [`scanner`] - Derivative tree enumeration
//! - [`pipeline`] - The facade consumed by the CLI or an HTTP layer
//!
//! # Example
//!
//! ```no_run
//! use asset_pipeline::{AssetPipeline, PipelineConfig};
//!
//! # fn main() -> asset_pipeline::Result<()> {
//! let config = PipelineConfig::default();
//! let pipeline = AssetPipeline::open(&config)?;
//! for asset in pipeline.list_assets()? {
//!     println!("{}", asset.relative_path);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod scanner;
pub mod security;
pub mod transcode;
pub mod upload;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use metadata::{MetadataRecord, MetadataUpdate};
pub use pipeline::AssetPipeline;
pub use transcode::{FormatChoice, OptimizeOptions};
