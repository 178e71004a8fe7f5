//! Upload transcoding into date-bucketed derivatives.
//!
//! One optimize call:
//!
//! 1. Validates the original filename and derives a safe basename
//! 2. Decodes the upload once
//! 3. Claims free names for the original and every derivative
//! 4. Archives the original bytes under `<archive-root>/YYYY/MM/DD/`
//! 5. Renders each requested format on the blocking pool, concurrently,
//!    writing `<derivative-root>/YYYY/MM/DD/<basename>.<ext>`
//! 6. Seeds a metadata record for every derivative written
//!
//! A failing format never stops the other; its error is reported in
//! [`OptimizeReport::failures`].
//!
//! Names are claimed by creating the files exclusively. When any of them is
//! taken, a `-1`, `-2`, ... suffix is tried on all of them together, so two
//! uploads that slugify alike never overwrite each other and the archived
//! original keeps the same suffix as its derivatives.

mod encode;
mod options;

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{Local, NaiveDate, Utc};
use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, warn};

pub use encode::slugify_basename;
pub use options::{FormatChoice, OptimizeOptions, OutputFormat};

use crate::constants::MAX_NAME_SUFFIX;
use crate::error::{Error, Result};
use crate::metadata::{MetadataRecord, MetadataStore, TechnicalInfo};
use crate::security::sanitize_filename;

/// One derivative written by an optimize call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativeResult {
    pub format: OutputFormat,
    /// Canonical path under the derivative root
    pub relative_path: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub original_size: u64,
    pub optimized_size: u64,
    /// `original_size - optimized_size`; negative when the output grew
    pub savings: i64,
    pub savings_percent: f64,
}

/// A format that failed to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatFailure {
    pub format: OutputFormat,
    pub reason: String,
}

/// Outcome of one optimize call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeReport {
    /// Original upload filename, as archived
    pub original: String,
    pub derivatives: Vec<DerivativeResult>,
    pub failures: Vec<FormatFailure>,
}

/// Writes derivatives and archived originals, seeding the metadata store.
#[derive(Debug, Clone)]
pub struct Transcoder {
    derivative_root: PathBuf,
    archive_root: PathBuf,
    store: MetadataStore,
}

/// Names claimed for one upload within its bucket.
#[derive(Debug)]
struct ClaimedNames {
    basename: String,
    original_name: String,
}

struct RenderJob {
    image: Arc<DynamicImage>,
    format: OutputFormat,
    options: OptimizeOptions,
    bucket: String,
    basename: String,
    original_name: String,
    original_size: u64,
}

impl Transcoder {
    #[must_use]
    pub fn new(
        derivative_root: impl Into<PathBuf>,
        archive_root: impl Into<PathBuf>,
        store: MetadataStore,
    ) -> Self {
        Self {
            derivative_root: derivative_root.into(),
            archive_root: archive_root.into(),
            store,
        }
    }

    /// Transcodes `data` into today's bucket (local date).
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidRequest`] - `original_filename` is not a safe single segment
    /// * [`Error::TranscodeFailure`] - the upload cannot be decoded, or every format failed
    /// * [`Error::Io`] - the original cannot be archived
    pub async fn optimize(
        &self,
        data: Bytes,
        original_filename: &str,
        options: OptimizeOptions,
    ) -> Result<OptimizeReport> {
        self.optimize_on(Local::now().date_naive(), data, original_filename, options)
            .await
    }

    /// Transcodes `data` into the bucket for `date`.
    ///
    /// # Errors
    ///
    /// See [`Transcoder::optimize`].
    pub async fn optimize_on(
        &self,
        date: NaiveDate,
        data: Bytes,
        original_filename: &str,
        options: OptimizeOptions,
    ) -> Result<OptimizeReport> {
        let original_name = sanitize_filename(original_filename)
            .map_err(|e| Error::from_filename(original_filename, &e))?;
        let basename = slugify_basename(&original_name);
        let bucket = date.format("%Y/%m/%d").to_string();
        let options = options.clamped();
        let formats = options.format.outputs();

        let (image, claimed) = {
            let transcoder = self.clone();
            let bucket = bucket.clone();
            let data = data.clone();
            tokio::task::spawn_blocking(move || {
                transcoder.prepare(&data, &bucket, &original_name, &basename, formats)
            })
            .await
            .map_err(|e| Error::join(&e))??
        };
        let image = Arc::new(image);
        let ClaimedNames {
            basename,
            original_name,
        } = claimed;

        let jobs = formats.iter().map(|&format| {
            let transcoder = self.clone();
            let job = RenderJob {
                image: Arc::clone(&image),
                format,
                options,
                bucket: bucket.clone(),
                basename: basename.clone(),
                original_name: original_name.clone(),
                original_size: data.len() as u64,
            };
            async move {
                let outcome = tokio::task::spawn_blocking(move || transcoder.render(&job))
                    .await
                    .map_err(|e| Error::join(&e))
                    .and_then(|result| result);
                (format, outcome)
            }
        });

        let mut report = OptimizeReport {
            original: original_name.clone(),
            derivatives: Vec::new(),
            failures: Vec::new(),
        };
        for (format, outcome) in futures::future::join_all(jobs).await {
            match outcome {
                Ok(derivative) => report.derivatives.push(derivative),
                Err(e) => {
                    warn!(file = %original_name, %format, error = %e, "Format failed to render");
                    report.failures.push(FormatFailure {
                        format,
                        reason: e.to_string(),
                    });
                },
            }
        }

        if report.derivatives.is_empty() {
            let reasons: Vec<_> = report.failures.iter().map(|f| f.reason.as_str()).collect();
            return Err(Error::transcode(original_name, reasons.join("; ")));
        }

        info!(
            file = %report.original,
            derivatives = report.derivatives.len(),
            failures = report.failures.len(),
            "Optimized upload"
        );
        Ok(report)
    }

    /// Decodes the upload, claims free names and archives the original bytes.
    fn prepare(
        &self,
        data: &[u8],
        bucket: &str,
        original_name: &str,
        basename: &str,
        formats: &[OutputFormat],
    ) -> Result<(DynamicImage, ClaimedNames)> {
        let image = image::load_from_memory(data).map_err(|e| Error::transcode(original_name, e))?;

        let archive_dir = self.archive_root.join(bucket);
        let derivative_dir = self.derivative_root.join(bucket);
        create_dir(&archive_dir)?;
        create_dir(&derivative_dir)?;

        let claimed = claim_names(&archive_dir, &derivative_dir, original_name, basename, formats)?;

        let archive_path = archive_dir.join(&claimed.original_name);
        if let Err(e) = fs::write(&archive_path, data) {
            release(&archive_path);
            for format in formats {
                release(&derivative_dir.join(format!("{}.{}", claimed.basename, format.extension())));
            }
            return Err(Error::io(format!("archiving {}", claimed.original_name), e));
        }
        debug!(path = %archive_path.display(), bytes = data.len(), "Archived original");

        Ok((image, claimed))
    }

    /// Resizes, encodes and writes one format, then seeds its record.
    fn render(&self, job: &RenderJob) -> Result<DerivativeResult> {
        let filename = format!("{}.{}", job.basename, job.format.extension());
        let relative_path = format!("{}/{filename}", job.bucket);
        let target = self.derivative_root.join(&job.bucket).join(&filename);

        let resized = encode::resize_to_width(&job.image, job.options.width);
        let written = encode::encode(&resized, job.format, job.options.quality)
            .map_err(|e| Error::transcode(&job.original_name, e))
            .and_then(|encoded| {
                fs::write(&target, &encoded)
                    .map(|()| encoded)
                    .map_err(|e| Error::io(format!("writing derivative {relative_path}"), e))
            });
        let encoded = match written {
            Ok(encoded) => encoded,
            Err(e) => {
                release(&target);
                return Err(e);
            },
        };

        let optimized_size = encoded.len() as u64;
        let derivative = DerivativeResult {
            format: job.format,
            relative_path,
            filename,
            width: resized.width(),
            height: resized.height(),
            original_size: job.original_size,
            optimized_size,
            savings: savings(job.original_size, optimized_size),
            savings_percent: savings_percent(job.original_size, optimized_size),
        };

        let has_alpha = job.format == OutputFormat::Webp && resized.color().has_alpha();
        let now = Utc::now();
        let record = MetadataRecord::from_technical(
            &derivative.relative_path,
            TechnicalInfo {
                width: derivative.width,
                height: derivative.height,
                format: Some(job.format.name().to_string()),
                color_space: if resized.color().has_color() { "srgb" } else { "b-w" }.to_string(),
                has_alpha,
                file_size: optimized_size,
                original_size: job.original_size,
                original_path: Some(format!("{}/{}", job.bucket, job.original_name)),
                created_at: now,
                modified_at: now,
            },
        );
        if let Err(e) = self.store.insert(&record) {
            // the record is rebuilt lazily on first read
            warn!(path = %derivative.relative_path, error = %e, "Failed to seed metadata record");
        }

        Ok(derivative)
    }
}

/// Claims the archive name and every derivative name for one upload.
///
/// Each candidate set is created exclusively; a taken name releases the rest
/// of the set and moves on to the next numeric suffix.
fn claim_names(
    archive_dir: &Path,
    derivative_dir: &Path,
    original_name: &str,
    basename: &str,
    formats: &[OutputFormat],
) -> Result<ClaimedNames> {
    for n in 0..=MAX_NAME_SUFFIX {
        let candidate = if n == 0 {
            ClaimedNames {
                basename: basename.to_string(),
                original_name: original_name.to_string(),
            }
        } else {
            ClaimedNames {
                basename: format!("{basename}-{n}"),
                original_name: with_suffix(original_name, n),
            }
        };

        let mut targets = vec![archive_dir.join(&candidate.original_name)];
        targets.extend(
            formats
                .iter()
                .map(|format| derivative_dir.join(format!("{}.{}", candidate.basename, format.extension()))),
        );

        let mut created = Vec::with_capacity(targets.len());
        let mut taken = false;
        for target in targets {
            match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(_) => created.push(target),
                Err(e) => {
                    created.iter().for_each(|path| release(path));
                    if e.kind() == ErrorKind::AlreadyExists {
                        taken = true;
                        break;
                    }
                    return Err(Error::io(format!("claiming {}", target.display()), e));
                },
            }
        }

        if !taken {
            if n > 0 {
                debug!(basename = %candidate.basename, original = %candidate.original_name, "Claimed suffixed names");
            }
            return Ok(candidate);
        }
    }

    Err(Error::already_exists(format!("{basename} (no free suffix up to {MAX_NAME_SUFFIX})")))
}

/// `photo.png` with suffix 2 becomes `photo-2.png`.
fn with_suffix(filename: &str, n: u32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{filename}-{n}"),
    }
}

fn release(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove claimed file");
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(format!("creating {}", dir.display()), e))
}

fn savings(original: u64, optimized: u64) -> i64 {
    i64::try_from(original).unwrap_or(i64::MAX) - i64::try_from(optimized).unwrap_or(i64::MAX)
}

#[allow(clippy::cast_precision_loss)]
fn savings_percent(original: u64, optimized: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let percent = savings(original, optimized) as f64 / original as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}
