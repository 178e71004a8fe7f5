//! End-to-end tests through the public pipeline API.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use asset_pipeline::config::PipelineConfig;
use asset_pipeline::pipeline::{AssetPipeline, Upload};
use asset_pipeline::{Error, FormatChoice, MetadataUpdate, OptimizeOptions};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;

fn open(tmp: &Path) -> AssetPipeline {
    let config = PipelineConfig {
        base_dir: Some(tmp.to_path_buf()),
        ..PipelineConfig::default()
    };
    AssetPipeline::open(&config).unwrap()
}

fn png(width: u32, height: u32) -> Bytes {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 251) as u8, (y % 251) as u8, 128, 255])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    Bytes::from(out.into_inner())
}

#[tokio::test]
async fn test_upload_edit_rename_delete_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let pipeline = open(tmp.path());
    let data = png(500, 500);

    let report = pipeline
        .optimize(
            data.clone(),
            "Team Photo.png",
            OptimizeOptions::new(Some(100), Some(70), FormatChoice::Both),
        )
        .await
        .unwrap();
    assert_eq!(report.derivatives.len(), 2);
    assert!(report.derivatives.iter().all(|d| d.width <= 100));

    let webp = report
        .derivatives
        .iter()
        .find(|d| d.filename == "Team-Photo.webp")
        .unwrap();
    let webp_path = webp.relative_path.clone();
    let bucket = webp_path.rsplit_once('/').unwrap().0.to_string();
    assert!(tmp.path().join("originals").join(&bucket).join("Team Photo.png").exists());

    let record = pipeline
        .update_metadata_async(
            webp_path.clone(),
            MetadataUpdate {
                alt_text: Some("Team on stage".into()),
                keywords: Some(vec![" team ".into(), String::new(), "stage".into()]),
                ..MetadataUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(record.keywords, vec!["team", "stage"]);
    assert_eq!(record.width, Some(100));

    let thumb = pipeline.thumbnail(webp_path.clone(), Some(64)).await.unwrap();
    let decoded = image::load_from_memory_with_format(&thumb, ImageFormat::Jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 64));

    let renamed = pipeline
        .rename_async(webp_path.clone(), "crew".into())
        .await
        .unwrap();
    assert_eq!(renamed.new_path, format!("{bucket}/crew.webp"));
    let moved = pipeline.get_metadata_async(renamed.new_path.clone()).await.unwrap();
    assert_eq!(moved.alt_text, "Team on stage");
    assert_eq!(moved.filename, "crew.webp");

    let deleted = pipeline.delete_async(renamed.new_path.clone()).await.unwrap();
    assert!(deleted.record_removed);
    assert!(tmp.path().join("originals").join(&bucket).join("Team Photo.png").exists());

    let remaining = pipeline.list_assets_async().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].relative_path.ends_with("Team-Photo.jpg"));
}

#[tokio::test]
async fn test_traversal_never_touches_filesystem() {
    let tmp = TempDir::new().unwrap();
    let pipeline = open(tmp.path());
    let outside = tmp.path().join("secret.webp");
    fs::write(&outside, b"secret").unwrap();

    for raw in [
        "../secret.webp",
        "optimized/../secret.webp",
        "..\\secret.webp",
        "/etc/passwd",
        "C:\\Windows\\win.ini",
        "2025/10/31/a.webp\0.jpg",
    ] {
        let err = pipeline.delete_async(raw.to_string()).await.unwrap_err();
        assert!(
            matches!(err, Error::PathTraversal { .. }),
            "{raw:?} should be rejected, got {err:?}"
        );
    }
    assert!(outside.exists());
}

#[tokio::test]
async fn test_concurrent_thumbnails_agree() {
    let tmp = TempDir::new().unwrap();
    let pipeline = open(tmp.path());
    let report = pipeline
        .optimize(png(300, 200), "wide.png", OptimizeOptions::new(Some(0), None, FormatChoice::Jpeg))
        .await
        .unwrap();
    let path = report.derivatives[0].relative_path.clone();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = pipeline.clone();
            let path = path.clone();
            tokio::spawn(async move { pipeline.thumbnail(path, Some(150)).await })
        })
        .collect();

    let mut outputs = Vec::new();
    for task in tasks {
        outputs.push(task.await.unwrap().unwrap());
    }
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(pipeline.cache_stats().thumbnails.entries, 1);
}

#[tokio::test]
async fn test_batch_upload_and_export() {
    let tmp = TempDir::new().unwrap();
    let pipeline = open(tmp.path());

    let batch = pipeline
        .optimize_batch(
            vec![
                Upload::new("one.png", png(40, 40)),
                Upload::new("two.png", png(40, 40)),
                Upload::new("oversized.tiff", Bytes::from(vec![0u8; 51 * 1024 * 1024])),
            ],
            OptimizeOptions::default(),
        )
        .await;
    assert_eq!(batch.succeeded.len(), 2);
    assert_eq!(batch.failed.len(), 1);
    assert_eq!(batch.failed[0].status, 413);

    let export = pipeline.export_records_async(None).await.unwrap();
    assert_eq!(export.records.len(), 2);
    assert!(export.failed.is_empty());

    let reconcile = pipeline.reconcile_async().await.unwrap();
    assert_eq!(reconcile.checked, 2);
    assert!(reconcile.removed.is_empty());
}
