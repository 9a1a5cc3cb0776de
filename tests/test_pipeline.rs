mod common;

use arucosize::diagnostics::{DiagnosticFrame, DiagnosticSink};
use arucosize::pipeline::ANNOTATED_FILENAME;
use common::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const TOLERANCE: f64 = 0.02;

#[tokio::test]
async fn test_measures_four_marker_photo() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(MeasureConfig::default())?;
    let bytes = encode_png(&four_marker_scene(1));

    let result = pipeline.measure_bytes(&bytes)?;
    let (width, height) = expected_dimensions(13.23);

    assert_close(result.width, width, TOLERANCE);
    assert_close(result.height, height, TOLERANCE);
    assert_eq!(result.unit, "cm");
    assert_eq!(result.message, "Dimensions calculated successfully");

    Ok(())
}

#[tokio::test]
async fn test_three_markers_are_enough() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(MeasureConfig::default())?;
    let result = pipeline.measure_bytes(&encode_png(&partial_scene(&[0, 1, 2])))?;
    let (width, height) = expected_dimensions(13.23);

    assert_close(result.width, width, TOLERANCE);
    assert_close(result.height, height, TOLERANCE);

    Ok(())
}

#[tokio::test]
async fn test_repeated_spare_marker_is_ignored() -> anyhow::Result<()> {
    let (w, h, mut markers) = four_marker_layout(1);
    markers.push(MarkerSpec::new(7, 440, 100, 20));
    markers.push(MarkerSpec::new(7, 440, 580, 20));
    let scene = render_scene(w, h, &markers, DictionaryKind::Aruco4x4_50);

    let pipeline = Pipeline::new(MeasureConfig::default())?;
    let result = pipeline.measure_bytes(&encode_png(&scene))?;
    let (width, height) = expected_dimensions(13.23);

    assert_close(result.width, width, TOLERANCE);
    assert_close(result.height, height, TOLERANCE);

    Ok(())
}

#[tokio::test]
async fn test_repeated_corner_marker_is_an_error() -> anyhow::Result<()> {
    let (w, h, mut markers) = four_marker_layout(1);
    markers.push(MarkerSpec::new(0, 440, 340, 20));
    let scene = render_scene(w, h, &markers, DictionaryKind::Aruco4x4_50);

    let pipeline = Pipeline::new(MeasureConfig::default())?;
    let err = pipeline.measure_bytes(&encode_png(&scene)).unwrap_err();
    assert!(matches!(err, MeasureError::DuplicateMarker { id: 0, count: 2 }));

    Ok(())
}

#[tokio::test]
async fn test_rotated_photo_same_dimensions() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(MeasureConfig::default())?;
    let (width, height) = expected_dimensions(13.23);

    for degrees in [10.0, 30.0] {
        let scene = pad_and_rotate(&four_marker_scene(1), 300, degrees);
        let result = pipeline.measure_image(&image::DynamicImage::ImageLuma8(scene))?;

        assert_close(result.width, width, TOLERANCE);
        assert_close(result.height, height, TOLERANCE);
    }

    Ok(())
}

#[tokio::test]
async fn test_same_bytes_same_result() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(MeasureConfig::default())?;
    let bytes = encode_png(&four_marker_scene(1));

    let first = pipeline.measure_bytes(&bytes)?;
    let second = pipeline.measure_bytes(&bytes)?;
    assert_eq!(first, second);

    Ok(())
}

#[tokio::test]
async fn test_closer_photo_same_dimensions() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(MeasureConfig::default())?;

    let near = pipeline.run(&image::DynamicImage::ImageLuma8(four_marker_scene(2)))?;
    let far = pipeline.run(&image::DynamicImage::ImageLuma8(four_marker_scene(1)))?;

    assert_close(near.result.width, far.result.width, TOLERANCE);
    assert_close(near.result.height, far.result.height, TOLERANCE);
    assert_close(near.ratio, far.ratio / 2.0, TOLERANCE);

    Ok(())
}

#[tokio::test]
async fn test_marker_size_and_unit_flow_through() -> anyhow::Result<()> {
    let config = MeasureConfig::default().with_marker_size(5.0).with_unit("in");
    let pipeline = Pipeline::new(config)?;

    let result = pipeline.measure_bytes(&encode_png(&four_marker_scene(1)))?;
    let (width, _) = expected_dimensions(5.0);
    assert_close(result.width, width, TOLERANCE);
    assert_eq!(result.unit, "in");

    Ok(())
}

#[tokio::test]
async fn test_garbage_bytes_fail_to_decode() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(MeasureConfig::default())?;

    let err = pipeline.measure_bytes(b"definitely not a png").unwrap_err();
    assert!(matches!(err, MeasureError::Decode(_)));

    let err = pipeline.measure_bytes(&[]).unwrap_err();
    assert!(matches!(err, MeasureError::Decode(_)));

    Ok(())
}

#[tokio::test]
async fn test_missing_marker_is_reported() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(MeasureConfig::default())?;

    let err = pipeline.measure_bytes(&encode_png(&partial_scene(&[0, 1, 3]))).unwrap_err();
    match err {
        MeasureError::InsufficientMarkers { found, missing, required } => {
            assert_eq!(found, vec![0, 1, 3]);
            assert_eq!(missing, vec![2]);
            assert_eq!(required, vec![0, 1, 2]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = pipeline.measure_bytes(&encode_png(&partial_scene(&[]))).unwrap_err();
    assert!(matches!(err, MeasureError::InsufficientMarkers { ref found, .. } if found.is_empty()));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_share_one_pipeline() -> anyhow::Result<()> {
    let pipeline = Arc::new(Pipeline::new(MeasureConfig::default())?);
    let bytes = Arc::new(encode_png(&four_marker_scene(1)));
    let expected = pipeline.measure_bytes(&bytes)?;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pipeline = Arc::clone(&pipeline);
        let bytes = Arc::clone(&bytes);
        handles.push(tokio::task::spawn_blocking(move || pipeline.measure_bytes(&bytes)));
    }

    for handle in handles {
        assert_eq!(handle.await??, expected);
    }

    Ok(())
}

#[tokio::test]
async fn test_measure_from_async_reader() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("photo.png");
    tokio::fs::write(&path, encode_png(&four_marker_scene(1))).await?;

    let pipeline = Pipeline::new(MeasureConfig::default())?;
    let file = tokio::fs::File::open(&path).await?;
    let result = pipeline.measure_reader(file).await?;

    let (width, _) = expected_dimensions(13.23);
    assert_close(result.width, width, TOLERANCE);

    Ok(())
}

#[tokio::test]
async fn test_debug_output_written() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");

    let pipeline = Pipeline::new(MeasureConfig::default())?.with_debug(debug_dir.clone())?;
    pipeline.measure_bytes(&encode_png(&four_marker_scene(1)))?;

    let annotated = image::open(debug_dir.join(ANNOTATED_FILENAME))?;
    assert_eq!((annotated.width(), annotated.height()), (1000, 800));

    Ok(())
}

struct FailingSink {
    calls: AtomicUsize,
}

impl DiagnosticSink for FailingSink {
    fn emit(&self, _frame: &DiagnosticFrame<'_>) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("disk full"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[tokio::test]
async fn test_failing_sink_does_not_change_result() -> anyhow::Result<()> {
    let bytes = encode_png(&four_marker_scene(1));
    let plain = Pipeline::new(MeasureConfig::default())?;
    let expected = plain.measure_bytes(&bytes)?;

    let sink = Arc::new(FailingSink { calls: AtomicUsize::new(0) });
    let pipeline = Pipeline::new(MeasureConfig::default())?.with_diagnostic_sink(sink.clone());

    assert_eq!(pipeline.measure_bytes(&bytes)?, expected);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

    Ok(())
}
