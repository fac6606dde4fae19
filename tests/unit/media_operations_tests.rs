/*!
 * Tests for media operations against a recording encode tool
 */

use std::path::PathBuf;
use std::sync::Arc;

use slidecast::app_config::{EncodeConfig, WebcamPosition};
use slidecast::media::{ConcatStrategy, MediaOps};

use crate::common::{self, MockEncodeTool};

fn media(encoder: Arc<MockEncodeTool>) -> MediaOps {
    MediaOps::new(encoder, EncodeConfig::default(), 1920, 1080, 25)
}

fn clips(dir: &std::path::Path, names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|n| common::create_test_file(dir, n, "clip").unwrap()).collect()
}

#[tokio::test]
async fn test_concat_clips_withWorkingEncoder_shouldNormalizeEveryClip() {
    let dir = common::create_temp_dir().unwrap();
    let encoder = Arc::new(MockEncodeTool::new(4.0));
    let inputs = clips(dir.path(), &["intro.mp4", "main.mp4", "outro.mp4"]);

    let strategy = media(encoder.clone()).concat_clips(&inputs, &dir.path().join("final.mp4")).await.unwrap();

    assert_eq!(strategy, ConcatStrategy::Normalized);
    assert_eq!(encoder.calls_containing("scale=1920:1080,fps=25").len(), 3);
    let lists = encoder.concat_lists.lock().unwrap();
    assert_eq!(lists.last().unwrap().matches("normalized_").count(), 3);
}

#[tokio::test]
async fn test_concat_clips_whenNormalizationFails_shouldFallBackToStreamCopyOnce() {
    let dir = common::create_temp_dir().unwrap();
    let encoder = Arc::new(MockEncodeTool::new(4.0));
    encoder.fail_when("scale=");
    let inputs = clips(dir.path(), &["intro.mp4", "main.mp4"]);

    let strategy = media(encoder.clone()).concat_clips(&inputs, &dir.path().join("final.mp4")).await.unwrap();

    assert_eq!(strategy, ConcatStrategy::StreamCopyFallback);
    let lists = encoder.concat_lists.lock().unwrap();
    assert_eq!(lists.len(), 1);
    assert!(lists[0].contains("intro.mp4") && lists[0].contains("main.mp4"));
}

#[tokio::test]
async fn test_concat_clips_whenFallbackAlsoFails_shouldReturnError() {
    let dir = common::create_temp_dir().unwrap();
    let encoder = Arc::new(MockEncodeTool::new(4.0));
    encoder.fail_when("concat");
    let inputs = clips(dir.path(), &["a.mp4", "b.mp4"]);

    let result = media(encoder.clone()).concat_clips(&inputs, &dir.path().join("final.mp4")).await;

    assert!(result.is_err());
    assert_eq!(encoder.calls_containing("copy").len(), 1);
}

#[tokio::test]
async fn test_concat_clips_withSingleClip_shouldCopy() {
    let dir = common::create_temp_dir().unwrap();
    let encoder = Arc::new(MockEncodeTool::new(4.0));
    let inputs = clips(dir.path(), &["main.mp4"]);

    let output = dir.path().join("final.mp4");
    let strategy = media(encoder.clone()).concat_clips(&inputs, &output).await.unwrap();

    assert_eq!(strategy, ConcatStrategy::Single);
    assert!(output.exists());
    assert!(encoder.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_build_webcam_track_withShortSource_shouldAlternateFlippedCycles() {
    let dir = common::create_temp_dir().unwrap();
    let encoder = Arc::new(MockEncodeTool::new(3.0));
    let source = clips(dir.path(), &["cam.mp4"]).remove(0);

    media(encoder.clone()).build_webcam_track(&source, 7.0, 15, &dir.path().join("webcam.mp4")).await.unwrap();

    assert_eq!(encoder.calls_containing("scale=288:162").len(), 3);
    assert_eq!(encoder.calls_containing("hflip").len(), 1);
    assert_eq!(encoder.calls_containing("7.000").len(), 1);
    assert_eq!(encoder.concat_lists.lock().unwrap()[0].matches("webcam_cycle_").count(), 3);
}

#[tokio::test]
async fn test_overlay_webcam_shouldPlaceTrackAtCorner() {
    let dir = common::create_temp_dir().unwrap();
    let encoder = Arc::new(MockEncodeTool::new(3.0));
    let inputs = clips(dir.path(), &["main.mp4", "cam.mp4"]);

    media(encoder.clone())
        .overlay_webcam(&inputs[0], &inputs[1], 15, WebcamPosition::BottomRight, &dir.path().join("out.mp4"))
        .await
        .unwrap();

    assert_eq!(encoder.calls_containing("overlay=1632:918").len(), 1);
}

#[tokio::test]
async fn test_burn_captions_shouldPickFilterByExtension() {
    let dir = common::create_temp_dir().unwrap();
    let encoder = Arc::new(MockEncodeTool::new(3.0));
    let inputs = clips(dir.path(), &["main.mp4", "captions.ass", "captions.srt"]);
    let ops = media(encoder.clone());

    ops.burn_captions(&inputs[0], &inputs[1], &dir.path().join("a.mp4")).await.unwrap();
    ops.burn_captions(&inputs[0], &inputs[2], &dir.path().join("b.mp4")).await.unwrap();

    assert_eq!(encoder.calls_containing("ass='").len(), 1);
    assert_eq!(encoder.calls_containing("subtitles='").len(), 1);
}

#[tokio::test]
async fn test_probe_duration_shouldParseProbeOutput() {
    let encoder = Arc::new(MockEncodeTool::new(12.5));
    let duration = media(encoder).probe_duration(std::path::Path::new("voice.mp3")).await.unwrap();
    assert_eq!(duration, 12.5);
}
