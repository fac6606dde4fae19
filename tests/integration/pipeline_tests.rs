/*!
 * End-to-end tests of a single unit with mock collaborators
 */

use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use slidecast::app_config::Config;
use slidecast::app_controller::Controller;
use slidecast::language_utils::Language;
use slidecast::progress::{ProgressCallback, ProgressUpdate};

use crate::common::{self, ENGLISH_SCRIPT, MockEncodeTool, MockModelLoader, MockSynthesizer, SPANISH_SCRIPT};

struct Harness {
    synthesizer: Arc<MockSynthesizer>,
    loader: Arc<MockModelLoader>,
    encoder: Arc<MockEncodeTool>,
    controller: Controller,
}

fn harness(config: Config) -> Harness {
    common::init_test_logging();
    let synthesizer = Arc::new(MockSynthesizer::new());
    let loader = Arc::new(MockModelLoader::new());
    let encoder = Arc::new(MockEncodeTool::new(5.0));
    let collaborators = common::collaborators(synthesizer.clone(), loader.clone(), encoder.clone());
    let controller = Controller::with_config(config, collaborators).unwrap();
    Harness { synthesizer, loader, encoder, controller }
}

/// Value following `-i` in an argument list
fn input_of(args: &[String]) -> String {
    let i = args.iter().position(|a| a == "-i").unwrap();
    Path::new(&args[i + 1]).file_name().unwrap().to_string_lossy().to_string()
}

#[tokio::test]
async fn test_run_unit_withImagesAndScript_shouldProduceCaptionedVideo() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 3, ENGLISH_SCRIPT).unwrap();
    let mut h = harness(common::test_config());

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(outcome.success, "{:?}", outcome.reason);
    assert_eq!(outcome.output.as_deref(), Some(layout.final_file().as_path()));
    assert!(layout.final_file().exists());
    assert!(layout.voice_file().exists());
    assert!(layout.slideshow_file().exists());

    // 5 s of narration at 2 fps
    assert_eq!(h.encoder.frames.load(Ordering::SeqCst), 10);
    assert_eq!(h.synthesizer.request_count(), 1);

    let captions = fs::read_to_string(layout.caption_file()).unwrap();
    assert!(captions.contains("[V4+ Styles]"));
    assert!(captions.contains("Dialogue:"));
    assert!(captions.contains("RIVER"));
    assert_eq!(h.encoder.calls_containing("ass='").len(), 1);

    assert_eq!(h.loader.load_count(), 1);
    assert_eq!(h.loader.calls(), vec![(1, Language::English)]);

    let leftovers: Vec<_> = fs::read_dir(&layout.output).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("video_1_final.mp4")]);
}

#[tokio::test]
async fn test_run_unit_withSpanishScript_shouldForceSpanishTranscription() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 2, SPANISH_SCRIPT).unwrap();
    let mut h = harness(common::test_config());

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(outcome.success, "{:?}", outcome.reason);
    assert_eq!(h.loader.calls(), vec![(1, Language::Spanish)]);
    let requests = h.synthesizer.requests.lock().unwrap();
    assert_eq!(requests[0].voice_id, "es-ES-ElviraNeural");
    assert_eq!(requests[0].rate, "-5%");
}

#[tokio::test]
async fn test_run_unit_withExistingCaptions_shouldSkipTranscription() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    common::create_test_file(&layout.subtitles, "manual.ass", "[Script Info]\n").unwrap();
    let mut h = harness(common::test_config());

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(outcome.success, "{:?}", outcome.reason);
    assert_eq!(h.loader.load_count(), 0);
    assert_eq!(h.encoder.calls_containing("manual.ass").len(), 1);
    assert!(!layout.caption_file().exists());
}

#[tokio::test]
async fn test_run_unit_withBookendClips_shouldConcatInOrder() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    common::create_test_file(&layout.intro, "intro.mp4", "clip").unwrap();
    common::create_test_file(&layout.outro, "outro.mp4", "clip").unwrap();
    let mut h = harness(common::test_config());

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(outcome.success, "{:?}", outcome.reason);
    let normalized: Vec<String> = h.encoder.calls_containing("scale=32:18,fps=2").iter().map(|a| input_of(a)).collect();
    assert_eq!(normalized, vec!["intro.mp4", "captioned.mp4", "outro.mp4"]);
}

#[tokio::test]
async fn test_run_unit_withDisabledIntro_shouldLeaveItOut() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    common::create_test_file(&layout.intro, "intro.mp4", "clip").unwrap();
    let mut config = common::test_config();
    config.unit_defaults.enable_intro = false;
    let mut h = harness(config);

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(outcome.success, "{:?}", outcome.reason);
    assert!(h.encoder.calls_containing("intro.mp4").is_empty());
}

#[tokio::test]
async fn test_run_unit_withWebcamClip_shouldOverlayIt() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    common::create_test_file(&layout.webcam, "cam.mp4", "clip").unwrap();
    let mut config = common::test_config();
    config.unit_defaults.enable_webcam = true;
    let mut h = harness(config);

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(outcome.success, "{:?}", outcome.reason);
    assert_eq!(h.encoder.calls_containing("overlay=").len(), 1);
}

#[tokio::test]
async fn test_run_unit_whenWebcamOverlayFails_shouldStillSucceed() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    common::create_test_file(&layout.webcam, "cam.mp4", "clip").unwrap();
    let mut config = common::test_config();
    config.unit_defaults.enable_webcam = true;
    let mut h = harness(config);
    h.encoder.fail_when("overlay=");

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(outcome.success, "{:?}", outcome.reason);
    assert!(layout.final_file().exists());
}

#[tokio::test]
async fn test_run_unit_withoutImages_shouldFailWithMissingResource() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 0, ENGLISH_SCRIPT).unwrap();
    let mut h = harness(common::test_config());

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(!outcome.success);
    assert!(outcome.reason.unwrap().starts_with("Missing resource"));
    assert_eq!(h.synthesizer.request_count(), 0);
}

#[tokio::test]
async fn test_run_unit_whenMergeFails_shouldFailWithToolError() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    let mut h = harness(common::test_config());
    h.encoder.fail_when("-shortest");

    let outcome = h.controller.run_unit(&layout.root).await;

    assert!(!outcome.success);
    assert!(outcome.reason.unwrap().starts_with("External tool error"));
    assert!(!layout.final_file().exists());
}

#[tokio::test]
async fn test_run_unit_shouldReportMonotonicProgressToCompletion() {
    let dir = common::create_temp_dir().unwrap();
    let layout = common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    let updates = Arc::new(Mutex::new(Vec::<ProgressUpdate>::new()));
    let sink = updates.clone();
    let callback: ProgressCallback = Arc::new(move |u: &ProgressUpdate| sink.lock().unwrap().push(u.clone()));
    let h = harness(common::test_config());
    let mut controller = h.controller.with_progress(callback);

    let outcome = controller.run_unit(&layout.root).await;

    assert!(outcome.success, "{:?}", outcome.reason);
    let updates = updates.lock().unwrap();
    assert!(updates.windows(2).all(|w| w[0].fraction <= w[1].fraction + 1e-9));
    assert_eq!(updates.last().unwrap().fraction, 1.0);
}
