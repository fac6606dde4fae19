/*!
 * Tests for batch processing across several units
 */

use std::fs;
use std::sync::{Arc, Mutex};

use slidecast::app_controller::{BATCH_LOG_FILE, Controller};
use slidecast::language_utils::Language;

use crate::common::{self, ENGLISH_SCRIPT, MockEncodeTool, MockModelLoader, MockSynthesizer, SPANISH_SCRIPT};

fn controller(loader: Arc<MockModelLoader>) -> Controller {
    common::init_test_logging();
    let collaborators = common::collaborators(Arc::new(MockSynthesizer::new()), loader, Arc::new(MockEncodeTool::new(4.0)));
    Controller::with_config(common::test_config(), collaborators).unwrap()
}

#[tokio::test]
async fn test_run_batch_withTwoLanguages_shouldLoadFreshModelPerUnit() {
    let dir = common::create_temp_dir().unwrap();
    common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    common::create_unit(dir.path(), "video_2", 2, SPANISH_SCRIPT).unwrap();
    let loader = Arc::new(MockModelLoader::new());
    let mut controller = controller(loader.clone());

    let report = controller.run_batch(dir.path(), |_, _| {}).await.unwrap();

    assert_eq!(report.summary(), "Success: 2/2");
    assert_eq!(loader.load_count(), 2);
    assert_eq!(loader.calls(), vec![(1, Language::English), (2, Language::Spanish)]);
}

#[tokio::test]
async fn test_run_batch_withFailingUnit_shouldContinueWithNextUnits() {
    let dir = common::create_temp_dir().unwrap();
    common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    common::create_unit(dir.path(), "video_2", 0, ENGLISH_SCRIPT).unwrap();
    common::create_unit(dir.path(), "video_10", 2, SPANISH_SCRIPT).unwrap();
    let mut controller = controller(Arc::new(MockModelLoader::new()));

    let report = controller.run_batch(dir.path(), |_, _| {}).await.unwrap();

    let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["video_1", "video_2", "video_10"]);
    assert_eq!(report.summary(), "Success: 2/3");
    assert!(!report.outcomes[1].success);
    assert!(report.outcomes[1].reason.as_deref().unwrap().contains("no images"));
    assert!(report.outcomes[2].output.as_ref().unwrap().exists());

    let log = fs::read_to_string(dir.path().join(BATCH_LOG_FILE)).unwrap();
    assert!(log.contains("Success: 2/3"));
    assert!(log.contains("video_2: failed"));
}

#[tokio::test]
async fn test_run_batch_withInvalidUnitConfig_shouldFailOnlyThatUnit() {
    let dir = common::create_temp_dir().unwrap();
    let broken = common::create_unit(dir.path(), "video_1", 2, ENGLISH_SCRIPT).unwrap();
    common::create_test_file(&broken.root, "config.json", r#"{"subtitle_preset": "comic_sans"}"#).unwrap();
    common::create_unit(dir.path(), "video_2", 2, ENGLISH_SCRIPT).unwrap();
    let mut controller = controller(Arc::new(MockModelLoader::new()));

    let report = controller.run_batch(dir.path(), |_, _| {}).await.unwrap();

    assert!(!report.outcomes[0].success);
    assert!(report.outcomes[0].reason.as_deref().unwrap().starts_with("Configuration error"));
    assert!(report.outcomes[1].success);
}

#[tokio::test]
async fn test_run_batch_shouldReportUnitProgressAndCountUnits() {
    let dir = common::create_temp_dir().unwrap();
    common::create_unit(dir.path(), "video_1", 1, ENGLISH_SCRIPT).unwrap();
    common::create_unit(dir.path(), "video_2", 1, ENGLISH_SCRIPT).unwrap();
    let mut controller = controller(Arc::new(MockModelLoader::new()));
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let recorder = ticks.clone();

    controller.run_batch(dir.path(), move |done, total| recorder.lock().unwrap().push((done, total))).await.unwrap();

    assert_eq!(*ticks.lock().unwrap(), vec![(1, 2), (2, 2)]);
    assert_eq!(controller.unit_counter(), 2);
}

#[test]
fn test_run_batch_withoutUnits_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    fs::create_dir_all(dir.path().join("misc")).unwrap();
    let mut controller = controller(Arc::new(MockModelLoader::new()));

    let result = tokio_test::block_on(async { controller.run_batch(dir.path(), |_, _| {}).await });

    assert!(result.is_err());
    assert!(!dir.path().join(BATCH_LOG_FILE).exists());
}
