/*!
 * Tests for caption source, preset and transition selection
 */

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::sync::Arc;

use slidecast::app_config::{TransitionPreset, UnitConfig};
use slidecast::app_controller::{CaptionSource, Controller};
use slidecast::file_utils::UnitLayout;
use slidecast::subtitle_styler::{CaptionPosition, CaptionPresetKey};

use crate::common::{self, MockEncodeTool, MockModelLoader, MockSynthesizer};

fn controller() -> Controller {
    let collaborators = common::collaborators(
        Arc::new(MockSynthesizer::new()),
        Arc::new(MockModelLoader::new()),
        Arc::new(MockEncodeTool::new(5.0)),
    );
    Controller::with_config(common::test_config(), collaborators).unwrap()
}

fn fixed_unit() -> UnitConfig {
    UnitConfig {
        subtitle_preset: Some(CaptionPresetKey::NeonCyan),
        subtitle_position: Some(CaptionPosition::Bottom),
        randomize_captions: true,
        ..UnitConfig::default()
    }
}

fn generated_presets(controller: &Controller, layout: &UnitLayout, unit: &UnitConfig) -> HashSet<CaptionPresetKey> {
    (0..64)
        .filter_map(|seed| match controller.choose_captions(layout, unit, &mut StdRng::seed_from_u64(seed)).unwrap() {
            CaptionSource::Generated { preset, .. } => Some(preset),
            CaptionSource::Existing(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn test_choose_captions_withExistingFile_shouldSkipGeneration() {
    let dir = common::create_temp_dir().unwrap();
    let layout = UnitLayout::new(dir.path().join("video_1"));
    let manual = common::create_test_file(&layout.subtitles, "manual.srt", "1\n00:00:00,000 --> 00:00:01,000\nhi\n").unwrap();

    let source = controller().choose_captions(&layout, &fixed_unit(), &mut StdRng::seed_from_u64(1)).unwrap();

    assert_eq!(source, CaptionSource::Existing(manual));
}

#[tokio::test]
async fn test_choose_captions_forFirstUnit_shouldKeepConfiguredPreset() {
    let dir = common::create_temp_dir().unwrap();
    let layout = UnitLayout::new(dir.path().join("video_1"));
    let controller = controller();

    let presets = generated_presets(&controller, &layout, &fixed_unit());

    assert_eq!(presets, HashSet::from([CaptionPresetKey::NeonCyan]));
}

#[tokio::test]
async fn test_choose_captions_afterFirstUnit_shouldDrawRandomPresets() {
    let dir = common::create_temp_dir().unwrap();
    let layout = UnitLayout::new(dir.path().join("video_1"));
    let mut controller = controller();
    // Two units that fail on missing inputs still advance the counter
    controller.run_unit(&dir.path().join("video_8")).await;
    controller.run_unit(&dir.path().join("video_9")).await;
    assert_eq!(controller.unit_counter(), 2);

    assert!(generated_presets(&controller, &layout, &fixed_unit()).len() > 1);

    let steady = UnitConfig { randomize_captions: false, ..fixed_unit() };
    assert_eq!(generated_presets(&controller, &layout, &steady), HashSet::from([CaptionPresetKey::NeonCyan]));
}

#[tokio::test]
async fn test_choose_captions_withUnsetPreset_shouldDrawEvenForFirstUnit() {
    let dir = common::create_temp_dir().unwrap();
    let layout = UnitLayout::new(dir.path().join("video_1"));
    let unit = UnitConfig { subtitle_preset: None, ..fixed_unit() };

    assert!(generated_presets(&controller(), &layout, &unit).len() > 1);
}

#[tokio::test]
async fn test_choose_captions_withSameSeed_shouldBeReproducible() {
    let dir = common::create_temp_dir().unwrap();
    let layout = UnitLayout::new(dir.path().join("video_1"));
    let unit = UnitConfig { subtitle_preset: None, subtitle_position: None, ..fixed_unit() };
    let controller = controller();

    let first = controller.choose_captions(&layout, &unit, &mut StdRng::seed_from_u64(99)).unwrap();
    let second = controller.choose_captions(&layout, &unit, &mut StdRng::seed_from_u64(99)).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_choose_transition_shouldHonorRandomFlag() {
    let controller = controller();
    let fixed = UnitConfig { random_transitions: false, transition_preset: TransitionPreset::WipeLeft, ..UnitConfig::default() };
    assert_eq!(controller.choose_transition(&fixed, &mut StdRng::seed_from_u64(3)), TransitionPreset::WipeLeft);

    let random = UnitConfig { random_transitions: true, ..fixed };
    let drawn: HashSet<TransitionPreset> =
        (0..64).map(|seed| controller.choose_transition(&random, &mut StdRng::seed_from_u64(seed))).collect();
    assert!(drawn.len() > 1);
}
