/*!
 * Common test utilities for the slidecast test suite
 */

use anyhow::Result;
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use slidecast::app_config::Config;
use slidecast::app_controller::Collaborators;
use slidecast::file_utils::UnitLayout;

pub mod mock_collaborators;

pub use mock_collaborators::{MockEncodeTool, MockModelLoader, MockSynthesizer};

/// Routes library logs to the test output; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Debug).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a unit folder with `images` small PNGs and a script
pub fn create_unit(root: &Path, name: &str, images: usize, script: &str) -> Result<UnitLayout> {
    let layout = UnitLayout::new(root.join(name));
    layout.init()?;
    for i in 0..images {
        let shade = (i * 40 % 255) as u8;
        RgbImage::from_pixel(24, 18, Rgb([shade, 100, 200])).save(layout.images.join(format!("{:02}.png", i)))?;
    }
    create_test_file(&layout.text, "script.txt", script)?;
    Ok(layout)
}

/// Small, fast configuration for pipeline tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.render.width = 32;
    config.render.height = 18;
    config.render.fps = 2;
    config.render.max_workers = 2;
    config.synthesis.base_delay_ms = 0;
    config.synthesis.max_delay_ms = 0;
    config.synthesis.stabilization_pause_ms = 0;
    config.synthesis.min_audio_bytes = 100;
    config.seed = Some(7);
    config.unit_defaults.blur_radius = 0;
    config.unit_defaults.enable_webcam = false;
    config
}

/// Collaborators backed by the given mocks
pub fn collaborators(
    synthesizer: Arc<MockSynthesizer>,
    loader: Arc<MockModelLoader>,
    encoder: Arc<MockEncodeTool>,
) -> Collaborators {
    Collaborators { synthesizer, model_loader: loader, encoder }
}

pub const ENGLISH_SCRIPT: &str = "The river runs through the old town. People walk along the bridge every morning \
and the market opens with fresh bread and flowers.";

pub const SPANISH_SCRIPT: &str = "El río pasa por la ciudad antigua. La gente camina por el puente cada mañana \
y el mercado abre con pan y flores.";
