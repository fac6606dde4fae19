use anyhow::{Context, Result, anyhow};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: Unit folder layout and file discovery

/// Supported slide image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "tif", "tiff", "gif"];

/// Supported bookend and webcam clip extensions
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "m4v", "flv", "webm", "ogv", "3gp"];

/// Caption files that can be burned without transcription
pub const CAPTION_EXTENSIONS: &[&str] = &["ass", "srt", "vtt"];

static UNIT_DIR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^video_(\d+)$").unwrap());

// @struct: Paths of one video unit folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLayout {
    pub root: PathBuf,
    pub images: PathBuf,
    pub text: PathBuf,
    pub voice: PathBuf,
    pub subtitles: PathBuf,
    pub slideshow: PathBuf,
    pub output: PathBuf,
    pub intro: PathBuf,
    pub outro: PathBuf,
    pub webcam: PathBuf,
}

impl UnitLayout {
    // @creates: Layout rooted at a unit folder
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            images: root.join("img"),
            text: root.join("text"),
            voice: root.join("voice"),
            subtitles: root.join("subtitles"),
            slideshow: root.join("slideshow"),
            output: root.join("output"),
            intro: root.join("intro"),
            outro: root.join("outro"),
            webcam: root.join("auth"),
            root,
        }
    }

    /// Folder name, used to name artifacts
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unit".to_string())
    }

    pub fn folders(&self) -> [&Path; 9] {
        [
            &self.images,
            &self.text,
            &self.voice,
            &self.subtitles,
            &self.slideshow,
            &self.output,
            &self.intro,
            &self.outro,
            &self.webcam,
        ]
    }

    // @creates: Every folder of the contract
    pub fn init(&self) -> Result<()> {
        for folder in self.folders() {
            FileManager::ensure_dir(folder)?;
        }
        Ok(())
    }

    /// Folders whose output is recreated on every run
    pub fn ensure_output_dirs(&self) -> Result<()> {
        for folder in [&self.voice, &self.subtitles, &self.slideshow, &self.output] {
            FileManager::ensure_dir(folder)?;
        }
        Ok(())
    }

    pub fn voice_file(&self) -> PathBuf {
        self.voice.join(format!("{}_voice.mp3", self.name()))
    }

    pub fn slideshow_file(&self) -> PathBuf {
        self.slideshow.join(format!("{}_slideshow.mp4", self.name()))
    }

    pub fn caption_file(&self) -> PathBuf {
        self.subtitles.join(format!("{}_captions.ass", self.name()))
    }

    pub fn final_file(&self) -> PathBuf {
        self.output.join(format!("{}_final.mp4", self.name()))
    }

    /// Slide images, sorted by name
    pub fn images(&self) -> Result<Vec<PathBuf>> {
        FileManager::find_files_with_extensions(&self.images, IMAGE_EXTENSIONS, false)
    }

    /// Script files, sorted by name
    pub fn script_files(&self) -> Result<Vec<PathBuf>> {
        FileManager::find_files_with_extensions(&self.text, &["txt"], false)
    }

    /// Script text: every `.txt` file joined by blank lines
    pub fn script_text(&self) -> Result<String> {
        let files = self.script_files()?;
        if files.is_empty() {
            return Err(anyhow!("No script found in {:?}", self.text));
        }
        let mut parts = Vec::with_capacity(files.len());
        for file in files {
            let content = FileManager::read_to_string(&file)?;
            if !content.trim().is_empty() {
                parts.push(content.trim().to_string());
            }
        }
        Ok(parts.join("\n\n"))
    }

    /// Existing caption files, sorted by name
    pub fn caption_files(&self) -> Result<Vec<PathBuf>> {
        let generated = self.caption_file();
        Ok(FileManager::find_files_with_extensions(&self.subtitles, CAPTION_EXTENSIONS, false)?
            .into_iter()
            .filter(|p| p != &generated)
            .collect())
    }

    pub fn intro_clip(&self) -> Result<Option<PathBuf>> {
        FileManager::first_video(&self.intro)
    }

    pub fn outro_clip(&self) -> Result<Option<PathBuf>> {
        FileManager::first_video(&self.outro)
    }

    pub fn webcam_clip(&self) -> Result<Option<PathBuf>> {
        FileManager::first_video(&self.webcam)
    }
}

/// Number of a `video_<N>` folder name
pub fn unit_number(name: &str) -> Option<u64> {
    UNIT_DIR_PATTERN.captures(name).and_then(|c| c[1].parse().ok())
}

/// `video_<N>` folders directly under `root`, in numeric order
pub fn discover_units<P: AsRef<Path>>(root: P) -> Result<Vec<UnitLayout>> {
    let root = root.as_ref();
    if !FileManager::dir_exists(root) {
        return Err(anyhow!("Root directory does not exist: {:?}", root));
    }

    let mut units = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.context("Failed to read directory entry")?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(number) = unit_number(&entry.file_name().to_string_lossy()) {
            units.push((number, entry.path().to_path_buf()));
        }
    }
    units.sort();
    Ok(units.into_iter().map(|(_, path)| UnitLayout::new(path)).collect())
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Files in `dir` with one of `extensions` (case-insensitive), sorted by path.
    ///
    /// A missing directory yields an empty list.
    pub fn find_files_with_extensions<P: AsRef<Path>>(dir: P, extensions: &[&str], recursive: bool) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut walker = WalkDir::new(dir).follow_links(true).min_depth(1);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut result = Vec::new();
        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy();
                    extensions.iter().any(|wanted| ext.eq_ignore_ascii_case(wanted))
                })
                .unwrap_or(false);
            if matches {
                result.push(path.to_path_buf());
            }
        }
        result.sort();
        Ok(result)
    }

    // @returns: First video clip of a folder, by name
    pub fn first_video<P: AsRef<Path>>(dir: P) -> Result<Option<PathBuf>> {
        Ok(Self::find_files_with_extensions(dir, VIDEO_EXTENSIONS, false)?.into_iter().next())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Remove a file if it exists
    pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            fs::remove_file(path).with_context(|| format!("Failed to remove file: {:?}", path))?;
        }
        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
