/*!
 * Caption styling.
 *
 * Turns word-timed transcript segments into Advanced SubStation Alpha
 * captions: words are grouped into short cues, shifted by a global offset,
 * clamped to valid times and decorated with inline override tags chosen by
 * the caption preset. Styling depends only on the word index and preset.
 */

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::transcription::{TranscriptSegment, WordSpan};

/// Colors cycled by the rainbow rule
const RAINBOW_COLORS: [&str; 5] = ["&H00FFFF&", "&HFF00FF&", "&H0080FF&", "&H00FF80&", "&H8000FF&"];

/// Caption visual preset
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPresetKey {
    ClassicWhite,
    PoppinsExtraBold,
    MontserratBlack,
    OpensansExtrabold,
    RobotoBlack,
    InterExtrabold,
    NeonCyan,
    GoldenLuxury,
    FireRed,
    MatrixGreen,
    RoyalPurple,
    OceanBlue,
    SunsetOrange,
    PinkPop,
    SilverShine,
    RainbowGradient,
    MinimalBlack,
}

/// How words inside a cue are decorated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleRule {
    /// Five-color cycle
    CyclicPalette,
    /// Primary with blur on even words, secondary on odd
    AlternatingBlur,
    /// Every third word in primary at 120% scale
    EveryThirdAccent,
    /// Bold primary on even words, regular secondary on odd
    AlternatingBold,
    /// Primary on even words, secondary on odd
    Alternating,
}

/// Font, colors and styling rule of a preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionStyle {
    pub display_name: &'static str,
    pub font: &'static str,
    pub size: u32,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub outline: u32,
    pub shadow: u32,
    pub rule: StyleRule,
}

impl CaptionPresetKey {
    pub const ALL: [CaptionPresetKey; 17] = [
        Self::ClassicWhite,
        Self::PoppinsExtraBold,
        Self::MontserratBlack,
        Self::OpensansExtrabold,
        Self::RobotoBlack,
        Self::InterExtrabold,
        Self::NeonCyan,
        Self::GoldenLuxury,
        Self::FireRed,
        Self::MatrixGreen,
        Self::RoyalPurple,
        Self::OceanBlue,
        Self::SunsetOrange,
        Self::PinkPop,
        Self::SilverShine,
        Self::RainbowGradient,
        Self::MinimalBlack,
    ];

    pub fn style(&self) -> CaptionStyle {
        use StyleRule::*;
        let (display_name, font, size, primary, secondary, outline, shadow, rule) = match self {
            Self::ClassicWhite => ("Classic White", "Arial Black", 28, "&HFFFFFF&", "&HE0E0E0&", 3, 2, Alternating),
            Self::PoppinsExtraBold => {
                ("Poppins Extra Bold", "Poppins ExtraBold", 32, "&HFFFFFF&", "&HF0F0F0&", 4, 2, AlternatingBold)
            }
            Self::MontserratBlack => {
                ("Montserrat Black", "Montserrat Black", 30, "&HFFFFFF&", "&HE0E0E0&", 3, 2, AlternatingBold)
            }
            Self::OpensansExtrabold => {
                ("Open Sans Extra Bold", "Open Sans ExtraBold", 29, "&HFFFFFF&", "&HF5F5F5&", 3, 2, Alternating)
            }
            Self::RobotoBlack => ("Roboto Black", "Roboto Black", 30, "&HFFFFFF&", "&HE8E8E8&", 3, 2, AlternatingBold),
            Self::InterExtrabold => {
                ("Inter Extra Bold", "Inter ExtraBold", 28, "&HFFFFFF&", "&HEEEEEE&", 3, 2, Alternating)
            }
            Self::NeonCyan => ("Neon Cyan", "Poppins ExtraBold", 30, "&H00FFFF&", "&H0080FF&", 4, 3, AlternatingBlur),
            Self::GoldenLuxury => {
                ("Golden Luxury", "Montserrat Black", 32, "&H00D4AF37&", "&H00FFD700&", 3, 2, Alternating)
            }
            Self::FireRed => ("Fire Red", "Roboto Black", 30, "&H0000FF&", "&H0080FF&", 4, 3, AlternatingBlur),
            Self::MatrixGreen => ("Matrix Green", "Courier New", 28, "&H00FF00&", "&H80FF80&", 3, 2, EveryThirdAccent),
            Self::RoyalPurple => ("Royal Purple", "Inter ExtraBold", 30, "&H800080&", "&HA020F0&", 3, 2, Alternating),
            Self::OceanBlue => ("Ocean Blue", "Open Sans ExtraBold", 29, "&HFF8000&", "&HFF4000&", 3, 2, Alternating),
            Self::SunsetOrange => {
                ("Sunset Orange", "Poppins ExtraBold", 31, "&H0080FF&", "&H00A5FF&", 4, 3, Alternating)
            }
            Self::PinkPop => ("Pink Pop", "Montserrat Black", 30, "&HFF1493&", "&HFF69B4&", 3, 2, Alternating),
            Self::SilverShine => ("Silver Shine", "Roboto Black", 28, "&HC0C0C0&", "&HBEBEBE&", 3, 2, Alternating),
            Self::RainbowGradient => {
                ("Rainbow Gradient", "Inter ExtraBold", 32, "&H00FFFF&", "&HFF00FF&", 4, 3, CyclicPalette)
            }
            Self::MinimalBlack => {
                ("Minimal Black", "Open Sans ExtraBold", 26, "&H000000&", "&H404040&", 2, 1, Alternating)
            }
        };
        CaptionStyle { display_name, font, size, primary, secondary, outline, shadow, rule }
    }
}

/// Vertical placement of captions
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPosition {
    Center,
    Bottom,
}

impl CaptionPosition {
    pub const ALL: [CaptionPosition; 2] = [Self::Center, Self::Bottom];

    /// ASS numpad alignment
    pub fn alignment(&self) -> u32 {
        match self {
            Self::Center => 5,
            Self::Bottom => 2,
        }
    }

    pub fn margin_v(&self) -> u32 {
        match self {
            Self::Center => 0,
            Self::Bottom => 60,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Center => "Center",
            Self::Bottom => "Bottom with Margin",
        }
    }
}

/// One timed caption line
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCue {
    pub start: f64,
    pub end: f64,
    /// Text with inline override tags
    pub text: String,
}

/// A complete caption artifact
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionDocument {
    pub preset: CaptionPresetKey,
    pub position: CaptionPosition,
    pub cues: Vec<CaptionCue>,
}

/// Format seconds as `H:MM:SS.CC`
pub fn format_ass_time(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = centis / 360_000;
    let minutes = (centis % 360_000) / 6000;
    let secs = (centis % 6000) / 100;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis % 100)
}

impl CaptionDocument {
    /// Render the document as ASS text
    pub fn to_ass(&self) -> String {
        let style = self.preset.style();
        let mut out = String::new();

        let _ = writeln!(out, "[Script Info]");
        let _ = writeln!(out, "Title: {} ({})", style.display_name, self.position.display_name());
        let _ = writeln!(out, "ScriptType: v4.00+");
        let _ = writeln!(out);
        let _ = writeln!(out, "[V4+ Styles]");
        let _ = writeln!(
            out,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
        );
        let _ = writeln!(
            out,
            "Style: Default,{},{},{},{},&H000000,&H80000000,1,0,0,0,100,100,0,0,1,{},{},{},10,10,{},1",
            style.font,
            style.size,
            style.primary,
            style.secondary,
            style.outline,
            style.shadow,
            self.position.alignment(),
            self.position.margin_v()
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "[Events]");
        let _ = writeln!(out, "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text");
        let _ = writeln!(out);

        for cue in &self.cues {
            let _ = writeln!(
                out,
                "Dialogue: 0,{},{},Default,,0,0,0,,{}",
                format_ass_time(cue.start),
                format_ass_time(cue.end),
                cue.text
            );
        }
        out
    }

    /// Write the ASS file
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ass()).with_context(|| format!("Failed to write captions: {:?}", path))
    }
}

/// Decorate one word according to the rule and its index within the cue
fn style_word(word: &str, index: usize, style: &CaptionStyle) -> String {
    match style.rule {
        StyleRule::CyclicPalette => format!("{{\\c{}}}{}{{\\r}}", RAINBOW_COLORS[index % RAINBOW_COLORS.len()], word),
        StyleRule::AlternatingBlur if index % 2 == 0 => format!("{{\\c{}\\blur2}}{}{{\\r}}", style.primary, word),
        StyleRule::EveryThirdAccent if index % 3 == 0 => {
            format!("{{\\c{}\\fscx120\\fscy120}}{}{{\\r}}", style.primary, word)
        }
        StyleRule::AlternatingBold if index % 2 == 0 => format!("{{\\c{}\\b1}}{}{{\\r}}", style.primary, word),
        StyleRule::AlternatingBold => format!("{{\\c{}\\b0}}{}{{\\r}}", style.secondary, word),
        StyleRule::Alternating if index % 2 == 0 => format!("{{\\c{}}}{}{{\\r}}", style.primary, word),
        _ => format!("{{\\c{}}}{}{{\\r}}", style.secondary, word),
    }
}

/// Groups timed words into styled cues
#[derive(Debug, Clone, Copy)]
pub struct SubtitleStyler {
    words_per_cue: usize,
    min_cue_duration: f64,
    offset: f64,
}

impl SubtitleStyler {
    pub fn new(words_per_cue: usize, min_cue_duration: f64, offset: f64) -> Self {
        Self { words_per_cue: words_per_cue.max(1), min_cue_duration, offset }
    }

    /// Styled text of one cue. Words keep their position in the cue for
    /// styling even when blank neighbors are dropped.
    pub fn style_text(&self, words: &[WordSpan], style: &CaptionStyle) -> String {
        words
            .iter()
            .map(|w| w.word.trim().to_uppercase())
            .enumerate()
            .filter(|(_, word)| !word.is_empty())
            .map(|(i, word)| style_word(&word, i, style))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the caption document for a transcript
    pub fn style(&self, segments: &[TranscriptSegment], preset: CaptionPresetKey, position: CaptionPosition) -> CaptionDocument {
        let style = preset.style();
        let mut cues = Vec::new();

        for segment in segments {
            for group in segment.words.chunks(self.words_per_cue) {
                let text = self.style_text(group, &style);
                if text.is_empty() {
                    continue;
                }

                let (first, last) = (&group[0], &group[group.len() - 1]);
                let start = (first.start + self.offset).max(0.0);
                let end = (last.end + self.offset).max(start + self.min_cue_duration);
                cues.push(CaptionCue { start, end, text });
            }
        }

        CaptionDocument { preset, position, cues }
    }
}
