use std::collections::HashSet;
use std::fmt;

use anyhow::{Result, anyhow};
use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Language utilities for script and transcript text
///
/// This module provides the closed set of narration languages and the
/// lexical classifier used to pick voices and force the transcription engine.

/// Number of characters inspected by the detector
pub const SAMPLE_CHARS: usize = 500;

/// Lexicon fraction above which a sample is classified as Spanish
const LEXICON_THRESHOLD: f64 = 0.15;

/// Suffix fraction above which a sample is classified as Spanish
const SUFFIX_THRESHOLD: f64 = 0.05;

/// Narration language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English, the base language
    #[default]
    #[serde(alias = "en")]
    English,
    /// Spanish
    #[serde(alias = "es")]
    Spanish,
}

impl Language {
    /// All supported languages
    pub const ALL: [Language; 2] = [Language::English, Language::Spanish];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
        }
    }

    /// Parse an ISO 639-1 or 639-3 code
    pub fn from_code(code: &str) -> Result<Self> {
        let normalized = code.trim().to_lowercase();
        let iso = match normalized.len() {
            2 => isolang::Language::from_639_1(&normalized),
            3 => isolang::Language::from_639_3(&normalized),
            _ => None,
        };

        match iso.and_then(|lang| lang.to_639_1()) {
            Some("en") => Ok(Language::English),
            Some("es") => Ok(Language::Spanish),
            Some(other) => Err(anyhow!("Unsupported narration language: {}", other)),
            None => Err(anyhow!("Invalid language code: {}", code)),
        }
    }

    /// English name of the language
    pub fn name(&self) -> &'static str {
        isolang::Language::from_639_1(self.code())
            .map(|lang| lang.to_name())
            .unwrap_or(self.code())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Curated lexical markers of a language
pub struct LanguageProfile {
    /// Language the markers identify
    pub language: Language,
    /// Characters that identify the language on their own
    pub marker_chars: &'static [char],
    /// Common words
    pub lexicon: HashSet<&'static str>,
    /// Typical morphological endings
    pub suffixes: &'static [&'static str],
}

static SPANISH_PROFILE: Lazy<LanguageProfile> = Lazy::new(|| LanguageProfile {
    language: Language::Spanish,
    marker_chars: &['ñ', 'á', 'é', 'í', 'ó', 'ú', 'ü', '¿', '¡', 'ç'],
    lexicon: [
        "el", "la", "los", "las", "de", "del", "que", "y", "es", "en", "un", "una", "se", "no",
        "con", "por", "para", "su", "sus", "te", "le", "lo", "me", "nos", "como", "más", "muy",
        "todo", "todos", "toda", "todas", "este", "esta", "estos", "estas", "ese", "esa", "esos",
        "esas", "aquel", "aquella", "aquellos", "aquellas", "pero", "si", "sí", "también", "cuando",
        "donde", "dónde", "cómo", "qué", "quién", "cuál", "cuánto", "tiempo", "año", "día", "casa",
        "hacer", "ser", "estar", "tener", "haber", "poder", "decir", "ir", "ver", "dar", "saber",
        "querer", "llegar", "pasar", "deber", "poner", "parecer", "quedar", "creer", "hablar",
        "llevar", "dejar", "seguir", "encontrar", "llamar", "venir", "pensar", "salir", "volver",
        "tomar", "conocer", "vivir", "sentir", "tratar", "mirar", "contar", "empezar", "esperar",
    ]
    .into_iter()
    .collect(),
    suffixes: &["ción", "sión", "dad", "tad", "mente", "ando", "iendo", "ado", "ido"],
});

/// Take the case-folded detection sample of a text
pub fn detection_sample(text: &str) -> String {
    text.chars().take(SAMPLE_CHARS).collect::<String>().to_lowercase()
}

/// Split a sample into whitespace-separated tokens; punctuation stays attached
fn tokenize(sample: &str) -> Vec<&str> {
    sample.split_whitespace().collect()
}

/// Lexical scores of a sample against a profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalScore {
    /// A marker character was found
    pub has_marker: bool,
    /// Fraction of tokens found in the lexicon
    pub lexicon_fraction: f64,
    /// Fraction of tokens carrying a typical ending
    pub suffix_fraction: f64,
}

impl LanguageProfile {
    /// Score a case-folded sample
    pub fn score(&self, sample: &str) -> LexicalScore {
        let has_marker = sample.chars().any(|c| self.marker_chars.contains(&c));
        let tokens = tokenize(sample);
        if tokens.is_empty() {
            return LexicalScore { has_marker, lexicon_fraction: 0.0, suffix_fraction: 0.0 };
        }

        let total = tokens.len() as f64;
        let in_lexicon = tokens.iter().filter(|t| self.lexicon.contains(*t)).count();
        let with_suffix = tokens
            .iter()
            .filter(|t| self.suffixes.iter().any(|suffix| t.ends_with(suffix)))
            .count();

        LexicalScore {
            has_marker,
            lexicon_fraction: in_lexicon as f64 / total,
            suffix_fraction: with_suffix as f64 / total,
        }
    }

    /// Whether the score classifies the sample as this profile's language
    pub fn matches(&self, score: &LexicalScore) -> bool {
        score.has_marker || score.lexicon_fraction > LEXICON_THRESHOLD || score.suffix_fraction > SUFFIX_THRESHOLD
    }
}

/// Classify a text as one of the supported languages.
///
/// Only the first 500 characters are inspected. Marker characters win
/// outright, then the lexicon fraction, then the suffix fraction; anything
/// else (including empty text) is the base language.
pub fn detect_language(text: &str) -> Language {
    let sample = detection_sample(text);
    if sample.trim().is_empty() {
        return Language::English;
    }

    let profile = &*SPANISH_PROFILE;
    let score = profile.score(&sample);
    if profile.matches(&score) {
        debug!(
            "Detected {} (marker: {}, lexicon: {:.2}, suffix: {:.2})",
            profile.language, score.has_marker, score.lexicon_fraction, score.suffix_fraction
        );
        return profile.language;
    }

    Language::English
}

/// Stateless detector handle, for collaborators that want an object
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageDetector;

impl LanguageDetector {
    /// Create a detector
    pub fn new() -> Self {
        Self
    }

    /// Classify a text
    pub fn detect(&self, text: &str) -> Language {
        detect_language(text)
    }
}
