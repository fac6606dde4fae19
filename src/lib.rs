/*!
 * # slidecast - narrated slideshow videos from images and a script
 *
 * Turns a folder of images and a text script into a finished video:
 * the script is spoken by a neural voice, the images are animated with
 * camera-like motion, the narration is transcribed back into word-timed
 * captions, and optional intro/outro/webcam clips are stitched around it.
 *
 * ## Features
 *
 * - English/Spanish language detection per text chunk, with voice switching
 * - Chunked speech synthesis with retry, backoff and output validation
 * - 19 deterministic motion effects rendered frame by frame
 * - Slide planning that only duplicates images when there are too few
 * - Forced-language transcription with one corrective pass
 * - 17 caption presets written as Advanced SubStation Alpha
 * - Batch processing of `video_<N>` folders with per-unit failure isolation
 *
 * ## Architecture
 *
 * - `app_config`: Configuration files and preset tables
 * - `language_utils`: Lexical language detection
 * - `text_chunker`: Sentence-aware text splitting
 * - `retry`: Generic retry policy with exponential backoff
 * - `speech`: Speech synthesis stage and narration assembly
 * - `motion`: Motion effect curves and frame warping
 * - `slideshow`: Slide planning, image preprocessing and frame rendering
 * - `transcription`: Per-unit transcription with language checks
 * - `subtitle_styler`: Word-timed caption styling
 * - `media`: The external encode tool and media operations
 * - `progress`: Stage-level progress tracking
 * - `file_utils`: Unit folder layout and file discovery
 * - `app_controller`: Per-unit pipeline and batch runner
 * - `errors`: Custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod motion;
pub mod progress;
pub mod retry;
pub mod slideshow;
pub mod speech;
pub mod subtitle_styler;
pub mod text_chunker;
pub mod transcription;

pub use app_config::{Config, UnitConfig};
pub use app_controller::{BatchReport, Collaborators, Controller, UnitOutcome};
pub use errors::{MediaError, PipelineError, SynthesisError, TranscriptionError};
pub use language_utils::{Language, detect_language};
pub use motion::{MotionEffect, MotionEngine, MotionParameters};
