/*!
 * Slideshow construction.
 *
 * - `planner`: slide count, per-slide frames, image selection and effect draws
 * - `preprocess`: parallel resize/blur of the selected images
 * - `renderer`: motion-animated frames streamed to the encoder
 */

pub mod planner;
pub mod preprocess;
pub mod renderer;

pub use planner::{SlideEntry, SlidePlan, SlidePlanner, distribute_frames};
pub use preprocess::{ImagePreprocessor, PreparedImages};
pub use renderer::FrameRenderer;
