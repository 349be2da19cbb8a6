//! Vision module
//!
//! Object detection over captured frames and diagnostic rendering of the
//! results.

pub mod detector;
pub mod overlay;

pub use detector::{first_of_class, has_class, nearest_to, Detection, YoloDetector};
pub use overlay::Overlay;

/// Vision system errors.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("unsupported model format: {0}")]
    UnsupportedModel(String),
    #[error("model not loaded")]
    ModelNotLoaded,
    #[error("model inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    BadOutput(String),
    #[error("failed to load overlay font: {0}")]
    FontLoad(String),
}
