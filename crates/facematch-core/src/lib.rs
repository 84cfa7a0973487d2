//! facematch-core: face detection and recognition engine.
//!
//! Uses SCRFD for face detection and ArcFace for face recognition,
//! both running via ONNX Runtime for CPU inference.

pub mod alignment;
pub mod detector;
pub mod pipeline;
pub mod recognizer;
pub mod types;

use std::path::PathBuf;

pub use detector::FaceDetector;
pub use pipeline::{decode_image, FacePipeline, PipelineError};
pub use recognizer::FaceRecognizer;
pub use types::{
    compare_first_faces, BoundingBox, CosineMatcher, Embedding, MatchResult, Matcher,
    DEFAULT_SIMILARITY_THRESHOLD,
};

/// Directory holding the ONNX model files.
///
/// `$FACEMATCH_MODEL_DIR`, else `$XDG_DATA_HOME/facematch/models`,
/// else `$HOME/.local/share/facematch/models`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FACEMATCH_MODEL_DIR") {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facematch/models")
}
