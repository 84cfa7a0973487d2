//! Decode → detect → encode pipeline for a single image.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, Embedding};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

/// SCRFD detection model file name inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
/// ArcFace recognition model file name inside the model directory.
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Decode an encoded image (JPEG, PNG, WebP, ...) into an RGB buffer.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Detector and recognizer loaded together.
///
/// Inference is blocking and needs `&mut self`; callers own one pipeline per
/// thread.
pub struct FacePipeline {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl FacePipeline {
    /// Load both models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, PipelineError> {
        let scrfd = model_dir.join(SCRFD_MODEL_FILE);
        let arcface = model_dir.join(ARCFACE_MODEL_FILE);

        let detector = FaceDetector::load(&scrfd.to_string_lossy())?;
        let recognizer = FaceRecognizer::load(&arcface.to_string_lossy())?;

        Ok(Self { detector, recognizer })
    }

    /// Detect faces, most confident first.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, PipelineError> {
        Ok(self.detector.detect(image)?)
    }

    /// Compute one embedding per detected face, in detection order.
    ///
    /// An image without faces yields an empty list, not an error.
    pub fn encode(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, PipelineError> {
        let faces = self.detector.detect(image)?;

        let mut embeddings = Vec::with_capacity(faces.len());
        for face in faces.iter().filter(|f| f.landmarks.is_some()) {
            embeddings.push(self.recognizer.extract(image, face)?);
        }

        if embeddings.len() < faces.len() {
            tracing::warn!(
                detected = faces.len(),
                encoded = embeddings.len(),
                "skipped faces without landmarks"
            );
        }

        Ok(embeddings)
    }

    /// Decode `bytes` and encode every face in the result.
    pub fn encode_bytes(&mut self, bytes: &[u8]) -> Result<Vec<Embedding>, PipelineError> {
        let image = decode_image(bytes)?;
        tracing::debug!(width = image.width(), height = image.height(), "decoded image");
        self.encode(&image)
    }
}
