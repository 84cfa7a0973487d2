use std::sync::Arc;

use crate::engine::FaceEncoder;
use crate::source::ImageSource;

/// Shared, immutable per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub images: Arc<dyn ImageSource>,
    pub encoder: Arc<dyn FaceEncoder>,
    pub similarity_threshold: f32,
}

impl AppState {
    pub fn new(
        images: Arc<dyn ImageSource>,
        encoder: Arc<dyn FaceEncoder>,
        similarity_threshold: f32,
    ) -> Self {
        Self { images, encoder, similarity_threshold }
    }
}
