use axum::{body::Bytes, extract::{rejection::BytesRejection, State}, response::Json};
use facematch_core::compare_first_faces;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ImageRole};
use crate::state::AppState;

pub const LIVENESS_MESSAGE: &str = "Face Recognition Attendance API Running...";

/// Body of `POST /match-face`.
///
/// Fields are optional at the type level: a missing URL is reported as a
/// server-side failure, not a validation error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    /// Freshly captured photo.
    pub image_url: Option<String>,
    /// Stored reference photo.
    pub reference_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub matched: bool,
}

/// `GET /`
pub async fn index() -> &'static str {
    LIVENESS_MESSAGE
}

/// `POST /match-face`
///
/// Downloads both images, encodes every face in each, and compares the first
/// captured face against the first reference face.
pub async fn match_face(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<MatchResponse>, AppError> {
    let body = body?;
    let request: MatchRequest = serde_json::from_slice(&body)?;
    let image_url = request.image_url.ok_or(AppError::MissingField("imageUrl"))?;
    let reference_url = request.reference_url.ok_or(AppError::MissingField("referenceUrl"))?;

    let (captured, reference) = tokio::try_join!(
        state.images.fetch(&image_url),
        state.images.fetch(&reference_url)
    )?;

    let captured = state
        .encoder
        .encode(captured)
        .await
        .map_err(|source| AppError::Encode { role: ImageRole::Captured, source })?;
    let reference = state
        .encoder
        .encode(reference)
        .await
        .map_err(|source| AppError::Encode { role: ImageRole::Reference, source })?;

    tracing::debug!(captured = captured.len(), reference = reference.len(), "faces encoded");

    let result = compare_first_faces(&captured, &reference, state.similarity_threshold)
        .ok_or(AppError::NoFaceFound)?;

    // Both lists are non-empty once a result exists.
    let (probe, known) = (&captured[0], &reference[0]);
    tracing::info!(
        matched = result.matched,
        similarity = result.similarity,
        distance = probe.euclidean_distance(known),
        model = known.model_version.as_deref().unwrap_or("unknown"),
        "face match complete"
    );

    Ok(Json(MatchResponse { matched: result.matched }))
}
