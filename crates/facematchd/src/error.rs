use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::engine::EngineError;
use crate::source::FetchError;

pub const NO_FACE_MESSAGE: &str = "No face found in one of the images";

/// Which of the two request images an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Captured,
    Reference,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Captured => f.write_str("captured"),
            ImageRole::Reference => f.write_str("reference"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Either image has zero detected faces. The only client-side error.
    #[error("No face found in one of the images")]
    NoFaceFound,
    #[error("cannot read request body: {0}")]
    UnreadableBody(#[from] BytesRejection),
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{role} image: {source}")]
    Encode {
        role: ImageRole,
        #[source]
        source: EngineError,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoFaceFound => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    matched: Option<bool>,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::NoFaceFound => {
                tracing::warn!("match rejected: no face found");
                ErrorBody { matched: Some(false), error: NO_FACE_MESSAGE.to_string() }
            }
            other => {
                tracing::error!(error = %other, "match failed");
                ErrorBody { matched: None, error: other.to_string() }
            }
        };
        (status, Json(body)).into_response()
    }
}
