//! facematchd: HTTP face verification service.
//!
//! Downloads a captured photo and a reference photo, encodes their faces
//! with facematch-core on a dedicated inference thread, and reports whether
//! the first face of each belongs to the same person.

pub mod config;
pub mod cors;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod source;
pub mod startup;
pub mod state;

pub use config::Config;
pub use engine::{spawn_engine, EngineError, EngineHandle, FaceEncoder};
pub use error::AppError;
pub use source::{FetchError, HttpImageSource, ImageSource};
pub use startup::build_router;
pub use state::AppState;
