use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 0.0.0.0:5000).
    pub bind_addr: SocketAddr,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Cosine similarity threshold for a positive match.
    pub similarity_threshold: f32,
    /// Timeout in seconds for each image download.
    pub fetch_timeout_secs: u64,
    /// Largest image body accepted from a URL.
    pub max_image_bytes: usize,
    /// Origins allowed by CORS; `*` allows any.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from `FACEMATCH_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = parsed(&lookup, "FACEMATCH_BIND_ADDR")
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)));

        let model_dir = lookup("FACEMATCH_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(facematch_core::default_model_dir);

        let cors_allowed_origins = lookup("FACEMATCH_CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        Self {
            bind_addr,
            model_dir,
            similarity_threshold: parsed(&lookup, "FACEMATCH_SIMILARITY_THRESHOLD")
                .unwrap_or(facematch_core::DEFAULT_SIMILARITY_THRESHOLD),
            fetch_timeout_secs: parsed(&lookup, "FACEMATCH_FETCH_TIMEOUT_SECS").unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            max_image_bytes: parsed(&lookup, "FACEMATCH_MAX_IMAGE_BYTES").unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
            cors_allowed_origins,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
