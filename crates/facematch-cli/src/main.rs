use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facematch_core::{compare_first_faces, decode_image, FacePipeline, DEFAULT_SIMILARITY_THRESHOLD};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SERVER: &str = "http://localhost:5000";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "facematch", about = "Face match CLI: offline compare, detection diagnostics, service client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two images locally (files or http(s) URLs)
    Compare {
        /// Freshly captured photo
        captured: String,
        /// Stored reference photo
        reference: String,
        /// Cosine similarity needed for a match
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,
        /// Directory containing det_10g.onnx and w600k_r50.onnx
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
    /// List the faces detected in an image
    Detect {
        image: String,
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
    /// Ask a running facematchd to compare two image URLs
    Remote {
        image_url: String,
        reference_url: String,
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Check that a facematchd instance is up
    Status {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
}

#[derive(Deserialize)]
struct RemoteReply {
    matched: Option<bool>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare { captured, reference, threshold, model_dir } => {
            let captured_bytes = read_image(&captured).await?;
            let reference_bytes = read_image(&reference).await?;

            let mut pipeline = load_pipeline(model_dir)?;
            let captured_faces = pipeline
                .encode_bytes(&captured_bytes)
                .with_context(|| format!("encoding {captured}"))?;
            let reference_faces = pipeline
                .encode_bytes(&reference_bytes)
                .with_context(|| format!("encoding {reference}"))?;

            tracing::info!(
                captured = captured_faces.len(),
                reference = reference_faces.len(),
                "faces encoded"
            );

            let Some(result) = compare_first_faces(&captured_faces, &reference_faces, threshold) else {
                bail!("No face found in one of the images");
            };
            println!("{}", json!({ "matched": result.matched, "similarity": result.similarity }));
        }
        Commands::Detect { image, model_dir } => {
            let bytes = read_image(&image).await?;
            let decoded = decode_image(&bytes).with_context(|| format!("decoding {image}"))?;
            let faces = load_pipeline(model_dir)?.detect(&decoded)?;
            println!("{}", serde_json::to_string_pretty(&faces)?);
        }
        Commands::Remote { image_url, reference_url, server } => {
            let response = http_client()?
                .post(format!("{}/match-face", server.trim_end_matches('/')))
                .json(&json!({ "imageUrl": image_url, "referenceUrl": reference_url }))
                .send()
                .await
                .with_context(|| format!("cannot reach {server}"))?;

            let status = response.status();
            let reply: RemoteReply = response.json().await.context("unexpected reply from service")?;
            match (status.is_success(), reply.matched, reply.error) {
                (true, Some(matched), _) => println!("{matched}"),
                (_, _, Some(error)) => bail!("{status}: {error}"),
                _ => bail!("{status}: Failed to match faces"),
            }
        }
        Commands::Status { server } => {
            let response = http_client()?
                .get(&server)
                .send()
                .await
                .with_context(|| format!("cannot reach {server}"))?;
            let status = response.status();
            let text = response.text().await?;
            println!("{server}: {status} {text}");
        }
    }

    Ok(())
}

fn load_pipeline(model_dir: Option<PathBuf>) -> Result<FacePipeline> {
    let dir = model_dir.unwrap_or_else(facematch_core::default_model_dir);
    FacePipeline::load(&dir).with_context(|| format!("loading models from {}", dir.display()))
}

/// Read image bytes from a local path or an http(s) URL.
async fn read_image(location: &str) -> Result<Vec<u8>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        fetch_image(location, MAX_IMAGE_BYTES).await
    } else {
        tokio::fs::read(location).await.with_context(|| format!("reading {location}"))
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("facematch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Download an image with the same timeout and size cap as the service.
async fn fetch_image(url: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let mut response = http_client()?
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("fetching {url}"))?;

    if response.content_length().is_some_and(|len| len > max_bytes as u64) {
        bail!("image at {url} exceeds {max_bytes} bytes");
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.with_context(|| format!("fetching {url}"))? {
        if bytes.len() + chunk.len() > max_bytes {
            bail!("image at {url} exceeds {max_bytes} bytes");
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_remote_defaults_to_local_server() {
        let cli = Cli::parse_from(["facematch", "remote", "https://a/1.jpg", "https://a/2.jpg"]);
        match cli.command {
            Commands::Remote { server, .. } => assert_eq!(server, DEFAULT_SERVER),
            _ => panic!("expected remote"),
        }
    }

    #[test]
    fn test_compare_threshold_default() {
        let cli = Cli::parse_from(["facematch", "compare", "a.jpg", "b.jpg"]);
        match cli.command {
            Commands::Compare { threshold, model_dir, .. } => {
                assert_eq!(threshold, DEFAULT_SIMILARITY_THRESHOLD);
                assert!(model_dir.is_none());
            }
            _ => panic!("expected compare"),
        }
    }

    #[tokio::test]
    async fn test_fetch_image_rejects_oversized_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let url = format!("{}/big.jpg", server.uri());
        let err = fetch_image(&url, 32).await.unwrap_err();
        assert!(err.to_string().contains("exceeds 32 bytes"), "{err}");

        let bytes = fetch_image(&url, 64).await.unwrap();
        assert_eq!(bytes.len(), 64);
    }

    #[tokio::test]
    async fn test_fetch_image_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_image(&format!("{}/gone.jpg", server.uri()), 1024).await.unwrap_err();
        assert!(format!("{err:#}").contains("404"), "{err:#}");
    }

    #[tokio::test]
    async fn test_read_image_missing_file() {
        let err = read_image("/nonexistent/photo.jpg").await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/photo.jpg"));
    }
}
