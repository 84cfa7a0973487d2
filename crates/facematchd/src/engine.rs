use async_trait::async_trait;
use facematch_core::{Embedding, FacePipeline, PipelineError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending encode requests allowed before callers wait for queue space.
const ENGINE_QUEUE_DEPTH: usize = 8;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("engine thread exited")]
    ChannelClosed,
    #[error("inference panicked: {0}")]
    Panicked(String),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Turns encoded image bytes into one embedding per detected face.
#[async_trait]
pub trait FaceEncoder: Send + Sync {
    async fn encode(&self, image: Vec<u8>) -> Result<Vec<Embedding>, EngineError>;
}

/// Message sent from request handlers to the engine thread.
struct EncodeRequest {
    image: Vec<u8>,
    reply: oneshot::Sender<Result<Vec<Embedding>, EngineError>>,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EncodeRequest>,
}

#[async_trait]
impl FaceEncoder for EngineHandle {
    async fn encode(&self, image: Vec<u8>) -> Result<Vec<Embedding>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EncodeRequest { image, reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Load both ONNX models and spawn the engine on a dedicated OS thread.
///
/// Fails fast at startup if a model is missing or cannot be loaded.
pub fn spawn_engine(model_dir: &Path) -> Result<EngineHandle, EngineError> {
    let mut pipeline = FacePipeline::load(model_dir)?;
    tracing::info!(dir = %model_dir.display(), "SCRFD detector and ArcFace recognizer loaded");

    spawn_worker(move |bytes| pipeline.encode_bytes(bytes))
}

/// Run `encode` on its own thread, serving requests until every handle is dropped.
///
/// A panic inside `encode` fails only the request that triggered it.
pub fn spawn_worker<F>(mut encode: F) -> Result<EngineHandle, EngineError>
where
    F: FnMut(&[u8]) -> Result<Vec<Embedding>, PipelineError> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EncodeRequest>(ENGINE_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("facematch-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(EncodeRequest { image, reply }) = rx.blocking_recv() {
                let result = match panic::catch_unwind(AssertUnwindSafe(|| encode(&image))) {
                    Ok(encoded) => encoded.map_err(EngineError::from),
                    Err(payload) => Err(EngineError::Panicked(panic_message(&*payload))),
                };
                match &result {
                    Ok(faces) => tracing::debug!(faces = faces.len(), bytes = image.len(), "encoded image"),
                    Err(err @ EngineError::Panicked(_)) => tracing::error!(error = %err, bytes = image.len(), "encode panicked"),
                    Err(err) => tracing::debug!(error = %err, "encode failed"),
                }
                // Receiver gone means the request was cancelled.
                let _ = reply.send(result);
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(values: &[f32]) -> Embedding {
        Embedding { values: values.to_vec(), model_version: None }
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        let handle = spawn_worker(|bytes| Ok(vec![embedding(&[bytes.len() as f32]); bytes.len()])).unwrap();

        let faces = handle.encode(vec![0u8; 3]).await.unwrap();
        assert_eq!(faces.len(), 3);
        assert_eq!(faces[0].values, vec![3.0]);

        let none = handle.encode(Vec::new()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_worker_propagates_pipeline_errors() {
        let handle = spawn_worker(|bytes| facematch_core::decode_image(bytes).map(|_| Vec::new())).unwrap();

        let err = handle.encode(b"definitely not an image".to_vec()).await.unwrap_err();
        assert!(matches!(err, EngineError::Pipeline(PipelineError::Decode(_))));
        assert!(err.to_string().starts_with("cannot decode image"));
    }

    #[tokio::test]
    async fn test_worker_survives_panicking_request() {
        let handle = spawn_worker(|bytes| {
            if bytes == b"bad" {
                panic!("inference crashed");
            }
            Ok(vec![embedding(&[1.0])])
        })
        .unwrap();

        let err = handle.encode(b"bad".to_vec()).await.unwrap_err();
        assert!(matches!(err, EngineError::Panicked(ref msg) if msg == "inference crashed"));

        // Same thread keeps serving.
        let faces = handle.encode(b"good".to_vec()).await.unwrap();
        assert_eq!(faces.len(), 1);
    }

    #[tokio::test]
    async fn test_formatted_panic_message_is_reported() {
        let handle = spawn_worker(|bytes| panic!("bad tensor of {} bytes", bytes.len())).unwrap();

        let err = handle.encode(vec![0; 4]).await.unwrap_err();
        assert_eq!(err.to_string(), "inference panicked: bad tensor of 4 bytes");
    }

    #[tokio::test]
    async fn test_handles_share_one_worker() {
        let handle = spawn_worker(|bytes| Ok(vec![embedding(&[bytes[0] as f32])])).unwrap();
        let other = handle.clone();

        let (a, b) = tokio::join!(handle.encode(vec![1]), other.encode(vec![2]));
        assert_eq!(a.unwrap()[0].values, vec![1.0]);
        assert_eq!(b.unwrap()[0].values, vec![2.0]);
    }
}
