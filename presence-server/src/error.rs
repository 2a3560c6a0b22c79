use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("durable store unavailable: {0}")]
    Store(#[source] anyhow::Error),
    #[error("restore failed: {0}")]
    Restore(String),
}
