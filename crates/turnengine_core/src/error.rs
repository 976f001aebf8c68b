//! Error taxonomy for the turn engine.
//!
//! User input errors (class 1) never reach this type — `validate` reports
//! them as a `Message` and returns `false`. `EngineError` only carries the
//! classes that must abort or be retried: invariant violations (class 2) and
//! collaborator failures (class 3).

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine invariant violated: {0}")]
    Invariant(String),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
