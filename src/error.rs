use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fixture `{path}` is invalid: {reason}")]
    Fixture { path: String, reason: String },

    #[error("Artifact `{name}` unavailable: {reason}")]
    Artifact { name: String, reason: String },

    #[error("Setup failed for `{pool}` during {stage}: {reason}")]
    Setup {
        pool: String,
        stage: String,
        reason: String,
    },

    #[error("{label} tx reverted (hash: {tx})")]
    Reverted { label: String, tx: String },

    #[error("Pool `{pool}` failed at {stage}: {check}")]
    Mismatch {
        pool: String,
        stage: String,
        check: String,
    },

    #[error("Pool `{pool}` errored at {stage}: {reason}")]
    StepFailed {
        pool: String,
        stage: String,
        reason: String,
    },
}

impl HarnessError {
    pub fn setup(pool: impl Into<String>, stage: impl Into<String>, err: impl std::fmt::Display) -> Self {
        HarnessError::Setup {
            pool: pool.into(),
            stage: stage.into(),
            reason: format!("{err:#}"),
        }
    }
}
