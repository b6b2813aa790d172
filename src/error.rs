use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Council has no models")]
    EmptyCouncil,

    #[error("Model '{0}' appears more than once in the council")]
    DuplicateModel(String),

    #[error("Model identifiers must not be empty")]
    EmptyModelId,

    #[error("Unknown model '{model}' for provider {provider} (known: {known})")]
    UnknownModel {
        model: String,
        provider: String,
        known: String,
    },

    #[error("Timeout for {0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Coarse classification of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    BackendUnavailable,
    BackendError,
    BackendTimeout,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::BackendUnavailable => write!(f, "backend unavailable"),
            FailureKind::BackendError => write!(f, "backend error"),
            FailureKind::BackendTimeout => write!(f, "backend timeout"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Backend unavailable ({binary}): {reason}")]
    Unavailable { binary: String, reason: String },

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process failed with exit code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Backend reported an error: {0}")]
    Backend(String),

    #[error("Backend returned an empty response")]
    EmptyOutput,
}

impl ProviderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Unavailable { .. } => FailureKind::BackendUnavailable,
            ProviderError::Timeout(_) => FailureKind::BackendTimeout,
            ProviderError::Io(_)
            | ProviderError::NonZeroExit { .. }
            | ProviderError::Backend(_)
            | ProviderError::EmptyOutput => FailureKind::BackendError,
        }
    }
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Model '{0}' queried more than once in a single batch")]
    DuplicateModel(String),
}

/// A model that failed, with the reason it was dropped from the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFailure {
    pub model: String,
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}: {})", self.model, self.kind, self.message)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage 1 failed: no council model responded [{}]", join_failures(.failures))]
    AllResponsesFailed { failures: Vec<ModelFailure> },

    #[error("Stage 3 failed: chairman {chairman} could not synthesize ({kind}: {reason})")]
    SynthesisFailed {
        chairman: String,
        kind: FailureKind,
        reason: String,
    },

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),
}

fn join_failures(failures: &[ModelFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write report: {0}")]
    WriteReport(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
