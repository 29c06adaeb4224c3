use std::path::PathBuf;

use thiserror::Error;

/// Fatal startup problems: a missing or malformed configuration document,
/// a missing credential, or an invalid task graph. No task processing
/// happens once one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required configuration file {path:?} not found")]
    MissingFile { path: PathBuf },

    #[error("I/O error while reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("environment variable `{var}` is not set")]
    MissingApiKey { var: &'static str },

    #[error("duplicate task id `{task_id}`")]
    DuplicateTask { task_id: String },

    #[error("unknown task status `{value}` for task `{task_id}`")]
    UnknownStatus { task_id: String, value: String },

    #[error("unknown role group `{role}` in task document")]
    UnknownRole { role: String },

    #[error("dependency cycle involving task `{task_id}`")]
    DependencyCycle { task_id: String },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the external generation service. These are local to a single
/// task: the orchestrator resets the task and retries up to the configured
/// attempt budget.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("completion request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("completion endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("completion request for role `{role}` timed out")]
    Timeout { role: String },
}
