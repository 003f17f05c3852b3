use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Failure of a single external command run through a [`CommandRunner`](crate::ports::CommandRunner)
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn: {0}")]
    Spawn(#[from] io::Error),

    #[error("exited with {status}: {stderr}")]
    Status { status: ExitStatus, stderr: String },

    /// Used by in-memory runners that have no real process behind them
    #[error("{0}")]
    Other(String),
}

/// Error taxonomy shared by every reader in the crate
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unexpected format in {}: {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("{0} not installed")]
    ToolUnavailable(String),

    #[error("running {tool} failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: CommandError,
    },
}

pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    pub fn io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        MonitorError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        MonitorError::MalformedInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn execution<S: Into<String>>(tool: S, source: CommandError) -> Self {
        MonitorError::Execution {
            tool: tool.into(),
            source,
        }
    }
}
