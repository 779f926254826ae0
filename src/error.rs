use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Which end of a `START:END` range a bound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Start,
    End,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Start => f.write_str("start"),
            Side::End => f.write_str("end"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Format,
    Selection,
    ExternalProcess,
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("'{}' folder not found", .0.display())]
    RootNotFound(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("'{name}' folder not found")]
    MissingDirectory { name: &'static str },

    #[error("expected exactly one ':' in '{0}'")]
    InvalidRange(String),

    #[error("invalid {side} index '{value}'")]
    InvalidBound { side: Side, value: String },

    #[error("no DVR recordings found")]
    NoRecordings,

    #[error("range {start}:{end} is empty, start must not exceed end")]
    EmptyRange { start: u32, end: u32 },

    #[error(
        "could not find all video files in range '{range}'. Missing files:\n  {}",
        .missing.join("\n  ")
    )]
    MissingFiles { range: String, missing: Vec<String> },

    #[error("failed to start transcoder '{}'", .program.display())]
    TranscoderSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transcoder failed during {stage} ({})", describe_exit(.code))]
    Transcoder { stage: Stage, code: Option<i32> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RootNotFound(_) | Error::RootNotDirectory(_) | Error::MissingDirectory { .. } => {
                ErrorKind::Configuration
            }
            Error::InvalidRange(_) | Error::InvalidBound { .. } => ErrorKind::Format,
            Error::NoRecordings | Error::EmptyRange { .. } | Error::MissingFiles { .. } => {
                ErrorKind::Selection
            }
            Error::TranscoderSpawn { .. } | Error::Transcoder { .. } => ErrorKind::ExternalProcess,
            Error::Io(_) | Error::Walk(_) => ErrorKind::Io,
        }
    }

    /// User mistakes that are reported without failing the process.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Format | ErrorKind::Selection
        )
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
