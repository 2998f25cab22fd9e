use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use crate::template::TemplateError;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a profile lookup, command synthesis or transcode can report.
///
/// Configuration problems (template, empty template, missing program, unknown
/// profile) are kept apart from per-run failures so a host can tell a broken
/// profile from a broken input.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The executable template has an unclosed quote.
    #[error("split command {template:?}: {source}")]
    MalformedTemplate {
        template: String,
        #[source]
        source: TemplateError,
    },

    /// The executable template tokenized to nothing.
    #[error("not enough profile parts")]
    NoProfileParts,

    /// The first template word does not name an executable on the search path.
    #[error("find name {program:?}: {source}")]
    ProgramNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("no profile named {0:?}")]
    ProfileNotFound(String),

    /// The program was resolved but the process could not be started.
    #[error("starting {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("encoder exited with {status}: {stderr}")]
    ProcessExit { status: ExitStatus, stderr: String },

    /// Reading the process output failed part way through.
    #[error("reading transcode output: {0}")]
    Stream(#[source] std::io::Error),

    /// The caller's sink rejected a write.
    #[error("writing to output: {0}")]
    Sink(#[source] std::io::Error),

    #[error("opening input {path:?}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transcode cancelled")]
    Cancelled,

    #[error("transcode deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl Error {
    /// True for both explicit cancellation and an expired deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded(_))
    }

    /// True when the failure comes from the profile rather than the run.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MalformedTemplate { .. }
                | Error::NoProfileParts
                | Error::ProgramNotFound { .. }
                | Error::ProfileNotFound(_)
        )
    }
}
