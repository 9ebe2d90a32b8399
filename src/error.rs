use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run.
///
/// Document content never produces one of these: malformed markup is
/// recovered from, and a document that cannot be parsed at all becomes a
/// `Parse` issue in the report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start grammar checker `{program}`: {source}")]
    CheckerSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("grammar checker I/O failed: {0}")]
    CheckerIo(#[source] io::Error),

    #[error("grammar checker sent an invalid response: {0}")]
    CheckerProtocol(#[source] serde_json::Error),

    #[error("grammar checker closed its output before answering")]
    CheckerClosed,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
