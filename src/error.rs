use std::path::PathBuf;

use thiserror::Error;

/// All failures of a conversion run.
///
/// `Read` and `Write` carry the failing path and the underlying I/O error.
/// Markdown content never produces an error by itself: unrecognised syntax
/// degrades to literal text.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrong number of arguments or an unknown option.
    #[error("{0}")]
    Usage(String),

    /// The requested renderer was not compiled into this binary.
    #[error("the '{policy}' renderer is not available in this build. {hint}")]
    MissingRenderer { policy: String, hint: String },

    /// The input could not be opened, read, or is not valid UTF-8.
    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output could not be created or written.
    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template failed to render.
    #[error("failed to render html: {0}")]
    Transform(String),
}

impl From<tinytemplate::error::Error> for Error {
    fn from(e: tinytemplate::error::Error) -> Self {
        Error::Transform(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
