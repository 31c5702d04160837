use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Startup and I/O failures. An annealing run that finds no fitting layout
/// is not an error; see [`crate::SaOutcome::valid`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{path}:{line}: malformed input: {msg}")]
    Input {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
