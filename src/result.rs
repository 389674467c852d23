use std::{fmt::Display, path::PathBuf};

use miette::miette;

use crate::types::Mode;

/// Why the external program could not transfer a stream
#[derive(Debug)]
pub enum TransferError {
    /// The remote server answered with HTTP 403.
    /// Usually happens with URLs decorated with tracking parameters.
    Forbidden(String),

    Failed(miette::Report),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferError::Forbidden(msg) => write!(f, "403 Forbidden: {msg}"),
            TransferError::Failed(report) => write!(f, "{report}"),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// The input is not a recognized video URL
    Validation(String),

    /// The video metadata could not be fetched
    Metadata(miette::Report),

    /// No stream matches the requested mode
    NoFormat(Mode),

    Download(TransferError),

    /// The transfer reported success but the file is missing or empty
    Verification(PathBuf),

    /// Another download is already in flight
    Busy,

    Miette(miette::Report),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "Error: {msg}"),
            Error::Metadata(report) => write!(f, "Could not fetch video metadata: {report}"),
            Error::NoFormat(Mode::Audio) => write!(f, "No audio formats found"),
            Error::NoFormat(Mode::Video) => write!(f, "No format with an audio channel found"),
            Error::Download(err) => write!(f, "Download failed: {err}"),
            Error::Verification(path) => write!(
                f,
                "Download failed: file is empty or missing ({})",
                path.display()
            ),
            Error::Busy => write!(f, "A download is already in progress"),
            Error::Miette(report) => write!(f, "{report}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Miette(miette::Report::msg(err))
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Metadata(report) => report.wrap_err("Could not fetch video metadata"),
            Error::Download(TransferError::Failed(report)) => report.wrap_err("Download failed"),
            Error::Miette(report) => report,
            err => miette!("{err}"),
        }
    }
}

impl Error {
    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }

    /// Whether the failure is a transfer rejected with HTTP 403
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Download(TransferError::Forbidden(_)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Return a generic error from a message
pub fn bail<T, D>(msg: D) -> Result<T>
where
    D: Display + std::fmt::Debug + Send + Sync + 'static,
{
    Err(Error::Miette(miette::Report::msg(msg)))
}
