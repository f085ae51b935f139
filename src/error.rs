use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::EncodeError;

/// Every way producing a card document can fail.
#[derive(Debug, Error)]
pub enum CardError {
    #[error("barcode renderer not found at {}", .0.display())]
    RendererNotFound(PathBuf),

    #[error("font resource not found at {}", .0.display())]
    FontNotFound(PathBuf),

    #[error("directory {} is not usable: {source}", .path.display())]
    DirectoryUnusable { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("failed to launch barcode renderer {}: {source}", .program.display())]
    RendererLaunch { program: PathBuf, source: io::Error },

    #[error("barcode renderer failed for '{data}' ({status}): {stderr}")]
    RendererFailed {
        data: String,
        status: String,
        stderr: String,
    },

    #[error("unknown report kind '{0}'")]
    UnknownReport(String),

    #[error("cannot read vector artifact {}: {message}", .path.display())]
    Artifact { path: PathBuf, message: String },

    #[error("cannot load font {}: {message}", .path.display())]
    Font { path: PathBuf, message: String },

    #[error("character '{ch}' cannot be drawn with font {font}")]
    Unencodable { ch: char, font: String },

    #[error("font '{0}' is not registered with this surface")]
    UnknownFont(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl CardError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CardError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = CardError> = std::result::Result<T, E>;
