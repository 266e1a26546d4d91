//! The three ways a load or save can fail.

use std::io;
use std::path::PathBuf;

use polymesh_core::MeshError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshIoError {
    /// The file extension does not name a supported format.
    #[error("Unknown file format: '{extension}'")]
    UnknownFileFormat { extension: String },

    /// The file could not be opened for reading or created for writing.
    #[error("Cannot open file {}: {source}", path.display())]
    CannotOpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any structural problem in the content, including truncated streams.
    #[error("Malformed file: {0}")]
    MalformedFile(String),
}

pub type Result<T> = std::result::Result<T, MeshIoError>;

impl MeshIoError {
    pub fn malformed(message: impl Into<String>) -> Self {
        MeshIoError::MalformedFile(message.into())
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, MeshIoError::MalformedFile(_))
    }
}

impl From<io::Error> for MeshIoError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => MeshIoError::malformed("Unexpected end of file"),
            _ => MeshIoError::malformed(format!("IO error: {err}")),
        }
    }
}

impl From<MeshError> for MeshIoError {
    fn from(err: MeshError) -> Self {
        MeshIoError::MalformedFile(err.to_string())
    }
}
