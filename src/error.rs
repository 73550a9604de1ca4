//! Error taxonomy of the virtual file system.
//!
//! Every variant renders the exact message a Windows-backed API would raise, so code under
//! test that matches on messages behaves the same against the mock.

use std::io;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    /// Malformed argument: empty path, illegal characters, bad UNC shape, bad search pattern.
    #[error("{0}")]
    InvalidArgument(String),

    /// Path syntax the file system cannot express (stray `:`, reserved device names).
    #[error("{0}")]
    Unsupported(String),

    /// A directory along the path (or the root) is missing. Holds the full path.
    #[error("Could not find a part of the path '{0}'.")]
    DirectoryNotFound(String),

    /// The final segment is missing. Holds the full path.
    #[error("Could not find file '{0}'.")]
    FileNotFound(String),

    #[error("Cannot create '{0}' because a file or directory with the same name already exists.")]
    AlreadyExists(String),

    /// Sharing violation: open handle, current directory, or moving a directory into itself.
    #[error("The process cannot access the file '{0}' because it is being used by another process.")]
    InUse(String),

    #[error("Access to the path '{0}' is denied.")]
    AccessDenied(String),

    /// Holds the path of the directory that still has children.
    #[error("The directory is not empty.")]
    NotEmpty(String),

    #[error("{0}")]
    OutOfRange(String),

    /// Any other I/O failure, carrying the OS message verbatim.
    #[error("{0}")]
    Io(String),
}

impl VfsError {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        VfsError::InvalidArgument(message.into())
    }

    pub(crate) fn io<S: Into<String>>(message: S) -> Self {
        VfsError::Io(message.into())
    }

    pub(crate) fn illegal_characters() -> Self {
        VfsError::invalid("Illegal characters in path.")
    }

    pub(crate) fn unsupported_format() -> Self {
        VfsError::Unsupported("The given path's format is not supported.".to_string())
    }

    pub(crate) fn network_path_not_found() -> Self {
        VfsError::io("The network path was not found.")
    }

    pub(crate) fn directory_name_invalid() -> Self {
        VfsError::io("The directory name is invalid.")
    }

    /// Closest `std::io::ErrorKind` for this error.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            VfsError::InvalidArgument(_) | VfsError::OutOfRange(_) => io::ErrorKind::InvalidInput,
            VfsError::Unsupported(_) => io::ErrorKind::Unsupported,
            VfsError::DirectoryNotFound(_) | VfsError::FileNotFound(_) => io::ErrorKind::NotFound,
            VfsError::AlreadyExists(_) => io::ErrorKind::AlreadyExists,
            VfsError::AccessDenied(_) => io::ErrorKind::PermissionDenied,
            VfsError::InUse(_) => io::ErrorKind::ResourceBusy,
            VfsError::NotEmpty(_) => io::ErrorKind::DirectoryNotEmpty,
            VfsError::Io(_) => io::ErrorKind::Other,
        }
    }

    /// True for the kinds a Windows API reports as `IOException` or one of its subclasses.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            VfsError::DirectoryNotFound(_)
                | VfsError::FileNotFound(_)
                | VfsError::AlreadyExists(_)
                | VfsError::InUse(_)
                | VfsError::NotEmpty(_)
                | VfsError::Io(_)
        )
    }
}

impl From<VfsError> for io::Error {
    fn from(err: VfsError) -> Self {
        io::Error::new(err.kind(), err)
    }
}
