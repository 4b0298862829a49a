//! Error taxonomy for filesystem operations.

use thiserror::Error;
use tracing::{error, warn};

use crate::fs::api::ApiError;

/// Outcome classification shared by every facade verb.
#[derive(Debug, Error)]
pub enum FsError {
    /// Inode or name absent from the registry or a child map.
    #[error("entry not found")]
    NotFound,

    /// Create or mkdir aimed at a name that is already taken.
    #[error("entry already exists")]
    AlreadyExists,

    /// The name has no wiki representation, so it cannot be created.
    #[error("name is not storable on the wiki")]
    Unwritable,

    /// A transient remote fault; the caller should reissue the request.
    #[error("remote fault, try again")]
    TryAgain,

    /// Directory verb aimed at a leaf.
    #[error("not a directory")]
    NotADirectory,

    /// Leaf verb aimed at a directory.
    #[error("is a directory")]
    IsADirectory,

    /// rmdir aimed at a directory that still has children.
    #[error("directory not empty")]
    NotEmpty,

    /// Page writes must stay valid UTF-8.
    #[error("page content is not valid utf-8")]
    NotText,

    /// The requested size does not fit in addressable memory.
    #[error("file too large")]
    TooLarge,

    /// Hard remote failure.
    #[error("remote api error")]
    Remote(#[source] ApiError),
}

impl From<ApiError> for FsError {
    fn from(e: ApiError) -> Self {
        if e.is_transient() {
            // TryAgain carries no payload, so the cause is only visible here.
            warn!(cause = %e, "transient remote fault, caller will retry");
            Self::TryAgain
        } else {
            error!(cause = %e, "remote call failed");
            Self::Remote(e)
        }
    }
}

impl From<FsError> for i32 {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound => libc::ENOENT,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::Unwritable => libc::EROFS,
            FsError::TryAgain => libc::EAGAIN,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::NotEmpty => libc::ENOTEMPTY,
            FsError::NotText => libc::EINVAL,
            FsError::TooLarge => libc::EFBIG,
            FsError::Remote(_) => libc::EIO,
        }
    }
}
