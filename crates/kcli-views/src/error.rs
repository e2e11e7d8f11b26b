use std::io::Error as IoError;

use kcli_client::KcliError;

pub type Result<T, E = NavError> = core::result::Result<T, E>;

/// Reasons a navigation step did not happen.
///
/// The stack is left exactly as it was whenever one of these is returned.
#[derive(thiserror::Error, Debug)]
pub enum NavError {
    #[error("nothing to see here")]
    NoData,
    #[error("not found")]
    NotFound,
    #[error("invalid offset")]
    InvalidOffset,
    #[error("view changed, search result dropped")]
    Stale,
    #[error(transparent)]
    Client(#[from] KcliError),
    #[error(transparent)]
    Io(#[from] IoError),
}

impl NavError {
    /// Errors that end the session instead of becoming a flash message
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Client(err) => err.is_fatal(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Offset errors from the client are reported the same way as local ones
pub(crate) fn offset_error(err: KcliError) -> NavError {
    match err {
        KcliError::InvalidOffset { .. } => NavError::InvalidOffset,
        other => NavError::Client(other),
    }
}
