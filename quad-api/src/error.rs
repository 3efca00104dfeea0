use crate::SubjectId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Subject not found {0:?}")]
    NotFound(SubjectId),

    #[error("Content must not be empty")]
    EmptyContent,

    #[error("Network error: {0}")]
    Network(String),
}

impl Error {
    /// Whether re-tapping may succeed without anything else changing
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}
