use crate::api::{self, SubjectId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] api::Error),

    #[error("vote on {subject:?} was reverted: {source}")]
    VoteReverted {
        subject: SubjectId,
        source: api::Error,
    },
}

impl Error {
    /// Whether the user may simply try again
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Api(e) | Error::VoteReverted { source: e, .. } => e.is_transient(),
        }
    }
}
