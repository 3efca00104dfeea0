mod comment;
pub use comment::{CommentNode, Walk};

mod config;
pub use config::FeedConfig;

mod db;
pub use db::{FeedDump, VoteAck};

mod error;
pub use error::Error;

mod order;
pub use order::RankStrategy;

mod tally;
pub use tally::{karma, tally, TallyExt, VoteCounts};

mod vote;
pub use vote::{AckOutcome, AttemptId, OptimisticVoteController, VoteAttempt, VoteState};

mod fuzz;
#[cfg(test)]
mod stub;

pub mod api {
    pub use quad_api::*;
}

pub mod prelude {
    pub use crate::api::Votable;
    pub use crate::TallyExt;
}
