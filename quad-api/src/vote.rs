use std::sync::Arc;

use crate::{CommentId, PostId, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    /// Net contribution of a user's current vote, zero if they did not vote
    pub fn value_of(dir: Option<VoteDirection>) -> i64 {
        dir.map(VoteDirection::value).unwrap_or(0)
    }
}

/// Anything a user can vote on
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum SubjectId {
    Post(PostId),
    Comment(CommentId),
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Vote {
    pub subject: SubjectId,
    pub user_id: UserId,
    pub direction: VoteDirection,
    pub created_at: Time,
}

impl Vote {
    /// Direction of `user`'s vote among `votes`, if any
    pub fn direction_of(votes: &[Vote], user: &UserId) -> Option<VoteDirection> {
        votes
            .iter()
            .find(|v| v.user_id == *user)
            .map(|v| v.direction)
    }
}

/// Shared shape of posts and comments
pub trait Votable {
    fn subject(&self) -> SubjectId;
    fn author_id(&self) -> UserId;
    fn created_at(&self) -> Time;
    fn votes(&self) -> &[Vote];

    /// Direction of `user`'s vote on this item, if any
    fn vote_of(&self, user: &UserId) -> Option<VoteDirection> {
        Vote::direction_of(self.votes(), user)
    }
}

impl<T: Votable + ?Sized> Votable for Arc<T> {
    fn subject(&self) -> SubjectId {
        (**self).subject()
    }

    fn author_id(&self) -> UserId {
        (**self).author_id()
    }

    fn created_at(&self) -> Time {
        (**self).created_at()
    }

    fn votes(&self) -> &[Vote] {
        (**self).votes()
    }
}
