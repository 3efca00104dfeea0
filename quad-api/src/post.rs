use uuid::Uuid;

use crate::{Identity, SubjectId, Time, UserId, Votable, Vote};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: Time,

    #[serde(default)]
    pub identity: Identity,

    /// At most one vote per user, already resolved by the backend
    #[serde(default)]
    pub votes: Vec<Vote>,

    /// Number of comments the backend reported alongside the post
    #[serde(default)]
    pub comment_count: usize,
}

impl Votable for Post {
    fn subject(&self) -> SubjectId {
        SubjectId::Post(self.id)
    }

    fn author_id(&self) -> UserId {
        self.author_id
    }

    fn created_at(&self) -> Time {
        self.created_at
    }

    fn votes(&self) -> &[Vote] {
        &self.votes
    }
}
