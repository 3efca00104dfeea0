use uuid::Uuid;

use crate::{Identity, PostId, SubjectId, Time, UserId, Votable, Vote};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,

    /// None for a top-level comment
    #[serde(default)]
    pub parent_id: Option<CommentId>,

    pub content: String,
    pub author_id: UserId,
    pub created_at: Time,

    #[serde(default)]
    pub identity: Identity,

    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl Votable for Comment {
    fn subject(&self) -> SubjectId {
        SubjectId::Comment(self.id)
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
