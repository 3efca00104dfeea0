use async_trait::async_trait;

use crate::{
    Comment, CommentId, Error, Identity, Post, PostId, SubjectId, UserId, Vote, VoteDirection,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VotableKind {
    Post,
    Comment,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Scope {
    All,
    ByAuthor(UserId),
    OnPost(PostId),
}

impl Scope {
    pub fn covers_post(&self, post: &Post) -> bool {
        match *self {
            Scope::All => true,
            Scope::ByAuthor(u) => post.author_id == u,
            Scope::OnPost(id) => post.id == id,
        }
    }

    pub fn covers_comment(&self, comment: &Comment) -> bool {
        match *self {
            Scope::All => true,
            Scope::ByAuthor(u) => comment.author_id == u,
            Scope::OnPost(id) => comment.post_id == id,
        }
    }
}

/// Votes of one item, deduplicated by user
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VotableRow {
    pub subject: SubjectId,
    pub votes: Vec<Vote>,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewPost {
    pub content: String,
    pub identity: Identity,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub identity: Identity,
}

/// Notification that something changed on the backend
///
/// It only names what changed, listeners refetch the parts they display.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Change {
    NewPost(PostId),
    PostDeleted(PostId),
    NewComment { post: PostId, comment: CommentId },
    CommentDeleted { post: PostId, comment: CommentId },
    VoteChanged(SubjectId),
}

#[async_trait]
pub trait Backend {
    fn current_user(&self) -> UserId;

    async fn fetch_posts(&mut self, scope: Scope) -> Result<Vec<Post>, Error>;

    async fn fetch_votables(
        &mut self,
        kind: VotableKind,
        scope: Scope,
    ) -> Result<Vec<VotableRow>, Error>;

    /// Flat list, in no particular order
    async fn fetch_comments(&mut self, post: PostId) -> Result<Vec<Comment>, Error>;

    /// Overwrites `user`'s previous vote on `subject`, `None` retracts it
    async fn upsert_vote(
        &mut self,
        subject: SubjectId,
        user: UserId,
        direction: Option<VoteDirection>,
    ) -> Result<(), Error>;

    /// Posts as the current user and returns the stored row
    async fn create_post(&mut self, post: NewPost) -> Result<Post, Error>;

    /// Comments as the current user and returns the stored row
    async fn create_comment(&mut self, comment: NewComment) -> Result<Comment, Error>;

    /// Removes the post with its comments and votes, only its author may do so
    async fn delete_post(&mut self, post: PostId) -> Result<(), Error>;

    /// Removes the comment and its votes, its replies stay and lose their parent
    async fn delete_comment(&mut self, comment: CommentId) -> Result<(), Error>;
}
