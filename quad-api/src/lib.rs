use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod backend;
pub use backend::{Backend, Change, NewComment, NewPost, Scope, VotableKind, VotableRow};

mod comment;
pub use comment::{Comment, CommentId};

mod error;
pub use error::Error;

mod identity;
pub use identity::Identity;

mod post;
pub use post::{Post, PostId};

mod user;
pub use user::UserId;

mod vote;
pub use vote::{SubjectId, Votable, Vote, VoteDirection};
