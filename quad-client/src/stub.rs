use chrono::{TimeZone, Utc};

use crate::api::{
    Comment, CommentId, Identity, Post, PostId, SubjectId, Time, UserId, Uuid, Vote, VoteDirection,
};

pub fn at(secs: i64) -> Time {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid stub timestamp")
}

pub fn user(n: u32) -> UserId {
    UserId(Uuid::from_u128(0x1000 + n as u128))
}

pub fn post_id(n: u32) -> PostId {
    PostId(Uuid::from_u128(0x2000 + n as u128))
}

pub fn comment_id(n: u32) -> CommentId {
    CommentId(Uuid::from_u128(0x3000 + n as u128))
}

pub fn vote(subject: SubjectId, user_n: u32, direction: VoteDirection) -> Vote {
    Vote {
        subject,
        user_id: user(user_n),
        direction,
        created_at: at(user_n as i64),
    }
}

/// Votes from distinct users: `ups` upvotes then `downs` downvotes
pub fn votes(subject: SubjectId, ups: u32, downs: u32) -> Vec<Vote> {
    (0..ups)
        .map(|u| vote(subject, 100 + u, VoteDirection::Up))
        .chain((0..downs).map(|u| vote(subject, 100 + ups + u, VoteDirection::Down)))
        .collect()
}

pub fn post(n: u32, secs: i64, ups: u32, downs: u32) -> Post {
    let id = post_id(n);
    Post {
        id,
        author_id: user(0),
        content: format!("post {n}"),
        created_at: at(secs),
        identity: Identity::anonymous(),
        votes: votes(SubjectId::Post(id), ups, downs),
        comment_count: 0,
    }
}

pub fn comment(n: u32, parent: Option<u32>, secs: i64) -> Comment {
    Comment {
        id: comment_id(n),
        post_id: post_id(1),
        parent_id: parent.map(comment_id),
        content: format!("comment {n}"),
        author_id: user(0),
        created_at: at(secs),
        identity: Identity::anonymous(),
        votes: Vec::new(),
    }
}
