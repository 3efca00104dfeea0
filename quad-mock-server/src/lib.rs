use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use quad_api::{
    Backend, Change, Comment, CommentId, Error, NewComment, NewPost, Post, PostId, Scope,
    SubjectId, Time, UserId, Uuid, Votable, VotableKind, VotableRow, Vote, VoteDirection,
};
use tokio::sync::mpsc;

/// Serializable contents of a `MockServer`, with votes embedded in their items
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Dump {
    pub owner: UserId,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
}

impl Dump {
    pub fn load(path: &Path) -> anyhow::Result<Dump> {
        let data = std::fs::read(path).with_context(|| format!("reading dump {path:?}"))?;
        serde_json::from_slice(&data).with_context(|| format!("parsing dump {path:?}"))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(self).context("serializing dump")?;
        std::fs::write(path, data).with_context(|| format!("writing dump {path:?}"))
    }
}

/// In-memory backend, acting as user `owner`
pub struct MockServer {
    owner: UserId,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    votes: HashMap<(SubjectId, UserId), Vote>,
    offline: bool,
    failing_upserts: usize,
    upserts: Vec<(SubjectId, UserId, Option<VoteDirection>)>,
    feeds: Vec<mpsc::UnboundedSender<Change>>,
}

impl MockServer {
    pub fn new(owner: UserId) -> MockServer {
        MockServer {
            owner,
            posts: BTreeMap::new(),
            comments: BTreeMap::new(),
            votes: HashMap::new(),
            offline: false,
            failing_upserts: 0,
            upserts: Vec::new(),
            feeds: Vec::new(),
        }
    }

    pub fn from_dump(dump: Dump) -> MockServer {
        let mut res = MockServer::new(dump.owner);
        for p in dump.posts {
            res.add_post(p);
        }
        for c in dump.comments {
            res.add_comment(c);
        }
        res
    }

    pub fn to_dump(&self) -> Dump {
        Dump {
            owner: self.owner,
            posts: self.posts.values().map(|p| self.with_votes(p)).collect(),
            comments: self.comments.values().map(|c| self.with_votes(c)).collect(),
        }
    }

    /// Stores `p`, taking the votes it carries as already cast
    pub fn add_post(&mut self, mut p: Post) {
        self.take_votes(SubjectId::Post(p.id), &mut p.votes);
        let id = p.id;
        self.posts.insert(id, p);
        self.relay(Change::NewPost(id));
    }

    pub fn add_comment(&mut self, mut c: Comment) {
        self.take_votes(SubjectId::Comment(c.id), &mut c.votes);
        let change = Change::NewComment {
            post: c.post_id,
            comment: c.id,
        };
        self.comments.insert(c.id, c);
        self.relay(change);
    }

    /// While offline, every call fails with a network error
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Make the next `n` vote upserts fail with a network error
    pub fn fail_next_upserts(&mut self, n: usize) {
        self.failing_upserts = n;
    }

    /// Upserts that reached the server, in order, failed ones excluded
    pub fn upserts(&self) -> &[(SubjectId, UserId, Option<VoteDirection>)] {
        &self.upserts
    }

    /// Cast a vote as any user, bypassing permission checks
    pub fn test_cast_vote(
        &mut self,
        subject: SubjectId,
        user: UserId,
        direction: Option<VoteDirection>,
    ) {
        self.store_vote(subject, user, direction, Utc::now());
    }

    /// Delete a post as any user, bypassing permission checks
    pub fn test_delete_post(&mut self, post: PostId) {
        self.remove_post(post);
    }

    /// Delete a comment as any user, bypassing permission checks
    pub fn test_delete_comment(&mut self, comment: CommentId) {
        self.remove_comment(comment);
    }

    pub fn change_feed(&mut self) -> mpsc::UnboundedReceiver<Change> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.feeds.push(sender);
        receiver
    }
}

impl MockServer {
    fn relay(&mut self, c: Change) {
        self.feeds.retain(|f| f.send(c.clone()).is_ok());
    }

    fn remove_post(&mut self, post: PostId) {
        if self.posts.remove(&post).is_none() {
            return;
        }
        let comments = self
            .comments
            .values()
            .filter(|c| c.post_id == post)
            .map(|c| c.id)
            .collect::<Vec<_>>();
        for c in &comments {
            self.comments.remove(c);
        }
        self.votes.retain(|(subject, _), _| match subject {
            SubjectId::Post(p) => *p != post,
            SubjectId::Comment(c) => !comments.contains(c),
        });
        self.relay(Change::PostDeleted(post));
    }

    fn remove_comment(&mut self, comment: CommentId) {
        let Some(c) = self.comments.remove(&comment) else {
            return;
        };
        self.votes
            .retain(|(subject, _), _| *subject != SubjectId::Comment(comment));
        self.relay(Change::CommentDeleted {
            post: c.post_id,
            comment,
        });
    }

    fn take_votes(&mut self, subject: SubjectId, votes: &mut Vec<Vote>) {
        for v in votes.drain(..) {
            // later votes from the same user replace earlier ones
            self.votes.insert(
                (subject, v.user_id),
                Vote {
                    subject,
                    ..v
                },
            );
        }
    }

    fn store_vote(
        &mut self,
        subject: SubjectId,
        user: UserId,
        direction: Option<VoteDirection>,
        created_at: Time,
    ) {
        match direction {
            None => {
                self.votes.remove(&(subject, user));
            }
            Some(direction) => {
                self.votes.insert(
                    (subject, user),
                    Vote {
                        subject,
                        user_id: user,
                        direction,
                        created_at,
                    },
                );
            }
        }
        self.relay(Change::VoteChanged(subject));
    }

    fn votes_of(&self, subject: SubjectId) -> Vec<Vote> {
        let mut res = self
            .votes
            .values()
            .filter(|v| v.subject == subject)
            .cloned()
            .collect::<Vec<_>>();
        res.sort_by_key(|v| (v.created_at, v.user_id));
        res
    }

    fn with_votes<T: Votable + Clone + HasVotes>(&self, item: &T) -> T {
        let mut res = item.clone();
        *res.votes_mut() = self.votes_of(item.subject());
        res
    }

    fn exists(&self, subject: &SubjectId) -> bool {
        match subject {
            SubjectId::Post(p) => self.posts.contains_key(p),
            SubjectId::Comment(c) => self.comments.contains_key(c),
        }
    }

    fn check_content(content: &str) -> Result<(), Error> {
        match content.trim().is_empty() {
            true => Err(Error::EmptyContent),
            false => Ok(()),
        }
    }

    fn check_online(&self) -> Result<(), Error> {
        match self.offline {
            true => Err(Error::Network(String::from("backend unreachable"))),
            false => Ok(()),
        }
    }

    fn posts_in(&self, scope: Scope) -> Vec<Post> {
        self.posts
            .values()
            .filter(|p| scope.covers_post(p))
            .map(|p| {
                let mut p = self.with_votes(p);
                p.comment_count = self.comments.values().filter(|c| c.post_id == p.id).count();
                p
            })
            .collect()
    }

    fn comments_in(&self, scope: Scope) -> Vec<Comment> {
        self.comments
            .values()
            .filter(|c| scope.covers_comment(c))
            .map(|c| self.with_votes(c))
            .collect()
    }
}

trait HasVotes {
    fn votes_mut(&mut self) -> &mut Vec<Vote>;
}

impl HasVotes for Post {
    fn votes_mut(&mut self) -> &mut Vec<Vote> {
        &mut self.votes
    }
}

impl HasVotes for Comment {
    fn votes_mut(&mut self) -> &mut Vec<Vote> {
        &mut self.votes
    }
}

#[async_trait]
impl Backend for MockServer {
    fn current_user(&self) -> UserId {
        self.owner
    }

    async fn fetch_posts(&mut self, scope: Scope) -> Result<Vec<Post>, Error> {
        self.check_online()?;
        Ok(self.posts_in(scope))
    }

    async fn fetch_votables(
        &mut self,
        kind: VotableKind,
        scope: Scope,
    ) -> Result<Vec<VotableRow>, Error> {
        self.check_online()?;
        let subjects: Vec<SubjectId> = match kind {
            VotableKind::Post => self.posts_in(scope).iter().map(|p| p.subject()).collect(),
            VotableKind::Comment => self.comments_in(scope).iter().map(|c| c.subject()).collect(),
        };
        Ok(subjects
            .into_iter()
            .map(|subject| VotableRow {
                subject,
                votes: self.votes_of(subject),
            })
            .collect())
    }

    async fn fetch_comments(&mut self, post: PostId) -> Result<Vec<Comment>, Error> {
        self.check_online()?;
        if !self.posts.contains_key(&post) {
            return Err(Error::NotFound(SubjectId::Post(post)));
        }
        Ok(self.comments_in(Scope::OnPost(post)))
    }

    async fn upsert_vote(
        &mut self,
        subject: SubjectId,
        user: UserId,
        direction: Option<VoteDirection>,
    ) -> Result<(), Error> {
        self.check_online()?;
        if self.failing_upserts > 0 {
            self.failing_upserts -= 1;
            tracing::debug!(?subject, "failing vote upsert on request");
            return Err(Error::Network(String::from("connection reset")));
        }
        if user != self.owner {
            return Err(Error::PermissionDenied);
        }
        if !self.exists(&subject) {
            return Err(Error::NotFound(subject));
        }
        self.upserts.push((subject, user, direction));
        self.store_vote(subject, user, direction, Utc::now());
        Ok(())
    }

    async fn create_post(&mut self, post: NewPost) -> Result<Post, Error> {
        self.check_online()?;
        MockServer::check_content(&post.content)?;
        let post = Post {
            id: PostId(Uuid::new_v4()),
            author_id: self.owner,
            content: post.content,
            created_at: Utc::now(),
            identity: post.identity,
            votes: Vec::new(),
            comment_count: 0,
        };
        tracing::debug!(id = ?post.id, username = %post.identity.username, "creating post");
        self.add_post(post.clone());
        Ok(post)
    }

    async fn create_comment(&mut self, comment: NewComment) -> Result<Comment, Error> {
        self.check_online()?;
        MockServer::check_content(&comment.content)?;
        if !self.posts.contains_key(&comment.post_id) {
            return Err(Error::NotFound(SubjectId::Post(comment.post_id)));
        }
        if let Some(parent) = comment.parent_id {
            match self.comments.get(&parent) {
                Some(p) if p.post_id == comment.post_id => (),
                _ => return Err(Error::NotFound(SubjectId::Comment(parent))),
            }
        }
        let comment = Comment {
            id: CommentId(Uuid::new_v4()),
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            content: comment.content,
            author_id: self.owner,
            created_at: Utc::now(),
            identity: comment.identity,
            votes: Vec::new(),
        };
        tracing::debug!(id = ?comment.id, post = ?comment.post_id, "creating comment");
        self.add_comment(comment.clone());
        Ok(comment)
    }

    async fn delete_post(&mut self, post: PostId) -> Result<(), Error> {
        self.check_online()?;
        match self.posts.get(&post) {
            None => return Err(Error::NotFound(SubjectId::Post(post))),
            Some(p) if p.author_id != self.owner => return Err(Error::PermissionDenied),
            Some(_) => (),
        }
        tracing::debug!(?post, "deleting post");
        self.remove_post(post);
        Ok(())
    }

    async fn delete_comment(&mut self, comment: CommentId) -> Result<(), Error> {
        self.check_online()?;
        match self.comments.get(&comment) {
            None => return Err(Error::NotFound(SubjectId::Comment(comment))),
            Some(c) if c.author_id != self.owner => return Err(Error::PermissionDenied),
            Some(_) => (),
        }
        tracing::debug!(?comment, "deleting comment");
        self.remove_comment(comment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use quad_api::Identity;

    use super::*;

    fn user(n: u128) -> UserId {
        UserId(Uuid::from_u128(n))
    }

    fn post(n: u128) -> Post {
        Post {
            id: PostId(Uuid::from_u128(0x100 + n)),
            author_id: user(1),
            content: format!("post {n}"),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp"),
            identity: Identity::anonymous(),
            votes: Vec::new(),
            comment_count: 0,
        }
    }

    fn comment(n: u128, post: &Post) -> Comment {
        Comment {
            id: CommentId(Uuid::from_u128(0x200 + n)),
            post_id: post.id,
            parent_id: None,
            content: format!("comment {n}"),
            author_id: user(2),
            created_at: post.created_at,
            identity: Identity::anonymous(),
            votes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn change_feed_relays_writes() {
        let mut server = MockServer::new(user(1));
        let mut feed = server.change_feed();
        let p = post(1);
        server.add_post(p.clone());
        let c = comment(1, &p);
        server.add_comment(c.clone());
        server
            .upsert_vote(c.subject(), user(1), Some(VoteDirection::Up))
            .await
            .expect("voting");

        assert_eq!(feed.recv().await, Some(Change::NewPost(p.id)));
        assert_eq!(
            feed.recv().await,
            Some(Change::NewComment {
                post: p.id,
                comment: c.id
            })
        );
        assert_eq!(feed.recv().await, Some(Change::VoteChanged(c.subject())));
    }

    #[tokio::test]
    async fn upserts_replace_and_retract() {
        let mut server = MockServer::new(user(1));
        let p = post(1);
        server.add_post(p.clone());
        let s = p.subject();

        server
            .upsert_vote(s, user(1), Some(VoteDirection::Up))
            .await
            .expect("voting");
        server
            .upsert_vote(s, user(1), Some(VoteDirection::Down))
            .await
            .expect("switching");
        let posts = server.fetch_posts(Scope::All).await.expect("fetching");
        assert_eq!(posts[0].votes.len(), 1);
        assert_eq!(posts[0].vote_of(&user(1)), Some(VoteDirection::Down));

        server.upsert_vote(s, user(1), None).await.expect("retracting");
        let rows = server
            .fetch_votables(VotableKind::Post, Scope::All)
            .await
            .expect("fetching votes");
        assert_eq!(rows, vec![VotableRow { subject: s, votes: Vec::new() }]);
        assert_eq!(server.upserts().len(), 3);
    }

    #[tokio::test]
    async fn rejects_bad_upserts() {
        let mut server = MockServer::new(user(1));
        let p = post(1);
        server.add_post(p.clone());

        assert_eq!(
            server.upsert_vote(p.subject(), user(2), Some(VoteDirection::Up)).await,
            Err(Error::PermissionDenied)
        );
        let missing = post(2).subject();
        assert_eq!(
            server.upsert_vote(missing, user(1), Some(VoteDirection::Up)).await,
            Err(Error::NotFound(missing))
        );

        server.fail_next_upserts(1);
        let res = server.upsert_vote(p.subject(), user(1), Some(VoteDirection::Up)).await;
        assert!(matches!(res, Err(e) if e.is_transient()));

        server.set_offline(true);
        assert!(server.fetch_posts(Scope::All).await.is_err());
        server.set_offline(false);
        assert!(server.upserts().is_empty());
    }

    #[tokio::test]
    async fn dump_keeps_votes_and_scopes() {
        let mut server = MockServer::new(user(1));
        let p = post(1);
        let mut other = post(2);
        other.author_id = user(3);
        server.add_post(p.clone());
        server.add_post(other.clone());
        server.add_comment(comment(1, &p));
        server.test_cast_vote(p.subject(), user(5), Some(VoteDirection::Down));

        let mut restored = MockServer::from_dump(server.to_dump());
        let mine = restored
            .fetch_posts(Scope::ByAuthor(user(1)))
            .await
            .expect("fetching");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].votes.len(), 1);
        assert_eq!(mine[0].comment_count, 1);
        assert_eq!(
            restored.fetch_comments(p.id).await.expect("fetching").len(),
            1
        );
        assert_eq!(
            restored.fetch_comments(PostId(Uuid::nil())).await,
            Err(Error::NotFound(SubjectId::Post(PostId(Uuid::nil()))))
        );
    }

    fn new_post(content: &str) -> NewPost {
        NewPost {
            content: String::from(content),
            identity: Identity::anonymous(),
        }
    }

    fn new_reply(post: PostId, parent: Option<CommentId>) -> NewComment {
        NewComment {
            post_id: post,
            parent_id: parent,
            content: String::from("reply"),
            identity: Identity::anonymous(),
        }
    }

    #[tokio::test]
    async fn created_items_belong_to_the_owner() {
        let mut server = MockServer::new(user(1));
        let mut feed = server.change_feed();
        let p = server.create_post(new_post("hello")).await.expect("posting");
        assert_eq!(p.author_id, user(1));
        let c = server
            .create_comment(new_reply(p.id, None))
            .await
            .expect("commenting");

        assert_eq!(feed.recv().await, Some(Change::NewPost(p.id)));
        assert_eq!(
            feed.recv().await,
            Some(Change::NewComment {
                post: p.id,
                comment: c.id
            })
        );
        let posts = server.fetch_posts(Scope::All).await.expect("fetching");
        assert_eq!(posts[0].comment_count, 1);
        assert_eq!(posts[0].identity, Identity::anonymous());
    }

    #[tokio::test]
    async fn rejects_bad_creations() {
        let mut server = MockServer::new(user(1));
        assert_eq!(
            server.create_post(new_post("  \n")).await,
            Err(Error::EmptyContent)
        );
        let missing = PostId(Uuid::nil());
        assert_eq!(
            server.create_comment(new_reply(missing, None)).await,
            Err(Error::NotFound(SubjectId::Post(missing)))
        );

        let p = server.create_post(new_post("first")).await.expect("posting");
        let q = server.create_post(new_post("second")).await.expect("posting");
        let on_q = server
            .create_comment(new_reply(q.id, None))
            .await
            .expect("commenting");
        assert_eq!(
            server.create_comment(new_reply(p.id, Some(on_q.id))).await,
            Err(Error::NotFound(on_q.subject()))
        );
    }

    #[tokio::test]
    async fn deleting_a_comment_orphans_its_replies() {
        let mut server = MockServer::new(user(1));
        let p = server.create_post(new_post("hello")).await.expect("posting");
        let parent = server
            .create_comment(new_reply(p.id, None))
            .await
            .expect("commenting");
        let reply = server
            .create_comment(new_reply(p.id, Some(parent.id)))
            .await
            .expect("replying");
        server.test_cast_vote(parent.subject(), user(4), Some(VoteDirection::Up));

        let mut feed = server.change_feed();
        server.delete_comment(parent.id).await.expect("deleting");
        assert_eq!(
            feed.recv().await,
            Some(Change::CommentDeleted {
                post: p.id,
                comment: parent.id
            })
        );
        let left = server.fetch_comments(p.id).await.expect("fetching");
        assert_eq!(left, vec![reply]);
        assert!(server
            .votes
            .keys()
            .all(|(subject, _)| *subject != parent.subject()));
    }

    #[tokio::test]
    async fn deleting_a_post_takes_its_comments() {
        let mut server = MockServer::new(user(1));
        let p = post(1);
        server.add_post(p.clone());
        server.add_comment(comment(1, &p));
        let mut theirs = post(2);
        theirs.author_id = user(3);
        server.add_post(theirs.clone());

        assert_eq!(
            server.delete_post(theirs.id).await,
            Err(Error::PermissionDenied)
        );
        assert_eq!(
            server.delete_comment(comment(1, &p).id).await,
            Err(Error::PermissionDenied)
        );
        server.delete_post(p.id).await.expect("deleting");
        assert_eq!(
            server.delete_post(p.id).await,
            Err(Error::NotFound(p.subject()))
        );
        assert!(server.comments.is_empty());
        let left = server.fetch_posts(Scope::All).await.expect("fetching");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, theirs.id);
    }
}
