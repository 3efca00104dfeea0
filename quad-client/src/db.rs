use std::{
    collections::{hash_map, HashMap, HashSet},
    sync::Arc,
};

use crate::{
    api::{
        self, Backend, Change, Comment, CommentId, NewComment, NewPost, Post, PostId, Scope,
        SubjectId, UserId, VotableKind, Vote, VoteDirection,
    },
    karma, AckOutcome, CommentNode, Error, OptimisticVoteController, RankStrategy, VoteAttempt,
};

/// Everything one user session fetched, along with its in-flight votes
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeedDump {
    pub owner: UserId,

    /// What `fetch` asked for, and what new posts are looked up in
    pub scope: Scope,

    pub posts: Arc<HashMap<PostId, Arc<Post>>>,

    /// Flat comment lists, as fetched, by post
    pub comments: Arc<HashMap<PostId, Vec<Comment>>>,

    votes: HashMap<SubjectId, OptimisticVoteController>,
}

/// The backend's answer to a `VoteAttempt`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteAck {
    pub attempt: VoteAttempt,
    pub result: Result<(), api::Error>,
}

impl FeedDump {
    pub fn new(owner: UserId) -> FeedDump {
        FeedDump {
            owner,
            scope: Scope::All,
            posts: Arc::new(HashMap::new()),
            comments: Arc::new(HashMap::new()),
            votes: HashMap::new(),
        }
    }

    pub fn stub() -> FeedDump {
        FeedDump::new(UserId::stub())
    }

    pub async fn fetch<B: Backend + ?Sized>(
        backend: &mut B,
        scope: Scope,
    ) -> Result<FeedDump, Error> {
        let mut db = FeedDump::new(backend.current_user());
        db.scope = scope;
        db.refresh_posts(backend, scope).await?;
        Ok(db)
    }

    pub async fn refresh_posts<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        scope: Scope,
    ) -> Result<(), Error> {
        let posts = backend.fetch_posts(scope).await?;
        tracing::info!(num_posts = posts.len(), ?scope, "fetched posts");
        self.replace_posts(scope, posts);
        Ok(())
    }

    pub async fn refresh_thread<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        post: PostId,
    ) -> Result<(), Error> {
        let comments = backend.fetch_comments(post).await?;
        tracing::info!(num_comments = comments.len(), ?post, "fetched comments");
        self.add_comments(post, comments);
        Ok(())
    }

    /// Re-fetches only the votes of already known items, rows for anything
    /// else are ignored
    pub async fn refresh_votes<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        kind: VotableKind,
        scope: Scope,
    ) -> Result<(), Error> {
        let rows = backend.fetch_votables(kind, scope).await?;
        tracing::info!(num_rows = rows.len(), ?kind, "fetched votes");
        for row in rows {
            if !self.votes.contains_key(&row.subject) {
                continue;
            }
            self.rebase_votes(row.subject, &row.votes);
            self.store_votes(row.subject, row.votes);
        }
        Ok(())
    }

    /// Replaces the posts covered by `scope` with `posts`. Known posts in
    /// `scope` that are not in `posts` are gone from the backend, so they are
    /// dropped along with their comments.
    pub fn replace_posts(&mut self, scope: Scope, posts: Vec<Post>) {
        for p in &posts {
            self.rebase_votes(SubjectId::Post(p.id), &p.votes);
        }
        let fetched = posts.iter().map(|p| p.id).collect::<HashSet<_>>();
        let gone = self
            .posts
            .values()
            .filter(|p| scope.covers_post(p) && !fetched.contains(&p.id))
            .map(|p| p.id)
            .collect::<Vec<_>>();
        for id in &gone {
            tracing::debug!(post = ?id, "post is gone from the backend");
            self.forget_post(id);
        }
        Arc::make_mut(&mut self.posts).extend(posts.into_iter().map(|p| (p.id, Arc::new(p))));
        self.prune_votes();
    }

    /// Replaces the comments known for `post`
    pub fn add_comments(&mut self, post: PostId, comments: Vec<Comment>) {
        for c in &comments {
            self.rebase_votes(SubjectId::Comment(c.id), &c.votes);
        }
        if let Some(p) = Arc::make_mut(&mut self.posts).get_mut(&post) {
            Arc::make_mut(p).comment_count = comments.len();
        }
        Arc::make_mut(&mut self.comments).insert(post, comments);
        self.prune_votes();
    }

    /// Brings the dump up to date with one change announced by the backend.
    /// Pending votes survive, like for any other refresh.
    pub async fn apply_change<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        change: &Change,
    ) -> Result<(), Error> {
        tracing::debug!(?change, "applying backend change");
        match *change {
            Change::NewPost(_) => {
                let scope = self.scope;
                self.refresh_posts(backend, scope).await
            }
            Change::PostDeleted(post) => {
                if self.posts.contains_key(&post) {
                    self.refresh_posts(backend, Scope::OnPost(post)).await?;
                }
                Ok(())
            }
            Change::NewComment { post, .. } | Change::CommentDeleted { post, .. } => {
                if !self.posts.contains_key(&post) {
                    return Ok(());
                }
                // the post row carries the comment count
                self.refresh_posts(backend, Scope::OnPost(post)).await?;
                if self.posts.contains_key(&post) && self.comments.contains_key(&post) {
                    self.refresh_thread(backend, post).await?;
                }
                Ok(())
            }
            Change::VoteChanged(subject) => {
                let post = match subject {
                    SubjectId::Post(p) => Some(p).filter(|p| self.posts.contains_key(p)),
                    SubjectId::Comment(c) => self.post_of(&c),
                };
                let kind = match subject {
                    SubjectId::Post(_) => VotableKind::Post,
                    SubjectId::Comment(_) => VotableKind::Comment,
                };
                match post {
                    Some(p) => self.refresh_votes(backend, kind, Scope::OnPost(p)).await,
                    None => Ok(()),
                }
            }
        }
    }

    pub async fn create_post<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        post: NewPost,
    ) -> Result<Arc<Post>, Error> {
        let post = backend.create_post(post).await?;
        tracing::info!(id = ?post.id, username = %post.identity.username, "created post");
        self.rebase_votes(SubjectId::Post(post.id), &post.votes);
        let post = Arc::new(post);
        Arc::make_mut(&mut self.posts).insert(post.id, post.clone());
        Ok(post)
    }

    /// Creates a comment, and shows it right away if its thread is loaded
    pub async fn create_comment<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        comment: NewComment,
    ) -> Result<Comment, Error> {
        let comment = backend.create_comment(comment).await?;
        tracing::info!(id = ?comment.id, post = ?comment.post_id, "created comment");
        if let Some(p) = Arc::make_mut(&mut self.posts).get_mut(&comment.post_id) {
            Arc::make_mut(p).comment_count += 1;
        }
        if let Some(thread) = Arc::make_mut(&mut self.comments).get_mut(&comment.post_id) {
            thread.push(comment.clone());
            self.rebase_votes(SubjectId::Comment(comment.id), &comment.votes);
        }
        Ok(comment)
    }

    pub async fn delete_post<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        post: PostId,
    ) -> Result<(), Error> {
        backend.delete_post(post).await?;
        tracing::info!(?post, "deleted post");
        self.forget_post(&post);
        self.prune_votes();
        Ok(())
    }

    /// Deletes a comment. Its replies stay, and show as top-level comments
    /// from then on.
    pub async fn delete_comment<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        comment: CommentId,
    ) -> Result<(), Error> {
        backend.delete_comment(comment).await?;
        tracing::info!(?comment, "deleted comment");
        if let Some(post) = self.post_of(&comment) {
            if let Some(thread) = Arc::make_mut(&mut self.comments).get_mut(&post) {
                thread.retain(|c| c.id != comment);
            }
            if let Some(p) = Arc::make_mut(&mut self.posts).get_mut(&post) {
                let p = Arc::make_mut(p);
                p.comment_count = p.comment_count.saturating_sub(1);
            }
        }
        self.prune_votes();
        Ok(())
    }

    /// Posts in `strategy` order; ties are broken by id so that the result
    /// does not depend on hashing
    pub fn ranked_posts(&self, strategy: RankStrategy) -> Vec<Arc<Post>> {
        let mut res = self.posts.values().cloned().collect::<Vec<_>>();
        res.sort_by_key(|p| p.id);
        strategy.sort(&mut res);
        res
    }

    /// Comment forest of `post`, newest first at every level
    pub fn thread(&self, post: &PostId) -> Vec<CommentNode> {
        CommentNode::build(self.comments.get(post).cloned().unwrap_or_default())
    }

    /// Comment forest of `post` with top-level comments in `strategy` order
    pub fn ranked_thread(&self, post: &PostId, strategy: RankStrategy) -> Vec<CommentNode> {
        let mut roots = self.thread(post);
        strategy.sort(&mut roots);
        roots
    }

    pub fn vote_controller(&self, subject: &SubjectId) -> Option<&OptimisticVoteController> {
        self.votes.get(subject)
    }

    /// Score to show for `subject`, including the user's pending vote
    pub fn displayed_score(&self, subject: &SubjectId) -> Option<i64> {
        self.votes.get(subject).map(|c| c.displayed_tally())
    }

    pub fn displayed_direction(&self, subject: &SubjectId) -> Option<VoteDirection> {
        self.votes
            .get(subject)
            .and_then(|c| c.displayed_direction())
    }

    pub fn tap(&mut self, subject: SubjectId, direction: VoteDirection) -> Result<VoteAttempt, Error> {
        let c = self
            .votes
            .get_mut(&subject)
            .ok_or(api::Error::NotFound(subject))?;
        Ok(c.tap(direction))
    }

    /// Sends `attempt` to the backend. This does not borrow the dump, so that
    /// several attempts can be in flight while the session keeps running.
    pub async fn submit<B: Backend + ?Sized>(backend: &mut B, attempt: VoteAttempt) -> VoteAck {
        let result = backend
            .upsert_vote(attempt.subject, attempt.user, attempt.direction)
            .await;
        if let Err(err) = &result {
            tracing::warn!(subject = ?attempt.subject, attempt = ?attempt.attempt, %err, "vote submission failed");
        }
        VoteAck { attempt, result }
    }

    pub fn apply_ack(&mut self, ack: VoteAck) -> Result<AckOutcome, Error> {
        let subject = ack.attempt.subject;
        let c = match self.votes.get_mut(&subject) {
            Some(c) => c,
            None => {
                tracing::warn!(?subject, "got vote response for unknown subject");
                return Ok(AckOutcome::Stale);
            }
        };
        let outcome = c.acknowledge(ack.attempt.attempt, ack.result)?;
        if outcome == AckOutcome::Confirmed {
            let votes = c.server_votes().to_vec();
            self.store_votes(subject, votes);
        }
        Ok(outcome)
    }

    /// Tap, submit and apply the answer in one go
    pub async fn vote<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        subject: SubjectId,
        direction: VoteDirection,
    ) -> Result<AckOutcome, Error> {
        let attempt = self.tap(subject, direction)?;
        let ack = FeedDump::submit(backend, attempt).await;
        self.apply_ack(ack)
    }

    /// Sum of the scores of everything `user` authored in this dump
    pub fn karma(&self, user: &UserId) -> i64 {
        karma(user, self.posts.values()) + karma(user, self.comments.values().flatten())
    }
}

impl FeedDump {
    fn post_of(&self, comment: &CommentId) -> Option<PostId> {
        self.comments
            .iter()
            .find(|(_, thread)| thread.iter().any(|c| c.id == *comment))
            .map(|(post, _)| *post)
    }

    fn forget_post(&mut self, post: &PostId) {
        Arc::make_mut(&mut self.posts).remove(post);
        if self.comments.contains_key(post) {
            Arc::make_mut(&mut self.comments).remove(post);
        }
    }

    /// Drops the controllers of items no longer in the dump, unless a tap on
    /// them is still in flight
    fn prune_votes(&mut self) {
        let known = self
            .posts
            .keys()
            .map(|p| SubjectId::Post(*p))
            .chain(
                self.comments
                    .values()
                    .flatten()
                    .map(|c| SubjectId::Comment(c.id)),
            )
            .collect::<HashSet<_>>();
        let before = self.votes.len();
        self.votes
            .retain(|subject, c| known.contains(subject) || c.is_pending());
        let pruned = before - self.votes.len();
        if pruned > 0 {
            tracing::debug!(pruned, "dropped votes of vanished items");
        }
    }

    fn rebase_votes(&mut self, subject: SubjectId, votes: &[Vote]) {
        match self.votes.entry(subject) {
            hash_map::Entry::Occupied(mut e) => e.get_mut().rebase(votes.to_vec()),
            hash_map::Entry::Vacant(e) => {
                e.insert(OptimisticVoteController::new(
                    subject,
                    self.owner,
                    votes.to_vec(),
                ));
            }
        }
    }

    fn store_votes(&mut self, subject: SubjectId, votes: Vec<Vote>) {
        match subject {
            SubjectId::Post(id) => {
                if let Some(p) = Arc::make_mut(&mut self.posts).get_mut(&id) {
                    Arc::make_mut(p).votes = votes;
                }
            }
            SubjectId::Comment(id) => {
                for c in Arc::make_mut(&mut self.comments)
                    .values_mut()
                    .flat_map(|v| v.iter_mut())
                    .filter(|c| c.id == id)
                {
                    c.votes = votes.clone();
                }
            }
        }
    }
}
