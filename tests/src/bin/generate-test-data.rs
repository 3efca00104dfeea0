use chrono::{Duration, Utc};
use quad_api::{Comment, CommentId, Identity, Post, PostId, SubjectId, UserId, Vote, VoteDirection};
use quad_mock_server::Dump;
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

const NUM_USERS: usize = 25;

const NUM_POSTS: usize = 40;
const POST_WORD_COUNT: usize = 30;

const MAX_COMMENTS_PER_POST: usize = 12;
const COMMENT_WORD_COUNT: usize = 15;

// Chance that a comment replies to an earlier one rather than to the post
const REPLY_PROBABILITY: f64 = 0.6;
// Chance that a reply points at a comment that got deleted
const ORPHAN_PROBABILITY: f64 = 0.05;

const MAX_VOTERS: usize = 20;
const UPVOTE_PROBABILITY: f64 = 0.65;

const MAX_AGE_HOURS: i64 = 24 * 14;

fn gen_votes(rng: &mut impl Rng, subject: SubjectId, users: &[UserId]) -> Vec<Vote> {
    let n = rng.gen_range(0..=MAX_VOTERS.min(users.len()));
    users
        .choose_multiple(rng, n)
        .map(|&user_id| Vote {
            subject,
            user_id,
            direction: match rng.gen_bool(UPVOTE_PROBABILITY) {
                true => VoteDirection::Up,
                false => VoteDirection::Down,
            },
            created_at: Utc::now() - Duration::minutes(rng.gen_range(0..60 * MAX_AGE_HOURS)),
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    let users = (0..NUM_USERS)
        .map(|_| UserId(Uuid::new_v4()))
        .collect::<Vec<_>>();

    let mut posts = Vec::with_capacity(NUM_POSTS);
    let mut comments = Vec::new();
    for _ in 0..NUM_POSTS {
        let id = PostId(Uuid::new_v4());
        let created_at = now - Duration::hours(rng.gen_range(1..MAX_AGE_HOURS));
        let votes = gen_votes(&mut rng, SubjectId::Post(id), &users);

        let mut thread: Vec<Comment> = Vec::new();
        for i in 0..rng.gen_range(0..=MAX_COMMENTS_PER_POST) {
            let comment_id = CommentId(Uuid::new_v4());
            let parent_id = match (i, rng.gen_bool(REPLY_PROBABILITY)) {
                (0, _) | (_, false) => None,
                (_, true) if rng.gen_bool(ORPHAN_PROBABILITY) => Some(CommentId(Uuid::new_v4())),
                (_, true) => Some(thread[rng.gen_range(0..thread.len())].id),
            };
            thread.push(Comment {
                id: comment_id,
                post_id: id,
                parent_id,
                content: lipsum::lipsum_words(rng.gen_range(3..COMMENT_WORD_COUNT)),
                author_id: users[rng.gen_range(0..users.len())],
                created_at: created_at + Duration::minutes(10 * (i as i64 + 1)),
                identity: Identity::random(&mut rng),
                votes: gen_votes(&mut rng, SubjectId::Comment(comment_id), &users),
            });
        }

        posts.push(Post {
            id,
            author_id: users[rng.gen_range(0..users.len())],
            content: lipsum::lipsum_words(rng.gen_range(5..POST_WORD_COUNT)),
            created_at,
            identity: Identity::random(&mut rng),
            votes,
            comment_count: thread.len(),
        });
        comments.extend(thread);
    }

    let dump = Dump {
        owner: users[0],
        posts,
        comments,
    };
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}
