use std::path::PathBuf;

use anyhow::Context;
use quad_api::{
    CommentId, Identity, NewComment, NewPost, PostId, Scope, SubjectId, UserId, Uuid,
    VoteDirection,
};
use quad_client::{prelude::*, AckOutcome, CommentNode, FeedConfig, FeedDump, RankStrategy};
use quad_mock_server::{Dump, MockServer};
use tracing_subscriber::EnvFilter;

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON dump the feed is served from
    #[structopt(short, long)]
    dump: PathBuf,

    /// JSON feed configuration
    #[structopt(short, long)]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// List posts
    Feed {
        /// One of recent, popular, controversial
        #[structopt(short, long)]
        strategy: Option<RankStrategy>,
    },

    /// Show the comments of a post
    Thread {
        post: Uuid,

        /// Ordering of top-level comments
        #[structopt(short, long)]
        strategy: Option<RankStrategy>,
    },

    /// Show a user's karma
    Karma { user: Uuid },

    /// Vote as the dump's owner and save the dump
    Vote {
        subject: Uuid,

        /// The subject is a comment rather than a post
        #[structopt(long)]
        comment: bool,

        #[structopt(long)]
        down: bool,
    },

    /// Post as the dump's owner under a fresh anonymous identity
    Post { content: String },

    /// Comment on a post as the dump's owner under a fresh anonymous identity
    Comment {
        post: Uuid,

        /// Comment being replied to
        #[structopt(long)]
        parent: Option<Uuid>,

        content: String,
    },

    /// Delete a post, or a comment, of the dump's owner
    Delete {
        id: Uuid,

        /// The id is a comment rather than a post
        #[structopt(long)]
        comment: bool,
    },

    /// List the available orderings
    Strategies,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let config = match &opt.config {
        Some(path) => FeedConfig::load(path)?,
        None => FeedConfig::default(),
    };
    let mut server = MockServer::from_dump(Dump::load(&opt.dump)?);
    let mut db = FeedDump::fetch(&mut server, Scope::All)
        .await
        .context("fetching feed")?;

    match opt.cmd {
        Command::Feed { strategy } => {
            let strategy = strategy.unwrap_or(config.default_strategy);
            for p in db.ranked_posts(strategy) {
                let counts = p.counts();
                println!(
                    "{:>5} (+{}/-{}) {} {} [{} comments] {}",
                    p.score(),
                    counts.up,
                    counts.down,
                    p.identity.username,
                    p.created_at.format("%Y-%m-%d %H:%M"),
                    p.comment_count,
                    p.id.0,
                );
                println!("      {}", first_line(&p.content));
            }
        }
        Command::Thread { post, strategy } => {
            let post = PostId(post);
            db.refresh_thread(&mut server, post)
                .await
                .with_context(|| format!("fetching comments of post {}", post.0))?;
            let strategy = strategy.unwrap_or(config.default_strategy);
            for root in db.ranked_thread(&post, strategy) {
                print_thread(&root, &config);
            }
        }
        Command::Karma { user } => {
            for p in db.posts.keys().copied().collect::<Vec<_>>() {
                db.refresh_thread(&mut server, p)
                    .await
                    .with_context(|| format!("fetching comments of post {}", p.0))?;
            }
            println!("{}", db.karma(&UserId(user)));
        }
        Command::Vote {
            subject,
            comment,
            down,
        } => {
            let subject = match comment {
                true => SubjectId::Comment(CommentId(subject)),
                false => SubjectId::Post(PostId(subject)),
            };
            if let SubjectId::Comment(_) = subject {
                for p in db.posts.keys().copied().collect::<Vec<_>>() {
                    db.refresh_thread(&mut server, p).await?;
                }
            }
            let direction = match down {
                true => VoteDirection::Down,
                false => VoteDirection::Up,
            };
            match db.vote(&mut server, subject, direction).await? {
                AckOutcome::Confirmed => (),
                AckOutcome::Stale => tracing::warn!(?subject, "vote response was superseded"),
            }
            println!(
                "{} ({:?})",
                db.displayed_score(&subject).unwrap_or(0),
                db.displayed_direction(&subject),
            );
            server.to_dump().save(&opt.dump)?;
        }
        Command::Post { content } => {
            let identity = Identity::random(&mut rand::thread_rng());
            let post = db
                .create_post(&mut server, NewPost { content, identity })
                .await
                .context("creating post")?;
            println!("{} {}", post.identity.username, post.id.0);
            server.to_dump().save(&opt.dump)?;
        }
        Command::Comment {
            post,
            parent,
            content,
        } => {
            let comment = NewComment {
                post_id: PostId(post),
                parent_id: parent.map(CommentId),
                content,
                identity: Identity::random(&mut rand::thread_rng()),
            };
            let comment = db
                .create_comment(&mut server, comment)
                .await
                .with_context(|| format!("commenting on post {post}"))?;
            println!("{} {}", comment.identity.username, comment.id.0);
            server.to_dump().save(&opt.dump)?;
        }
        Command::Delete { id, comment } => {
            match comment {
                true => {
                    for p in db.posts.keys().copied().collect::<Vec<_>>() {
                        db.refresh_thread(&mut server, p).await?;
                    }
                    db.delete_comment(&mut server, CommentId(id))
                        .await
                        .with_context(|| format!("deleting comment {id}"))?;
                }
                false => db
                    .delete_post(&mut server, PostId(id))
                    .await
                    .with_context(|| format!("deleting post {id}"))?,
            }
            server.to_dump().save(&opt.dump)?;
        }
        Command::Strategies => {
            for s in RankStrategy::ALL {
                println!("{:<14} {:<13} {}", s.id(), s.label(), s.description());
            }
        }
    }

    Ok(())
}

fn print_thread(root: &CommentNode, config: &FeedConfig) {
    for (depth, node) in root.walk() {
        let reply = match config.can_reply(depth) {
            true => " [reply]",
            false => "",
        };
        println!(
            "{:indent$}{:>4} {}: {}{} {}",
            "",
            node.score(),
            node.comment.identity.username,
            first_line(&node.comment.content),
            reply,
            node.comment.id.0,
            indent = depth * 2,
        );
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}
