use std::{cmp::Reverse, fmt, str::FromStr};

use anyhow::anyhow;

use crate::{api::Votable, TallyExt};

/// How a list of posts or top-level comments gets ordered
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RankStrategy {
    /// Newest first
    #[default]
    Recent,

    /// Highest net score first, newest first among equal scores
    Popular,

    /// Most downvotes first, regardless of upvotes, newest first among ties
    Controversial,
}

impl RankStrategy {
    pub const ALL: [RankStrategy; 3] = [
        RankStrategy::Recent,
        RankStrategy::Popular,
        RankStrategy::Controversial,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            RankStrategy::Recent => "recent",
            RankStrategy::Popular => "popular",
            RankStrategy::Controversial => "controversial",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RankStrategy::Recent => "Most Recent",
            RankStrategy::Popular => "Most Popular",
            RankStrategy::Controversial => "Controversial",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RankStrategy::Recent => "Show newest posts first",
            RankStrategy::Popular => "Sort by highest score",
            RankStrategy::Controversial => "Posts with most downvotes",
        }
    }

    /// Stable: items that tie on every key keep their relative order
    pub fn sort<T: Votable>(&self, items: &mut [T]) {
        match self {
            RankStrategy::Recent => items.sort_by_key(|i| Reverse(i.created_at())),
            RankStrategy::Popular => {
                items.sort_by_cached_key(|i| (Reverse(i.score()), Reverse(i.created_at())))
            }
            RankStrategy::Controversial => {
                items.sort_by_cached_key(|i| (Reverse(i.counts().down), Reverse(i.created_at())))
            }
        }
    }

    pub fn rank<T: Votable + Clone>(&self, items: &[T]) -> Vec<T> {
        let mut res = items.to_vec();
        self.sort(&mut res);
        res
    }
}

impl fmt::Display for RankStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for RankStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<RankStrategy> {
        RankStrategy::ALL
            .into_iter()
            .find(|r| r.id() == s)
            .ok_or_else(|| anyhow!("unknown ranking strategy {s:?}"))
    }
}
