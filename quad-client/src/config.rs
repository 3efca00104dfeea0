use std::path::Path;

use anyhow::Context;

use crate::RankStrategy;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Ordering used when the user did not pick one
    pub default_strategy: RankStrategy,

    /// Comments at this depth or deeper get no reply button, roots being at depth 0
    pub max_reply_depth: usize,
}

impl Default for FeedConfig {
    fn default() -> FeedConfig {
        FeedConfig {
            default_strategy: RankStrategy::Recent,
            max_reply_depth: 3,
        }
    }
}

impl FeedConfig {
    pub fn load(path: &Path) -> anyhow::Result<FeedConfig> {
        let data = std::fs::read(path)
            .with_context(|| format!("reading feed config from {path:?}"))?;
        serde_json::from_slice(&data).with_context(|| format!("parsing feed config {path:?}"))
    }

    pub fn can_reply(&self, depth: usize) -> bool {
        depth < self.max_reply_depth
    }
}
