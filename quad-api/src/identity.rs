use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Quiet", "Brave", "Sleepy", "Clever", "Curious", "Mellow", "Swift", "Witty", "Gentle",
    "Lucky", "Sunny", "Cosmic", "Fuzzy", "Bold", "Humble", "Shy",
];

const NOUNS: &[&str] = &[
    "Otter", "Falcon", "Panda", "Comet", "Maple", "Badger", "Koala", "Pebble", "Heron", "Lynx",
    "Walrus", "Cactus", "Raven", "Tiger", "Squid", "Owl",
];

const AVATAR_BASE: &str = "https://api.dicebear.com/7.x/pixel-art/png";
const AVATAR_BACKGROUND: &str = "7c3aed";

/// Name and picture shown instead of the author of a post or comment
///
/// A new identity is picked for every post and comment, so two items by the
/// same author cannot be linked from what is displayed.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Identity {
    pub username: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    /// What is shown for rows stored without an identity
    pub fn anonymous() -> Identity {
        Identity {
            username: String::from("Anonymous"),
            avatar_url: Some(avatar_url("default")),
        }
    }

    /// `<Adjective><Noun><0-999>` with a matching pixel-art avatar
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Identity {
        let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
        let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
        let number = rng.gen_range(0..1000);
        let seed = format!("{:08x}", rng.gen::<u32>());
        Identity {
            username: format!("{adjective}{noun}{number}"),
            avatar_url: Some(avatar_url(&seed)),
        }
    }

    /// The avatar to display, falling back to the default picture
    pub fn avatar(&self) -> String {
        self.avatar_url
            .clone()
            .unwrap_or_else(|| avatar_url("default"))
    }
}

impl Default for Identity {
    fn default() -> Identity {
        Identity::anonymous()
    }
}

fn avatar_url(seed: &str) -> String {
    format!("{AVATAR_BASE}?seed={seed}&backgroundColor={AVATAR_BACKGROUND}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn random_names_follow_the_pattern() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let id = Identity::random(&mut rng);
            let adjective = ADJECTIVES
                .iter()
                .find(|a| id.username.starts_with(**a))
                .expect("starts with an adjective");
            let rest = &id.username[adjective.len()..];
            let noun = NOUNS
                .iter()
                .find(|n| rest.starts_with(**n))
                .expect("then a noun");
            let number: u32 = rest[noun.len()..].parse().expect("ends with a number");
            assert!(number < 1000);
            assert!(id.avatar().starts_with(AVATAR_BASE));
        }
    }

    #[test]
    fn missing_identity_reads_as_anonymous() {
        let id: Identity = serde_json::from_str(r#"{"username":"QuietOtter7"}"#).expect("parsing");
        assert_eq!(id.avatar_url, None);
        assert_eq!(id.avatar(), Identity::anonymous().avatar());
        assert_eq!(Identity::default().username, "Anonymous");
    }
}
