use crate::api::{UserId, Votable, Vote, VoteDirection};

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct VoteCounts {
    pub up: usize,
    pub down: usize,
}

impl VoteCounts {
    pub fn of(votes: &[Vote]) -> VoteCounts {
        votes.iter().fold(VoteCounts::default(), |mut c, v| {
            match v.direction {
                VoteDirection::Up => c.up += 1,
                VoteDirection::Down => c.down += 1,
            }
            c
        })
    }

    pub fn score(&self) -> i64 {
        self.up as i64 - self.down as i64
    }
}

/// Upvotes minus downvotes
pub fn tally(votes: &[Vote]) -> i64 {
    VoteCounts::of(votes).score()
}

/// Sum of the tallies of everything `user` authored among `items`
pub fn karma<'a, I, V>(user: &UserId, items: I) -> i64
where
    I: IntoIterator<Item = &'a V>,
    V: Votable + 'a,
{
    items
        .into_iter()
        .filter(|i| i.author_id() == *user)
        .map(|i| i.score())
        .sum()
}

pub trait TallyExt {
    fn counts(&self) -> VoteCounts;
    fn score(&self) -> i64;
}

impl<T: Votable + ?Sized> TallyExt for T {
    fn counts(&self) -> VoteCounts {
        VoteCounts::of(self.votes())
    }

    fn score(&self) -> i64 {
        tally(self.votes())
    }
}
