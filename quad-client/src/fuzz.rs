#![cfg(test)]

use std::collections::HashMap;

use crate::{
    api::{Post, SubjectId, VoteDirection},
    stub, tally, CommentNode, RankStrategy,
};

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
struct FuzzVote {
    user: u8,
    up: bool,
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
struct FuzzComment {
    /// Index of the parent comment; may point past the end of the list
    parent: Option<u8>,
    age: u16,
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
struct FuzzPost {
    age: u16,
    ups: u8,
    downs: u8,
}

#[test]
fn tally_ignores_vote_order() {
    bolero::check!()
        .with_type::<(Vec<FuzzVote>, u8)>()
        .cloned()
        .for_each(|(fuzz, rotation)| {
            let s = SubjectId::Post(stub::post_id(0));
            let mut votes = fuzz
                .iter()
                .map(|v| {
                    let dir = match v.up {
                        true => VoteDirection::Up,
                        false => VoteDirection::Down,
                    };
                    stub::vote(s, v.user as u32, dir)
                })
                .collect::<Vec<_>>();
            let expected = tally(&votes);
            let ups = fuzz.iter().filter(|v| v.up).count() as i64;
            assert_eq!(expected, ups - (fuzz.len() as i64 - ups));

            votes.reverse();
            assert_eq!(tally(&votes), expected);
            if !votes.is_empty() {
                let mid = rotation as usize % votes.len();
                votes.rotate_left(mid);
            }
            assert_eq!(tally(&votes), expected);
            votes.sort_by_key(|v| (v.direction, v.user_id));
            assert_eq!(tally(&votes), expected);
        })
}

#[test]
fn every_comment_lands_in_the_forest_once() {
    bolero::check!()
        .with_type::<Vec<FuzzComment>>()
        .cloned()
        .for_each(|fuzz| {
            let comments = fuzz
                .iter()
                .enumerate()
                .map(|(i, c)| stub::comment(i as u32, c.parent.map(|p| p as u32), c.age as i64))
                .collect::<Vec<_>>();
            let roots = CommentNode::build(comments.clone());

            let mut seen = HashMap::new();
            for root in &roots {
                for (_, node) in root.walk() {
                    *seen.entry(node.comment.id).or_insert(0) += 1;
                }
            }
            assert_eq!(seen.len(), comments.len());
            assert!(seen.values().all(|n| *n == 1));
            assert_eq!(
                roots.iter().map(|r| r.count()).sum::<usize>(),
                comments.len()
            );

            for (i, c) in fuzz.iter().enumerate() {
                if let Some(p) = c.parent {
                    if p as usize >= fuzz.len() {
                        let id = stub::comment_id(i as u32);
                        assert!(roots.iter().any(|r| r.comment.id == id), "orphan {i} is not a root");
                    }
                }
            }
        })
}

#[test]
fn ranking_is_deterministic() {
    bolero::check!()
        .with_type::<Vec<FuzzPost>>()
        .cloned()
        .for_each(|fuzz| {
            let posts = fuzz
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    stub::post(i as u32, p.age as i64, (p.ups % 16) as u32, (p.downs % 16) as u32)
                })
                .collect::<Vec<Post>>();
            for strategy in RankStrategy::ALL {
                let ranked = strategy.rank(&posts);
                assert_eq!(ranked, strategy.rank(&posts));
                assert_eq!(ranked.len(), posts.len());
                if strategy == RankStrategy::Recent {
                    assert!(ranked.windows(2).all(|w| w[0].created_at >= w[1].created_at));
                }
            }
        })
}
