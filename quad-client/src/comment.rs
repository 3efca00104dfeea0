use std::{cmp::Reverse, collections::HashMap};

use crate::api::{Comment, CommentId, SubjectId, Time, UserId, Votable, Vote};

/// A comment along with its replies, newest first at every level
///
/// Building, walking, counting and dropping do not recurse, so reply chains
/// of any depth are fine. The derived `Clone`, `PartialEq` and `Debug` do
/// recurse.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Nests a flat list of comments into a forest and returns its roots.
    ///
    /// A comment whose parent is not part of `comments` becomes a root. If
    /// several comments share an id, all of them are kept but replies attach
    /// to the last one. Parent cycles are broken by promoting one of their
    /// members to root, so that every input comment shows up exactly once.
    pub fn build(comments: Vec<Comment>) -> Vec<CommentNode> {
        let mut index = HashMap::with_capacity(comments.len());
        for (i, c) in comments.iter().enumerate() {
            if let Some(prev) = index.insert(c.id, i) {
                tracing::warn!(id = ?c.id, prev, i, "duplicate comment id");
            }
        }

        let mut children = vec![Vec::new(); comments.len()];
        let mut roots = Vec::new();
        for (i, c) in comments.iter().enumerate() {
            match c.parent_id {
                None => roots.push(i),
                Some(parent) => match index.get(&parent) {
                    Some(&p) => children[p].push(i),
                    None => {
                        tracing::warn!(id = ?c.id, ?parent, "parent comment not found, showing as top-level");
                        roots.push(i);
                    }
                },
            }
        }

        let mut slots = comments.into_iter().map(Some).collect::<Vec<_>>();
        let mut pending = vec![Vec::new(); slots.len()];
        let mut forest = Vec::with_capacity(roots.len());
        for i in roots {
            forest.extend(assemble(i, &mut slots, &children, &mut pending));
        }

        // Anything left is only reachable from a parent cycle
        for i in 0..slots.len() {
            if let Some(id) = slots[i].as_ref().map(|c| c.id) {
                tracing::warn!(?id, "comment is part of a parent cycle, showing as top-level");
                forest.extend(assemble(i, &mut slots, &children, &mut pending));
            }
        }

        newest_first(forest)
    }

    /// Number of comments in this subtree, self included
    pub fn count(&self) -> usize {
        self.walk().count()
    }

    /// Pre-order traversal, yielding each node with its depth relative to `self`
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }

    pub fn find_in<'a>(nodes: &'a [CommentNode], id: &CommentId) -> Option<&'a CommentNode> {
        nodes
            .iter()
            .flat_map(|n| n.walk())
            .map(|(_, n)| n)
            .find(|n| n.comment.id == *id)
    }
}

/// Builds the tree rooted at slot `start`, taking every comment it reaches
/// out of `slots`.
///
/// Nodes are visited in pre-order, then built in reverse so that every
/// reply is finished before its parent. Finished nodes wait in
/// `pending[parent]`, tagged with their input position.
fn assemble(
    start: usize,
    slots: &mut [Option<Comment>],
    children: &[Vec<usize>],
    pending: &mut [Vec<(usize, CommentNode)>],
) -> Option<(usize, CommentNode)> {
    let mut visited = Vec::new();
    let mut stack = vec![(start, None)];
    while let Some((i, parent)) = stack.pop() {
        let Some(comment) = slots[i].take() else {
            continue;
        };
        visited.push((i, parent, comment));
        stack.extend(children[i].iter().map(|&c| (c, Some(i))));
    }

    let mut root = None;
    while let Some((i, parent, comment)) = visited.pop() {
        let replies = newest_first(std::mem::take(&mut pending[i]));
        let node = CommentNode { comment, replies };
        match parent {
            Some(p) => pending[p].push((i, node)),
            None => root = Some((i, node)),
        }
    }
    root
}

/// Orders nodes newest first, falling back to input order on equal dates
fn newest_first(mut nodes: Vec<(usize, CommentNode)>) -> Vec<CommentNode> {
    nodes.sort_by_key(|(i, n)| (Reverse(n.comment.created_at), *i));
    nodes.into_iter().map(|(_, n)| n).collect()
}

pub struct Walk<'a> {
    stack: Vec<(usize, &'a CommentNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a CommentNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.replies.iter().rev().map(|r| (depth + 1, r)));
        Some((depth, node))
    }
}

// Dropping a deep tree field by field would recurse once per level
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.replies);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.replies);
        }
    }
}

impl Votable for CommentNode {
    fn subject(&self) -> SubjectId {
        self.comment.subject()
    }

    fn author_id(&self) -> UserId {
        self.comment.author_id
    }

    fn created_at(&self) -> Time {
        self.comment.created_at
    }

    fn votes(&self) -> &[Vote] {
        &self.comment.votes
    }
}
