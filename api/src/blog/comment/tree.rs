use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use super::{Comment, CommentId, CommentNode};

pub const MAX_PAGE_SIZE: usize = 100;

/// Deepest nesting a reply can have, roots are at depth 0.
pub const MAX_REPLY_DEPTH: usize = 32;

/// A window over the sorted root comments. Replies always travel with their root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub size: usize,
}

/// Where a comment ends up in the built tree
#[derive(Debug, Clone, Copy)]
struct Placement {
    parent: Option<usize>,
    depth: usize,
}

/// Turns the flat comments of a post into reply trees.
///
/// Replies keep the order they came in, so `comments` is expected to be
/// ordered by `created_at`. Only the roots are sorted: pinned roots first,
/// then oldest first. A comment whose parent is not in `comments` (or is the
/// comment itself) becomes a root, and parent cycles are cut so that every
/// comment shows up exactly once. Replies nested deeper than
/// [`MAX_REPLY_DEPTH`] are shown next to their parent at the deepest level.
pub fn build_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    // Index by id so that linking children to parents is O(n) instead of O(n^2)
    let index: HashMap<CommentId, usize> = comments
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots: Vec<usize> = vec![];

    for (i, comment) in comments.iter().enumerate() {
        match comment.parent_id.and_then(|parent_id| index.get(&parent_id)) {
            Some(&parent) if parent != i => children[parent].push(i),
            _ => roots.push(i),
        }
    }

    let mut placements: Vec<Option<Placement>> = vec![None; comments.len()];
    let mut top: Vec<usize> = roots
        .into_iter()
        .filter(|&i| place_subtree(i, &children, &mut placements))
        .collect();

    // Anything still unplaced is only reachable through a parent cycle,
    // promote the first member of each cycle to a root
    for i in 0..comments.len() {
        if place_subtree(i, &children, &mut placements) {
            tracing::warn!(comment_id = comments[i].id, "Comment is part of a reply cycle");
            top.push(i);
        }
    }

    // Rebuilt in input order so replies keep the store order after flattening
    let mut replies: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    for (i, placement) in placements.iter().enumerate() {
        if let Some(Placement {
            parent: Some(parent),
            ..
        }) = placement
        {
            replies[*parent].push(i);
        }
    }

    let mut slots: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();

    let mut nodes: Vec<CommentNode> = top
        .into_iter()
        .filter_map(|i| take_subtree(i, &replies, &mut slots))
        .collect();

    sort_roots(&mut nodes);
    nodes
}

/// Places `start` as a root and everything reachable below it, without
/// recursing. Returns false when `start` was already placed.
fn place_subtree(
    start: usize,
    children: &[Vec<usize>],
    placements: &mut [Option<Placement>],
) -> bool {
    if placements[start].is_some() {
        return false;
    }

    let root = Placement {
        parent: None,
        depth: 0,
    };
    placements[start] = Some(root);

    let mut stack = vec![(start, root)];
    while let Some((i, placement)) = stack.pop() {
        // at the depth cap replies become siblings of `i` instead of children
        let below = match placement.parent {
            Some(_) if placement.depth >= MAX_REPLY_DEPTH => placement,
            _ => Placement {
                parent: Some(i),
                depth: placement.depth + 1,
            },
        };

        for &child in &children[i] {
            if placements[child].is_none() {
                placements[child] = Some(below);
                stack.push((child, below));
            }
        }
    }

    true
}

/// Recursion is bounded by [`MAX_REPLY_DEPTH`] once `tree` comes from
/// [`place_subtree`].
fn take_subtree(
    i: usize,
    tree: &[Vec<usize>],
    slots: &mut [Option<Comment>],
) -> Option<CommentNode> {
    let comment = slots[i].take()?;
    let replies = tree[i]
        .iter()
        .filter_map(|&child| take_subtree(child, tree, slots))
        .collect();

    Some(CommentNode { comment, replies })
}

fn sort_roots(roots: &mut [CommentNode]) {
    // sort_by_key is stable: equal pin state and timestamp keep the store order
    roots.sort_by_key(|node| (!is_pinned_root(&node.comment), node.comment.created_at));
}

/// Pinning only counts on real roots, orphaned replies that ended up at the
/// top level are never pinned first.
fn is_pinned_root(comment: &Comment) -> bool {
    comment.is_root() && comment.is_pinned
}

/// Returns `id` followed by all of its transitive replies.
pub fn subtree_ids(comments: &[Comment], id: CommentId) -> Vec<CommentId> {
    let mut replies: HashMap<CommentId, Vec<CommentId>> = HashMap::new();
    for comment in comments {
        if let Some(parent_id) = comment.parent_id
            && parent_id != comment.id
        {
            replies.entry(parent_id).or_default().push(comment.id);
        }
    }

    let mut seen = HashSet::new();
    let mut result = vec![];
    let mut stack = vec![id];

    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }

        result.push(current);
        if let Some(children) = replies.get(&current) {
            stack.extend(children.iter().rev());
        }
    }

    result
}

/// Counts the ancestors of `id` that are present in `comments`, the same
/// depth [`build_tree`] would give it.
pub fn reply_depth(comments: &[Comment], id: CommentId) -> usize {
    let parents: HashMap<CommentId, Option<CommentId>> =
        comments.iter().map(|c| (c.id, c.parent_id)).collect();

    let mut seen = HashSet::from([id]);
    let mut current = id;
    let mut depth = 0;

    while let Some(Some(parent_id)) = parents.get(&current) {
        if !parents.contains_key(parent_id) || !seen.insert(*parent_id) {
            break;
        }
        depth += 1;
        current = *parent_id;
    }

    depth
}

pub fn paginate(roots: Vec<CommentNode>, page: Page) -> Vec<CommentNode> {
    let size = page.size.clamp(1, MAX_PAGE_SIZE);
    roots.into_iter().skip(page.offset).take(size).collect()
}
