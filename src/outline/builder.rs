use crate::model::{BookmarkNode, HeadingCandidate};
use crate::outline::{MAX_DEPTH, OutlineArena};

/// Reconstructs a bookmark forest from a flat, level-tagged candidate list.
///
/// The candidates must already be in document order (sorted by page and
/// vertical position). A single left-to-right pass keeps the most recently
/// inserted node per level; each candidate attaches under the last node one
/// level up, or under the root when that slot is empty. Inserting at level L
/// invalidates every slot deeper than L: those chains are closed by the new
/// heading and may not adopt later candidates.
pub fn build_tree(candidates: &[HeadingCandidate]) -> Vec<BookmarkNode> {
    let mut arena = OutlineArena::new();
    let mut last_node_at_level: [Option<usize>; MAX_DEPTH] = [None; MAX_DEPTH];

    for candidate in candidates {
        let level = (candidate.level.max(1) as usize).min(MAX_DEPTH);

        let parent = if level == 1 {
            None
        } else {
            last_node_at_level[level - 2]
        };

        let id = arena.insert(parent, candidate.title.clone(), candidate.page_index + 1);

        last_node_at_level[level - 1] = Some(id);
        for slot in last_node_at_level.iter_mut().skip(level) {
            *slot = None;
        }
    }

    arena.into_forest()
}

/// Document order for heading candidates: page, then distance from page top.
pub fn sort_candidates(candidates: &mut [HeadingCandidate]) {
    candidates.sort_by(|a, b| {
        a.page_index
            .cmp(&b.page_index)
            .then(a.y_from_top.total_cmp(&b.y_from_top))
    });
}
