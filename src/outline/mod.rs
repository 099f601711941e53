use anyhow::Result;

use crate::model::BookmarkNode;

mod arena;
pub mod builder;
pub mod classify;
pub mod flatten;
pub mod text_toc;
#[cfg(test)]
mod tests;

pub use arena::OutlineArena;

/// Deepest outline level tracked by the flat-list tree builder. Candidates
/// below this depth are attached at this depth instead.
pub const MAX_DEPTH: usize = 10;

/// Destination a bookmark forest is materialized into. Implemented by the PDF
/// document store; tests substitute a recording sink.
pub trait OutlineSink {
    type Handle: Copy;

    /// `page_index` is 0-based. Returns a handle usable as the parent for the
    /// item's children.
    fn add_outline_item(
        &mut self,
        title: &str,
        page_index: u32,
        parent: Option<Self::Handle>,
    ) -> Result<Self::Handle>;
}

/// Pre-order walk over a finished bookmark forest, threading each new handle
/// down as the parent of its children.
pub fn write_tree<S: OutlineSink>(
    sink: &mut S,
    nodes: &[BookmarkNode],
    parent: Option<S::Handle>,
) -> Result<()> {
    for node in nodes {
        let page_index = node.target_page.saturating_sub(1);
        let handle = sink.add_outline_item(&node.title, page_index, parent)?;
        if !node.children.is_empty() {
            write_tree(sink, &node.children, Some(handle))?;
        }
    }
    Ok(())
}

pub fn count_nodes(nodes: &[BookmarkNode]) -> usize {
    nodes
        .iter()
        .map(|node| 1 + count_nodes(&node.children))
        .sum()
}
