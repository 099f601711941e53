use crate::model::BookmarkNode;

/// Growable node store used while a tree is under construction. Structure is
/// carried as arena indices, so lookaside tables (the insertion stack of the
/// text parser, the per-level table of the flat-list builder) hold plain
/// `usize` values instead of references into a tree that is still moving.
#[derive(Debug, Default)]
pub struct OutlineArena {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
}

#[derive(Debug)]
struct ArenaNode {
    title: String,
    target_page: u32,
    children: Vec<usize>,
}

impl OutlineArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a node under `parent` (or at the root for `None`) and returns
    /// its index. Children always carry a larger index than their parent.
    pub fn insert(&mut self, parent: Option<usize>, title: String, target_page: u32) -> usize {
        let id = self.nodes.len();
        self.nodes.push(ArenaNode {
            title,
            target_page,
            children: Vec::new(),
        });

        match parent {
            Some(parent_id) if parent_id < id => self.nodes[parent_id].children.push(id),
            _ => self.roots.push(id),
        }

        id
    }

    /// Materializes the owned forest. Children are built before their parent
    /// by walking indices in reverse.
    pub fn into_forest(mut self) -> Vec<BookmarkNode> {
        let mut materialized: Vec<Option<BookmarkNode>> = Vec::new();
        materialized.resize_with(self.nodes.len(), || None);

        while let Some(node) = self.nodes.pop() {
            let id = self.nodes.len();
            let children = node
                .children
                .iter()
                .filter_map(|&child| materialized[child].take())
                .collect();
            materialized[id] = Some(BookmarkNode {
                title: node.title,
                target_page: node.target_page,
                children,
            });
        }

        self.roots
            .iter()
            .filter_map(|&root| materialized[root].take())
            .collect()
    }
}
