use serde::Serialize;

/// One node of a document outline. Pages are 1-based and document-absolute.
/// A forest of these is built completely before it is handed to a writer and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkNode {
    pub title: String,
    pub target_page: u32,
    pub children: Vec<BookmarkNode>,
}

impl BookmarkNode {
    pub fn new(title: impl Into<String>, target_page: u32) -> Self {
        Self {
            title: title.into(),
            target_page,
            children: Vec::new(),
        }
    }
}

/// A heading detected on a page, not yet placed in a tree. `level` is clamped
/// to a minimum of 1 by the tree builder; `page_index` is 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCandidate {
    pub level: u32,
    pub title: String,
    pub page_index: u32,
    pub y_from_top: f64,
}

/// A laid-out text line as delivered by the page scan provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub font_name: String,
    pub rounded_size: i64,
    pub left_x: f64,
    pub y_from_top: f64,
    pub page_index: u32,
}

/// Native outline encoding: an ordered list in which a child list may directly
/// follow the item it belongs to. Decoded into this tagged form at the PDF
/// boundary so the flattening logic never inspects raw objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineEl {
    Item(OutlineItem),
    Children(Vec<OutlineEl>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineItem {
    pub title: String,
    /// 1-based page number; `None` when the destination could not be resolved.
    pub page: Option<u32>,
}

/// Pre-order output of the outline reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    pub depth: usize,
    pub title: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Success,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub command: String,
    pub source_directory: String,
    pub output_directory: String,
    pub file_count: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<FileOutcome>,
}
