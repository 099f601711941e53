use anyhow::{Context, Result};
use regex::Regex;
use tracing::warn;

use crate::model::BookmarkNode;
use crate::outline::OutlineArena;

#[derive(Debug)]
pub struct TocParse {
    pub roots: Vec<BookmarkNode>,
    pub warnings: Vec<String>,
}

/// Parses an indentation-delimited TOC file into a bookmark forest.
///
/// One heading per line; leading tab characters encode nesting depth and the
/// line ends with whitespace followed by a 1-based page number. Malformed
/// lines are skipped with a line-numbered warning and leave the insertion
/// stack untouched, so they never disturb the hierarchy around them.
pub fn parse_toc(text: &str, page_offset: i64) -> Result<TocParse> {
    let tail_regex =
        Regex::new(r"(\s+)(\d+)$").context("failed to compile TOC page number regex")?;

    let mut arena = OutlineArena::new();
    let mut warnings = Vec::new();
    // Insertion points, one per open depth; `None` is the root list.
    let mut stack: Vec<Option<usize>> = vec![None];

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let level = line.chars().take_while(|&ch| ch == '\t').count();

        let Some(captures) = tail_regex.captures(line) else {
            warn!(line = line_number, text = line, "cannot parse page number");
            warnings.push(format!(
                "line {line_number}: cannot parse page number -> '{line}'"
            ));
            continue;
        };

        let Some((title_end, page_digits)) = captures
            .get(1)
            .map(|gap| gap.start())
            .zip(captures.get(2).map(|digits| digits.as_str()))
        else {
            continue;
        };

        let Ok(page) = page_digits.parse::<i64>() else {
            warn!(line = line_number, text = line, "page number out of range");
            warnings.push(format!(
                "line {line_number}: page number out of range -> '{line}'"
            ));
            continue;
        };

        let title = line[..title_end].trim().to_string();

        let mut target_page = (page + page_offset).min(u32::MAX as i64);
        if target_page < 1 {
            warnings.push(format!(
                "line {line_number}: page {page} with offset {page_offset} falls before page 1"
            ));
            target_page = 1;
        }

        // A line deeper than the open stack attaches at the deepest open
        // level instead of failing.
        while stack.len() > level + 1 {
            stack.pop();
        }

        let parent = stack.last().copied().flatten();
        let id = arena.insert(parent, title, target_page as u32);
        stack.push(Some(id));
    }

    Ok(TocParse {
        roots: arena.into_forest(),
        warnings,
    })
}
