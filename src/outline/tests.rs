use anyhow::Result;

use super::*;
use crate::config::{CompiledRules, RuleConfig};
use crate::model::{HeadingCandidate, OutlineEl, OutlineItem, TextLine};
use crate::outline::builder::{build_tree, sort_candidates};
use crate::outline::classify::{classify, truncate_title};
use crate::outline::flatten::{flatten_outline, render_flat};
use crate::outline::text_toc::parse_toc;

fn candidate(level: u32, title: &str, page_index: u32, y_from_top: f64) -> HeadingCandidate {
    HeadingCandidate {
        level,
        title: title.to_string(),
        page_index,
        y_from_top,
    }
}

fn line_with_size(text: &str, rounded_size: i64) -> TextLine {
    TextLine {
        text: text.to_string(),
        font_name: "NimbusRoman".to_string(),
        rounded_size,
        left_x: 50.0,
        y_from_top: 100.0,
        page_index: 0,
    }
}

fn rules(json: &str) -> CompiledRules {
    serde_json::from_str::<RuleConfig>(json)
        .unwrap()
        .compile()
        .unwrap()
}

/// Re-encodes a bookmark forest in the interleaved native form: each item
/// with children is followed by a child list element.
fn interleave(nodes: &[BookmarkNode]) -> Vec<OutlineEl> {
    let mut els = Vec::new();
    for node in nodes {
        els.push(OutlineEl::Item(OutlineItem {
            title: node.title.clone(),
            page: Some(node.target_page),
        }));
        if !node.children.is_empty() {
            els.push(OutlineEl::Children(interleave(&node.children)));
        }
    }
    els
}

#[derive(Default)]
struct RecordingSink {
    items: Vec<(String, u32, Option<usize>)>,
}

impl OutlineSink for RecordingSink {
    type Handle = usize;

    fn add_outline_item(
        &mut self,
        title: &str,
        page_index: u32,
        parent: Option<usize>,
    ) -> Result<usize> {
        let handle = self.items.len();
        self.items.push((title.to_string(), page_index, parent));
        Ok(handle)
    }
}

#[test]
fn parse_toc_builds_nested_tree() {
    let text = "Chapter 1\t\t\t5\n\tSection 1.1\t\t7\n\tSection 1.2\t\t9\n";
    let parsed = parse_toc(text, 0).unwrap();

    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.roots.len(), 1);

    let chapter = &parsed.roots[0];
    assert_eq!(chapter.title, "Chapter 1");
    assert_eq!(chapter.target_page, 5);
    assert_eq!(chapter.children.len(), 2);
    assert_eq!(chapter.children[0].title, "Section 1.1");
    assert_eq!(chapter.children[0].target_page, 7);
    assert_eq!(chapter.children[1].title, "Section 1.2");
    assert_eq!(chapter.children[1].target_page, 9);
}

#[test]
fn parse_toc_skips_malformed_line_without_breaking_hierarchy() {
    let text = "Chapter 1 5\n\tno page number here\n\tSection 1.1 7\n";
    let parsed = parse_toc(text, 0).unwrap();

    assert_eq!(parsed.warnings.len(), 1);
    assert!(parsed.warnings[0].contains("line 2"));

    assert_eq!(parsed.roots.len(), 1);
    assert_eq!(parsed.roots[0].children.len(), 1);
    assert_eq!(parsed.roots[0].children[0].title, "Section 1.1");
}

#[test]
fn parse_toc_attaches_over_deep_line_at_deepest_open_level() {
    let text = "Chapter 1 5\n\t\t\tDeep entry 9\n";
    let parsed = parse_toc(text, 0).unwrap();

    assert_eq!(parsed.roots.len(), 1);
    assert_eq!(parsed.roots[0].children.len(), 1);
    assert_eq!(parsed.roots[0].children[0].title, "Deep entry");
}

#[test]
fn parse_toc_applies_page_offset_uniformly() {
    let text = "Preface 1\nChapter 1 3\n";
    let parsed = parse_toc(text, 12).unwrap();

    assert_eq!(parsed.roots[0].target_page, 13);
    assert_eq!(parsed.roots[1].target_page, 15);
}

#[test]
fn parse_toc_clamps_pages_shifted_before_page_one() {
    let text = "Front matter 2\n";
    let parsed = parse_toc(text, -5).unwrap();

    assert_eq!(parsed.roots[0].target_page, 1);
    assert_eq!(parsed.warnings.len(), 1);
}

#[test]
fn parse_toc_ignores_blank_lines() {
    let text = "\nChapter 1 5\n\n\tSection 1.1 7\n\n";
    let parsed = parse_toc(text, 0).unwrap();
    assert_eq!(parsed.roots.len(), 1);
    assert_eq!(parsed.roots[0].children.len(), 1);
}

#[test]
fn build_tree_groups_siblings_under_last_parent() {
    let candidates = vec![
        candidate(1, "A", 0, 100.0),
        candidate(2, "A.1", 0, 300.0),
        candidate(2, "A.2", 1, 100.0),
        candidate(1, "B", 2, 100.0),
    ];

    let roots = build_tree(&candidates);

    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].title, "A");
    assert_eq!(roots[0].target_page, 1);
    assert_eq!(roots[0].children.len(), 2);
    assert_eq!(roots[0].children[0].title, "A.1");
    assert_eq!(roots[0].children[1].title, "A.2");
    assert_eq!(roots[0].children[1].target_page, 2);
    assert_eq!(roots[1].title, "B");
    assert!(roots[1].children.is_empty());
}

#[test]
fn build_tree_clamps_levels_below_one() {
    let candidates = vec![candidate(0, "Zero", 0, 10.0), candidate(1, "One", 1, 10.0)];
    let roots = build_tree(&candidates);

    // Both behave as level 1: siblings at the root.
    assert_eq!(roots.len(), 2);
    assert!(roots[0].children.is_empty());
}

#[test]
fn build_tree_attaches_orphans_to_root() {
    let candidates = vec![candidate(3, "Orphan", 0, 10.0), candidate(1, "Top", 1, 10.0)];
    let roots = build_tree(&candidates);

    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].title, "Orphan");
}

#[test]
fn build_tree_invalidates_deeper_levels_on_shallow_insert() {
    let candidates = vec![
        candidate(1, "A", 0, 10.0),
        candidate(2, "A.1", 0, 20.0),
        candidate(1, "B", 1, 10.0),
        // The level-2 slot was cleared by B, so this level-3 node has no
        // parent chain and lands at the root.
        candidate(3, "stray", 1, 20.0),
    ];

    let roots = build_tree(&candidates);

    assert_eq!(roots.len(), 3);
    assert_eq!(roots[0].title, "A");
    assert_eq!(roots[0].children.len(), 1);
    assert_eq!(roots[1].title, "B");
    assert!(roots[1].children.is_empty());
    assert_eq!(roots[2].title, "stray");
}

#[test]
fn sort_candidates_orders_by_page_then_vertical_position() {
    let mut candidates = vec![
        candidate(1, "second", 1, 50.0),
        candidate(1, "third", 1, 80.0),
        candidate(1, "first", 0, 700.0),
    ];
    sort_candidates(&mut candidates);

    let titles = candidates
        .iter()
        .map(|entry| entry.title.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(titles, vec!["first", "second", "third"]);
}

#[test]
fn flatten_handles_interleaved_child_lists() {
    let els = vec![
        OutlineEl::Item(OutlineItem {
            title: "A".to_string(),
            page: Some(1),
        }),
        OutlineEl::Children(vec![OutlineEl::Item(OutlineItem {
            title: "A.1".to_string(),
            page: None,
        })]),
        OutlineEl::Item(OutlineItem {
            title: "B".to_string(),
            page: Some(3),
        }),
    ];

    let entries = flatten_outline(&els);

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].depth, 0);
    assert_eq!(entries[1].depth, 1);
    assert_eq!(entries[1].page, None);
    assert_eq!(entries[2].depth, 0);
    assert_eq!(entries[2].title, "B");
}

#[test]
fn flatten_nests_leading_child_list() {
    let els = vec![OutlineEl::Children(vec![OutlineEl::Item(OutlineItem {
        title: "floating".to_string(),
        page: Some(2),
    })])];

    let entries = flatten_outline(&els);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].depth, 1);
}

#[test]
fn render_flat_uses_tabs_and_placeholder() {
    let els = vec![
        OutlineEl::Item(OutlineItem {
            title: "A".to_string(),
            page: Some(1),
        }),
        OutlineEl::Children(vec![OutlineEl::Item(OutlineItem {
            title: "A.1".to_string(),
            page: None,
        })]),
    ];

    let rendered = render_flat(&flatten_outline(&els));
    assert_eq!(rendered, "A\t1\n\tA.1\t?\n");
}

#[test]
fn flatten_then_parse_round_trips_built_tree() {
    let candidates = vec![
        candidate(1, "Chapter 1", 4, 100.0),
        candidate(2, "Section 1.1", 6, 100.0),
        candidate(3, "Detail", 6, 300.0),
        candidate(2, "Section 1.2", 8, 100.0),
        candidate(1, "Chapter 2", 11, 100.0),
    ];

    let original = build_tree(&candidates);
    let rendered = render_flat(&flatten_outline(&interleave(&original)));
    let reparsed = parse_toc(&rendered, 0).unwrap();

    assert!(reparsed.warnings.is_empty());
    assert_eq!(reparsed.roots, original);
}

#[test]
fn classify_matches_size_window_scenario() {
    let rules = rules(r#"{ "level1": { "regex": "^Chapter", "font_size": [14, 0] } }"#);

    // 14.4 rounds to 14 at scan time.
    let matched = classify(&line_with_size("Chapter 3 Results", 14), &rules);
    assert_eq!(matched, Some((1, "Chapter 3 Results".to_string())));

    assert_eq!(classify(&line_with_size("Chapter 3 Results", 12), &rules), None);
    assert_eq!(classify(&line_with_size("Appendix", 14), &rules), None);
}

#[test]
fn classify_takes_first_matching_level() {
    let rules = rules(r#"{ "level1": { "font_size": 16 }, "level2": { "font_size": 12 } }"#);

    // Size 16 satisfies both minimums; level1 wins by order.
    assert_eq!(
        classify(&line_with_size("Heading", 16), &rules),
        Some((1, "Heading".to_string()))
    );
    assert_eq!(
        classify(&line_with_size("Subheading", 12), &rules),
        Some((2, "Subheading".to_string()))
    );
    assert_eq!(classify(&line_with_size("body", 9), &rules), None);
}

#[test]
fn classify_applies_exclusion_rules() {
    let rules = rules(
        r#"{
            "level1": { "font_size": 10 },
            "exclusion": {
                "max_line_length": 12,
                "exclude_chars": ["©"],
                "min_y_coord": 50,
                "max_y_coord": 700
            }
        }"#,
    );

    assert!(classify(&line_with_size("Short title", 14), &rules).is_some());
    assert!(classify(&line_with_size("This line is far too long", 14), &rules).is_none());
    assert!(classify(&line_with_size("© 2024 Ltd", 14), &rules).is_none());

    let mut header = line_with_size("Running head", 14);
    header.y_from_top = 20.0;
    assert!(classify(&header, &rules).is_none());
}

#[test]
fn classify_checks_font_name_case_insensitively() {
    let rules = rules(r#"{ "level1": { "font_contains": ["Bold"] } }"#);

    let mut bold = line_with_size("Heading", 14);
    bold.font_name = "nimbussans-bold".to_string();
    assert!(classify(&bold, &rules).is_some());

    let mut regular = line_with_size("Heading", 14);
    regular.font_name = "NimbusRoman".to_string();
    assert!(classify(&regular, &rules).is_none());
}

#[test]
fn classify_checks_indent_range() {
    let rules = rules(r#"{ "level1": { "indent_range": [40.0, 60.0] } }"#);

    assert!(classify(&line_with_size("Heading", 14), &rules).is_some());

    let mut indented = line_with_size("Heading", 14);
    indented.left_x = 120.0;
    assert!(classify(&indented, &rules).is_none());
}

#[test]
fn truncation_cuts_long_tails_and_keeps_short_ones() {
    let rules = rules(
        r#"{
            "level1": {},
            "exclusion": { "truncate_chars": ["."], "truncate_after_len": 10 }
        }"#,
    );
    let exclusion = &rules.exclusion;

    // Dotted leader before a page number is trailing noise.
    assert_eq!(
        truncate_title("Introduction.............42", exclusion),
        "Introduction"
    );
    // A short tail is part of the title.
    assert_eq!(truncate_title("Mr. Smith", exclusion), "Mr. Smith");
    assert_eq!(truncate_title("No marker here", exclusion), "No marker here");
}

#[test]
fn truncation_is_idempotent() {
    let rules = rules(
        r#"{
            "level1": {},
            "exclusion": { "truncate_chars": ["."], "truncate_after_len": 5 }
        }"#,
    );
    let exclusion = &rules.exclusion;

    let once = truncate_title("Chapter One..........88", exclusion);
    let twice = truncate_title(&once, exclusion);
    assert_eq!(once, twice);
}

#[test]
fn write_tree_emits_pre_order_with_parent_handles() {
    let mut root_a = BookmarkNode::new("A", 1);
    root_a.children.push(BookmarkNode::new("A.1", 2));
    root_a.children.push(BookmarkNode::new("A.2", 3));
    let forest = vec![root_a, BookmarkNode::new("B", 5)];

    let mut sink = RecordingSink::default();
    write_tree(&mut sink, &forest, None).unwrap();

    // Pages reach the sink 0-based.
    assert_eq!(
        sink.items,
        vec![
            ("A".to_string(), 0, None),
            ("A.1".to_string(), 1, Some(0)),
            ("A.2".to_string(), 2, Some(0)),
            ("B".to_string(), 4, None),
        ]
    );
}

#[test]
fn count_nodes_covers_whole_forest() {
    let mut root = BookmarkNode::new("A", 1);
    root.children.push(BookmarkNode::new("A.1", 2));
    root.children[0].children.push(BookmarkNode::new("A.1.1", 3));
    let forest = vec![root, BookmarkNode::new("B", 4)];

    assert_eq!(count_nodes(&forest), 4);
}
