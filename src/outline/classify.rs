use crate::config::{CompiledLevel, CompiledRules, ExclusionRules, FontSizeRule};
use crate::model::TextLine;

/// Classifies a laid-out text line against the rule configuration.
///
/// Levels are tried in ascending numeric order and the first level whose
/// checks all pass wins. A line matching no level is simply not a heading;
/// there is no fallback bucket.
pub fn classify(line: &TextLine, rules: &CompiledRules) -> Option<(u32, String)> {
    let exclusion = &rules.exclusion;

    if line.text.chars().count() > exclusion.max_line_length {
        return None;
    }
    if exclusion
        .exclude_chars
        .iter()
        .any(|needle| line.text.contains(needle.as_str()))
    {
        return None;
    }
    if line.y_from_top < exclusion.min_y_coord || line.y_from_top > exclusion.max_y_coord {
        return None;
    }

    for level_rule in rules.levels() {
        if matches_level(line, level_rule) {
            return Some((level_rule.level, truncate_title(&line.text, exclusion)));
        }
    }

    None
}

fn matches_level(line: &TextLine, rule: &CompiledLevel) -> bool {
    if let Some(regex) = &rule.regex {
        let anchored = regex
            .find(&line.text)
            .is_some_and(|found| found.start() == 0);
        if !anchored {
            return false;
        }
    }

    if !rule.font_contains.is_empty() {
        let font = line.font_name.to_lowercase();
        if !rule
            .font_contains
            .iter()
            .any(|needle| font.contains(needle.as_str()))
        {
            return false;
        }
    }

    let size = line.rounded_size as f64;
    match rule.font_size {
        Some(FontSizeRule::Window(target, tolerance)) => {
            if size < target - tolerance || size > target + tolerance {
                return false;
            }
        }
        Some(FontSizeRule::Minimum(minimum)) if minimum > 0.0 => {
            if size < minimum {
                return false;
            }
        }
        _ => {}
    }

    if let Some((min_x, max_x)) = rule.indent_range {
        if line.left_x < min_x || line.left_x > max_x {
            return false;
        }
    }

    true
}

/// Cuts trailing noise (dotted leaders, inline page numbers) off a matched
/// title. The first `truncate_chars` entry present in the title decides: when
/// the tail after its first occurrence is longer than `truncate_after_len`
/// characters, only the trimmed head is kept. Idempotent.
pub fn truncate_title(title: &str, exclusion: &ExclusionRules) -> String {
    let marker = exclusion
        .truncate_chars
        .iter()
        .find(|marker| !marker.is_empty() && title.contains(marker.as_str()));
    let Some(marker) = marker else {
        return title.to_string();
    };

    let Some((head, tail)) = title.split_once(marker.as_str()) else {
        return title.to_string();
    };

    if tail.chars().count() > exclusion.truncate_after_len {
        head.trim().to_string()
    } else {
        title.to_string()
    }
}
