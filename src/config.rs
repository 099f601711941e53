use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;

/// Heading detection rules, loaded once per batch run and shared read-only.
///
/// The JSON shape mirrors what the rule author writes: one `levelN` block per
/// outline depth plus a global `exclusion` block, e.g.
///
/// ```json
/// {
///   "level1": { "regex": "^Chapter", "font_size": [14, 0] },
///   "level2": { "font_size": 12, "indent_range": [40.0, 80.0] },
///   "exclusion": { "max_line_length": 60, "truncate_chars": ["."] }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub exclusion: ExclusionRules,
    #[serde(flatten)]
    levels: HashMap<String, LevelRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelRule {
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub font_contains: Option<Vec<String>>,
    #[serde(default)]
    pub font_size: Option<FontSizeRule>,
    #[serde(default)]
    pub indent_range: Option<(f64, f64)>,
}

/// Either a `[target, tolerance]` window over the rounded font size or a
/// plain minimum. A minimum of zero or less always passes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FontSizeRule {
    Window(f64, f64),
    Minimum(f64),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExclusionRules {
    pub max_line_length: usize,
    pub exclude_chars: Vec<String>,
    pub min_y_coord: f64,
    pub max_y_coord: f64,
    pub truncate_chars: Vec<String>,
    pub truncate_after_len: usize,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            max_line_length: 999,
            exclude_chars: Vec::new(),
            min_y_coord: 0.0,
            max_y_coord: 9999.0,
            truncate_chars: Vec::new(),
            truncate_after_len: 10,
        }
    }
}

impl RuleConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read rule config: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse rule config: {}", path.display()))
    }

    /// Resolve `levelN` keys into ascending numeric order and compile the
    /// per-level regexes once for the whole run.
    pub fn compile(&self) -> Result<CompiledRules> {
        let mut levels = Vec::with_capacity(self.levels.len());

        for (key, rule) in &self.levels {
            let Some(suffix) = key.strip_prefix("level") else {
                bail!("unrecognized rule key in config: {key}");
            };
            let level = suffix
                .parse::<u32>()
                .with_context(|| format!("invalid level key in config: {key}"))?;
            if level == 0 {
                bail!("level keys start at level1, got: {key}");
            }

            let regex = match &rule.regex {
                Some(pattern) => Some(
                    Regex::new(pattern)
                        .with_context(|| format!("failed to compile regex for {key}"))?,
                ),
                None => None,
            };

            levels.push(CompiledLevel {
                level,
                regex,
                font_contains: rule
                    .font_contains
                    .iter()
                    .flatten()
                    .map(|needle| needle.to_lowercase())
                    .collect(),
                font_size: rule.font_size,
                indent_range: rule.indent_range,
            });
        }

        levels.sort_by_key(|entry| entry.level);

        Ok(CompiledRules {
            exclusion: self.exclusion.clone(),
            levels,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub exclusion: ExclusionRules,
    levels: Vec<CompiledLevel>,
}

#[derive(Debug, Clone)]
pub struct CompiledLevel {
    pub level: u32,
    pub regex: Option<Regex>,
    /// Lowercased needles; empty means the font check always passes.
    pub font_contains: Vec<String>,
    pub font_size: Option<FontSizeRule>,
    pub indent_range: Option<(f64, f64)>,
}

impl CompiledRules {
    /// Levels in ascending numeric order (`level1` first).
    pub fn levels(&self) -> &[CompiledLevel] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_orders_levels_numerically() {
        let config: RuleConfig = serde_json::from_str(
            r#"{
                "level10": { "font_size": 8 },
                "level2": { "font_size": 12 },
                "level1": { "font_size": 16 }
            }"#,
        )
        .unwrap();

        let compiled = config.compile().unwrap();
        let order = compiled
            .levels()
            .iter()
            .map(|entry| entry.level)
            .collect::<Vec<u32>>();
        assert_eq!(order, vec![1, 2, 10]);
    }

    #[test]
    fn font_size_rule_accepts_number_or_pair() {
        let config: RuleConfig = serde_json::from_str(
            r#"{
                "level1": { "font_size": [14, 1] },
                "level2": { "font_size": 12 }
            }"#,
        )
        .unwrap();

        let compiled = config.compile().unwrap();
        assert_eq!(
            compiled.levels()[0].font_size,
            Some(FontSizeRule::Window(14.0, 1.0))
        );
        assert_eq!(
            compiled.levels()[1].font_size,
            Some(FontSizeRule::Minimum(12.0))
        );
    }

    #[test]
    fn exclusion_defaults_match_unconfigured_run() {
        let config: RuleConfig = serde_json::from_str(r#"{ "level1": {} }"#).unwrap();
        let exclusion = config.compile().unwrap().exclusion;
        assert_eq!(exclusion.max_line_length, 999);
        assert_eq!(exclusion.truncate_after_len, 10);
        assert!(exclusion.exclude_chars.is_empty());
    }

    #[test]
    fn unknown_rule_key_is_rejected() {
        let config: RuleConfig =
            serde_json::from_str(r#"{ "chapter": { "font_size": 14 } }"#).unwrap();
        assert!(config.compile().is_err());
    }

    #[test]
    fn bad_regex_fails_at_compile_time_not_per_line() {
        let config: RuleConfig =
            serde_json::from_str(r#"{ "level1": { "regex": "([unclosed" } }"#).unwrap();
        assert!(config.compile().is_err());
    }
}
