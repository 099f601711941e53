use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::model::TextLine;

/// Extracts laid-out text lines from a PDF by running poppler's
/// `pdftohtml -xml` and scanning its output. Every line carries the font
/// name, the rounded size, the left edge x, and the distance from the top of
/// its page. `pages` restricts the scan to the given 1-based page numbers.
pub fn scan_text_lines(pdf_path: &Path, pages: Option<&[u32]>) -> Result<Vec<TextLine>> {
    let page_filter: Option<HashSet<u32>> = pages
        .filter(|list| !list.is_empty())
        .map(|list| list.iter().copied().collect());

    let mut command = Command::new("pdftohtml");
    command.arg("-xml").arg("-i").arg("-q");

    // pdftohtml only takes a contiguous range; the exact set is applied to
    // the parsed lines afterwards.
    if let Some(filter) = &page_filter {
        let first = filter.iter().min().copied().unwrap_or(1);
        let last = filter.iter().max().copied().unwrap_or(first);
        command
            .arg("-f")
            .arg(first.to_string())
            .arg("-l")
            .arg(last.to_string());
    }

    let output = command
        .arg(pdf_path)
        .arg("-stdout")
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let xml = String::from_utf8_lossy(&output.stdout);
    parse_scan_xml(&xml, page_filter.as_ref())
}

fn parse_scan_xml(xml: &str, page_filter: Option<&HashSet<u32>>) -> Result<Vec<TextLine>> {
    let page_regex =
        Regex::new(r#"<page number="(\d+)""#).context("failed to compile page regex")?;
    let fontspec_regex = Regex::new(r#"<fontspec id="([^"]+)" size="(-?\d+)" family="([^"]*)""#)
        .context("failed to compile fontspec regex")?;
    let text_regex = Regex::new(
        r#"<text top="(-?\d+)" left="(-?\d+)" width="(-?\d+)" height="(-?\d+)" font="([^"]+)">(.*?)</text>"#,
    )
    .context("failed to compile text line regex")?;

    let mut lines = Vec::<TextLine>::new();
    let mut fonts = HashMap::<String, (i64, String)>::new();
    let mut current_page: Option<u32> = None;

    for raw in xml.lines() {
        if let Some(captures) = page_regex.captures(raw) {
            current_page = captures
                .get(1)
                .and_then(|number| number.as_str().parse::<u32>().ok());
            continue;
        }

        if let Some(captures) = fontspec_regex.captures(raw) {
            let id = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let size = captures
                .get(2)
                .and_then(|m| m.as_str().parse::<i64>().ok())
                .unwrap_or(0);
            let family = captures.get(3).map(|m| m.as_str()).unwrap_or_default();
            fonts.insert(id.to_string(), (size, normalize_text_content(family)));
            continue;
        }

        let Some(captures) = text_regex.captures(raw) else {
            continue;
        };
        let Some(page_number) = current_page else {
            continue;
        };
        if let Some(filter) = page_filter {
            if !filter.contains(&page_number) {
                continue;
            }
        }

        let top = captures
            .get(1)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0);
        let left = captures
            .get(2)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0);
        let font_id = captures.get(5).map(|m| m.as_str()).unwrap_or_default();
        let inner = captures.get(6).map(|m| m.as_str()).unwrap_or_default();

        let text = normalize_text_content(&strip_inline_markup(inner));
        if text.is_empty() {
            continue;
        }

        let (rounded_size, font_name) = fonts
            .get(font_id)
            .cloned()
            .unwrap_or((0, String::new()));

        lines.push(TextLine {
            text,
            font_name,
            rounded_size,
            left_x: left,
            y_from_top: top,
            page_index: page_number.saturating_sub(1),
        });
    }

    Ok(lines)
}

/// Drops inline `<b>`, `<i>`, and `<a>` wrappers pdftohtml leaves inside
/// text elements.
fn strip_inline_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn normalize_text_content(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace('\u{00a0}', " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}
