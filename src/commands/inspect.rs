use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::info;

use crate::cli::InspectArgs;
use crate::model::FileOutcome;
use crate::pdf::scan::scan_text_lines;
use crate::util::{discover_pdfs, ensure_directory, sha256_file};

use super::{Conversion, failed_outcome, file_name_string};

pub fn run(args: InspectArgs) -> Result<()> {
    let input_folder = args.input_folder;
    let output_folder = args
        .output_folder
        .unwrap_or_else(|| input_folder.join("inspection"));
    ensure_directory(&output_folder)?;

    let pdfs = discover_pdfs(&input_folder)?;
    if pdfs.is_empty() {
        bail!("no PDF files found in {}", input_folder.display());
    }

    info!(
        pdf_count = pdfs.len(),
        source = %input_folder.display(),
        "starting inspection run"
    );

    let outcomes: Vec<FileOutcome> = pdfs
        .par_iter()
        .map(|pdf_path| {
            process_file(
                pdf_path,
                &output_folder,
                &args.pages,
                args.title_size_threshold,
            )
        })
        .collect();

    super::finish_run("inspect", &input_folder, &output_folder, outcomes)
}

fn process_file(
    pdf_path: &Path,
    output_folder: &Path,
    pages: &[u32],
    threshold: i64,
) -> FileOutcome {
    let filename = file_name_string(pdf_path);
    let sha256 = sha256_file(pdf_path).ok();

    match convert(pdf_path, output_folder, pages, threshold) {
        Ok(conversion) => conversion.into_outcome(filename, sha256),
        Err(error) => failed_outcome(filename, sha256, &error),
    }
}

fn convert(
    pdf_path: &Path,
    output_folder: &Path,
    pages: &[u32],
    threshold: i64,
) -> Result<Conversion> {
    let page_filter = (!pages.is_empty()).then_some(pages);
    let lines = scan_text_lines(pdf_path, page_filter)?;

    let mut report = String::new();
    let mut current_page: Option<u32> = None;
    let mut reported = 0_usize;

    for line in &lines {
        if is_garbage(&line.text) {
            continue;
        }

        if current_page != Some(line.page_index) {
            current_page = Some(line.page_index);
            let _ = writeln!(
                report,
                "\n{0} Page {1} {0}",
                "=".repeat(20),
                line.page_index + 1
            );
        }

        let font = if line.font_name.is_empty() {
            "Unknown"
        } else {
            line.font_name.as_str()
        };
        let display = if line.rounded_size >= threshold {
            format!("『 {} 』 <--- suspected title", line.text)
        } else {
            line.text.clone()
        };

        let _ = writeln!(
            report,
            "[Size:{} | Font:{} | Y:{:.2} | X:{:.2}] {}",
            line.rounded_size, font, line.y_from_top, line.left_x, display
        );
        reported += 1;
    }

    if reported == 0 {
        return Ok(Conversion::skipped("no text lines found", Vec::new()));
    }

    let stem = pdf_path
        .file_stem()
        .with_context(|| format!("invalid file name: {}", pdf_path.display()))?
        .to_string_lossy();
    let txt_path = output_folder.join(format!("{stem}.txt"));

    fs::write(&txt_path, report)
        .with_context(|| format!("failed to write {}", txt_path.display()))?;

    let mut conversion = Conversion::success(Vec::new(), None);
    conversion.detail = Some(format!("{reported} lines reported"));
    Ok(conversion)
}

/// Tiny fragments without CJK content are page furniture, not headings.
fn is_garbage(text: &str) -> bool {
    text.chars().count() < 5
        && !text
            .chars()
            .any(|ch| ('\u{4e00}'..='\u{9fff}').contains(&ch))
}
