use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cli::AutoArgs;
use crate::config::{CompiledRules, RuleConfig};
use crate::model::{FileOutcome, HeadingCandidate};
use crate::outline::{builder, classify, count_nodes, write_tree};
use crate::pdf::document::PdfDocument;
use crate::pdf::scan::scan_text_lines;
use crate::util::{discover_pdfs, ensure_directory, sha256_file};

use super::{Conversion, failed_outcome, file_name_string};

pub fn run(args: AutoArgs) -> Result<()> {
    let input_folder = args.input_folder;
    let output_folder = args
        .output_folder
        .unwrap_or_else(|| input_folder.join("bookmarked"));
    ensure_directory(&output_folder)?;

    let rules = RuleConfig::load(&args.config)?.compile()?;

    let pdfs = discover_pdfs(&input_folder)?;
    if pdfs.is_empty() {
        bail!("no PDF files found in {}", input_folder.display());
    }

    info!(
        pdf_count = pdfs.len(),
        source = %input_folder.display(),
        "starting auto bookmark run"
    );

    let outcomes: Vec<FileOutcome> = pdfs
        .par_iter()
        .map(|pdf_path| process_file(pdf_path, &output_folder, &rules))
        .collect();

    super::finish_run("auto", &input_folder, &output_folder, outcomes)
}

fn process_file(pdf_path: &Path, output_folder: &Path, rules: &CompiledRules) -> FileOutcome {
    let filename = file_name_string(pdf_path);
    let sha256 = sha256_file(pdf_path).ok();

    match convert(pdf_path, output_folder, rules) {
        Ok(conversion) => conversion.into_outcome(filename, sha256),
        Err(error) => failed_outcome(filename, sha256, &error),
    }
}

fn convert(pdf_path: &Path, output_folder: &Path, rules: &CompiledRules) -> Result<Conversion> {
    let out_path = output_path_for(pdf_path, output_folder)?;

    let lines = scan_text_lines(pdf_path, None)?;

    let mut candidates = Vec::<HeadingCandidate>::new();
    for line in &lines {
        if let Some((level, title)) = classify::classify(line, rules) {
            debug!(page = line.page_index + 1, title = %title, "matched heading");
            candidates.push(HeadingCandidate {
                level,
                title,
                page_index: line.page_index,
                y_from_top: line.y_from_top,
            });
        }
    }

    if candidates.is_empty() {
        // Keep the output folder complete even when nothing matched.
        fs::copy(pdf_path, &out_path).with_context(|| {
            format!(
                "failed to copy {} to {}",
                pdf_path.display(),
                out_path.display()
            )
        })?;
        return Ok(Conversion::skipped(
            "no titles matched; original copied",
            Vec::new(),
        ));
    }

    builder::sort_candidates(&mut candidates);
    let roots = builder::build_tree(&candidates);

    let mut doc = PdfDocument::open(pdf_path)?;
    write_tree(&mut doc, &roots, None)?;
    doc.save_with_outline(&out_path)?;

    Ok(Conversion::success(
        doc.take_warnings(),
        Some(count_nodes(&roots)),
    ))
}

fn output_path_for(pdf_path: &Path, output_folder: &Path) -> Result<PathBuf> {
    let name = pdf_path
        .file_name()
        .with_context(|| format!("invalid file name: {}", pdf_path.display()))?;
    Ok(output_folder.join(name))
}
