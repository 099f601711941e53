use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::info;

use crate::cli::ApplyArgs;
use crate::model::FileOutcome;
use crate::outline::text_toc::parse_toc;
use crate::outline::{count_nodes, write_tree};
use crate::pdf::document::PdfDocument;
use crate::util::{discover_pdfs, ensure_directory, sha256_file};

use super::{Conversion, failed_outcome, file_name_string};

pub fn run(args: ApplyArgs) -> Result<()> {
    let source_folder = args.source_folder;
    let output_folder = args
        .output_folder
        .unwrap_or_else(|| source_folder.join("output_with_bookmarks"));
    ensure_directory(&output_folder)?;

    let pdfs = discover_pdfs(&source_folder)?;
    if pdfs.is_empty() {
        bail!("no PDF files found in {}", source_folder.display());
    }

    info!(
        pdf_count = pdfs.len(),
        source = %source_folder.display(),
        offset = args.offset,
        "starting apply run"
    );

    let outcomes: Vec<FileOutcome> = pdfs
        .par_iter()
        .map(|pdf_path| process_file(pdf_path, &output_folder, args.offset))
        .collect();

    super::finish_run("apply", &source_folder, &output_folder, outcomes)
}

fn process_file(pdf_path: &Path, output_folder: &Path, offset: i64) -> FileOutcome {
    let filename = file_name_string(pdf_path);
    let sha256 = sha256_file(pdf_path).ok();

    match convert(pdf_path, output_folder, offset) {
        Ok(conversion) => conversion.into_outcome(filename, sha256),
        Err(error) => failed_outcome(filename, sha256, &error),
    }
}

fn convert(pdf_path: &Path, output_folder: &Path, offset: i64) -> Result<Conversion> {
    let toc_path = pdf_path.with_extension("txt");
    if !toc_path.is_file() {
        return Ok(Conversion::skipped(
            format!("no TOC file '{}' found", file_name_string(&toc_path)),
            Vec::new(),
        ));
    }

    let text = fs::read_to_string(&toc_path)
        .with_context(|| format!("failed to read {}", toc_path.display()))?;
    let parsed = parse_toc(&text, offset)?;

    if parsed.roots.is_empty() {
        return Ok(Conversion::skipped("empty or invalid TOC", parsed.warnings));
    }

    let mut doc = PdfDocument::open(pdf_path)?;
    write_tree(&mut doc, &parsed.roots, None)?;

    let name = pdf_path
        .file_name()
        .with_context(|| format!("invalid file name: {}", pdf_path.display()))?;
    doc.save_with_outline(&output_folder.join(name))?;

    let mut warnings = parsed.warnings;
    warnings.extend(doc.take_warnings());

    Ok(Conversion::success(
        warnings,
        Some(count_nodes(&parsed.roots)),
    ))
}
