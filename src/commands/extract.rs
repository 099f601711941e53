use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::info;

use crate::cli::ExtractArgs;
use crate::model::FileOutcome;
use crate::outline::flatten::{flatten_outline, render_flat};
use crate::pdf::document::PdfDocument;
use crate::util::{discover_pdfs, ensure_directory, sha256_file};

use super::{Conversion, failed_outcome, file_name_string};

pub fn run(args: ExtractArgs) -> Result<()> {
    let input_folder = args.input_folder;
    let output_folder = args
        .output_folder
        .unwrap_or_else(|| input_folder.join("extracted_toc"));
    ensure_directory(&output_folder)?;

    let pdfs = discover_pdfs(&input_folder)?;
    if pdfs.is_empty() {
        bail!("no PDF files found in {}", input_folder.display());
    }

    info!(
        pdf_count = pdfs.len(),
        source = %input_folder.display(),
        "starting extract run"
    );

    let outcomes: Vec<FileOutcome> = pdfs
        .par_iter()
        .map(|pdf_path| process_file(pdf_path, &output_folder))
        .collect();

    super::finish_run("extract", &input_folder, &output_folder, outcomes)
}

fn process_file(pdf_path: &Path, output_folder: &Path) -> FileOutcome {
    let filename = file_name_string(pdf_path);
    let sha256 = sha256_file(pdf_path).ok();

    match convert(pdf_path, output_folder) {
        Ok(conversion) => conversion.into_outcome(filename, sha256),
        Err(error) => failed_outcome(filename, sha256, &error),
    }
}

fn convert(pdf_path: &Path, output_folder: &Path) -> Result<Conversion> {
    let doc = PdfDocument::open(pdf_path)?;

    let els = doc.read_outline();
    if els.is_empty() {
        return Ok(Conversion::skipped("no outline found", Vec::new()));
    }

    let entries = flatten_outline(&els);
    if entries.is_empty() {
        return Ok(Conversion::skipped(
            "outline contained no readable items",
            Vec::new(),
        ));
    }

    let warnings = entries
        .iter()
        .filter(|entry| entry.page.is_none())
        .map(|entry| format!("unresolved destination for '{}'", entry.title))
        .collect::<Vec<String>>();

    let stem = pdf_path
        .file_stem()
        .with_context(|| format!("invalid file name: {}", pdf_path.display()))?
        .to_string_lossy();
    let txt_path = output_folder.join(format!("{stem}.txt"));

    fs::write(&txt_path, render_flat(&entries))
        .with_context(|| format!("failed to write {}", txt_path.display()))?;

    Ok(Conversion::success(warnings, Some(entries.len())))
}
