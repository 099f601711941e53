use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pdfmarks",
    version,
    about = "Batch PDF outline and bookmark tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect headings heuristically and write a bookmark outline.
    Auto(AutoArgs),
    /// Apply tab-indented TOC text files as bookmark outlines.
    Apply(ApplyArgs),
    /// Extract existing outlines into tab-indented TOC text files.
    Extract(ExtractArgs),
    /// Report per-line layout attributes for rule tuning.
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AutoArgs {
    #[arg(long)]
    pub input_folder: PathBuf,

    /// Defaults to `<input-folder>/bookmarked`.
    #[arg(long)]
    pub output_folder: Option<PathBuf>,

    /// Heading detection rules (JSON).
    #[arg(long)]
    pub config: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Folder holding PDFs and their sibling `<name>.txt` TOC files.
    #[arg(long)]
    pub source_folder: PathBuf,

    /// Defaults to `<source-folder>/output_with_bookmarks`.
    #[arg(long)]
    pub output_folder: Option<PathBuf>,

    /// Uniform shift added to every page number in the TOC files.
    #[arg(long, default_value_t = 0)]
    pub offset: i64,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub input_folder: PathBuf,

    /// Defaults to `<input-folder>/extracted_toc`.
    #[arg(long)]
    pub output_folder: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub input_folder: PathBuf,

    /// Defaults to `<input-folder>/inspection`.
    #[arg(long)]
    pub output_folder: Option<PathBuf>,

    /// 1-based page numbers to restrict the scan; repeatable.
    #[arg(long = "page")]
    pub pages: Vec<u32>,

    /// Lines at or above this rounded size are flagged as suspected titles.
    #[arg(long, default_value_t = 14)]
    pub title_size_threshold: i64,
}
