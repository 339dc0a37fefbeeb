use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "olim",
    version,
    about = "Olympiad exam PDF renaming and editing utilities"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy Olympiad PDFs into `renamed/` under their canonical names
    RenameOlympiad(RenameOlympiadArgs),
    /// Copy PNG pictures into `renamed/` under names from a manifest
    RenamePictures(RenamePicturesArgs),
    /// Split a PDF after the given pages
    PdfSplit(PdfSplitArgs),
    /// Extract embedded images from a PDF
    PdfExtractImages(PdfExtractImagesArgs),
    /// Crop detected headers and footers from every page
    PdfRemoveHf(PdfRemoveHfArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum EducationLevel {
    Sd,
    Smp,
    Sma,
}

impl EducationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sd => "SD",
            Self::Smp => "SMP",
            Self::Sma => "SMA",
        }
    }

    /// Suffix appended to the olympiad type; senior high carries none.
    pub fn type_suffix(self) -> &'static str {
        match self {
            Self::Sd => "SD",
            Self::Smp => "SMP",
            Self::Sma => "",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RenameOlympiadArgs {
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    #[arg(long, value_enum, ignore_case = true)]
    pub level: EducationLevel,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RenamePicturesArgs {
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    #[arg(long)]
    pub names_file: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PdfSplitArgs {
    pub pdf_path: PathBuf,

    /// Comma-separated pages to split after, e.g. `5,10,15`
    pub split_pages: String,

    #[arg(long, default_value = "pdf-output-split")]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PdfExtractImagesArgs {
    pub pdf_path: PathBuf,

    #[arg(long, default_value = "image")]
    pub prefix: String,

    #[arg(long, default_value = "extracted-images")]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PdfRemoveHfArgs {
    pub pdf_path: PathBuf,

    #[arg(long, default_value = "pdf-output-header-footer-removed")]
    pub output_dir: PathBuf,
}
