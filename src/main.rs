mod classifier;
mod cli;
mod commands;
mod model;
mod poppler;
mod text;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::RenameOlympiad(args) => commands::rename_olympiad::run(args),
        Commands::RenamePictures(args) => commands::rename_pictures::run(args),
        Commands::PdfSplit(args) => commands::pdf_split::run(args),
        Commands::PdfExtractImages(args) => commands::pdf_images::run(args),
        Commands::PdfRemoveHf(args) => commands::pdf_trim::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
