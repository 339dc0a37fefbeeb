use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::PdfSplitArgs;
use crate::poppler;
use crate::util::{ensure_directory, file_name_string};

pub fn run(args: PdfSplitArgs) -> Result<()> {
    let split_pages = parse_split_pages(&args.split_pages)?;
    let original_filename = file_name_string(&args.pdf_path)?;
    let info = poppler::pdf_info(&args.pdf_path)?;
    let ranges = split_ranges(&split_pages, info.pages)?;

    ensure_directory(&args.output_dir)?;
    let scratch = tempfile::tempdir().context("failed to create scratch directory")?;

    for (start, end) in ranges {
        let output_filename = format!("splitted_{}_{}_{}", start + 1, end, original_filename);
        let output_path = args.output_dir.join(&output_filename);

        let pattern = scratch.path().join(format!("range-{}-page-%d.pdf", start + 1));
        poppler::separate_pages(&args.pdf_path, start + 1, end, &pattern)?;
        let pages = (start + 1..=end)
            .map(|page| scratch.path().join(format!("range-{}-page-{page}.pdf", start + 1)))
            .collect::<Vec<PathBuf>>();

        if let [single] = pages.as_slice() {
            fs::copy(single, &output_path).with_context(|| {
                format!("failed to write {}", output_path.display())
            })?;
        } else {
            poppler::unite(&pages, &output_path)?;
        }

        info!(
            file = %output_filename,
            first_page = start + 1,
            last_page = end,
            "created split"
        );
        println!("Created: {output_filename} (Pages {} to {end})", start + 1);
    }

    Ok(())
}

pub fn parse_split_pages(raw: &str) -> Result<Vec<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<usize>()
                .with_context(|| format!("invalid split page: {value}"))
        })
        .collect()
}

/// Zero-based `(start, end)` ranges; pages `start + 1 ..= end` go together.
pub fn split_ranges(split_pages: &[usize], total_pages: usize) -> Result<Vec<(usize, usize)>> {
    let mut pages = split_pages.to_vec();
    pages.sort_unstable();
    pages.dedup();

    if pages.is_empty() {
        bail!("no split pages given");
    }
    if pages.iter().any(|&page| page == 0 || page >= total_pages) {
        bail!(
            "split pages must be between 1 and {}",
            total_pages.saturating_sub(1)
        );
    }

    let mut bounds = Vec::with_capacity(pages.len() + 2);
    bounds.push(0);
    bounds.extend(pages);
    bounds.push(total_pages);

    Ok(bounds.windows(2).map(|pair| (pair[0], pair[1])).collect())
}
