use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::RenamePicturesArgs;
use crate::text::ensure_extension;
use crate::util::ensure_directory;

pub fn run(args: RenamePicturesArgs) -> Result<()> {
    let names_path = args
        .names_file
        .clone()
        .unwrap_or_else(|| args.directory.join("names.txt"));
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.directory.join("renamed"));

    info!(
        directory = %args.directory.display(),
        names = %names_path.display(),
        "starting picture rename"
    );

    let raw = fs::read_to_string(&names_path)
        .with_context(|| format!("failed to read names file {}", names_path.display()))?;
    let names = parse_names(&raw);

    let pictures = discover_pictures(&args.directory)?;
    if pictures.is_empty() {
        warn!(directory = %args.directory.display(), "no PNG files found");
        return Ok(());
    }

    let assignments = assign_names(&pictures, &names)?;
    ensure_directory(&output_dir)?;

    let mut copied = 0_usize;
    for (source, name) in assignments {
        let destination = output_dir.join(name);
        match fs::copy(source, &destination) {
            Ok(_) => {
                copied += 1;
                info!(from = %source.display(), to = %destination.display(), "copied picture");
            }
            Err(err) => {
                warn!(from = %source.display(), error = %err, "failed to copy picture");
            }
        }
    }

    println!("Copied {copied}/{} pictures", pictures.len());
    Ok(())
}

pub fn parse_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| ensure_extension(line, "png"))
        .collect()
}

pub fn assign_names<'a>(
    pictures: &'a [PathBuf],
    names: &'a [String],
) -> Result<Vec<(&'a Path, &'a str)>> {
    if pictures.len() > names.len() {
        bail!(
            "not enough names: need {} names but only found {}",
            pictures.len(),
            names.len()
        );
    }

    Ok(pictures
        .iter()
        .map(PathBuf::as_path)
        .zip(names.iter().map(String::as_str))
        .collect())
}

/// PNG files directly inside `dir`, newest first.
fn discover_pictures(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pictures = Vec::new();

    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let metadata = entry
            .metadata()
            .with_context(|| format!("failed to inspect file: {}", path.display()))?;

        if !metadata.is_file() {
            continue;
        }

        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false);

        if is_png {
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            pictures.push((created, path));
        }
    }

    pictures.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(pictures.into_iter().map(|(_, path)| path).collect())
}
