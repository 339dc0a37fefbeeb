use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

pub fn file_name_string(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))
}

/// `"X.pdf"` for attempt 0, `"X (n).pdf"` afterwards.
pub fn numbered_name(file_name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return file_name.to_string();
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{stem} ({attempt}).{ext}"),
        None => format!("{stem} ({attempt})"),
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CopyOutcome {
    Copied(PathBuf),
    /// A byte-identical copy already sits at this path.
    AlreadyPresent(PathBuf),
}

/// Copies `source` into `target_dir` as `file_name`, numbering the name until
/// a free slot is claimed. Slots are claimed with `create_new`, so concurrent
/// writers never share a destination. Any taken slot holding the same bytes
/// as `source` ends the search, whichever file those bytes came from.
pub fn copy_to_unique(source: &Path, target_dir: &Path, file_name: &str) -> Result<CopyOutcome> {
    let mut source_hash: Option<String> = None;
    let mut attempt = 0_usize;

    loop {
        let candidate = target_dir.join(numbered_name(file_name, attempt));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut destination) => {
                if let Err(err) = copy_contents(source, &mut destination) {
                    drop(destination);
                    let _ = fs::remove_file(&candidate);
                    return Err(err).with_context(|| {
                        format!(
                            "failed to copy {} to {}",
                            source.display(),
                            candidate.display()
                        )
                    });
                }
                return Ok(CopyOutcome::Copied(candidate));
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if source_hash.is_none() {
                    source_hash = Some(sha256_file(source)?);
                }
                let expected = source_hash.as_deref().unwrap_or_default();
                if candidate.is_file() && sha256_file(&candidate)? == expected {
                    return Ok(CopyOutcome::AlreadyPresent(candidate));
                }
                attempt += 1;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to create {}", candidate.display()));
            }
        }
    }
}

fn copy_contents(source: &Path, destination: &mut File) -> io::Result<()> {
    let mut reader = File::open(source)?;
    io::copy(&mut reader, destination)?;
    destination.flush()
}
