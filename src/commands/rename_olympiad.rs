use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::classifier::{FilenameClassifier, Rejection, RenamePlan};
use crate::cli::RenameOlympiadArgs;
use crate::model::{RenameEntry, RenameRunReport, RenameStatus};
use crate::util::{
    CopyOutcome, copy_to_unique, ensure_directory, file_name_string, now_utc_string,
    write_json_pretty,
};

const REPORT_VERSION: u32 = 1;

pub fn run(args: RenameOlympiadArgs) -> Result<()> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.directory.join("renamed"));
    let classifier = FilenameClassifier::new(args.level)?;

    info!(
        directory = %args.directory.display(),
        output = %output_dir.display(),
        level = args.level.as_str(),
        recursive = args.recursive,
        dry_run = args.dry_run,
        "starting olympiad rename"
    );

    if !args.dry_run {
        ensure_directory(&output_dir)?;
    }

    let report = rename_directory(
        &classifier,
        &args.directory,
        &output_dir,
        args.recursive,
        args.dry_run,
    )?;

    println!(
        "Successfully processed {}/{} files",
        report.success_count, report.processed_count
    );
    info!(
        processed = report.processed_count,
        succeeded = report.success_count,
        "olympiad rename completed"
    );

    if let Some(report_path) = args.report_path.as_deref() {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote rename report");
    }

    Ok(())
}

/// Files are visited in sorted path order, which fixes who gets the plain
/// name and who gets `(1)` when two sources share a canonical name.
pub fn rename_directory(
    classifier: &FilenameClassifier,
    source_dir: &Path,
    output_dir: &Path,
    recursive: bool,
    dry_run: bool,
) -> Result<RenameRunReport> {
    let excluded = fs::canonicalize(output_dir).ok();
    let mut files = Vec::new();
    discover_files(source_dir, recursive, excluded.as_deref(), &mut files)?;

    let entries = files
        .iter()
        .filter_map(|path| process_file(classifier, path, output_dir, dry_run))
        .collect::<Vec<_>>();

    Ok(RenameRunReport {
        report_version: REPORT_VERSION,
        generated_at: now_utc_string(),
        source_directory: source_dir.display().to_string(),
        output_directory: output_dir.display().to_string(),
        level: classifier.level().as_str().to_string(),
        dry_run,
        processed_count: entries.len(),
        success_count: entries
            .iter()
            .filter(|entry| entry.status.is_success())
            .count(),
        entries,
    })
}

fn discover_files(
    dir: &Path,
    recursive: bool,
    excluded: Option<&Path>,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .map(|entry| {
            entry
                .map(|entry| entry.path())
                .with_context(|| format!("failed to read entry in {}", dir.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        let file_type = fs::symlink_metadata(&path)
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .file_type();

        if file_type.is_file() {
            files.push(path);
        } else if file_type.is_dir() && recursive {
            if excluded.is_some() && fs::canonicalize(&path).ok().as_deref() == excluded {
                debug!(path = %path.display(), "skipping output directory");
                continue;
            }
            discover_files(&path, recursive, excluded, files)?;
        }
    }

    Ok(())
}

fn process_file(
    classifier: &FilenameClassifier,
    path: &Path,
    output_dir: &Path,
    dry_run: bool,
) -> Option<RenameEntry> {
    let source = path.display().to_string();
    let entry = |status, destination: Option<&Path>, reason: Option<String>| RenameEntry {
        source: source.clone(),
        status,
        destination: destination.map(|value| value.display().to_string()),
        reason,
    };

    let filename = match file_name_string(path) {
        Ok(filename) => filename,
        Err(err) => {
            warn!(path = %source, error = %err, "skipping file");
            return Some(entry(RenameStatus::Failed, None, Some(err.to_string())));
        }
    };

    let canonical = match classifier.plan(&filename) {
        Ok(RenamePlan::Rename(canonical)) => canonical,
        Ok(RenamePlan::AlreadyCorrect) => {
            info!(file = %filename, "skipping, already in correct format");
            return Some(entry(RenameStatus::AlreadyCorrect, None, None));
        }
        Err(Rejection::NotAPdf) => {
            debug!(file = %filename, "skipping, not a PDF file");
            return None;
        }
        Err(rejection) => {
            warn!(file = %filename, reason = %rejection, "skipping file");
            return Some(entry(
                RenameStatus::Rejected,
                None,
                Some(rejection.as_str().to_string()),
            ));
        }
    };

    if dry_run {
        let destination = output_dir.join(&canonical);
        info!(from = %filename, to = %canonical, "planned rename");
        return Some(entry(RenameStatus::Planned, Some(destination.as_path()), None));
    }

    match copy_to_unique(path, output_dir, &canonical) {
        Ok(CopyOutcome::Copied(destination)) => {
            info!(from = %filename, to = %destination.display(), "renamed");
            Some(entry(RenameStatus::Copied, Some(destination.as_path()), None))
        }
        Ok(CopyOutcome::AlreadyPresent(destination)) => {
            info!(
                from = %filename,
                to = %destination.display(),
                "identical copy already present"
            );
            Some(entry(RenameStatus::AlreadyPresent, Some(destination.as_path()), None))
        }
        Err(err) => {
            warn!(file = %filename, error = %format!("{err:#}"), "failed to copy file");
            Some(entry(RenameStatus::Failed, None, Some(format!("{err:#}"))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EducationLevel;

    fn classifier() -> FilenameClassifier {
        FilenameClassifier::new(EducationLevel::Sma).expect("classifier regexes should compile")
    }

    fn output_names(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .expect("read output dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn colliding_names_are_numbered_in_enumeration_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("renamed");
        ensure_directory(&output).expect("output dir");
        fs::write(dir.path().join("a osn 2020 soal.pdf"), b"first").expect("write");
        fs::write(dir.path().join("b osn 2020 soal.pdf"), b"second").expect("write");

        let report =
            rename_directory(&classifier(), dir.path(), &output, false, false).expect("rename");

        assert_eq!(report.processed_count, 2);
        assert_eq!(report.success_count, 2);
        assert_eq!(
            fs::read(output.join("OSN  - 2020 - Soal.pdf")).expect("read"),
            b"first"
        );
        assert_eq!(
            fs::read(output.join("OSN  - 2020 - Soal (1).pdf")).expect("read"),
            b"second"
        );
    }

    #[test]
    fn byte_identical_duplicates_collapse_into_one_copy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("renamed");
        ensure_directory(&output).expect("output dir");
        fs::write(dir.path().join("a osn 2020 soal.pdf"), b"same bytes").expect("write");
        fs::write(dir.path().join("b osn_2020_soal.pdf"), b"same bytes").expect("write");

        let report =
            rename_directory(&classifier(), dir.path(), &output, false, false).expect("rename");

        let statuses = report
            .entries
            .iter()
            .map(|entry| entry.status)
            .collect::<Vec<_>>();
        assert_eq!(
            statuses,
            vec![RenameStatus::Copied, RenameStatus::AlreadyPresent]
        );
        assert_eq!(report.success_count, 2);
        assert_eq!(
            report.entries[1].destination.as_deref(),
            Some(output.join("OSN  - 2020 - Soal.pdf").display().to_string().as_str())
        );
        assert_eq!(output_names(&output), vec!["OSN  - 2020 - Soal.pdf"]);
    }

    #[test]
    fn second_run_copies_nothing_new() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("renamed");
        ensure_directory(&output).expect("output dir");
        fs::write(dir.path().join("osk_2015_soal_hari_1_tohir.pdf"), b"one").expect("write");
        fs::create_dir(dir.path().join("sub")).expect("subdir");
        fs::write(dir.path().join("sub").join("osp 2018 kunci.pdf"), b"two").expect("write");

        let first =
            rename_directory(&classifier(), dir.path(), &output, true, false).expect("first run");
        assert_eq!(first.processed_count, 2);
        assert!(
            first
                .entries
                .iter()
                .all(|entry| entry.status == RenameStatus::Copied)
        );
        let after_first = output_names(&output);
        assert_eq!(
            after_first,
            vec![
                "OSK  - 2015 - Soal - Hari 1 - Moh. Tohir.pdf".to_string(),
                "OSP  - 2018 - Kunci.pdf".to_string(),
            ]
        );

        let second =
            rename_directory(&classifier(), dir.path(), &output, true, false).expect("second run");
        assert_eq!(second.processed_count, 2);
        assert_eq!(second.success_count, 2);
        assert!(
            second
                .entries
                .iter()
                .all(|entry| entry.status == RenameStatus::AlreadyPresent)
        );
        assert_eq!(output_names(&output), after_first);
    }

    #[test]
    fn rejections_are_counted_and_do_not_abort() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("renamed");
        ensure_directory(&output).expect("output dir");
        fs::write(dir.path().join("matematika 2018.pdf"), b"x").expect("write");
        fs::write(dir.path().join("osn soal.pdf"), b"x").expect("write");
        fs::write(dir.path().join("notes.txt"), b"x").expect("write");
        fs::write(dir.path().join("osn 2010 solusi.pdf"), b"x").expect("write");

        let report =
            rename_directory(&classifier(), dir.path(), &output, false, false).expect("rename");

        assert_eq!(report.processed_count, 3);
        assert_eq!(report.success_count, 1);
        let reasons = report
            .entries
            .iter()
            .filter_map(|entry| entry.reason.clone())
            .collect::<Vec<_>>();
        assert_eq!(reasons, vec!["type_not_found", "year_not_found"]);
        assert_eq!(output_names(&output), vec!["OSN  - 2010 - Solusi.pdf"]);
    }

    #[test]
    fn canonical_sources_and_dry_runs_write_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("renamed");
        fs::write(dir.path().join("OSN  - 2020 - Soal.pdf"), b"x").expect("write");
        fs::write(dir.path().join("osp 2019 soal.pdf"), b"y").expect("write");

        let report =
            rename_directory(&classifier(), dir.path(), &output, false, true).expect("dry run");

        let statuses = report
            .entries
            .iter()
            .map(|entry| entry.status)
            .collect::<Vec<_>>();
        assert_eq!(
            statuses,
            vec![RenameStatus::AlreadyCorrect, RenameStatus::Planned]
        );
        assert_eq!(report.success_count, 2);
        assert!(!output.exists());
    }
}
