use derive_more::Display;
use reel_policy::format_file_size;
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;
use time::UtcDateTime;
use time::format_description::well_known::Rfc3339;

/// A file on disk that no index record references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrphanFile {
    pub filename: String,
    pub full_path: PathBuf,
    pub size_bytes: u64,
    pub last_modified: UtcDateTime,
}

/// Which half of backup-then-delete failed.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupStage {
    #[display("backup")]
    Backup,
    #[display("delete")]
    Delete,
}

/// A per-file cleanup failure. Never aborts the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CleanupError {
    pub filename: String,
    pub stage: CleanupStage,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
pub enum Outcome {
    #[display("reported")]
    Reported,
    #[display("reported with errors")]
    ReportedWithErrors,
}

/// Result of one reconciliation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub file_system_count: usize,
    pub database_count: usize,
    pub orphans: Vec<OrphanFile>,
    /// Filenames that were deleted (after a successful backup, if enabled).
    pub cleaned: Vec<String>,
    pub cleaned_bytes: u64,
    pub backup_dir: Option<PathBuf>,
    pub errors: Vec<CleanupError>,
}
impl CleanupReport {
    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// Bytes held by orphans; what a non-dry run would reclaim.
    pub fn orphan_bytes(&self) -> u64 {
        self.orphans.iter().map(|o| o.size_bytes).sum()
    }

    pub fn cleaned_count(&self) -> usize {
        self.cleaned.len()
    }

    pub fn outcome(&self) -> Outcome {
        match self.errors.is_empty() {
            true => Outcome::Reported,
            false => Outcome::ReportedWithErrors,
        }
    }
}

/// Human-readable summary of a run, for logs and the CLI.
pub fn generate_report(report: &CleanupReport) -> String {
    let mut out = String::new();
    let title = match report.dry_run {
        true => "Orphan file cleanup (dry run)",
        false => "Orphan file cleanup",
    };
    // Writing to a String cannot fail.
    _ = writeln!(out, "{title}");
    _ = writeln!(out, "{}", "=".repeat(title.len()));
    _ = writeln!(out, "Files on disk:      {}", report.file_system_count);
    _ = writeln!(out, "Files in database:  {}", report.database_count);
    _ = writeln!(
        out,
        "Orphaned files:     {} ({})",
        report.orphan_count(),
        format_file_size(report.orphan_bytes())
    );
    match report.dry_run {
        true => _ = writeln!(out, "Reclaimable:        {}", format_file_size(report.orphan_bytes())),
        false => {
            _ = writeln!(
                out,
                "Cleaned files:      {} ({})",
                report.cleaned_count(),
                format_file_size(report.cleaned_bytes)
            );
        },
    }
    if let Some(dir) = &report.backup_dir {
        _ = writeln!(out, "Backup directory:   {}", dir.display());
    }
    _ = writeln!(out, "Errors:             {}", report.errors.len());
    _ = writeln!(out, "Outcome:            {}", report.outcome());

    if !report.orphans.is_empty() {
        _ = writeln!(out);
        _ = writeln!(out, "Orphans:");
        for orphan in &report.orphans {
            let modified = orphan
                .last_modified
                .format(&Rfc3339)
                .unwrap_or_else(|_| orphan.last_modified.unix_timestamp().to_string());
            _ = writeln!(
                out,
                "  - {} ({}, modified {})",
                orphan.filename,
                format_file_size(orphan.size_bytes),
                modified
            );
        }
    }
    if !report.errors.is_empty() {
        _ = writeln!(out);
        _ = writeln!(out, "Errors:");
        for error in &report.errors {
            _ = writeln!(out, "  - {} [{}]: {}", error.filename, error.stage, error.message);
        }
    }
    out
}
