//! Orphan detection and cleanup.
//!
//! A file is an orphan when it sits in the media directory but no record in
//! the media index references it, typically left behind by an upload that
//! failed after writing the file. A run scans both sides, takes the set
//! difference by exact filename, and then (unless it's a dry run) backs up and
//! deletes each orphan in turn.
//!
//! ```text
//! Scan ──┬── dry run ──┐
//!        └── clean ────┴── Reported | ReportedWithErrors
//! ```
//!
//! Known limitation: a file uploaded between the directory listing and the
//! index query can be classified as an orphan. Backups are the mitigation.

pub mod error;
mod report;
mod service;

pub use self::report::{CleanupError, CleanupReport, CleanupStage, OrphanFile, Outcome, generate_report};
pub use self::service::{CleanupOptions, Reconciler, backup_dir_name, is_media_candidate};
