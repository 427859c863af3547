use crate::reconcile::error::{ErrorKind, Result};
use crate::reconcile::{CleanupError, CleanupReport, CleanupStage, OrphanFile};
use exn::ResultExt;
use reel_index::IndexHandle;
use reel_storage::{BackendHandle, StorageBackend, copy_file};
use std::collections::HashSet;
use std::path::Path;
use time::UtcDateTime;
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Copy each orphan to the backup backend before deleting it.
    pub backup: bool,
    /// Report what would be removed without touching anything.
    pub dry_run: bool,
}
impl Default for CleanupOptions {
    fn default() -> Self {
        Self { backup: true, dry_run: false }
    }
}

/// Whether a directory entry can be an uploaded media file: not hidden and
/// has an extension. Also keeps most subdirectories out.
pub fn is_media_candidate(name: &str) -> bool {
    !name.starts_with('.') && Path::new(name).extension().is_some()
}

/// Name of the per-run backup subdirectory, e.g. `orphans-1700000000`.
pub fn backup_dir_name(now: UtcDateTime) -> String {
    format!("orphans-{}", now.unix_timestamp())
}

/// Compares the media directory against the media index.
pub struct Reconciler {
    media: BackendHandle,
    index: IndexHandle,
    backups: Option<BackendHandle>,
}
impl Reconciler {
    pub fn new(media: BackendHandle, index: IndexHandle) -> Self {
        Self { media, index, backups: None }
    }

    /// Where orphans are copied before deletion. The backend root is created
    /// on first use.
    pub fn with_backups(mut self, backups: BackendHandle) -> Self {
        self.backups = Some(backups);
        self
    }

    /// Candidate media filenames in the media directory.
    #[instrument(skip(self), fields(backend = self.media.name()))]
    pub async fn file_system_files(&self) -> Result<Vec<String>> {
        let names = self.media.entry_names().await.or_raise(|| ErrorKind::FileSystem)?;
        let total = names.len();
        let names: Vec<String> = names.into_iter().filter(|name| is_media_candidate(name)).collect();
        tracing::debug!(total, candidates = names.len(), "Listed media directory");
        Ok(names)
    }

    /// Every filename recorded in the media index.
    #[instrument(skip(self))]
    pub async fn database_files(&self) -> Result<Vec<String>> {
        let names = self.index.list_filenames().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(count = names.len(), "Listed media index");
        Ok(names)
    }

    /// Files on disk with no index record, with size and modification time.
    pub async fn find_orphan_files(&self) -> Result<Vec<OrphanFile>> {
        let (on_disk, recorded) = self.scan().await?;
        Ok(self.stat_orphans(&on_disk, &recorded).await)
    }

    async fn scan(&self) -> Result<(Vec<String>, Vec<String>)> {
        tokio::try_join!(self.file_system_files(), self.database_files())
    }

    async fn stat_orphans(&self, on_disk: &[String], recorded: &[String]) -> Vec<OrphanFile> {
        let recorded: HashSet<&str> = recorded.iter().map(String::as_str).collect();
        let mut orphans = Vec::new();
        for name in on_disk.iter().filter(|name| !recorded.contains(name.as_str())) {
            match self.media.stat(name).await {
                Ok(info) => orphans.push(OrphanFile {
                    filename: info.name,
                    full_path: info.full_path,
                    size_bytes: info.size,
                    last_modified: info.modified,
                }),
                Err(err) => tracing::warn!(filename = %name, error = ?err, "Skipping orphan candidate that cannot be inspected"),
            }
        }
        orphans
    }

    /// Run a full reconciliation.
    ///
    /// Only a failed scan is an error. Backup and delete failures are recorded
    /// per file in the report; a file whose backup failed is never deleted.
    #[instrument(skip(self), fields(backend = self.media.name()))]
    pub async fn cleanup_orphan_files(&self, options: CleanupOptions) -> Result<CleanupReport> {
        // A dry run copies nothing, so it doesn't need a backup target.
        let backups = match (options.backup, &self.backups) {
            (false, _) => None,
            (true, Some(backups)) => Some(backups),
            (true, None) if options.dry_run => None,
            (true, None) => {
                exn::bail!(ErrorKind::NoBackupTarget);
            },
        };
        let (on_disk, recorded) = self.scan().await?;
        let orphans = self.stat_orphans(&on_disk, &recorded).await;
        let mut report = CleanupReport {
            dry_run: options.dry_run,
            file_system_count: on_disk.len(),
            database_count: recorded.len(),
            ..Default::default()
        };
        tracing::info!(
            orphans = orphans.len(),
            bytes = orphans.iter().map(|o| o.size_bytes).sum::<u64>(),
            "Orphan scan complete"
        );

        if options.dry_run {
            for orphan in &orphans {
                tracing::info!(filename = %orphan.filename, size = orphan.size_bytes, "Would remove orphan");
            }
            report.orphans = orphans;
            return Ok(report);
        }

        // Create the backup directory only when something will be copied into it.
        let backups = match backups {
            Some(backups) if !orphans.is_empty() => match backups.ensure_root().await {
                Ok(()) => {
                    report.backup_dir = Some(backups.full_path(""));
                    Some(backups)
                },
                Err(err) => {
                    tracing::error!(error = ?err, "Failed to create backup directory; no orphans will be removed");
                    for orphan in &orphans {
                        report.errors.push(CleanupError {
                            filename: orphan.filename.clone(),
                            stage: CleanupStage::Backup,
                            message: (*err).to_string(),
                        });
                    }
                    report.orphans = orphans;
                    return Ok(report);
                },
            },
            _ => None,
        };

        for orphan in &orphans {
            if let Some(backups) = backups
                && let Err(message) = backup(&*self.media, &**backups, &orphan.filename).await
            {
                tracing::warn!(filename = %orphan.filename, %message, "Backup failed; keeping original");
                report.errors.push(CleanupError {
                    filename: orphan.filename.clone(),
                    stage: CleanupStage::Backup,
                    message,
                });
                continue;
            }
            match self.media.delete(&orphan.filename).await {
                Ok(()) => {
                    tracing::info!(filename = %orphan.filename, size = orphan.size_bytes, "Removed orphan");
                    report.cleaned.push(orphan.filename.clone());
                    report.cleaned_bytes += orphan.size_bytes;
                },
                Err(err) => {
                    tracing::warn!(filename = %orphan.filename, error = ?err, "Failed to remove orphan");
                    report.errors.push(CleanupError {
                        filename: orphan.filename.clone(),
                        stage: CleanupStage::Delete,
                        message: (*err).to_string(),
                    });
                },
            }
        }
        report.orphans = orphans;
        tracing::info!(
            cleaned = report.cleaned_count(),
            bytes = report.cleaned_bytes,
            errors = report.errors.len(),
            "Orphan cleanup complete"
        );
        Ok(report)
    }
}

/// Stream one file into the backup backend. The copy is durable when this
/// returns `Ok`.
async fn backup(
    media: &dyn StorageBackend,
    backups: &dyn StorageBackend,
    filename: &str,
) -> std::result::Result<(), String> {
    match copy_file(media, backups, filename).await {
        Ok(bytes) => {
            tracing::debug!(filename, bytes, "Backed up orphan");
            Ok(())
        },
        Err(err) => Err((*err).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Outcome;
    use reel_index::{Database, MediaIndex, NewAsset};
    use reel_policy::MediaType;
    use reel_storage::backend::{LocalBackend, MockBackend};
    use rstest::rstest;
    use std::sync::Arc;

    async fn index_with(filenames: &[&str]) -> (Database, IndexHandle) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.repository();
        for filename in filenames {
            let asset = NewAsset {
                filename: filename.to_string(),
                media_type: MediaType::Image,
                mime_type: "image/jpeg".to_string(),
                size_bytes: 1,
            };
            repo.insert(&asset).await.unwrap();
        }
        let index: IndexHandle = Arc::new(repo);
        (db, index)
    }

    fn abc() -> Arc<MockBackend> {
        Arc::new(MockBackend::with_files([
            ("A.jpg", b"aaaa".to_vec()),
            ("B.jpg", b"bb".to_vec()),
            ("C.png", b"cccccc".to_vec()),
        ]))
    }

    #[rstest]
    #[case("photo.jpg", true)]
    #[case("clip.final.mp4", true)]
    #[case("file.", true)]
    #[case(".DS_Store", false)]
    #[case(".hidden.jpg", false)]
    #[case("thumbnails", false)]
    #[case("README", false)]
    fn test_is_media_candidate(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_media_candidate(name), expected);
    }

    #[test]
    fn test_backup_dir_name() {
        let now = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(backup_dir_name(now), "orphans-1700000000");
    }

    #[tokio::test]
    async fn test_file_system_files_filters_candidates() {
        let media = Arc::new(MockBackend::with_files([
            ("a.jpg", b"a".to_vec()),
            (".gitkeep", b"".to_vec()),
            ("LICENSE", b"".to_vec()),
        ]));
        let (_db, index) = index_with(&[]).await;
        let reconciler = Reconciler::new(media, index);
        assert_eq!(reconciler.file_system_files().await.unwrap(), ["a.jpg"]);
    }

    #[tokio::test]
    async fn test_orphans_are_the_set_difference() {
        let media = abc();
        let a_modified = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let c_modified = UtcDateTime::from_unix_timestamp(1_700_000_500).unwrap();
        media.set_modified("A.jpg", a_modified).await;
        media.set_modified("C.png", c_modified).await;
        let (_db, index) = index_with(&["B.jpg"]).await;
        let reconciler = Reconciler::new(media, index);
        let orphans = reconciler.find_orphan_files().await.unwrap();
        let names: Vec<_> = orphans.iter().map(|o| o.filename.as_str()).collect();
        assert_eq!(names, ["A.jpg", "C.png"]);
        assert_eq!(orphans[0].size_bytes, 4);
        assert_eq!(orphans[0].last_modified, a_modified);
        assert_eq!(orphans[1].size_bytes, 6);
        assert_eq!(orphans[1].last_modified, c_modified);
        assert_eq!(orphans[0].full_path, Path::new("mock/A.jpg"));
    }

    #[tokio::test]
    async fn test_local_orphan_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let modified = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        for (name, data) in [("kept.jpg", &b"kept"[..]), ("stray.mp4", &b"0123456789"[..])] {
            let file = std::fs::File::create(dir.path().join(name)).unwrap();
            std::io::Write::write_all(&mut &file, data).unwrap();
            file.set_modified(modified).unwrap();
        }
        let media = Arc::new(LocalBackend::new("uploads", dir.path()).unwrap());
        let (_db, index) = index_with(&["kept.jpg"]).await;
        let orphans = Reconciler::new(media, index).find_orphan_files().await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].filename, "stray.mp4");
        assert_eq!(orphans[0].full_path, dir.path().join("stray.mp4"));
        assert_eq!(orphans[0].size_bytes, 10);
        assert_eq!(orphans[0].last_modified, UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap());
    }

    #[tokio::test]
    async fn test_matching_is_exact() {
        let (_db, index) = index_with(&["a.jpg", "B.jpg.bak", "C"]).await;
        let reconciler = Reconciler::new(abc(), index);
        assert_eq!(reconciler.find_orphan_files().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unstattable_candidate_is_excluded() {
        let media = abc();
        media.fail_stat("A.jpg").await;
        let (_db, index) = index_with(&["B.jpg"]).await;
        let reconciler = Reconciler::new(media, index);
        let orphans = reconciler.find_orphan_files().await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].filename, "C.png");
    }

    #[tokio::test]
    async fn test_unreadable_directory_is_fatal() {
        let media = Arc::new(MockBackend::default().unlisted());
        let (_db, index) = index_with(&[]).await;
        let reconciler = Reconciler::new(media, index);
        let err = reconciler.cleanup_orphan_files(CleanupOptions { backup: false, dry_run: true }).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::FileSystem));
    }

    #[tokio::test]
    async fn test_index_failure_is_fatal() {
        let (db, index) = index_with(&[]).await;
        db.close().await;
        let reconciler = Reconciler::new(abc(), index);
        let err = reconciler.find_orphan_files().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
    }

    #[tokio::test]
    async fn test_backup_requires_target() {
        let (_db, index) = index_with(&[]).await;
        let media = abc();
        let reconciler = Reconciler::new(media.clone(), index);
        let err = reconciler.cleanup_orphan_files(CleanupOptions::default()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoBackupTarget));
        assert_eq!(media.names().await.len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_backup_target() {
        let (_db, index) = index_with(&["B.jpg"]).await;
        let media = abc();
        let reconciler = Reconciler::new(media.clone(), index);
        let report = reconciler.cleanup_orphan_files(CleanupOptions { backup: true, dry_run: true }).await.unwrap();
        assert_eq!(report.orphan_count(), 2);
        assert_eq!(report.backup_dir, None);
        assert_eq!(media.names().await.len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backup_root = dir.path().join("backups").join("orphans-1");
        let backups = Arc::new(LocalBackend::new("backups", &backup_root).unwrap());
        let media = abc();
        let (_db, index) = index_with(&["B.jpg"]).await;
        let reconciler = Reconciler::new(media.clone(), index).with_backups(backups);

        let report = reconciler.cleanup_orphan_files(CleanupOptions { backup: true, dry_run: true }).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.orphan_count(), 2);
        assert_eq!(report.orphan_bytes(), 10);
        assert_eq!(report.cleaned_count(), 0);
        assert_eq!(report.outcome(), Outcome::Reported);
        assert_eq!(report.backup_dir, None);
        assert_eq!(media.names().await, ["A.jpg", "B.jpg", "C.png"]);
        assert!(!dir.path().join("backups").exists());
    }

    #[tokio::test]
    async fn test_backup_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backup_root = dir.path().join("backups").join("orphans-1");
        let backups = Arc::new(LocalBackend::new("backups", &backup_root).unwrap());
        let media = abc();
        let (_db, index) = index_with(&["B.jpg"]).await;
        let reconciler = Reconciler::new(media.clone(), index).with_backups(backups);

        let report = reconciler.cleanup_orphan_files(CleanupOptions::default()).await.unwrap();
        assert_eq!(report.file_system_count, 3);
        assert_eq!(report.database_count, 1);
        assert_eq!(report.cleaned, ["A.jpg", "C.png"]);
        assert_eq!(report.cleaned_bytes, 10);
        assert_eq!(report.backup_dir, Some(backup_root.join("")));
        assert_eq!(report.outcome(), Outcome::Reported);
        assert_eq!(media.names().await, ["B.jpg"]);
        assert_eq!(std::fs::read(backup_root.join("A.jpg")).unwrap(), b"aaaa");
        assert_eq!(std::fs::read(backup_root.join("C.png")).unwrap(), b"cccccc");
    }

    #[tokio::test]
    async fn test_failed_copy_keeps_original() {
        let backups = Arc::new(MockBackend::default().with_name("backups"));
        backups.fail_write("A.jpg").await;
        let media = abc();
        let (_db, index) = index_with(&["B.jpg"]).await;
        let reconciler = Reconciler::new(media.clone(), index).with_backups(backups.clone());

        let report = reconciler.cleanup_orphan_files(CleanupOptions::default()).await.unwrap();
        assert_eq!(report.backup_dir, Some(Path::new("backups").to_path_buf()));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].filename, "A.jpg");
        assert_eq!(report.errors[0].stage, CleanupStage::Backup);
        assert_eq!(report.cleaned, ["C.png"]);
        assert_eq!(report.outcome(), Outcome::ReportedWithErrors);
        assert_eq!(media.names().await, ["A.jpg", "B.jpg"]);
        assert_eq!(backups.names().await, ["C.png"]);
    }

    #[tokio::test]
    async fn test_uncreatable_backup_dir_keeps_everything() {
        let backups = Arc::new(MockBackend::default().with_name("backups").read_only());
        let media = abc();
        let (_db, index) = index_with(&["B.jpg"]).await;
        let reconciler = Reconciler::new(media.clone(), index).with_backups(backups);

        let report = reconciler.cleanup_orphan_files(CleanupOptions::default()).await.unwrap();
        assert_eq!(report.backup_dir, None);
        assert!(report.cleaned.is_empty());
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.stage == CleanupStage::Backup));
        assert_eq!(report.outcome(), Outcome::ReportedWithErrors);
        assert_eq!(media.names().await, ["A.jpg", "B.jpg", "C.png"]);
    }

    #[tokio::test]
    async fn test_delete_failure_is_recorded() {
        let media = Arc::new(
            MockBackend::with_files([("A.jpg", b"a".to_vec()), ("B.jpg", b"b".to_vec())]).read_only(),
        );
        let (_db, index) = index_with(&[]).await;
        let reconciler = Reconciler::new(media.clone(), index);

        let report = reconciler.cleanup_orphan_files(CleanupOptions { backup: false, dry_run: false }).await.unwrap();
        assert_eq!(report.orphan_count(), 2);
        assert!(report.cleaned.is_empty());
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.stage == CleanupStage::Delete));
        assert_eq!(media.names().await, ["A.jpg", "B.jpg"]);
    }

    #[tokio::test]
    async fn test_no_orphans_is_a_clean_run() {
        let (_db, index) = index_with(&["A.jpg", "B.jpg", "C.png"]).await;
        let backups = Arc::new(MockBackend::default().read_only());
        let reconciler = Reconciler::new(abc(), index).with_backups(backups);
        let report = reconciler.cleanup_orphan_files(CleanupOptions::default()).await.unwrap();
        assert_eq!(report.orphan_count(), 0);
        assert_eq!(report.backup_dir, None);
        assert_eq!(report.outcome(), Outcome::Reported);
    }
}
