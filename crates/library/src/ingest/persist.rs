use crate::ingest::error::{ErrorKind, Result};
use exn::ResultExt;
use reel_index::{MediaAsset, MediaIndex, NewAsset};
use reel_policy::MediaType;
use reel_storage::{StorageBackend, validate_name};
use tracing::instrument;

/// Write an upload into the media directory and record it in the index.
///
/// The file is written first. If recording it fails the file is deleted
/// again, so a failed upload does not leave an orphan behind. If that delete
/// also fails the file stays put and a later reconciliation run will find it.
///
/// Existence is checked before writing but not atomically with it; two
/// concurrent uploads of the same name can race.
#[instrument(skip(backend, index, bytes), fields(backend = backend.name(), size = bytes.len()))]
pub async fn persist(
    backend: &dyn StorageBackend,
    index: &dyn MediaIndex,
    filename: &str,
    mime_type: &str,
    bytes: &[u8],
) -> Result<MediaAsset> {
    let filename = validate_name(filename).or_raise(|| ErrorKind::InvalidName(filename.to_string()))?;
    let Some(media_type) = MediaType::from_mime(mime_type) else {
        exn::bail!(ErrorKind::UnsupportedMedia(mime_type.to_string()));
    };
    if backend.exists(filename).await.or_raise(|| ErrorKind::Storage)? {
        exn::bail!(ErrorKind::AlreadyExists(filename.to_string()));
    }
    backend.write(filename, bytes).await.or_raise(|| ErrorKind::Storage)?;

    let asset = NewAsset {
        filename: filename.to_string(),
        media_type,
        mime_type: mime_type.to_string(),
        size_bytes: bytes.len() as u64,
    };
    match index.insert(&asset).await {
        Ok(recorded) => {
            tracing::info!(id = recorded.id, media_type = %recorded.media_type, "Stored upload");
            Ok(recorded)
        },
        Err(err) => {
            tracing::warn!(error = ?err, "Failed to record upload; removing written file");
            if let Err(cleanup) = backend.delete(filename).await {
                tracing::error!(error = ?cleanup, "Failed to remove file after a failed upload; it is now an orphan");
            }
            let kind = match &*err {
                reel_index::error::ErrorKind::Duplicate(name) => ErrorKind::AlreadyExists(name.clone()),
                _ => ErrorKind::Index,
            };
            Err(err.raise(kind))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_index::Database;
    use reel_storage::backend::{LocalBackend, MockBackend};
    use rstest::rstest;

    #[tokio::test]
    async fn test_persist_writes_and_records() {
        let backend = MockBackend::default();
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.repository();

        let asset = persist(&backend, &repo, "a.jpg", "image/jpeg", b"jpeg").await.unwrap();
        assert_eq!(asset.filename, "a.jpg");
        assert_eq!(asset.media_type, MediaType::Image);
        assert_eq!(asset.size_bytes, 4);
        assert_eq!(backend.read("a.jpg").await.unwrap(), b"jpeg");
        assert_eq!(repo.list_filenames().await.unwrap(), ["a.jpg"]);
    }

    #[tokio::test]
    async fn test_failed_record_removes_file() {
        let backend = MockBackend::default();
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.repository();
        db.close().await;

        let err = persist(&backend, &repo, "a.mp4", "video/mp4", b"mp4").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Index));
        assert!(err.is_retryable());
        assert!(backend.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_record_removes_file() {
        let backend = MockBackend::default();
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.repository();
        let asset = NewAsset {
            filename: "a.jpg".to_string(),
            media_type: MediaType::Image,
            mime_type: "image/jpeg".to_string(),
            size_bytes: 1,
        };
        repo.insert(&asset).await.unwrap();

        let err = persist(&backend, &repo, "a.jpg", "image/jpeg", b"jpeg").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(name) if name == "a.jpg"));
        assert!(backend.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_existing_file_is_not_overwritten() {
        let backend = MockBackend::with_files([("a.jpg", b"old".to_vec())]);
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.repository();

        let err = persist(&backend, &repo, "a.jpg", "image/jpeg", b"new").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
        assert_eq!(backend.read("a.jpg").await.unwrap(), b"old");
        assert!(repo.list_filenames().await.unwrap().is_empty());
    }

    #[rstest]
    #[case("../escape.jpg")]
    #[case("nested/a.jpg")]
    #[case("/abs.jpg")]
    #[case("")]
    #[case("..")]
    #[tokio::test]
    async fn test_invalid_names_are_rejected(#[case] filename: &str) {
        let backend = MockBackend::default();
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.repository();

        let err = persist(&backend, &repo, filename, "image/jpeg", b"x").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName(_)));
        assert!(backend.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_media_is_rejected() {
        let backend = MockBackend::default();
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.repository();

        let err = persist(&backend, &repo, "a.pdf", "application/pdf", b"%PDF").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedMedia(mime) if mime == "application/pdf"));
        assert!(backend.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_to_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("uploads", dir.path()).unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.repository();

        persist(&backend, &repo, "clip.mp4", "video/mp4", b"frames").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap(), b"frames");
        let recorded = repo.get_by_filename("clip.mp4").await.unwrap().unwrap();
        assert_eq!(recorded.media_type, MediaType::Video);
    }
}
