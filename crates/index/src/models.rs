use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use reel_policy::MediaType;
use serde::Serialize;
use time::UtcDateTime;

/// A recorded media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaAsset {
    pub id: i64,
    pub filename: String,
    pub media_type: MediaType,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: UtcDateTime,
}

/// An asset about to be recorded. `created_at` is set on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    pub filename: String,
    pub media_type: MediaType,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[derive(sqlx::FromRow)]
pub(crate) struct MediaRow {
    id: i64,
    filename: String,
    media_type: String,
    mime_type: String,
    size_bytes: i64,
    created_at: i64,
}
impl TryFrom<MediaRow> for MediaAsset {
    type Error = Error;
    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            filename: row.filename,
            media_type: row.media_type.parse::<MediaType>().or_raise(|| ErrorKind::InvalidData("media type"))?,
            mime_type: row.mime_type,
            size_bytes: u64::try_from(row.size_bytes).or_raise(|| ErrorKind::InvalidData("size"))?,
            created_at: UtcDateTime::from_unix_timestamp(row.created_at)
                .or_raise(|| ErrorKind::InvalidData("creation date"))?,
        })
    }
}
