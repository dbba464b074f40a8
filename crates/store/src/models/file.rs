use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use std::path::PathBuf;
use time::UtcDateTime;

/// A file that was successfully pushed to Filecoin through one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: i64,
    /// Local directory the upload was staged in.
    pub file_path: PathBuf,
    /// Display name: the sanitized original name, or the package name for bundles.
    pub file_name: String,
    pub uploaded_at: UtcDateTime,
    pub size: u64,
    /// Content identifier assigned by the backend. Unique across all files.
    pub cid: String,
    /// Row identifier of the owning [`Ffs`](crate::Ffs).
    pub ffs: i64,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub file_path: PathBuf,
    pub file_name: String,
    pub uploaded_at: UtcDateTime,
    pub size: u64,
    pub cid: String,
    pub ffs: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FileRow {
    pub(crate) id: i64,
    pub(crate) file_path: String,
    pub(crate) file_name: String,
    pub(crate) uploaded_at: i64,
    pub(crate) file_size: i64,
    pub(crate) cid: String,
    pub(crate) ffs: i64,
}
impl TryFrom<&NewFile> for FileRow {
    type Error = Error;
    fn try_from(file: &NewFile) -> Result<Self, Self::Error> {
        if file.cid.is_empty() {
            exn::bail!(ErrorKind::InvalidData("cid"));
        }
        Ok(Self {
            id: 0,
            file_path: file.file_path.to_str().ok_or_raise(|| ErrorKind::InvalidData("file path"))?.to_string(),
            file_name: file.file_name.clone(),
            uploaded_at: file.uploaded_at.unix_timestamp(),
            file_size: i64::try_from(file.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            cid: file.cid.clone(),
            ffs: file.ffs,
        })
    }
}
impl TryFrom<FileRow> for StoredFile {
    type Error = Error;
    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            file_path: PathBuf::from(row.file_path),
            file_name: row.file_name,
            uploaded_at: super::timestamp_from_row(row.uploaded_at, "upload date")?,
            size: u64::try_from(row.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            cid: row.cid,
            ffs: row.ffs,
        })
    }
}
