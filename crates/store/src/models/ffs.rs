use crate::error::{Error, ErrorKind};
use time::UtcDateTime;

/// A Filecoin FileSystem profile created on the Powergate backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ffs {
    /// Local row identifier, referenced by [`StoredFile::ffs`](crate::StoredFile::ffs).
    pub id: i64,
    /// Identifier issued by the backend.
    pub ffs_id: String,
    /// Auth token sent with every profile-scoped backend call.
    pub token: String,
    pub created_at: UtcDateTime,
    pub is_default: bool,
}

/// A profile that has been created remotely but not yet recorded.
#[derive(Debug, Clone)]
pub struct NewFfs {
    pub ffs_id: String,
    pub token: String,
    pub created_at: UtcDateTime,
    pub is_default: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct FfsRow {
    id: i64,
    ffs_id: String,
    token: String,
    created_at: i64,
    is_default: bool,
}
impl TryFrom<FfsRow> for Ffs {
    type Error = Error;
    fn try_from(row: FfsRow) -> Result<Self, Self::Error> {
        if row.ffs_id.is_empty() || row.token.is_empty() {
            exn::bail!(ErrorKind::InvalidData("ffs identity"));
        }
        Ok(Self {
            id: row.id,
            ffs_id: row.ffs_id,
            token: row.token,
            created_at: super::timestamp_from_row(row.created_at, "ffs creation date")?,
            is_default: row.is_default,
        })
    }
}
