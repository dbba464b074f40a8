mod ffs;
mod file;
mod log;

pub use self::ffs::{Ffs, NewFfs};
pub(crate) use self::ffs::FfsRow;
pub use self::file::{NewFile, StoredFile};
pub(crate) use self::file::FileRow;
pub use self::log::LogEntry;
pub(crate) use self::log::LogRow;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;

pub(crate) fn timestamp_from_row(value: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(value).or_raise(|| ErrorKind::InvalidData(field))
}
