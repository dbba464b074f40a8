use crate::error::Error;
use time::UtcDateTime;

/// One line of the user-facing audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: UtcDateTime,
    pub event: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct LogRow {
    id: i64,
    timestamp: i64,
    event: String,
}
impl TryFrom<LogRow> for LogEntry {
    type Error = Error;
    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            timestamp: super::timestamp_from_row(row.timestamp, "log timestamp")?,
            event: row.event,
        })
    }
}
