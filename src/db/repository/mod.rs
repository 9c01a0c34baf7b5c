pub mod contact;
pub mod emergency;

pub use contact::*;
pub use emergency::*;

use chrono::NaiveDateTime;

use super::DatabaseError;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_ts(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {s}: {e}")))
}

pub(crate) fn parse_uuid(s: &str) -> Result<uuid::Uuid, DatabaseError> {
    uuid::Uuid::parse_str(s)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad uuid {s}: {e}")))
}
