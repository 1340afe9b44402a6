//! Typed views of RDS replies.
//!
//! Each decoder checks the field count announced by the server against what its command
//! returns before it builds anything, and rejects the reply as a whole when a field is
//! missing, truncated or out of range.
mod admin;
mod browse;
mod debugger;
mod file;
mod sql;

pub(crate) use admin::expect_empty_message;
pub use admin::{AnalyzerStatus, IdeInfo, ScanStarted, decode_analyzer, decode_ide_info};
pub use browse::{DirectoryEntry, EntryKind, Permissions, decode_listing, filetime_to_unix_ms};
pub use debugger::{
    DebuggerEvent, EventKind, StopLocation, decode_event, decode_server_port, decode_session_id,
    decode_stop,
};
pub use file::{FileContent, decode_file_content};
pub use sql::{
    ColumnInfo, ColumnMetadata, ForeignKey, PrimaryKey, ResultSet, TableInfo, decode_column_info,
    decode_flat_result_set, decode_foreign_keys, decode_metadata, decode_primary_keys,
    decode_result_set, decode_table_info,
};

use crate::{buffer::DecodeError, protocol::Response};

/// Number of `size`-field records in a reply announcing `count` fields.
pub(crate) fn record_count(count: i64, size: usize) -> Result<usize, DecodeError> {
    usize::try_from(count)
        .ok()
        .filter(|c| c % size == 0)
        .map(|c| c / size)
        .ok_or_else(|| DecodeError::FieldCount {
            expected: format!("a multiple of {size}"),
            found: count,
        })
}

pub(crate) fn expect_count(count: i64, expected: i64) -> Result<(), DecodeError> {
    if count == expected {
        Ok(())
    } else {
        Err(DecodeError::FieldCount {
            expected: expected.to_string(),
            found: count,
        })
    }
}

/// Leading field of a reply announcing at least one.
pub fn decode_first_string(response: &Response) -> Result<String, DecodeError> {
    if response.count() < 1 {
        return Err(DecodeError::FieldCount {
            expected: "at least 1".into(),
            found: response.count(),
        });
    }
    response.fields().string()
}

/// Every announced field as a string.
pub fn decode_strings(response: &Response) -> Result<Vec<String>, DecodeError> {
    let count = record_count(response.count(), 1)?;
    let mut fields = response.fields();
    (0..count).map(|_| fields.string()).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::protocol::Response;

    /// Builds a reply body from a field count and raw fields.
    pub(crate) fn response(count: i64, fields: &[&[u8]]) -> Response {
        let mut raw = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();
        raw.extend_from_slice(format!("{count}:").as_bytes());
        for field in fields {
            raw.extend_from_slice(format!("{}:", field.len()).as_bytes());
            raw.extend_from_slice(field);
        }
        Response::parse(&raw).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::response, *};

    #[test]
    fn record_count_rejects_remainders() {
        assert_eq!(record_count(10, 5).unwrap(), 2);
        assert_eq!(record_count(0, 5).unwrap(), 0);
        assert!(record_count(7, 5).is_err());
        assert!(record_count(-5, 5).is_err());
    }

    #[test]
    fn strings() {
        let reply = response(2, &[b"cfartgallery", b"cfdocexamples"]);
        assert_eq!(
            decode_strings(&reply).unwrap(),
            vec!["cfartgallery", "cfdocexamples"]
        );
    }

    #[test]
    fn first_string_ignores_the_rest() {
        let reply = response(2, &[b"C:\\ColdFusion2023\\cfusion", b"extra"]);
        assert_eq!(
            decode_first_string(&reply).unwrap(),
            "C:\\ColdFusion2023\\cfusion"
        );
        assert!(decode_first_string(&response(0, &[])).is_err());
    }

    #[test]
    fn strings_short_reply() {
        let reply = response(3, &[b"one", b"two"]);
        assert!(decode_strings(&reply).is_err());
    }
}
