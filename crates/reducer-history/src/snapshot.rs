/// Versioned snapshot of the action stack and cursor.
///
/// The JSON shape is the stable contract with external persistence layers:
///
/// ```json
/// { "version": "0", "stack": [ { "name": "...", "forwardArgs": ..., "reverseArgs": ... } ], "cursor": 0 }
/// ```
///
/// Entries carry `seriesKey` and `children` only when present.
use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, HistoryResult};
use crate::operation::RecordedEntry;

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: &str = "0";

/// Structural copy of an `UndoManager`'s history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub stack: Vec<RecordedEntry>,
    /// Index of the newest applied entry, `-1` when none is applied.
    pub cursor: i64,
}

impl Snapshot {
    /// Creates a current-version snapshot.
    pub fn new(stack: Vec<RecordedEntry>, cursor: isize) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            stack,
            cursor: cursor as i64,
        }
    }

    /// Encodes the snapshot as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if an argument value cannot be encoded.
    pub fn to_json(&self) -> HistoryResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a snapshot from JSON. The version is checked on restore,
    /// not here, so callers can inspect foreign snapshots.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON.
    pub fn from_json(json: &str) -> HistoryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks the version and cursor range.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleSnapshot` describing the first problem found.
    pub fn validate(&self) -> HistoryResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(HistoryError::incompatible(format!(
                "unsupported version {:?}, expected {SNAPSHOT_VERSION:?}",
                self.version
            )));
        }
        let newest = self.stack.len() as i64 - 1;
        if self.cursor < -1 || self.cursor > newest {
            return Err(HistoryError::incompatible(format!(
                "cursor {} outside [-1, {newest}]",
                self.cursor
            )));
        }
        Ok(())
    }

    /// Validates and splits into the stack and the applied-entry count.
    pub(crate) fn into_parts(self) -> HistoryResult<(Vec<RecordedEntry>, usize)> {
        self.validate()?;
        let applied = (self.cursor + 1) as usize;
        Ok((self.stack, applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(name: &str) -> RecordedEntry {
        RecordedEntry {
            name: name.to_string(),
            forward_args: json!({"to": 2}),
            reverse_args: json!({"to": 1}),
            series_key: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_json_shape() {
        let snapshot = Snapshot::new(vec![entry("move")], 0);
        let encoded: serde_json::Value =
            serde_json::from_str(&snapshot.to_json().expect("encode")).expect("parse");
        assert_eq!(
            encoded,
            json!({
                "version": "0",
                "stack": [{"name": "move", "forwardArgs": {"to": 2}, "reverseArgs": {"to": 1}}],
                "cursor": 0
            })
        );
    }

    #[test]
    fn test_from_json_with_children_and_series() {
        let json = r#"{
            "version": "0",
            "stack": [{
                "name": "move",
                "forwardArgs": 3,
                "reverseArgs": 1,
                "seriesKey": "drag",
                "children": [{"name": "select", "forwardArgs": "a", "reverseArgs": null}]
            }],
            "cursor": -1
        }"#;
        let snapshot = Snapshot::from_json(json).expect("decode");
        assert_eq!(snapshot.cursor, -1);
        assert_eq!(snapshot.stack[0].series_key.as_deref(), Some("drag"));
        assert_eq!(snapshot.stack[0].children[0].name, "select");
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        let err = Snapshot::from_json("{ nope").unwrap_err();
        assert!(matches!(err, HistoryError::Serialization(_)));
    }

    #[test]
    fn test_version_mismatch() {
        let mut snapshot = Snapshot::new(vec![entry("move")], 0);
        snapshot.version = "1".to_string();
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, HistoryError::IncompatibleSnapshot { .. }));
    }

    #[test]
    fn test_cursor_out_of_range() {
        assert!(Snapshot::new(vec![entry("move")], 1).validate().is_err());
        assert!(Snapshot::new(vec![entry("move")], -2).validate().is_err());
        assert!(Snapshot::new(Vec::new(), -1).validate().is_ok());
        assert!(Snapshot::new(Vec::new(), 0).validate().is_err());
    }

    #[test]
    fn test_into_parts() {
        let (stack, applied) = Snapshot::new(vec![entry("a"), entry("b")], 0)
            .into_parts()
            .expect("parts");
        assert_eq!(stack.len(), 2);
        assert_eq!(applied, 1);
    }
}
