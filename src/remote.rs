//! Remote row service contract.
//!
//! The remote store is a flat table with columns `Id, Name, DataType, Data,
//! Status, LastModifiedTime` plus a lowercase-name index column. `Name`
//! encodes the parent link as `"<parentId>/<basename>"`, `Data` holds a JSON
//! payload with a `content` field for files, and `Status` marks soft-deleted
//! rows as `Trashed`. This crate consumes the protocol; transports implement
//! [`RowService`].

use crate::error::RemoteError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema-version tag supplied on every row save.
pub const SCHEMA_VERSION: u32 = 8;

/// `DataType` column values this crate cares about. The store holds other
/// row kinds; queries filter them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    File,
    Folder,
}

/// `Status` column: rows are soft-deleted, never physically removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Active,
    Trashed,
}

/// One workspace row as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRow {
    pub id: String,
    /// `"<parentId>/<basename>"`; an empty parent id denotes the root.
    pub name: String,
    /// Lowercase-name index column, kept in sync with `name` on every write.
    pub name_lowercase: String,
    pub data_type: RowKind,
    /// JSON payload; `{"content": ...}` for files, empty for folders.
    pub data: String,
    pub status: RowStatus,
    pub last_modified: Option<DateTime<Utc>>,
}

impl WorkspaceRow {
    /// Split the encoded `Name` column into `(parent_id, basename)`.
    pub fn parent_and_base(&self) -> (&str, &str) {
        match self.name.split_once('/') {
            Some((parent, base)) => (parent, base),
            None => ("", self.name.as_str()),
        }
    }
}

/// Fields for a row that does not exist yet; the service allocates the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRow {
    pub name: String,
    pub name_lowercase: String,
    pub data_type: RowKind,
    pub data: String,
    pub status: RowStatus,
}

impl NewRow {
    pub fn new(parent_id: &str, base_name: &str, data_type: RowKind, data: String) -> Self {
        let name = format!("{parent_id}/{base_name}");
        NewRow {
            name_lowercase: name.to_lowercase(),
            name,
            data_type,
            data,
            status: RowStatus::Active,
        }
    }
}

/// Shape of the `Data` column payload for file rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowData {
    pub content: String,
}

impl RowData {
    pub fn encode(content: &str) -> String {
        // Serializing a struct of one string field cannot fail.
        serde_json::to_string(&RowData {
            content: content.to_string(),
        })
        .unwrap_or_default()
    }

    pub fn decode(data: &str) -> Option<RowData> {
        serde_json::from_str(data).ok()
    }
}

/// The external, table-like store the tree is reconstructed from.
///
/// One handle per connected root; handles are produced by the embedder's
/// connector (see [`crate::registry::ServiceRegistry`]) and shared behind an
/// `Arc`.
#[async_trait]
pub trait RowService: Send + Sync {
    /// Fetch every row with `Status = Active` and `DataType` in
    /// `{File, Folder}` in a single viewport query. No pagination happens at
    /// this layer.
    async fn active_rows(&self) -> Result<Vec<WorkspaceRow>, RemoteError>;

    /// Read a single row by id, `Trashed` rows included.
    async fn row_by_id(&self, id: &str) -> Result<Option<WorkspaceRow>, RemoteError>;

    /// Create a row and return the id the store allocated.
    async fn create_row(&self, row: NewRow) -> Result<String, RemoteError>;

    /// Overwrite a row by id, supplying the schema-version tag.
    async fn save_row(&self, row: WorkspaceRow, schema_version: u32) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_column_splits_into_parent_and_base() {
        let row = WorkspaceRow {
            id: "2".into(),
            name: "1/a.txt".into(),
            name_lowercase: "1/a.txt".into(),
            data_type: RowKind::File,
            data: String::new(),
            status: RowStatus::Active,
            last_modified: None,
        };
        assert_eq!(row.parent_and_base(), ("1", "a.txt"));
    }

    #[test]
    fn new_row_keeps_lowercase_index_in_sync() {
        let row = NewRow::new("7", "Notes.TXT", RowKind::File, RowData::encode("x"));
        assert_eq!(row.name, "7/Notes.TXT");
        assert_eq!(row.name_lowercase, "7/notes.txt");
    }

    #[test]
    fn data_payload_round_trips() {
        let encoded = RowData::encode("print(1)\n");
        assert_eq!(RowData::decode(&encoded).unwrap().content, "print(1)\n");
        assert!(RowData::decode("").is_none());
    }
}
