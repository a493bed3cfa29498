//! In-memory row service.
//!
//! Backs the test suite and embedders that want a local workspace with the
//! same soft-delete semantics as the remote store.

use crate::error::RemoteError;
use crate::remote::{NewRow, RowKind, RowService, RowStatus, WorkspaceRow};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct MemoryState {
    rows: HashMap<String, WorkspaceRow>,
    next_id: u64,
    saves: Vec<String>,
    fetches: u64,
}

/// `RowService` over a process-local table.
#[derive(Default)]
pub struct MemoryRowService {
    state: RwLock<MemoryState>,
}

impl MemoryRowService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row with a fixed id, bypassing id allocation. Test setup only
    /// needs `Active` rows, but any status is accepted.
    pub fn insert_row(&self, row: WorkspaceRow) {
        let mut state = self.state.write();
        if let Ok(n) = row.id.parse::<u64>() {
            state.next_id = state.next_id.max(n);
        }
        state.rows.insert(row.id.clone(), row);
    }

    /// Ids of every row saved via [`RowService::save_row`], in call order.
    /// Lets tests assert mutation ordering, e.g. children trashed before
    /// their parent.
    pub fn save_order(&self) -> Vec<String> {
        self.state.read().saves.clone()
    }

    /// Current status of a row, if it exists.
    pub fn status_of(&self, id: &str) -> Option<RowStatus> {
        self.state.read().rows.get(id).map(|r| r.status)
    }

    pub fn row_count(&self) -> usize {
        self.state.read().rows.len()
    }

    /// How many viewport queries have been issued. Lets tests assert that
    /// concurrent tree builds collapse into a single fetch.
    pub fn fetch_count(&self) -> u64 {
        self.state.read().fetches
    }
}

#[async_trait]
impl RowService for MemoryRowService {
    async fn active_rows(&self) -> Result<Vec<WorkspaceRow>, RemoteError> {
        let mut state = self.state.write();
        state.fetches += 1;
        let mut rows: Vec<_> = state
            .rows
            .values()
            .filter(|row| {
                row.status == RowStatus::Active
                    && matches!(row.data_type, RowKind::File | RowKind::Folder)
            })
            .cloned()
            .collect();
        // Deterministic viewport order.
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }

    async fn row_by_id(&self, id: &str) -> Result<Option<WorkspaceRow>, RemoteError> {
        Ok(self.state.read().rows.get(id).cloned())
    }

    async fn create_row(&self, row: NewRow) -> Result<String, RemoteError> {
        let mut state = self.state.write();
        state.next_id += 1;
        let id = state.next_id.to_string();
        state.rows.insert(
            id.clone(),
            WorkspaceRow {
                id: id.clone(),
                name: row.name,
                name_lowercase: row.name_lowercase,
                data_type: row.data_type,
                data: row.data,
                status: row.status,
                last_modified: Some(Utc::now()),
            },
        );
        Ok(id)
    }

    async fn save_row(&self, mut row: WorkspaceRow, _schema_version: u32) -> Result<(), RemoteError> {
        let mut state = self.state.write();
        if !state.rows.contains_key(&row.id) {
            return Err(RemoteError::Mutation(format!("no such row: {}", row.id)));
        }
        row.last_modified = Some(Utc::now());
        state.saves.push(row.id.clone());
        state.rows.insert(row.id.clone(), row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RowData;

    fn file_row(id: &str, parent: &str, base: &str, content: &str) -> WorkspaceRow {
        WorkspaceRow {
            id: id.into(),
            name: format!("{parent}/{base}"),
            name_lowercase: format!("{parent}/{base}").to_lowercase(),
            data_type: RowKind::File,
            data: RowData::encode(content),
            status: RowStatus::Active,
            last_modified: None,
        }
    }

    #[tokio::test]
    async fn trashed_rows_are_filtered_from_active_query() {
        let svc = MemoryRowService::new();
        svc.insert_row(file_row("1", "", "a.txt", "x"));
        let mut trashed = file_row("2", "", "b.txt", "y");
        trashed.status = RowStatus::Trashed;
        svc.insert_row(trashed);

        let rows = svc.active_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "1");

        // Soft-deleted rows are still readable by id.
        assert!(svc.row_by_id("2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn created_ids_do_not_collide_with_seeded_rows() {
        let svc = MemoryRowService::new();
        svc.insert_row(file_row("5", "", "a.txt", "x"));
        let id = svc
            .create_row(NewRow::new("", "b.txt", RowKind::File, RowData::encode("y")))
            .await
            .unwrap();
        assert_eq!(id, "6");
    }

    #[tokio::test]
    async fn save_rejects_unknown_row() {
        let svc = MemoryRowService::new();
        let err = svc
            .save_row(file_row("9", "", "a.txt", "x"), crate::remote::SCHEMA_VERSION)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Mutation(_)));
    }
}
