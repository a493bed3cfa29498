//! Tree builder: folds a flat batch of workspace rows into an [`FsMap`].
//!
//! Each row encodes its parent link in the `Name` column; full paths are
//! derived by walking `parent_id` references upward until an id is not found
//! in the batch, which marks the implicit root. The builder's output is
//! authoritative for one root; the provider is the sole mutator afterward.

use crate::error::RemoteError;
use crate::path::parent_path;
use crate::remote::{RowData, RowKind, WorkspaceRow};
use crate::types::{FsMap, FsNode, NodeKind};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Build the directory and path indexes for one root.
///
/// A `parent_id` cycle is remote-data corruption and fails the whole build.
/// Two rows resolving to the same full path are kept last-write-wins in
/// `path_map` (both stay listed in `dir_map`) and reported via `warn!`.
pub fn build_fs_map(rows: &[WorkspaceRow]) -> Result<FsMap, RemoteError> {
    let by_id: HashMap<&str, &WorkspaceRow> =
        rows.iter().map(|row| (row.id.as_str(), row)).collect();

    let mut map = FsMap::new();
    map.dir_map.entry("/".to_string()).or_default();

    for row in rows {
        let full_path = resolve_full_path(row, &by_id)?;
        let node = node_from_row(row);

        if map.path_map.contains_key(&full_path) {
            warn!(path = %full_path, row = %row.id, "duplicate full path, keeping later row");
        }

        map.dir_map
            .entry(parent_path(&full_path))
            .or_default()
            .push(node.clone());

        if node.kind == NodeKind::Folder {
            map.dir_map.entry(full_path.clone()).or_default();
        }

        map.path_map.insert(full_path, node);
    }

    Ok(map)
}

/// Walk `parent_id` references up to the implicit root, prepending each
/// ancestor's basename. The seen-set bounds the walk so a cyclic batch is
/// rejected instead of looping forever.
fn resolve_full_path(
    row: &WorkspaceRow,
    by_id: &HashMap<&str, &WorkspaceRow>,
) -> Result<String, RemoteError> {
    let (parent_id, base) = row.parent_and_base();
    let mut segments = vec![base];
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(row.id.as_str());

    let mut cursor = parent_id;
    while let Some(parent) = by_id.get(cursor) {
        if !seen.insert(parent.id.as_str()) {
            return Err(RemoteError::CorruptData(format!(
                "parent cycle reached from row {}",
                row.id
            )));
        }
        let (next, parent_base) = parent.parent_and_base();
        segments.push(parent_base);
        cursor = next;
    }

    segments.reverse();
    Ok(format!("/{}", segments.join("/")))
}

fn node_from_row(row: &WorkspaceRow) -> FsNode {
    let (parent_id, base) = row.parent_and_base();
    let (kind, content) = match row.data_type {
        RowKind::File => (
            NodeKind::File,
            Some(
                RowData::decode(&row.data)
                    .map(|data| data.content)
                    .unwrap_or_default(),
            ),
        ),
        RowKind::Folder => (NodeKind::Folder, None),
    };

    FsNode {
        id: row.id.clone(),
        parent_id: parent_id.to_string(),
        name: base.to_string(),
        kind,
        content,
        last_modified: row.last_modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RowStatus;

    fn row(id: &str, parent: &str, base: &str, kind: RowKind, content: Option<&str>) -> WorkspaceRow {
        WorkspaceRow {
            id: id.into(),
            name: format!("{parent}/{base}"),
            name_lowercase: format!("{parent}/{base}").to_lowercase(),
            data_type: kind,
            data: content.map(RowData::encode).unwrap_or_default(),
            status: RowStatus::Active,
            last_modified: None,
        }
    }

    #[test]
    fn builds_maps_from_flat_rows() {
        let rows = vec![
            row("1", "", "root", RowKind::Folder, None),
            row("2", "1", "a.txt", RowKind::File, Some("x")),
        ];
        let map = build_fs_map(&rows).unwrap();

        let top = &map.dir_map["/"];
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, "1");

        let children = &map.dir_map["/root"];
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "2");

        assert_eq!(
            map.path_map["/root/a.txt"].content.as_deref(),
            Some("x")
        );
    }

    #[test]
    fn empty_folder_gets_its_own_dir_entry() {
        let rows = vec![row("1", "", "empty", RowKind::Folder, None)];
        let map = build_fs_map(&rows).unwrap();
        assert!(map.dir_map["/empty"].is_empty());
    }

    #[test]
    fn unknown_parent_id_lands_at_the_root() {
        let rows = vec![row("2", "999", "orphan.txt", RowKind::File, Some("o"))];
        let map = build_fs_map(&rows).unwrap();
        assert!(map.path_map.contains_key("/orphan.txt"));
        assert_eq!(map.dir_map["/"].len(), 1);
    }

    #[test]
    fn deep_nesting_resolves_full_paths() {
        let rows = vec![
            row("1", "", "a", RowKind::Folder, None),
            row("2", "1", "b", RowKind::Folder, None),
            row("3", "2", "c.txt", RowKind::File, Some("deep")),
        ];
        let map = build_fs_map(&rows).unwrap();
        assert_eq!(
            map.path_map["/a/b/c.txt"].content.as_deref(),
            Some("deep")
        );
        assert_eq!(map.dir_map["/a/b"].len(), 1);
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let rows = vec![
            row("1", "2", "a", RowKind::Folder, None),
            row("2", "1", "b", RowKind::Folder, None),
        ];
        let err = build_fs_map(&rows).unwrap_err();
        assert!(matches!(err, RemoteError::CorruptData(_)));
    }

    #[test]
    fn path_collision_keeps_later_row_in_path_map() {
        let rows = vec![
            row("1", "", "same.txt", RowKind::File, Some("first")),
            row("2", "", "same.txt", RowKind::File, Some("second")),
        ];
        let map = build_fs_map(&rows).unwrap();
        assert_eq!(
            map.path_map["/same.txt"].content.as_deref(),
            Some("second")
        );
        // Both rows remain visible in the directory listing.
        assert_eq!(map.dir_map["/"].len(), 2);
    }

    #[test]
    fn malformed_data_payload_reads_as_empty_content() {
        let mut bad = row("1", "", "broken.txt", RowKind::File, None);
        bad.data = "not json".into();
        let map = build_fs_map(&[bad]).unwrap();
        assert_eq!(map.path_map["/broken.txt"].content.as_deref(), Some(""));
    }
}
