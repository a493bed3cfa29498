//! Core types for the reconstructed file tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node kind as stored in the remote `DataType` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Folder,
}

/// One node of the reconstructed tree.
///
/// Remote rows are flat; each node carries its own id and its parent's id,
/// and the full path is derived by the tree builder. `File` nodes carry
/// `content`; `Folder` nodes do not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsNode {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub kind: NodeKind,
    pub content: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FsNode {
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// The pair of indexes reconstructed for one root.
///
/// Invariants: every `path_map` entry appears exactly once in the
/// `dir_map` entry of its parent path, and every `Folder` node has a
/// `dir_map` entry of its own (possibly empty).
#[derive(Debug, Default, Clone)]
pub struct FsMap {
    /// Directory path -> child nodes.
    pub dir_map: HashMap<String, Vec<FsNode>>,
    /// Full node path -> node.
    pub path_map: HashMap<String, FsNode>,
}

impl FsMap {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Descriptor returned by `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub kind: NodeKind,
    pub mtime: Option<DateTime<Utc>>,
    pub size: u64,
}

impl FileStat {
    /// Synthetic descriptor for a root directory.
    pub fn directory() -> Self {
        FileStat {
            kind: NodeKind::Folder,
            mtime: None,
            size: 0,
        }
    }
}
