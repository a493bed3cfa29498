//! File system provider over the remote row store.
//!
//! Composes the path codec, the keyed async cache of reconstructed trees, and
//! the per-root service registry into the provider contract: stat, list,
//! read, write, rename, delete, copy, create, watch. Reads answer from the
//! cached [`FsMap`]; mutations issue remote row writes first and only then
//! touch the in-memory maps, so memory never claims success a remote write
//! did not confirm.

use crate::cache::CacheService;
use crate::config::ProviderConfig;
use crate::error::FsError;
use crate::events::{ChangeKind, DebouncedEventQueue, FileChange};
use crate::path::{base_name, ensure_trailing_slash, join_path, parent_path, split_path, RootedPath};
use crate::registry::{ServiceRegistry, SharedRowService};
use crate::remote::{NewRow, RowData, RowKind, RowStatus, SCHEMA_VERSION};
use crate::tree::build_fs_map;
use crate::types::{FileStat, FsMap, FsNode, NodeKind};
use chrono::Utc;
use futures::FutureExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

type SharedFsMap = Arc<RwLock<FsMap>>;

/// Handle returned by [`RowFsProvider::watch`]. The store has no live
/// change feed to subscribe to, so dropping the handle has nothing to undo.
#[derive(Debug)]
pub struct WatchSubscription {
    _priv: (),
}

/// The file-system-provider façade, one instance per registry.
///
/// Construction spawns the event-queue flush task, so a tokio runtime must
/// be current.
pub struct RowFsProvider {
    registry: Arc<ServiceRegistry>,
    fs_cache: CacheService<SharedFsMap>,
    events: DebouncedEventQueue,
    config: ProviderConfig,
}

impl RowFsProvider {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self::with_config(registry, ProviderConfig::default())
    }

    pub fn with_config(registry: Arc<ServiceRegistry>, config: ProviderConfig) -> Self {
        let loader_registry = registry.clone();
        let fs_cache = CacheService::with_normalizer(
            "fs-map",
            move |root: String| {
                let registry = loader_registry.clone();
                async move {
                    let service = registry.get(&root).await?;
                    let rows = service.active_rows().await?;
                    let map = build_fs_map(&rows)?;
                    info!(root = %root, rows = rows.len(), "rebuilt fs map");
                    Ok(Arc::new(RwLock::new(map)))
                }
                .boxed()
            },
            ensure_trailing_slash,
        );

        RowFsProvider {
            registry,
            fs_cache,
            events: DebouncedEventQueue::with_debounce(config.debounce()),
            config,
        }
    }

    /// Subscribe to batched change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<FileChange>> {
        self.events.subscribe()
    }

    /// Tear down every cached tree; the next access per root rebuilds.
    pub fn invalidate(&self) {
        self.fs_cache.clear();
    }

    /// No-op subscription: the store offers no change feed, and all change
    /// notification is synthesized locally from this provider's mutations.
    pub fn watch(&self, _uri: &str) -> WatchSubscription {
        WatchSubscription { _priv: () }
    }

    pub async fn stat(&self, uri: &str) -> Result<FileStat, FsError> {
        let RootedPath { root, path } = split_path(uri);
        debug!(%uri, %root, %path, "stat");

        if path == "/" {
            // Visiting the root is the refresh point: the listing may be
            // stale, so the next real access rebuilds from the store.
            self.fs_cache.clear();
            return Ok(FileStat::directory());
        }

        let map = self.fs_map(&root).await?;
        let map = map.read();
        if map.dir_map.contains_key(&path) {
            return Ok(FileStat::directory());
        }
        match map.path_map.get(&path) {
            Some(node) => Ok(FileStat {
                kind: node.kind,
                mtime: node.last_modified,
                size: node.content.as_ref().map_or(0, |c| c.len() as u64),
            }),
            None => Err(FsError::not_found(uri)),
        }
    }

    pub async fn read_directory(&self, uri: &str) -> Result<Vec<(String, NodeKind)>, FsError> {
        let RootedPath { root, path } = split_path(uri);
        debug!(%uri, "read_directory");

        let map = self.fs_map(&root).await?;
        let map = map.read();
        let children = map
            .dir_map
            .get(&path)
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|node| (node.name.clone(), node.kind))
                    .collect()
            })
            .unwrap_or_default();
        Ok(children)
    }

    pub async fn read_file(&self, uri: &str) -> Result<String, FsError> {
        let RootedPath { root, path } = split_path(uri);
        debug!(%uri, "read_file");

        let map = self.fs_map(&root).await?;
        let map = map.read();
        match map.path_map.get(&path) {
            Some(node) if node.is_file() => Ok(node.content.clone().unwrap_or_default()),
            _ => Err(FsError::not_found(uri)),
        }
    }

    /// Row payloads are text; non-UTF-8 input is converted lossily, so bytes
    /// that are not valid UTF-8 will not round-trip.
    pub async fn write_file(&self, uri: &str, bytes: &[u8]) -> Result<(), FsError> {
        let RootedPath { root, path } = split_path(uri);
        debug!(%uri, len = bytes.len(), "write_file");

        if path == "/" {
            // A root has no basename to create a row under.
            return Err(FsError::not_found(uri));
        }

        let content = String::from_utf8_lossy(bytes).into_owned();
        let map = self.fs_map(&root).await?;
        let existing = map.read().path_map.get(&path).cloned();

        match existing {
            Some(node) if node.is_file() => {
                // Read the authoritative row by id and resubmit it with the
                // new content; memory is updated only after the save lands.
                let service = self.registry.get(&root).await?;
                let mut row = service
                    .row_by_id(&node.id)
                    .await?
                    .ok_or_else(|| FsError::not_found(uri))?;
                row.data = RowData::encode(&content);
                service.save_row(row, SCHEMA_VERSION).await?;

                update_content(&mut map.write(), &path, &content);
                self.events
                    .enqueue([FileChange::new(ChangeKind::Changed, uri)]);
                Ok(())
            }
            Some(_) => Err(FsError::not_found(uri)),
            None => {
                self.create_node(&root, &map, &path, NodeKind::File, Some(content))
                    .await?;
                self.events
                    .enqueue([FileChange::new(ChangeKind::Created, uri)]);
                Ok(())
            }
        }
    }

    pub async fn create_directory(&self, uri: &str) -> Result<(), FsError> {
        let RootedPath { root, path } = split_path(uri);
        debug!(%uri, "create_directory");

        let map = self.fs_map(&root).await?;
        {
            let map = map.read();
            if map.path_map.contains_key(&path) || map.dir_map.contains_key(&path) {
                return Err(FsError::AlreadyExists(uri.to_string()));
            }
        }

        self.create_node(&root, &map, &path, NodeKind::Folder, None)
            .await?;
        self.events
            .enqueue([FileChange::new(ChangeKind::Created, uri)]);
        Ok(())
    }

    pub async fn delete(&self, uri: &str, recursive: bool) -> Result<(), FsError> {
        let RootedPath { root, path } = split_path(uri);
        debug!(%uri, recursive, "delete");

        let map = self.fs_map(&root).await?;
        let (target, descendants) = {
            let map = map.read();
            let target = map
                .path_map
                .get(&path)
                .cloned()
                .ok_or_else(|| FsError::not_found(uri))?;

            let mut descendants = Vec::new();
            if target.kind == NodeKind::Folder {
                collect_post_order(&map, &path, &mut descendants);
                if !descendants.is_empty() && !recursive {
                    return Err(FsError::Unimplemented(format!(
                        "non-recursive delete of non-empty directory: {uri}"
                    )));
                }
            }
            (target, descendants)
        };

        let service = self.registry.get(&root).await?;

        // Children before parents, so no remote record is orphaned; each
        // node leaves the in-memory maps right after its soft delete lands.
        let mut changes = Vec::with_capacity(descendants.len() + 1);
        for (node_path, node) in descendants.into_iter().chain([(path.clone(), target)]) {
            soft_delete(&service, &node).await?;
            remove_from_maps(&mut map.write(), &node_path, &node);
            changes.push(FileChange::new(
                ChangeKind::Deleted,
                join_path(&root, &node_path),
            ));
        }
        self.events.enqueue(changes);
        Ok(())
    }

    pub async fn rename(&self, old_uri: &str, new_uri: &str) -> Result<(), FsError> {
        let src = split_path(old_uri);
        let dst = split_path(new_uri);
        debug!(%old_uri, %new_uri, "rename");

        if src.root != dst.root {
            return Err(FsError::Unimplemented(format!(
                "rename across roots: {old_uri} -> {new_uri}"
            )));
        }

        let map = self.fs_map(&src.root).await?;
        let (node, dst_parent_id) = {
            let map = map.read();
            let node = map
                .path_map
                .get(&src.path)
                .cloned()
                .ok_or_else(|| FsError::not_found(old_uri))?;
            if map.path_map.contains_key(&dst.path) {
                return Err(FsError::AlreadyExists(new_uri.to_string()));
            }
            let parent_id = resolve_parent_id(&map, &parent_path(&dst.path))?;
            (node, parent_id)
        };

        let service = self.registry.get(&src.root).await?;
        let result: Result<(), FsError> = async {
            let mut row = service
                .row_by_id(&node.id)
                .await?
                .ok_or_else(|| FsError::not_found(old_uri))?;
            row.name = format!("{dst_parent_id}/{}", base_name(&dst.path));
            row.name_lowercase = row.name.to_lowercase();
            service.save_row(row, SCHEMA_VERSION).await?;
            Ok(())
        }
        .await;

        // The store confirms renames only eventually: throw the whole cache
        // away regardless of the outcome and give the store time to settle
        // before anyone re-reads the tree.
        self.fs_cache.clear();
        tokio::time::sleep(self.config.rename_settle()).await;
        result?;

        self.events.enqueue([
            FileChange::new(ChangeKind::Deleted, old_uri),
            FileChange::new(ChangeKind::Created, new_uri),
        ]);
        Ok(())
    }

    pub async fn copy(&self, src_uri: &str, dst_uri: &str) -> Result<(), FsError> {
        let src = split_path(src_uri);
        let dst = split_path(dst_uri);
        debug!(%src_uri, %dst_uri, "copy");

        let src_map = self.fs_map(&src.root).await?;
        let content = {
            let map = src_map.read();
            match map.path_map.get(&src.path) {
                Some(node) if node.is_file() => node.content.clone().unwrap_or_default(),
                Some(_) => {
                    return Err(FsError::Unimplemented(format!(
                        "copy of a directory: {src_uri}"
                    )))
                }
                None => return Err(FsError::not_found(src_uri)),
            }
        };

        let dst_map = self.fs_map(&dst.root).await?;
        {
            let map = dst_map.read();
            if map.path_map.contains_key(&dst.path) || map.dir_map.contains_key(&dst.path) {
                return Err(FsError::AlreadyExists(dst_uri.to_string()));
            }
        }

        self.create_node(&dst.root, &dst_map, &dst.path, NodeKind::File, Some(content))
            .await?;
        self.events
            .enqueue([FileChange::new(ChangeKind::Created, dst_uri)]);
        Ok(())
    }

    /// Resolve or rebuild the tree for one root; concurrent callers share a
    /// single remote fetch.
    async fn fs_map(&self, root: &str) -> Result<SharedFsMap, FsError> {
        self.fs_cache.get(root).await
    }

    /// Create a File or Folder row under the resolved parent and mirror it
    /// into the maps once the store has allocated its id.
    async fn create_node(
        &self,
        root: &str,
        map: &SharedFsMap,
        path: &str,
        kind: NodeKind,
        content: Option<String>,
    ) -> Result<FsNode, FsError> {
        let parent = parent_path(path);
        let base = base_name(path).to_string();
        let parent_id = resolve_parent_id(&map.read(), &parent)?;

        let data = content.as_deref().map(RowData::encode).unwrap_or_default();
        let row_kind = match kind {
            NodeKind::File => RowKind::File,
            NodeKind::Folder => RowKind::Folder,
        };
        let service = self.registry.get(root).await?;
        let id = service
            .create_row(NewRow::new(&parent_id, &base, row_kind, data))
            .await?;

        let node = FsNode {
            id,
            parent_id,
            name: base,
            kind,
            content,
            last_modified: Some(Utc::now()),
        };

        let mut map = map.write();
        map.dir_map.entry(parent).or_default().push(node.clone());
        if kind == NodeKind::Folder {
            map.dir_map.entry(path.to_string()).or_default();
        }
        map.path_map.insert(path.to_string(), node.clone());
        Ok(node)
    }
}

/// Parent id for a new or moved node: empty string at the root, otherwise the
/// id of the Folder node at `parent`.
fn resolve_parent_id(map: &FsMap, parent: &str) -> Result<String, FsError> {
    if parent == "/" {
        return Ok(String::new());
    }
    match map.path_map.get(parent) {
        Some(node) if node.kind == NodeKind::Folder => Ok(node.id.clone()),
        _ => Err(FsError::not_found(parent)),
    }
}

/// Depth-first, children before their parent, so remote soft deletes never
/// orphan a record.
fn collect_post_order(map: &FsMap, path: &str, out: &mut Vec<(String, FsNode)>) {
    let Some(children) = map.dir_map.get(path) else {
        return;
    };
    for child in children {
        let child_path = if path == "/" {
            format!("/{}", child.name)
        } else {
            format!("{path}/{}", child.name)
        };
        collect_post_order(map, &child_path, out);
        out.push((child_path, child.clone()));
    }
}

async fn soft_delete(service: &SharedRowService, node: &FsNode) -> Result<(), FsError> {
    let mut row = service
        .row_by_id(&node.id)
        .await?
        .ok_or_else(|| FsError::not_found(node.name.clone()))?;
    row.status = RowStatus::Trashed;
    service.save_row(row, SCHEMA_VERSION).await?;
    Ok(())
}

fn remove_from_maps(map: &mut FsMap, path: &str, node: &FsNode) {
    if let Some(siblings) = map.dir_map.get_mut(&parent_path(path)) {
        siblings.retain(|sibling| sibling.id != node.id);
    }
    map.path_map.remove(path);
    if node.kind == NodeKind::Folder {
        map.dir_map.remove(path);
    }
}

/// Keep `path_map` and the parent's `dir_map` entry in step after a content
/// write.
fn update_content(map: &mut FsMap, path: &str, content: &str) {
    let now = Some(Utc::now());
    if let Some(node) = map.path_map.get_mut(path) {
        node.content = Some(content.to_string());
        node.last_modified = now;
    }
    if let Some(siblings) = map.dir_map.get_mut(&parent_path(path)) {
        let base = base_name(path);
        for sibling in siblings.iter_mut() {
            if sibling.name == base && sibling.is_file() {
                sibling.content = Some(content.to_string());
                sibling.last_modified = now;
            }
        }
    }
}
