//! Flat, path-indexed view of a manifest tree.
//!
//! All tree walks in the engine go through [`ManifestIndex`]: nodes live in a
//! single arena addressed by [`NodeId`], and traversal uses explicit stacks so
//! that deep manifests cannot exhaust the call stack.

use std::collections::{HashMap, HashSet};

use super::model::{Manifest, ManifestNode};
use crate::error::{EngineResult, SyncError};

/// Position of a node in the arena.
pub type NodeId = usize;

/// Kind-specific data of an indexed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexedKind {
    File {
        checksum: Option<String>,
        /// Source path relative to the public root.
        url: String,
    },
    Directory {
        children: Vec<NodeId>,
    },
}

/// A manifest node with its full relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedNode {
    /// Forward-slash separated path relative to the sync root.
    pub path: String,
    pub size: u64,
    pub sync: bool,
    pub parent: Option<NodeId>,
    pub kind: IndexedKind,
}

impl IndexedNode {
    pub fn is_file(&self) -> bool {
        matches!(self.kind, IndexedKind::File { .. })
    }
}

/// Arena of every node in a manifest, addressable by id or path.
#[derive(Debug, Clone, Default)]
pub struct ManifestIndex {
    nodes: Vec<IndexedNode>,
    roots: Vec<NodeId>,
    by_path: HashMap<String, NodeId>,
}

impl ManifestIndex {
    /// Flatten a manifest into an index.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidManifest`] if two nodes resolve to the same
    /// path.
    pub fn build(manifest: &Manifest) -> EngineResult<Self> {
        Self::from_nodes(&manifest.root)
    }

    /// Flatten a list of top-level nodes into an index.
    pub fn from_nodes(root: &[ManifestNode]) -> EngineResult<Self> {
        let mut index = Self::default();
        let mut stack: Vec<(&ManifestNode, Option<NodeId>)> =
            root.iter().rev().map(|n| (n, None)).collect();

        while let Some((node, parent)) = stack.pop() {
            let path = match parent {
                Some(pid) => format!("{}/{}", index.nodes[pid].path, node.name()),
                None => node.name().to_string(),
            };
            if index.by_path.contains_key(&path) {
                return Err(SyncError::InvalidManifest(format!(
                    "duplicate path '{}'",
                    path
                )));
            }

            let id = index.nodes.len();
            let kind = match node {
                ManifestNode::File(f) => IndexedKind::File {
                    checksum: f.checksum.clone(),
                    url: f.url.clone().unwrap_or_else(|| path.clone()),
                },
                ManifestNode::Directory(d) => {
                    for child in d.children.iter().rev() {
                        stack.push((child, Some(id)));
                    }
                    IndexedKind::Directory {
                        children: Vec::with_capacity(d.children.len()),
                    }
                }
            };

            index.nodes.push(IndexedNode {
                path: path.clone(),
                size: node.size(),
                sync: node.sync(),
                parent,
                kind,
            });
            index.by_path.insert(path, id);

            match parent {
                Some(pid) => {
                    if let IndexedKind::Directory { children } = &mut index.nodes[pid].kind {
                        children.push(id);
                    }
                }
                None => index.roots.push(id),
            }
        }

        index.warn_on_size_drift();
        Ok(index)
    }

    /// Top-level node ids in manifest order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> &IndexedNode {
        &self.nodes[id]
    }

    /// Look up a node by relative path.
    pub fn get(&self, path: &str) -> Option<&IndexedNode> {
        self.by_path.get(path).map(|&id| &self.nodes[id])
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the manifest declared no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All file nodes in depth-first manifest order.
    pub fn files(&self) -> impl Iterator<Item = &IndexedNode> {
        self.nodes.iter().filter(|n| n.is_file())
    }

    /// Relative paths of every declared file.
    pub fn file_paths(&self) -> HashSet<&str> {
        self.files().map(|n| n.path.as_str()).collect()
    }

    /// Sum of file sizes in the subtree rooted at `id` (the node itself if it
    /// is a file).
    pub fn descendant_file_bytes(&self, id: NodeId) -> u64 {
        let mut total = 0u64;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match &self.nodes[current].kind {
                IndexedKind::File { .. } => {
                    total = total.saturating_add(self.nodes[current].size);
                }
                IndexedKind::Directory { children } => stack.extend(children.iter().copied()),
            }
        }
        total
    }

    /// Ids of every file in the subtree rooted at `id`.
    pub fn descendant_files(&self, id: NodeId) -> Vec<NodeId> {
        let mut files = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match &self.nodes[current].kind {
                IndexedKind::File { .. } => files.push(current),
                IndexedKind::Directory { children } => {
                    stack.extend(children.iter().rev().copied())
                }
            }
        }
        files
    }

    /// Whether a local path lies inside a sync-enabled subtree.
    ///
    /// The nearest ancestor directory declared by the manifest decides: a
    /// non-sync directory nested inside a sync one protects its contents.
    /// Paths with no declared ancestor directory are never in a sync subtree.
    pub fn in_sync_subtree(&self, rel_path: &str) -> bool {
        let mut prefix = rel_path;
        while let Some(pos) = prefix.rfind('/') {
            prefix = &prefix[..pos];
            if let Some(node) = self.get(prefix) {
                if !node.is_file() {
                    return node.sync;
                }
                return false;
            }
        }
        false
    }

    /// Children always sit after their parent in the arena, so a single
    /// reverse pass accumulates subtree sizes.
    fn warn_on_size_drift(&self) {
        let mut sums = vec![0u64; self.nodes.len()];
        for id in (0..self.nodes.len()).rev() {
            let node = &self.nodes[id];
            if node.is_file() {
                sums[id] = node.size;
            } else if sums[id] != node.size {
                tracing::warn!(
                    path = %node.path,
                    declared = node.size,
                    actual = sums[id],
                    "Directory size disagrees with its files"
                );
            }
            if let Some(parent) = node.parent {
                sums[parent] = sums[parent].saturating_add(sums[id]);
            }
        }
    }
}
