//! Manifest data model and JSON parsing.
//!
//! The wire format is loosely typed: every node carries a `type` tag and a bag
//! of optional fields. Parsing happens in two steps. `serde` first reads the
//! body into [`RawManifest`] / [`RawNode`], then [`parse_manifest`] converts the
//! raw nodes into the strict [`ManifestNode`] variants, rejecting nodes whose
//! fields do not belong to their kind.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{EngineResult, SyncError};

/// Outcome reported by the manifest endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestStatus {
    Ok,
    Error,
}

/// A file declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Single path component.
    pub name: String,
    /// Expected size in bytes.
    pub size: u64,
    /// Lowercase hex digest; always present when `sync` is set.
    pub checksum: Option<String>,
    /// Server-managed file: verified by checksum and eligible for reaping.
    pub sync: bool,
    /// Source path relative to the public root. Defaults to the entry path.
    pub url: Option<String>,
}

/// A directory declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Single path component.
    pub name: String,
    /// Declared sum of all descendant file sizes.
    pub size: u64,
    /// Marks the subtree as server-managed.
    pub sync: bool,
    /// Child nodes, in manifest order.
    pub children: Vec<ManifestNode>,
}

/// One node of the manifest tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestNode {
    File(FileEntry),
    Directory(DirectoryEntry),
}

impl ManifestNode {
    /// The node's path component.
    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => &f.name,
            Self::Directory(d) => &d.name,
        }
    }

    /// Declared size in bytes.
    pub fn size(&self) -> u64 {
        match self {
            Self::File(f) => f.size,
            Self::Directory(d) => d.size,
        }
    }

    /// The node's sync flag.
    pub fn sync(&self) -> bool {
        match self {
            Self::File(f) => f.sync,
            Self::Directory(d) => d.sync,
        }
    }

    /// Whether this node is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

/// A parsed manifest. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub status: ManifestStatus,
    /// Sum of all file sizes, as declared by the server.
    pub total_size: u64,
    /// Prefix under the public root where this package's files live.
    pub target: String,
    /// Server origin for file downloads.
    pub base_url: String,
    /// Top-level nodes.
    pub root: Vec<ManifestNode>,
    /// Optional server message.
    pub message: Option<String>,
}

/// Node kind tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawKind {
    File,
    Dir,
}

/// A node exactly as it appears in the JSON body.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub kind: RawKind,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub sync: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<RawNode>>,
}

/// The manifest body exactly as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    pub status: Value,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub files: Vec<RawNode>,
}

/// Parse a manifest response body.
///
/// # Errors
///
/// - [`SyncError::Parse`] if the body is not JSON of the expected shape
/// - [`SyncError::Server`] if `status` is anything other than `"ok"`
/// - [`SyncError::InvalidManifest`] if a node is structurally invalid
pub fn parse_manifest(body: &str) -> EngineResult<Manifest> {
    let raw: RawManifest =
        serde_json::from_str(body).map_err(|e| SyncError::Parse(e.to_string()))?;

    if raw.status.as_str() != Some("ok") {
        let message = raw.message.clone().unwrap_or_else(|| match &raw.status {
            Value::String(s) => s.clone(),
            other => format!("status {}", other),
        });
        return Err(SyncError::Server { message });
    }

    let root = raw
        .files
        .into_iter()
        .map(convert_node)
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(Manifest {
        status: ManifestStatus::Ok,
        total_size: raw.total_size,
        target: raw.target.trim_matches('/').to_string(),
        base_url: raw.base_url,
        root,
        message: raw.message,
    })
}

/// Convert one raw node (and its subtree) into the strict model.
///
/// Depth is bounded by `serde_json`'s recursion limit on the input.
fn convert_node(raw: RawNode) -> EngineResult<ManifestNode> {
    validate_name(&raw.name)?;
    let sync = raw.sync.unwrap_or(false);

    match raw.kind {
        RawKind::File => {
            if raw.children.is_some() {
                return Err(SyncError::InvalidManifest(format!(
                    "file '{}' has children",
                    raw.name
                )));
            }
            let checksum = raw
                .checksum
                .map(|c| c.trim().to_ascii_lowercase())
                .filter(|c| !c.is_empty());
            if sync && checksum.is_none() {
                return Err(SyncError::InvalidManifest(format!(
                    "sync file '{}' has no checksum",
                    raw.name
                )));
            }
            let url = raw.url.filter(|u| !u.is_empty());
            Ok(ManifestNode::File(FileEntry {
                name: raw.name,
                size: raw.size,
                checksum,
                sync,
                url,
            }))
        }
        RawKind::Dir => {
            if raw.url.is_some() || raw.checksum.is_some() {
                return Err(SyncError::InvalidManifest(format!(
                    "directory '{}' has file-only fields",
                    raw.name
                )));
            }
            let children = raw
                .children
                .unwrap_or_default()
                .into_iter()
                .map(convert_node)
                .collect::<EngineResult<Vec<_>>>()?;
            Ok(ManifestNode::Directory(DirectoryEntry {
                name: raw.name,
                size: raw.size,
                sync,
                children,
            }))
        }
    }
}

/// Names must be a single, non-traversing path component.
///
/// On Windows `:` is rejected too, since `C:name` is drive-relative.
fn validate_name(name: &str) -> EngineResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || (cfg!(windows) && name.contains(':'));
    if bad {
        return Err(SyncError::InvalidManifest(format!(
            "invalid entry name '{}'",
            name
        )));
    }
    Ok(())
}
