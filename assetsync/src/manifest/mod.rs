//! Remote manifest: wire model, validation, fetching and indexing.
//!
//! - `model`: JSON body → strict [`ManifestNode`] tree
//! - `client`: [`ManifestClient`], the HTTP [`ManifestSource`](crate::sync::ManifestSource)
//! - `index`: [`ManifestIndex`], a path-addressed arena used by every tree walk

mod client;
mod index;
mod model;

pub use client::{ManifestClient, PACKAGE_QUERY_PARAM};
pub use index::{IndexedKind, IndexedNode, ManifestIndex, NodeId};
pub use model::{
    parse_manifest, DirectoryEntry, FileEntry, Manifest, ManifestNode, ManifestStatus, RawKind,
    RawManifest, RawNode,
};
