//! Walks the tree along a parsed path.

use log::trace;

use super::entry::{Node, NodeId};
use super::tree::Tree;
use crate::core::Result;
use crate::path::AbsolutePath;
use crate::VfsError;

/// How far a path could be followed through the tree.
///
/// `chain[i]` is the node matched by `path.segments()[i]`. The walk stops at the first missing
/// segment or at a file, so a chain can end early without any error being decided yet; each
/// operation turns the outcome into its own error.
#[derive(Debug)]
pub(crate) struct Lookup<'a> {
    pub path: &'a AbsolutePath,
    pub root: Option<NodeId>,
    pub chain: Vec<NodeId>,
}

pub(crate) fn lookup<'a>(tree: &Tree, path: &'a AbsolutePath) -> Lookup<'a> {
    let root = tree.root(&path.root().key());
    let mut chain = Vec::with_capacity(path.segments().len());
    if let Some(mut current) = root {
        for segment in path.segments() {
            match tree.child(current, segment) {
                Some(child) => {
                    chain.push(child);
                    current = child;
                }
                None => break,
            }
        }
    }
    trace!(
        "lookup {path}: matched {} of {} segments",
        chain.len(),
        path.segments().len()
    );
    Lookup { path, root, chain }
}

impl Lookup<'_> {
    /// The root node, or the error an operation reports when the root is absent.
    pub fn require_root(&self) -> Result<NodeId> {
        self.root.ok_or_else(|| missing_root(self.path))
    }

    /// Node addressed by the whole path.
    pub fn leaf(&self) -> Option<NodeId> {
        if self.path.is_root() {
            return self.root;
        }
        if self.chain.len() == self.path.segments().len() {
            return self.chain.last().copied();
        }
        None
    }

    /// Node addressed by every segment but the last, whatever its kind.
    pub fn parent_node(&self) -> Option<NodeId> {
        let depth = self.path.segments().len().checked_sub(1)?;
        if depth == 0 {
            return self.root;
        }
        self.chain.get(depth - 1).copied()
    }

    /// The containing directory, if it exists and is a directory.
    pub fn parent_dir(&self, tree: &Tree) -> Option<NodeId> {
        self.parent_node().filter(|id| tree[*id].is_dir())
    }

    /// True when the walk stopped because a file sits where a directory was needed.
    pub fn blocked_by_file(&self, tree: &Tree) -> bool {
        self.chain.len() < self.path.segments().len()
            && self
                .chain
                .last()
                .is_some_and(|id| tree[*id].is_file())
    }

    pub fn leaf_node<'t>(&self, tree: &'t Tree) -> Option<&'t Node> {
        self.leaf().and_then(|id| tree.get(id))
    }

    /// Path for display: stored casing where segments matched, requested casing elsewhere.
    pub fn echo(&self, tree: &Tree) -> AbsolutePath {
        self.chain
            .iter()
            .enumerate()
            .fold(self.path.clone(), |path, (index, id)| {
                path.with_segment(index, &tree[*id].name)
            })
    }

    /// Resolves to an existing directory or explains why not.
    pub fn require_directory(&self, tree: &Tree) -> Result<NodeId> {
        self.require_root()?;
        match self.leaf_node(tree) {
            Some(node) if node.is_dir() => self.leaf().ok_or_else(|| self.not_found()),
            Some(_) => Err(VfsError::directory_name_invalid()),
            None => Err(self.not_found()),
        }
    }

    /// Resolves to any existing node: missing parent and missing leaf are reported apart.
    pub fn require_entry(&self, tree: &Tree) -> Result<NodeId> {
        self.require_root()?;
        match self.leaf() {
            Some(id) => Ok(id),
            None if self.parent_dir(tree).is_some() => {
                Err(VfsError::FileNotFound(self.path.to_string()))
            }
            None => Err(self.not_found()),
        }
    }

    /// "Could not find a part of the path" naming the full requested path.
    pub fn not_found(&self) -> VfsError {
        VfsError::DirectoryNotFound(self.path.to_string())
    }
}

/// Error for a path whose drive or share is not registered.
pub(crate) fn missing_root(path: &AbsolutePath) -> VfsError {
    if path.root().is_unc() {
        VfsError::network_path_not_found()
    } else {
        VfsError::DirectoryNotFound(path.root().to_string())
    }
}
