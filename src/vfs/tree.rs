//! Arena holding every node plus the registry of roots.
//!
//! Children are owned through their parent's child map; `Node::parent` is a plain id used for
//! walking upwards and for timestamp propagation.

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use chrono::{DateTime, Utc};
use log::trace;

use super::entry::{Node, NodeId, NodeKind};
use crate::core::utils;
use crate::path::RootKey;

/// Every node of the file system, addressed by [`NodeId`].
///
/// ### Internal state
///
/// * `nodes` - the arena. Ids are handed out from `next_id` and never reused, so an id kept by
///   an open handle or an enumeration can only ever point at the node it was taken from or at
///   nothing.
/// * `roots` - drive letters and UNC shares, keyed by [`RootKey`]; the plain and the `\\?\`
///   spelling of a root share one key.
/// * each directory's child map - keyed by the case-folded name, which gives ordinal
///   case-insensitive order for free; the node itself keeps the name as it was created.
///
/// ### Invariants
///
/// 1. **Reachability**: every node in `nodes` is either a registered root or listed in exactly
///    one directory's child map, and its `parent` names that directory.
/// 2. **Uniqueness**: no directory has two children whose names fold to the same key.
/// 3. **Subtree removal**: removing a node removes all of its descendants from `nodes`.
/// 4. **Roots stay**: roots are never removed or renamed once registered.
///
/// Structural changes (insert, remove, rename, detach/attach) stamp the affected parent's
/// last-write and last-access times with the `now` they are given.
#[derive(Debug, Default)]
pub(crate) struct Tree {
    nodes: BTreeMap<NodeId, Node>,
    roots: BTreeMap<RootKey, NodeId>,
    next_id: u64,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn root(&self, key: &RootKey) -> Option<NodeId> {
        self.roots.get(key).copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = (&RootKey, NodeId)> {
        self.roots.iter().map(|(key, id)| (key, *id))
    }

    /// Returns the root registered under `key`, creating it on first reference.
    pub fn ensure_root(&mut self, key: RootKey, name: String, now: DateTime<Utc>) -> NodeId {
        if let Some(id) = self.root(&key) {
            return id;
        }
        let id = self.allocate(Node::directory(name, now));
        trace!("registered root {key:?} as {id:?}");
        self.roots.insert(key, id);
        id
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.roots.values().any(|root| *root == id)
    }

    /// Child of `parent` named `name`, compared case-insensitively.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent)?
            .children()?
            .get(&utils::fold(name))
            .copied()
    }

    /// Children of `parent` in ordinal case-insensitive order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.get(parent)
            .and_then(Node::children)
            .map(|children| children.values().copied().collect())
            .unwrap_or_default()
    }

    /// Inserts `node` under `parent` and bumps the parent's write/access times.
    pub fn insert(&mut self, parent: NodeId, node: Node, now: DateTime<Utc>) -> NodeId {
        let id = self.allocate(node);
        self.attach(id, parent, now);
        id
    }

    /// Removes `id` from its parent's children; the node itself stays in the arena.
    pub fn detach(&mut self, id: NodeId, now: DateTime<Utc>) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let key = utils::fold(&node.name);
        let Some(parent) = node.parent.take() else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            if let NodeKind::Directory { children } = &mut parent_node.kind {
                children.remove(&key);
            }
            parent_node.times.touch(now);
        }
    }

    /// Links a detached node under `parent` using its current name.
    pub fn attach(&mut self, id: NodeId, parent: NodeId, now: DateTime<Utc>) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.parent = Some(parent);
        let key = utils::fold(&node.name);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            if let NodeKind::Directory { children } = &mut parent_node.kind {
                children.insert(key, id);
            }
            parent_node.times.touch(now);
        }
    }

    /// Renames a node in place, keeping it under the same parent.
    pub fn rename(&mut self, id: NodeId, name: &str, now: DateTime<Utc>) {
        let parent = self.get(id).and_then(|node| node.parent);
        match parent {
            Some(parent) => {
                self.detach(id, now);
                self[id].name = name.to_string();
                self.attach(id, parent, now);
            }
            None => self[id].name = name.to_string(),
        }
    }

    /// Unlinks `id` and drops it together with everything below it.
    pub fn remove(&mut self, id: NodeId, now: DateTime<Utc>) {
        self.detach(id, now);
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                if let Some(children) = node.children() {
                    pending.extend(children.values().copied());
                }
            }
        }
    }

    /// True if `ancestor` is `id` or lies on the parent chain of `id`.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.get(node).and_then(|n| n.parent);
        }
        false
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, node);
        id
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[&id]
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("dangling node id {id:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
    }

    fn setup_tree() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let root = tree.ensure_root(RootKey::Drive('C'), "C:\\".into(), t(0));
        (tree, root)
    }

    #[test]
    fn test_ensure_root_is_idempotent() {
        let (mut tree, root) = setup_tree();
        let again = tree.ensure_root(RootKey::Drive('C'), "C:\\".into(), t(5));
        assert_eq!(root, again);
        assert!(tree.is_root(root));
        assert_eq!(tree.roots().count(), 1);
        assert_eq!(tree[root].times.created, t(0));
    }

    #[test]
    fn test_child_lookup_is_case_insensitive() {
        let (mut tree, root) = setup_tree();
        let docs = tree.insert(root, Node::directory("Docs", t(1)), t(1));
        assert_eq!(tree.child(root, "docs"), Some(docs));
        assert_eq!(tree.child(root, "DOCS"), Some(docs));
        assert_eq!(tree.child(root, "doc"), None);
        assert_eq!(tree[docs].name, "Docs");
        assert_eq!(tree[docs].parent, Some(root));
    }

    #[test]
    fn test_children_are_ordered_case_insensitively() {
        let (mut tree, root) = setup_tree();
        for name in ["zzz.dir", "subfolderZ", "aaa.dir", "subfolderA"] {
            tree.insert(root, Node::directory(name, t(1)), t(1));
        }
        let names: Vec<_> = tree
            .children(root)
            .into_iter()
            .map(|id| tree[id].name.clone())
            .collect();
        assert_eq!(names, ["aaa.dir", "subfolderA", "subfolderZ", "zzz.dir"]);
    }

    #[test]
    fn test_insert_and_remove_touch_parent() {
        let (mut tree, root) = setup_tree();
        let dir = tree.insert(root, Node::directory("dir", t(1)), t(1));
        tree.insert(dir, Node::file("f", Vec::new(), t(2)), t(2));
        assert_eq!(tree[dir].times.created, t(1));
        assert_eq!(tree[dir].times.written, t(2));
        assert_eq!(tree[dir].times.accessed, t(2));

        tree.remove(dir, t(3));
        assert!(tree.get(dir).is_none());
        assert_eq!(tree[root].times.written, t(3));
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn test_remove_drops_subtree() {
        let (mut tree, root) = setup_tree();
        let a = tree.insert(root, Node::directory("a", t(1)), t(1));
        let b = tree.insert(a, Node::directory("b", t(1)), t(1));
        let f = tree.insert(b, Node::file("f", Vec::new(), t(1)), t(1));
        tree.remove(a, t(2));
        assert!(tree.get(b).is_none());
        assert!(tree.get(f).is_none());
    }

    #[test]
    fn test_rename_rekeys_child() {
        let (mut tree, root) = setup_tree();
        let dir = tree.insert(root, Node::directory("old", t(1)), t(1));
        tree.rename(dir, "New", t(2));
        assert_eq!(tree.child(root, "old"), None);
        assert_eq!(tree.child(root, "new"), Some(dir));
        assert_eq!(tree[dir].name, "New");
    }

    #[test]
    fn test_ancestry() {
        let (mut tree, root) = setup_tree();
        let a = tree.insert(root, Node::directory("a", t(1)), t(1));
        let b = tree.insert(a, Node::directory("b", t(1)), t(1));
        assert!(tree.is_ancestor_or_self(root, b));
        assert!(tree.is_ancestor_or_self(a, b));
        assert!(tree.is_ancestor_or_self(b, b));
        assert!(!tree.is_ancestor_or_self(b, a));
    }
}
