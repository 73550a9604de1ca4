//! The shared state behind a [`MockFileSystem`] and the semantics of every operation.
//!
//! Facades (`Directory`, `File`, the info objects) parse their arguments, take the single
//! tree-wide lock and call into [`State`]. Each `State` method validates and resolves fully
//! before it mutates anything; only recursive delete may stop half way.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::directory::Directory;
use super::entry::{EntryType, Node, NodeId, NodeKind, TimeKind, Timestamps};
use super::file::File;
use super::handle::{FileAccess, FileMode};
use super::info::{DirectoryInfo, FileInfo};
use super::resolver::{self, Lookup};
use super::tree::Tree;
use crate::clock::{Clock, SystemClock, file_time_epoch};
use crate::core::{Result, utils};
use crate::path::{self, AbsolutePath, Root, RootKey};
use crate::{FileAttributes, VfsError};

pub(crate) const EMPTY_PATH: &str = "Path cannot be the empty string or all whitespace.";
pub(crate) const EMPTY_FILE_NAME: &str = "Empty file name is not legal.";
pub(crate) const NOT_LEGAL_FORM: &str = "The path is not of a legal form.";

/// An in-memory Windows-style file system.
///
/// Cloning is cheap and every clone operates on the same tree. All operations are synchronous
/// and serialized behind one lock, so a `MockFileSystem` can be shared freely between threads.
///
/// A new instance has a single drive, `C:`, which is also the current directory. Further
/// drives and UNC shares appear through [`add_drive`](Self::add_drive),
/// [`add_share`](Self::add_share) or the seeding helpers; the OS-shaped operations never
/// create roots.
///
/// ### Internal state
///
/// * `state` - the `Tree` of nodes and roots together with the current directory, behind one
///   `Mutex`. Every operation takes the lock once and holds it until it returns; enumerations
///   and file handles take it again for each directory they open or each read and write.
/// * `clock` - source of every timestamp the instance writes. Fixed at construction; pass a
///   [`ManualClock`](crate::ManualClock) to [`with_clock`](Self::with_clock) for deterministic
///   times.
///
/// ### Invariants
///
/// 1. **Default drive**: `C:` is registered at construction and roots are never removed.
/// 2. **Current directory**: always a parsed, normalized path. It names an existing directory
///    when it was set, and that directory cannot be deleted while it is current.
/// 3. **All or nothing**: an operation that fails leaves the tree untouched, recursive delete
///    excepted.
/// 4. **Open handles**: a file with a live [`FileHandle`](crate::FileHandle) cannot be
///    deleted, directly or recursively; it can still be moved, renamed or retimed.
///
/// ### Lifecycle
///
/// - On creation the tree holds the empty `C:\` root and the current directory is `C:\`.
/// - [`add_drive`](Self::add_drive), [`add_share`](Self::add_share),
///   [`add_directory`](Self::add_directory) and [`add_file`](Self::add_file) seed content,
///   creating roots as needed.
/// - The facades returned by [`directory`](Self::directory) and [`file`](Self::file), and the
///   info objects, borrow or clone this handle and resolve every path against the current
///   directory at call time.
///
/// ```
/// use winfs_kit::{MockFileSystem, SearchOption};
///
/// let fs = MockFileSystem::new();
/// fs.directory().create_directory("C:\\Base\\Sub").unwrap();
/// fs.add_file("c:\\base\\notes.txt", b"hello").unwrap();
///
/// assert!(fs.directory().exists("c:\\BASE\\sub"));
/// let files = fs.directory().get_files("c:\\base", "*.txt", SearchOption::AllDirectories).unwrap();
/// assert_eq!(files, ["c:\\Base\\notes.txt"]);
/// ```
#[derive(Clone)]
pub struct MockFileSystem {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("file system lock was poisoned, continuing with the last consistent tree");
            poisoned.into_inner()
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("MockFileSystem")
            .field("cwd", &state.cwd.to_string())
            .field("roots", &state.tree.roots().count())
            .finish()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let state = State::new(clock.now());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                clock,
            }),
        }
    }

    pub fn directory(&self) -> Directory<'_> {
        Directory::new(self)
    }

    pub fn file(&self) -> File<'_> {
        File::new(self)
    }

    /// Info object for `path`; the path is validated, its existence is not.
    pub fn directory_info(&self, path: &str) -> Result<DirectoryInfo> {
        let path = self.parse(path, NOT_LEGAL_FORM)?;
        Ok(DirectoryInfo::from_path(self.clone(), path))
    }

    /// Info object for `path`; the path is validated, its existence is not.
    pub fn file_info(&self, path: &str) -> Result<FileInfo> {
        let path = self.parse(path, NOT_LEGAL_FORM)?;
        Ok(FileInfo::from_path(self.clone(), path))
    }

    /// Registers drive `letter` (e.g. `'D'`) as an empty root.
    pub fn add_drive(&self, letter: char) -> Result<()> {
        if !letter.is_ascii_alphabetic() {
            return Err(VfsError::invalid(
                "Drive name must be a root directory (i.e. 'C:\\') or a drive letter ('C').",
            ));
        }
        let root = Root::Drive(letter.to_ascii_uppercase());
        let now = self.now();
        self.lock().ensure_root(&root, now);
        Ok(())
    }

    /// Registers the UNC share `\\server\share` as an empty root.
    pub fn add_share(&self, server: &str, share: &str) -> Result<()> {
        let path = self.parse(&format!("\\\\{server}\\{share}"), EMPTY_PATH)?;
        let now = self.now();
        self.lock().ensure_root(path.root(), now);
        Ok(())
    }

    /// Seeds a directory, creating its root and parents as needed.
    pub fn add_directory(&self, path: &str) -> Result<()> {
        let now = self.now();
        let mut state = self.lock();
        let path = state.parse(path, EMPTY_PATH)?;
        state.ensure_root(path.root(), now);
        state.create_directory(&path, now)
    }

    /// Seeds a file with `content`, creating its root and parents as needed.
    /// An existing file is overwritten.
    pub fn add_file<C: AsRef<[u8]>>(&self, path: &str, content: C) -> Result<()> {
        let now = self.now();
        let mut state = self.lock();
        let path = state.parse(path, EMPTY_PATH)?;
        state.add_file(&path, content.as_ref().to_vec(), now)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.lock()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.shared.now()
    }

    pub(crate) fn parse(&self, raw: &str, empty_message: &str) -> Result<AbsolutePath> {
        self.lock().parse(raw, empty_message)
    }

    pub(crate) fn time_utc(&self, raw: &str, kind: TimeKind) -> Result<DateTime<Utc>> {
        let state = self.lock();
        let path = state.parse(raw, NOT_LEGAL_FORM)?;
        Ok(kind.get(&state.times(&path)?))
    }

    pub(crate) fn set_time_utc(
        &self,
        raw: &str,
        kind: TimeKind,
        value: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.lock();
        let path = state.parse(raw, NOT_LEGAL_FORM)?;
        state.set_time(&path, kind, value)
    }
}

/// What an info object caches about its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stat {
    pub entry_type: EntryType,
    pub attributes: FileAttributes,
    pub times: Timestamps,
    pub len: u64,
}

/// Tree, root registry and current directory, guarded together.
///
/// Methods validate and resolve before they mutate; `now` is sampled by the caller before the
/// lock is taken so that one operation stamps one instant.
#[derive(Debug)]
pub(crate) struct State {
    pub tree: Tree,
    pub cwd: AbsolutePath,
}

impl State {
    fn new(now: DateTime<Utc>) -> Self {
        let root = Root::Drive('C');
        let mut tree = Tree::new();
        tree.ensure_root(root.key(), root.to_string(), now);
        Self {
            tree,
            cwd: AbsolutePath::new(root),
        }
    }

    pub fn parse(&self, raw: &str, empty_message: &str) -> Result<AbsolutePath> {
        if utils::is_blank(raw) {
            return Err(VfsError::invalid(empty_message));
        }
        path::parse(raw, &self.cwd)
    }

    pub fn lookup<'a>(&self, path: &'a AbsolutePath) -> Lookup<'a> {
        resolver::lookup(&self.tree, path)
    }

    pub fn ensure_root(&mut self, root: &Root, now: DateTime<Utc>) -> NodeId {
        let name = match root.key() {
            RootKey::Drive(letter) => format!("{letter}:\\"),
            RootKey::Share(..) => AbsolutePath::new(root.clone()).to_string(),
        };
        self.tree.ensure_root(root.key(), name, now)
    }

    pub fn logical_drives(&self) -> Vec<String> {
        self.tree
            .roots()
            .filter_map(|(key, _)| match key {
                RootKey::Drive(letter) => Some(format!("{letter}:\\")),
                RootKey::Share(..) => None,
            })
            .collect()
    }

    pub fn exists(&self, path: &AbsolutePath, entry_type: EntryType) -> bool {
        if entry_type == EntryType::File && path.has_trailing_separator() {
            return false;
        }
        self.lookup(path)
            .leaf_node(&self.tree)
            .is_some_and(|node| node.entry_type() == entry_type)
    }

    /// `None` when the leaf is missing; an error only when the root is.
    pub fn stat(&self, path: &AbsolutePath) -> Result<Option<Stat>> {
        let found = self.lookup(path);
        found.require_root()?;
        Ok(found.leaf_node(&self.tree).map(|node| Stat {
            entry_type: node.entry_type(),
            attributes: node.attributes,
            times: node.times,
            len: node.len(),
        }))
    }

    pub fn create_directory(&mut self, path: &AbsolutePath, now: DateTime<Utc>) -> Result<()> {
        let found = self.lookup(path);
        let root = found.require_root()?;
        if found.leaf_node(&self.tree).is_some_and(Node::is_file) {
            return Err(VfsError::AlreadyExists(path.to_string()));
        }
        if found.blocked_by_file(&self.tree) {
            let blocker = path.prefix(found.chain.len());
            return Err(VfsError::AlreadyExists(blocker.to_string()));
        }

        let mut current = found.chain.last().copied().unwrap_or(root);
        let missing = &path.segments()[found.chain.len()..];
        for segment in missing {
            current = self
                .tree
                .insert(current, Node::directory(segment.clone(), now), now);
        }
        if !missing.is_empty() {
            debug!("created directory {path} ({} new)", missing.len());
        }
        Ok(())
    }

    pub fn delete_directory(
        &mut self,
        path: &AbsolutePath,
        recursive: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let found = self.lookup(path);
        let id = found.require_directory(&self.tree)?;
        let target = path.normalized();
        if self.tree.is_root(id) {
            return Err(VfsError::AccessDenied(target.to_string()));
        }

        if recursive {
            self.delete_recursive(id, &target, now)?;
        } else {
            let node = &self.tree[id];
            if node.is_read_only() {
                return Err(VfsError::AccessDenied(target.to_string()));
            }
            if node.has_children() {
                return Err(VfsError::NotEmpty(target.to_string()));
            }
            if self.holds_current_directory(id) {
                return Err(VfsError::InUse(target.to_string()));
            }
            self.tree.remove(id, now);
        }
        debug!("deleted directory {target} (recursive: {recursive})");
        Ok(())
    }

    /// Post-order, in enumeration order; stops at the first entry that cannot go.
    fn delete_recursive(&mut self, id: NodeId, path: &AbsolutePath, now: DateTime<Utc>) -> Result<()> {
        for child in self.tree.children(id) {
            let child_path = path.join(self.tree[child].name.clone());
            if self.tree[child].is_dir() {
                self.delete_recursive(child, &child_path, now)?;
            } else {
                self.check_file_deletable(child, &child_path)?;
                self.tree.remove(child, now);
            }
        }
        if self.tree[id].is_read_only() {
            return Err(VfsError::AccessDenied(path.to_string()));
        }
        if self.holds_current_directory(id) {
            return Err(VfsError::InUse(path.to_string()));
        }
        self.tree.remove(id, now);
        Ok(())
    }

    fn check_file_deletable(&self, id: NodeId, path: &AbsolutePath) -> Result<()> {
        let node = &self.tree[id];
        if node.is_open() {
            return Err(VfsError::InUse(path.normalized().to_string()));
        }
        if node.is_read_only() {
            return Err(VfsError::AccessDenied(path.normalized().to_string()));
        }
        Ok(())
    }

    /// True if `id` is the current directory or one of its ancestors.
    fn holds_current_directory(&self, id: NodeId) -> bool {
        resolver::lookup(&self.tree, &self.cwd)
            .leaf()
            .is_some_and(|cwd| self.tree.is_ancestor_or_self(id, cwd))
    }

    /// Moves a file or directory to a new parent and/or name.
    pub fn move_entry(
        &mut self,
        source: &AbsolutePath,
        dest: &AbsolutePath,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let src = self.lookup(source);
        src.require_root()?;
        let dst = self.lookup(dest);
        dst.require_root()?;

        if source.root().key() != dest.root().key() {
            return Err(VfsError::io(
                "Source and destination path must have identical roots. \
                 Move will not work across volumes.",
            ));
        }
        if source.normalized() == dest.normalized() {
            return Err(VfsError::io("Source and destination path must be different."));
        }
        let id = src.leaf().ok_or_else(|| src.not_found())?;
        if self.tree.is_root(id) {
            return Err(VfsError::AccessDenied(source.normalized().to_string()));
        }
        if dest.is_descendant_of(source) {
            return Err(VfsError::InUse(source.normalized().to_string()));
        }
        let Some(name) = dest.file_name() else {
            return Err(VfsError::AlreadyExists(dest.to_string()));
        };

        if source.same_location(dest) {
            self.tree.rename(id, name, now);
            debug!("renamed {source} to {dest}");
            return Ok(());
        }
        if dst.leaf().is_some() {
            return Err(VfsError::AlreadyExists(dest.normalized().to_string()));
        }
        let parent = dst.parent_dir(&self.tree).ok_or_else(|| dst.not_found())?;
        self.relocate(id, parent, name, now);
        debug!("moved {source} to {dest}");
        Ok(())
    }

    pub fn move_file(
        &mut self,
        source: &AbsolutePath,
        dest: &AbsolutePath,
        overwrite: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let src = self.lookup(source);
        src.require_root()?;
        let id = self.require_file(&src)?;
        let dst = self.lookup(dest);
        dst.require_root()?;
        let Some(name) = dest.file_name() else {
            return Err(VfsError::AccessDenied(dest.to_string()));
        };
        let parent = dst.parent_dir(&self.tree).ok_or_else(|| dst.not_found())?;

        match dst.leaf() {
            Some(existing) if existing == id => {
                self.tree.rename(id, name, now);
                return Ok(());
            }
            Some(existing) => {
                if !overwrite || self.tree[existing].is_dir() {
                    return Err(VfsError::io("Cannot create a file when that file already exists."));
                }
                self.check_file_deletable(existing, dest)?;
                self.tree.remove(existing, now);
            }
            None => {}
        }
        self.relocate(id, parent, name, now);
        debug!("moved file {source} to {dest}");
        Ok(())
    }

    fn relocate(&mut self, id: NodeId, parent: NodeId, name: &str, now: DateTime<Utc>) {
        self.tree.detach(id, now);
        self.tree[id].name = name.to_string();
        self.tree.attach(id, parent, now);
    }

    fn require_file(&self, found: &Lookup<'_>) -> Result<NodeId> {
        match found.leaf() {
            Some(id) if self.tree[id].is_file() => Ok(id),
            _ => Err(VfsError::FileNotFound(found.path.normalized().to_string())),
        }
    }

    pub fn delete_file(&mut self, path: &AbsolutePath, now: DateTime<Utc>) -> Result<()> {
        let found = self.lookup(path);
        found.require_root()?;
        match found.leaf() {
            None if found.parent_dir(&self.tree).is_some() => Ok(()),
            None => Err(found.not_found()),
            Some(id) if self.tree[id].is_dir() => Err(VfsError::AccessDenied(path.to_string())),
            Some(id) => {
                self.check_file_deletable(id, path)?;
                self.tree.remove(id, now);
                debug!("deleted file {path}");
                Ok(())
            }
        }
    }

    pub fn copy_file(
        &mut self,
        source: &AbsolutePath,
        dest: &AbsolutePath,
        overwrite: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let src = self.lookup(source);
        src.require_root()?;
        let src_id = self.require_file(&src)?;
        let dst = self.lookup(dest);
        dst.require_root()?;
        let parent = dst.parent_dir(&self.tree).ok_or_else(|| dst.not_found())?;
        let Some(name) = dest.file_name() else {
            return Err(VfsError::AccessDenied(dest.to_string()));
        };

        let origin = &self.tree[src_id];
        let content = origin.content().cloned().unwrap_or_default();
        let attributes = origin.attributes;
        let written = origin.times.written;

        match dst.leaf() {
            Some(existing) if existing == src_id => {
                Err(VfsError::InUse(source.normalized().to_string()))
            }
            Some(existing) if self.tree[existing].is_dir() => {
                Err(VfsError::AccessDenied(dest.normalized().to_string()))
            }
            Some(existing) => {
                if !overwrite {
                    return Err(VfsError::io(format!(
                        "The file '{}' already exists.",
                        dest.normalized()
                    )));
                }
                self.check_file_deletable(existing, dest)?;
                let node = &mut self.tree[existing];
                if let Some(target) = node.content_mut() {
                    *target = content;
                }
                node.attributes = attributes;
                node.times.written = written;
                node.times.accessed = now;
                debug!("copied {source} over {dest}");
                Ok(())
            }
            None => {
                let mut node = Node::file(name, content, now);
                node.attributes = attributes;
                node.times.written = written;
                self.tree.insert(parent, node, now);
                debug!("copied {source} to {dest}");
                Ok(())
            }
        }
    }

    /// Puts the content of `source` in place of `dest`, optionally keeping the old `dest` as
    /// `backup`. The replaced file keeps its creation time and attributes.
    pub fn replace_file(
        &mut self,
        source: &AbsolutePath,
        dest: &AbsolutePath,
        backup: Option<&AbsolutePath>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let src = self.lookup(source);
        src.require_root()?;
        let src_id = self.require_file(&src)?;
        let dst = self.lookup(dest);
        dst.require_root()?;
        let dst_id = self.require_file(&dst)?;
        if src_id == dst_id {
            return Err(VfsError::InUse(source.normalized().to_string()));
        }
        self.check_file_deletable(src_id, source)?;
        self.check_file_deletable(dst_id, dest)?;

        let backup_target = match backup {
            Some(backup) => {
                let found = self.lookup(backup);
                found.require_root()?;
                let parent = found.parent_dir(&self.tree).ok_or_else(|| found.not_found())?;
                let existing = found.leaf();
                if let Some(existing) = existing {
                    if existing == src_id || existing == dst_id {
                        return Err(VfsError::Io(
                            "Unable to remove the file to be replaced.".into(),
                        ));
                    }
                    if self.tree[existing].is_dir() {
                        return Err(VfsError::AccessDenied(backup.normalized().to_string()));
                    }
                    self.check_file_deletable(existing, backup)?;
                }
                let name = backup
                    .file_name()
                    .ok_or_else(|| VfsError::AccessDenied(backup.to_string()))?;
                Some((parent, existing, name.to_string()))
            }
            None => None,
        };

        if let Some((parent, existing, name)) = backup_target {
            if let Some(existing) = existing {
                self.tree.remove(existing, now);
            }
            let mut copy = self.tree[dst_id].clone();
            copy.name = name;
            copy.parent = None;
            self.tree.insert(parent, copy, now);
        }

        let origin = &self.tree[src_id];
        let content = origin.content().cloned().unwrap_or_default();
        let written = origin.times.written;
        let node = &mut self.tree[dst_id];
        if let Some(target) = node.content_mut() {
            *target = content;
        }
        node.times.written = written;
        node.times.accessed = now;
        self.tree.remove(src_id, now);
        debug!("replaced {dest} with {source}");
        Ok(())
    }

    /// Opens or creates a file and registers one more open handle on it.
    /// Returns the node and the initial stream position.
    pub fn open_file(
        &mut self,
        path: &AbsolutePath,
        mode: FileMode,
        access: FileAccess,
        now: DateTime<Utc>,
    ) -> Result<(NodeId, u64)> {
        let found = self.lookup(path);
        found.require_root()?;
        if path.is_root() {
            return Err(VfsError::AccessDenied(path.to_string()));
        }
        let parent = found.parent_dir(&self.tree).ok_or_else(|| found.not_found())?;

        let id = match found.leaf() {
            Some(id) if self.tree[id].is_dir() => {
                return Err(VfsError::AccessDenied(path.to_string()));
            }
            Some(id) => {
                if mode == FileMode::CreateNew {
                    return Err(VfsError::io(format!("The file '{path}' already exists.")));
                }
                let node = &mut self.tree[id];
                if (access.can_write() || mode.truncates()) && node.is_read_only() {
                    return Err(VfsError::AccessDenied(path.to_string()));
                }
                if mode.truncates() {
                    if let Some(content) = node.content_mut() {
                        content.clear();
                    }
                    node.times.touch(now);
                }
                id
            }
            None if mode.creates() => {
                let name = path.file_name().unwrap_or_default();
                let id = self.tree.insert(parent, Node::file(name, Vec::new(), now), now);
                debug!("created file {path}");
                id
            }
            None => return Err(VfsError::FileNotFound(path.to_string())),
        };

        let node = &mut self.tree[id];
        if let NodeKind::File { open_handles, .. } = &mut node.kind {
            *open_handles += 1;
        }
        let position = if mode == FileMode::Append { node.len() } else { 0 };
        Ok((id, position))
    }

    pub fn release_handle(&mut self, id: NodeId) {
        if let Some(node) = self.tree.get_mut(id) {
            if let NodeKind::File { open_handles, .. } = &mut node.kind {
                *open_handles = open_handles.saturating_sub(1);
            }
        }
    }

    pub fn set_current_directory(&mut self, path: &AbsolutePath) -> Result<()> {
        self.lookup(path).require_directory(&self.tree)?;
        self.cwd = path.normalized();
        debug!("current directory is now {}", self.cwd);
        Ok(())
    }

    /// Times of the entry, or the epoch sentinel for every field when it does not exist.
    pub fn times(&self, path: &AbsolutePath) -> Result<Timestamps> {
        Ok(self
            .stat(path)?
            .map(|stat| stat.times)
            .unwrap_or_else(|| Timestamps::all(file_time_epoch())))
    }

    pub fn set_time(
        &mut self,
        path: &AbsolutePath,
        kind: TimeKind,
        value: DateTime<Utc>,
    ) -> Result<()> {
        if path.is_root() {
            return Err(VfsError::invalid("Path must not be a drive."));
        }
        let id = self.lookup(path).require_entry(&self.tree)?;
        if value < file_time_epoch() {
            return Err(VfsError::OutOfRange("Not a valid Win32 FileTime.".to_string()));
        }
        kind.set(&mut self.tree[id].times, value);
        Ok(())
    }

    pub fn attributes(&self, path: &AbsolutePath) -> Result<FileAttributes> {
        let id = self.lookup(path).require_entry(&self.tree)?;
        Ok(self.tree[id].attributes)
    }

    /// Stores `attributes` (normalized for the node kind) and returns what was stored.
    pub fn set_attributes(
        &mut self,
        path: &AbsolutePath,
        attributes: FileAttributes,
    ) -> Result<FileAttributes> {
        let id = self.lookup(path).require_entry(&self.tree)?;
        let node = &mut self.tree[id];
        node.set_attributes(attributes);
        Ok(node.attributes)
    }

    pub fn set_encrypted(&mut self, path: &AbsolutePath, encrypted: bool) -> Result<()> {
        let id = self.lookup(path).require_entry(&self.tree)?;
        let node = &mut self.tree[id];
        node.attributes.set(FileAttributes::ENCRYPTED, encrypted);
        let attributes = node.attributes;
        node.set_attributes(attributes);
        Ok(())
    }

    pub fn add_file(
        &mut self,
        path: &AbsolutePath,
        content: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let (Some(name), Some(parent)) = (path.file_name(), path.parent()) else {
            return Err(VfsError::AccessDenied(path.to_string()));
        };
        self.ensure_root(path.root(), now);
        self.create_directory(&parent, now)?;

        let found = self.lookup(path);
        match found.leaf() {
            Some(id) if self.tree[id].is_dir() => Err(VfsError::AlreadyExists(path.to_string())),
            Some(id) => {
                let node = &mut self.tree[id];
                if let Some(target) = node.content_mut() {
                    *target = content;
                }
                node.times.touch(now);
                Ok(())
            }
            None => {
                let parent = found.parent_dir(&self.tree).ok_or_else(|| found.not_found())?;
                self.tree.insert(parent, Node::file(name, content, now), now);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::vfs::SearchOption;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    pub(crate) fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    fn setup_state() -> State {
        let mut state = State::new(t(0));
        let base = state.parse("c:\\base", EMPTY_PATH).unwrap();
        state.create_directory(&base, t(1)).unwrap();
        state
    }

    fn p(state: &State, raw: &str) -> AbsolutePath {
        state.parse(raw, EMPTY_PATH).unwrap()
    }

    mod create_directory {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_creates_every_missing_level() -> anyhow::Result<()> {
            let mut state = setup_state();
            let path = p(&state, "c:\\base\\a\\b\\c");
            state.create_directory(&path, t(2))?;
            assert!(state.exists(&path, EntryType::Directory));
            assert!(state.exists(&p(&state, "C:\\BASE\\A"), EntryType::Directory));
            Ok(())
        }

        #[test]
        fn test_is_idempotent() -> anyhow::Result<()> {
            let mut state = setup_state();
            let path = p(&state, "c:\\base\\x");
            state.create_directory(&path, t(2))?;
            let before = state.stat(&path)?;
            state.create_directory(&path, t(3))?;
            assert_eq!(state.stat(&path)?, before);
            assert_eq!(state.tree.children(state.lookup(&p(&state, "c:\\base")).leaf().unwrap()).len(), 1);
            Ok(())
        }

        #[test]
        fn test_file_in_the_way() -> anyhow::Result<()> {
            let mut state = setup_state();
            state.add_file(&p(&state, "c:\\base\\f.txt"), Vec::new(), t(2))?;
            for raw in [
                "c:\\base\\f.txt",
                "c:\\base\\f.txt\\deeper",
                "c:\\base\\f.txt\\deeper\\still",
            ] {
                let path = p(&state, raw);
                assert_eq!(
                    state.create_directory(&path, t(3)).unwrap_err().to_string(),
                    "Cannot create 'c:\\base\\f.txt' because a file or directory with the same name already exists."
                );
            }
            Ok(())
        }

        #[test]
        fn test_missing_drive() {
            let mut state = setup_state();
            let path = p(&state, "X:\\");
            assert_eq!(
                state.create_directory(&path, t(2)).unwrap_err().to_string(),
                "Could not find a part of the path 'X:\\'."
            );
        }

        #[test]
        fn test_parent_timestamps_follow_creation() -> anyhow::Result<()> {
            let mut state = setup_state();
            let base = p(&state, "c:\\base");
            state.create_directory(&p(&state, "c:\\base\\child"), t(5))?;
            let times = state.times(&base)?;
            assert_eq!(times.created, t(1));
            assert_eq!(times.written, t(5));
            assert_eq!(times.accessed, t(5));
            Ok(())
        }
    }

    mod delete {
        use super::*;
        use pretty_assertions::assert_eq;

        fn setup_populated() -> State {
            let mut state = setup_state();
            for raw in ["c:\\base\\a\\one.txt", "c:\\base\\a\\two.txt", "c:\\base\\b\\three.txt"] {
                let path = p(&state, raw);
                state.add_file(&path, b"x".to_vec(), t(2)).unwrap();
            }
            state
        }

        #[test]
        fn test_non_recursive_requires_empty() {
            let mut state = setup_populated();
            let path = p(&state, "c:\\base");
            let err = state.delete_directory(&path, false, t(3)).unwrap_err();
            assert_eq!(err.to_string(), "The directory is not empty.");
            assert!(state.exists(&path, EntryType::Directory));
        }

        #[test]
        fn test_read_only_directory() -> anyhow::Result<()> {
            let mut state = setup_state();
            let path = p(&state, "c:\\base");
            state.set_attributes(&path, FileAttributes::READ_ONLY)?;
            let err = state.delete_directory(&path, false, t(3)).unwrap_err();
            assert_eq!(err, VfsError::AccessDenied("c:\\base".into()));
            Ok(())
        }

        #[test]
        fn test_recursive_removes_subtree() -> anyhow::Result<()> {
            let mut state = setup_populated();
            let path = p(&state, "c:\\base");
            state.delete_directory(&path, true, t(3))?;
            assert!(!state.exists(&path, EntryType::Directory));
            assert!(state.tree.children(state.lookup(&p(&state, "c:\\")).leaf().unwrap()).is_empty());
            Ok(())
        }

        #[test]
        fn test_recursive_stops_at_open_file() -> anyhow::Result<()> {
            let mut state = setup_populated();
            let two = p(&state, "c:\\base\\a\\two.txt");
            state.open_file(&two, FileMode::Open, FileAccess::Read, t(3))?;

            let err = state
                .delete_directory(&p(&state, "c:\\base"), true, t(4))
                .unwrap_err();
            assert_eq!(err, VfsError::InUse("c:\\base\\a\\two.txt".into()));
            // one.txt sorted first and is gone; b was never reached
            assert!(!state.exists(&p(&state, "c:\\base\\a\\one.txt"), EntryType::File));
            assert!(state.exists(&two, EntryType::File));
            assert!(state.exists(&p(&state, "c:\\base\\b\\three.txt"), EntryType::File));
            Ok(())
        }

        #[test]
        fn test_recursive_stops_at_read_only_file() -> anyhow::Result<()> {
            let mut state = setup_populated();
            state.set_attributes(&p(&state, "c:\\base\\b\\three.txt"), FileAttributes::READ_ONLY)?;
            let err = state
                .delete_directory(&p(&state, "c:\\base"), true, t(4))
                .unwrap_err();
            assert_eq!(err, VfsError::AccessDenied("c:\\base\\b\\three.txt".into()));
            assert!(!state.exists(&p(&state, "c:\\base\\a"), EntryType::Directory));
            Ok(())
        }

        #[test]
        fn test_current_directory_blocks_delete() -> anyhow::Result<()> {
            let mut state = setup_populated();
            state.set_current_directory(&p(&state, "c:\\base\\b"))?;

            let err = state
                .delete_directory(&p(&state, "c:\\base"), true, t(4))
                .unwrap_err();
            assert_eq!(err, VfsError::InUse("c:\\base\\b".into()));
            assert!(state.exists(&p(&state, "c:\\base\\b"), EntryType::Directory));
            Ok(())
        }

        #[test]
        fn test_missing_and_wrong_kind() -> anyhow::Result<()> {
            let mut state = setup_populated();
            let err = state
                .delete_directory(&p(&state, "c:\\nope"), false, t(4))
                .unwrap_err();
            assert_eq!(err, VfsError::DirectoryNotFound("c:\\nope".into()));

            let err = state
                .delete_directory(&p(&state, "c:\\base\\a\\one.txt"), false, t(4))
                .unwrap_err();
            assert_eq!(err.to_string(), "The directory name is invalid.");

            let err = state.delete_directory(&p(&state, "c:\\"), true, t(4)).unwrap_err();
            assert!(matches!(err, VfsError::AccessDenied(_)));
            Ok(())
        }
    }

    mod moving {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_move_reparents_and_touches_both_parents() -> anyhow::Result<()> {
            let mut state = setup_state();
            state.add_file(&p(&state, "c:\\base\\src\\f.txt"), b"data".to_vec(), t(2))?;
            state.create_directory(&p(&state, "c:\\other"), t(3))?;
            let before = state.times(&p(&state, "c:\\base\\src"))?;

            state.move_entry(&p(&state, "c:\\base\\src"), &p(&state, "c:\\other\\dst"), t(9))?;

            assert!(!state.exists(&p(&state, "c:\\base\\src"), EntryType::Directory));
            assert!(state.exists(&p(&state, "c:\\other\\dst\\f.txt"), EntryType::File));
            assert_eq!(state.times(&p(&state, "c:\\other\\dst"))?, before);
            for parent in ["c:\\base", "c:\\other"] {
                let times = state.times(&p(&state, parent))?;
                assert_eq!(times.written, t(9), "{parent}");
                assert_eq!(times.accessed, t(9), "{parent}");
            }
            Ok(())
        }

        #[test]
        fn test_case_only_rename() -> anyhow::Result<()> {
            let mut state = setup_state();
            state.move_entry(&p(&state, "c:\\base"), &p(&state, "c:\\BASE"), t(2))?;
            let found = p(&state, "c:\\base");
            assert_eq!(state.lookup(&found).echo(&state.tree).to_string(), "c:\\BASE");
            Ok(())
        }

        #[test]
        fn test_move_errors() -> anyhow::Result<()> {
            let mut state = setup_state();
            state.create_directory(&p(&state, "c:\\taken"), t(2))?;
            state.add_drive_for_test('D', t(2));

            let cases = [
                ("c:\\base", "c:\\base", "Source and destination path must be different."),
                (
                    "c:\\base",
                    "d:\\base",
                    "Source and destination path must have identical roots. Move will not work across volumes.",
                ),
                ("c:\\nope", "c:\\x", "Could not find a part of the path 'c:\\nope'."),
                (
                    "c:\\base",
                    "c:\\taken",
                    "Cannot create 'c:\\taken' because a file or directory with the same name already exists.",
                ),
                ("c:\\base", "c:\\missing\\x", "Could not find a part of the path 'c:\\missing\\x'."),
                (
                    "c:\\base",
                    "c:\\base\\inner",
                    "The process cannot access the file 'c:\\base' because it is being used by another process.",
                ),
            ];
            for (source, dest, message) in cases {
                let err = state
                    .move_entry(&p(&state, source), &p(&state, dest), t(3))
                    .unwrap_err();
                assert_eq!(err.to_string(), message, "{source} -> {dest}");
            }
            Ok(())
        }

        #[test]
        fn test_move_file_overwrite() -> anyhow::Result<()> {
            let mut state = setup_state();
            state.add_file(&p(&state, "c:\\base\\a.txt"), b"a".to_vec(), t(2))?;
            state.add_file(&p(&state, "c:\\base\\b.txt"), b"b".to_vec(), t(2))?;
            let (a, b) = (p(&state, "c:\\base\\a.txt"), p(&state, "c:\\base\\b.txt"));

            let err = state.move_file(&a, &b, false, t(3)).unwrap_err();
            assert_eq!(err.to_string(), "Cannot create a file when that file already exists.");

            state.move_file(&a, &b, true, t(3))?;
            assert!(!state.exists(&a, EntryType::File));
            let id = state.lookup(&b).leaf().unwrap();
            assert_eq!(state.tree[id].content().unwrap(), b"a");
            Ok(())
        }
    }

    mod times {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_sentinel_for_missing_entries() -> anyhow::Result<()> {
            let state = setup_state();
            for raw in ["c:\\base\\nope.txt", "c:\\missing\\deeper\\nope.txt"] {
                let times = state.times(&p(&state, raw))?;
                assert_eq!(times, Timestamps::all(file_time_epoch()));
            }
            assert!(state.times(&p(&state, "q:\\x")).is_err());
            Ok(())
        }

        #[test]
        fn test_set_time_rules() -> anyhow::Result<()> {
            let mut state = setup_state();
            let base = p(&state, "c:\\base");

            let err = state
                .set_time(&p(&state, "c:\\"), TimeKind::Creation, t(5))
                .unwrap_err();
            assert_eq!(err.to_string(), "Path must not be a drive.");

            let err = state
                .set_time(&p(&state, "c:\\base\\nope"), TimeKind::Creation, t(5))
                .unwrap_err();
            assert_eq!(err, VfsError::FileNotFound("c:\\base\\nope".into()));

            let too_early = file_time_epoch() - chrono::Duration::seconds(1);
            let err = state
                .set_time(&base, TimeKind::LastWrite, too_early)
                .unwrap_err();
            assert_eq!(err.to_string(), "Not a valid Win32 FileTime.");

            state.set_attributes(&base, FileAttributes::READ_ONLY)?;
            state.set_time(&base, TimeKind::LastWrite, t(30))?;
            assert_eq!(state.times(&base)?.written, t(30));
            Ok(())
        }
    }

    #[test]
    fn test_mock_file_system_with_manual_clock() -> anyhow::Result<()> {
        let clock = Arc::new(ManualClock::new(t(0)));
        let fs = MockFileSystem::with_clock(clock.clone());
        clock.set(t(7));
        fs.add_directory("c:\\seeded")?;
        assert_eq!(
            fs.time_utc("c:\\seeded", TimeKind::Creation)?,
            t(7)
        );
        Ok(())
    }

    #[test]
    fn test_logical_drives() -> anyhow::Result<()> {
        let fs = MockFileSystem::new();
        fs.add_drive('d')?;
        fs.add_share("server", "share")?;
        fs.add_file("e:\\seed.txt", b"")?;
        assert_eq!(fs.lock().logical_drives(), ["C:\\", "D:\\", "E:\\"]);
        assert!(fs.add_drive('1').is_err());
        Ok(())
    }

    #[test]
    fn test_clones_share_one_tree_across_threads() -> anyhow::Result<()> {
        let fs = MockFileSystem::new();
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let fs = fs.clone();
                std::thread::spawn(move || -> Result<()> {
                    let dir = format!("c:\\jobs\\worker{i:02}");
                    fs.directory().create_directory(&dir)?;
                    for n in 0..10 {
                        fs.add_file(&format!("{dir}\\out{n}.txt"), b"done")?;
                    }
                    fs.directory().get_files("c:\\jobs", "*", SearchOption::AllDirectories)?;
                    Ok(())
                })
            })
            .collect();
        for worker in workers {
            worker.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
        }

        let dirs = fs.directory().get_directories("c:\\jobs", "*", SearchOption::TopDirectoryOnly)?;
        let expected: Vec<_> = (0..8).map(|i| format!("c:\\jobs\\worker{i:02}")).collect();
        assert_eq!(dirs, expected);
        let files = fs.directory().get_files("c:\\jobs", "*.txt", SearchOption::AllDirectories)?;
        assert_eq!(files.len(), 80);
        Ok(())
    }

    impl State {
        fn add_drive_for_test(&mut self, letter: char, now: DateTime<Utc>) {
            self.ensure_root(&Root::Drive(letter), now);
        }
    }
}
