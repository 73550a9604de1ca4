//! Lazy, restartable directory enumeration.

use std::borrow::Cow;
use std::collections::VecDeque;

use log::trace;

use super::engine::MockFileSystem;
use super::entry::{EntryType, NodeId};
use crate::core::Result;
use crate::path::{AbsolutePath, Pattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOption {
    #[default]
    TopDirectoryOnly,
    AllDirectories,
}

/// Which node kinds an enumeration yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryFilter {
    Files,
    Directories,
    Entries,
}

impl EntryFilter {
    fn accepts(self, entry_type: EntryType) -> bool {
        match self {
            EntryFilter::Files => entry_type == EntryType::File,
            EntryFilter::Directories => entry_type == EntryType::Directory,
            EntryFilter::Entries => true,
        }
    }
}

/// A validated enumeration request.
///
/// Each call to [`iter`](Self::iter) resolves the start directory again and walks the tree as
/// it is at that moment, so the same `Enumeration` can be consumed any number of times. A
/// start directory that has since disappeared yields nothing.
#[derive(Debug, Clone)]
pub struct Enumeration {
    fs: MockFileSystem,
    path: AbsolutePath,
    pattern: Pattern,
    option: SearchOption,
    filter: EntryFilter,
}

impl Enumeration {
    pub(crate) fn new(
        fs: &MockFileSystem,
        path: &AbsolutePath,
        pattern: &str,
        option: SearchOption,
        filter: EntryFilter,
    ) -> Result<Enumeration> {
        let state = fs.lock();
        let found = state.lookup(path);
        found.require_directory(&state.tree)?;
        let pattern = Pattern::parse(pattern)?;
        let path = found.echo(&state.tree).normalized();
        Ok(Enumeration {
            fs: fs.clone(),
            path,
            pattern,
            option,
            filter,
        })
    }

    pub fn iter(&self) -> EnumerationIter<'_> {
        EnumerationIter::new(Cow::Borrowed(self))
    }

    /// The start directory as it resolves right now.
    fn start(&self) -> Option<NodeId> {
        let state = self.fs.lock();
        let start = state.lookup(&self.path).require_directory(&state.tree).ok();
        if start.is_none() {
            trace!("{} is no longer a directory", self.path);
        }
        start
    }
}

impl<'a> IntoIterator for &'a Enumeration {
    type Item = String;
    type IntoIter = EnumerationIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Enumeration {
    type Item = String;
    type IntoIter = EnumerationIter<'static>;

    fn into_iter(self) -> Self::IntoIter {
        EnumerationIter::new(Cow::Owned(self))
    }
}

/// Depth-first walk: a directory's matching children first, then its subdirectories in order.
#[derive(Debug)]
pub struct EnumerationIter<'a> {
    request: Cow<'a, Enumeration>,
    started: bool,
    pending: Vec<(NodeId, AbsolutePath)>,
    ready: VecDeque<String>,
}

impl<'a> EnumerationIter<'a> {
    fn new(request: Cow<'a, Enumeration>) -> Self {
        EnumerationIter {
            request,
            started: false,
            pending: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    /// Opens one directory: queues its matches and schedules its subdirectories.
    fn visit(&mut self, dir: NodeId, path: &AbsolutePath) {
        let request: &Enumeration = &self.request;
        let now = request.fs.now();
        let mut state = request.fs.lock();
        let Some(node) = state.tree.get_mut(dir) else {
            trace!("skipping {path}: removed during enumeration");
            return;
        };
        node.times.accessed = now;

        let mut subdirectories = Vec::new();
        for child in state.tree.children(dir) {
            let node = &state.tree[child];
            let child_path = path.join(node.name.clone());
            if request.filter.accepts(node.entry_type()) && request.pattern.matches(&node.name) {
                self.ready.push_back(child_path.to_string());
            }
            if node.is_dir() && request.option == SearchOption::AllDirectories {
                subdirectories.push((child, child_path));
            }
        }
        trace!("enumerated {path}: {} queued", self.ready.len());
        self.pending.extend(subdirectories.into_iter().rev());
    }
}

impl Iterator for EnumerationIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(next) = self.ready.pop_front() {
                return Some(next);
            }
            if !self.started {
                self.started = true;
                if let Some(start) = self.request.start() {
                    self.pending.push((start, self.request.path.clone()));
                }
            }
            let (dir, path) = self.pending.pop()?;
            self.visit(dir, &path);
        }
    }
}
