use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::FileAttributes;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(pub(crate) u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// Creation, last-access and last-write times, in UTC.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timestamps {
    pub created: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    pub written: DateTime<Utc>,
}

impl Timestamps {
    pub fn all(at: DateTime<Utc>) -> Self {
        Self {
            created: at,
            accessed: at,
            written: at,
        }
    }

    /// Bumps last-write and last-access.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.accessed = now;
        self.written = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    Creation,
    LastAccess,
    LastWrite,
}

impl TimeKind {
    pub fn get(self, times: &Timestamps) -> DateTime<Utc> {
        match self {
            TimeKind::Creation => times.created,
            TimeKind::LastAccess => times.accessed,
            TimeKind::LastWrite => times.written,
        }
    }

    pub fn set(self, times: &mut Timestamps, value: DateTime<Utc>) {
        match self {
            TimeKind::Creation => times.created = value,
            TimeKind::LastAccess => times.accessed = value,
            TimeKind::LastWrite => times.written = value,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    /// Children keyed by case-folded name; the map order is the enumeration order.
    Directory { children: BTreeMap<String, NodeId> },
    File { content: Vec<u8>, open_handles: u32 },
}

/// A directory or a file in the tree.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub attributes: FileAttributes,
    pub times: Timestamps,
    pub kind: NodeKind,
}

impl Node {
    pub fn directory<S: Into<String>>(name: S, now: DateTime<Utc>) -> Node {
        Node {
            name: name.into(),
            parent: None,
            attributes: FileAttributes::DIRECTORY,
            times: Timestamps::all(now),
            kind: NodeKind::Directory {
                children: BTreeMap::new(),
            },
        }
    }

    pub fn file<S: Into<String>>(name: S, content: Vec<u8>, now: DateTime<Utc>) -> Node {
        Node {
            name: name.into(),
            parent: None,
            attributes: FileAttributes::ARCHIVE,
            times: Timestamps::all(now),
            kind: NodeKind::File {
                content,
                open_handles: 0,
            },
        }
    }

    pub fn entry_type(&self) -> EntryType {
        match self.kind {
            NodeKind::Directory { .. } => EntryType::Directory,
            NodeKind::File { .. } => EntryType::File,
        }
    }

    pub fn is_file(&self) -> bool {
        self.entry_type() == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type() == EntryType::Directory
    }

    pub fn is_read_only(&self) -> bool {
        self.attributes.contains(FileAttributes::READ_ONLY)
    }

    pub fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub fn has_children(&self) -> bool {
        self.children().is_some_and(|c| !c.is_empty())
    }

    pub fn content(&self) -> Option<&Vec<u8>> {
        match &self.kind {
            NodeKind::File { content, .. } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Vec<u8>> {
        match &mut self.kind {
            NodeKind::File { content, .. } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    pub fn len(&self) -> u64 {
        self.content().map_or(0, |c| c.len() as u64)
    }

    pub fn open_handles(&self) -> u32 {
        match self.kind {
            NodeKind::File { open_handles, .. } => open_handles,
            NodeKind::Directory { .. } => 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open_handles() > 0
    }

    pub fn set_attributes(&mut self, attributes: FileAttributes) {
        self.attributes = attributes.normalized(self.is_dir());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_new_directory() {
        let node = Node::directory("docs", now());
        assert!(node.is_dir());
        assert!(!node.is_file());
        assert_eq!(node.attributes, FileAttributes::DIRECTORY);
        assert_eq!(node.times, Timestamps::all(now()));
        assert!(!node.has_children());
        assert!(node.content().is_none());
    }

    #[test]
    fn test_new_file() {
        let node = Node::file("a.txt", b"Hello".to_vec(), now());
        assert!(node.is_file());
        assert_eq!(node.attributes, FileAttributes::ARCHIVE);
        assert_eq!(node.len(), 5);
        assert_eq!(node.open_handles(), 0);
        assert!(node.children().is_none());
    }

    #[test]
    fn test_set_attributes_keeps_directory_bit_in_step() {
        let mut dir = Node::directory("d", now());
        dir.set_attributes(FileAttributes::READ_ONLY);
        assert_eq!(
            dir.attributes,
            FileAttributes::READ_ONLY | FileAttributes::DIRECTORY
        );
        assert!(dir.is_read_only());

        let mut file = Node::file("f", Vec::new(), now());
        file.set_attributes(FileAttributes::DIRECTORY);
        assert_eq!(file.attributes, FileAttributes::NORMAL);
    }

    #[test]
    fn test_time_kind_accessors() {
        let mut times = Timestamps::all(now());
        let later = now() + chrono::Duration::hours(1);
        TimeKind::LastWrite.set(&mut times, later);
        assert_eq!(TimeKind::LastWrite.get(&times), later);
        assert_eq!(TimeKind::Creation.get(&times), now());
        times.touch(later);
        assert_eq!(times.accessed, later);
        assert_eq!(times.created, now());
    }
}
