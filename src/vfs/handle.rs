//! Open-file streams over node content.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use bitflags::bitflags;
use log::trace;

use super::engine::MockFileSystem;
use super::entry::NodeId;
use crate::core::Result;
use crate::path::AbsolutePath;
use crate::VfsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    CreateNew,
    Create,
    Open,
    OpenOrCreate,
    Truncate,
    Append,
}

impl FileMode {
    pub(crate) fn creates(self) -> bool {
        matches!(
            self,
            FileMode::CreateNew | FileMode::Create | FileMode::OpenOrCreate | FileMode::Append
        )
    }

    pub(crate) fn truncates(self) -> bool {
        matches!(self, FileMode::Create | FileMode::Truncate)
    }

    /// Rejects the mode/access pairs the OS refuses before touching the disk.
    pub(crate) fn check(self, access: FileAccess) -> Result<()> {
        let needs_write = matches!(
            self,
            FileMode::CreateNew | FileMode::Create | FileMode::Truncate | FileMode::Append
        );
        if needs_write && !access.can_write() {
            return Err(VfsError::invalid(format!(
                "Combining FileMode: {self} with FileAccess: {access} is invalid."
            )));
        }
        if self == FileMode::Append && access.can_read() {
            return Err(VfsError::invalid(
                "Append access can be requested only in write-only mode.",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Read,
    Write,
    ReadWrite,
}

impl FileAccess {
    pub fn can_read(self) -> bool {
        matches!(self, FileAccess::Read | FileAccess::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, FileAccess::Write | FileAccess::ReadWrite)
    }
}

impl fmt::Display for FileAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags! {
    /// Sharing requested for an open handle. Recorded on the handle; conflicts between
    /// handles are not enforced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileShare: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
        const DELETE = 0x4;
        const INHERITABLE = 0x10;
    }
}

impl FileShare {
    pub const NONE: FileShare = FileShare::empty();
    pub const READ_WRITE: FileShare = FileShare::READ.union(FileShare::WRITE);

    pub(crate) fn check(self) -> Result<()> {
        if FileShare::all().contains(self) {
            Ok(())
        } else {
            Err(VfsError::OutOfRange("Enum value was out of legal range.".to_string()))
        }
    }
}

/// A positioned stream over a file's content.
///
/// The file counts as open (and cannot be deleted) until the handle is dropped.
pub struct FileHandle {
    fs: MockFileSystem,
    node: NodeId,
    path: AbsolutePath,
    access: FileAccess,
    share: FileShare,
    position: u64,
    /// Set in append mode: data before it cannot be overwritten or truncated.
    append_floor: Option<u64>,
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path.to_string())
            .field("access", &self.access)
            .field("position", &self.position)
            .finish()
    }
}

impl FileHandle {
    pub(crate) fn open(
        fs: &MockFileSystem,
        path: AbsolutePath,
        mode: FileMode,
        access: FileAccess,
        share: FileShare,
    ) -> Result<FileHandle> {
        mode.check(access)?;
        share.check()?;
        let now = fs.now();
        let (node, position) = fs.lock().open_file(&path, mode, access, now)?;
        trace!("opened {path} ({mode}, {access})");
        Ok(FileHandle {
            fs: fs.clone(),
            node,
            path,
            access,
            share,
            position,
            append_floor: (mode == FileMode::Append).then_some(position),
        })
    }

    pub fn path(&self) -> &AbsolutePath {
        &self.path
    }

    pub fn access(&self) -> FileAccess {
        self.access
    }

    pub fn share(&self) -> FileShare {
        self.share
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current length of the file content.
    pub fn len(&self) -> u64 {
        self.fs
            .lock()
            .tree
            .get(self.node)
            .map_or(0, |node| node.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncates or zero-extends the file. The position is clamped to the new length.
    pub fn set_len(&mut self, len: u64) -> io::Result<()> {
        if !self.access.can_write() {
            return Err(VfsError::Unsupported("Stream does not support writing.".into()).into());
        }
        if self.append_floor.is_some_and(|floor| len < floor) {
            return Err(VfsError::io(
                "Unable to truncate data that previously existed in a file opened in Append mode.",
            )
            .into());
        }
        let size = usize::try_from(len)
            .ok()
            .filter(|size| *size <= MAX_LENGTH)
            .ok_or_else(|| {
                VfsError::OutOfRange("Specified file length was too large for the file system.".into())
            })?;
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let node = state.tree.get_mut(self.node).ok_or_else(|| self.gone())?;
        if let Some(content) = node.content_mut() {
            content.resize(size, 0);
        }
        node.times.touch(now);
        self.position = self.position.min(len);
        Ok(())
    }

    fn gone(&self) -> io::Error {
        VfsError::FileNotFound(self.path.to_string()).into()
    }
}

/// Largest content a file can grow to.
const MAX_LENGTH: usize = i32::MAX as usize;

impl Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.access.can_read() {
            return Err(VfsError::Unsupported("Stream does not support reading.".into()).into());
        }
        let state = self.fs.lock();
        let content = state
            .tree
            .get(self.node)
            .and_then(|node| node.content())
            .ok_or_else(|| self.gone())?;
        let start = usize::try_from(self.position).unwrap_or(usize::MAX).min(content.len());
        let count = buf.len().min(content.len() - start);
        buf[..count].copy_from_slice(&content[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }
}

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.access.can_write() {
            return Err(VfsError::Unsupported("Stream does not support writing.".into()).into());
        }
        let too_long = || io::Error::from(VfsError::io("Stream was too long."));
        let start = usize::try_from(self.position).map_err(|_| too_long())?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= MAX_LENGTH)
            .ok_or_else(too_long)?;
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let node = state.tree.get_mut(self.node).ok_or_else(|| self.gone())?;
        if let Some(content) = node.content_mut() {
            if content.len() < end {
                content.resize(end, 0);
            }
            content[start..end].copy_from_slice(buf);
        }
        node.times.touch(now);
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FileHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.len().checked_add_signed(delta),
        };
        let Some(target) = target else {
            return Err(VfsError::io(
                "An attempt was made to move the position before the beginning of the stream.",
            )
            .into());
        };
        if self.append_floor.is_some_and(|floor| target < floor) {
            return Err(VfsError::io(
                "Unable seek backward to overwrite data that previously existed in a file opened in Append mode.",
            )
            .into());
        }
        self.position = target;
        Ok(target)
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        self.fs.lock().release_handle(self.node);
        trace!("closed {}", self.path);
    }
}
