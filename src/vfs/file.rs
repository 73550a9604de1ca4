use chrono::{DateTime, Local, Utc};

use super::engine::{EMPTY_FILE_NAME, MockFileSystem, NOT_LEGAL_FORM};
use super::entry::{EntryType, TimeKind};
use super::handle::{FileAccess, FileHandle, FileMode, FileShare};
use crate::core::Result;
use crate::FileAttributes;

/// File operations, shaped after the static `File` API of Windows runtimes.
#[derive(Debug, Clone, Copy)]
pub struct File<'a> {
    fs: &'a MockFileSystem,
}

impl<'a> File<'a> {
    pub(crate) fn new(fs: &'a MockFileSystem) -> Self {
        Self { fs }
    }

    /// False for anything that is not an existing file, including malformed paths.
    pub fn exists(&self, path: &str) -> bool {
        let state = self.fs.lock();
        state
            .parse(path, EMPTY_FILE_NAME)
            .is_ok_and(|path| state.exists(&path, EntryType::File))
    }

    /// Creates or truncates `path` and opens it for reading and writing.
    pub fn create(&self, path: &str) -> Result<FileHandle> {
        self.open(path, FileMode::Create, FileAccess::ReadWrite, FileShare::NONE)
    }

    pub fn open(
        &self,
        path: &str,
        mode: FileMode,
        access: FileAccess,
        share: FileShare,
    ) -> Result<FileHandle> {
        let path = self.fs.parse(path, EMPTY_FILE_NAME)?;
        FileHandle::open(self.fs, path, mode, access, share)
    }

    /// Copies content, attributes and last-write time; the copy is created now.
    pub fn copy(&self, source: &str, dest: &str, overwrite: bool) -> Result<()> {
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let source = state.parse(source, EMPTY_FILE_NAME)?;
        let dest = state.parse(dest, EMPTY_FILE_NAME)?;
        state.copy_file(&source, &dest, overwrite, now)
    }

    pub fn move_to(&self, source: &str, dest: &str, overwrite: bool) -> Result<()> {
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let source = state.parse(source, EMPTY_FILE_NAME)?;
        let dest = state.parse(dest, EMPTY_FILE_NAME)?;
        state.move_file(&source, &dest, overwrite, now)
    }

    /// Deleting a missing file in an existing directory succeeds.
    pub fn delete(&self, path: &str) -> Result<()> {
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let path = state.parse(path, EMPTY_FILE_NAME)?;
        state.delete_file(&path, now)
    }

    /// Replaces the content of `dest` with that of `source`, which is removed.
    /// When `backup` is given, the previous `dest` is kept there.
    pub fn replace(&self, source: &str, dest: &str, backup: Option<&str>) -> Result<()> {
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let source = state.parse(source, EMPTY_FILE_NAME)?;
        let dest = state.parse(dest, EMPTY_FILE_NAME)?;
        let backup = backup
            .map(|backup| state.parse(backup, EMPTY_FILE_NAME))
            .transpose()?;
        state.replace_file(&source, &dest, backup.as_ref(), now)
    }

    pub fn get_attributes(&self, path: &str) -> Result<FileAttributes> {
        let state = self.fs.lock();
        let path = state.parse(path, NOT_LEGAL_FORM)?;
        state.attributes(&path)
    }

    /// Never changes a timestamp.
    pub fn set_attributes(&self, path: &str, attributes: FileAttributes) -> Result<()> {
        let mut state = self.fs.lock();
        let path = state.parse(path, NOT_LEGAL_FORM)?;
        state.set_attributes(&path, attributes).map(|_| ())
    }

    pub fn encrypt(&self, path: &str) -> Result<()> {
        self.set_encrypted(path, true)
    }

    pub fn decrypt(&self, path: &str) -> Result<()> {
        self.set_encrypted(path, false)
    }

    fn set_encrypted(&self, path: &str, encrypted: bool) -> Result<()> {
        let mut state = self.fs.lock();
        let path = state.parse(path, EMPTY_FILE_NAME)?;
        state.set_encrypted(&path, encrypted)
    }

    time_accessors! {
        Creation => get_creation_time, get_creation_time_utc, set_creation_time, set_creation_time_utc;
        LastAccess => get_last_access_time, get_last_access_time_utc, set_last_access_time, set_last_access_time_utc;
        LastWrite => get_last_write_time, get_last_write_time_utc, set_last_write_time, set_last_write_time_utc;
    }
}
