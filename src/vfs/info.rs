//! Snapshot-backed info objects.
//!
//! An info object names a path; what it reports about the entry is read from the tree on
//! first use and kept until [`Info::refresh`]. Its own `set_attributes`, time setters and
//! `move_to` keep the snapshot in step; changes made through any other route are not seen
//! until the next refresh.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Local, Utc};

use super::engine::{EMPTY_FILE_NAME, EMPTY_PATH, MockFileSystem, Stat};
use super::entry::{EntryType, TimeKind};
use super::enumerate::{EntryFilter, Enumeration, SearchOption};
use super::handle::{FileAccess, FileHandle, FileMode, FileShare};
use crate::clock::file_time_epoch;
use crate::core::{Result, utils};
use crate::path::{self, AbsolutePath, parser};
use crate::{FileAttributes, VfsError};

mod sealed {
    pub trait Sealed {}
}

/// Marker for what an [`Info`] describes.
pub trait InfoKind: sealed::Sealed {
    const ENTRY_TYPE: EntryType;
}

#[derive(Debug, Clone, Copy)]
pub enum DirectoryKind {}

#[derive(Debug, Clone, Copy)]
pub enum FileKind {}

impl sealed::Sealed for DirectoryKind {}
impl sealed::Sealed for FileKind {}

impl InfoKind for DirectoryKind {
    const ENTRY_TYPE: EntryType = EntryType::Directory;
}

impl InfoKind for FileKind {
    const ENTRY_TYPE: EntryType = EntryType::File;
}

pub type DirectoryInfo = Info<DirectoryKind>;
pub type FileInfo = Info<FileKind>;

#[derive(Debug, Clone, Copy)]
enum Snapshot {
    Missing,
    Present(Stat),
}

/// A directory or file by path, with a cached view of its metadata.
///
/// For an entry that does not exist the accessors report sentinels rather than errors:
/// attributes are [`FileAttributes::MISSING`] and every timestamp is the FILETIME epoch.
/// An unregistered drive or share is still an error.
#[derive(Clone)]
pub struct Info<K: InfoKind> {
    fs: MockFileSystem,
    path: AbsolutePath,
    snapshot: RefCell<Option<Snapshot>>,
    kind: PhantomData<K>,
}

impl<K: InfoKind> fmt::Debug for Info<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Info")
            .field("kind", &K::ENTRY_TYPE)
            .field("path", &self.path.to_string())
            .finish()
    }
}

macro_rules! info_time_accessors {
    ($($kind:ident => $get:ident, $get_utc:ident, $set:ident, $set_utc:ident;)*) => {$(
        pub fn $get(&self) -> Result<DateTime<Local>> {
            Ok(self.time(TimeKind::$kind)?.with_timezone(&Local))
        }

        pub fn $get_utc(&self) -> Result<DateTime<Utc>> {
            self.time(TimeKind::$kind)
        }

        pub fn $set(&self, value: DateTime<Local>) -> Result<()> {
            self.set_time(TimeKind::$kind, value.with_timezone(&Utc))
        }

        pub fn $set_utc(&self, value: DateTime<Utc>) -> Result<()> {
            self.set_time(TimeKind::$kind, value)
        }
    )*};
}

impl<K: InfoKind> Info<K> {
    pub(crate) fn from_path(fs: MockFileSystem, path: AbsolutePath) -> Self {
        Self {
            fs,
            path,
            snapshot: RefCell::new(None),
            kind: PhantomData,
        }
    }

    pub fn path(&self) -> &AbsolutePath {
        &self.path
    }

    pub fn full_name(&self) -> String {
        self.path.to_string()
    }

    /// Final segment as written by the caller; the root text for a root.
    pub fn name(&self) -> String {
        self.path.name()
    }

    /// True if the snapshot shows an entry of this kind.
    pub fn exists(&self) -> bool {
        matches!(self.snapshot(), Ok(Snapshot::Present(stat)) if stat.entry_type == K::ENTRY_TYPE)
    }

    /// Drops the snapshot; the next accessor reads the tree again.
    pub fn refresh(&self) {
        self.snapshot.replace(None);
    }

    pub fn attributes(&self) -> Result<FileAttributes> {
        Ok(match self.snapshot()? {
            Snapshot::Present(stat) => stat.attributes,
            Snapshot::Missing => FileAttributes::MISSING,
        })
    }

    pub fn set_attributes(&self, attributes: FileAttributes) -> Result<()> {
        let stored = self.fs.lock().set_attributes(&self.path, attributes)?;
        self.patch(|stat| stat.attributes = stored);
        Ok(())
    }

    info_time_accessors! {
        Creation => creation_time, creation_time_utc, set_creation_time, set_creation_time_utc;
        LastAccess => last_access_time, last_access_time_utc, set_last_access_time, set_last_access_time_utc;
        LastWrite => last_write_time, last_write_time_utc, set_last_write_time, set_last_write_time_utc;
    }

    fn time(&self, kind: TimeKind) -> Result<DateTime<Utc>> {
        Ok(match self.snapshot()? {
            Snapshot::Present(stat) => kind.get(&stat.times),
            Snapshot::Missing => file_time_epoch(),
        })
    }

    fn set_time(&self, kind: TimeKind, value: DateTime<Utc>) -> Result<()> {
        self.fs.lock().set_time(&self.path, kind, value)?;
        self.patch(|stat| kind.set(&mut stat.times, value));
        Ok(())
    }

    fn snapshot(&self) -> Result<Snapshot> {
        if let Some(snapshot) = *self.snapshot.borrow() {
            return Ok(snapshot);
        }
        let loaded = match self.fs.lock().stat(&self.path)? {
            Some(stat) => Snapshot::Present(stat),
            None => Snapshot::Missing,
        };
        self.snapshot.replace(Some(loaded));
        Ok(loaded)
    }

    fn patch(&self, update: impl FnOnce(&mut Stat)) {
        if let Some(Snapshot::Present(stat)) = self.snapshot.borrow_mut().as_mut() {
            update(stat);
        }
    }

    fn parse_dest(&self, dest: &str) -> Result<AbsolutePath> {
        self.fs.parse(dest, EMPTY_FILE_NAME)
    }
}

impl Info<DirectoryKind> {
    pub fn create(&self) -> Result<()> {
        let now = self.fs.now();
        self.fs.lock().create_directory(&self.path, now)
    }

    /// Creates `name` below this directory. `name` must be relative and stay inside.
    pub fn create_subdirectory(&self, name: &str) -> Result<DirectoryInfo> {
        if utils::is_blank(name) {
            return Err(VfsError::invalid(EMPTY_PATH));
        }
        if parser::is_rooted(name) {
            return Err(VfsError::invalid(
                "Second path fragment must not be a drive or UNC name.",
            ));
        }
        let base = self.path.normalized();
        let path = path::parse(name, &base)?;
        if !path.is_descendant_of(&base) {
            return Err(VfsError::invalid(format!(
                "The directory specified, '{name}', is not a subdirectory of '{base}'."
            )));
        }
        let now = self.fs.now();
        let mut state = self.fs.lock();
        state.create_directory(&path, now)?;
        let echoed = state.lookup(&path).echo(&state.tree);
        Ok(DirectoryInfo::from_path(self.fs.clone(), echoed))
    }

    pub fn delete(&self, recursive: bool) -> Result<()> {
        let now = self.fs.now();
        self.fs.lock().delete_directory(&self.path, recursive, now)
    }

    /// Moves the directory and points this object at the new location.
    pub fn move_to(&mut self, dest: &str) -> Result<()> {
        let dest = self.parse_dest(dest)?;
        let now = self.fs.now();
        self.fs.lock().move_entry(&self.path, &dest, now)?;
        self.path = dest;
        Ok(())
    }

    pub fn parent(&self) -> Option<DirectoryInfo> {
        self.path
            .parent()
            .map(|parent| DirectoryInfo::from_path(self.fs.clone(), parent))
    }

    pub fn root(&self) -> DirectoryInfo {
        DirectoryInfo::from_path(self.fs.clone(), self.path.root_path())
    }

    pub fn enumerate_files(&self, pattern: &str, option: SearchOption) -> Result<Enumeration> {
        Enumeration::new(&self.fs, &self.path, pattern, option, EntryFilter::Files)
    }

    pub fn enumerate_directories(&self, pattern: &str, option: SearchOption) -> Result<Enumeration> {
        Enumeration::new(&self.fs, &self.path, pattern, option, EntryFilter::Directories)
    }

    pub fn enumerate_file_system_entries(
        &self,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Enumeration> {
        Enumeration::new(&self.fs, &self.path, pattern, option, EntryFilter::Entries)
    }

    pub fn get_files(&self, pattern: &str, option: SearchOption) -> Result<Vec<FileInfo>> {
        self.enumerate_files(pattern, option)?
            .into_iter()
            .map(|found| Ok(FileInfo::from_path(self.fs.clone(), self.fs.parse(&found, EMPTY_PATH)?)))
            .collect()
    }

    pub fn get_directories(&self, pattern: &str, option: SearchOption) -> Result<Vec<DirectoryInfo>> {
        self.enumerate_directories(pattern, option)?
            .into_iter()
            .map(|found| {
                Ok(DirectoryInfo::from_path(self.fs.clone(), self.fs.parse(&found, EMPTY_PATH)?))
            })
            .collect()
    }
}

impl Info<FileKind> {
    /// Content length; a missing file (or a directory) is an error.
    pub fn length(&self) -> Result<u64> {
        match self.snapshot()? {
            Snapshot::Present(stat) if stat.entry_type == EntryType::File => Ok(stat.len),
            _ => Err(VfsError::FileNotFound(self.full_name())),
        }
    }

    pub fn directory_name(&self) -> Option<String> {
        self.path.parent().map(|parent| parent.to_string())
    }

    pub fn directory(&self) -> Option<DirectoryInfo> {
        self.path
            .parent()
            .map(|parent| DirectoryInfo::from_path(self.fs.clone(), parent))
    }

    /// True for a missing file, whose attributes read as all bits set.
    pub fn is_read_only(&self) -> Result<bool> {
        Ok(self.attributes()?.contains(FileAttributes::READ_ONLY))
    }

    pub fn set_is_read_only(&self, read_only: bool) -> Result<()> {
        let mut attributes = self.fs.lock().attributes(&self.path)?;
        attributes.set(FileAttributes::READ_ONLY, read_only);
        self.set_attributes(attributes)
    }

    pub fn create(&self) -> Result<FileHandle> {
        self.open(FileMode::Create, FileAccess::ReadWrite, FileShare::NONE)
    }

    pub fn open(&self, mode: FileMode, access: FileAccess, share: FileShare) -> Result<FileHandle> {
        FileHandle::open(&self.fs, self.path.clone(), mode, access, share)
    }

    pub fn delete(&self) -> Result<()> {
        let now = self.fs.now();
        self.fs.lock().delete_file(&self.path, now)
    }

    pub fn copy_to(&self, dest: &str, overwrite: bool) -> Result<FileInfo> {
        let dest = self.parse_dest(dest)?;
        let now = self.fs.now();
        self.fs.lock().copy_file(&self.path, &dest, overwrite, now)?;
        Ok(FileInfo::from_path(self.fs.clone(), dest))
    }

    /// Moves the file and points this object at the new location.
    pub fn move_to(&mut self, dest: &str, overwrite: bool) -> Result<()> {
        let dest = self.parse_dest(dest)?;
        let now = self.fs.now();
        self.fs.lock().move_file(&self.path, &dest, overwrite, now)?;
        self.path = dest;
        Ok(())
    }

    pub fn encrypt(&self) -> Result<()> {
        self.fs.lock().set_encrypted(&self.path, true)
    }

    pub fn decrypt(&self) -> Result<()> {
        self.fs.lock().set_encrypted(&self.path, false)
    }
}
