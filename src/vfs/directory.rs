use chrono::{DateTime, Local, Utc};

use super::engine::{EMPTY_FILE_NAME, EMPTY_PATH, MockFileSystem};
use super::entry::{EntryType, TimeKind};
use super::enumerate::{EntryFilter, Enumeration, SearchOption};
use super::info::DirectoryInfo;
use crate::core::Result;

/// Directory operations, shaped after the static `Directory` API of Windows runtimes.
///
/// Paths may be absolute, drive-relative or relative to the current directory.
#[derive(Debug, Clone, Copy)]
pub struct Directory<'a> {
    fs: &'a MockFileSystem,
}

impl<'a> Directory<'a> {
    pub(crate) fn new(fs: &'a MockFileSystem) -> Self {
        Self { fs }
    }

    /// Creates `path` and every missing parent. Succeeds when the directory already exists.
    pub fn create_directory(&self, path: &str) -> Result<DirectoryInfo> {
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let path = state.parse(path, EMPTY_PATH)?;
        state.create_directory(&path, now)?;
        let echoed = state.lookup(&path).echo(&state.tree);
        Ok(DirectoryInfo::from_path(self.fs.clone(), echoed))
    }

    pub fn delete(&self, path: &str, recursive: bool) -> Result<()> {
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let path = state.parse(path, EMPTY_PATH)?;
        state.delete_directory(&path, recursive, now)
    }

    /// Moves or renames a directory (or a file) within one volume.
    pub fn move_to(&self, source: &str, dest: &str) -> Result<()> {
        let now = self.fs.now();
        let mut state = self.fs.lock();
        let source = state.parse(source, EMPTY_FILE_NAME)?;
        let dest = state.parse(dest, EMPTY_FILE_NAME)?;
        state.move_entry(&source, &dest, now)
    }

    /// False for anything that is not an existing directory, including malformed paths.
    pub fn exists(&self, path: &str) -> bool {
        let state = self.fs.lock();
        state
            .parse(path, EMPTY_PATH)
            .is_ok_and(|path| state.exists(&path, EntryType::Directory))
    }

    pub fn enumerate_files(&self, path: &str, pattern: &str, option: SearchOption) -> Result<Enumeration> {
        self.enumerate(path, pattern, option, EntryFilter::Files)
    }

    pub fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Enumeration> {
        self.enumerate(path, pattern, option, EntryFilter::Directories)
    }

    pub fn enumerate_file_system_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Enumeration> {
        self.enumerate(path, pattern, option, EntryFilter::Entries)
    }

    pub fn get_files(&self, path: &str, pattern: &str, option: SearchOption) -> Result<Vec<String>> {
        Ok(self.enumerate_files(path, pattern, option)?.into_iter().collect())
    }

    pub fn get_directories(&self, path: &str, pattern: &str, option: SearchOption) -> Result<Vec<String>> {
        Ok(self.enumerate_directories(path, pattern, option)?.into_iter().collect())
    }

    pub fn get_file_system_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<String>> {
        Ok(self
            .enumerate_file_system_entries(path, pattern, option)?
            .into_iter()
            .collect())
    }

    fn enumerate(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        filter: EntryFilter,
    ) -> Result<Enumeration> {
        let path = self.fs.parse(path, EMPTY_PATH)?;
        Enumeration::new(self.fs, &path, pattern, option, filter)
    }

    /// Containing directory; `None` for a root. A path ending in a separator is its own parent.
    pub fn get_parent(&self, path: &str) -> Result<Option<DirectoryInfo>> {
        let path = self.fs.parse(path, EMPTY_PATH)?;
        let parent = if path.has_trailing_separator() {
            Some(path.normalized())
        } else {
            path.parent()
        };
        Ok(parent.map(|parent| DirectoryInfo::from_path(self.fs.clone(), parent)))
    }

    pub fn get_directory_root(&self, path: &str) -> Result<String> {
        Ok(self.fs.parse(path, EMPTY_PATH)?.root_path().to_string())
    }

    pub fn get_current_directory(&self) -> String {
        self.fs.lock().cwd.to_string()
    }

    pub fn set_current_directory(&self, path: &str) -> Result<()> {
        let mut state = self.fs.lock();
        let path = state.parse(path, EMPTY_PATH)?;
        state.set_current_directory(&path)
    }

    /// Registered drives as `X:\`, in letter order.
    pub fn get_logical_drives(&self) -> Vec<String> {
        self.fs.lock().logical_drives()
    }

    time_accessors! {
        Creation => get_creation_time, get_creation_time_utc, set_creation_time, set_creation_time_utc;
        LastAccess => get_last_access_time, get_last_access_time_utc, set_last_access_time, set_last_access_time_utc;
        LastWrite => get_last_write_time, get_last_write_time_utc, set_last_write_time, set_last_write_time_utc;
    }
}
