//! An in-memory file system with Windows semantics, for testing code that manipulates files
//! without touching the disk.
//!
//! ### Overview
//!
//! `winfs-kit` keeps a tree of drives, UNC shares, directories and files in memory and exposes
//! it through APIs shaped after the Windows `Directory` / `File` / `DirectoryInfo` / `FileInfo`
//! family. Paths, wildcards, timestamps and errors behave the way they do on a real Windows
//! volume, down to the wording of error messages.
//!
//! **Key ideas**:
//! - **Windows paths**: drive letters, drive-relative and rooted-relative forms, UNC shares and
//!   `\\?\` extended paths, `/` and `\` separators, `.` and `..` collapsing.
//! - **Case-insensitive, case-preserving** names; enumeration is ordinal case-insensitive.
//! - **DOS wildcards**: `*.ba?` matches `file.ba`, `*.` matches names without an extension.
//! - **Timestamps**: creation, last-access and last-write are kept per entry and follow the OS
//!   rules when children are added, removed or moved. Time comes from a [`Clock`], so tests can
//!   pin it with [`ManualClock`].
//! - **Exact errors**: every failure is a [`VfsError`] whose message matches the OS text.
//!
//! ```
//! use winfs_kit::{MockFileSystem, SearchOption, VfsError};
//!
//! let fs = MockFileSystem::new();
//! fs.add_file("C:\\Projects\\app\\main.rs", b"fn main() {}").unwrap();
//!
//! let found = fs
//!     .directory()
//!     .get_files("c:\\projects", "*.rs", SearchOption::AllDirectories)
//!     .unwrap();
//! assert_eq!(found, ["c:\\Projects\\app\\main.rs"]);
//!
//! let err = fs.directory().delete("c:\\projects", false).unwrap_err();
//! assert_eq!(err.to_string(), "The directory is not empty.");
//! assert!(matches!(err, VfsError::NotEmpty(_)));
//! ```

mod attributes;
mod clock;
mod core;
mod error;
mod path;
mod vfs;

pub use attributes::FileAttributes;
pub use clock::{Clock, ManualClock, SystemClock, file_time_epoch};
pub use crate::core::Result;
pub use error::VfsError;
pub use path::{AbsolutePath, Pattern, Root, RootKey};
pub use vfs::{
    Directory, DirectoryInfo, DirectoryKind, EntryType, Enumeration, EnumerationIter, File,
    FileAccess, FileHandle, FileInfo, FileKind, FileMode, FileShare, Info, InfoKind,
    MockFileSystem, SearchOption, TimeKind, Timestamps,
};
