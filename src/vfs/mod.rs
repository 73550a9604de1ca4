/// Creation, last-access and last-write accessors shared by the `Directory` and `File`
/// facades, in local time and in UTC.
macro_rules! time_accessors {
    ($($kind:ident => $get:ident, $get_utc:ident, $set:ident, $set_utc:ident;)*) => {$(
        pub fn $get(&self, path: &str) -> Result<DateTime<Local>> {
            Ok(self.fs.time_utc(path, TimeKind::$kind)?.with_timezone(&Local))
        }

        pub fn $get_utc(&self, path: &str) -> Result<DateTime<Utc>> {
            self.fs.time_utc(path, TimeKind::$kind)
        }

        pub fn $set(&self, path: &str, value: DateTime<Local>) -> Result<()> {
            self.fs.set_time_utc(path, TimeKind::$kind, value.with_timezone(&Utc))
        }

        pub fn $set_utc(&self, path: &str, value: DateTime<Utc>) -> Result<()> {
            self.fs.set_time_utc(path, TimeKind::$kind, value)
        }
    )*};
}

mod directory;
mod engine;
mod entry;
mod enumerate;
mod file;
mod handle;
mod info;
mod resolver;
mod tree;

pub use directory::Directory;
pub use engine::MockFileSystem;
pub use entry::{EntryType, TimeKind, Timestamps};
pub use enumerate::{Enumeration, EnumerationIter, SearchOption};
pub use file::File;
pub use handle::{FileAccess, FileHandle, FileMode, FileShare};
pub use info::{DirectoryInfo, DirectoryKind, FileInfo, FileKind, Info, InfoKind};
