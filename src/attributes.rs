use bitflags::bitflags;

bitflags! {
    /// Win32 file attribute bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAttributes: u32 {
        const READ_ONLY = 0x1;
        const HIDDEN = 0x2;
        const SYSTEM = 0x4;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        const DEVICE = 0x40;
        const NORMAL = 0x80;
        const TEMPORARY = 0x100;
        const SPARSE_FILE = 0x200;
        const REPARSE_POINT = 0x400;
        const COMPRESSED = 0x800;
        const OFFLINE = 0x1000;
        const NOT_CONTENT_INDEXED = 0x2000;
        const ENCRYPTED = 0x4000;
    }
}

impl FileAttributes {
    /// Every bit set; what an info object reports for an entry that does not exist (`-1`).
    pub const MISSING: FileAttributes = FileAttributes::from_bits_retain(u32::MAX);

    /// Signed view of the bits, so the missing sentinel reads as `-1`.
    pub fn as_i32(self) -> i32 {
        self.bits() as i32
    }

    /// Keeps the directory bit in step with the node kind and folds `NORMAL` the way the OS
    /// does: alone it stands for "no attributes", combined with anything it is dropped.
    pub(crate) fn normalized(self, is_dir: bool) -> FileAttributes {
        let mut attributes = self.difference(FileAttributes::DIRECTORY);
        if is_dir {
            attributes.remove(FileAttributes::NORMAL);
            attributes.insert(FileAttributes::DIRECTORY);
        } else {
            if attributes != FileAttributes::NORMAL {
                attributes.remove(FileAttributes::NORMAL);
            }
            if attributes.is_empty() {
                attributes = FileAttributes::NORMAL;
            }
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sentinel() {
        assert_eq!(FileAttributes::MISSING.as_i32(), -1);
        assert!(FileAttributes::MISSING.contains(FileAttributes::DIRECTORY));
    }

    #[test]
    fn test_normalized_for_files() {
        assert_eq!(
            FileAttributes::empty().normalized(false),
            FileAttributes::NORMAL
        );
        assert_eq!(
            (FileAttributes::NORMAL | FileAttributes::HIDDEN).normalized(false),
            FileAttributes::HIDDEN
        );
        assert_eq!(
            (FileAttributes::DIRECTORY | FileAttributes::READ_ONLY).normalized(false),
            FileAttributes::READ_ONLY
        );
    }

    #[test]
    fn test_normalized_for_directories() {
        assert_eq!(
            FileAttributes::NORMAL.normalized(true),
            FileAttributes::DIRECTORY
        );
        assert_eq!(
            FileAttributes::HIDDEN.normalized(true),
            FileAttributes::HIDDEN | FileAttributes::DIRECTORY
        );
    }
}
