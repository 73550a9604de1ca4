use std::fmt;

use crate::core::utils;

/// The four root forms a rooted path can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Root {
    /// `C:\`
    Drive(char),
    /// `\\server\share`
    Unc { server: String, share: String },
    /// `\\?\C:\`
    ExtendedDrive(char),
    /// `\\?\UNC\server\share`
    ExtendedUnc { server: String, share: String },
}

/// Identity of a root in the registry. Extended forms map onto their plain counterpart.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RootKey {
    Drive(char),
    Share(String, String),
}

impl Root {
    pub fn key(&self) -> RootKey {
        match self {
            Root::Drive(letter) | Root::ExtendedDrive(letter) => {
                RootKey::Drive(letter.to_ascii_uppercase())
            }
            Root::Unc { server, share } | Root::ExtendedUnc { server, share } => {
                RootKey::Share(utils::fold(server), utils::fold(share))
            }
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Root::ExtendedDrive(_) | Root::ExtendedUnc { .. })
    }

    pub fn is_unc(&self) -> bool {
        matches!(self, Root::Unc { .. } | Root::ExtendedUnc { .. })
    }

    pub fn drive_letter(&self) -> Option<char> {
        match self {
            Root::Drive(letter) | Root::ExtendedDrive(letter) => Some(*letter),
            _ => None,
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Root::Drive(letter) => write!(f, "{letter}:\\"),
            Root::Unc { server, share } => write!(f, "\\\\{server}\\{share}"),
            Root::ExtendedDrive(letter) => write!(f, "\\\\?\\{letter}:\\"),
            Root::ExtendedUnc { server, share } => write!(f, "\\\\?\\UNC\\{server}\\{share}"),
        }
    }
}

/// A fully resolved, rooted path: `{root, segments}`.
///
/// Segments keep the casing the caller supplied and have trailing whitespace trimmed; the
/// literal final segment is remembered so that an info object can report it as its `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsolutePath {
    root: Root,
    segments: Vec<String>,
    literal_name: Option<String>,
    trailing_separator: bool,
}

impl AbsolutePath {
    pub fn new(root: Root) -> Self {
        Self {
            root,
            segments: Vec::new(),
            literal_name: None,
            trailing_separator: false,
        }
    }

    pub(crate) fn from_parts(
        root: Root,
        segments: Vec<String>,
        literal_name: Option<String>,
        trailing_separator: bool,
    ) -> Self {
        let literal_name = literal_name.filter(|literal| {
            segments
                .last()
                .is_some_and(|last| last != literal && literal.starts_with(last.as_str()))
        });
        Self {
            root,
            trailing_separator: trailing_separator && !segments.is_empty(),
            segments,
            literal_name,
        }
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn has_trailing_separator(&self) -> bool {
        self.trailing_separator
    }

    /// Final segment as used for resolution (trimmed). `None` for a root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Final segment exactly as the caller wrote it, or the root text for a root.
    pub fn name(&self) -> String {
        match (&self.literal_name, self.segments.last()) {
            (Some(literal), _) => literal.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.root.to_string(),
        }
    }

    pub fn parent(&self) -> Option<AbsolutePath> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self::from_parts(self.root.clone(), segments, None, false))
    }

    /// Same path without the literal-name bookkeeping and trailing separator.
    pub fn normalized(&self) -> AbsolutePath {
        Self::from_parts(self.root.clone(), self.segments.clone(), None, false)
    }

    /// The first `len` segments under the same root.
    pub fn prefix(&self, len: usize) -> AbsolutePath {
        let len = len.min(self.segments.len());
        Self::from_parts(self.root.clone(), self.segments[..len].to_vec(), None, false)
    }

    pub fn root_path(&self) -> AbsolutePath {
        AbsolutePath::new(self.root.clone())
    }

    pub fn join<S: Into<String>>(&self, name: S) -> AbsolutePath {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self::from_parts(self.root.clone(), segments, None, false)
    }

    /// Replaces the segment at `index`, used to echo stored casing.
    pub(crate) fn with_segment(mut self, index: usize, name: &str) -> AbsolutePath {
        if let Some(segment) = self.segments.get_mut(index) {
            if segment != name {
                *segment = name.to_string();
                if index + 1 == self.segments.len() {
                    self.literal_name = None;
                }
            }
        }
        self
    }

    /// Case-insensitive equality of root identity and segments.
    pub fn same_location(&self, other: &AbsolutePath) -> bool {
        self.root.key() == other.root.key()
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| utils::eq_ignore_case(a, b))
    }

    /// True if `self` lies strictly below `ancestor` (case-insensitive).
    pub fn is_descendant_of(&self, ancestor: &AbsolutePath) -> bool {
        self.root.key() == ancestor.root.key()
            && self.segments.len() > ancestor.segments.len()
            && ancestor
                .segments
                .iter()
                .zip(&self.segments)
                .all(|(a, b)| utils::eq_ignore_case(a, b))
    }
}

impl fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.root.to_string();
        f.write_str(&root)?;
        let mut needs_separator = !root.ends_with('\\');
        for segment in &self.segments {
            if needs_separator {
                f.write_str("\\")?;
            }
            f.write_str(segment)?;
            needs_separator = true;
        }
        if self.trailing_separator {
            f.write_str("\\")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_path(segments: &[&str]) -> AbsolutePath {
        AbsolutePath::from_parts(
            Root::Drive('C'),
            segments.iter().map(|s| s.to_string()).collect(),
            None,
            false,
        )
    }

    #[test]
    fn test_display_root_forms() {
        assert_eq!(AbsolutePath::new(Root::Drive('c')).to_string(), "c:\\");
        let unc = Root::Unc {
            server: "server".into(),
            share: "share".into(),
        };
        assert_eq!(AbsolutePath::new(unc.clone()).to_string(), "\\\\server\\share");
        assert_eq!(
            AbsolutePath::new(unc).join("dir").to_string(),
            "\\\\server\\share\\dir"
        );
        assert_eq!(
            AbsolutePath::new(Root::ExtendedDrive('D')).join("x").to_string(),
            "\\\\?\\D:\\x"
        );
        assert_eq!(
            AbsolutePath::new(Root::ExtendedUnc {
                server: "s".into(),
                share: "sh".into()
            })
            .to_string(),
            "\\\\?\\UNC\\s\\sh"
        );
    }

    #[test]
    fn test_root_keys_are_shared_by_extended_forms() {
        assert_eq!(Root::Drive('c').key(), Root::ExtendedDrive('C').key());
        let plain = Root::Unc {
            server: "Server".into(),
            share: "Share".into(),
        };
        let extended = Root::ExtendedUnc {
            server: "SERVER".into(),
            share: "share".into(),
        };
        assert_eq!(plain.key(), extended.key());
    }

    #[test]
    fn test_name_and_parent() {
        let path = drive_path(&["a", "b"]);
        assert_eq!(path.name(), "b");
        assert_eq!(path.parent().unwrap().to_string(), "C:\\a");
        assert_eq!(path.parent().unwrap().parent().unwrap().to_string(), "C:\\");
        assert!(path.root_path().parent().is_none());
        assert_eq!(path.root_path().name(), "C:\\");
    }

    #[test]
    fn test_literal_name_is_kept() {
        let path = AbsolutePath::from_parts(
            Root::Drive('C'),
            vec!["foo".to_string()],
            Some("foo  ".to_string()),
            false,
        );
        assert_eq!(path.name(), "foo  ");
        assert_eq!(path.to_string(), "C:\\foo");
    }

    #[test]
    fn test_location_comparisons() {
        let a = drive_path(&["Base"]);
        let b = drive_path(&["base", "Sub"]);
        assert!(b.is_descendant_of(&a));
        assert!(!a.is_descendant_of(&b));
        assert!(!a.is_descendant_of(&a));
        assert!(a.same_location(&drive_path(&["BASE"])));
    }
}
