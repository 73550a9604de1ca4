//! Raw string to [`AbsolutePath`].
//!
//! Validation happens entirely up front: a string either parses into a rooted path or yields a
//! typed error, before the tree is ever consulted.

use log::trace;

use super::{AbsolutePath, Root};
use crate::core::{Result, utils};
use crate::VfsError;

const EXTENDED_PREFIX: &str = "\\\\?\\";

const RESERVED_NAMES: [&str; 4] = ["CON", "PRN", "AUX", "NUL"];

/// Parses `raw` into an absolute path, resolving rootless input against `cwd`.
///
/// Callers reject empty input with their own message first; an empty string reaching this
/// point is reported as not being of a legal form.
pub fn parse(raw: &str, cwd: &AbsolutePath) -> Result<AbsolutePath> {
    if utils::is_blank(raw) {
        return Err(VfsError::invalid("The path is not of a legal form."));
    }
    let text = raw.replace('/', "\\");

    let path = if let Some(rest) = text.strip_prefix(EXTENDED_PREFIX) {
        parse_extended(rest)?
    } else {
        check_characters(&text)?;
        check_colons(&text)?;
        parse_plain(&text, cwd)?
    };
    trace!("parsed {raw:?} as {path}");
    Ok(path)
}

/// `\\?\X:\...` or `\\?\UNC\server\share\...`
fn parse_extended(rest: &str) -> Result<AbsolutePath> {
    check_characters(rest)?;
    if rest
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("UNC\\"))
    {
        let (server, share, tail) = split_unc(&rest[4..])?;
        check_no_colon(tail)?;
        let root = Root::ExtendedUnc { server, share };
        return Ok(build(AbsolutePath::new(root), tail, true));
    }
    match drive_prefix(rest) {
        Some(letter) => {
            let tail = &rest[2..];
            check_no_colon(tail)?;
            Ok(build(AbsolutePath::new(Root::ExtendedDrive(letter)), tail, true))
        }
        None => Err(VfsError::unsupported_format()),
    }
}

fn parse_plain(text: &str, cwd: &AbsolutePath) -> Result<AbsolutePath> {
    if let Some(unc) = text.strip_prefix("\\\\") {
        let (server, share, tail) = split_unc(unc)?;
        return checked(build(AbsolutePath::new(Root::Unc { server, share }), tail, false));
    }
    if let Some(letter) = drive_prefix(text) {
        let tail = &text[2..];
        if tail.starts_with('\\') {
            return checked(build(AbsolutePath::new(Root::Drive(letter)), tail, false));
        }
        // Drive-relative ("C:" or "C:dir"): relative to the current directory if it is on the
        // same drive, otherwise to that drive's root.
        let base = match cwd.root().drive_letter() {
            Some(current) if current.eq_ignore_ascii_case(&letter) => cwd.normalized(),
            _ => AbsolutePath::new(Root::Drive(letter)),
        };
        return checked(build(base, tail, false));
    }
    if text.starts_with('\\') {
        return checked(build(cwd.root_path(), text, false));
    }
    checked(build(cwd.normalized(), text, false))
}

/// Appends the segments of `tail` to `base`, collapsing `.` and `..`.
fn build(base: AbsolutePath, tail: &str, extended: bool) -> AbsolutePath {
    let root = base.root().clone();
    let mut segments: Vec<String> = base.segments().to_vec();
    let mut literal_name = None;

    for raw in tail.split('\\').filter(|s| !s.is_empty()) {
        let segment = if extended { raw } else { raw.trim_end() };
        match segment {
            "" | "." => literal_name = None,
            ".." => {
                segments.pop();
                literal_name = None;
            }
            name => {
                segments.push(name.to_string());
                literal_name = Some(raw.to_string());
            }
        }
    }

    let trailing_separator = tail.ends_with('\\');
    AbsolutePath::from_parts(root, segments, literal_name, trailing_separator)
}

fn checked(path: AbsolutePath) -> Result<AbsolutePath> {
    if path.segments().iter().any(|s| is_reserved_name(s)) {
        return Err(VfsError::Unsupported(
            "Reserved names are not supported.".to_string(),
        ));
    }
    Ok(path)
}

/// Splits `server\share\rest` into its parts.
fn split_unc(text: &str) -> Result<(String, String, &str)> {
    let mut parts = text.splitn(3, '\\');
    let server = parts.next().unwrap_or_default();
    let share = parts.next().unwrap_or_default();
    let tail = parts.next().unwrap_or_default();
    if server.trim().is_empty() || share.trim().is_empty() {
        return Err(VfsError::invalid(
            "The UNC path should be of the form \\\\server\\share.",
        ));
    }
    Ok((server.to_string(), share.trim_end().to_string(), tail))
}

fn drive_prefix(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => Some(letter),
        _ => None,
    }
}

fn check_characters(text: &str) -> Result<()> {
    if text.chars().any(is_illegal_char) {
        return Err(VfsError::illegal_characters());
    }
    Ok(())
}

/// A colon is only legal right after a leading drive letter.
fn check_colons(text: &str) -> Result<()> {
    let allowed = drive_prefix(text).map(|_| 1);
    for (index, c) in text.char_indices() {
        if c == ':' && Some(index) != allowed {
            return Err(VfsError::unsupported_format());
        }
    }
    Ok(())
}

fn check_no_colon(tail: &str) -> Result<()> {
    if tail.contains(':') {
        return Err(VfsError::unsupported_format());
    }
    Ok(())
}

pub(crate) fn is_illegal_char(c: char) -> bool {
    matches!(c, '<' | '>' | '"' | '|' | '?' | '*') || (c as u32) < 0x20
}

/// Device names are reserved with or without an extension (`CON`, `nul.txt`, `COM1.log`).
pub(crate) fn is_reserved_name(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or_default().trim_end();
    let stem = utils::fold(stem);
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return true;
    }
    match stem.as_bytes() {
        [b'C', b'O', b'M', digit] | [b'L', b'P', b'T', digit] => (b'1'..=b'9').contains(digit),
        _ => false,
    }
}

/// True if `raw` names a root of its own (drive, UNC or leading separator).
pub(crate) fn is_rooted(raw: &str) -> bool {
    raw.starts_with(utils::is_separator) || drive_prefix(raw).is_some()
}
