//! DOS-style wildcard matching over a single name.
//!
//! Patterns go through the same translation Win32 applies before calling its name matcher:
//! every `?` becomes DOS_QM, a `.` followed by `?` or `*` becomes DOS_DOT, and a trailing
//! `*.` becomes DOS_STAR. That is what lets `*.ba?` match `file.ba` as well as `file.bak`.

use crate::core::{Result, utils};
use crate::path::parser::is_illegal_char;
use crate::VfsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// `*`: zero or more characters.
    Star,
    /// Zero or more characters, never consuming the final `.` of the name.
    DosStar,
    /// One character, or nothing at a `.` or the end of the name.
    DosQm,
    /// A `.`, or nothing at the end of the name.
    DosDot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Nothing,
    Everything,
    Expression(Vec<Token>),
}

/// A validated search pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    kind: Kind,
}

impl Pattern {
    /// Validates and translates `raw`.
    ///
    /// Blank patterns are legal and match nothing.
    pub fn parse(raw: &str) -> Result<Pattern> {
        let pattern = raw.trim_end();
        if pattern.is_empty() {
            return Ok(Pattern {
                kind: Kind::Nothing,
            });
        }
        if pattern.contains(|c: char| utils::is_separator(c) || c == ':') {
            return Err(VfsError::invalid(
                "Second path fragment must not be a drive or UNC name.",
            ));
        }
        if pattern.contains(|c: char| is_illegal_char(c) && c != '*' && c != '?') {
            return Err(VfsError::illegal_characters());
        }
        if pattern.ends_with("..") {
            return Err(VfsError::invalid(
                "Search pattern cannot contain \"..\" to move up directories and can be \
                 contained only internally in file/directory names, as in \"a..b\".",
            ));
        }
        if matches!(pattern, "*" | "*.*" | ".") {
            return Ok(Pattern {
                kind: Kind::Everything,
            });
        }
        Ok(Pattern {
            kind: Kind::Expression(translate(pattern)),
        })
    }

    /// Pattern that matches every name.
    pub fn any() -> Pattern {
        Pattern {
            kind: Kind::Everything,
        }
    }

    /// Case-insensitive match of a whole name.
    pub fn matches(&self, name: &str) -> bool {
        match &self.kind {
            Kind::Nothing => false,
            Kind::Everything => true,
            Kind::Expression(tokens) => matches_tokens(tokens, name),
        }
    }
}

fn translate(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();
        match c {
            '.' if next.is_none() && i > 0 && chars[i - 1] == '*' => {
                if let Some(last) = tokens.last_mut() {
                    *last = Token::DosStar;
                }
            }
            '.' if matches!(next, Some('?') | Some('*')) => tokens.push(Token::DosDot),
            '?' => tokens.push(Token::DosQm),
            '*' => tokens.push(Token::Star),
            other => tokens.push(Token::Literal(utils::fold_char(other))),
        }
    }
    tokens
}

/// `table[i][j]` is true when `tokens[i..]` matches `name[j..]`; filled back to front.
fn matches_tokens(tokens: &[Token], name: &str) -> bool {
    let name: Vec<char> = name.chars().map(utils::fold_char).collect();
    let last_dot = name.iter().rposition(|&c| c == '.');
    let (p, n) = (tokens.len(), name.len());

    let mut table = vec![vec![false; n + 1]; p + 1];
    table[p][n] = true;

    for i in (0..p).rev() {
        for j in (0..=n).rev() {
            let at = name.get(j).copied();
            table[i][j] = match tokens[i] {
                Token::Literal(c) => at == Some(c) && table[i + 1][j + 1],
                Token::Star => table[i + 1][j] || (at.is_some() && table[i][j + 1]),
                Token::DosStar => {
                    table[i + 1][j] || (at.is_some() && last_dot != Some(j) && table[i][j + 1])
                }
                Token::DosQm => match at {
                    Some(c) if c != '.' => table[i + 1][j + 1],
                    _ => table[i + 1][j],
                },
                Token::DosDot => match at {
                    Some('.') => table[i + 1][j + 1],
                    Some(_) => false,
                    None => table[i + 1][j],
                },
            };
        }
    }
    table[0][0]
}
