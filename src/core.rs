use crate::VfsError;

pub type Result<T> = std::result::Result<T, VfsError>;

pub(crate) mod utils {
    /// Ordinal case folding: maps a char to its simple uppercase form.
    pub fn fold_char(c: char) -> char {
        let mut upper = c.to_uppercase();
        match (upper.next(), upper.next()) {
            (Some(u), None) => u,
            _ => c,
        }
    }

    /// Key under which a name is stored among its siblings.
    pub fn fold(name: &str) -> String {
        name.chars().map(fold_char).collect()
    }

    pub fn eq_ignore_case(a: &str, b: &str) -> bool {
        a.chars().map(fold_char).eq(b.chars().map(fold_char))
    }

    pub fn is_separator(c: char) -> bool {
        c == '\\' || c == '/'
    }

    /// True for an empty string or one made only of whitespace.
    pub fn is_blank(s: &str) -> bool {
        s.chars().all(char::is_whitespace)
    }

}
