mod absolute;
pub(crate) mod parser;
mod wildcard;

pub use absolute::{AbsolutePath, Root, RootKey};
pub use parser::parse;
pub use wildcard::Pattern;
