//! Tagging subsystem: the tag-string parser and the concurrent [`TagStore`].

pub mod parser;
pub mod store;

pub use parser::parse_tags;
pub use store::{TagSet, TagStore};
