// src/markdown/mod.rs
pub mod ast;
pub mod parse;
pub mod writer;

pub use ast::{Block, Inline, List, ListItem, Table, TableCell};
pub use parse::parse_markdown;

/// Render markdown to HTML with the same extension set used for parsing.
/// Raw HTML passes through untouched — entry content arrives as HTML in the
/// first place, and sanitization is the feed reader's concern.
pub fn markdown_to_html(source: &str) -> String {
    let mut options = parse::comrak_options();
    options.render.unsafe_ = true;
    comrak::markdown_to_html(source, &options)
}
