// src/translate/mod.rs
//
// The collect -> translate -> substitute cycle, one block at a time.

pub mod batch;
pub mod wire;

use std::collections::BTreeMap;

use anyhow::Result;
use metrics::counter;

use crate::client::llm::ChatBackend;
use crate::markdown::ast::Block;
use crate::markdown::writer::{self, RenderPass};

/// Ordered index -> text mapping built by one collection pass (dense), or a
/// remainder subset of one (sparse).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanCollection(BTreeMap<usize, String>);

impl SpanCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append with the next dense index (collection-pass order).
    pub fn push(&mut self, text: impl Into<String>) -> usize {
        let idx = self.0.len();
        self.0.insert(idx, text.into());
        idx
    }

    pub fn get(&self, idx: usize) -> Option<&String> {
        self.0.get(&idx)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &String)> {
        self.0.iter()
    }
}

impl FromIterator<(usize, String)> for SpanCollection {
    fn from_iter<T: IntoIterator<Item = (usize, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Index -> translated text; indices absent here fall back to the original
/// run during the substitution pass.
pub type TranslationMap = BTreeMap<usize, String>;

/// Run the per-block cycle over a whole document and reassemble the
/// translated markdown.
pub async fn translate_document(
    doc: &[Block],
    backend: &dyn ChatBackend,
    prompt: &str,
) -> Result<String> {
    let mut out = String::new();
    for block in doc {
        out.push_str(&translate_block(block, backend, prompt).await?);
    }
    Ok(out)
}

/// Collect spans (keeping the pass-1 rendering as the fallback), translate
/// if anything was collected, substitute-render on success.
pub async fn translate_block(
    block: &Block,
    backend: &dyn ChatBackend,
    prompt: &str,
) -> Result<String> {
    // A block quote translates per inner block, the same way the document
    // level does; the quote markers are layered on afterwards.
    if let Block::BlockQuote(blocks) = block {
        let mut inner = String::new();
        for inner_block in blocks {
            inner.push_str(&Box::pin(translate_block(inner_block, backend, prompt)).await?);
        }
        return Ok(writer::quote(&inner));
    }

    if !is_translatable(block) {
        return Ok(writer::render_block(block, &mut RenderPass::Verbatim));
    }

    let mut spans = SpanCollection::new();
    let original = writer::render_block(block, &mut RenderPass::Collect(&mut spans));
    if spans.is_empty() {
        return Ok(original);
    }

    match batch::translate_spans(backend, &spans, prompt).await? {
        Some(map) if !map.is_empty() => {
            counter!("blocks_translated_total").increment(1);
            Ok(writer::render_block(block, &mut RenderPass::substitute(&map)))
        }
        _ => Ok(original),
    }
}

/// Paragraphs, headings, tables and outermost lists run the two-pass cycle.
/// Code, raw HTML and thematic breaks render verbatim; nested lists are
/// reached through their parent's traversal, never from here.
fn is_translatable(block: &Block) -> bool {
    matches!(
        block,
        Block::Paragraph(_) | Block::Heading { .. } | Block::Table(_) | Block::List(_)
    )
}
