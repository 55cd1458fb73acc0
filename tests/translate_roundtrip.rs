// tests/translate_roundtrip.rs
//
// A failing backend must never change the rendered output: whatever the
// collection pass produced is what the caller gets back.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use miniflux_translator::markdown::writer::{render_blocks, RenderPass};
use miniflux_translator::markdown::parse_markdown;
use miniflux_translator::translate::translate_document;
use miniflux_translator::ChatBackend;

const DOC: &str = "# A heading with words\n\nA paragraph with a [link](https://example.org) inside.\n\n- first item text\n- second item text\n";

/// Free-form chatter: no structural marker at all.
struct ChatterBackend;

#[async_trait]
impl ChatBackend for ChatterBackend {
    async fn complete(&self, _system_prompt: &str, _user_text: &str) -> Result<String> {
        Ok("Sorry, I can only answer questions about the weather.".to_string())
    }
    fn name(&self) -> &'static str {
        "chatter"
    }
}

/// Carries the marker but never parses; counts how often it was asked.
struct BrokenXmlBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatBackend for BrokenXmlBackend {
    async fn complete(&self, _system_prompt: &str, _user_text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(r#"<content id="0">never closed"#.to_string())
    }
    fn name(&self) -> &'static str {
        "broken-xml"
    }
}

fn untranslated(doc_src: &str) -> String {
    render_blocks(&parse_markdown(doc_src), &mut RenderPass::Verbatim)
}

#[tokio::test]
async fn chatter_response_leaves_document_unchanged() {
    let doc = parse_markdown(DOC);
    let out = translate_document(&doc, &ChatterBackend, "translate").await.unwrap();
    assert_eq!(out, untranslated(DOC));
}

#[tokio::test]
async fn unparseable_response_retries_then_falls_back() {
    let backend = BrokenXmlBackend {
        calls: AtomicUsize::new(0),
    };
    let doc = parse_markdown("One simple paragraph here.\n");
    let out = translate_document(&doc, &backend, "translate").await.unwrap();

    assert_eq!(out, untranslated("One simple paragraph here.\n"));
    // One block, five top-level attempts, no remainder recursion.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 5);
}
