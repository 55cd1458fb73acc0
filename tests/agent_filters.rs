// tests/agent_filters.rs
//
// Allow/deny source filtering and the already-processed skip, exercised
// through the real per-entry pipeline with a scripted backend.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use miniflux_translator::{
    process_entry, AgentProfile, ChatBackend, Entry, Feed, LlmConfig, MinifluxConfig, Settings,
};

/// Echoes span payloads (identity translation) and rewrites titles; counts
/// every request so skipped entries can prove the backend was never asked.
struct ScriptedBackend {
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, _system_prompt: &str, user_text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if user_text.starts_with("<root>") {
            Ok(user_text.to_string())
        } else {
            Ok(format!("译:{user_text}"))
        }
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn settings(agent: AgentProfile) -> Settings {
    Settings {
        log_level: "info".to_string(),
        miniflux: MinifluxConfig {
            base_url: "https://reader.test".to_string(),
            api_key: "k".to_string(),
        },
        llm: LlmConfig {
            base_url: "https://llm.test/v1".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
            temperature: None,
            timeout: 120,
            max_workers: 4,
        },
        agents: vec![agent],
    }
}

fn agent() -> AgentProfile {
    AgentProfile {
        name: "translate-zh".to_string(),
        title: "AI翻译".to_string(),
        title_prompt: "translate the title".to_string(),
        collection_prompt: "translate each span".to_string(),
        style_block: false,
        allow_list: None,
        deny_list: None,
    }
}

fn entry(feed_url: &str, content: &str) -> Entry {
    Entry {
        id: 7,
        title: "A headline long enough to translate".to_string(),
        content: content.to_string(),
        feed: Feed {
            feed_url: feed_url.to_string(),
        },
    }
}

const HTML: &str = "<p>This is a test paragraph with enough words.</p>";

#[tokio::test]
async fn allow_list_admits_listed_feed_only() {
    let mut a = agent();
    a.allow_list = Some(vec!["https://feed.a/rss".to_string()]);
    let settings = settings(a);

    let backend = ScriptedBackend::new();
    let skipped = process_entry(&settings, &backend, &entry("https://feed.b/rss", HTML))
        .await
        .unwrap();
    assert!(skipped.is_none());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

    let processed = process_entry(&settings, &backend, &entry("https://feed.a/rss", HTML))
        .await
        .unwrap();
    let update = processed.expect("allow-listed feed must be processed");
    assert!(update.title.starts_with("译:"));
    assert!(update.content.starts_with("AI翻译："));
}

#[tokio::test]
async fn deny_list_rejects_listed_feed_only() {
    let mut a = agent();
    a.deny_list = Some(vec!["https://feed.b/rss".to_string()]);
    let settings = settings(a);

    let backend = ScriptedBackend::new();
    let denied = process_entry(&settings, &backend, &entry("https://feed.b/rss", HTML))
        .await
        .unwrap();
    assert!(denied.is_none());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

    let other = process_entry(&settings, &backend, &entry("https://feed.c/rss", HTML))
        .await
        .unwrap();
    assert!(other.is_some());
}

#[tokio::test]
async fn title_prefixed_content_is_not_reprocessed() {
    let settings = settings(agent());
    let backend = ScriptedBackend::new();

    let annotated = format!("AI翻译：<p>translated earlier</p><hr><br />{HTML}");
    let out = process_entry(&settings, &backend, &entry("https://feed.c/rss", &annotated))
        .await
        .unwrap();
    assert!(out.is_none());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pre_block_marker_skips_when_any_agent_is_style_block() {
    let mut a = agent();
    a.style_block = true;
    let settings = settings(a);
    let backend = ScriptedBackend::new();

    let annotated = format!("<pre style=\"white-space: pre-wrap;\"><code>\nAI翻译：x\n</code></pre>{HTML}");
    let out = process_entry(&settings, &backend, &entry("https://feed.c/rss", &annotated))
        .await
        .unwrap();
    assert!(out.is_none());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn processed_entry_carries_collapsible_original() {
    let settings = settings(agent());
    let backend = ScriptedBackend::new();

    let update = process_entry(&settings, &backend, &entry("https://feed.c/rss", HTML))
        .await
        .unwrap()
        .expect("unfiltered entry must be processed");

    assert!(update.content.contains("<details>"));
    assert!(update.content.contains("<summary>原文内容</summary>"));
    assert!(update.content.contains(HTML), "original html must be kept verbatim");
}
