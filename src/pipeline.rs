//! Per-entry pipeline: run every configured agent over one entry and
//! assemble the rewritten title + content for the aggregator.

use anyhow::Result;

use crate::client::llm::ChatBackend;
use crate::client::miniflux::Entry;
use crate::config::{AgentProfile, Settings};
use crate::markdown;
use crate::translate::{self, batch};

/// Rewritten title/content, pushed back under the original entry id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUpdate {
    pub title: String,
    pub content: String,
}

/// Apply each agent in configuration order. `Ok(None)` means every agent
/// skipped (or produced nothing) and the entry stays untouched. Updates are
/// only assembled after every step succeeded, so a failure part-way never
/// corrupts the aggregator copy.
pub async fn process_entry(
    settings: &Settings,
    backend: &dyn ChatBackend,
    entry: &Entry,
) -> Result<Option<EntryUpdate>> {
    let markers = settings.completed_markers();
    let mut combined = String::new();
    let mut new_title: Option<String> = None;

    for agent in &settings.agents {
        // Content that already starts with an agent title (or a style-block
        // pre tag) was annotated on an earlier cycle.
        if markers.iter().any(|m| entry.content.starts_with(m.as_str())) {
            tracing::debug!(agent = %agent.name, entry = entry.id, "already processed, skipping");
            continue;
        }
        if !agent.accepts(&entry.feed.feed_url) {
            tracing::debug!(agent = %agent.name, feed = %entry.feed.feed_url, "feed filtered out");
            continue;
        }

        let title = batch::translate_text(backend, &entry.title, &agent.title_prompt).await?;
        tracing::info!(agent = %agent.name, feed_title = %entry.title, result = %title, "title rewritten");

        let markdown_source = html_to_markdown(&entry.content)?;
        let doc = markdown::parse_markdown(&markdown_source);
        let translated =
            translate::translate_document(&doc, backend, &agent.collection_prompt).await?;

        combined.push_str(&render_agent_output(agent, &translated));
        new_title = Some(title);
    }

    let Some(title) = new_title else {
        return Ok(None);
    };
    combined.push_str(&original_content_block(&entry.content));
    Ok(Some(EntryUpdate {
        title,
        content: combined,
    }))
}

fn html_to_markdown(html: &str) -> Result<String> {
    htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .build()
        .convert(html)
        .map_err(|e| anyhow::anyhow!("converting entry html to markdown: {e}"))
}

fn render_agent_output(agent: &AgentProfile, markdown_source: &str) -> String {
    if agent.style_block {
        let flat = markdown_source.replace(['\n', '\r'], "");
        format!(
            "<pre style=\"white-space: pre-wrap;\"><code>\n{}：{}\n</code></pre><hr><br />",
            agent.title, flat
        )
    } else {
        format!(
            "{}：{}<hr><br />",
            agent.title,
            markdown::markdown_to_html(markdown_source)
        )
    }
}

/// Collapsible original, appended once after all agent outputs.
fn original_content_block(original_html: &str) -> String {
    format!("<details>\n<summary>原文内容</summary>\n\n{original_html}\n\n</details>\n\n")
}
