// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const ENV_PATH: &str = "TRANSLATOR_CONFIG_PATH";
const DEFAULT_PATH: &str = "config.toml";

/// Immutable configuration snapshot. Loaded once per poll iteration and
/// passed to every task; never mutated in place.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub miniflux: MinifluxConfig,
    pub llm: LlmConfig,
    /// Ordered: agents run against each entry in file order.
    #[serde(default)]
    pub agents: Vec<AgentProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinifluxConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Omitted -> provider default.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

/// A named processing profile: prompts, formatting and source filters,
/// applied independently to each entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    /// Display title prefixed to this agent's output.
    pub title: String,
    pub title_prompt: String,
    pub collection_prompt: String,
    #[serde(default)]
    pub style_block: bool,
    #[serde(default, alias = "whitelist")]
    pub allow_list: Option<Vec<String>>,
    #[serde(default, alias = "blacklist")]
    pub deny_list: Option<Vec<String>>,
}

impl AgentProfile {
    /// An entry is processed when it passes the source filters: present in
    /// the allow list, or absent from the deny list, or neither list set.
    pub fn accepts(&self, feed_url: &str) -> bool {
        let allow_hit = self
            .allow_list
            .as_ref()
            .is_some_and(|list| list.iter().any(|u| u == feed_url));
        let deny_pass = self
            .deny_list
            .as_ref()
            .is_some_and(|list| !list.iter().any(|u| u == feed_url));
        allow_hit || deny_pass || (self.allow_list.is_none() && self.deny_list.is_none())
    }
}

impl Settings {
    /// Prefixes that mark an entry as already processed: every agent's
    /// display title, plus the pre tag when any agent renders style blocks.
    pub fn completed_markers(&self) -> Vec<String> {
        let mut markers: Vec<String> = self.agents.iter().map(|a| a.title.clone()).collect();
        if self.agents.iter().any(|a| a.style_block) {
            markers.push("<pre".to_string());
        }
        markers
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_workers() -> usize {
    4
}

/// Load settings from an explicit path.
pub fn load_from(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}

/// Load settings from $TRANSLATOR_CONFIG_PATH, falling back to
/// `config.toml` in the working directory.
pub fn load_default() -> Result<Settings> {
    let path = std::env::var(ENV_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_PATH));
    load_from(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
log_level = "debug"

[miniflux]
base_url = "https://reader.example.org"
api_key = "mf-key"

[llm]
base_url = "https://api.example.com/v1"
api_key = "llm-key"
model = "gpt-4o-mini"

[[agents]]
name = "translate-zh"
title = "AI翻译"
title_prompt = "Translate the title."
collection_prompt = "Translate each span."
whitelist = ["https://feed.a/rss"]

[[agents]]
name = "summary"
title = "AI摘要"
title_prompt = "Summarize the title."
collection_prompt = "Summarize each span."
style_block = true
blacklist = ["https://feed.b/rss"]
"#;

    #[test]
    fn parses_sample_with_aliases_and_defaults() {
        let settings: Settings = toml::from_str(SAMPLE).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.llm.timeout, 120);
        assert_eq!(settings.llm.max_workers, 4);
        assert!(settings.llm.temperature.is_none());

        // Order preserved, aliases mapped.
        assert_eq!(settings.agents.len(), 2);
        assert_eq!(settings.agents[0].name, "translate-zh");
        assert_eq!(
            settings.agents[0].allow_list,
            Some(vec!["https://feed.a/rss".to_string()])
        );
        assert!(settings.agents[0].deny_list.is_none());
        assert_eq!(
            settings.agents[1].deny_list,
            Some(vec!["https://feed.b/rss".to_string()])
        );
        assert!(settings.agents[1].style_block);
    }

    #[test]
    fn completed_markers_include_titles_and_pre() {
        let settings: Settings = toml::from_str(SAMPLE).unwrap();
        let markers = settings.completed_markers();
        assert!(markers.contains(&"AI翻译".to_string()));
        assert!(markers.contains(&"AI摘要".to_string()));
        assert!(markers.contains(&"<pre".to_string()));
    }

    #[test]
    fn accepts_follows_allow_then_deny_rules() {
        let settings: Settings = toml::from_str(SAMPLE).unwrap();
        let allow_only = &settings.agents[0];
        assert!(allow_only.accepts("https://feed.a/rss"));
        assert!(!allow_only.accepts("https://feed.b/rss"));

        let deny_only = &settings.agents[1];
        assert!(!deny_only.accepts("https://feed.b/rss"));
        assert!(deny_only.accepts("https://feed.c/rss"));

        let unfiltered = AgentProfile {
            allow_list: None,
            deny_list: None,
            ..allow_only.clone()
        };
        assert!(unfiltered.accepts("https://anything.example/rss"));
    }

    #[test]
    fn load_from_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = load_from(&path).unwrap();
        assert_eq!(settings.miniflux.base_url, "https://reader.example.org");
    }

    #[test]
    fn load_from_missing_file_errors_with_path() {
        let err = load_from(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/config.toml"));
    }
}
