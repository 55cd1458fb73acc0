//! Chat-completion backend: provider trait + OpenAI-compatible client.
//!
//! The trait is the seam the translation pipeline is tested through; the
//! real client talks to any endpoint speaking the chat-completions shape.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// One system-prompt + user-content round trip returning the raw response
/// text. Implementations must be shareable across worker tasks.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynChatBackend = Arc<dyn ChatBackend>;

/// OpenAI-compatible chat-completions client.
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building llm http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout),
        })
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system_prompt,
                },
                Msg {
                    role: "user",
                    content: user_text,
                },
            ],
            temperature: self.temperature,
        };

        counter!("llm_requests_total").increment(1);

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&req)
            .send()
            .await
            .context("sending chat completion request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion failed: {status}: {body}"));
        }

        let body: Resp = resp.json().await.context("decoding chat completion")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no choices"))?;

        tracing::debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }
}
