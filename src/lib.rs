// src/lib.rs
// Public library surface for integration tests (and the binary).

pub mod client;
pub mod config;
pub mod markdown;
pub mod pipeline;
pub mod scheduler;
pub mod translate;

// ---- Re-exports for stable public API ----
pub use client::llm::{ChatBackend, DynChatBackend, LlmClient};
pub use client::miniflux::{EntriesPage, Entry, Feed, MinifluxClient};
pub use config::{AgentProfile, LlmConfig, MinifluxConfig, Settings};
pub use pipeline::{process_entry, EntryUpdate};
pub use translate::{SpanCollection, TranslationMap};
