// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::llm::{DynChatBackend, LlmClient};
use crate::client::miniflux::MinifluxClient;
use crate::config::{self, Settings};
use crate::pipeline;

/// Entries fetched per iteration.
const FETCH_LIMIT: usize = 10_000;

/// Fixed pause between poll iterations.
pub const POLL_INTERVAL_SECS: u64 = 60;

/// One-time metrics registration (descriptions show up wherever a recorder
/// is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poll_runs_total", "Completed poll iterations.");
        describe_counter!(
            "entries_fetched_total",
            "Unread entries fetched from the aggregator."
        );
        describe_counter!(
            "entries_updated_total",
            "Entries pushed back with rewritten content."
        );
        describe_counter!("entry_errors_total", "Entries that failed processing.");
        describe_counter!("llm_requests_total", "Chat completion requests sent.");
        describe_counter!(
            "blocks_translated_total",
            "Markdown blocks substituted with translations."
        );
        describe_counter!(
            "translate_parse_failures_total",
            "Translation responses that failed structural parsing."
        );
        describe_gauge!("poll_last_run_ts", "Unix ts when the poll loop last ran.");
    });
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PollOutcome {
    pub fetched: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Fetch unread entries once and drive them through the worker pool.
/// Completion is observed as-completed; no ordering across entries.
pub async fn poll_once(
    settings: Arc<Settings>,
    aggregator: Arc<MinifluxClient>,
    backend: DynChatBackend,
) -> Result<PollOutcome> {
    ensure_metrics_described();

    let page = aggregator.get_entries("unread", FETCH_LIMIT).await?;
    let fetched = page.entries.len();
    counter!("poll_runs_total").increment(1);
    counter!("entries_fetched_total").increment(fetched as u64);
    gauge!("poll_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    if fetched == 0 {
        tracing::info!("no new entries");
        return Ok(PollOutcome::default());
    }
    tracing::info!(fetched, "fetched unread entries");

    let workers = settings.llm.max_workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks: JoinSet<Result<bool>> = JoinSet::new();

    for entry in page.entries {
        let settings = Arc::clone(&settings);
        let aggregator = Arc::clone(&aggregator);
        let backend = Arc::clone(&backend);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let id = entry.id;
            let update = pipeline::process_entry(&settings, backend.as_ref(), &entry)
                .await
                .with_context(|| format!("processing entry {id}"))?;
            match update {
                Some(update) => {
                    // The aggregator copy is only touched after the whole
                    // rewrite assembled successfully.
                    aggregator
                        .update_entry(id, &update.title, &update.content)
                        .await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        });
    }

    let mut outcome = PollOutcome {
        fetched,
        ..Default::default()
    };
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(true)) => outcome.updated += 1,
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                outcome.failed += 1;
                counter!("entry_errors_total").increment(1);
                tracing::error!(error = ?e, "entry processing failed");
            }
            Err(e) => {
                outcome.failed += 1;
                counter!("entry_errors_total").increment(1);
                tracing::error!(error = ?e, "entry task panicked");
            }
        }
    }
    counter!("entries_updated_total").increment(outcome.updated as u64);

    Ok(outcome)
}

/// Poll indefinitely. Each iteration loads a fresh settings snapshot and
/// rebuilds the clients from it, so config edits apply without a restart;
/// an iteration failure is logged and the loop continues after the sleep.
pub async fn run_loop() -> Result<()> {
    loop {
        if let Err(e) = run_iteration().await {
            tracing::error!(error = ?e, "poll iteration failed");
        }
        tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
    }
}

async fn run_iteration() -> Result<()> {
    let settings = Arc::new(config::load_default()?);
    let aggregator = Arc::new(MinifluxClient::new(&settings.miniflux)?);
    let backend: DynChatBackend = Arc::new(LlmClient::new(&settings.llm)?);

    let outcome = poll_once(settings, aggregator, backend).await?;
    if outcome.fetched > 0 {
        tracing::info!(
            updated = outcome.updated,
            failed = outcome.failed,
            "iteration done"
        );
    }
    Ok(())
}
