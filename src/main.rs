//! miniflux-translator — Binary Entrypoint
//! Boots the poll loop with tracing, .env support and clean termination on
//! SIGTERM / Ctrl-C.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use miniflux_translator::{config, scheduler};

/// Seed the filter from RUST_LOG when set, else from the config level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Fail fast on an unreadable config; later edits are picked up by the
    // per-iteration reload in the scheduler.
    let settings = config::load_default()?;
    init_tracing(&settings.log_level);

    tokio::select! {
        _ = shutdown_signal() => {
            // Immediate exit, no draining of in-flight work.
            println!("Received termination signal, exiting");
            Ok(())
        }
        res = scheduler::run_loop() => res,
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("installing SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
