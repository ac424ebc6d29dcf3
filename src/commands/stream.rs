//! Stream events to stdout until interrupted

use eyre::{Context, Result};
use log::{error, info};
use std::io::{self, Write};

use crate::config::{Config, FormattingConfig};
use crate::ingest::{IngestLoop, LoopState};
use crate::shutdown::{self, Interrupt};
use crate::watcher;

/// Run the streaming command
pub fn run(config: &Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(stream(config.formatting.clone()))
}

async fn stream(formatting: FormattingConfig) -> Result<()> {
    // Installed before anything is printed so an early Ctrl+C is still graceful
    let mut interrupt = Interrupt::listen().context("Failed to listen for interrupts")?;

    let mut stdout = io::stdout();
    writeln!(stdout, "Starting...").context("Failed to write to stdout")?;
    info!(
        "Streaming '{}' as {} (msgout: {}, color: {})",
        formatting.log_name, formatting.style, formatting.policy, formatting.use_color
    );

    let (coordinator, signal) = shutdown::handshake();
    let ingest = tokio::spawn(IngestLoop::new(formatting, io::stdout()).run(watcher::create, signal));

    coordinator
        .run(interrupt.recv(), &mut stdout)
        .await
        .context("Failed to write to stdout")?;

    match ingest.await {
        Ok(LoopState::FailedToStart) => info!("Exited without streaming"),
        Ok(state) => info!("Ingestion loop finished in state {}", state),
        Err(e) => error!("Ingestion task failed: {}", e),
    }

    Ok(())
}
