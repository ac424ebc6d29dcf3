//! Graceful shutdown coordination
//!
//! The first interrupt becomes a single shutdown request to the ingestion
//! loop; the coordinator then waits for the loop's stop confirmation. Once
//! the first interrupt has been taken the listener is never polled again,
//! so later interrupts are swallowed by the installed handler and do not
//! start a second cycle or kill the process mid-drain.

use log::{debug, info};
use std::future::Future;
use std::io::{self, Write};
use tokio::sync::oneshot;

/// Create the two halves of the shutdown handshake
pub fn handshake() -> (Coordinator, StopSignal) {
    let (request_tx, request_rx) = oneshot::channel();
    let (confirm_tx, confirm_rx) = oneshot::channel();

    (
        Coordinator {
            request: request_tx,
            confirmed: confirm_rx,
        },
        StopSignal {
            requested: request_rx,
            confirm: StopConfirmation(Some(confirm_tx)),
        },
    )
}

/// Loop side of the handshake
pub struct StopSignal {
    /// Resolves when shutdown is requested (or the coordinator is gone)
    pub requested: oneshot::Receiver<()>,
    pub confirm: StopConfirmation,
}

/// Sends the stop confirmation when dropped, so every exit path confirms exactly once
pub struct StopConfirmation(Option<oneshot::Sender<()>>);

impl Drop for StopConfirmation {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
            debug!("Stop confirmed");
        }
    }
}

/// Control side of the handshake
pub struct Coordinator {
    request: oneshot::Sender<()>,
    confirmed: oneshot::Receiver<()>,
}

impl Coordinator {
    /// Request shutdown and wait for the loop to confirm it stopped
    pub async fn stop(self) {
        let _ = self.request.send(());
        let _ = self.confirmed.await;
    }

    /// Wait for `interrupt`, then stop the loop and report completion on `out`.
    ///
    /// A loop that stops on its own (it could not start) ends the wait early.
    pub async fn run<I, W>(mut self, interrupt: I, out: &mut W) -> io::Result<()>
    where
        I: Future<Output = ()>,
        W: Write,
    {
        tokio::select! {
            () = interrupt => {
                info!("Interrupt received");
                writeln!(out, "Attempting graceful shutdown")?;
                out.flush()?;
                self.stop().await;
            }
            _ = &mut self.confirmed => {
                info!("Ingestion loop stopped before any interrupt");
            }
        }

        writeln!(out, "Finished")?;
        out.flush()
    }
}

/// OS interrupt notification (Ctrl+C / SIGINT).
///
/// The handler is installed on creation, so interrupts arriving before the
/// first `recv` are not lost and never terminate the process.
pub struct Interrupt {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
    #[cfg(windows)]
    inner: tokio::signal::windows::CtrlC,
}

impl Interrupt {
    /// Install the interrupt handler. Must be called inside a tokio runtime.
    pub fn listen() -> io::Result<Self> {
        #[cfg(unix)]
        let inner = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
        #[cfg(windows)]
        let inner = tokio::signal::windows::ctrl_c()?;

        Ok(Self { inner })
    }

    /// Wait for the next interrupt
    pub async fn recv(&mut self) {
        if self.inner.recv().await.is_none() {
            // Stream closed; there will be no interrupt to wait for
            std::future::pending::<()>().await;
        }
    }
}
