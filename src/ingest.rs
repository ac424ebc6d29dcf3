//! Event ingestion loop
//!
//! Owns the watcher for its whole lifetime and multiplexes three sources:
//! new events, delivery errors, and the shutdown request. Exactly one source
//! is serviced per iteration and its output line is written before the next
//! wait begins. Events racing the shutdown request may be dropped.
//!
//! ```text
//! Starting -> Subscribed -> Running -> Draining -> Stopped
//!     \_____________\
//!                    -> FailedToStart
//! ```
//!
//! The stop confirmation is sent on every exit path, after the watcher has
//! been released.

use log::{debug, error, info, warn};
use std::fmt;
use std::io::Write;

use crate::config::FormattingConfig;
use crate::format::format_with;
use crate::shutdown::StopSignal;
use crate::watcher::{ALL_EVENTS, EventStreams, WatchError, Watcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Subscribed,
    Running,
    Draining,
    Stopped,
    FailedToStart,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Holds the watcher; releasing it is best effort and happens at most once
struct ActiveWatcher {
    watcher: Option<Box<dyn Watcher>>,
}

impl ActiveWatcher {
    fn new(watcher: Box<dyn Watcher>) -> Self {
        Self { watcher: Some(watcher) }
    }

    fn release(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            match watcher.shutdown() {
                Ok(()) => debug!("Watcher released"),
                Err(e) => error!("{}", e),
            }
        }
    }
}

impl Drop for ActiveWatcher {
    fn drop(&mut self) {
        self.release();
    }
}

/// The ingestion loop for one process lifetime
pub struct IngestLoop<W: Write> {
    config: FormattingConfig,
    sink: W,
    state: LoopState,
}

impl<W: Write> IngestLoop<W> {
    pub fn new(config: FormattingConfig, sink: W) -> Self {
        Self {
            config,
            sink,
            state: LoopState::Starting,
        }
    }

    /// Run until shutdown is requested or the watcher cannot be started.
    ///
    /// `open` creates the watcher for the configured log. Returns the terminal state.
    pub async fn run<F>(mut self, open: F, signal: StopSignal) -> LoopState
    where
        F: FnOnce(&str) -> Result<Box<dyn Watcher>, WatchError>,
    {
        let StopSignal { mut requested, confirm } = signal;
        // Dropped last, after the watcher
        let _confirm = confirm;

        debug!("Opening watcher for '{}'", self.config.log_name);
        let mut watcher = match open(&self.config.log_name) {
            Ok(watcher) => watcher,
            Err(e) => return self.fail_to_start(e),
        };

        let streams = match watcher.subscribe_from_now(&self.config.log_name, ALL_EVENTS) {
            Ok(streams) => streams,
            Err(e) => {
                ActiveWatcher::new(watcher).release();
                return self.fail_to_start(e);
            }
        };
        let mut active = ActiveWatcher::new(watcher);
        self.transition(LoopState::Subscribed);

        let EventStreams { mut events, mut errors } = streams;
        self.transition(LoopState::Running);

        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    let line = format_with(&event, &self.config);
                    self.emit(&line);
                }
                Some(err) = errors.recv() => {
                    warn!("Delivery error: {}", err);
                    self.emit(&format!("Error: {}", err));
                }
                _ = &mut requested => {
                    debug!("Shutdown requested");
                    break;
                }
            }
        }

        self.transition(LoopState::Draining);
        drop(events);
        drop(errors);
        active.release();

        self.transition(LoopState::Stopped);
        self.state
    }

    fn fail_to_start(&mut self, e: WatchError) -> LoopState {
        error!("Failed to start watching '{}': {}", self.config.log_name, e);
        self.emit(&e.to_string());
        self.transition(LoopState::FailedToStart);
        self.state
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.sink, "{}", line).and_then(|()| self.sink.flush()) {
            error!("Failed to write output line: {}", e);
        }
    }

    fn transition(&mut self, next: LoopState) {
        match next {
            LoopState::Running | LoopState::Stopped => info!("Ingestion loop {}", next),
            _ => debug!("Ingestion loop {} -> {}", self.state, next),
        }
        self.state = next;
    }
}
