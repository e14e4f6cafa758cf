//! Shared state for the comms channels — capability boundary.
//!
//! Message-speaking channels (PTY, Telegram) receive an `Arc<BotState>` and
//! are restricted to the typed methods below: turn an input line into a
//! reply, and report lifecycle events. The corpus store itself stays
//! private, so channels cannot reach around the command layer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::commands;
use crate::corpus::CorpusStore;
use crate::error::AppError;

// ── Events ────────────────────────────────────────────────────────────────────

/// Events a channel sends back to the comms manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Shared state passed as `Arc<BotState>` to every message-speaking channel.
pub struct BotState {
    store: Arc<CorpusStore>,
    /// Back-channel to the comms manager.
    event_tx: mpsc::Sender<CommsEvent>,
}

impl BotState {
    pub fn new(store: Arc<CorpusStore>, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self { store, event_tx }
    }

    /// Turn one line of user input into a reply.
    ///
    /// This is the only outbound path for message channels. Engine-level
    /// validation and lookup errors come back as rendered text; only a
    /// corpus load failure is an `Err`.
    pub async fn respond(&self, input: &str) -> Result<String, AppError> {
        commands::respond(&self.store, input).await
    }

    /// Report an event to the comms manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is
    /// not keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}
