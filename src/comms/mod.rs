//! Comms — manages all external I/O channels.
//!
//! # Channel model
//!
//! Each channel (PTY console, Telegram, HTTP) implements [`Channel`] and is
//! spawned as an independent concurrent task by [`start`]. Channels capture
//! their shared state (`Arc<BotState>` or the corpus store) at construction
//! time — the generic `run` signature only carries the shutdown token.
//!
//! Any channel error cancels the shared [`CancellationToken`] so sibling
//! channels stop cooperatively; the returned [`CommsHandle`] resolves when
//! all channels have exited and yields the first error, if any.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events). It is drained by a short-lived
//! background task that dies naturally when all senders are dropped.

mod state;
#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-telegram")]
pub mod telegram;
#[cfg(feature = "channel-axum")]
pub mod http;

pub use state::{BotState, CommsEvent};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::corpus::CorpusStore;
use crate::error::AppError;

// ── Channel ───────────────────────────────────────────────────────────────────

/// A boxed, owned future returned by [`Channel::run`].
pub type ChannelFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained, concurrently-runnable comms channel.
///
/// Implementors capture all shared state at construction time. `run` is
/// called once and should loop until `shutdown` is cancelled or the
/// channel's own work is done.
pub trait Channel: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Consume the channel and return its async run-loop as a boxed future.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture;
}

// ── CommsHandle ───────────────────────────────────────────────────────────────

/// An opaque handle to the running channel task set. `.await` it via
/// [`CommsHandle::join`] to block until every channel has exited.
pub struct CommsHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl CommsHandle {
    /// Await all channels and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Comms(format!("comms task panicked: {e}"))),
        }
    }
}

// ── spawn_channels ────────────────────────────────────────────────────────────

/// Spawn each [`Channel`] as an independent Tokio task.
///
/// Behaviour on error: if any channel returns `Err` (or panics), `shutdown`
/// is cancelled so siblings stop cooperatively; the manager task drains the
/// rest and reports the first error.
fn spawn_channels(channels: Vec<Box<dyn Channel>>, shutdown: CancellationToken) -> CommsHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for channel in channels {
            let id = channel.id().to_string();
            let shutdown = shutdown.clone();
            debug!(channel = %id, "spawning channel");
            set.spawn(channel.run(shutdown));
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("channel panicked: {e}");
                    shutdown.cancel();
                    first_err
                        .get_or_insert_with(|| AppError::Comms(format!("channel panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("channel error: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    CommsHandle { inner: handle }
}

// ── start ─────────────────────────────────────────────────────────────────────

/// Spawn all configured channels and return a [`CommsHandle`].
///
/// Channels start immediately. This function is synchronous — it returns as
/// soon as the tasks are spawned; the caller decides when to await the
/// handle.
pub fn start(
    config: &Config,
    store: Arc<CorpusStore>,
    shutdown: CancellationToken,
) -> CommsHandle {
    // Intra-subsystem event channel: channels → manager.
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(BotState::new(store.clone(), event_tx));

    let mut channels: Vec<Box<dyn Channel>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            channels.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
        }
    }

    #[cfg(feature = "channel-telegram")]
    {
        if config.comms_telegram_should_load() {
            info!("loading telegram channel");
            channels.push(Box::new(telegram::TelegramChannel::new(
                "telegram0",
                state.clone(),
            )));
        }
    }

    #[cfg(feature = "channel-axum")]
    {
        if config.comms_http_should_load() {
            info!(bind = %config.comms.http.bind, "loading http channel");
            channels.push(Box::new(http::HttpChannel::new(
                "http0",
                config.comms.http.bind.clone(),
                config.bot_name.clone(),
                store.clone(),
            )));
        }
    }

    #[cfg(not(any(feature = "channel-pty", feature = "channel-telegram")))]
    let _ = &state;

    if channels.is_empty() {
        info!("no comms channels configured — nothing to serve");
    }

    // Drain lifecycle events until all channel senders are dropped.
    // Monitoring-only; does not affect lifecycle.
    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
            }
        }
    });

    spawn_channels(channels, shutdown)
}
