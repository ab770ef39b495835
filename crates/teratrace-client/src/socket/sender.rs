//! WebSocket sender with queueing and fixed-delay reconnection.
//!
//! A [`SocketSender`] is a cheap handle to a worker task that exclusively
//! owns the connection, the pending queue and the back-off timer. Every
//! event the worker reacts to (a send, a finished connection attempt, an
//! inbound frame or a closed socket, the timer firing, a close request) is
//! handled one at a time on that task, so the state needs no locking.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep, Sleep};
use tracing::{debug, info, trace, warn};

use crate::config::{ClientConfig, QueueConfig};
use crate::entry::LogEntry;
use crate::error::{ClientError, Result};

use super::connector::{Connection, Connector};
use super::events::SocketEvent;
use super::queue::{Completion, Pending, PendingQueue};
use super::state::{AtomicConnectionState, ConnectionState};

const EVENT_CAPACITY: usize = 64;

/// Settings of one socket sender.
#[derive(Debug, Clone)]
pub struct SocketSettings {
    /// Collector WebSocket URL.
    pub url: String,
    /// Whether to reconnect after a failure.
    pub auto_reconnect: bool,
    /// Fixed delay before a reconnection attempt.
    pub reconnect_delay: Duration,
    /// Pending queue bounds.
    pub queue: QueueConfig,
}

impl SocketSettings {
    /// Derives socket settings from a client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket URL is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            url: config.socket_url()?.to_string(),
            auto_reconnect: config.auto_reconnect,
            reconnect_delay: config.reconnect_delay(),
            queue: config.queue,
        })
    }
}

enum Command {
    Send {
        entry: LogEntry,
        completion: Completion,
    },
    Queued {
        reply: oneshot::Sender<usize>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a socket worker.
///
/// Cloning the handle shares the same worker. The worker stops when
/// [`SocketSender::close`] is called or every handle has been dropped.
#[derive(Clone)]
pub struct SocketSender {
    commands: mpsc::UnboundedSender<Command>,
    state: Arc<AtomicConnectionState>,
    events: broadcast::Sender<SocketEvent>,
}

impl std::fmt::Debug for SocketSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketSender")
            .field("state", &self.state.load())
            .finish_non_exhaustive()
    }
}

impl SocketSender {
    /// Spawns the worker and starts the first connection attempt.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<C: Connector>(settings: SocketSettings, connector: C) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        // The first attempt is part of construction
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Connecting));

        let worker = SocketWorker {
            url: settings.url,
            auto_reconnect: settings.auto_reconnect,
            reconnect_delay: settings.reconnect_delay,
            connector: Arc::new(connector),
            commands: command_rx,
            queue: PendingQueue::new(settings.queue),
            state: Arc::clone(&state),
            events: events.clone(),
            attempt: None,
            attempts: 0,
            connection: None,
            backoff: None,
        };
        tokio::spawn(worker.run());

        Self {
            commands,
            state,
            events,
        }
    }

    /// Sends an entry.
    ///
    /// The entry is handed to the worker before this returns, so entries
    /// are delivered in the order `send` was called. The returned future
    /// resolves with the outcome of the write.
    pub fn send(&self, entry: LogEntry) -> BoxFuture<'static, Result<()>> {
        let (completion, outcome) = oneshot::channel();
        let accepted = self
            .commands
            .send(Command::Send { entry, completion })
            .is_ok();

        async move {
            if !accepted {
                return Err(ClientError::Closed);
            }
            outcome.await.map_err(|_| ClientError::Closed)?
        }
        .boxed()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// Subscribes to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.events.subscribe()
    }

    /// Number of entries waiting for a connection.
    ///
    /// Counts every entry sent before this call. Returns 0 once closed.
    pub async fn queued(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Queued { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Entries still queued are rejected with [`ClientError::Closed`].
    /// Returns once the worker has stopped. Closing twice is a no-op.
    pub async fn close(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Close { reply }).is_ok() {
            let _ = done.await;
        }
    }

    /// Returns true once the worker has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

type Attempt<T> = BoxFuture<'static, Result<T>>;

struct SocketWorker<C: Connector> {
    url: String,
    auto_reconnect: bool,
    reconnect_delay: Duration,
    connector: Arc<C>,
    commands: mpsc::UnboundedReceiver<Command>,
    queue: PendingQueue,
    state: Arc<AtomicConnectionState>,
    events: broadcast::Sender<SocketEvent>,
    /// In-flight connection attempt.
    attempt: Option<Attempt<C::Connection>>,
    /// Attempts since the last successful connection.
    attempts: u32,
    connection: Option<C::Connection>,
    /// Armed reconnection timer.
    backoff: Option<Pin<Box<Sleep>>>,
}

impl<C: Connector> SocketWorker<C> {
    async fn run(mut self) {
        self.connect();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send { entry, completion }) => {
                        self.handle_send(Pending { entry, completion }).await;
                    }
                    Some(Command::Queued { reply }) => {
                        let _ = reply.send(self.queue.len());
                    }
                    Some(Command::Close { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        return;
                    }
                    None => {
                        self.shutdown().await;
                        return;
                    }
                },
                outcome = poll_attempt(&mut self.attempt) => {
                    self.attempt = None;
                    match outcome {
                        Ok(connection) => self.on_open(connection).await,
                        Err(e) => self.on_connect_failed(&e),
                    }
                }
                inbound = poll_inbound(&mut self.connection) => match inbound {
                    Some(Ok(text)) => {
                        trace!(len = text.len(), "Ignoring frame from collector");
                    }
                    Some(Err(e)) => self.on_lost(e.to_string()),
                    None => self.on_lost("connection closed".to_string()),
                },
                () = poll_backoff(&mut self.backoff) => {
                    self.backoff = None;
                    self.connect();
                }
            }
        }
    }

    /// Starts a connection attempt unless one is in flight or the socket is open.
    fn connect(&mut self) {
        if self.attempt.is_some() || self.connection.is_some() {
            return;
        }

        self.attempts += 1;
        self.set_state(ConnectionState::Connecting);
        self.emit(SocketEvent::Connecting {
            attempt: self.attempts,
        });
        debug!(url = %self.url, attempt = self.attempts, "Connecting to collector");

        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        self.attempt = Some(async move { connector.connect(&url).await }.boxed());
    }

    async fn handle_send(&mut self, pending: Pending) {
        if let Some(connection) = self.connection.as_mut() {
            write_entry(connection, pending).await;
            return;
        }

        debug!(queued = self.queue.len() + 1, "Not connected, queueing entry");
        self.queue.push(pending);

        if self.backoff.is_none() {
            self.connect();
        }
    }

    async fn on_open(&mut self, mut connection: C::Connection) {
        info!(url = %self.url, "Connected to collector");
        self.attempts = 0;
        self.set_state(ConnectionState::Connected);

        let drained = self.queue.len();
        while let Some(pending) = self.queue.pop() {
            write_entry(&mut connection, pending).await;
        }
        if drained > 0 {
            debug!(drained, "Flushed pending entries");
        }

        self.connection = Some(connection);
        self.emit(SocketEvent::Connected);
    }

    fn on_connect_failed(&mut self, error: &ClientError) {
        warn!(url = %self.url, error = %error, queued = self.queue.len(), "Collector connection failed");
        self.set_state(ConnectionState::Disconnected);
        self.emit(SocketEvent::Disconnected {
            reason: error.to_string(),
        });
        self.schedule_reconnect();
    }

    fn on_lost(&mut self, reason: String) {
        info!(url = %self.url, reason = %reason, "Disconnected from collector");
        self.connection = None;
        self.set_state(ConnectionState::Disconnected);
        self.emit(SocketEvent::Disconnected { reason });
        self.schedule_reconnect();
    }

    /// Arms the reconnection timer, at most once per disconnect.
    fn schedule_reconnect(&mut self) {
        if !self.auto_reconnect || self.backoff.is_some() || self.attempt.is_some() {
            return;
        }

        debug!(delay_ms = self.reconnect_delay.as_millis() as u64, "Scheduling reconnect");
        self.backoff = Some(Box::pin(sleep(self.reconnect_delay)));
        self.emit(SocketEvent::ReconnectScheduled {
            delay: self.reconnect_delay,
        });
    }

    async fn shutdown(&mut self) {
        self.backoff = None;
        self.attempt = None;

        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }

        if !self.queue.is_empty() {
            debug!(queued = self.queue.len(), "Rejecting queued entries on close");
        }
        self.queue.reject_all(|| ClientError::Closed);

        // Sends that raced with the close request
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Send { completion, .. } => {
                    let _ = completion.send(Err(ClientError::Closed));
                }
                Command::Queued { reply } => {
                    let _ = reply.send(0);
                }
                Command::Close { reply } => {
                    let _ = reply.send(());
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        self.emit(SocketEvent::Closed);
        info!(url = %self.url, "Collector client closed");
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state);
    }

    fn emit(&self, event: SocketEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

async fn write_entry<T: Connection>(connection: &mut T, pending: Pending) {
    let outcome = match pending.entry.to_json() {
        Ok(json) => connection.send_text(json).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &outcome {
        warn!(error = %e, "Failed to write entry to collector");
    }
    pending.complete(outcome);
}

async fn poll_attempt<T>(attempt: &mut Option<Attempt<T>>) -> Result<T> {
    match attempt {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn poll_inbound<T: Connection>(connection: &mut Option<T>) -> Option<Result<String>> {
    match connection {
        Some(conn) => conn.recv().await,
        None => std::future::pending().await,
    }
}

async fn poll_backoff(backoff: &mut Option<Pin<Box<Sleep>>>) {
    match backoff {
        Some(timer) => timer.as_mut().await,
        None => std::future::pending().await,
    }
}
