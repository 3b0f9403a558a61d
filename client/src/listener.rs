use futures_util::StreamExt;
use ringtone_types::events::{CacheKey, ServerEvent};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

/// Delay between a dropped connection and the next dial. Fixed; retries are unbounded.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone, Debug)]
pub struct ListenerConfig {
    pub url: Url,
    pub reconnect_delay: Duration,
}

impl ListenerConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Receives the cached views to mark stale.
pub trait InvalidationSink: Send + Sync + 'static {
    fn invalidate(&self, key: CacheKey);
}

impl<F> InvalidationSink for F
where
    F: Fn(CacheKey) + Send + Sync + 'static,
{
    fn invalidate(&self, key: CacheKey) {
        self(key)
    }
}

/// Shared set of stale views, drained by whoever refetches them.
#[derive(Clone, Default)]
pub struct StaleViews {
    keys: Arc<Mutex<BTreeSet<CacheKey>>>,
}

impl StaleViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self, key: CacheKey) -> bool {
        self.keys
            .lock()
            .map(|keys| keys.contains(&key))
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> BTreeSet<CacheKey> {
        self.keys.lock().map(|keys| keys.clone()).unwrap_or_default()
    }

    /// Returns the stale views and clears the set.
    pub fn take(&self) -> BTreeSet<CacheKey> {
        self.keys
            .lock()
            .map(|mut keys| std::mem::take(&mut *keys))
            .unwrap_or_default()
    }
}

impl InvalidationSink for StaleViews {
    fn invalidate(&self, key: CacheKey) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.insert(key);
        }
    }
}

/// Keeps one push-notification connection alive and maps its events to stale views.
pub struct Listener;

impl Listener {
    pub fn spawn<S: InvalidationSink>(config: ListenerConfig, sink: S) -> ListenerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let attempts = Arc::new(AtomicU64::new(0));
        let handle = tokio::spawn(run(
            config,
            sink,
            state_tx,
            attempts.clone(),
            shutdown_rx,
        ));
        ListenerHandle {
            shutdown: shutdown_tx,
            state: state_rx,
            attempts,
            handle: Some(handle),
        }
    }
}

/// Owner of a running [Listener]. Dropping it stops the listener.
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    attempts: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Number of dials made so far, including the first.
    pub fn connection_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Cancels any pending reconnect, closes the live connection, and waits for the task to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

enum Flow {
    Reconnect,
    Stop,
}

async fn run<S: InvalidationSink>(
    config: ListenerConfig,
    sink: S,
    state: watch::Sender<ConnectionState>,
    attempts: Arc<AtomicU64>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        state.send_replace(ConnectionState::Connecting);
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(url = %config.url, attempt, "connecting to realtime channel");

        let connected = tokio::select! {
            _ = shutdown.changed() => break,
            result = connect_async(config.url.as_str()) => result,
        };
        match connected {
            Ok((ws, _)) => {
                state.send_replace(ConnectionState::Connected);
                info!(url = %config.url, "realtime channel connected");
                if let Flow::Stop = read_events(ws, &sink, &mut shutdown).await {
                    break;
                }
            }
            Err(err) => {
                warn!(url = %config.url, error = %err, "realtime channel connect failed");
            }
        }

        state.send_replace(ConnectionState::Disconnected);
        debug!(
            delay_ms = config.reconnect_delay.as_millis() as u64,
            "scheduling realtime reconnect"
        );
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(config.reconnect_delay) => {}
        }
    }
    state.send_replace(ConnectionState::Disconnected);
    debug!("realtime listener stopped");
}

async fn read_events<T, S>(
    mut ws: WebSocketStream<T>,
    sink: &S,
    shutdown: &mut watch::Receiver<bool>,
) -> Flow
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    S: InvalidationSink,
{
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = ws.close(None).await;
                return Flow::Stop;
            }
            message = ws.next() => match message {
                Some(Ok(Message::Text(text))) => handle_text(&text, sink),
                Some(Ok(Message::Close(_))) | None => {
                    debug!("realtime channel closed");
                    return Flow::Reconnect;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "realtime channel error");
                    return Flow::Reconnect;
                }
            }
        }
    }
}

/// Applies one text frame. Malformed frames are logged and otherwise ignored.
pub(crate) fn handle_text<S: InvalidationSink>(text: &str, sink: &S) {
    match ServerEvent::parse(text) {
        Ok(Some(event)) => {
            let ids = event.ids();
            debug!(
                event = event.tag(),
                competition_id = ?ids.competition_id,
                order_id = ?ids.order_id,
                user_id = ?ids.user_id,
                "realtime event"
            );
            for key in event.invalidations() {
                sink.invalidate(*key);
            }
        }
        Ok(None) => debug!(len = text.len(), "ignoring realtime event with unknown type"),
        Err(err) => warn!(error = %err, len = text.len(), "failed to parse realtime event"),
    }
}
