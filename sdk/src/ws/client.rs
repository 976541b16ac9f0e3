//! WebSocket client implementation.
//!
//! Provides the client for the live update endpoint. The client remembers
//! which user it authenticated as and which topics it watches so a fresh
//! connection can be brought back to the same state with
//! [`AviaryWsClient::resubscribe_all`].

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::config::WsConfig;
use super::error::WsError;
use super::messages::{ClientMessage, ServerMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// What the reader task hands to [`AviaryWsClient::next_event`].
#[derive(Debug)]
enum Event {
    Message(ServerMessage),
    /// The socket of `generation` ended, with the read error if there was one.
    Closed {
        generation: u64,
        error: Option<WsError>,
    },
}

/// WebSocket client for live comment and notification updates.
#[derive(Debug)]
pub struct AviaryWsClient {
    config: WsConfig,
    sink: Arc<Mutex<Option<WsSink>>>,
    user: Arc<RwLock<Option<String>>>,
    topics: Arc<RwLock<BTreeSet<String>>>,
    event_tx: mpsc::Sender<Event>,
    event_rx: Arc<Mutex<mpsc::Receiver<Event>>>,
    connected: Arc<RwLock<bool>>,
    generation: Arc<AtomicU64>,
}

impl AviaryWsClient {
    /// Creates a new WebSocket client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: WsConfig) -> Result<Self, WsError> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_buffer);

        Ok(Self {
            config,
            sink: Arc::new(Mutex::new(None)),
            user: Arc::new(RwLock::new(None)),
            topics: Arc::new(RwLock::new(BTreeSet::new())),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            connected: Arc::new(RwLock::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_defaults() -> Result<Self, WsError> {
        Self::new(WsConfig::default())
    }

    /// Creates a new client with the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_url(url: impl Into<String>) -> Result<Self, WsError> {
        Self::new(WsConfig::new(url))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Returns true if connected.
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Connects to the WebSocket server.
    ///
    /// Any previous connection is replaced. Remembered user and topics are
    /// kept; call [`Self::resubscribe_all`] to replay them.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(&self) -> Result<(), WsError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.config.url.as_str())
            .await
            .map_err(|e| WsError::Connection(e.to_string()))?;

        let (sink, source) = ws_stream.split();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(mut old) = self.sink.lock().await.replace(sink) {
            let _ = old.send(Message::Close(None)).await;
        }
        *self.connected.write().await = true;

        self.spawn_reader(source, generation);
        self.spawn_heartbeat(generation);

        Ok(())
    }

    /// Spawns the message reader task.
    fn spawn_reader(&self, mut source: WsSource, generation: u64) {
        let event_tx = self.event_tx.clone();
        let connected = Arc::clone(&self.connected);
        let current = Arc::clone(&self.generation);

        tokio::spawn(async move {
            let mut error = None;
            while let Some(result) = source.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        if let Ok(msg) = serde_json::from_str::<ServerMessage>(&text) {
                            if event_tx.send(Event::Message(msg)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        error = Some(WsError::from(e));
                        break;
                    }
                    _ => {}
                }
            }

            // A newer connection owns the flag once it has been established.
            if current.load(Ordering::SeqCst) == generation {
                *connected.write().await = false;
            }
            let _ = event_tx.send(Event::Closed { generation, error }).await;
        });
    }

    /// Spawns the heartbeat task.
    fn spawn_heartbeat(&self, generation: u64) {
        let sink = Arc::clone(&self.sink);
        let connected = Arc::clone(&self.connected);
        let current = Arc::clone(&self.generation);
        let interval = self.config.heartbeat_interval;

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;

                if !*connected.read().await || current.load(Ordering::SeqCst) != generation {
                    break;
                }

                if let Ok(json) = serde_json::to_string(&ClientMessage::Ping) {
                    if let Some(ref mut s) = *sink.lock().await {
                        let _ = s.send(Message::Text(json.into())).await;
                    }
                }
            }
        });
    }

    /// Sends a message to the server.
    async fn send(&self, msg: &ClientMessage) -> Result<(), WsError> {
        let json = serde_json::to_string(msg).map_err(|e| WsError::Serialization(e.to_string()))?;

        let mut sink_guard = self.sink.lock().await;
        let sink = sink_guard.as_mut().ok_or(WsError::NotConnected)?;

        sink.send(Message::Text(json.into()))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))?;

        Ok(())
    }

    /// Binds the connection to a user.
    ///
    /// The server acknowledges with [`ServerMessage::Authenticated`].
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be sent.
    pub async fn authenticate(&self, user_id: &str) -> Result<(), WsError> {
        self.send(&ClientMessage::Authenticate {
            user_id: user_id.to_string(),
        })
        .await?;

        *self.user.write().await = Some(user_id.to_string());

        Ok(())
    }

    /// Starts watching a topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be sent.
    pub async fn subscribe(&self, topic: &str) -> Result<(), WsError> {
        self.send(&ClientMessage::Subscribe {
            topic: topic.to_string(),
        })
        .await?;

        self.topics.write().await.insert(topic.to_string());

        Ok(())
    }

    /// Stops watching a topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the unsubscription cannot be sent.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), WsError> {
        self.send(&ClientMessage::Unsubscribe {
            topic: topic.to_string(),
        })
        .await?;

        self.topics.write().await.remove(topic);

        Ok(())
    }

    /// Sends a keepalive; the server answers with [`ServerMessage::Pong`].
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be sent.
    pub async fn ping(&self) -> Result<(), WsError> {
        self.send(&ClientMessage::Ping).await
    }

    /// Replays the remembered authentication and subscriptions.
    ///
    /// Used after [`Self::connect`] on a new socket, since the server keeps
    /// no state for a closed connection.
    ///
    /// # Errors
    ///
    /// Returns an error if any message cannot be sent.
    pub async fn resubscribe_all(&self) -> Result<(), WsError> {
        let user = self.user.read().await.clone();
        if let Some(user_id) = user {
            self.send(&ClientMessage::Authenticate { user_id }).await?;
        }

        let topics: Vec<String> = self.topics.read().await.iter().cloned().collect();
        for topic in topics {
            self.send(&ClientMessage::Subscribe { topic }).await?;
        }

        Ok(())
    }

    /// Returns the next event from the server.
    ///
    /// Events still queued from a closed socket are returned before the
    /// close is reported. The end of a socket that [`Self::connect`] has
    /// since replaced is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Closed`] once the current connection has closed,
    /// or [`WsError::Protocol`] if it ended with a read error.
    pub async fn next_event(&self) -> Result<ServerMessage, WsError> {
        let mut rx = self.event_rx.lock().await;
        loop {
            match rx.recv().await.ok_or(WsError::Closed)? {
                Event::Message(msg) => return Ok(msg),
                Event::Closed { generation, error } => {
                    if generation == self.generation.load(Ordering::SeqCst) {
                        return Err(error.unwrap_or(WsError::Closed));
                    }
                }
            }
        }
    }

    /// Returns the next event, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Timeout`] if nothing arrives in time.
    pub async fn next_event_timeout(&self, timeout: Duration) -> Result<ServerMessage, WsError> {
        tokio::time::timeout(timeout, self.next_event())
            .await
            .map_err(|_| WsError::Timeout)?
    }

    /// Returns the user this client authenticated as.
    pub async fn user(&self) -> Option<String> {
        self.user.read().await.clone()
    }

    /// Returns the watched topics in sorted order.
    pub async fn subscriptions(&self) -> Vec<String> {
        self.topics.read().await.iter().cloned().collect()
    }

    /// Closes the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close fails.
    pub async fn close(&self) -> Result<(), WsError> {
        *self.connected.write().await = false;

        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }

        *self.user.write().await = None;
        self.topics.write().await.clear();

        Ok(())
    }
}
