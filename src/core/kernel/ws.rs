use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::WsCodec;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::{Message, WebSocketConfig};
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Largest accepted inbound message, in bytes
    pub max_message_size: usize,
    /// Accept invalid TLS certificates and host names
    pub tls_skip_verify: bool,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3_000, // 3 seconds
            max_message_size: 16 << 20,
            tls_skip_verify: false,
        }
    }
}

/// WebSocket session trait - pure transport layer
///
/// A session owns exactly one connection. Reads suspend until a frame arrives
/// or the connection fails; there is no read timeout once connected.
#[async_trait]
pub trait WsSession<C: WsCodec>: Send + Sync {
    /// Connect to the WebSocket
    async fn connect(&mut self) -> Result<(), ExchangeError>;

    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError>;

    /// Receive the next raw message, `None` once the stream has ended
    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ExchangeError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;

    /// Codec used by [`WsSession::next_message`]
    fn codec(&self) -> &C;

    /// Send a text frame
    async fn send_text(&mut self, text: String) -> Result<(), ExchangeError> {
        self.send_raw(Message::Text(text)).await
    }

    /// Get the next decoded frame
    ///
    /// Frames the codec rejects are dropped here, so an `Err` is always a
    /// transport failure. A close frame ends the stream.
    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>> {
        loop {
            match self.next_raw().await? {
                Ok(Message::Close(_)) => return None,
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(raw) => match self.codec().decode_message(raw) {
                    Ok(Some(decoded)) => return Some(Ok(decoded)),
                    Ok(None) => {}
                    Err(e) => debug!("Dropping undecodable frame: {}", e),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Tungstenite-based WebSocket implementation
pub struct TungsteniteWs<C: WsCodec> {
    url: String,
    write: Option<SplitSink<WsStream, Message>>,
    read: Option<SplitStream<WsStream>>,
    connected: bool,
    exchange_name: String,
    codec: C,
    config: WsConfig,
    connection_stats: ConnectionStats,
}

/// Connection statistics for monitoring
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub connect_count: u32,
}

impl ConnectionStats {
    fn record_sent(&mut self, msg: &Message) {
        self.messages_sent += 1;
        self.bytes_sent += msg.len() as u64;
    }

    fn record_received(&mut self, msg: &Message) {
        self.messages_received += 1;
        self.bytes_received += msg.len() as u64;
    }
}

impl<C: WsCodec> TungsteniteWs<C> {
    /// Create a new WebSocket session with the specified codec
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to
    /// * `exchange_name` - Name of the exchange for logging/tracing
    /// * `codec` - The codec to handle message decoding
    pub fn new(url: String, exchange_name: String, codec: C) -> Self {
        Self {
            url,
            write: None,
            read: None,
            connected: false,
            exchange_name,
            codec,
            config: WsConfig::default(),
            connection_stats: ConnectionStats::default(),
        }
    }

    /// Set custom WebSocket configuration
    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get connection statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.connection_stats
    }

    fn tls_connector(&self) -> Result<Option<Connector>, ExchangeError> {
        if !self.config.tls_skip_verify {
            return Ok(None);
        }

        warn!("TLS certificate verification disabled for {}", self.url);
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("TLS setup failed: {}", e)))?;

        Ok(Some(Connector::NativeTls(tls)))
    }
}

#[async_trait]
impl<C: WsCodec> WsSession<C> for TungsteniteWs<C> {
    #[instrument(skip(self), fields(exchange = %self.exchange_name, url = %self.url))]
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);

        let connector = self.tls_connector()?;
        let connection_future = tokio::time::timeout(
            connect_timeout,
            connect_async_tls_with_config(self.url.as_str(), Some(ws_config), false, connector),
        );

        let (ws_stream, _) = connection_future
            .await
            .map_err(|_| {
                ExchangeError::ConnectionTimeout("WebSocket connection timeout".to_string())
            })?
            .map_err(|e| {
                ExchangeError::NetworkError(format!("WebSocket connection failed: {}", e))
            })?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;
        self.connection_stats.connect_count += 1;

        info!("WebSocket connected");
        Ok(())
    }

    #[instrument(skip(self, msg), fields(exchange = %self.exchange_name))]
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        if !self.connected {
            return Err(ExchangeError::NetworkError(
                "WebSocket not connected".to_string(),
            ));
        }

        let write = self.write.as_mut().ok_or_else(|| {
            ExchangeError::NetworkError("WebSocket write stream not available".to_string())
        })?;

        self.connection_stats.record_sent(&msg);
        if let Err(e) = write.send(msg).await {
            self.connected = false;
            return Err(ExchangeError::NetworkError(format!(
                "Failed to send WebSocket message: {}",
                e
            )));
        }

        Ok(())
    }

    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        if !self.connected {
            return Some(Err(ExchangeError::NetworkError(
                "WebSocket not connected".to_string(),
            )));
        }

        loop {
            let read = self.read.as_mut()?;

            match read.next().await {
                Some(Ok(message)) => {
                    self.connection_stats.record_received(&message);
                    match message {
                        Message::Ping(data) => {
                            // Auto-respond to pings at transport level
                            if let Err(e) = self.send_raw(Message::Pong(data)).await {
                                warn!("Failed to send pong response: {}", e);
                            }
                        }
                        Message::Pong(_) => {}
                        Message::Close(frame) => {
                            debug!(?frame, "WebSocket close frame received");
                            self.connected = false;
                            return Some(Ok(Message::Close(frame)));
                        }
                        other => return Some(Ok(other)),
                    }
                }
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(ExchangeError::NetworkError(format!(
                        "WebSocket error: {}",
                        e
                    ))));
                }
                None => {
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn close(&mut self) -> Result<(), ExchangeError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.connected = false;
        self.write = None;
        self.read = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn codec(&self) -> &C {
        &self.codec
    }
}
