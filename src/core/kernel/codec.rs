use crate::core::errors::ExchangeError;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for turning raw WebSocket messages into exchange-specific frames
///
/// Each connection flavour implements this trait to classify its own wire
/// format. Control messages (ping, pong, close) are handled at the transport
/// level and never reach the codec.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing classified frames from this connection
    type Message: Send + Sync;

    /// Decode a raw WebSocket message into a typed frame
    ///
    /// # Returns
    /// - `Ok(Some(frame))` - Successfully classified frame
    /// - `Ok(None)` - Message was ignored/filtered by codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError>;
}
