/// Transport kernel shared by the public and private streams
///
/// The kernel holds only transport concerns and generic interfaces:
///
/// - `WsSession`: one bidirectional text-message connection
/// - `TungsteniteWs`: `tokio-tungstenite` implementation with a TLS verification toggle
/// - `WsCodec`: raw message → typed frame classification
/// - `Signer`: pluggable payload signing for authenticated connections
///
/// Exchange-specific logic lives under `exchanges`.
///
/// ## WebSocket Integration with Codec
/// ```rust,no_run
/// use bfx_stream::core::kernel::*;
/// use bfx_stream::exchanges::bitfinex::codec::{BitfinexCodec, PublicFrame};
///
/// # async fn websocket_example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut ws = TungsteniteWs::new(
///     "wss://api.bitfinex.com/ws".to_string(),
///     "bitfinex".to_string(),
///     BitfinexCodec,
/// );
/// ws.connect().await?;
///
/// while let Some(frame) = ws.next_message().await {
///     match frame? {
///         PublicFrame::Event(event) => println!("event: {}", event.event),
///         PublicFrame::Data(data) => println!("data: {:?}", data),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use codec::WsCodec;
pub use signer::Signer;
pub use ws::{ConnectionStats, TungsteniteWs, WsConfig, WsSession};
