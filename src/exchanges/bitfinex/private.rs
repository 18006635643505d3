use crate::core::errors::ExchangeError;
use crate::core::kernel::{Signer, WsSession};
use crate::exchanges::bitfinex::codec::{BitfinexPrivateCodec, PrivateFrame};
use crate::exchanges::bitfinex::types::{AuthRequest, AuthResponse, TermRecord};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Sink shared by every term on the private stream.
pub type TermSink = mpsc::Sender<TermRecord>;

/// Lifecycle of a private connection. Every failure is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivateState {
    #[default]
    Connecting,
    Authenticating,
    Streaming,
    Closed,
}

/// Authenticated account event connection.
///
/// Records are tagged by term (`ws`, `os`, `te`, ...) rather than channel id and
/// all go to one sink. A connection failure or auth rejection is reported as a
/// single error-only [`TermRecord`], after which the connection is closed.
pub struct BitfinexPrivateWs<W, S>
where
    W: WsSession<BitfinexPrivateCodec>,
    S: Signer,
{
    ws: W,
    signer: S,
    api_key: String,
    state: PrivateState,
}

impl<W, S> BitfinexPrivateWs<W, S>
where
    W: WsSession<BitfinexPrivateCodec>,
    S: Signer,
{
    pub fn new(ws: W, api_key: String, signer: S) -> Self {
        Self {
            ws,
            signer,
            api_key,
            state: PrivateState::Connecting,
        }
    }

    pub const fn state(&self) -> PrivateState {
        self.state
    }

    pub fn session(&self) -> &W {
        &self.ws
    }

    /// Build the signed auth request for a payload issued at `issued_at` (Unix seconds).
    pub fn auth_request(&self, issued_at: i64) -> Result<AuthRequest, ExchangeError> {
        let payload = AuthRequest::auth_payload(issued_at);
        let signature = self.signer.sign_payload(&payload)?;
        Ok(AuthRequest::new(self.api_key.clone(), signature, payload))
    }

    /// Dial, authenticate and forward records to `sink` until the connection ends.
    ///
    /// Returns once the stream is over; the reason, if any, was delivered to
    /// `sink` as an error record.
    #[instrument(skip(self, sink), fields(exchange = "bitfinex"))]
    pub async fn connect_private(&mut self, sink: &TermSink) {
        if let Err(e) = self.run(sink).await {
            error!("Private stream terminated: {}", e);
            if sink.send(TermRecord::from_error(&e)).await.is_err() {
                debug!("Record sink closed before error could be delivered");
            }
        }

        if let Err(e) = self.ws.close().await {
            warn!("Failed to close private stream: {}", e);
        }
        self.state = PrivateState::Closed;
    }

    async fn run(&mut self, sink: &TermSink) -> Result<(), ExchangeError> {
        self.state = PrivateState::Connecting;
        self.ws.connect().await?;

        self.state = PrivateState::Authenticating;
        let request = self.auth_request(Utc::now().timestamp())?;
        self.ws.send_text(serde_json::to_string(&request)?).await?;

        loop {
            let frame = match self.ws.next_message().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(e),
                None => return Err(ExchangeError::ConnectionClosed),
            };

            match frame {
                PrivateFrame::Event(event) => self.handle_event(&event)?,
                PrivateFrame::Terms(records) => {
                    if self.state != PrivateState::Streaming {
                        debug!(count = records.len(), "Dropping records received before auth");
                        continue;
                    }
                    for record in records {
                        if sink.send(record).await.is_err() {
                            info!("Record sink closed, stopping private stream");
                            return Ok(());
                        }
                    }
                }
                PrivateFrame::Unrecognized => debug!("Ignoring unrecognized private frame"),
            }
        }
    }

    fn handle_event(&mut self, event: &AuthResponse) -> Result<(), ExchangeError> {
        if event.is_rejection() {
            let mut reason = format!(
                "Error connecting to private web socket channel: status {}",
                event.status.as_deref().unwrap_or_default()
            );
            if let Some(msg) = event.msg.as_deref().filter(|msg| !msg.is_empty()) {
                reason.push_str(": ");
                reason.push_str(msg);
            }
            return Err(ExchangeError::AuthError(reason));
        }

        if event.is_auth() && event.is_ok() && self.state == PrivateState::Authenticating {
            info!(user_id = ?event.user_id, "Private stream authenticated");
            self.state = PrivateState::Streaming;
        } else {
            debug!(event = %event.event, "Ignoring private control event");
        }
        Ok(())
    }
}

impl<W, S> BitfinexPrivateWs<W, S>
where
    W: WsSession<BitfinexPrivateCodec> + 'static,
    S: Signer + 'static,
{
    /// Run [`connect_private`](Self::connect_private) on its own task.
    pub fn spawn(mut self, sink: TermSink) -> JoinHandle<()> {
        tokio::spawn(async move { self.connect_private(&sink).await })
    }
}
