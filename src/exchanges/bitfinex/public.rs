use crate::core::errors::ExchangeError;
use crate::core::kernel::WsSession;
use crate::core::types::RowSink;
use crate::exchanges::bitfinex::codec::{BitfinexCodec, DataFrame, PublicFrame};
use crate::exchanges::bitfinex::registry::SubscriptionRegistry;
use crate::exchanges::bitfinex::router::{ChannelRouter, Delivery};
use crate::exchanges::bitfinex::types::{EventMessage, TopicKind};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Public market data connection.
///
/// Register topics with [`add_subscribe`](Self::add_subscribe), then call
/// [`subscribe`](Self::subscribe) to send the handshake and run the reader
/// loop. Frames are dispatched in arrival order on the task running the loop;
/// a full sink stalls every topic on this connection until it drains.
pub struct BitfinexPublicWs<W: WsSession<BitfinexCodec>> {
    ws: W,
    registry: SubscriptionRegistry,
    router: ChannelRouter,
}

impl<W: WsSession<BitfinexCodec>> BitfinexPublicWs<W> {
    pub fn new(ws: W) -> Self {
        Self {
            ws,
            registry: SubscriptionRegistry::new(),
            router: ChannelRouter::new(),
        }
    }

    pub async fn connect(&mut self) -> Result<(), ExchangeError> {
        self.ws.connect().await
    }

    pub async fn close(&mut self) -> Result<(), ExchangeError> {
        self.ws.close().await
    }

    /// Queue a topic for the next [`subscribe`](Self::subscribe) call.
    pub fn add_subscribe(
        &mut self,
        kind: TopicKind,
        pair: impl Into<String>,
        depth: Option<u32>,
        sink: RowSink,
    ) {
        self.registry.register(kind, pair, depth, sink);
    }

    pub fn clear_subscriptions(&mut self) {
        self.registry.clear();
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn router(&self) -> &ChannelRouter {
        &self.router
    }

    pub fn session(&self) -> &W {
        &self.ws
    }

    /// Send one subscribe request per pending topic.
    pub async fn send_subscribe_messages(&mut self) -> Result<(), ExchangeError> {
        for message in self.registry.build_handshake_messages()? {
            self.ws.send_text(message).await?;
        }
        Ok(())
    }

    /// Subscribe to every registered topic and stream until the connection ends.
    ///
    /// Only returns with an error: the transport failure that ended the loop,
    /// or [`ExchangeError::ConnectionClosed`] when the peer closed the stream.
    #[instrument(skip(self), fields(exchange = "bitfinex", topics = self.registry.len()))]
    pub async fn subscribe(&mut self) -> Result<(), ExchangeError> {
        self.send_subscribe_messages().await?;

        loop {
            match self.ws.next_message().await {
                Some(Ok(frame)) => self.dispatch(frame).await,
                Some(Err(e)) => {
                    error!("Public stream failed: {}", e);
                    return Err(e);
                }
                None => {
                    info!("Public stream closed by peer");
                    return Err(ExchangeError::ConnectionClosed);
                }
            }
        }
    }

    /// Handle one classified frame.
    pub async fn dispatch(&mut self, frame: PublicFrame) {
        match frame {
            PublicFrame::Event(event) => self.handle_event(&event),
            PublicFrame::Data(data) => self.handle_data(data).await,
        }
    }

    fn handle_event(&mut self, event: &EventMessage) {
        if !event.is_subscribed() {
            if event.event == "error" {
                warn!(
                    channel = %event.channel,
                    pair = %event.pair,
                    code = ?event.code,
                    "Exchange error event: {}",
                    event.msg.as_deref().unwrap_or_default()
                );
            } else {
                debug!(event = %event.event, "Ignoring control event");
            }
            return;
        }

        let Some(chan_id) = event.chan_id else {
            debug!("Subscribed event without channel id");
            return;
        };

        if self.router.is_bound(chan_id) {
            warn!(chan_id, "Channel id already bound, ignoring confirmation");
            return;
        }

        let sinks = self.registry.confirm(event);
        if sinks.is_empty() {
            debug!(
                chan_id,
                channel = %event.channel,
                pair = %event.pair,
                "Confirmation matches no pending subscription"
            );
            return;
        }

        let count = sinks.len();
        if self.router.bind(chan_id, sinks) {
            info!(
                chan_id,
                channel = %event.channel,
                pair = %event.pair,
                sinks = count,
                "Channel bound"
            );
        }
    }

    async fn handle_data(&mut self, data: DataFrame) {
        let Some((chan_id, batch)) = data.into_delivery() else {
            debug!("Dropping unrecognized data frame");
            return;
        };

        match self.router.deliver(chan_id, batch).await {
            Delivery::Delivered(_) => {}
            Delivery::Unbound => warn!(chan_id, "Data for unbound channel dropped"),
            Delivery::Closed => warn!(chan_id, "All sinks closed, dropping further data"),
            Delivery::Detached => debug!(chan_id, "Data for channel without open sinks dropped"),
        }
    }
}

impl<W> BitfinexPublicWs<W>
where
    W: WsSession<BitfinexCodec> + 'static,
{
    /// Run [`subscribe`](Self::subscribe) on its own task.
    ///
    /// Aborting the handle drops the connection and is the only way to stop
    /// the loop early.
    pub fn spawn(mut self) -> JoinHandle<Result<(), ExchangeError>> {
        tokio::spawn(async move { self.subscribe().await })
    }
}
