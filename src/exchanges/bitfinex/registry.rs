use crate::core::errors::ExchangeError;
use crate::core::types::{ChannelId, RowSink};
use crate::exchanges::bitfinex::types::{EventMessage, Subscription, TopicKind};

/// Pending topic subscriptions for one public connection.
///
/// Entries are matched against `subscribed` confirmations by channel kind and
/// pair. A matched entry is bound for the rest of the connection and never
/// matched again.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<Entry>,
}

#[derive(Debug)]
struct Entry {
    subscription: Subscription,
    bound_to: Option<ChannelId>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pending entry. Duplicate topics are kept; a confirmation binds all of them.
    pub fn register(
        &mut self,
        kind: TopicKind,
        pair: impl Into<String>,
        depth: Option<u32>,
        sink: RowSink,
    ) {
        self.entries.push(Entry {
            subscription: Subscription {
                kind,
                pair: pair.into(),
                depth,
                sink,
            },
            bound_to: None,
        });
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.bound_to.is_none()).count()
    }

    /// Subscribe requests for every pending entry, in registration order.
    pub fn build_handshake_messages(&self) -> Result<Vec<String>, ExchangeError> {
        self.entries
            .iter()
            .filter(|e| e.bound_to.is_none())
            .map(|e| {
                serde_json::to_string(&e.subscription.to_request()).map_err(|err| {
                    ExchangeError::SerializationError(format!(
                        "Failed to encode subscription: {}",
                        err
                    ))
                })
            })
            .collect()
    }

    /// Resolve a confirmation against the pending entries.
    ///
    /// Returns the sinks of every pending entry naming the confirmed channel
    /// and pair, marking each as bound to the announced id. Anything other than
    /// a `subscribed` event carrying an id matches nothing.
    pub fn confirm(&mut self, event: &EventMessage) -> Vec<RowSink> {
        let Some(chan_id) = event.chan_id.filter(|_| event.is_subscribed()) else {
            return Vec::new();
        };

        self.entries
            .iter_mut()
            .filter(|e| e.bound_to.is_none() && e.subscription.matches(&event.channel, &event.pair))
            .map(|e| {
                e.bound_to = Some(chan_id);
                e.subscription.sink.clone()
            })
            .collect()
    }

    /// Channel id a topic was bound to, if confirmed.
    pub fn bound_channel(&self, kind: TopicKind, pair: &str) -> Option<ChannelId> {
        self.entries
            .iter()
            .find(|e| e.subscription.kind == kind && e.subscription.pair == pair)
            .and_then(|e| e.bound_to)
    }
}
