use crate::core::types::{ChannelId, RowBatch, RowSink};
use std::collections::HashMap;
use tracing::warn;

/// Sinks bound to one exchange channel id.
#[derive(Debug)]
pub struct ChannelBinding {
    pub chan_id: ChannelId,
    sinks: Vec<RowSink>,
}

impl ChannelBinding {
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

/// Outcome of routing one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Delivered to this many sinks
    Delivered(usize),
    /// No binding exists for the channel id; the batch was dropped
    Unbound,
    /// The last open sink closed during this delivery
    Closed,
    /// The binding outlived all of its sinks; the batch was dropped
    Detached,
}

/// Channel id → sink table for one connection.
///
/// Owned by the reader loop; never shared across connections. Bindings last as
/// long as the router, even once every sink is gone.
#[derive(Debug, Default)]
pub struct ChannelRouter {
    bindings: HashMap<ChannelId, ChannelBinding>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `sinks` to `chan_id`.
    ///
    /// Returns `false` and leaves the table untouched if the id is already
    /// bound or `sinks` is empty.
    pub fn bind(&mut self, chan_id: ChannelId, sinks: Vec<RowSink>) -> bool {
        if sinks.is_empty() {
            return false;
        }
        if self.bindings.contains_key(&chan_id) {
            warn!(chan_id, "Channel id already bound, ignoring confirmation");
            return false;
        }
        self.bindings
            .insert(chan_id, ChannelBinding { chan_id, sinks });
        true
    }

    pub fn binding(&self, chan_id: ChannelId) -> Option<&ChannelBinding> {
        self.bindings.get(&chan_id)
    }

    pub fn is_bound(&self, chan_id: ChannelId) -> bool {
        self.bindings.contains_key(&chan_id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Hand `batch` to every sink bound to `chan_id`, in binding order.
    ///
    /// Waits while a sink is full. Sinks whose receiver has gone away are
    /// dropped from the binding.
    pub async fn deliver(&mut self, chan_id: ChannelId, mut batch: RowBatch) -> Delivery {
        let Some(binding) = self.bindings.get_mut(&chan_id) else {
            return Delivery::Unbound;
        };
        if binding.sinks.is_empty() {
            return Delivery::Detached;
        }

        let sinks = std::mem::take(&mut binding.sinks);
        let last = sinks.len().saturating_sub(1);
        let mut open = Vec::with_capacity(sinks.len());

        for (index, sink) in sinks.into_iter().enumerate() {
            let rows = if index == last {
                std::mem::take(&mut batch)
            } else {
                batch.clone()
            };
            if sink.send(rows).await.is_ok() {
                open.push(sink);
            } else {
                warn!(chan_id, "Sink closed, dropping it from the binding");
            }
        }

        let delivered = open.len();
        binding.sinks = open;
        if delivered == 0 {
            return Delivery::Closed;
        }
        Delivery::Delivered(delivered)
    }
}
