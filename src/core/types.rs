use tokio::sync::mpsc;

/// Exchange-assigned numeric identifier carried by every public data frame.
pub type ChannelId = u64;

/// One book level, trade or ticker tick, in wire order.
pub type Row = Vec<f64>;

/// The rows decoded from a single frame, delivered to a sink as one unit.
pub type RowBatch = Vec<Row>;

/// Caller-owned delivery destination for one public topic.
///
/// The channel is bounded: a full sink suspends the reader loop that feeds it.
pub type RowSink = mpsc::Sender<RowBatch>;

/// Row prepended to every snapshot so consumers know to discard prior state.
pub const SNAPSHOT_SENTINEL: [f64; 3] = [0.0, 0.0, 0.0];

/// Default capacity for sinks created through [`row_channel`].
pub const DEFAULT_SINK_CAPACITY: usize = 1000;

/// Create a bounded row sink and its receiving half.
pub fn row_channel(capacity: usize) -> (RowSink, mpsc::Receiver<RowBatch>) {
    mpsc::channel(capacity)
}

/// Whether a batch starts with the snapshot sentinel.
pub fn is_snapshot(batch: &[Row]) -> bool {
    batch
        .first()
        .is_some_and(|row| row.as_slice() == SNAPSHOT_SENTINEL)
}
