use crate::core::errors::ExchangeError;
use crate::core::kernel::WsCodec;
use crate::core::types::{ChannelId, Row, RowBatch, SNAPSHOT_SENTINEL};
use crate::exchanges::bitfinex::types::{channel_id, AuthResponse, EventMessage, TermRecord};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// Keyword that marks control frames on the public stream.
const EVENT_KEYWORD: &str = "event";

/// Classified frame from the public stream
#[derive(Debug, Clone, PartialEq)]
pub enum PublicFrame {
    Event(EventMessage),
    Data(DataFrame),
}

/// Shape of a public data frame.
///
/// The exchange multiplexes several payload layouts onto the same frame type
/// with no discriminant field, so the variant is decided from the JSON shape
/// alone by [`DataFrame::classify`].
#[derive(Debug, Clone, PartialEq)]
pub enum DataFrame {
    /// `[chanId, f1, f2, ...]` or `[chanId, [f1, f2, ...]]`: one incremental row
    Update { chan_id: ChannelId, row: Row },
    /// `[chanId, tag, seq, f1, f2, ...]`: compact tuple, fields after index 2
    CompactTuple { chan_id: ChannelId, row: Row },
    /// `[chanId, [[...], [...]]]`: full state for the channel
    Snapshot { chan_id: ChannelId, rows: Vec<Row> },
    Unrecognized,
}

impl DataFrame {
    /// Classify an untyped frame. Exactly one variant applies to any input.
    pub fn classify(value: &Value) -> Self {
        let Some(items) = value.as_array() else {
            return Self::Unrecognized;
        };
        let Some(chan_id) = items.first().and_then(channel_id) else {
            return Self::Unrecognized;
        };
        let fields = &items[1..];

        if fields.is_empty() {
            return Self::Unrecognized;
        }

        if let Some(row) = numeric_row(fields) {
            return Self::Update { chan_id, row };
        }

        if items.len() > 3 {
            return numeric_row(&items[3..])
                .map_or(Self::Unrecognized, |row| Self::CompactTuple { chan_id, row });
        }

        // nested payloads stand alone after the channel id
        let Some(payload) = fields[0].as_array().filter(|_| fields.len() == 1) else {
            return Self::Unrecognized;
        };

        if payload.iter().all(Value::is_array) {
            return payload
                .iter()
                .map(|entry| entry.as_array().and_then(|fields| numeric_row(fields)))
                .collect::<Option<Vec<_>>>()
                .map_or(Self::Unrecognized, |rows| Self::Snapshot { chan_id, rows });
        }

        numeric_row(payload).map_or(Self::Unrecognized, |row| Self::Update { chan_id, row })
    }

    pub const fn chan_id(&self) -> Option<ChannelId> {
        match self {
            Self::Update { chan_id, .. }
            | Self::CompactTuple { chan_id, .. }
            | Self::Snapshot { chan_id, .. } => Some(*chan_id),
            Self::Unrecognized => None,
        }
    }

    /// Rows to hand to the channel's sink. Snapshots lead with the sentinel row.
    pub fn into_delivery(self) -> Option<(ChannelId, RowBatch)> {
        match self {
            Self::Update { chan_id, row } | Self::CompactTuple { chan_id, row } => {
                Some((chan_id, vec![row]))
            }
            Self::Snapshot { chan_id, rows } => {
                let mut batch = Vec::with_capacity(rows.len() + 1);
                batch.push(SNAPSHOT_SENTINEL.to_vec());
                batch.extend(rows);
                Some((chan_id, batch))
            }
            Self::Unrecognized => None,
        }
    }
}

fn numeric_row(values: &[Value]) -> Option<Row> {
    values.iter().map(Value::as_f64).collect()
}

fn frame_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text),
        Message::Binary(data) => String::from_utf8(data).ok(),
        _ => None,
    }
}

/// Public stream codec
pub struct BitfinexCodec;

impl BitfinexCodec {
    /// Classify one text frame.
    pub fn classify(text: &str) -> Option<PublicFrame> {
        if text.contains(EVENT_KEYWORD) {
            return match serde_json::from_str::<Value>(text) {
                Ok(value) if value.is_object() => serde_json::from_value::<EventMessage>(value)
                    .map_err(|e| debug!("Dropping unparseable event frame: {}", e))
                    .ok()
                    .map(PublicFrame::Event),
                _ => {
                    debug!("Dropping malformed event frame: {}", text);
                    None
                }
            };
        }

        match serde_json::from_str::<Value>(text) {
            Ok(value) => Some(PublicFrame::Data(DataFrame::classify(&value))),
            Err(e) => {
                debug!("Dropping malformed data frame: {}", e);
                None
            }
        }
    }
}

impl WsCodec for BitfinexCodec {
    type Message = PublicFrame;

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        Ok(frame_text(message).and_then(|text| Self::classify(&text)))
    }
}

/// Classified frame from the private stream
#[derive(Debug, Clone, PartialEq)]
pub enum PrivateFrame {
    Event(AuthResponse),
    Terms(Vec<TermRecord>),
    Unrecognized,
}

/// Private stream codec
pub struct BitfinexPrivateCodec;

impl BitfinexPrivateCodec {
    /// Classify one text frame. Control objects take precedence over data lists.
    pub fn classify(text: &str) -> Option<PrivateFrame> {
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(e) => {
                debug!("Dropping malformed private frame: {}", e);
                return None;
            }
        };

        if value.is_object() {
            return serde_json::from_value::<AuthResponse>(value)
                .map_err(|e| debug!("Dropping unparseable private event: {}", e))
                .ok()
                .map(PrivateFrame::Event);
        }

        Some(Self::classify_terms(&value))
    }

    /// Decode `[0, term, payload]` into records.
    ///
    /// A list-of-lists payload yields one record per inner list, a flat payload
    /// yields one record, an empty payload yields none.
    pub fn classify_terms(value: &Value) -> PrivateFrame {
        let Some(items) = value.as_array().filter(|items| items.len() >= 3) else {
            return PrivateFrame::Unrecognized;
        };
        let (Some(term), Some(payload)) = (items[1].as_str(), items[2].as_array()) else {
            return PrivateFrame::Unrecognized;
        };

        let records = match payload.first() {
            None => Vec::new(),
            Some(first) if first.is_array() => {
                let Some(records) = payload
                    .iter()
                    .map(|entry| {
                        entry
                            .as_array()
                            .map(|fields| TermRecord::new(term, fields.clone()))
                    })
                    .collect::<Option<Vec<_>>>()
                else {
                    debug!(term, "Dropping payload mixing lists and scalars");
                    return PrivateFrame::Unrecognized;
                };
                records
            }
            Some(_) => vec![TermRecord::new(term, payload.clone())],
        };

        PrivateFrame::Terms(records)
    }
}

impl WsCodec for BitfinexPrivateCodec {
    type Message = PrivateFrame;

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        Ok(frame_text(message).and_then(|text| Self::classify(&text)))
    }
}
