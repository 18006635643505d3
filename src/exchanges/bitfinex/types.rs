use crate::core::types::{ChannelId, RowSink};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Trading pairs available on the public stream
pub mod pairs {
    pub const BTCUSD: &str = "BTCUSD";
    pub const LTCUSD: &str = "LTCUSD";
    pub const LTCBTC: &str = "LTCBTC";
    pub const ETHUSD: &str = "ETHUSD";
    pub const ETHBTC: &str = "ETHBTC";
    pub const ETCUSD: &str = "ETCUSD";
    pub const ETCBTC: &str = "ETCBTC";
    pub const BFXUSD: &str = "BFXUSD";
    pub const BFXBTC: &str = "BFXBTC";
    pub const ZECUSD: &str = "ZECUSD";
    pub const ZECBTC: &str = "ZECBTC";
    pub const XMRUSD: &str = "XMRUSD";
    pub const XMRBTC: &str = "XMRBTC";
    pub const RRTUSD: &str = "RRTUSD";
    pub const RRTBTC: &str = "RRTBTC";
}

/// Channel id as carried on the wire: an unsigned integer, or a float with no
/// fractional part. Anything else is not a channel id.
pub fn channel_id(value: &Value) -> Option<ChannelId> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|id| *id >= 0.0 && id.fract() == 0.0)
            .map(|id| id as ChannelId)
    })
}

/// `chanId` decoder for control messages. A value that is not a channel id
/// decodes to `None` instead of failing the whole message.
fn lenient_channel_id<'de, D>(deserializer: D) -> Result<Option<ChannelId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(channel_id))
}

/// Public channel kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Book,
    Trades,
    Ticker,
}

impl TopicKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Trades => "trades",
            Self::Ticker => "ticker",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A topic the caller wants delivered to `sink`, pending confirmation.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub kind: TopicKind,
    pub pair: String,
    pub depth: Option<u32>,
    pub sink: RowSink,
}

impl Subscription {
    pub fn matches(&self, channel: &str, pair: &str) -> bool {
        self.kind.as_str() == channel && self.pair == pair
    }

    pub fn to_request(&self) -> SubscribeMsg {
        SubscribeMsg {
            event: "subscribe".to_string(),
            channel: self.kind.as_str().to_string(),
            pair: self.pair.clone(),
            len: self.depth.map(|depth| depth.to_string()),
            chan_id: None,
        }
    }
}

/// Subscribe request as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeMsg {
    pub event: String,
    pub channel: String,
    pub pair: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<String>,
    #[serde(rename = "chanId", default, skip_serializing_if = "Option::is_none")]
    pub chan_id: Option<ChannelId>,
}

/// Inbound control message on the public stream (`subscribed`, `info`, `error`, ...).
///
/// Every field is optional on the wire; absent fields decode to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventMessage {
    pub event: String,
    pub channel: String,
    pub pair: String,
    #[serde(rename = "chanId", default, deserialize_with = "lenient_channel_id")]
    pub chan_id: Option<ChannelId>,
    pub msg: Option<String>,
    pub code: Option<i64>,
}

impl EventMessage {
    pub fn is_subscribed(&self) -> bool {
        self.event == "subscribed"
    }
}

/// Auth request for the private stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    pub event: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "authSig")]
    pub auth_sig: String,
    #[serde(rename = "authPayload")]
    pub auth_payload: String,
}

impl AuthRequest {
    /// Payload prefix; the issue time in Unix seconds follows it.
    pub const PAYLOAD_TAG: &'static str = "AUTH";

    pub fn auth_payload(issued_at: i64) -> String {
        format!("{}{}", Self::PAYLOAD_TAG, issued_at)
    }

    pub fn new(api_key: String, auth_sig: String, auth_payload: String) -> Self {
        Self {
            event: "auth".to_string(),
            api_key,
            auth_sig,
            auth_payload,
        }
    }
}

/// Control message on the private stream; the auth confirmation among others.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthResponse {
    pub event: String,
    pub status: Option<String>,
    #[serde(rename = "chanId", default, deserialize_with = "lenient_channel_id")]
    pub chan_id: Option<ChannelId>,
    #[serde(rename = "userId")]
    pub user_id: Option<f64>,
    pub msg: Option<String>,
}

impl AuthResponse {
    pub fn is_auth(&self) -> bool {
        self.event == "auth"
    }

    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("OK")
    }

    /// An auth response carrying a status other than `OK`.
    pub fn is_rejection(&self) -> bool {
        self.is_auth() && self.status.is_some() && !self.is_ok()
    }
}

/// One record from the private stream.
///
/// `term` identifies the record type, e.g. `ws` (wallet snapshot), `wu`
/// (wallet update), `os` (order snapshot), `oc` (order cancel). The field
/// layout of `data` differs per term:
///
/// - `ws`: `["exchange","BTC",0.01410829,0]`
/// - `oc`: `[0,"BTCUSD",0,-0.01,"","CANCELED",270,0,"2015-10-15T11:26:13Z",0]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub term: String,
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TermRecord {
    pub fn new(term: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            term: term.into(),
            data,
            error: None,
        }
    }

    /// Record carrying only an error, emitted when the private stream ends.
    pub fn from_error(error: impl fmt::Display) -> Self {
        Self {
            term: String::new(),
            data: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.as_ref().is_some_and(|e| !e.is_empty())
    }
}
