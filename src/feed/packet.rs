//! Socket.IO Packet Codec
//!
//! Text framing for Engine.IO v4 and the Socket.IO packets it carries.
//!
//! ```text
//! Engine.IO:  <type>[payload]          0 open, 1 close, 2 ping, 3 pong,
//!                                      4 message, 5 upgrade, 6 noop
//! Socket.IO:  <type>[/nsp,][ack][json] 0 connect, 1 disconnect, 2 event,
//!                                      3 ack, 4 connect_error
//!
//! 42/test1,["newnumber",{"number":42}]
//! ```

use serde::Deserialize;
use serde_json::Value;

use super::error::FeedError;

/// Default namespace
pub const ROOT_NAMESPACE: &str = "/";

/// Handshake carried by the Engine.IO open packet
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping period in milliseconds
    pub ping_interval: u64,
    /// Grace period after a missed ping in milliseconds
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// Engine.IO transport packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Parse one text frame
    pub fn decode(text: &str) -> Result<Self, FeedError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| FeedError::Protocol("empty packet".to_string()))?;
        let payload = chars.as_str();

        match kind {
            '0' => serde_json::from_str(payload)
                .map(EnginePacket::Open)
                .map_err(|e| FeedError::Protocol(format!("invalid handshake: {}", e))),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(payload.to_string())),
            '3' => Ok(EnginePacket::Pong(payload.to_string())),
            '4' => SocketPacket::decode(payload).map(EnginePacket::Message),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(FeedError::Protocol(format!(
                "unknown engine packet type '{}'",
                other
            ))),
        }
    }

    /// Serialize to a text frame
    ///
    /// Open packets are only ever sent by servers and encode as a bare `0`.
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(_) => "0".to_string(),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(packet) => format!("4{}", packet.encode()),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// Socket.IO packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
}

impl SocketPacketKind {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Connect),
            '1' => Some(Self::Disconnect),
            '2' => Some(Self::Event),
            '3' => Some(Self::Ack),
            '4' => Some(Self::ConnectError),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
        }
    }
}

/// Socket.IO packet
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    pub namespace: String,
    pub ack_id: Option<u64>,
    pub data: Option<Value>,
}

impl SocketPacket {
    /// Namespace connect request
    pub fn connect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Connect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// Namespace disconnect
    pub fn disconnect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Disconnect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// Event emission: `[name, args...]`
    pub fn event(namespace: &str, name: &str, args: Vec<Value>) -> Self {
        let mut data = vec![Value::String(name.to_string())];
        data.extend(args);

        Self {
            kind: SocketPacketKind::Event,
            namespace: namespace.to_string(),
            ack_id: None,
            data: Some(Value::Array(data)),
        }
    }

    /// Parse the part of a message after the Engine.IO type
    pub fn decode(text: &str) -> Result<Self, FeedError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .and_then(SocketPacketKind::from_char)
            .ok_or_else(|| FeedError::Protocol(format!("invalid socket packet: {:?}", text)))?;
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(end) => {
                    let namespace = &rest[..end];
                    rest = &rest[end + 1..];
                    namespace.to_string()
                }
                None => {
                    let namespace = rest.to_string();
                    rest = "";
                    namespace
                }
            }
        } else {
            ROOT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse()
                .map_err(|_| FeedError::Protocol(format!("invalid ack id in {:?}", text)))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(rest)
                    .map_err(|e| FeedError::Protocol(format!("invalid packet data: {}", e)))?,
            )
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }

    /// Serialize without the Engine.IO type prefix
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());

        if self.namespace != ROOT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }

        out
    }

    /// Event name and arguments, for event packets
    pub fn as_event(&self) -> Option<(&str, &[Value])> {
        if self.kind != SocketPacketKind::Event {
            return None;
        }

        let items = self.data.as_ref()?.as_array()?;
        let (name, args) = items.split_first()?;
        Some((name.as_str()?, args))
    }

    /// Error message of a connect_error packet
    pub fn error_message(&self) -> String {
        match &self.data {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("connection refused")
                .to_string(),
            Some(Value::String(message)) => message.clone(),
            _ => "connection refused".to_string(),
        }
    }
}
