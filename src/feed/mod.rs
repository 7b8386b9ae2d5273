//! Socket.IO Feed
//!
//! Subscribes to the upstream reading stream.
//!
//! ## Components
//!
//! - **packet**: Engine.IO / Socket.IO text packet codec
//! - **client**: Connection loop with handshake, heartbeat and reconnect
//! - **event**: Reading payload extraction
//! - **state**: Connection state published to the chart and viewers
//!
//! ## Wire flow
//!
//! ```text
//! ws://host:port/socket.io/?EIO=4&transport=websocket
//!   <- 0{"sid":...,"pingInterval":25000,...}
//!   -> 40/test1,
//!   <- 40/test1,{"sid":...}
//!   <- 42/test1,["newnumber",{"number":42}]
//!   <- 2   -> 3
//! ```

mod backoff;
mod client;
mod error;
mod event;
mod packet;
mod state;

pub use backoff::Backoff;
pub use client::FeedClient;
pub use error::{FeedError, FeedResult};
pub use event::{parse_reading, FeedEvent, READING_FIELD};
pub use packet::{EnginePacket, Handshake, SocketPacket, SocketPacketKind, ROOT_NAMESPACE};
pub use state::ConnectionState;
