//! Viewer WebSocket Streaming
//!
//! Pushes rendered frames and feed connection changes to viewer pages.
//!
//! ## Topics
//!
//! - `frames` - every rendered tick
//! - `status` - feed connection state changes
//!
//! Subscribing to a topic immediately delivers its current value. A viewer
//! that falls behind skips straight to the newest frame.
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8082/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['frames', 'status']}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'frame') draw(msg.svg, msg.translate_x, msg.duration_ms);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError, ViewerChannels, OUTBOX_CAPACITY};
pub use messages::{ClientMessage, ServerMessage, WsEvent, FRAMES_TOPIC, STATUS_TOPIC};
