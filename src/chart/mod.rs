//! Live Strip Chart
//!
//! A five-minute sliding window of readings drawn as a line against a
//! time axis and a value axis.
//!
//! ## Pipeline
//!
//! ```text
//! FeedEvent ──► LiveChart::receive_value_at ──► SampleWindow
//!                                                   │
//! interval ───► LiveChart::tick_at ──► scales ──► plotters svg ──► Frame
//! ```
//!
//! [`ChartService`] runs the pipeline as a task and publishes each frame
//! to viewers.

mod error;
mod renderer;
mod scale;
mod service;
mod svg;
mod types;
mod window;

pub use error::{ChartError, ChartResult};
pub use renderer::{ChartSettings, LiveChart};
pub use scale::{LinearScale, TimeScale};
pub use service::{ChartService, ChartView};
pub use svg::{
    fmt_num, format_time_label, format_value_label, render_document, FrameContent, TIME_LABELS,
    VALUE_LABELS,
};
pub use types::{Frame, Layout, Margins, Sample, TickFill, WindowSnapshot};
pub use window::{SampleWindow, DEFAULT_SPAN_MS};
