//! Core data types for the live chart
//!
//! - `Sample`: one (timestamp, value) observation
//! - `Margins` and `Layout`: drawing surface geometry
//! - `TickFill`: what a tick appends when no fresh reading arrived
//! - `Frame` and `WindowSnapshot`: what the renderer publishes

use serde::{Deserialize, Serialize};

use super::error::{ChartError, ChartResult};

/// A single observation in the window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// The reading
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Space reserved around the plot area for the axes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 20.0,
            left: 40.0,
        }
    }
}

/// Geometry of the drawing surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    /// Declared `width` attribute of the surface
    pub width: f64,
    /// Declared `height` attribute of the surface
    pub height: f64,
    pub margins: Margins,
}

impl Layout {
    /// Create a layout, rejecting sizes that leave no plot area
    pub fn new(width: f64, height: f64, margins: Margins) -> ChartResult<Self> {
        let layout = Self {
            width,
            height,
            margins,
        };

        if !(layout.inner_width() > 0.0 && layout.inner_height() > 0.0) {
            return Err(ChartError::InvalidDimensions { width, height });
        }

        Ok(layout)
    }

    /// Width of the plot area
    pub fn inner_width(&self) -> f64 {
        self.width - self.margins.left - self.margins.right
    }

    /// Height of the plot area
    pub fn inner_height(&self) -> f64 {
        self.height - self.margins.top - self.margins.bottom
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 500.0,
            margins: Margins::default(),
        }
    }
}

/// Behaviour of a tick that finds no fresh reading
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TickFill {
    /// Append the last known reading on every tick
    #[default]
    Hold,
    /// Append only when a reading arrived since the previous tick
    Skip,
}

impl std::str::FromStr for TickFill {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hold" => Ok(TickFill::Hold),
            "skip" => Ok(TickFill::Skip),
            other => Err(ChartError::InvalidTickFill(other.to_string())),
        }
    }
}

/// One rendered tick
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Frame {
    /// Monotonic tick counter, 0 for the initial render
    pub sequence: u64,
    /// When the frame was rendered (ms since epoch)
    pub rendered_at: i64,
    /// Complete SVG document for the drawing surface
    pub svg: String,
    /// Horizontal offset the line starts from before sliding back to 0
    pub translate_x: f64,
    /// Length of the slide transition
    pub duration_ms: u64,
    pub time_domain: (i64, i64),
    pub value_domain: (f64, f64),
    pub sample_count: usize,
    /// Connection label drawn on the chart, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Read-only copy of the window and its derived state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WindowSnapshot {
    pub samples: Vec<Sample>,
    pub time_domain: (i64, i64),
    pub value_domain: (f64, f64),
    pub current_reading: f64,
    pub span_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_inner_size() {
        let layout = Layout::new(960.0, 500.0, Margins::default()).unwrap();
        assert_eq!(layout.inner_width(), 900.0);
        assert_eq!(layout.inner_height(), 460.0);
    }

    #[test]
    fn test_layout_rejects_empty_plot_area() {
        let result = Layout::new(50.0, 500.0, Margins::default());
        assert!(matches!(
            result,
            Err(ChartError::InvalidDimensions { width, .. }) if width == 50.0
        ));

        assert!(Layout::new(960.0, f64::NAN, Margins::default()).is_err());
    }

    #[test]
    fn test_tick_fill_from_str() {
        assert_eq!("hold".parse::<TickFill>().unwrap(), TickFill::Hold);
        assert_eq!("SKIP".parse::<TickFill>().unwrap(), TickFill::Skip);
        assert!("gap".parse::<TickFill>().is_err());
    }

    #[test]
    fn test_tick_fill_serde() {
        let fill: TickFill = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(fill, TickFill::Skip);
        assert_eq!(serde_json::to_string(&TickFill::Hold).unwrap(), "\"hold\"");
    }
}
