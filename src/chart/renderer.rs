//! Live Chart Renderer
//!
//! Owns the sample window and the two scales. Readings arrive through
//! [`LiveChart::receive_value_at`]; [`LiveChart::tick_at`] appends the held
//! reading, recomputes domains, and renders a [`Frame`].
//!
//! Each frame carries a scroll offset: how far, in pixels, the line moved
//! left since the previous frame. The viewer starts the new line that far to
//! the right and slides it into place.

use chrono::Utc;

use super::error::{ChartError, ChartResult};
use super::scale::{LinearScale, TimeScale};
use super::svg::{render_document, FrameContent};
use super::types::{Frame, Layout, Sample, TickFill, WindowSnapshot};
use super::window::{SampleWindow, DEFAULT_SPAN_MS};

/// Renderer settings
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    /// Id of the drawing surface element
    pub element_id: String,
    pub layout: Layout,
    /// Time span kept in the window
    pub span_ms: i64,
    /// Space added after the newest sample on the time axis
    pub time_padding_ms: i64,
    /// Multiplier applied to the largest reading for the value axis
    pub headroom: f64,
    /// Tick cadence and slide transition length
    pub duration_ms: u64,
    pub tick_fill: TickFill,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            element_id: "graph_1".to_string(),
            layout: Layout::default(),
            span_ms: DEFAULT_SPAN_MS,
            time_padding_ms: 15_000,
            headroom: 1.2,
            duration_ms: 250,
            tick_fill: TickFill::Hold,
        }
    }
}

impl ChartSettings {
    /// Check settings that `Layout::new` and `SampleWindow::new` don't cover
    pub fn validate(&self) -> ChartResult<()> {
        if !(self.headroom.is_finite() && self.headroom > 0.0) {
            return Err(ChartError::InvalidHeadroom(self.headroom));
        }
        if self.duration_ms == 0 {
            return Err(ChartError::InvalidDuration);
        }
        if self.span_ms <= 0 {
            return Err(ChartError::InvalidSpan(self.span_ms));
        }
        Layout::new(self.layout.width, self.layout.height, self.layout.margins)?;
        Ok(())
    }
}

/// The chart state machine: one steady "scrolling" state
pub struct LiveChart {
    settings: ChartSettings,
    window: SampleWindow,
    current_reading: f64,
    /// A reading arrived since the last tick
    fresh: bool,
    x: TimeScale,
    y: LinearScale,
    sequence: u64,
    /// Leftward shift of the line produced by the last tick
    scroll: f64,
    status: Option<String>,
}

impl LiveChart {
    /// Create a chart seeded with two zero samples just before `now`
    pub fn new(settings: ChartSettings, now: i64) -> ChartResult<Self> {
        settings.validate()?;

        let window = SampleWindow::seeded(settings.span_ms, now)?;
        let x = TimeScale::new((0.0, settings.layout.inner_width()));
        let y = LinearScale::new((settings.layout.inner_height(), 0.0));

        let mut chart = Self {
            settings,
            window,
            current_reading: 0.0,
            fresh: false,
            x,
            y,
            sequence: 0,
            scroll: 0.0,
            status: None,
        };
        chart.recompute_domains();

        Ok(chart)
    }

    /// Record a new reading at the current time
    pub fn receive_value(&mut self, value: f64) {
        self.receive_value_at(value, Utc::now().timestamp_millis());
    }

    /// Record a new reading at `now`
    pub fn receive_value_at(&mut self, value: f64, now: i64) {
        self.current_reading = value;
        self.fresh = true;
        self.update_data(now);

        tracing::debug!(
            value,
            timestamp = now,
            samples = self.window.len(),
            "Reading appended"
        );
    }

    /// Run one tick at the current time
    pub fn tick(&mut self) -> ChartResult<Frame> {
        self.tick_at(Utc::now().timestamp_millis())
    }

    /// Run one tick at `now`: refresh the window and render a frame
    pub fn tick_at(&mut self, now: i64) -> ChartResult<Frame> {
        let append = match self.settings.tick_fill {
            TickFill::Hold => true,
            TickFill::Skip => self.fresh,
        };
        if append {
            self.window.push(Sample::new(now, self.current_reading));
        }
        self.fresh = false;

        self.recompute_domains();
        let before_eviction = self.x;
        self.evict();

        // The frame is drawn against the window that remains
        self.recompute_domains();
        self.scroll = self
            .window
            .oldest()
            .map(|oldest| before_eviction.apply(oldest.timestamp - 1).max(0.0))
            .unwrap_or(0.0);
        self.sequence += 1;

        self.render(now)
    }

    /// Set or clear the status label drawn on the chart
    pub fn set_status(&mut self, status: Option<String>) {
        self.status = status;
    }

    /// Render the current state without advancing the window
    pub fn render(&self, now: i64) -> ChartResult<Frame> {
        let samples = self.window.to_vec();
        let translate_x = self.scroll;

        let svg = render_document(&FrameContent {
            element_id: &self.settings.element_id,
            layout: &self.settings.layout,
            samples: &samples,
            x: &self.x,
            y: &self.y,
            translate_x,
            status: self.status.as_deref(),
        })?;

        Ok(Frame {
            sequence: self.sequence,
            rendered_at: now,
            svg,
            translate_x,
            duration_ms: self.settings.duration_ms,
            time_domain: self.x.domain(),
            value_domain: self.y.domain(),
            sample_count: samples.len(),
            status: self.status.clone(),
        })
    }

    /// Copy of the window and derived state
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            samples: self.window.to_vec(),
            time_domain: self.x.domain(),
            value_domain: self.y.domain(),
            current_reading: self.current_reading,
            span_ms: self.window.span_ms(),
        }
    }

    pub fn settings(&self) -> &ChartSettings {
        &self.settings
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn current_reading(&self) -> f64 {
        self.current_reading
    }

    pub fn time_domain(&self) -> (i64, i64) {
        self.x.domain()
    }

    pub fn value_domain(&self) -> (f64, f64) {
        self.y.domain()
    }

    pub fn x_scale(&self) -> &TimeScale {
        &self.x
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Scroll offset of the last tick, in pixels
    pub fn scroll(&self) -> f64 {
        self.scroll
    }

    /// Append the current reading, recompute domains, evict expired samples
    fn update_data(&mut self, now: i64) {
        self.window.push(Sample::new(now, self.current_reading));
        self.recompute_domains();
        self.evict();
    }

    fn evict(&mut self) {
        let evicted = self.window.evict_expired();
        if evicted > 0 {
            tracing::trace!(evicted, "Expired samples evicted");
        }
    }

    fn recompute_domains(&mut self) {
        if let Some((min_time, max_time)) = self.window.time_extent() {
            self.x
                .set_domain((min_time, max_time + self.settings.time_padding_ms));
        }

        let max_value = self.window.max_value().unwrap_or(0.0);
        self.y.set_domain((0.0, max_value * self.settings.headroom));
    }
}
