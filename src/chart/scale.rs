//! Coordinate Scales
//!
//! Continuous mappings from data space to pixel space. `LinearScale` maps
//! readings to y, `TimeScale` maps millisecond timestamps to x. The renderer
//! keeps its domains here and derives the scroll offset from them.

/// Affine map from a domain interval onto a range interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    /// Create a scale with a unit domain
    pub fn new(range: (f64, f64)) -> Self {
        Self {
            domain: (0.0, 1.0),
            range,
        }
    }

    pub fn with_domain(mut self, domain: (f64, f64)) -> Self {
        self.domain = domain;
        self
    }

    pub fn set_domain(&mut self, domain: (f64, f64)) {
        self.domain = domain;
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Map a domain value to the range
    ///
    /// A degenerate domain maps everything to the middle of the range.
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;

        if d0 == d1 {
            return (r0 + r1) / 2.0;
        }

        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Map from millisecond timestamps to pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    inner: LinearScale,
}

impl TimeScale {
    pub fn new(range: (f64, f64)) -> Self {
        Self {
            inner: LinearScale::new(range),
        }
    }

    pub fn set_domain(&mut self, domain: (i64, i64)) {
        self.inner.set_domain((domain.0 as f64, domain.1 as f64));
    }

    pub fn domain(&self) -> (i64, i64) {
        let (d0, d1) = self.inner.domain();
        (d0 as i64, d1 as i64)
    }

    pub fn range(&self) -> (f64, f64) {
        self.inner.range()
    }

    pub fn apply(&self, timestamp: i64) -> f64 {
        self.inner.apply(timestamp as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_apply() {
        let scale = LinearScale::new((460.0, 0.0)).with_domain((0.0, 120.0));
        assert_eq!(scale.apply(0.0), 460.0);
        assert_eq!(scale.apply(120.0), 0.0);
        assert_eq!(scale.apply(60.0), 230.0);
    }

    #[test]
    fn test_linear_degenerate_domain() {
        let scale = LinearScale::new((460.0, 0.0)).with_domain((0.0, 0.0));
        assert_eq!(scale.apply(0.0), 230.0);
        assert_eq!(scale.apply(99.0), 230.0);
    }

    #[test]
    fn test_time_scale_apply() {
        let mut scale = TimeScale::new((0.0, 900.0));
        scale.set_domain((1_000, 10_000));
        assert_eq!(scale.apply(1_000), 0.0);
        assert_eq!(scale.apply(10_000), 900.0);
        assert_eq!(scale.domain(), (1_000, 10_000));
        assert_eq!(scale.range(), (0.0, 900.0));
    }
}
