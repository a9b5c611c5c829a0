//! Intensity scaling.
//!
//! Linear contrast stretches that map a chosen input range onto `0..=new_max`.
//! Values outside the range are left outside it; the encoder clamps them.

use super::Image;

/// Lower percentile used when converting microscope images for display.
pub const DEFAULT_LOW_PERCENTILE: f64 = 0.05;

/// Upper percentile used when converting microscope images for display.
pub const DEFAULT_HIGH_PERCENTILE: f64 = 99.95;

impl Image {
    /// Smallest and largest sample. An empty image reports `(0.0, 0.0)`.
    pub fn min_max(&self) -> (f64, f64) {
        if self.values.is_empty() {
            return (0.0, 0.0);
        }
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            })
    }

    /// Map min to 0 and max to 255.
    pub fn auto_scale(&mut self) {
        self.auto_scale_to(255.0);
    }

    /// Map min to 0 and max to `new_max`.
    pub fn auto_scale_to(&mut self, new_max: f64) {
        let (min, max) = self.min_max();
        self.stretch(min, max, new_max);
    }

    /// Sample values at the `low` and `high` percentiles (0 to 100).
    ///
    /// The index into the sorted samples is `floor(count * percent / 100)`,
    /// clamped to the last sample, so `(0.0, 100.0)` gives the min and max.
    pub fn percentiles(&self, low: f64, high: f64) -> (f64, f64) {
        if self.values.is_empty() {
            return (0.0, 0.0);
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);

        let at = |percent: f64| {
            let fraction = (percent / 100.0).clamp(0.0, 1.0);
            let index = (sorted.len() as f64 * fraction).floor() as usize;
            sorted[index.min(sorted.len() - 1)]
        };
        (at(low), at(high))
    }

    /// Map the `low` percentile to 0 and the `high` percentile to 255.
    pub fn auto_scale_percentile(&mut self, low: f64, high: f64) {
        let (lo, hi) = self.percentiles(low, high);
        self.stretch(lo, hi, 255.0);
    }

    /// A flat range maps every sample to 0.
    fn stretch(&mut self, lo: f64, hi: f64, new_max: f64) {
        let span = hi - lo;
        if span == 0.0 || !span.is_finite() {
            self.values.iter_mut().for_each(|v| *v = 0.0);
            return;
        }
        let scale = new_max / span;
        for v in &mut self.values {
            *v = (*v - lo) * scale;
        }
    }
}
