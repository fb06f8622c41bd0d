//! Tick boundaries and bucket assignment.

use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::palette::{self, Color};

/// How tick boundaries are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScaleKind {
    /// Roughly geometric spacing from 1 up to the maximum.
    Logarithmic,
    /// Equal-width buckets from 0.
    Linear,
}

/// Where a value falls on a scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum Bucket {
    /// No value for this region and date.
    NoData,
    /// Below the first tick.
    Underflow,
    /// Inside bucket `i`, meaning `ticks[i] <= v < ticks[i + 1]`.
    Class(usize),
    /// At or above the last tick.
    Overflow,
}

/// One legend row. Open ends are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// Inclusive lower bound.
    pub lower: Option<u64>,
    /// Exclusive upper bound.
    pub upper: Option<u64>,
    /// Fill color.
    pub color: Color,
    /// Human-readable range.
    pub label: String,
}

/// A discrete classification of non-negative counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationScale {
    kind: ScaleKind,
    requested: usize,
    ticks: Vec<u64>,
    colors: Vec<Color>,
    underflow: Color,
    overflow: Color,
    no_data: Color,
}

impl ClassificationScale {
    /// Builds an exponential scale whose last tick lands near `maxval`.
    ///
    /// `base = exp(ln(maxval) / n)`; candidate ticks are `floor(base^i)` for
    /// `i` in `0..=n + 1`, deduplicated and truncated to `n + 1` values.
    /// When `maxval` is small relative to `n` fewer ticks survive and the
    /// scale is coarser than requested. `maxval` below 1 is treated as 1.
    #[must_use]
    pub fn logarithmic(maxval: f64, n: usize) -> Self {
        let n = n.max(1);
        let maxval = if maxval.is_finite() { maxval.max(1.0) } else { 1.0 };
        #[allow(clippy::cast_precision_loss)]
        let base = (maxval.ln() / n as f64).exp();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut ticks: Vec<u64> = (0..=n + 1)
            .map(|i| base.powf(i as f64).floor() as u64)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        ticks.truncate(n + 1);

        if ticks.len() < n + 1 {
            log::debug!(
                "Degraded scale for max {maxval}: {} ticks instead of {}",
                ticks.len(),
                n + 1
            );
        }

        let colors = palette::bucket_colors(ticks.len().saturating_sub(1));
        Self::new(ScaleKind::Logarithmic, n, ticks, colors)
    }

    /// Builds `n` equal-width buckets starting at 0.
    ///
    /// The bucket width is `ceil(maxval / n)`, at least 1. The first bucket
    /// is white, the rest follow the cool-to-warm ramp.
    #[must_use]
    pub fn linear(maxval: f64, n: usize) -> Self {
        let n = n.max(1);
        let maxval = if maxval.is_finite() { maxval.max(1.0) } else { 1.0 };
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let step = ((maxval / n as f64).ceil() as u64).max(1);
        let ticks = (0..=n as u64).map(|i| i * step).collect();

        let mut colors = vec![Color::WHITE];
        colors.extend(palette::bucket_colors(n - 1));
        Self::new(ScaleKind::Linear, n, ticks, colors)
    }

    const fn new(kind: ScaleKind, requested: usize, ticks: Vec<u64>, colors: Vec<Color>) -> Self {
        Self {
            kind,
            requested,
            ticks,
            colors,
            underflow: Color::WHITE,
            overflow: Color::BLACK,
            no_data: Color::LIGHT_GRAY,
        }
    }

    /// Tick spacing.
    #[must_use]
    pub const fn kind(&self) -> ScaleKind {
        self.kind
    }

    /// Strictly increasing tick boundaries.
    #[must_use]
    pub fn ticks(&self) -> &[u64] {
        &self.ticks
    }

    /// Number of inter-tick buckets actually produced.
    #[must_use]
    pub fn buckets(&self) -> usize {
        self.ticks.len().saturating_sub(1)
    }

    /// Returns `true` if fewer buckets than requested were produced.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.buckets() < self.requested
    }

    /// Fill colors, one per bucket.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Classifies a value. `None` means no data.
    #[must_use]
    pub fn bucket_for(&self, value: Option<u64>) -> Bucket {
        let Some(v) = value else {
            return Bucket::NoData;
        };
        let (Some(&first), Some(&last)) = (self.ticks.first(), self.ticks.last()) else {
            return Bucket::NoData;
        };
        if v < first {
            Bucket::Underflow
        } else if v >= last {
            Bucket::Overflow
        } else {
            Bucket::Class(self.ticks.partition_point(|&t| t <= v) - 1)
        }
    }

    /// Fill color for a bucket.
    #[must_use]
    pub fn color(&self, bucket: Bucket) -> Color {
        match bucket {
            Bucket::NoData => self.no_data,
            Bucket::Underflow => self.underflow,
            Bucket::Overflow => self.overflow,
            Bucket::Class(i) => self.colors.get(i).copied().unwrap_or(self.overflow),
        }
    }

    /// Fill color for a value.
    #[must_use]
    pub fn color_for(&self, value: Option<u64>) -> Color {
        self.color(self.bucket_for(value))
    }

    /// Tick values as labels.
    #[must_use]
    pub fn tick_labels(&self) -> Vec<String> {
        self.ticks.iter().map(ToString::to_string).collect()
    }

    /// Legend rows from underflow through overflow.
    ///
    /// The underflow row is omitted for linear scales, which start at 0.
    #[must_use]
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut rows = Vec::with_capacity(self.buckets() + 2);
        let (Some(&first), Some(&last)) = (self.ticks.first(), self.ticks.last()) else {
            return rows;
        };

        if first > 0 {
            rows.push(LegendEntry {
                lower: None,
                upper: Some(first),
                color: self.underflow,
                label: format!("< {first}"),
            });
        }
        for (i, pair) in self.ticks.windows(2).enumerate() {
            let (lower, upper) = (pair[0], pair[1]);
            let label = if upper - lower == 1 {
                lower.to_string()
            } else {
                format!("{lower}-{}", upper - 1)
            };
            rows.push(LegendEntry {
                lower: Some(lower),
                upper: Some(upper),
                color: self.color(Bucket::Class(i)),
                label,
            });
        }
        rows.push(LegendEntry {
            lower: Some(last),
            upper: None,
            color: self.overflow,
            label: format!(">= {last}"),
        });
        rows
    }
}
