//! RGBA colors and the sequential ramps used for bucket fills.
//!
//! Bucket colors run from a cool (blue) ramp for the lower half of the
//! scale into a warm (red) ramp for the upper half. The ramps are the
//! nine-class `ColorBrewer` `Blues` and `Reds` schemes, linearly
//! interpolated so any number of samples can be drawn from them.

use std::fmt;

use serde::{Serialize, Serializer};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel. 255 is opaque.
    pub a: u8,
}

impl Color {
    /// White, used for sub-floor values.
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    /// Black, used for values at or above the top tick.
    pub const BLACK: Self = Self::rgb(0x00, 0x00, 0x00);
    /// Light gray, used for regions without data.
    pub const LIGHT_GRAY: Self = Self::rgb(0xd3, 0xd3, 0xd3);

    /// An opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    /// `#rrggbb` for opaque colors, `#rrggbbaa` otherwise.
    #[must_use]
    pub fn hex(&self) -> String {
        if self.a == 0xff {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Channel-wise linear interpolation. `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mix = |a: u8, b: u8| {
            f64::from(b)
                .mul_add(t, f64::from(a) * (1.0 - t))
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

const BLUES: [Color; 9] = [
    Color::rgb(0xf7, 0xfb, 0xff),
    Color::rgb(0xde, 0xeb, 0xf7),
    Color::rgb(0xc6, 0xdb, 0xef),
    Color::rgb(0x9e, 0xca, 0xe1),
    Color::rgb(0x6b, 0xae, 0xd6),
    Color::rgb(0x42, 0x92, 0xc6),
    Color::rgb(0x21, 0x71, 0xb5),
    Color::rgb(0x08, 0x51, 0x9c),
    Color::rgb(0x08, 0x30, 0x6b),
];

const REDS: [Color; 9] = [
    Color::rgb(0xff, 0xf5, 0xf0),
    Color::rgb(0xfe, 0xe0, 0xd2),
    Color::rgb(0xfc, 0xbb, 0xa1),
    Color::rgb(0xfc, 0x92, 0x72),
    Color::rgb(0xfb, 0x6a, 0x4a),
    Color::rgb(0xef, 0x3b, 0x2c),
    Color::rgb(0xcb, 0x18, 0x1d),
    Color::rgb(0xa5, 0x0f, 0x15),
    Color::rgb(0x67, 0x00, 0x0d),
];

/// Samples a piecewise-linear ramp at `t` in `[0, 1]`.
fn sample(anchors: &[Color], t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    #[allow(clippy::cast_precision_loss)]
    let pos = t * (anchors.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lower = (pos.floor() as usize).min(anchors.len() - 2);
    #[allow(clippy::cast_precision_loss)]
    let frac = pos - lower as f64;
    anchors[lower].lerp(anchors[lower + 1], frac)
}

/// `n` evenly spaced samples between `start` and `end` inclusive.
fn linspace(anchors: &[Color], start: f64, end: f64, n: usize) -> Vec<Color> {
    match n {
        0 => Vec::new(),
        1 => vec![sample(anchors, start)],
        _ => {
            #[allow(clippy::cast_precision_loss)]
            let step = (end - start) / (n - 1) as f64;
            #[allow(clippy::cast_precision_loss)]
            (0..n)
                .map(|i| sample(anchors, step.mul_add(i as f64, start)))
                .collect()
        }
    }
}

/// `n` samples from the cool ramp, light to dark.
#[must_use]
pub fn cool(n: usize) -> Vec<Color> {
    linspace(&BLUES, 0.25, 0.75, n)
}

/// `n` samples from the warm ramp, light to dark.
#[must_use]
pub fn warm(n: usize) -> Vec<Color> {
    linspace(&REDS, 0.25, 1.0, n)
}

/// Fill colors for `buckets` classes: the lower half cool, the rest warm.
#[must_use]
pub fn bucket_colors(buckets: usize) -> Vec<Color> {
    let n_cool = buckets / 2;
    let mut colors = cool(n_cool);
    colors.extend(warm(buckets - n_cool));
    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hex() {
        assert_eq!(Color::rgb(0x08, 0x30, 0x6b).hex(), "#08306b");
        assert_eq!(Color::LIGHT_GRAY.to_string(), "#d3d3d3");
        let translucent = Color {
            a: 0x80,
            ..Color::BLACK
        };
        assert_eq!(translucent.hex(), "#00000080");
    }

    #[test]
    fn ramp_endpoints_hit_anchors() {
        assert_eq!(sample(&BLUES, 0.0), BLUES[0]);
        assert_eq!(sample(&BLUES, 1.0), BLUES[8]);
        assert_eq!(sample(&REDS, 0.5), REDS[4]);
        assert_eq!(warm(1), vec![sample(&REDS, 0.25)]);
        assert_eq!(*warm(3).last().unwrap(), REDS[8]);
    }

    #[test]
    fn splits_cool_and_warm() {
        let colors = bucket_colors(13);
        assert_eq!(colors.len(), 13);
        // First six are blue-dominant, the remaining seven red-dominant.
        for c in &colors[..6] {
            assert!(c.b > c.r, "expected cool color, got {c}");
        }
        for c in &colors[6..] {
            assert!(c.r > c.b, "expected warm color, got {c}");
        }
        assert!(bucket_colors(0).is_empty());
        assert_eq!(bucket_colors(1).len(), 1);
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_value(Color::WHITE).unwrap();
        assert_eq!(json, serde_json::json!("#ffffff"));
    }
}
