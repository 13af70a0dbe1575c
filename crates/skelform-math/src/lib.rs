#![warn(missing_docs)]

//! Math types for the skelform skeleton modeler.
//!
//! Thin wrappers around nalgebra providing the handful of domain types the
//! document and the generators share: points, vectors, RGBA colors,
//! quantized position keys and tolerance helpers.

use std::fmt;
use std::ops::{Add, Mul};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Tolerance constants for scalar and geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance.
    pub linear: f64,
    /// Threshold below which an attribute counts as "at its default".
    pub adjustment: f64,
}

impl Tolerance {
    /// Default tolerances (1e-6 linear, 0.01 for attribute adjustment).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        adjustment: 0.01,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }

    /// Check if two scalars are effectively equal.
    pub fn is_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.linear
    }

    /// Check if `value` differs from `default` by at least the adjustment threshold.
    pub fn is_adjusted(&self, value: f64, default: f64) -> bool {
        (value - default).abs() >= self.adjustment
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Linear RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Alpha.
    pub a: f64,
}

impl Color {
    /// Opaque color from RGB components.
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Color from RGBA components.
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque white.
    pub const fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    /// Fully transparent black.
    pub const fn transparent() -> Self {
        Self::rgba(0.0, 0.0, 0.0, 0.0)
    }

    /// Parse `#RRGGBB` or `#AARRGGBB` (leading `#` optional).
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        let channel = |i: usize| -> Option<f64> {
            u8::from_str_radix(hex.get(i..i + 2)?, 16)
                .ok()
                .map(|v| f64::from(v) / 255.0)
        };
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(2)?, channel(4)?, channel(6)?, channel(0)?)),
            _ => None,
        }
    }

    /// Format as lowercase `#aarrggbb`.
    pub fn to_hex_argb(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        format!("#{a:02x}{r:02x}{g:02x}{b:02x}")
    }

    /// Quantize to 8-bit RGBA.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl Default for Color {
    /// Opaque black.
    fn default() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, other: Color) -> Color {
        Color::rgba(
            self.r + other.r,
            self.g + other.g,
            self.b + other.b,
            self.a + other.a,
        )
    }
}

impl Mul<f64> for Color {
    type Output = Color;

    fn mul(self, s: f64) -> Color {
        Color::rgba(self.r * s, self.g * s, self.b * s, self.a * s)
    }
}

/// Quantized position usable as an exact-match map key.
///
/// Two positions produce the same key when they agree to within
/// `1 / PositionKey::SCALE` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    x: i64,
    y: i64,
    z: i64,
}

impl PositionKey {
    /// Quantization scale (keys are exact to 1e-4).
    pub const SCALE: f64 = 10_000.0;

    /// Build a key from raw coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        let q = |v: f64| (v * Self::SCALE).round() as i64;
        Self {
            x: q(x),
            y: q(y),
            z: q(z),
        }
    }

    /// The position this key stands for.
    pub fn position(&self) -> Point3 {
        Point3::new(
            self.x as f64 / Self::SCALE,
            self.y as f64 / Self::SCALE,
            self.z as f64 / Self::SCALE,
        )
    }
}

impl From<&Point3> for PositionKey {
    fn from(p: &Point3) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position();
        write!(f, "({}, {}, {})", p.x, p.y, p.z)
    }
}

/// Normalize `v`, returning the zero vector for degenerate input.
pub fn normalized_or_zero(v: &Vec3) -> Vec3 {
    v.try_normalize(Tolerance::DEFAULT.linear)
        .unwrap_or_else(Vec3::zeros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_color_hex_roundtrip() {
        let c = Color::from_hex("#80ff0000").unwrap();
        assert_relative_eq!(c.r, 1.0);
        assert_relative_eq!(c.g, 0.0);
        assert_relative_eq!(c.a, 128.0 / 255.0, epsilon = 1e-9);
        assert_eq!(c.to_hex_argb(), "#80ff0000");
    }

    #[test]
    fn test_color_rgb_hex() {
        let c = Color::from_hex("#00ff00").unwrap();
        assert_eq!(c, Color::rgb(0.0, 1.0, 0.0));
        assert!(Color::from_hex("#zzz").is_none());
        assert!(Color::from_hex("white").is_none());
    }

    #[test]
    fn test_color_average() {
        let sum = Color::rgb(1.0, 0.0, 0.0) + Color::rgb(0.0, 1.0, 0.0);
        let avg = sum * 0.5;
        assert_relative_eq!(avg.r, 0.5);
        assert_relative_eq!(avg.g, 0.5);
        assert_relative_eq!(avg.a, 1.0);
    }

    #[test]
    fn test_position_key_quantization() {
        let a = PositionKey::new(1.0, 2.0, 3.0);
        let b = PositionKey::new(1.000_01, 2.0, 3.0);
        let c = PositionKey::new(1.001, 2.0, 3.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(PositionKey::from(&Point3::new(1.0, 2.0, 3.0)), a);
    }

    #[test]
    fn test_tolerance_adjusted() {
        let tol = Tolerance::DEFAULT;
        assert!(!tol.is_adjusted(1.005, 1.0));
        assert!(tol.is_adjusted(1.02, 1.0));
        assert!(tol.is_zero(1e-9));
    }

    #[test]
    fn test_normalized_or_zero() {
        let n = normalized_or_zero(&Vec3::new(3.0, 0.0, 4.0));
        assert_relative_eq!(n.norm(), 1.0);
        assert_eq!(normalized_or_zero(&Vec3::zeros()), Vec3::zeros());
    }
}
