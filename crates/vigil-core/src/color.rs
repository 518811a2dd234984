//! CSS color parsing for the stylistic invariants.
//!
//! Only the forms browsers emit for computed styles are understood:
//! `rgb(r, g, b)`, `rgba(r, g, b, a)`, the space-separated
//! `rgb(r g b / a)` syntax, and `#rrggbb` / `#rgb` hex literals.

use std::fmt;

/// An opaque color as an RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a computed CSS color.
    ///
    /// Returns `None` for unparseable input and for fully transparent
    /// colors, which carry no usable channel information.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix('#') {
            return parse_hex(hex);
        }

        let inner = raw
            .strip_prefix("rgba(")
            .or_else(|| raw.strip_prefix("rgb("))?
            .strip_suffix(')')?;

        let parts: Vec<&str> = inner
            .split([',', ' ', '/'])
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }

        if let Some(alpha) = parts.get(3) {
            let alpha = parse_alpha(alpha)?;
            if alpha <= 0.0 {
                return None;
            }
        }

        Some(Self {
            r: parse_channel(parts[0])?,
            g: parse_channel(parts[1])?,
            b: parse_channel(parts[2])?,
        })
    }

    /// Mean of the three channels, in `0.0..=255.0`.
    pub fn average(&self) -> f64 {
        (f64::from(self.r) + f64::from(self.g) + f64::from(self.b)) / 3.0
    }

    /// Absolute difference between the channel averages of two colors.
    ///
    /// This is a crude brightness gap, not the W3C contrast ratio.
    pub fn average_distance(&self, other: &Rgb) -> f64 {
        (self.average() - other.average()).abs()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

fn parse_channel(raw: &str) -> Option<u8> {
    let value = if let Some(pct) = raw.strip_suffix('%') {
        pct.parse::<f64>().ok()? * 255.0 / 100.0
    } else {
        raw.parse::<f64>().ok()?
    };
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(raw: &str) -> Option<f64> {
    if let Some(pct) = raw.strip_suffix('%') {
        return pct.parse::<f64>().ok().map(|v| v / 100.0);
    }
    raw.parse::<f64>().ok()
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.is_ascii() {
        return None;
    }
    let expand = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Rgb::new(
            expand(&hex[0..2])?,
            expand(&hex[2..4])?,
            expand(&hex[4..6])?,
        )),
        3 => {
            let mut channels = hex.chars().map(|c| {
                let digit = c.to_digit(16)? as u8;
                Some(digit * 17)
            });
            Some(Rgb::new(
                channels.next()??,
                channels.next()??,
                channels.next()??,
            ))
        }
        _ => None,
    }
}
