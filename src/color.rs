//! Color value type and the fixed diagnostic palette

use smart_leds::RGB8;

/// One 8-bit-per-channel color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// All channels off
    pub const BLACK: Color = Color::new(0, 0, 0);

    /// Boot flash shown once before the first poll (blue)
    pub const STARTUP: Color = Color::new(0, 0, 50);

    /// No usable link to the color service (red)
    pub const NETWORK_FAULT: Color = Color::new(50, 0, 0);

    /// Link is up but the service misbehaves (orange)
    pub const SERVER_FAULT: Color = Color::new(50, 20, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from wide integer channels, saturating each to [0, 255]
    pub fn from_clamped(r: i64, g: i64, b: i64) -> Self {
        Self::new(clamp_channel(r), clamp_channel(g), clamp_channel(b))
    }
}

fn clamp_channel(value: i64) -> u8 {
    value.clamp(0, u8::MAX as i64) as u8
}

impl From<Color> for RGB8 {
    fn from(color: Color) -> Self {
        RGB8::new(color.r, color.g, color.b)
    }
}

impl From<RGB8> for Color {
    fn from(rgb: RGB8) -> Self {
        Color::new(rgb.r, rgb.g, rgb.b)
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Color::new(r, g, b)
    }
}

impl core::fmt::Display for Color {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}
