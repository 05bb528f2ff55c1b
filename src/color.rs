//! Key color parsing
//!
//! Supports the following formats:
//! - Presets: `white`, `green`, `black`
//! - Hex: `#RGB`, `#RRGGBB`
//! - Decimal triple: `R,G,B` with each channel in 0-255

use image::Rgba;
use thiserror::Error;

/// Error type for key color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3 or 6 hex chars after #)
    #[error("invalid hex color length {0}, expected 3 or 6")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// Decimal triple did not have exactly three components
    #[error("expected three comma-separated channels, got {0}")]
    InvalidTriple(usize),
    /// A decimal channel was not an integer in 0-255
    #[error("invalid channel value '{0}', expected an integer in 0-255")]
    InvalidChannel(String),
    /// Not a preset, hex color, or decimal triple
    #[error("unknown color '{0}'")]
    Unknown(String),
}

/// The reference color to key out, as raw 8-bit RGB channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl KeyColor {
    pub const WHITE: KeyColor = KeyColor::new(255, 255, 255);
    pub const GREEN: KeyColor = KeyColor::new(0, 255, 0);
    pub const BLACK: KeyColor = KeyColor::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        KeyColor { r, g, b }
    }

    /// The channels as an array, in RGB order.
    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Fully opaque RGBA pixel with this color.
    pub const fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl std::fmt::Display for KeyColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for KeyColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key_color(s)
    }
}

/// Parse a key color string.
///
/// Accepts the preset names exposed by the original tool (`white`, `green`,
/// `black`), hex colors (`#RGB`, `#RRGGBB`), and decimal triples (`R,G,B`).
///
/// # Examples
///
/// ```
/// use gifkey::color::{parse_key_color, KeyColor};
///
/// assert_eq!(parse_key_color("white").unwrap(), KeyColor::new(255, 255, 255));
/// assert_eq!(parse_key_color("#0F0").unwrap(), KeyColor::new(0, 255, 0));
/// assert_eq!(parse_key_color("#336699").unwrap(), KeyColor::new(0x33, 0x66, 0x99));
/// assert_eq!(parse_key_color("12, 34, 56").unwrap(), KeyColor::new(12, 34, 56));
/// ```
pub fn parse_key_color(input: &str) -> Result<KeyColor, ColorError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ColorError::Empty);
    }

    match input.to_ascii_lowercase().as_str() {
        "white" => return Ok(KeyColor::WHITE),
        "green" => return Ok(KeyColor::GREEN),
        "black" => return Ok(KeyColor::BLACK),
        _ => {}
    }

    if let Some(hex) = input.strip_prefix('#') {
        return parse_hex(hex);
    }

    if input.contains(',') {
        return parse_triple(input);
    }

    Err(ColorError::Unknown(input.to_string()))
}

fn parse_hex(hex: &str) -> Result<KeyColor, ColorError> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8).ok_or(ColorError::InvalidHex(c)))
        .collect::<Result<_, _>>()?;

    match digits.len() {
        // #RGB: each digit is doubled (e.g. #F00 -> FF0000)
        3 => Ok(KeyColor::new(digits[0] * 17, digits[1] * 17, digits[2] * 17)),
        6 => Ok(KeyColor::new(
            digits[0] * 16 + digits[1],
            digits[2] * 16 + digits[3],
            digits[4] * 16 + digits[5],
        )),
        n => Err(ColorError::InvalidLength(n)),
    }
}

fn parse_triple(input: &str) -> Result<KeyColor, ColorError> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(ColorError::InvalidTriple(parts.len()));
    }

    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        *slot = part
            .parse::<u8>()
            .map_err(|_| ColorError::InvalidChannel((*part).to_string()))?;
    }
    Ok(KeyColor::new(channels[0], channels[1], channels[2]))
}
