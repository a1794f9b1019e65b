use serde::{Deserialize, Serialize};

/// Color representation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        Self::try_parse(&value).unwrap_or(Color::BLACK)
    }
}

impl From<Color> for String {
    fn from(val: Color) -> Self {
        val.to_hex()
    }
}

impl Color {
    /// Transparent color: `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Red color: `#FF0000FF`
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    /// Green color: `#00FF00FF`
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    /// Blue color: `#0000FFFF`
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    /// White color: `#FFFFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Black color: `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// Gray color: `#AAAAAAFF`
    pub const GRAY: Color = Color::rgba(170, 170, 170, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Red channel.
    pub const fn r(&self) -> u8 {
        self.r
    }

    /// Green channel.
    pub const fn g(&self) -> u8 {
        self.g
    }

    /// Blue channel.
    pub const fn b(&self) -> u8 {
        self.b
    }

    /// Alpha channel.
    pub const fn a(&self) -> u8 {
        self.a
    }

    /// Returns true for a fully transparent color.
    pub const fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Converts the color into u8 array (RGBA).
    pub const fn to_u8_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Converts the color into f64 array with channels in `0.0..=1.0`.
    pub fn to_f64_array(&self) -> [f64; 4] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
            self.a as f64 / 255.0,
        ]
    }

    /// Converts the color into HEX8 string: `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Parses a color from the hex string. Hex string can be either HEX6
    /// (`#RRGGBB`) or HEX8 (`#RRGGBBAA`).
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        if !hex_string.is_ascii()
            || hex_string.len() != 7 && hex_string.len() != 9
            || hex_string.chars().next()? != '#'
        {
            return None;
        }

        let r = u8::from_str_radix(&hex_string[1..3], 16).ok()?;
        let g = u8::from_str_radix(&hex_string[3..5], 16).ok()?;
        let b = u8::from_str_radix(&hex_string[5..7], 16).ok()?;
        let a = if hex_string.len() == 9 {
            u8::from_str_radix(&hex_string[7..9], 16).ok()?
        } else {
            255
        };

        Some(Self { r, g, b, a })
    }

    /// Parses a color from a request string: either a hex form accepted by
    /// [`Color::try_from_hex`] or the keyword `transparent`.
    pub fn try_parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("transparent") {
            return Some(Color::TRANSPARENT);
        }
        Self::try_from_hex(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex6_and_hex8() {
        assert_eq!(Color::try_from_hex("#FF0000"), Some(Color::RED));
        assert_eq!(
            Color::try_from_hex("#00FF0080"),
            Some(Color::rgba(0, 255, 0, 128))
        );
        assert_eq!(Color::try_from_hex("FF0000"), None);
        assert_eq!(Color::try_from_hex("#GG0000"), None);
        assert_eq!(Color::try_from_hex("#FF00"), None);
    }

    #[test]
    fn rejects_non_ascii_without_panicking() {
        // Multi-byte characters must not trip the byte-range slicing.
        assert_eq!(Color::try_from_hex("#aé000"), None);
        assert_eq!(Color::try_from_hex("#ééé"), None);
        assert_eq!(Color::try_parse("#aé000"), None);
    }

    #[test]
    fn parses_transparent_keyword() {
        assert_eq!(Color::try_parse("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(Color::try_parse("TRANSPARENT"), Some(Color::TRANSPARENT));
        assert_eq!(Color::try_parse("#FFFFFF"), Some(Color::WHITE));
        assert_eq!(Color::try_parse("white"), None);
    }

    #[test]
    fn hex_round_trip() {
        let color = Color::rgba(1, 2, 3, 4);
        assert_eq!(Color::try_from_hex(&color.to_hex()), Some(color));
    }
}
