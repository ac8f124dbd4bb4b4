/// A straight-alpha sRGB color, 8 bits per channel, in `[r, g, b, a]` order.
///
/// Written and parsed as CSS-style hex (`#rrggbb`, `#rrggbbaa`, `#rgb`) or one of a handful of
/// color names, which is what the editor's color inputs produce.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct Color(pub [u8; 4]);
impl Color {
    pub const TRANSPARENT: Self = Self([0; 4]);
    pub const WHITE: Self = Self([255; 4]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }
    #[must_use]
    pub const fn alpha(self) -> u8 {
        self.0[3]
    }
    #[must_use]
    pub fn is_opaque(self) -> bool {
        self.0[3] == u8::MAX
    }
    fn from_name(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "transparent" => Self::TRANSPARENT,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "yellow" => Self::rgb(255, 255, 0),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "orange" => Self::rgb(255, 165, 0),
            "purple" => Self::rgb(128, 0, 128),
            _ => return None,
        };
        Some(color)
    }
}
impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("unknown color name {0:?}")]
    UnknownName(String),
    #[error("hex color must have 3, 6, or 8 digits")]
    BadLength,
    #[error("invalid hex digit")]
    BadDigit,
}

impl std::str::FromStr for Color {
    type Err = ColorParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(hex) = s.strip_prefix('#') else {
            return Self::from_name(s).ok_or_else(|| ColorParseError::UnknownName(s.to_owned()));
        };
        if !hex.is_ascii() {
            return Err(ColorParseError::BadDigit);
        }
        let byte = |idx: usize| -> Result<u8, ColorParseError> {
            u8::from_str_radix(&hex[idx..idx + 2], 16).map_err(|_| ColorParseError::BadDigit)
        };
        match hex.len() {
            3 => {
                // #abc is shorthand for #aabbcc
                let mut out = [255u8; 4];
                for (channel, digit) in out.iter_mut().zip(hex.chars()) {
                    let value = digit.to_digit(16).ok_or(ColorParseError::BadDigit)? as u8;
                    *channel = value * 17;
                }
                Ok(Self(out))
            }
            6 => Ok(Self([byte(0)?, byte(2)?, byte(4)?, 255])),
            8 => Ok(Self([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
            _ => Err(ColorParseError::BadLength),
        }
    }
}
impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [r, g, b, a] = self.0;
        if a == u8::MAX {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}
impl serde::Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let str =
            <std::borrow::Cow<'de, str> as serde::Deserialize<'de>>::deserialize(deserializer)?;
        str.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::{Color, ColorParseError};
    #[test]
    fn parse_forms() {
        assert_eq!("black".parse(), Ok(Color::BLACK));
        assert_eq!("#ff8000".parse(), Ok(Color::rgb(255, 128, 0)));
        assert_eq!("#f80".parse(), Ok(Color::rgb(255, 136, 0)));
        assert_eq!("#00000080".parse(), Ok(Color::rgba(0, 0, 0, 128)));
        assert_eq!("#12345".parse::<Color>(), Err(ColorParseError::BadLength));
        assert_eq!("#zz0000".parse::<Color>(), Err(ColorParseError::BadDigit));
        assert!(matches!(
            "chartreuse-ish".parse::<Color>(),
            Err(ColorParseError::UnknownName(_))
        ));
    }
    #[test]
    fn display_is_parseable() {
        for color in [Color::BLACK, Color::rgb(1, 2, 3), Color::rgba(9, 8, 7, 6)] {
            assert_eq!(color.to_string().parse(), Ok(color));
        }
        assert_eq!(Color::WHITE.to_string(), "#ffffff");
    }
}
