//! Colouring of usbwatch output
use colored::*;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Colours menu entries based on which device field they show
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ColourTheme {
    /// Colour to use for product name in the entry label
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub product: Option<Color>,
    /// Colour to use for label when the device has no product string
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub unknown: Option<Color>,
    /// Colour to use for Vendor ID:Product ID
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub vidpid: Option<Color>,
    /// Colour to use for manufacturer from descriptor
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub manufacturer: Option<Color>,
    /// Colour to use for serial from descriptor
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub serial: Option<Color>,
    /// Colour to use for speed
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub speed: Option<Color>,
    /// Colour to use for power information
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub power: Option<Color>,
    /// Colour to use for other detail lines
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub detail: Option<Color>,
    /// Tree and header decoration
    #[serde(
        default,
        serialize_with = "color_serializer",
        deserialize_with = "deserialize_option_color_from_string"
    )]
    pub tree: Option<Color>,
}

fn deserialize_option_color_from_string<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NameOrRgb {
        Str(String),
        Rgb([u8; 3]),
    }

    match Option::<NameOrRgb>::deserialize(deserializer)? {
        Some(NameOrRgb::Str(s)) => match s.as_str() {
            "" => Ok(None),
            _ => Color::from_str(&s)
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid colour '{}'", s))),
        },
        Some(NameOrRgb::Rgb([r, g, b])) => Ok(Some(Color::TrueColor { r, g, b })),
        None => Ok(None),
    }
}

fn color_to_string(color: Color) -> String {
    match color {
        Color::Black => "black".into(),
        Color::Red => "red".into(),
        Color::Green => "green".into(),
        Color::Yellow => "yellow".into(),
        Color::Blue => "blue".into(),
        Color::Magenta => "magenta".into(),
        Color::Cyan => "cyan".into(),
        Color::White => "white".into(),
        Color::BrightBlack => "bright black".into(),
        Color::BrightRed => "bright red".into(),
        Color::BrightGreen => "bright green".into(),
        Color::BrightYellow => "bright yellow".into(),
        Color::BrightBlue => "bright blue".into(),
        Color::BrightMagenta => "bright magenta".into(),
        Color::BrightCyan => "bright cyan".into(),
        Color::BrightWhite => "bright white".into(),
        Color::TrueColor { r, g, b } => format!("[{}, {}, {}]", r, g, b),
        #[allow(unreachable_patterns)]
        _ => "white".into(),
    }
}

/// Have to make this because external crate does not impl Display
fn color_serializer<S>(color: &Option<Color>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::ser::Serializer,
{
    match color {
        Some(c) => match c {
            Color::TrueColor { r, g, b } => {
                let mut seq = s.serialize_seq(Some(3))?;
                seq.serialize_element(r)?;
                seq.serialize_element(g)?;
                seq.serialize_element(b)?;
                seq.end()
            }
            _ => s.serialize_str(&color_to_string(*c)),
        },
        None => s.serialize_none(),
    }
}

/// Apply optional colour; normal if `None`
pub fn apply(s: &str, color: Option<Color>) -> ColoredString {
    match color {
        Some(c) => s.color(c),
        None => s.normal(),
    }
}

impl Default for ColourTheme {
    fn default() -> Self {
        ColourTheme::new()
    }
}

impl ColourTheme {
    /// New theme with defaults
    pub fn new() -> Self {
        ColourTheme {
            product: Some(Color::BrightBlue),
            unknown: Some(Color::BrightBlack),
            vidpid: Some(Color::BrightYellow),
            manufacturer: Some(Color::Blue),
            serial: Some(Color::Green),
            speed: Some(Color::Magenta),
            power: Some(Color::Red),
            detail: None,
            tree: Some(Color::BrightBlack),
        }
    }

    /// Theme with no colours
    pub fn plain() -> Self {
        ColourTheme {
            product: None,
            unknown: None,
            vidpid: None,
            manufacturer: None,
            serial: None,
            speed: None,
            power: None,
            detail: None,
            tree: None,
        }
    }
}
