use core::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ARGB color.
///
/// Serialized as a `#AARRGGBB` hex string for IPC friendliness.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub argb: u32,
}

impl Color {
    pub const fn new_argb(argb: u32) -> Self {
        Self { argb }
    }

    /// Opaque color from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            argb: 0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32),
        }
    }

    pub const fn black() -> Self {
        Self { argb: 0xFF000000 }
    }

    pub const fn white() -> Self {
        Self { argb: 0xFFFFFFFF }
    }

    /// Eight uppercase hex digits without a leading `#`, as used by the
    /// `rgb` attribute in SpreadsheetML (`FF2A6099`).
    pub fn to_rgba_hex(self) -> String {
        format!("{:08X}", self.argb)
    }

    fn to_hex(self) -> String {
        format!("#{:08X}", self.argb)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.trim();
        let hex = s.strip_prefix('#').ok_or_else(|| {
            D::Error::custom("color must be a #AARRGGBB hex string (missing '#')")
        })?;
        if hex.len() != 8 {
            return Err(D::Error::custom(
                "color must be a #AARRGGBB hex string (8 hex digits)",
            ));
        }
        let argb = u32::from_str_radix(hex, 16).map_err(|_| D::Error::custom("invalid hex"))?;
        Ok(Color { argb })
    }
}

/// Font formatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Font size in 1/100 points (e.g. 1100 = 11pt).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_100pt: Option<u16>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl Font {
    /// Named font at a whole-point size.
    pub fn named(name: impl Into<String>, size_pt: u16) -> Self {
        Self {
            name: Some(name.into()),
            size_100pt: Some(size_pt * 100),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn colored(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Fill pattern kinds (subset of the SpreadsheetML `patternType` set).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Gray125,
    LightGray,
    DarkGray,
    LightHorizontal,
    LightVertical,
}

impl PatternKind {
    pub fn pattern_type(self) -> &'static str {
        match self {
            PatternKind::Gray125 => "gray125",
            PatternKind::LightGray => "lightGray",
            PatternKind::DarkGray => "darkGray",
            PatternKind::LightHorizontal => "lightHorizontal",
            PatternKind::LightVertical => "lightVertical",
        }
    }
}

/// Gradient fill kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientKind {
    Linear { angle_degrees: i32 },
    Path,
}

/// Cell background fill.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Fill {
    #[default]
    None,
    Solid(Color),
    Pattern {
        kind: PatternKind,
        foreground: Color,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        background: Option<Color>,
    },
    Gradient {
        kind: GradientKind,
        stops: Vec<Color>,
    },
}

/// Border line style.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
}

impl BorderStyle {
    /// SpreadsheetML `style` attribute value; `None` edges carry no attribute.
    pub fn style_attr(self) -> Option<&'static str> {
        match self {
            BorderStyle::None => None,
            BorderStyle::Thin => Some("thin"),
            BorderStyle::Medium => Some("medium"),
            BorderStyle::Thick => Some("thick"),
            BorderStyle::Dashed => Some("dashed"),
            BorderStyle::Dotted => Some("dotted"),
            BorderStyle::Double => Some("double"),
        }
    }
}

/// A single border edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BorderEdge {
    #[serde(default)]
    pub style: BorderStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl BorderEdge {
    pub const fn new(style: BorderStyle) -> Self {
        Self { style, color: None }
    }
}

/// Border formatting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Border {
    #[serde(default)]
    pub top: BorderEdge,
    #[serde(default)]
    pub bottom: BorderEdge,
    #[serde(default)]
    pub left: BorderEdge,
    #[serde(default)]
    pub right: BorderEdge,
}

impl Border {
    /// All four edges in the same style.
    pub fn all(style: BorderStyle) -> Self {
        let edge = BorderEdge::new(style);
        Self {
            top: edge,
            bottom: edge,
            left: edge,
            right: edge,
        }
    }
}

/// Horizontal alignment options (subset).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlignment {
    General,
    Left,
    Center,
    Right,
}

impl HorizontalAlignment {
    pub fn as_attr(self) -> &'static str {
        match self {
            HorizontalAlignment::General => "general",
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
        }
    }
}

/// Vertical alignment options (subset).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
}

impl VerticalAlignment {
    pub fn as_attr(self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
        }
    }
}

/// Alignment formatting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Alignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<HorizontalAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalAlignment>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrap_text: bool,
    /// Excel text rotation in degrees (`0` = horizontal).
    #[serde(default, skip_serializing_if = "is_zero_i16")]
    pub text_rotation: i16,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        *self == Alignment::default()
    }
}

/// Number format applied to a cell.
///
/// Built-in formats map to the fixed `numFmtId`s Excel reserves for them;
/// everything else is written as a custom format code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NumberFormat {
    #[default]
    General,
    Percentage {
        precision: u8,
    },
    Date,
    Time,
    DateTime,
    Currency {
        symbol: String,
    },
    Scientific,
}

impl NumberFormat {
    /// The reserved id for built-in formats, `None` for custom codes.
    pub fn builtin_id(&self) -> Option<u16> {
        match self {
            NumberFormat::General => Some(0),
            NumberFormat::Percentage { precision: 0 } => Some(9),
            NumberFormat::Percentage { precision: 2 } => Some(10),
            NumberFormat::Scientific => Some(11),
            NumberFormat::Date => Some(14),
            NumberFormat::Time => Some(21),
            NumberFormat::DateTime => Some(22),
            NumberFormat::Percentage { .. } | NumberFormat::Currency { .. } => None,
        }
    }

    /// The format code string for this format.
    pub fn format_code(&self) -> String {
        match self {
            NumberFormat::General => "General".to_string(),
            NumberFormat::Percentage { precision: 0 } => "0%".to_string(),
            NumberFormat::Percentage { precision } => {
                format!("0.{}%", "0".repeat(*precision as usize))
            }
            NumberFormat::Date => "m/d/yyyy".to_string(),
            NumberFormat::Time => "h:mm:ss".to_string(),
            NumberFormat::DateTime => "m/d/yy h:mm".to_string(),
            NumberFormat::Currency { symbol } => format!("\"{symbol}\"#,##0.00"),
            NumberFormat::Scientific => "0.00E+00".to_string(),
        }
    }
}

/// Complete cell style.
///
/// Structural equality over all fields is the identity used for
/// deduplication; two equal styles always intern to the same index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<NumberFormat>,
}

impl Style {
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_number_format(mut self, number_format: NumberFormat) -> Self {
        self.number_format = Some(number_format);
        self
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero_i16(v: &i16) -> bool {
    *v == 0
}
