use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The closed set of cell value variants a column may produce.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable IPC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Empty / unset cell value.
    #[default]
    Empty,
    /// Plain string.
    Text(String),
    /// Signed integer, written as a plain numeric cell.
    Integer(i64),
    /// IEEE-754 double precision number.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// Calendar timestamp, written as a serial-day numeric cell.
    DateTime(NaiveDateTime),
    /// Hyperlink-like text; rendered as styled link text.
    Url(String),
    /// Formula text (stored without the leading `=`).
    Formula(String),
}

impl CellValue {
    /// Returns true if the value is [`CellValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Empty => CellKind::Empty,
            CellValue::Text(_) => CellKind::Text,
            CellValue::Integer(_) => CellKind::Integer,
            CellValue::Float(_) => CellKind::Float,
            CellValue::Boolean(_) => CellKind::Boolean,
            CellValue::DateTime(_) => CellKind::DateTime,
            CellValue::Url(_) => CellKind::Url,
            CellValue::Formula(_) => CellKind::Formula,
        }
    }
}

/// Variant tags for [`CellValue`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Empty,
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Url,
    Formula,
}

/// Hyperlink-like cell input; maps to [`CellValue::Url`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Url(pub String);

/// Formula cell input; maps to [`CellValue::Formula`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Formula(pub String);

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(value as i64)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Integer(value as i64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<f32> for CellValue {
    fn from(value: f32) -> Self {
        CellValue::Float(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::DateTime(value.and_hms_opt(0, 0, 0).unwrap_or_default())
    }
}

impl From<Url> for CellValue {
    fn from(value: Url) -> Self {
        CellValue::Url(value.0)
    }
}

impl From<Formula> for CellValue {
    fn from(value: Formula) -> Self {
        // SpreadsheetML `<f>` text never carries the UI-level leading '='.
        let text = value.0;
        CellValue::Formula(text.strip_prefix('=').map(str::to_string).unwrap_or(text))
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Input types a typed column may yield, together with the cell kind the
/// conversion produces.
///
/// This is the closed mapping table from input type to output kind; a column
/// whose final transform result does not implement it fails to construct.
pub trait IntoCellValue: Into<CellValue> {
    const KIND: CellKind;
}

impl IntoCellValue for String {
    const KIND: CellKind = CellKind::Text;
}

impl IntoCellValue for i64 {
    const KIND: CellKind = CellKind::Integer;
}

impl IntoCellValue for i32 {
    const KIND: CellKind = CellKind::Integer;
}

impl IntoCellValue for u32 {
    const KIND: CellKind = CellKind::Integer;
}

impl IntoCellValue for f64 {
    const KIND: CellKind = CellKind::Float;
}

impl IntoCellValue for f32 {
    const KIND: CellKind = CellKind::Float;
}

impl IntoCellValue for bool {
    const KIND: CellKind = CellKind::Boolean;
}

impl IntoCellValue for NaiveDateTime {
    const KIND: CellKind = CellKind::DateTime;
}

impl IntoCellValue for NaiveDate {
    const KIND: CellKind = CellKind::DateTime;
}

impl IntoCellValue for Url {
    const KIND: CellKind = CellKind::Url;
}

impl IntoCellValue for Formula {
    const KIND: CellKind = CellKind::Formula;
}
