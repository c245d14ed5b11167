//! `bindery-model` defines the value-level data model for bindery exports.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the `.xlsx` assembly engine (`bindery-xlsx`)
//! - embedding applications that precompute styles or cell values
//! - IPC boundaries via `serde` (JSON-safe schema)

pub mod serial;
mod sheet_name;
mod style;
mod value;

pub use sheet_name::{
    sanitize_sheet_name, validate_sheet_name, InvalidCharStrategy, SheetNameError,
    SheetNameOptions, DISALLOWED_SHEET_NAME_CHARS, EXCEL_MAX_SHEET_NAME_LEN,
};
pub use style::{
    Alignment, Border, BorderEdge, BorderStyle, Color, Fill, Font, GradientKind,
    HorizontalAlignment, NumberFormat, PatternKind, Style, VerticalAlignment,
};
pub use value::{CellKind, CellValue, Formula, IntoCellValue, Url};
