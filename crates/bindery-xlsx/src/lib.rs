//! XLSX document-assembly engine.
//!
//! `bindery-xlsx` turns in-memory object collections into Office Open XML
//! spreadsheet packages. The crate exposes a small surface:
//!
//! - [`Column`]: typed mapping from a row object to one cell, with optional
//!   nil defaults, value transforms, row filters, and per-cell styles.
//! - [`Sheet`]: a named column schema over an eager, synchronous, or
//!   asynchronous row source, loaded at most once per write pass.
//! - [`Book`]: the ordered sheet collection and the only write entry points
//!   ([`Book::write`], [`Book::write_async`]), with optional
//!   [`WriteEvent`] progress reporting.
//!
//! Style and shared-string deduplication ([`StyleRegistry`],
//! [`SharedStringRegistry`]) is scoped to a single write pass; the registries
//! are created inside `write`, threaded through every sheet's row
//! generation, frozen for part emission, and dropped with the pass.

mod book;
mod column;
mod package;
mod shared_strings;
mod sheet;
mod styles;
mod xml;

pub use book::{Book, BookStyle, WriteError, WriteEvent};
pub use column::{CellError, Column, ColumnBuilder};
pub use shared_strings::SharedStringRegistry;
pub use sheet::{AnySheet, RowSource, Sheet, SheetStyle};
pub use styles::{StyleRegistry, FIRST_CUSTOM_NUM_FMT_ID};

pub use bindery_model as model;
