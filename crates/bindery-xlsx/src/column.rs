//! Typed column definitions.
//!
//! A [`Column`] binds a header name, an accessor from a row object to an
//! input value, and an optional transformation chain to one output cell per
//! row. The output cell kind is fixed by the type of the final transform
//! result through [`IntoCellValue`], so a mismatched mapping is a compile
//! error rather than a runtime one. Filters declared on a column operate at
//! row granularity: a rejecting predicate drops the whole row from every
//! column's output.

use bindery_model::{CellKind, CellValue, IntoCellValue, Style};
use thiserror::Error;

/// Failure raised by a fallible column accessor.
///
/// Accessor failures are not recoverable per-row; they fail the whole write.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CellError {
    pub message: String,
}

impl CellError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

type Accessor<R, I> = Box<dyn Fn(&R) -> Result<Option<I>, CellError> + Send + Sync>;
type Extractor<R> = Box<dyn Fn(&R) -> Result<CellValue, CellError> + Send + Sync>;
type RowPredicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;
type StyleRule<R> = Box<dyn Fn(&R) -> Option<Style> + Send + Sync>;

/// One output column of a sheet.
pub struct Column<R> {
    name: String,
    kind: CellKind,
    width: Option<f64>,
    style: Option<Style>,
    extract: Extractor<R>,
    filter: Option<RowPredicate<R>>,
    style_rule: Option<StyleRule<R>>,
}

impl<R: 'static> Column<R> {
    /// Column over an infallible, non-optional accessor.
    pub fn new<I, F>(name: impl Into<String>, accessor: F) -> ColumnBuilder<R, I>
    where
        F: Fn(&R) -> I + Send + Sync + 'static,
        I: 'static,
    {
        ColumnBuilder::from_accessor(name.into(), Box::new(move |row| Ok(Some(accessor(row)))))
    }

    /// Column over a nilable accessor; absent values become the configured
    /// default, or an empty cell.
    pub fn optional<I, F>(name: impl Into<String>, accessor: F) -> ColumnBuilder<R, I>
    where
        F: Fn(&R) -> Option<I> + Send + Sync + 'static,
        I: 'static,
    {
        ColumnBuilder::from_accessor(name.into(), Box::new(move |row| Ok(accessor(row))))
    }

    /// Column over a fallible accessor; an `Err` fails the whole write.
    pub fn try_new<I, F>(name: impl Into<String>, accessor: F) -> ColumnBuilder<R, I>
    where
        F: Fn(&R) -> Result<I, CellError> + Send + Sync + 'static,
        I: 'static,
    {
        ColumnBuilder::from_accessor(name.into(), Box::new(move |row| accessor(row).map(Some)))
    }
}

impl<R> Column<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared output cell kind.
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// Fixed column width, consulted when emitting column metadata.
    pub fn width(&self) -> Option<f64> {
        self.width
    }

    /// Column-level default style, applied when no per-cell rule fires.
    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    /// Row-level admission check; false drops the row from every column.
    pub(crate) fn admits(&self, row: &R) -> bool {
        self.filter.as_ref().is_none_or(|pred| pred(row))
    }

    /// Produce the cell value and optional per-cell style for one row.
    pub(crate) fn evaluate(&self, row: &R) -> Result<(CellValue, Option<Style>), CellError> {
        let value = (self.extract)(row)?;
        let style = self.style_rule.as_ref().and_then(|rule| rule(row));
        Ok((value, style))
    }
}

/// Staged column configuration; finished by [`ColumnBuilder::build`].
pub struct ColumnBuilder<R, I> {
    name: String,
    accessor: Accessor<R, I>,
    filter: Option<RowPredicate<R>>,
    style_rule: Option<StyleRule<R>>,
    width: Option<f64>,
    style: Option<Style>,
}

impl<R: 'static, I: 'static> ColumnBuilder<R, I> {
    fn from_accessor(name: String, accessor: Accessor<R, I>) -> Self {
        Self {
            name,
            accessor,
            filter: None,
            style_rule: None,
            width: None,
            style: None,
        }
    }

    /// Substitute `value` when the accessor yields nothing. Applied before
    /// any [`map`](Self::map) transform declared later.
    pub fn default_value(self, value: I) -> Self
    where
        I: Clone + Send + Sync,
    {
        let Self {
            name,
            accessor,
            filter,
            style_rule,
            width,
            style,
        } = self;
        Self {
            name,
            accessor: Box::new(move |row| Ok(accessor(row)?.or_else(|| Some(value.clone())))),
            filter,
            style_rule,
            width,
            style,
        }
    }

    /// Transform present values; the transform's output type fixes the
    /// column's declared cell kind.
    pub fn map<O, F>(self, transform: F) -> ColumnBuilder<R, O>
    where
        F: Fn(I) -> O + Send + Sync + 'static,
        O: 'static,
    {
        let Self {
            name,
            accessor,
            filter,
            style_rule,
            width,
            style,
        } = self;
        ColumnBuilder {
            name,
            accessor: Box::new(move |row| Ok(accessor(row)?.map(&transform))),
            filter,
            style_rule,
            width,
            style,
        }
    }

    /// Row-granular filter: rejecting a row excludes it from every column's
    /// output, not just this one's.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Per-cell style override, resolved (and registered) at evaluation time.
    pub fn cell_style<F>(mut self, rule: F) -> Self
    where
        F: Fn(&R) -> Option<Style> + Send + Sync + 'static,
    {
        self.style_rule = Some(Box::new(rule));
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Column-level default style.
    pub fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn build(self) -> Column<R>
    where
        I: IntoCellValue,
    {
        let Self {
            name,
            accessor,
            filter,
            style_rule,
            width,
            style,
        } = self;
        Column {
            name,
            kind: I::KIND,
            width,
            style,
            extract: Box::new(move |row| {
                Ok(accessor(row)?.map(Into::into).unwrap_or(CellValue::Empty))
            }),
            filter,
            style_rule,
        }
    }
}

impl<R: 'static> ColumnBuilder<R, bool> {
    /// Render booleans as two fixed caption strings.
    pub fn captions(self, truthy: &str, falsy: &str) -> ColumnBuilder<R, String> {
        let truthy = truthy.to_string();
        let falsy = falsy.to_string();
        self.map(move |value| {
            if value {
                truthy.clone()
            } else {
                falsy.clone()
            }
        })
    }
}
