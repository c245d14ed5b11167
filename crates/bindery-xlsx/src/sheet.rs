//! Worksheets: row sources, typed columns, and part emission.
//!
//! A [`Sheet`] owns its column schema and a row source that is loaded at most
//! once per generation pass. Row generation walks every retained row in
//! declared column order, interning styles and strings into the owning pass
//! registries as a side effect, so a sheet is only ever generated while
//! attached to a [`Book`](crate::Book) write.

use bindery_model::{serial, CellValue, Style};
use futures::future::BoxFuture;
use std::future::Future;
use tracing::debug;

use crate::book::{BookStyle, WriteError};
use crate::column::Column;
use crate::shared_strings::SharedStringRegistry;
use crate::styles::StyleRegistry;
use crate::xml::{cell_reference, escape_xml};

/// Where a sheet's rows come from. Exactly one per sheet.
pub enum RowSource<R> {
    /// Eager, already-materialized rows.
    Rows(Vec<R>),
    /// Synchronous supplier, invoked on first load.
    Supplier(Box<dyn Fn() -> Vec<R> + Send + Sync>),
    /// Asynchronous supplier, awaited on first async load. The yielded rows
    /// cross the suspension boundary, hence the `Send` future.
    Async(Box<dyn Fn() -> BoxFuture<'static, Vec<R>> + Send + Sync>),
}

/// Per-sheet formatting defaults.
#[derive(Clone, Debug, Default)]
pub struct SheetStyle {
    /// Default row height in points.
    pub row_height: Option<f64>,
    /// Header-row style; falls back to the book-level header style.
    pub header_style: Option<Style>,
    /// Freeze the header row in the emitted sheet view.
    pub freeze_header: bool,
}

/// One worksheet: name, column schema, row source, and formatting defaults.
pub struct Sheet<R> {
    name: String,
    columns: Vec<Column<R>>,
    source: RowSource<R>,
    rows: Option<Vec<R>>,
    style: SheetStyle,
}

impl<R: Send + 'static> Sheet<R> {
    /// Sheet over an eager row collection.
    pub fn new(name: impl Into<String>, columns: Vec<Column<R>>, rows: Vec<R>) -> Self {
        Self::with_source(name, columns, RowSource::Rows(rows))
    }

    /// Sheet over a synchronous row supplier.
    pub fn with_supplier<F>(name: impl Into<String>, columns: Vec<Column<R>>, supplier: F) -> Self
    where
        F: Fn() -> Vec<R> + Send + Sync + 'static,
    {
        Self::with_source(name, columns, RowSource::Supplier(Box::new(supplier)))
    }

    /// Sheet over an asynchronous row supplier. Requires the asynchronous
    /// write entry point; the synchronous one reports a usage error.
    pub fn with_async_supplier<F, Fut>(
        name: impl Into<String>,
        columns: Vec<Column<R>>,
        supplier: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<R>> + Send + 'static,
    {
        Self::with_source(
            name,
            columns,
            RowSource::Async(Box::new(move || Box::pin(supplier()))),
        )
    }

    fn with_source(name: impl Into<String>, columns: Vec<Column<R>>, source: RowSource<R>) -> Self {
        Self {
            name: name.into(),
            columns,
            source,
            rows: None,
            style: SheetStyle::default(),
        }
    }

    pub fn style(mut self, style: SheetStyle) -> Self {
        self.style = style;
        self
    }

    pub fn row_height(mut self, height: f64) -> Self {
        self.style.row_height = Some(height);
        self
    }

    pub fn header_style(mut self, style: Style) -> Self {
        self.style.header_style = Some(style);
        self
    }

    pub fn freeze_header(mut self) -> Self {
        self.style.freeze_header = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static fact of configuration, not load state.
    pub fn has_async_source(&self) -> bool {
        matches!(self.source, RowSource::Async(_))
    }

    pub fn is_loaded(&self) -> bool {
        self.rows.is_some()
    }

    /// Load rows through the synchronous path. Idempotent once loaded; a
    /// sheet configured with only an asynchronous supplier is a usage error
    /// here.
    pub fn load_rows(&mut self) -> Result<&[R], WriteError> {
        if self.rows.is_none() {
            let rows = match &mut self.source {
                RowSource::Rows(rows) => std::mem::take(rows),
                RowSource::Supplier(supplier) => supplier(),
                RowSource::Async(_) => {
                    return Err(WriteError::AsyncSourceOnly {
                        sheet: self.name.clone(),
                    })
                }
            };
            debug!(sheet = %self.name, rows = rows.len(), "sheet rows loaded");
            self.rows = Some(rows);
        }
        Ok(self.rows.as_deref().unwrap_or_default())
    }

    /// Load rows, awaiting an asynchronous supplier when configured and
    /// falling back to the synchronous path (without suspension) otherwise.
    /// Idempotent once loaded.
    pub async fn load_rows_async(&mut self) -> &[R] {
        if self.rows.is_none() {
            let rows = match &mut self.source {
                RowSource::Rows(rows) => std::mem::take(rows),
                RowSource::Supplier(supplier) => supplier(),
                RowSource::Async(supplier) => {
                    let pending = supplier();
                    pending.await
                }
            };
            debug!(sheet = %self.name, rows = rows.len(), "sheet rows loaded");
            self.rows = Some(rows);
        }
        self.rows.as_deref().unwrap_or_default()
    }

    fn emit_worksheet(
        &self,
        book_style: &BookStyle,
        styles: &mut StyleRegistry,
        strings: &mut SharedStringRegistry,
    ) -> Result<String, WriteError> {
        let rows = self.rows.as_deref().ok_or_else(|| {
            WriteError::Invalid(format!("sheet {:?} generated before loading rows", self.name))
        })?;

        // Filters are declared per column but reject whole rows; every
        // column must admit a row for it to be emitted.
        let retained: Vec<&R> = rows
            .iter()
            .filter(|row| self.columns.iter().all(|col| col.admits(row)))
            .collect();
        debug!(
            sheet = %self.name,
            rows = rows.len(),
            retained = retained.len(),
            columns = self.columns.len(),
            "generating worksheet part"
        );

        let header_style = self
            .style
            .header_style
            .clone()
            .unwrap_or_else(|| book_style.header_style.clone());
        let header_xf = styles.register(&header_style);

        let mut sheet_data = String::new();
        sheet_data.push_str(r#"    <row r="1">"#);
        for (col_idx, column) in self.columns.iter().enumerate() {
            sheet_data.push_str(&header_cell_xml(col_idx as u32, column.name(), header_xf));
        }
        sheet_data.push_str("</row>\n");

        let row_height_attrs = match self.style.row_height {
            Some(height) => format!(r#" ht="{height}" customHeight="1""#),
            None => String::new(),
        };

        for (row_idx, row) in retained.iter().enumerate() {
            let row_number = row_idx as u32 + 2;
            sheet_data.push_str(&format!(r#"    <row r="{row_number}"{row_height_attrs}>"#));
            for (col_idx, column) in self.columns.iter().enumerate() {
                let (value, override_style) =
                    column.evaluate(row).map_err(|err| WriteError::Data {
                        sheet: self.name.clone(),
                        column: column.name().to_string(),
                        message: err.message,
                    })?;
                let resolved =
                    resolve_cell_style(&value, override_style, column.style(), book_style);
                let xf = match resolved {
                    Some(style) => styles.register(&style),
                    None => 0,
                };
                sheet_data.push_str(&cell_xml(
                    row_number - 1,
                    col_idx as u32,
                    &value,
                    xf,
                    strings,
                ));
            }
            sheet_data.push_str("</row>\n");
        }

        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
        xml.push('\n');

        if self.style.freeze_header {
            xml.push_str("  <sheetViews><sheetView workbookViewId=\"0\"><pane ySplit=\"1\" topLeftCell=\"A2\" activePane=\"bottomLeft\" state=\"frozen\"/></sheetView></sheetViews>\n");
        }
        if let Some(height) = self.style.row_height {
            xml.push_str(&format!(
                "  <sheetFormatPr defaultRowHeight=\"{height}\" customHeight=\"1\"/>\n"
            ));
        }

        let widths: Vec<(usize, f64)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, col)| col.width().map(|w| (idx, w)))
            .collect();
        if !widths.is_empty() {
            xml.push_str("  <cols>");
            for (idx, width) in widths {
                xml.push_str(&format!(
                    r#"<col min="{0}" max="{0}" width="{1}" customWidth="1"/>"#,
                    idx + 1,
                    width
                ));
            }
            xml.push_str("</cols>\n");
        }

        xml.push_str("  <sheetData>\n");
        xml.push_str(&sheet_data);
        xml.push_str("  </sheetData>\n");
        xml.push_str("</worksheet>\n");
        Ok(xml)
    }
}

/// Object-safe view of a sheet so a book can hold heterogeneous row types in
/// one ordered collection.
pub trait AnySheet: Send {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn column_count(&self) -> usize;
    fn has_async_source(&self) -> bool;
    /// Loaded row count, `None` before the first load.
    fn row_count(&self) -> Option<usize>;
    /// Synchronous load; returns the cached row count.
    fn load(&mut self) -> Result<usize, WriteError>;
    /// Asynchronous load with synchronous fallback; returns the cached row
    /// count.
    fn load_async(&mut self) -> BoxFuture<'_, Result<usize, WriteError>>;
    /// Emit the worksheet part, interning styles/strings into the pass
    /// registries.
    fn worksheet_xml(
        &self,
        book_style: &BookStyle,
        styles: &mut StyleRegistry,
        strings: &mut SharedStringRegistry,
    ) -> Result<String, WriteError>;
}

impl<R: Send + 'static> AnySheet for Sheet<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn has_async_source(&self) -> bool {
        Sheet::has_async_source(self)
    }

    fn row_count(&self) -> Option<usize> {
        self.rows.as_ref().map(Vec::len)
    }

    fn load(&mut self) -> Result<usize, WriteError> {
        self.load_rows().map(<[R]>::len)
    }

    fn load_async(&mut self) -> BoxFuture<'_, Result<usize, WriteError>> {
        Box::pin(async move { Ok(self.load_rows_async().await.len()) })
    }

    fn worksheet_xml(
        &self,
        book_style: &BookStyle,
        styles: &mut StyleRegistry,
        strings: &mut SharedStringRegistry,
    ) -> Result<String, WriteError> {
        self.emit_worksheet(book_style, styles, strings)
    }
}

/// Pick the style attached to one cell: per-cell override, then column
/// style, then the book-level defaults that date and link cells require.
fn resolve_cell_style(
    value: &CellValue,
    override_style: Option<Style>,
    column_style: Option<&Style>,
    book_style: &BookStyle,
) -> Option<Style> {
    let base = override_style.or_else(|| column_style.cloned());
    match value {
        CellValue::DateTime(_) => {
            // Serial numbers are meaningless without a date format.
            let mut style = base.unwrap_or_default();
            if style.number_format.is_none() {
                style.number_format = Some(book_style.date_format.clone());
            }
            Some(style)
        }
        CellValue::Url(_) => Some(base.unwrap_or_else(|| book_style.url_style.clone())),
        _ => base,
    }
}

fn header_cell_xml(col: u32, name: &str, xf: u32) -> String {
    // Header labels are one-off, so they are inlined instead of going
    // through the shared-string table.
    format!(
        r#"<c r="{}" t="inlineStr" s="{}"><is><t>{}</t></is></c>"#,
        cell_reference(0, col),
        xf,
        escape_xml(name)
    )
}

fn cell_xml(
    row: u32,
    col: u32,
    value: &CellValue,
    xf: u32,
    strings: &mut SharedStringRegistry,
) -> String {
    let reference = cell_reference(row, col);
    let style_attr = if xf != 0 {
        format!(r#" s="{xf}""#)
    } else {
        String::new()
    };
    match value {
        CellValue::Empty => {
            if xf != 0 {
                format!(r#"<c r="{reference}"{style_attr}/>"#)
            } else {
                String::new()
            }
        }
        CellValue::Text(text) => {
            let idx = strings.register(text);
            format!(r#"<c r="{reference}" t="s"{style_attr}><v>{idx}</v></c>"#)
        }
        CellValue::Integer(n) => {
            format!(r#"<c r="{reference}"{style_attr}><v>{n}</v></c>"#)
        }
        CellValue::Float(x) => {
            format!(r#"<c r="{reference}"{style_attr}><v>{x}</v></c>"#)
        }
        CellValue::Boolean(b) => {
            format!(
                r#"<c r="{reference}" t="b"{style_attr}><v>{}</v></c>"#,
                if *b { 1 } else { 0 }
            )
        }
        CellValue::DateTime(dt) => {
            format!(
                r#"<c r="{reference}"{style_attr}><v>{}</v></c>"#,
                serial::serial_string(*dt)
            )
        }
        CellValue::Url(url) => {
            let idx = strings.register(url);
            format!(r#"<c r="{reference}" t="s"{style_attr}><v>{idx}</v></c>"#)
        }
        CellValue::Formula(formula) => {
            format!(
                r#"<c r="{reference}"{style_attr}><f>{}</f></c>"#,
                escape_xml(formula)
            )
        }
    }
}
