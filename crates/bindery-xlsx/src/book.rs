//! Workbook orchestration.
//!
//! A [`Book`] owns workbook-wide style defaults and an ordered list of
//! type-erased sheets. `write` / `write_async` run one generation pass:
//! construct fresh registries, load every sheet (sync path or async path with
//! sync fallback), emit worksheet parts in declaration order, finalize the
//! registries, and package everything into a zip container. Registries live
//! exactly as long as the pass and are never shared between passes.

use std::path::{Path, PathBuf};

use bindery_model::{
    sanitize_sheet_name, Color, Font, NumberFormat, SheetNameOptions, Style,
    EXCEL_MAX_SHEET_NAME_LEN,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::package;
use crate::shared_strings::SharedStringRegistry;
use crate::sheet::{AnySheet, Sheet};
use crate::styles::StyleRegistry;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("sheet {sheet:?} only has an asynchronous row source; use write_async")]
    AsyncSourceOnly { sheet: String },
    #[error("column {column:?} on sheet {sheet:?} failed: {message}")]
    Data {
        sheet: String,
        column: String,
        message: String,
    },
    #[error("could not persist output file: {0}")]
    Persist(String),
    #[error("invalid workbook: {0}")]
    Invalid(String),
}

/// Workbook-wide style defaults.
#[derive(Clone, Debug)]
pub struct BookStyle {
    /// Font 0 of the styles part, used by every unstyled cell.
    pub default_font: Font,
    /// Applied to header rows unless a sheet overrides it.
    pub header_style: Style,
    /// Number format injected into date cells that carry no explicit one.
    pub date_format: NumberFormat,
    /// Applied to url cells that carry no explicit style.
    pub url_style: Style,
}

impl Default for BookStyle {
    fn default() -> Self {
        let default_font = Font::named("Calibri", 11);
        Self {
            header_style: Style::default().with_font(default_font.clone().bold()),
            date_format: NumberFormat::DateTime,
            url_style: Style::default().with_font(Font {
                underline: true,
                color: Some(Color::new_argb(0xFF0563C1)),
                ..default_font.clone()
            }),
            default_font,
        }
    }
}

/// Discrete stage events observable during a write.
///
/// The sequence is ordered and replayed exactly once per write call;
/// observing it is optional and has no effect on the write itself.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum WriteEvent {
    SheetLoaded {
        index: usize,
        name: String,
        rows: usize,
    },
    SheetWritten {
        index: usize,
        name: String,
    },
    StylesFinalized {
        styles: usize,
    },
    SharedStringsFinalized {
        unique: usize,
        total: u64,
    },
    PackageWritten {
        path: PathBuf,
    },
}

/// Ordered collection of sheets plus workbook-level configuration.
pub struct Book {
    style: BookStyle,
    name_options: SheetNameOptions,
    sheets: Vec<Box<dyn AnySheet>>,
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

impl Book {
    pub fn new() -> Self {
        Self::with_style(BookStyle::default())
    }

    pub fn with_style(style: BookStyle) -> Self {
        Self {
            style,
            name_options: SheetNameOptions::default(),
            sheets: Vec::new(),
        }
    }

    /// Replace the sheet-name sanitizer configuration.
    pub fn name_options(mut self, options: SheetNameOptions) -> Self {
        self.name_options = options;
        self
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets
            .iter()
            .map(|sheet| sheet.name().to_string())
            .collect()
    }

    /// Append a sheet. Its name is sanitized and, on collision with an
    /// existing sheet, suffixed (`Name`, `Name 2`, …) until unique.
    pub fn append<R: Send + 'static>(&mut self, sheet: Sheet<R>) {
        self.append_boxed(Box::new(sheet));
    }

    /// Append an already type-erased sheet; used for heterogeneous batches.
    pub fn append_boxed(&mut self, mut sheet: Box<dyn AnySheet>) {
        let name = self.unique_sheet_name(sheet.name());
        sheet.set_name(name);
        self.sheets.push(sheet);
    }

    fn unique_sheet_name(&self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw, &self.name_options);
        let taken =
            |candidate: &str| self.sheets.iter().any(|sheet| sheet.name() == candidate);
        if !taken(&base) {
            return base;
        }
        let mut ordinal = 2usize;
        loop {
            let suffix = format!(" {ordinal}");
            let kept: String = base
                .chars()
                .take(EXCEL_MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count()))
                .collect();
            let candidate = format!("{kept}{suffix}");
            if !taken(&candidate) {
                return candidate;
            }
            ordinal += 1;
        }
    }

    /// Write the workbook synchronously.
    ///
    /// Every sheet is loaded through the synchronous path; a sheet with only
    /// an asynchronous source is a usage error, not a silent skip. The
    /// destination is replaced atomically and its extension normalized to
    /// `.xlsx`. Returns the written location.
    pub fn write(&mut self, path: impl AsRef<Path>) -> Result<PathBuf, WriteError> {
        self.write_with_progress(path, None)
    }

    /// [`write`](Self::write) with optional progress events.
    pub fn write_with_progress(
        &mut self,
        path: impl AsRef<Path>,
        progress: Option<UnboundedSender<WriteEvent>>,
    ) -> Result<PathBuf, WriteError> {
        for (index, sheet) in self.sheets.iter_mut().enumerate() {
            let rows = sheet.load()?;
            emit(
                &progress,
                WriteEvent::SheetLoaded {
                    index,
                    name: sheet.name().to_string(),
                    rows,
                },
            );
        }
        self.assemble(path.as_ref(), &progress)
    }

    /// Write the workbook, awaiting asynchronous row sources.
    ///
    /// Sheets are processed strictly in declaration order; sheets with
    /// synchronous sources load without suspension. Output is identical to
    /// [`write`](Self::write) for books without asynchronous sources.
    pub async fn write_async(&mut self, path: impl AsRef<Path>) -> Result<PathBuf, WriteError> {
        self.write_async_with_progress(path, None).await
    }

    /// [`write_async`](Self::write_async) with optional progress events.
    pub async fn write_async_with_progress(
        &mut self,
        path: impl AsRef<Path>,
        progress: Option<UnboundedSender<WriteEvent>>,
    ) -> Result<PathBuf, WriteError> {
        for (index, sheet) in self.sheets.iter_mut().enumerate() {
            let rows = sheet.load_async().await?;
            emit(
                &progress,
                WriteEvent::SheetLoaded {
                    index,
                    name: sheet.name().to_string(),
                    rows,
                },
            );
        }
        self.assemble(path.as_ref(), &progress)
    }

    /// Generation + packaging, shared by both entry points. Registries are
    /// constructed here and dropped when the pass completes.
    fn assemble(
        &self,
        path: &Path,
        progress: &Option<UnboundedSender<WriteEvent>>,
    ) -> Result<PathBuf, WriteError> {
        let path = normalized_destination(path);
        debug!(sheets = self.sheets.len(), path = %path.display(), "assembling workbook package");
        let mut styles = StyleRegistry::new(&self.style.default_font);
        let mut strings = SharedStringRegistry::new();

        let mut sheet_parts = Vec::with_capacity(self.sheets.len());
        for (index, sheet) in self.sheets.iter().enumerate() {
            let xml = sheet.worksheet_xml(&self.style, &mut styles, &mut strings)?;
            debug!(
                sheet = sheet.name(),
                columns = sheet.column_count(),
                rows = sheet.row_count().unwrap_or(0),
                "worksheet part generated"
            );
            sheet_parts.push(xml);
            emit(
                progress,
                WriteEvent::SheetWritten {
                    index,
                    name: sheet.name().to_string(),
                },
            );
        }

        let styles_xml = styles.finalize();
        emit(
            progress,
            WriteEvent::StylesFinalized {
                styles: styles.xf_count(),
            },
        );
        let shared_strings_xml = strings.finalize();
        emit(
            progress,
            WriteEvent::SharedStringsFinalized {
                unique: strings.unique_count(),
                total: strings.total_count(),
            },
        );

        let names = self.sheet_names();
        package::write_package(
            &path,
            &package::PackageParts {
                sheet_names: &names,
                sheet_xml: &sheet_parts,
                styles_xml: &styles_xml,
                shared_strings_xml: &shared_strings_xml,
            },
        )?;
        emit(progress, WriteEvent::PackageWritten { path: path.clone() });
        Ok(path)
    }
}

fn normalized_destination(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "xlsx") {
        path.to_path_buf()
    } else {
        debug!(path = %path.display(), "normalizing destination extension to .xlsx");
        path.with_extension("xlsx")
    }
}

fn emit(progress: &Option<UnboundedSender<WriteEvent>>, event: WriteEvent) {
    if let Some(sender) = progress {
        // Progress observation is optional; a dropped receiver must not
        // fail the write.
        let _ = sender.send(event);
    }
}
