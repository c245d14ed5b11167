//! Worksheet-name rules.
//!
//! Excel limits worksheet names to 31 characters and rejects a small set of
//! characters. The sanitizer is pure and deterministic; cross-sheet
//! uniqueness is the workbook's responsibility, applied after sanitization.

use std::collections::HashMap;

use thiserror::Error;

/// Maximum worksheet name length accepted by Excel.
pub const EXCEL_MAX_SHEET_NAME_LEN: usize = 31;

/// Characters Excel rejects in worksheet names.
pub const DISALLOWED_SHEET_NAME_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SheetNameError {
    #[error("sheet name is empty")]
    Empty,
    #[error("sheet name exceeds {EXCEL_MAX_SHEET_NAME_LEN} characters")]
    TooLong,
    #[error("sheet name contains disallowed character {0:?}")]
    DisallowedChar(char),
}

/// How disallowed characters are handled during sanitization.
#[derive(Clone, Debug, Default)]
pub enum InvalidCharStrategy {
    /// Delete every disallowed character.
    #[default]
    Remove,
    /// Replace mapped characters; unmapped disallowed characters are still
    /// removed.
    Replace(HashMap<char, char>),
}

/// Sanitizer configuration.
#[derive(Clone, Debug)]
pub struct SheetNameOptions {
    /// Name used when sanitization leaves nothing behind.
    pub default_name: String,
    pub strategy: InvalidCharStrategy,
}

impl Default for SheetNameOptions {
    fn default() -> Self {
        Self {
            default_name: "Sheet".to_string(),
            strategy: InvalidCharStrategy::Remove,
        }
    }
}

/// Check a name against Excel's worksheet-name rules without modifying it.
pub fn validate_sheet_name(name: &str) -> Result<(), SheetNameError> {
    if name.is_empty() {
        return Err(SheetNameError::Empty);
    }
    if name.chars().count() > EXCEL_MAX_SHEET_NAME_LEN {
        return Err(SheetNameError::TooLong);
    }
    if let Some(ch) = name.chars().find(|ch| DISALLOWED_SHEET_NAME_CHARS.contains(ch)) {
        return Err(SheetNameError::DisallowedChar(ch));
    }
    Ok(())
}

/// Produce a valid worksheet name from arbitrary input.
///
/// Steps, in order: strip one leading and one trailing single quote (interior
/// quotes are kept), apply the configured strategy to disallowed characters,
/// truncate to [`EXCEL_MAX_SHEET_NAME_LEN`] characters. An empty result
/// resolves to the configured default name.
pub fn sanitize_sheet_name(name: &str, options: &SheetNameOptions) -> String {
    let name = name.strip_prefix('\'').unwrap_or(name);
    let name = name.strip_suffix('\'').unwrap_or(name);

    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if DISALLOWED_SHEET_NAME_CHARS.contains(&ch) {
            if let InvalidCharStrategy::Replace(map) = &options.strategy {
                if let Some(replacement) = map.get(&ch) {
                    out.push(*replacement);
                }
            }
        } else {
            out.push(ch);
        }
    }

    let out: String = out.chars().take(EXCEL_MAX_SHEET_NAME_LEN).collect();
    if out.is_empty() {
        options.default_name.clone()
    } else {
        out
    }
}
