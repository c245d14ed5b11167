//! `xl/sharedStrings.xml` assembly.
//!
//! String cell contents are stored once in a shared table and referenced by
//! index from worksheet cells. The table preserves first-seen order and
//! tracks the total number of references (every `register` call counts, cache
//! hits included) for the part's `count` attribute.

use std::collections::HashMap;

use tracing::debug;

use crate::xml::escape_xml;

/// Deduplicating shared-string table scoped to one workbook write pass.
#[derive(Debug, Default)]
pub struct SharedStringRegistry {
    values: Vec<String>,
    index: HashMap<String, u32>,
    total: u64,
}

impl SharedStringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its stable table index.
    pub fn register(&mut self, value: &str) -> u32 {
        self.total += 1;
        if let Some(&idx) = self.index.get(value) {
            return idx;
        }
        let idx = self.values.len() as u32;
        self.values.push(value.to_string());
        self.index.insert(value.to_string(), idx);
        idx
    }

    pub fn get_index(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    pub fn unique_count(&self) -> usize {
        self.values.len()
    }

    /// Total number of `register` calls, cache hits included.
    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Serialize the `xl/sharedStrings.xml` part, entries in insertion order.
    pub fn finalize(&self) -> String {
        debug!(
            unique = self.values.len(),
            total = self.total,
            "finalizing shared strings part"
        );

        let mut out = String::new();
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push('\n');
        out.push_str(&format!(
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
            self.total,
            self.values.len()
        ));
        out.push('\n');
        for value in &self.values {
            out.push_str("  ");
            out.push_str(&si_xml(value));
            out.push('\n');
        }
        out.push_str("</sst>\n");
        out
    }
}

fn si_xml(value: &str) -> String {
    // Leading/trailing whitespace is significant in cell text and must be
    // pinned with xml:space, or consumers will trim it.
    let needs_preserve = value
        .chars()
        .next()
        .is_some_and(char::is_whitespace)
        || value.chars().next_back().is_some_and(char::is_whitespace);
    if needs_preserve {
        format!(
            r#"<si><t xml:space="preserve">{}</t></si>"#,
            escape_xml(value)
        )
    } else {
        format!(r#"<si><t>{}</t></si>"#, escape_xml(value))
    }
}
