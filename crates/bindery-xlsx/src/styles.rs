//! `xl/styles.xml` assembly.
//!
//! XLSX stores cell formatting as integer indices into per-aspect tables
//! (fonts, fills, borders, number formats) plus a composite `cellXfs` table.
//! [`StyleRegistry`] interns every distinct value once and hands out stable
//! indices that worksheet cells embed verbatim. The format mandates two
//! baseline fills (`none` at index 0, `gray125` at index 1) plus a default
//! font/border/xf at index 0, so those are seeded before any user style is
//! registered.

use std::collections::HashMap;

use bindery_model::{
    Alignment, Border, BorderEdge, Color, Fill, Font, GradientKind, NumberFormat, PatternKind,
    Style,
};
use tracing::debug;

use crate::xml::escape_xml;

/// First `numFmtId` available for custom format codes; lower ids are
/// reserved for Excel's built-in formats.
pub const FIRST_CUSTOM_NUM_FMT_ID: u16 = 164;

/// Composite `xf` record: sub-table indices plus inline alignment.
#[derive(Clone, Debug, PartialEq)]
struct CellXf {
    num_fmt_id: u16,
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    alignment: Option<Alignment>,
}

/// Deduplicating style table scoped to one workbook write pass.
#[derive(Debug)]
pub struct StyleRegistry {
    fonts: Vec<Font>,
    font_index: HashMap<Font, u32>,
    fills: Vec<Fill>,
    fill_index: HashMap<Fill, u32>,
    borders: Vec<Border>,
    border_index: HashMap<Border, u32>,

    custom_num_fmts: Vec<(u16, String)>,
    num_fmt_id_by_code: HashMap<String, u16>,
    next_custom_num_fmt_id: u16,

    xfs: Vec<CellXf>,
    xf_index: HashMap<Style, u32>,
}

impl StyleRegistry {
    /// Create a registry seeded with the format-mandated baseline entries.
    ///
    /// `default_font` becomes font 0, referenced by every style that does not
    /// override the font.
    pub fn new(default_font: &Font) -> Self {
        let baseline_gray = Fill::Pattern {
            kind: PatternKind::Gray125,
            foreground: Color::black(),
            background: None,
        };

        let mut registry = Self {
            fonts: vec![default_font.clone()],
            font_index: HashMap::new(),
            fills: vec![Fill::None, baseline_gray],
            fill_index: HashMap::new(),
            borders: vec![Border::default()],
            border_index: HashMap::new(),
            custom_num_fmts: Vec::new(),
            num_fmt_id_by_code: HashMap::new(),
            next_custom_num_fmt_id: FIRST_CUSTOM_NUM_FMT_ID,
            xfs: vec![CellXf {
                num_fmt_id: 0,
                font_id: 0,
                fill_id: 0,
                border_id: 0,
                alignment: None,
            }],
            xf_index: HashMap::new(),
        };

        for (idx, font) in registry.fonts.iter().cloned().enumerate() {
            registry.font_index.entry(font).or_insert(idx as u32);
        }
        for (idx, fill) in registry.fills.iter().cloned().enumerate() {
            registry.fill_index.entry(fill).or_insert(idx as u32);
        }
        for (idx, border) in registry.borders.iter().copied().enumerate() {
            registry.border_index.entry(border).or_insert(idx as u32);
        }
        registry.xf_index.insert(Style::default(), 0);

        registry
    }

    /// Intern a composite style, returning its stable `cellXfs` index.
    ///
    /// Structurally equal styles always return the same index; indices are
    /// never reused for distinct values within a pass.
    pub fn register(&mut self, style: &Style) -> u32 {
        if let Some(&idx) = self.xf_index.get(style) {
            return idx;
        }

        let num_fmt_id = match &style.number_format {
            Some(format) => self.intern_number_format(format),
            None => 0,
        };
        let font_id = match &style.font {
            Some(font) => self.intern_font(font),
            None => 0,
        };
        let fill_id = match &style.fill {
            Some(fill) => self.intern_fill(fill),
            None => 0,
        };
        let border_id = match &style.border {
            Some(border) => self.intern_border(border),
            None => 0,
        };

        let idx = self.xfs.len() as u32;
        self.xfs.push(CellXf {
            num_fmt_id,
            font_id,
            fill_id,
            border_id,
            alignment: style.alignment.filter(|a| !a.is_default()),
        });
        self.xf_index.insert(style.clone(), idx);
        idx
    }

    fn intern_font(&mut self, font: &Font) -> u32 {
        if let Some(&idx) = self.font_index.get(font) {
            return idx;
        }
        let idx = self.fonts.len() as u32;
        self.fonts.push(font.clone());
        self.font_index.insert(font.clone(), idx);
        idx
    }

    fn intern_fill(&mut self, fill: &Fill) -> u32 {
        if let Some(&idx) = self.fill_index.get(fill) {
            return idx;
        }
        let idx = self.fills.len() as u32;
        self.fills.push(fill.clone());
        self.fill_index.insert(fill.clone(), idx);
        idx
    }

    fn intern_border(&mut self, border: &Border) -> u32 {
        if let Some(&idx) = self.border_index.get(border) {
            return idx;
        }
        let idx = self.borders.len() as u32;
        self.borders.push(*border);
        self.border_index.insert(*border, idx);
        idx
    }

    fn intern_number_format(&mut self, format: &NumberFormat) -> u16 {
        if let Some(id) = format.builtin_id() {
            return id;
        }
        let code = format.format_code();
        if let Some(&id) = self.num_fmt_id_by_code.get(&code) {
            return id;
        }
        let id = self.next_custom_num_fmt_id;
        self.next_custom_num_fmt_id += 1;
        self.custom_num_fmts.push((id, code.clone()));
        self.num_fmt_id_by_code.insert(code, id);
        id
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    pub fn border_count(&self) -> usize {
        self.borders.len()
    }

    pub fn xf_count(&self) -> usize {
        self.xfs.len()
    }

    pub fn custom_number_format_count(&self) -> usize {
        self.custom_num_fmts.len()
    }

    /// Serialize the complete `xl/styles.xml` part, all tables in
    /// registration order. Call once per pass, after every sheet has been
    /// generated.
    pub fn finalize(&self) -> String {
        debug!(
            fonts = self.fonts.len(),
            fills = self.fills.len(),
            borders = self.borders.len(),
            num_fmts = self.custom_num_fmts.len(),
            xfs = self.xfs.len(),
            "finalizing styles part"
        );

        let mut out = String::new();
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push('\n');
        out.push_str(
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );
        out.push('\n');

        if !self.custom_num_fmts.is_empty() {
            out.push_str(&format!(
                "  <numFmts count=\"{}\">",
                self.custom_num_fmts.len()
            ));
            for (id, code) in &self.custom_num_fmts {
                out.push_str(&format!(
                    r#"<numFmt numFmtId="{}" formatCode="{}"/>"#,
                    id,
                    escape_xml(code)
                ));
            }
            out.push_str("</numFmts>\n");
        }

        out.push_str(&format!("  <fonts count=\"{}\">", self.fonts.len()));
        for font in &self.fonts {
            out.push_str(&font_xml(font));
        }
        out.push_str("</fonts>\n");

        out.push_str(&format!("  <fills count=\"{}\">", self.fills.len()));
        for fill in &self.fills {
            out.push_str(&fill_xml(fill));
        }
        out.push_str("</fills>\n");

        out.push_str(&format!("  <borders count=\"{}\">", self.borders.len()));
        for border in &self.borders {
            out.push_str(&border_xml(border));
        }
        out.push_str("</borders>\n");

        out.push_str(
            r#"  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
        );
        out.push('\n');

        out.push_str(&format!("  <cellXfs count=\"{}\">", self.xfs.len()));
        for xf in &self.xfs {
            out.push_str(&xf_xml(xf));
        }
        out.push_str("</cellXfs>\n");

        out.push_str(
            r#"  <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
        );
        out.push('\n');
        out.push_str("</styleSheet>\n");
        out
    }
}

fn font_xml(font: &Font) -> String {
    let mut out = String::from("<font>");
    if font.bold {
        out.push_str("<b/>");
    }
    if font.italic {
        out.push_str("<i/>");
    }
    if font.underline {
        out.push_str("<u/>");
    }
    if font.strikethrough {
        out.push_str("<strike/>");
    }
    out.push_str(&format!(r#"<sz val="{}"/>"#, font_size_attr(font)));
    if let Some(color) = font.color {
        out.push_str(&format!(r#"<color rgb="{}"/>"#, color.to_rgba_hex()));
    }
    out.push_str(&format!(
        r#"<name val="{}"/>"#,
        escape_xml(font.name.as_deref().unwrap_or("Calibri"))
    ));
    out.push_str("</font>");
    out
}

fn font_size_attr(font: &Font) -> String {
    let size_100pt = font.size_100pt.unwrap_or(1100);
    if size_100pt % 100 == 0 {
        format!("{}", size_100pt / 100)
    } else {
        format!("{}", size_100pt as f64 / 100.0)
    }
}

fn fill_xml(fill: &Fill) -> String {
    match fill {
        Fill::None => r#"<fill><patternFill patternType="none"/></fill>"#.to_string(),
        Fill::Solid(color) => format!(
            r#"<fill><patternFill patternType="solid"><fgColor rgb="{}"/><bgColor indexed="64"/></patternFill></fill>"#,
            color.to_rgba_hex()
        ),
        Fill::Pattern {
            kind,
            foreground,
            background,
        } => {
            let mut out = format!(
                r#"<fill><patternFill patternType="{}"><fgColor rgb="{}"/>"#,
                kind.pattern_type(),
                foreground.to_rgba_hex()
            );
            if let Some(bg) = background {
                out.push_str(&format!(r#"<bgColor rgb="{}"/>"#, bg.to_rgba_hex()));
            }
            out.push_str("</patternFill></fill>");
            out
        }
        Fill::Gradient { kind, stops } => {
            let mut out = String::from("<fill><gradientFill");
            match kind {
                GradientKind::Linear { angle_degrees } => {
                    if *angle_degrees != 0 {
                        out.push_str(&format!(r#" degree="{angle_degrees}""#));
                    }
                }
                GradientKind::Path => out.push_str(r#" type="path""#),
            }
            out.push('>');
            let last = stops.len().saturating_sub(1).max(1);
            for (idx, color) in stops.iter().enumerate() {
                let position = idx as f64 / last as f64;
                out.push_str(&format!(
                    r#"<stop position="{}"><color rgb="{}"/></stop>"#,
                    position,
                    color.to_rgba_hex()
                ));
            }
            out.push_str("</gradientFill></fill>");
            out
        }
    }
}

fn border_xml(border: &Border) -> String {
    let mut out = String::from("<border>");
    out.push_str(&border_edge_xml("left", border.left));
    out.push_str(&border_edge_xml("right", border.right));
    out.push_str(&border_edge_xml("top", border.top));
    out.push_str(&border_edge_xml("bottom", border.bottom));
    out.push_str("<diagonal/>");
    out.push_str("</border>");
    out
}

fn border_edge_xml(tag: &str, edge: BorderEdge) -> String {
    match edge.style.style_attr() {
        None => format!("<{tag}/>"),
        Some(style) => {
            let color = match edge.color {
                Some(color) => format!(r#"<color rgb="{}"/>"#, color.to_rgba_hex()),
                None => r#"<color auto="1"/>"#.to_string(),
            };
            format!(r#"<{tag} style="{style}">{color}</{tag}>"#)
        }
    }
}

fn xf_xml(xf: &CellXf) -> String {
    let mut out = format!(
        r#"<xf numFmtId="{}" fontId="{}" fillId="{}" borderId="{}" xfId="0""#,
        xf.num_fmt_id, xf.font_id, xf.fill_id, xf.border_id
    );
    if xf.num_fmt_id != 0 {
        out.push_str(r#" applyNumberFormat="1""#);
    }
    if xf.font_id != 0 {
        out.push_str(r#" applyFont="1""#);
    }
    if xf.fill_id != 0 {
        out.push_str(r#" applyFill="1""#);
    }
    if xf.border_id != 0 {
        out.push_str(r#" applyBorder="1""#);
    }
    match &xf.alignment {
        Some(alignment) => {
            out.push_str(r#" applyAlignment="1">"#);
            out.push_str(&alignment_xml(alignment));
            out.push_str("</xf>");
        }
        None => out.push_str("/>"),
    }
    out
}

fn alignment_xml(alignment: &Alignment) -> String {
    let mut out = String::from("<alignment");
    if let Some(h) = alignment.horizontal {
        out.push_str(&format!(r#" horizontal="{}""#, h.as_attr()));
    }
    if let Some(v) = alignment.vertical {
        out.push_str(&format!(r#" vertical="{}""#, v.as_attr()));
    }
    if alignment.wrap_text {
        out.push_str(r#" wrapText="1""#);
    }
    if alignment.text_rotation != 0 {
        out.push_str(&format!(r#" textRotation="{}""#, alignment.text_rotation));
    }
    out.push_str("/>");
    out
}
