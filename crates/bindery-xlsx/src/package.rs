//! OPC container assembly.
//!
//! The fixed scaffolding parts (`[Content_Types].xml`, the package and
//! workbook relationship parts, `xl/workbook.xml`) plus the generated
//! worksheet/styles/sharedStrings parts are written into a zip container.
//! The zip is built in a sibling temp file and persisted over the
//! destination on success, so a failed write never leaves a partial file in
//! place of a previously valid one.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::book::WriteError;
use crate::xml::escape_xml;

/// Generated parts handed over by the book pass.
pub(crate) struct PackageParts<'a> {
    pub sheet_names: &'a [String],
    pub sheet_xml: &'a [String],
    pub styles_xml: &'a str,
    pub shared_strings_xml: &'a str,
}

pub(crate) fn write_package(path: &Path, parts: &PackageParts<'_>) -> Result<(), WriteError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };

    {
        let mut zip = zip::ZipWriter::new(tmp.as_file_mut());
        let options = zip::write::FileOptions::<()>::default()
            .compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(content_types_xml(parts.sheet_xml.len()).as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(root_rels_xml().as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml(parts.sheet_names).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(workbook_rels_xml(parts.sheet_xml.len()).as_bytes())?;

        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(parts.styles_xml.as_bytes())?;

        zip.start_file("xl/sharedStrings.xml", options)?;
        zip.write_all(parts.shared_strings_xml.as_bytes())?;

        for (idx, sheet_xml) in parts.sheet_xml.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", idx + 1), options)?;
            zip.write_all(sheet_xml.as_bytes())?;
        }

        zip.finish()?;
    }

    tmp.persist(path)
        .map_err(|err| WriteError::Persist(err.to_string()))?;
    info!(path = %path.display(), "package written");
    Ok(())
}

fn root_rels_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
        .to_owned()
}

fn workbook_xml(sheet_names: &[String]) -> String {
    let mut sheets_xml = String::new();
    for (idx, name) in sheet_names.iter().enumerate() {
        let sheet_id = idx + 1;
        sheets_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_xml(name),
            sheet_id,
            sheet_id
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    {}
  </sheets>
</workbook>"#,
        sheets_xml
    )
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut rels = String::new();
    for idx in 0..sheet_count {
        let rel_id = idx + 1;
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            rel_id, rel_id
        ));
    }
    let mut next = sheet_count + 1;
    rels.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        next
    ));
    next += 1;
    rels.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        next
    ));

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  {}
</Relationships>"#,
        rels
    )
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut overrides = String::new();
    overrides.push_str(
        r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    overrides.push_str(
        r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    );
    overrides.push_str(
        r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#,
    );
    for idx in 0..sheet_count {
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            idx + 1
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  {}
</Types>"#,
        overrides
    )
}
