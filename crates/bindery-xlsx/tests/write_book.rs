//! End-to-end package tests: write a workbook, then read the zip back and
//! inspect its parts.

use std::io::Read;

use bindery_model::{Color, Fill, Style};
use bindery_xlsx::{Book, CellError, Column, Sheet, WriteError, WriteEvent};
use pretty_assertions::assert_eq;
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Clone)]
struct Employee {
    name: String,
    rating: Option<f64>,
    active: bool,
}

fn staff() -> Vec<Employee> {
    vec![
        Employee {
            name: "Ada".to_string(),
            rating: Some(4.5),
            active: true,
        },
        Employee {
            name: "Grace".to_string(),
            rating: None,
            active: true,
        },
        Employee {
            name: "Ada".to_string(),
            rating: Some(3.0),
            active: false,
        },
    ]
}

fn staff_columns() -> Vec<Column<Employee>> {
    vec![
        Column::new("Name", |e: &Employee| e.name.clone()).build(),
        Column::optional("Rating", |e: &Employee| e.rating)
            .default_value(0.0)
            .build(),
    ]
}

fn zip_part_to_string(path: &std::path::Path, part_name: &str) -> String {
    let file = std::fs::File::open(path).expect("open package");
    let mut archive = zip::ZipArchive::new(file).expect("open zip");
    let mut part = archive.by_name(part_name).expect("part missing");
    let mut xml = String::new();
    part.read_to_string(&mut xml).expect("read part");
    xml
}

fn zip_part_names(path: &std::path::Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("open package");
    let archive = zip::ZipArchive::new(file).expect("open zip");
    archive.file_names().map(str::to_string).collect()
}

#[derive(Debug, Default, Clone, PartialEq)]
struct CellSnapshot {
    reference: String,
    cell_type: Option<String>,
    style: Option<String>,
    value: Option<String>,
}

/// Flatten a worksheet part into `(reference, t, s, text)` snapshots, in
/// document order. Inline-string text lands in `value` like `<v>` text does.
fn worksheet_cells(xml: &str) -> Vec<CellSnapshot> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut cells = Vec::new();
    let mut current: Option<CellSnapshot> = None;
    let mut in_text = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).expect("xml parse") {
            Event::Empty(e) if e.name().as_ref() == b"c" => {
                cells.push(cell_snapshot_from_attrs(&e));
            }
            Event::Start(e) if e.name().as_ref() == b"c" => {
                current = Some(cell_snapshot_from_attrs(&e));
            }
            Event::Start(e)
                if matches!(e.name().as_ref(), b"v" | b"t") && current.is_some() =>
            {
                in_text = true;
            }
            Event::Text(t) if in_text => {
                if let Some(cell) = current.as_mut() {
                    let mut text = cell.value.take().unwrap_or_default();
                    text.push_str(&t.unescape().expect("unescape").into_owned());
                    cell.value = Some(text);
                }
            }
            Event::End(e) if matches!(e.name().as_ref(), b"v" | b"t") => {
                in_text = false;
            }
            Event::End(e) if e.name().as_ref() == b"c" => {
                if let Some(cell) = current.take() {
                    cells.push(cell);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    cells
}

fn cell_snapshot_from_attrs(e: &quick_xml::events::BytesStart<'_>) -> CellSnapshot {
    let mut cell = CellSnapshot::default();
    for attr in e.attributes() {
        let attr = attr.expect("attribute");
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"r" => cell.reference = value,
            b"t" => cell.cell_type = Some(value),
            b"s" => cell.style = Some(value),
            _ => {}
        }
    }
    cell
}

fn shared_string_items(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut items = Vec::new();
    let mut in_t = false;
    let mut pending = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).expect("xml parse") {
            Event::Start(e) if e.name().as_ref() == b"t" => {
                in_t = true;
                pending.clear();
            }
            Event::Text(t) if in_t => {
                pending.push_str(&t.unescape().expect("unescape").into_owned());
            }
            Event::End(e) if e.name().as_ref() == b"t" => {
                in_t = false;
                items.push(pending.clone());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    items
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn writes_a_complete_package() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let mut book = Book::new();
    book.append(Sheet::new("Staff", staff_columns(), staff()));
    let path = book.write(dir.path().join("staff")).expect("write");

    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));
    let names = zip_part_names(&path);
    for required in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/styles.xml",
        "xl/sharedStrings.xml",
        "xl/worksheets/sheet1.xml",
    ] {
        assert!(names.iter().any(|n| n == required), "missing {required}");
    }
}

#[test]
fn end_to_end_rows_defaults_and_shared_strings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut book = Book::new();
    book.append(Sheet::new("Staff", staff_columns(), staff()));
    let path = book.write(dir.path().join("staff")).expect("write");

    let sheet_xml = zip_part_to_string(&path, "xl/worksheets/sheet1.xml");
    let cells = worksheet_cells(&sheet_xml);

    // Header plus exactly three data rows, two cells each.
    assert_eq!(cells.len(), 8);
    let header: Vec<_> = cells
        .iter()
        .filter(|c| c.reference.ends_with('1'))
        .collect();
    assert_eq!(header[0].value.as_deref(), Some("Name"));
    assert_eq!(header[1].value.as_deref(), Some("Rating"));

    // The nil rating renders as the configured 0.0 default.
    let b3 = cells
        .iter()
        .find(|c| c.reference == "B3")
        .expect("B3 present");
    assert_eq!(b3.value.as_deref(), Some("0"));

    // Shared strings hold exactly the distinct data strings, first-seen
    // order; headers are inlined and stay out of the table.
    let sst = zip_part_to_string(&path, "xl/sharedStrings.xml");
    assert_eq!(
        shared_string_items(&sst),
        vec!["Ada".to_string(), "Grace".to_string()]
    );
    assert!(sst.contains(r#"count="3" uniqueCount="2""#));

    // String cells reference the deduplicated indices.
    let a2 = cells.iter().find(|c| c.reference == "A2").expect("A2");
    let a4 = cells.iter().find(|c| c.reference == "A4").expect("A4");
    assert_eq!(a2.cell_type.as_deref(), Some("s"));
    assert_eq!(a2.value, a4.value);
}

#[test]
fn row_and_column_ordering_follows_declaration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut book = Book::new();
    book.append(Sheet::new("Staff", staff_columns(), staff()));
    let path = book.write(dir.path().join("order")).expect("write");

    let sheet_xml = zip_part_to_string(&path, "xl/worksheets/sheet1.xml");
    let cells = worksheet_cells(&sheet_xml);
    let references: Vec<&str> = cells.iter().map(|c| c.reference.as_str()).collect();
    assert_eq!(
        references,
        vec!["A1", "B1", "A2", "B2", "A3", "B3", "A4", "B4"]
    );
}

#[test]
fn filters_drop_whole_rows_across_all_columns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let columns = vec![
        Column::new("Name", |e: &Employee| e.name.clone()).build(),
        Column::optional("Rating", |e: &Employee| e.rating)
            .default_value(0.0)
            .filter(|e: &Employee| e.active)
            .build(),
    ];
    let mut book = Book::new();
    book.append(Sheet::new("Staff", columns, staff()));
    let path = book.write(dir.path().join("filtered")).expect("write");

    let sheet_xml = zip_part_to_string(&path, "xl/worksheets/sheet1.xml");
    let cells = worksheet_cells(&sheet_xml);
    // Two retained rows: the inactive third employee loses the whole row,
    // not just the filtered column's cell.
    let references: Vec<&str> = cells.iter().map(|c| c.reference.as_str()).collect();
    assert_eq!(references, vec!["A1", "B1", "A2", "B2", "A3", "B3"]);
}

#[test]
fn data_errors_fail_the_write_and_keep_the_previous_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("report.xlsx");

    let mut first = Book::new();
    first.append(Sheet::new("Staff", staff_columns(), staff()));
    first.write(&target).expect("first write");
    let before = std::fs::read(&target).expect("read first output");

    let failing = vec![Column::try_new("Rating", |e: &Employee| {
        e.rating
            .ok_or_else(|| CellError::new("rating missing"))
    })
    .build()];
    let mut second = Book::new();
    second.append(Sheet::new("Staff", failing, staff()));
    let err = second.write(&target).expect_err("accessor failure");
    match err {
        WriteError::Data {
            sheet,
            column,
            message,
        } => {
            assert_eq!(sheet, "Staff");
            assert_eq!(column, "Rating");
            assert_eq!(message, "rating missing");
        }
        other => panic!("unexpected error: {other}"),
    }

    let after = std::fs::read(&target).expect("read after failed write");
    assert_eq!(before, after, "failed write must not clobber the target");
}

#[test]
fn styles_and_dates_land_in_the_package() {
    let dir = tempfile::tempdir().expect("tempdir");
    let hired = date_at(2024, 3, 15, 9, 30);
    let highlight = Style::default().with_fill(Fill::Solid(Color::rgb(0xFF, 0xE0, 0xE0)));
    let rule_style = highlight.clone();

    let columns = vec![
        Column::new("Name", |e: &Employee| e.name.clone())
            .cell_style(move |e| e.rating.is_none().then(|| rule_style.clone()))
            .build(),
        Column::new("Hired", move |_e: &Employee| hired).build(),
    ];
    let mut book = Book::new();
    book.append(Sheet::new("Staff", columns, staff()));
    let path = book.write(dir.path().join("styled")).expect("write");

    let styles_xml = zip_part_to_string(&path, "xl/styles.xml");
    // Reserved baseline fills, then the per-cell highlight fill.
    assert!(styles_xml.contains(r#"patternType="none""#));
    assert!(styles_xml.contains(r#"patternType="gray125""#));
    assert!(styles_xml.contains(r#"<fgColor rgb="FFFFE0E0"/>"#));
    // Date cells pick up the book-level date format (built-in id 22).
    assert!(styles_xml.contains(r#"numFmtId="22""#));

    let sheet_xml = zip_part_to_string(&path, "xl/worksheets/sheet1.xml");
    let cells = worksheet_cells(&sheet_xml);
    let hired_cell = cells.iter().find(|c| c.reference == "B2").expect("B2");
    assert_eq!(hired_cell.value.as_deref(), Some("45366.3958"));
    assert!(hired_cell.style.is_some());

    // Only the nil-rating row's name cell carries the highlight style.
    let a2 = cells.iter().find(|c| c.reference == "A2").expect("A2");
    let a3 = cells.iter().find(|c| c.reference == "A3").expect("A3");
    assert_eq!(a2.style, None);
    assert!(a3.style.is_some());
}

#[test]
fn every_cell_kind_round_trips_through_the_package() {
    use bindery_model::{Formula, Url};

    struct Audit {
        id: i64,
        approved: bool,
        homepage: String,
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let columns = vec![
        Column::new("Id", |a: &Audit| a.id).build(),
        Column::new("Approved", |a: &Audit| a.approved).build(),
        Column::new("Homepage", |a: &Audit| Url(a.homepage.clone())).build(),
        Column::new("Check", |a: &Audit| {
            Formula(format!("=COUNTIF(A:A,{})", a.id))
        })
        .build(),
    ];
    let mut book = Book::new();
    book.append(Sheet::new(
        "Audit",
        columns,
        vec![Audit {
            id: 7,
            approved: true,
            homepage: "https://example.com/?q=a&b".to_string(),
        }],
    ));
    let path = book.write(dir.path().join("kinds")).expect("write");

    let sheet_xml = zip_part_to_string(&path, "xl/worksheets/sheet1.xml");
    let cells = worksheet_cells(&sheet_xml);

    let id = cells.iter().find(|c| c.reference == "A2").expect("A2");
    assert_eq!(id.cell_type, None);
    assert_eq!(id.value.as_deref(), Some("7"));

    let approved = cells.iter().find(|c| c.reference == "B2").expect("B2");
    assert_eq!(approved.cell_type.as_deref(), Some("b"));
    assert_eq!(approved.value.as_deref(), Some("1"));

    // Url cells are shared strings carrying the book's link style.
    let homepage = cells.iter().find(|c| c.reference == "C2").expect("C2");
    assert_eq!(homepage.cell_type.as_deref(), Some("s"));
    assert!(homepage.style.is_some());
    let sst = zip_part_to_string(&path, "xl/sharedStrings.xml");
    assert_eq!(
        shared_string_items(&sst),
        vec!["https://example.com/?q=a&b".to_string()]
    );

    // Formula text is emitted without the UI-level '='.
    assert!(sheet_xml.contains("<f>COUNTIF(A:A,7)</f>"));
}

#[test]
fn multiple_sheets_share_one_registry_pass() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut book = Book::new();
    book.append(Sheet::new("First", staff_columns(), staff()));
    book.append(Sheet::new("Second", staff_columns(), staff()));
    let path = book.write(dir.path().join("multi")).expect("write");

    let workbook_xml = zip_part_to_string(&path, "xl/workbook.xml");
    let first = workbook_xml
        .find(r#"<sheet name="First" sheetId="1" r:id="rId1"/>"#)
        .expect("first sheet entry");
    let second = workbook_xml
        .find(r#"<sheet name="Second" sheetId="2" r:id="rId2"/>"#)
        .expect("second sheet entry");
    assert!(first < second);

    // Both sheets reference one shared table: identical strings interned
    // once, total counts covering every reference from both sheets.
    let sst = zip_part_to_string(&path, "xl/sharedStrings.xml");
    assert_eq!(
        shared_string_items(&sst),
        vec!["Ada".to_string(), "Grace".to_string()]
    );
    assert!(sst.contains(r#"count="6" uniqueCount="2""#));

    let names = zip_part_names(&path);
    assert!(names.iter().any(|n| n == "xl/worksheets/sheet2.xml"));
}

#[test]
fn progress_events_replay_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut book = Book::new();
    book.append(Sheet::new("Staff", staff_columns(), staff()));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let path = book
        .write_with_progress(dir.path().join("progress"), Some(tx))
        .expect("write");

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            WriteEvent::SheetLoaded {
                index: 0,
                name: "Staff".to_string(),
                rows: 3
            },
            WriteEvent::SheetWritten {
                index: 0,
                name: "Staff".to_string()
            },
            WriteEvent::StylesFinalized { styles: 2 },
            WriteEvent::SharedStringsFinalized {
                unique: 2,
                total: 3
            },
            WriteEvent::PackageWritten { path },
        ]
    );
}

#[test]
fn dropped_progress_receiver_does_not_fail_the_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut book = Book::new();
    book.append(Sheet::new("Staff", staff_columns(), staff()));
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<WriteEvent>();
    drop(rx);
    book.write_with_progress(dir.path().join("orphan"), Some(tx))
        .expect("write with dropped receiver");
}

#[tokio::test]
async fn async_write_awaits_async_suppliers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut book = Book::new();
    book.append(Sheet::with_async_supplier(
        "Remote",
        staff_columns(),
        || async { staff() },
    ));
    let path = book
        .write_async(dir.path().join("remote"))
        .await
        .expect("async write");

    let sheet_xml = zip_part_to_string(&path, "xl/worksheets/sheet1.xml");
    let cells = worksheet_cells(&sheet_xml);
    assert_eq!(cells.len(), 8);
}

#[tokio::test]
async fn async_entry_point_matches_sync_output_for_sync_sources() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut sync_book = Book::new();
    sync_book.append(Sheet::with_supplier("Staff", staff_columns(), staff));
    let sync_path = sync_book.write(dir.path().join("sync")).expect("write");

    let mut async_book = Book::new();
    async_book.append(Sheet::with_supplier("Staff", staff_columns(), staff));
    let async_path = async_book
        .write_async(dir.path().join("async"))
        .await
        .expect("write_async");

    let sync_bytes = std::fs::read(sync_path).expect("read sync output");
    let async_bytes = std::fs::read(async_path).expect("read async output");
    assert_eq!(sync_bytes, async_bytes);
}

fn date_at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(hh, mm, 0))
        .expect("valid test date")
}
