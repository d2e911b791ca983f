//! SpreadsheetML (.xlsx) report writer and reader.
//!
//! Strings are stored inline (`t="inlineStr"`) so the package needs no shared
//! string table. Outcome cells carry a PASS/FAIL/BUG fill.

use anyhow::{anyhow, Context};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::summary::{recommendations, RunSummary};
use super::types::{format_timestamp, Outcome, ReportRow, Severity, TestResult, TestType};
use crate::error::ExportError;

pub const RESULTS_SHEET: &str = "Test Results";
pub const SUMMARY_SHEET: &str = "Summary";
pub const TYPE_SHEET: &str = "Test Type Analysis";
pub const SEVERITY_SHEET: &str = "Severity Analysis";
pub const WEAKNESS_SHEET: &str = "Weaknesses";
pub const RECOMMENDATION_SHEET: &str = "Recommendations";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="6"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FFD9D9D9"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFC6EFCE"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFC7CE"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFEB9C"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="5"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/><xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1"/><xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1"/><xf numFmtId="0" fontId="0" fillId="5" borderId="0" xfId="0" applyFill="1"/></cellXfs></styleSheet>"#;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Style {
    Plain = 0,
    Header = 1,
    Pass = 2,
    Fail = 3,
    Bug = 4,
}

impl From<Outcome> for Style {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Pass => Style::Pass,
            Outcome::Fail => Style::Fail,
            Outcome::Bug => Style::Bug,
        }
    }
}

#[derive(Debug, Clone)]
enum Cell {
    Text(String, Style),
    Number(f64),
}

impl Cell {
    fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into(), Style::Plain)
    }

    fn width(&self) -> usize {
        match self {
            Cell::Text(s, _) => s.chars().count(),
            Cell::Number(n) => n.to_string().len(),
        }
    }
}

struct Sheet {
    name: &'static str,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(name: &'static str, header: &[&str]) -> Self {
        Self {
            name,
            rows: vec![header
                .iter()
                .map(|h| Cell::Text(h.to_string(), Style::Header))
                .collect()],
        }
    }

    fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// Write the workbook for `results` at `path`.
pub fn write(results: &[TestResult], summary: &RunSummary, path: &Path) -> Result<(), ExportError> {
    let sheets = build_sheets(results, summary);

    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".into(), content_types(sheets.len()).map_err(encode_err)?),
        ("_rels/.rels".into(), package_rels().map_err(encode_err)?),
        ("xl/workbook.xml".into(), workbook(&sheets).map_err(encode_err)?),
        (
            "xl/_rels/workbook.xml.rels".into(),
            workbook_rels(sheets.len()).map_err(encode_err)?,
        ),
        ("xl/styles.xml".into(), STYLES_XML.as_bytes().to_vec()),
    ];
    for (i, sheet) in sheets.iter().enumerate() {
        parts.push((
            format!("xl/worksheets/sheet{}.xml", i + 1),
            worksheet(sheet).map_err(encode_err)?,
        ));
    }

    let file = File::create(path).map_err(|e| ExportError::unwritable(path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name, options).map_err(encode_err)?;
        zip.write_all(&bytes)
            .map_err(|e| ExportError::unwritable(path, e))?;
    }
    zip.finish().map_err(encode_err)?;
    Ok(())
}

fn encode_err(err: impl std::fmt::Display) -> ExportError {
    ExportError::encode("spreadsheet", err)
}

fn result_row(result: &TestResult) -> Vec<Cell> {
    let row = result.to_row();
    vec![
        Cell::text(row.case_name),
        Cell::Text(row.outcome, result.outcome.into()),
        Cell::text(row.details),
        Cell::text(row.test_type),
        Cell::text(row.severity),
        Cell::text(row.timestamp),
    ]
}

fn build_sheets(results: &[TestResult], summary: &RunSummary) -> Vec<Sheet> {
    let mut sheets = Vec::new();

    let mut detail = Sheet::new(RESULTS_SHEET, &ReportRow::COLUMNS);
    for result in results {
        detail.push(result_row(result));
    }
    sheets.push(detail);

    let mut overview = Sheet::new(SUMMARY_SHEET, &["Metric", "Value"]);
    let count = |n: usize| Cell::Number(n as f64);
    overview.push(vec![Cell::text("Total Tests"), count(summary.total)]);
    overview.push(vec![Cell::text("Passed"), count(summary.passed)]);
    overview.push(vec![Cell::text("Failed"), count(summary.failed)]);
    overview.push(vec![Cell::text("Bugs Found"), count(summary.bugs)]);
    overview.push(vec![Cell::text("Pass Rate (%)"), Cell::Number(summary.pass_rate)]);
    for severity in Severity::ALL {
        overview.push(vec![
            Cell::text(format!("{} Issues", severity)),
            count(
                results
                    .iter()
                    .filter(|r| r.severity == severity && r.outcome.is_weakness())
                    .count(),
            ),
        ]);
    }
    if let Some(started) = summary.started_at {
        overview.push(vec![Cell::text("Started"), Cell::text(format_timestamp(&started))]);
    }
    if let Some(finished) = summary.finished_at {
        overview.push(vec![Cell::text("Finished"), Cell::text(format_timestamp(&finished))]);
    }
    if let Some(ms) = summary.duration_ms {
        overview.push(vec![Cell::text("Duration (ms)"), Cell::Number(ms as f64)]);
    }
    sheets.push(overview);

    let mut by_type = Sheet::new(
        TYPE_SHEET,
        &["Test Type", "Total", "Passed", "Failed", "Bugs", "Pass Rate (%)"],
    );
    for test_type in TestType::ALL {
        if let Some(b) = summary.by_test_type.get(&test_type) {
            let rate = if b.total == 0 {
                0.0
            } else {
                (b.passed as f64 / b.total as f64 * 1000.0).round() / 10.0
            };
            by_type.push(vec![
                Cell::text(test_type.to_string()),
                count(b.total),
                count(b.passed),
                count(b.failed),
                count(b.bugs),
                Cell::Number(rate),
            ]);
        }
    }
    sheets.push(by_type);

    let mut by_severity = Sheet::new(SEVERITY_SHEET, &["Severity", "Results", "Weaknesses"]);
    for severity in Severity::ALL {
        let weak = results
            .iter()
            .filter(|r| r.severity == severity && r.outcome.is_weakness())
            .count();
        by_severity.push(vec![
            Cell::text(severity.to_string()),
            count(summary.severity_count(severity)),
            count(weak),
        ]);
    }
    sheets.push(by_severity);

    let weak: Vec<&TestResult> = results.iter().filter(|r| r.outcome.is_weakness()).collect();
    if !weak.is_empty() {
        let mut sheet = Sheet::new(WEAKNESS_SHEET, &ReportRow::COLUMNS);
        for result in weak {
            sheet.push(result_row(result));
        }
        sheets.push(sheet);
    }

    let mut advice = Sheet::new(RECOMMENDATION_SHEET, &["Priority", "Category", "Recommendation"]);
    for rec in recommendations(results) {
        advice.push(vec![
            Cell::text(rec.priority.to_string()),
            Cell::text(rec.category),
            Cell::text(rec.message),
        ]);
    }
    sheets.push(advice);

    sheets
}

type XmlResult<T> = Result<T, quick_xml::Error>;

struct Part {
    writer: Writer<Vec<u8>>,
}

impl Part {
    fn new() -> XmlResult<Self> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> XmlResult<()> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.writer.write_event(Event::Start(start))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> XmlResult<()> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.writer.write_event(Event::Empty(start))
    }

    fn text(&mut self, text: &str) -> XmlResult<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(&xml_safe(text))))
    }

    fn close(&mut self, name: &str) -> XmlResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Encode characters XML 1.0 cannot carry (and CR, which parsers may fold)
/// as OOXML `_xHHHH_` escapes. A literal `_` starting `_x` becomes `_x005F_`
/// so [`decode_escapes`] restores the text exactly.
fn xml_safe(s: &str) -> Cow<'_, str> {
    let needs_escape = |c: char| {
        !(matches!(c, '\t' | '\n') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}'))
    };
    if !s.chars().any(needs_escape) && !s.contains("_x") {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if needs_escape(c) || (c == '_' && chars.peek() == Some(&'x')) {
            out.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Undo [`xml_safe`]: every `_xHHHH_` becomes the character it names.
fn decode_escapes(s: &str) -> Cow<'_, str> {
    if !s.contains("_x") {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = tail
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| tail.get(6..7) == Some("_"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[7..];
            }
            None => {
                out.push('_');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

fn content_types(sheet_count: usize) -> XmlResult<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("Types", &[("xmlns", NS_TYPES)])?;
    part.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    part.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    part.empty(
        "Override",
        &[
            ("PartName", "/xl/workbook.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
            ),
        ],
    )?;
    part.empty(
        "Override",
        &[
            ("PartName", "/xl/styles.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
            ),
        ],
    )?;
    for i in 1..=sheet_count {
        let name = format!("/xl/worksheets/sheet{}.xml", i);
        part.empty(
            "Override",
            &[
                ("PartName", name.as_str()),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
                ),
            ],
        )?;
    }
    part.close("Types")?;
    Ok(part.finish())
}

fn package_rels() -> XmlResult<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("Relationships", &[("xmlns", NS_PKG_REL)])?;
    part.empty(
        "Relationship",
        &[
            ("Id", "rId1"),
            (
                "Type",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
            ),
            ("Target", "xl/workbook.xml"),
        ],
    )?;
    part.close("Relationships")?;
    Ok(part.finish())
}

fn workbook(sheets: &[Sheet]) -> XmlResult<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;
    part.open("sheets", &[])?;
    for (i, sheet) in sheets.iter().enumerate() {
        let id = (i + 1).to_string();
        let rid = format!("rId{}", i + 1);
        part.empty(
            "sheet",
            &[("name", sheet.name), ("sheetId", id.as_str()), ("r:id", rid.as_str())],
        )?;
    }
    part.close("sheets")?;
    part.close("workbook")?;
    Ok(part.finish())
}

fn workbook_rels(sheet_count: usize) -> XmlResult<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("Relationships", &[("xmlns", NS_PKG_REL)])?;
    for i in 1..=sheet_count {
        let rid = format!("rId{}", i);
        let target = format!("worksheets/sheet{}.xml", i);
        part.empty(
            "Relationship",
            &[
                ("Id", rid.as_str()),
                (
                    "Type",
                    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet",
                ),
                ("Target", target.as_str()),
            ],
        )?;
    }
    let styles_rid = format!("rId{}", sheet_count + 1);
    part.empty(
        "Relationship",
        &[
            ("Id", styles_rid.as_str()),
            (
                "Type",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
            ),
            ("Target", "styles.xml"),
        ],
    )?;
    part.close("Relationships")?;
    Ok(part.finish())
}

fn worksheet(sheet: &Sheet) -> XmlResult<Vec<u8>> {
    let columns = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut part = Part::new()?;
    part.open("worksheet", &[("xmlns", NS_MAIN)])?;

    if columns > 0 {
        part.open("cols", &[])?;
        for col in 0..columns {
            let longest = sheet
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(Cell::width)
                .max()
                .unwrap_or(10);
            let index = (col + 1).to_string();
            let width = (longest + 2).clamp(10, 60).to_string();
            part.empty(
                "col",
                &[
                    ("min", index.as_str()),
                    ("max", index.as_str()),
                    ("width", width.as_str()),
                    ("customWidth", "1"),
                ],
            )?;
        }
        part.close("cols")?;
    }

    part.open("sheetData", &[])?;
    for (r, row) in sheet.rows.iter().enumerate() {
        let row_ref = (r + 1).to_string();
        part.open("row", &[("r", row_ref.as_str())])?;
        for (c, cell) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_name(c), r + 1);
            match cell {
                Cell::Text(text, style) => {
                    let s = (*style as u8).to_string();
                    let mut attrs = vec![("r", cell_ref.as_str()), ("t", "inlineStr")];
                    if *style != Style::Plain {
                        attrs.push(("s", s.as_str()));
                    }
                    part.open("c", &attrs)?;
                    part.open("is", &[])?;
                    part.open("t", &[("xml:space", "preserve")])?;
                    part.text(text)?;
                    part.close("t")?;
                    part.close("is")?;
                    part.close("c")?;
                }
                Cell::Number(n) => {
                    part.open("c", &[("r", cell_ref.as_str())])?;
                    part.open("v", &[])?;
                    part.text(&n.to_string())?;
                    part.close("v")?;
                    part.close("c")?;
                }
            }
        }
        part.close("row")?;
    }
    part.close("sheetData")?;
    part.close("worksheet")?;
    Ok(part.finish())
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> anyhow::Result<String> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("missing workbook part {}", name))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let xml = read_part(&mut archive, "xl/workbook.xml")?;
    let mut reader = Reader::from_str(&xml);
    let mut names = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"sheet" => {
                if let Some(attr) = e.try_get_attribute("name")? {
                    names.push(attr.unescape_value()?.into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(names)
}

/// Cell text of every row of sheet `name`.
pub fn read_sheet(path: &Path, name: &str) -> anyhow::Result<Vec<Vec<String>>> {
    let index = sheet_names(path)?
        .iter()
        .position(|n| n == name)
        .ok_or_else(|| anyhow!("sheet '{}' not found", name))?;
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let xml = read_part(&mut archive, &format!("xl/worksheets/sheet{}.xml", index + 1))?;

    let mut reader = Reader::from_str(&xml);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut in_value = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    if let Some(row) = rows.last_mut() {
                        row.push(String::new());
                    }
                }
                b"t" | b"v" => in_value = true,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"c" => {
                if let Some(row) = rows.last_mut() {
                    row.push(String::new());
                }
            }
            Event::Text(t) if in_value => {
                let text = t.unescape()?;
                if let Some(cell) = rows.last_mut().and_then(|r| r.last_mut()) {
                    cell.push_str(&text);
                }
            }
            Event::End(e) if matches!(e.name().as_ref(), b"t" | b"v") => in_value = false,
            Event::Eof => break,
            _ => {}
        }
    }
    for cell in rows.iter_mut().flatten() {
        if cell.contains("_x") {
            *cell = decode_escapes(cell).into_owned();
        }
    }
    Ok(rows)
}

/// Parse the results sheet back into results, matching columns by header name.
pub fn read(path: &Path) -> anyhow::Result<Vec<TestResult>> {
    let mut rows = read_sheet(path, RESULTS_SHEET)?.into_iter();
    let header = rows.next().ok_or_else(|| anyhow!("results sheet is empty"))?;
    let positions: Vec<usize> = ReportRow::COLUMNS
        .iter()
        .map(|col| {
            header
                .iter()
                .position(|h| h == col)
                .ok_or_else(|| anyhow!("missing column {}", col))
        })
        .collect::<anyhow::Result<_>>()?;

    rows.map(|cells| {
        let ordered: Vec<String> = positions
            .iter()
            .map(|&i| cells.get(i).cloned().unwrap_or_default())
            .collect();
        let row = ReportRow::from_cells(&ordered).ok_or_else(|| anyhow!("short row"))?;
        TestResult::from_row(&row).map_err(anyhow::Error::msg)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::strategies::arb_result;
    use proptest::prelude::*;

    fn sample() -> Vec<TestResult> {
        vec![
            TestResult::pass("Login Page Loads", "Title: Sign in", TestType::Ui),
            TestResult::bug(
                "Form Security",
                "<script>alert('XSS')</script> reflected & stored",
                TestType::Security,
                Severity::Critical,
            ),
            TestResult::fail("Long Input Handling", "   ", TestType::Form, Severity::Medium),
            TestResult::pass("Unicode", "名前 Zoë – ok", TestType::Form),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_spreadsheet_round_trip(results in prop::collection::vec(arb_result(), 0..8)) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("report.xlsx");
            write(&results, &RunSummary::from_results(&results), &path).unwrap();

            prop_assert_eq!(read(&path).unwrap(), results);
        }
    }

    #[test]
    fn test_control_characters_and_literal_escapes_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escapes.xlsx");
        let results = vec![
            TestResult::fail(
                "page_x0041_load",
                "page load failed: \u{1b}[2mnet::ERR\u{1b}[0m\r\n\u{0}_x_",
                TestType::Navigation,
                Severity::High,
            ),
            TestResult::pass("Unicode", "名前 Zoë \u{FFFE} ok", TestType::Form),
        ];
        write(&results, &RunSummary::from_results(&results), &path).unwrap();

        let back = read(&path).unwrap();
        assert_eq!(back, results);
        assert_eq!(back[0].case_name, "page_x0041_load");
    }

    #[test]
    fn test_escape_encoding() {
        assert_eq!(xml_safe("a\u{1b}b"), "a_x001B_b");
        assert_eq!(xml_safe("_x0041_"), "_x005F_x0041_");
        assert!(matches!(xml_safe("plain_text"), Cow::Borrowed(_)));
        assert_eq!(decode_escapes("_x005F_x0041_"), "_x0041_");
        assert_eq!(decode_escapes("_xZZ_ and _x41_"), "_xZZ_ and _x41_");
    }

    #[test]
    fn test_sheets_and_summary_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let results = sample();
        write(&results, &RunSummary::from_results(&results), &path).unwrap();

        assert_eq!(
            sheet_names(&path).unwrap(),
            vec![
                RESULTS_SHEET,
                SUMMARY_SHEET,
                TYPE_SHEET,
                SEVERITY_SHEET,
                WEAKNESS_SHEET,
                RECOMMENDATION_SHEET
            ]
        );
        let summary = read_sheet(&path, SUMMARY_SHEET).unwrap();
        assert_eq!(summary[1], vec!["Total Tests".to_string(), "4".to_string()]);
        assert_eq!(summary[4], vec!["Bugs Found".to_string(), "1".to_string()]);
        assert_eq!(read_sheet(&path, WEAKNESS_SHEET).unwrap().len(), 3);
    }

    #[test]
    fn test_weakness_sheet_omitted_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.xlsx");
        let results = vec![TestResult::pass("API Discovery", "/api", TestType::Api)];
        write(&results, &RunSummary::from_results(&results), &path).unwrap();
        assert!(!sheet_names(&path)
            .unwrap()
            .contains(&WEAKNESS_SHEET.to_string()));
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(5), "F");
        assert_eq!(column_name(26), "AA");
    }
}
