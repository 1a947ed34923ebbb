// Workbook inspection for .xlsx/.xlsm archives
// Reads sheet names and approximate used-range sizes without an office suite

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use thiserror::Error;

use batchprint_core::port::{BackendError, SheetExtent};

use crate::constants::{
    DEFAULT_COLUMN_WIDTH_CHARS, DEFAULT_ROW_HEIGHT_POINTS, MAX_COLUMNS, MAX_ROWS,
    POINTS_PER_COLUMN_CHAR,
};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("cannot open workbook: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a valid xlsx archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed workbook XML in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("sheet not found: {0}")]
    SheetNotFound(String),
}

impl From<XlsxError> for BackendError {
    fn from(err: XlsxError) -> Self {
        match err {
            XlsxError::Io(_) => BackendError::Io(err.to_string()),
            _ => BackendError::Failed(err.to_string()),
        }
    }
}

/// A worksheet entry from `xl/workbook.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetEntry {
    name: String,
    part: String,
}

/// Stateless reader over xlsx archives
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxInspector;

impl XlsxInspector {
    pub fn new() -> Self {
        Self
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self, path: &Path) -> Result<Vec<String>, XlsxError> {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;
        Ok(read_sheet_entries(&mut archive)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    /// Approximate used-range size of the given sheets (all sheets when
    /// `sheets` is empty), in points
    pub fn measure(&self, path: &Path, sheets: &[String]) -> Result<Vec<SheetExtent>, XlsxError> {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;
        let entries = read_sheet_entries(&mut archive)?;

        let selected: Vec<&SheetEntry> = if sheets.is_empty() {
            entries.iter().collect()
        } else {
            sheets
                .iter()
                .map(|wanted| {
                    entries
                        .iter()
                        .find(|entry| &entry.name == wanted)
                        .ok_or_else(|| XlsxError::SheetNotFound(wanted.clone()))
                })
                .collect::<Result<_, _>>()?
        };

        selected
            .into_iter()
            .map(|entry| {
                let xml = read_part(&mut archive, &entry.part)?;
                let layout = parse_sheet_layout(&entry.part, &xml)?;
                Ok(SheetExtent {
                    name: entry.name.clone(),
                    width: layout.width_points(),
                    height: layout.height_points(),
                })
            })
            .collect()
    }

    /// Copy the workbook at `src` to `dest` with every sheet outside
    /// `sheets` marked hidden, so that a PDF export only renders the
    /// selection. Other archive entries are copied unchanged.
    pub fn write_with_visible_sheets(
        &self,
        src: &Path,
        dest: &Path,
        sheets: &[String],
    ) -> Result<(), XlsxError> {
        let mut archive = zip::ZipArchive::new(File::open(src)?)?;
        let workbook = read_part(&mut archive, WORKBOOK_PART)?;

        let names: Vec<String> = parse_workbook_sheets(&workbook)?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        if let Some(missing) = sheets.iter().find(|wanted| !names.contains(wanted)) {
            return Err(XlsxError::SheetNotFound(missing.clone()));
        }

        let rewritten = hide_unselected_sheets(&workbook, sheets)?;

        let mut out = zip::ZipWriter::new(File::create(dest)?);
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.name() == WORKBOOK_PART {
                continue;
            }
            out.raw_copy_file(entry)?;
        }
        out.start_file(WORKBOOK_PART, zip::write::SimpleFileOptions::default())?;
        out.write_all(&rewritten)?;
        out.finish()?;
        Ok(())
    }
}

/// Rewrites `<sheet>` elements: selected sheets lose any `state`,
/// the rest get `state="hidden"`. Everything else passes through.
fn hide_unselected_sheets(xml: &str, sheets: &[String]) -> Result<Vec<u8>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        let event = reader.read_event().map_err(|e| xml_error(WORKBOOK_PART, e))?;
        let event = match event {
            Event::Eof => break,
            Event::Start(ref e) if e.local_name().as_ref() == b"sheet" => {
                Event::Start(with_visibility(e, sheets)?)
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                Event::Empty(with_visibility(e, sheets)?)
            }
            other => other,
        };
        writer
            .write_event(event)
            .map_err(|e| xml_error(WORKBOOK_PART, e))?;
    }

    Ok(writer.into_inner())
}

fn with_visibility(
    element: &BytesStart<'_>,
    sheets: &[String],
) -> Result<BytesStart<'static>, XlsxError> {
    let name = attribute(WORKBOOK_PART, element, b"name")?.unwrap_or_default();
    let mut sheet =
        BytesStart::new(String::from_utf8_lossy(element.name().as_ref()).into_owned());
    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_error(WORKBOOK_PART, e))?;
        if attr.key.local_name().as_ref() != b"state" {
            sheet.push_attribute(attr);
        }
    }
    if !sheets.contains(&name) {
        sheet.push_attribute(("state", "hidden"));
    }
    Ok(sheet)
}

fn read_part<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    part: &str,
) -> Result<String, XlsxError> {
    let mut file = archive.by_name(part)?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(xml)
}

fn read_sheet_entries<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<Vec<SheetEntry>, XlsxError> {
    let workbook = read_part(archive, WORKBOOK_PART)?;
    let rels = read_part(archive, WORKBOOK_RELS_PART)?;

    let targets = parse_relationships(&rels)?;
    let sheets = parse_workbook_sheets(&workbook)?;

    Ok(sheets
        .into_iter()
        .map(|(name, rel_id)| {
            let part = targets
                .get(&rel_id)
                .map(|target| resolve_target(target))
                .unwrap_or_default();
            SheetEntry { name, part }
        })
        .collect())
}

/// Relationship targets are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn xml_error(part: &str, err: impl std::fmt::Display) -> XlsxError {
    XlsxError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

/// Attribute value by local name, unescaped
fn attribute(part: &str, element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, XlsxError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_error(part, e))?;
        if attr.key.local_name().as_ref() == name {
            let raw = String::from_utf8_lossy(&attr.value);
            let value = quick_xml::escape::unescape(&raw).map_err(|e| xml_error(part, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// (sheet name, relationship id) pairs in workbook order
fn parse_workbook_sheets(xml: &str) -> Result<Vec<(String, String)>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(WORKBOOK_PART, e, b"name")?.unwrap_or_default();
                // r:id, namespace prefix varies
                let rel_id = attribute(WORKBOOK_PART, e, b"id")?.unwrap_or_default();
                sheets.push((name, rel_id));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(WORKBOOK_PART, e)),
            _ => {}
        }
    }

    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attribute(WORKBOOK_RELS_PART, e, b"Id")?;
                let target = attribute(WORKBOOK_RELS_PART, e, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(WORKBOOK_RELS_PART, e)),
            _ => {}
        }
    }

    Ok(targets)
}

/// Column/row layout needed to size a sheet's used range
#[derive(Debug, Clone, PartialEq)]
struct SheetLayout {
    last_column: u32,
    last_row: u32,
    default_column_width: f64,
    default_row_height: f64,
    /// (min, max, width) ranges from `<cols>`
    column_widths: Vec<(u32, u32, f64)>,
}

impl SheetLayout {
    fn column_width(&self, column: u32) -> f64 {
        self.column_widths
            .iter()
            .find(|(min, max, _)| (*min..=*max).contains(&column))
            .map(|(_, _, width)| *width)
            .unwrap_or(self.default_column_width)
    }

    fn width_points(&self) -> f64 {
        (1..=self.last_column)
            .map(|column| self.column_width(column) * POINTS_PER_COLUMN_CHAR)
            .sum()
    }

    /// Custom row heights are ignored
    fn height_points(&self) -> f64 {
        f64::from(self.last_row) * self.default_row_height
    }
}

/// Reads the header of a worksheet part, stopping at `<sheetData>`
fn parse_sheet_layout(part: &str, xml: &str) -> Result<SheetLayout, XlsxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut layout = SheetLayout {
        last_column: 1,
        last_row: 1,
        default_column_width: DEFAULT_COLUMN_WIDTH_CHARS,
        default_row_height: DEFAULT_ROW_HEIGHT_POINTS,
        column_widths: Vec::new(),
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"dimension" => {
                    if let Some(range) = attribute(part, e, b"ref")? {
                        let (column, row) = range_end(&range).ok_or_else(|| {
                            xml_error(part, format!("dimension out of range: {}", range))
                        })?;
                        layout.last_column = column.max(1);
                        layout.last_row = row.max(1);
                    }
                }
                b"sheetFormatPr" => {
                    if let Some(width) = number(attribute(part, e, b"defaultColWidth")?) {
                        layout.default_column_width = width;
                    }
                    if let Some(height) = number(attribute(part, e, b"defaultRowHeight")?) {
                        layout.default_row_height = height;
                    }
                }
                b"col" => {
                    let min = number(attribute(part, e, b"min")?);
                    let max = number(attribute(part, e, b"max")?);
                    let width = number(attribute(part, e, b"width")?);
                    if let (Some(min), Some(max), Some(width)) = (min, max, width) {
                        layout.column_widths.push((min as u32, max as u32, width));
                    }
                }
                b"sheetData" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => {}
        }
    }

    Ok(layout)
}

fn number(value: Option<String>) -> Option<f64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Bottom-right cell of an A1 range ("A1:H40" -> (8, 40), "C3" -> (3, 3)).
/// `None` past the largest sheet Excel allows.
fn range_end(range: &str) -> Option<(u32, u32)> {
    let cell = range.rsplit(':').next().unwrap_or(range);
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let column = letters.chars().try_fold(0u32, |acc, c| {
        acc.checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
    })?;
    let row = match cell[letters.len()..].parse::<u32>() {
        Ok(row) => row,
        Err(_) if cell.len() == letters.len() => 1,
        Err(_) => return None,
    };
    (column <= MAX_COLUMNS && row <= MAX_ROWS).then_some((column, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Summary" sheetId="1" r:id="rId1"/>
    <sheet name="R&amp;D" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="worksheet" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId1" Type="worksheet" Target="/xl/worksheets/sheet1.xml"/>
</Relationships>"#;

    const WIDE_SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <dimension ref="A1:L10"/>
  <sheetFormatPr defaultRowHeight="15"/>
  <cols><col min="1" max="2" width="30" customWidth="1"/></cols>
  <sheetData><row r="1"/></sheetData>
</worksheet>"#;

    const TALL_SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <dimension ref="A1:C200"/>
  <sheetData/>
</worksheet>"#;

    fn write_workbook(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("book.xlsx");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, body) in [
            (WORKBOOK_PART, WORKBOOK),
            (WORKBOOK_RELS_PART, RELS),
            ("xl/worksheets/sheet1.xml", WIDE_SHEET),
            ("xl/worksheets/sheet2.xml", TALL_SHEET),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn test_sheet_names_in_workbook_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path());

        let names = XlsxInspector::new().sheet_names(&path).unwrap();

        assert_eq!(names, vec!["Summary", "R&D"]);
    }

    #[test]
    fn test_measure_selected_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path());

        let extents = XlsxInspector::new()
            .measure(&path, &["Summary".to_string()])
            .unwrap();

        assert_eq!(extents.len(), 1);
        let summary = &extents[0];
        let expected_width =
            (2.0 * 30.0 + 10.0 * DEFAULT_COLUMN_WIDTH_CHARS) * POINTS_PER_COLUMN_CHAR;
        assert!((summary.width - expected_width).abs() < 1e-9);
        assert!((summary.height - 150.0).abs() < 1e-9);
        assert!(summary.width > summary.height);
    }

    #[test]
    fn test_measure_all_sheets_when_none_selected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path());

        let extents = XlsxInspector::new().measure(&path, &[]).unwrap();

        assert_eq!(extents.len(), 2);
        assert!(extents[1].height > extents[1].width);
    }

    #[test]
    fn test_unknown_sheet_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path());

        let err = XlsxInspector::new()
            .measure(&path, &["Missing".to_string()])
            .unwrap_err();

        assert!(matches!(err, XlsxError::SheetNotFound(name) if name == "Missing"));
    }

    fn workbook_xml(path: &Path) -> String {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        read_part(&mut archive, WORKBOOK_PART).unwrap()
    }

    #[test]
    fn test_unselected_sheets_are_hidden_in_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_workbook(dir.path());
        let dest = dir.path().join("selection.xlsx");

        XlsxInspector::new()
            .write_with_visible_sheets(&src, &dest, &["R&D".to_string()])
            .unwrap();

        let xml = workbook_xml(&dest);
        assert!(xml.contains(r#"<sheet name="Summary" sheetId="1" r:id="rId1" state="hidden"/>"#), "{}", xml);
        assert!(xml.contains(r#"<sheet name="R&amp;D" sheetId="2" r:id="rId2"/>"#), "{}", xml);

        // Sheet parts still resolve and the source is untouched
        let inspector = XlsxInspector::new();
        assert_eq!(inspector.sheet_names(&dest).unwrap(), vec!["Summary", "R&D"]);
        assert_eq!(inspector.measure(&dest, &[]).unwrap().len(), 2);
        assert!(!workbook_xml(&src).contains("hidden"));
    }

    #[test]
    fn test_selected_hidden_sheet_becomes_visible() {
        let xml = r#"<workbook><sheets><sheet name="A" state="hidden" sheetId="1"/><sheet name="B" sheetId="2"/></sheets></workbook>"#;

        let out = hide_unselected_sheets(xml, &["A".to_string()]).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<workbook><sheets><sheet name="A" sheetId="1"/><sheet name="B" sheetId="2" state="hidden"/></sheets></workbook>"#
        );
    }

    #[test]
    fn test_visible_copy_rejects_unknown_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_workbook(dir.path());
        let dest = dir.path().join("selection.xlsx");

        let err = XlsxInspector::new()
            .write_with_visible_sheets(&src, &dest, &["Missing".to_string()])
            .unwrap_err();

        assert!(matches!(err, XlsxError::SheetNotFound(name) if name == "Missing"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_not_a_zip_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();

        assert!(matches!(
            XlsxInspector::new().sheet_names(&path),
            Err(XlsxError::Zip(_))
        ));
    }

    #[test]
    fn test_range_end() {
        assert_eq!(range_end("A1:H40"), Some((8, 40)));
        assert_eq!(range_end("C3"), Some((3, 3)));
        assert_eq!(range_end("A1:AB7"), Some((28, 7)));
        assert_eq!(range_end("A1:XFD1048576"), Some((16_384, 1_048_576)));
    }

    #[test]
    fn test_range_end_rejects_oversized_references() {
        assert_eq!(range_end("AAAAAAAAZ1"), None);
        assert_eq!(range_end("A1:XFE1"), None);
        assert_eq!(range_end("A1:B99999999999"), None);
    }

    #[test]
    fn test_oversized_dimension_is_malformed() {
        let err = parse_sheet_layout(
            "xl/worksheets/sheet1.xml",
            r#"<worksheet><dimension ref="A1:AAAAAAAAZ1"/><sheetData/></worksheet>"#,
        )
        .unwrap_err();

        assert!(matches!(err, XlsxError::Xml { .. }));
    }
}
