use crate::domain::model::ResultTable;
use crate::utils::error::{IntelError, Result};
use calamine::{open_workbook_auto, DataType, Reader};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

pub const COMPANY_COLUMN: &str = "COMPANY";

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Company names from the `COMPANY` column of the first sheet, blanks skipped.
pub fn read_company_column(path: &Path) -> Result<Vec<String>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let names = if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        read_workbook_column(path, COMPANY_COLUMN)?
    } else if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
        let delimiter = if extension == "tsv" { b'\t' } else { b',' };
        read_delimited_column(path, COMPANY_COLUMN, delimiter)?
    } else {
        return Err(IntelError::UnsupportedFileType {
            path: path.display().to_string(),
            reason: format!(
                "expected one of: {}, {}",
                WORKBOOK_EXTENSIONS.join(", "),
                DELIMITED_EXTENSIONS.join(", ")
            ),
        });
    };

    tracing::debug!("Read {} company names from {}", names.len(), path.display());
    Ok(names)
}

fn missing_column(path: &Path, column: &str) -> IntelError {
    IntelError::MissingColumnError {
        column: column.to_string(),
        source_name: path.display().to_string(),
    }
}

fn read_workbook_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| missing_column(path, column))?;

    let range = match workbook.worksheet_range(&sheet_name) {
        Some(range) => range?,
        None => return Err(missing_column(path, column)),
    };

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| missing_column(path, column))?;
    let index = header
        .iter()
        .position(|cell| matches!(cell, DataType::String(s) if s == column))
        .ok_or_else(|| missing_column(path, column))?;

    Ok(rows
        .filter_map(|row| row.get(index).and_then(cell_to_string))
        .collect())
}

fn cell_to_string(cell: &DataType) -> Option<String> {
    let text = match cell {
        DataType::Empty => return None,
        DataType::String(s) => s.trim().to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{:.0}", f),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn read_delimited_column(path: &Path, column: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let index = reader
        .headers()?
        .iter()
        .position(|header| header.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| missing_column(path, column))?;

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(name) = record.get(index).map(str::trim).filter(|n| !n.is_empty()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

pub fn export_table(table: &ResultTable, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Csv => write_csv(table),
        OutputFormat::Xlsx => write_xlsx(table),
    }
}

fn row_values<'a>(table: &'a ResultTable) -> impl Iterator<Item = Vec<&'a str>> + 'a {
    table.rows.iter().map(|row| {
        table
            .columns
            .iter()
            .map(|column| row.get(column).unwrap_or_default())
            .collect()
    })
}

fn write_csv(table: &ResultTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for values in row_values(table) {
        writer.write_record(&values)?;
    }
    writer
        .into_inner()
        .map_err(|e| IntelError::IoError(e.into_error()))
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Single-sheet OOXML workbook with inline strings.
fn write_xlsx(table: &ResultTable) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("docProps/core.xml", core_properties_xml()),
        ("xl/workbook.xml", workbook_xml(&table.sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(table)),
    ];

    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn core_properties_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:creator>company-intel</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created></cp:coreProperties>"#,
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    )
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape_xml(&excel_sheet_name(sheet_name))
    )
}

fn sheet_xml(table: &ResultTable) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let header = table.columns.iter().map(String::as_str).collect::<Vec<_>>();
    let rows = std::iter::once(header).chain(row_values(table));
    for (row_index, values) in rows.enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, row_number));
        for (col_index, value) in values.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_letters(col_index),
                row_number,
                escape_xml(value)
            ));
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// 0 -> A, 25 -> Z, 26 -> AA
fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Excel caps sheet names at 31 characters and forbids `[]:*?/\`.
fn excel_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            // XML 1.0 不允許其他控制字元
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => escaped.push(c),
        }
    }
    escaped
}
