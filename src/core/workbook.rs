use crate::domain::model::{headers, CompanyRow, ExportMetadata, FIELDS};
use crate::utils::error::Result;
use chrono::Utc;
use serde_json::Value;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

// Column widths are derived from content length, clamped so that a single
// huge cell cannot blow up the layout.
const MIN_COLUMN_WIDTH: usize = 12;
const MAX_COLUMN_WIDTH: usize = 60;
const WIDTH_PADDING: usize = 2;
const SUMMARY_WIDTHS: [usize; 2] = [30, 40];

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
<sheet name="Summary" sheetId="1" r:id="rId1"/>
<sheet name="Companies" sheetId="2" r:id="rId2"/>
</sheets>
</workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

// Style 0 is the default cell, style 1 the bold centered header.
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="2">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf>
</cellXfs>
</styleSheet>"#;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
const WORKSHEET_OPEN: &str =
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#;

/// Assemble the two-sheet XLSX workbook (Summary + Companies) and return
/// the finished package bytes.
pub fn build_workbook(rows: &[CompanyRow], metadata: &ExportMetadata) -> Result<Vec<u8>> {
    let parts: [(&str, String); 7] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("xl/workbook.xml", WORKBOOK_XML.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.to_string()),
        ("xl/styles.xml", STYLES_XML.to_string()),
        ("xl/worksheets/sheet1.xml", summary_sheet_xml(metadata)),
        ("xl/worksheets/sheet2.xml", companies_sheet_xml(rows)),
    ];

    let zip_data = {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        for (name, content) in parts {
            zip.start_file::<_, ()>(name, FileOptions::default())?;
            zip.write_all(content.as_bytes())?;
        }

        let cursor = zip.finish()?;
        cursor.into_inner()
    };

    tracing::debug!(
        "Workbook assembled: {} rows, {} bytes",
        rows.len(),
        zip_data.len()
    );
    Ok(zip_data)
}

/// Summary sheet: generation timestamp plus the export metadata as
/// label/value rows.
fn summary_sheet_xml(metadata: &ExportMetadata) -> String {
    let generated_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let mut entries: Vec<(String, Value)> =
        vec![("Generated at".to_string(), Value::from(generated_at))];
    entries.extend(
        metadata
            .entries()
            .into_iter()
            .map(|(label, value)| (label.to_string(), value)),
    );

    let mut xml = String::new();
    xml.push_str(XML_DECLARATION);
    xml.push_str(WORKSHEET_OPEN);
    xml.push_str("<cols>");
    for (index, width) in SUMMARY_WIDTHS.iter().enumerate() {
        push_col(&mut xml, index + 1, *width);
    }
    xml.push_str("</cols>");
    xml.push_str("<sheetData>");
    for (row_index, (label, value)) in entries.iter().enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!("\n<row r=\"{}\">", row_number));
        push_cell(&mut xml, 1, row_number, &Value::from(label.as_str()), 0);
        push_cell(&mut xml, 2, row_number, value, 0);
        xml.push_str("</row>");
    }
    xml.push_str("\n</sheetData></worksheet>");
    xml
}

/// Companies sheet: bold centered header row (kept visible by a frozen
/// pane), one row per flattened company, widths derived from content.
fn companies_sheet_xml(rows: &[CompanyRow]) -> String {
    let widths = column_widths(rows);

    let mut xml = String::new();
    xml.push_str(XML_DECLARATION);
    xml.push_str(WORKSHEET_OPEN);
    xml.push_str(
        "<sheetViews><sheetView workbookViewId=\"0\">\
         <pane ySplit=\"1\" topLeftCell=\"A2\" activePane=\"bottomLeft\" state=\"frozen\"/>\
         </sheetView></sheetViews>",
    );
    xml.push_str("<cols>");
    for (index, width) in widths.iter().enumerate() {
        push_col(&mut xml, index + 1, *width);
    }
    xml.push_str("</cols>");
    xml.push_str("<sheetData>");

    xml.push_str("\n<row r=\"1\">");
    for (index, name) in headers().enumerate() {
        push_cell(&mut xml, index + 1, 1, &Value::from(name), 1);
    }
    xml.push_str("</row>");

    for (row_index, row) in rows.iter().enumerate() {
        let row_number = row_index + 2;
        xml.push_str(&format!("\n<row r=\"{}\">", row_number));
        for column_index in 0..FIELDS.len() {
            if let Some(value) = row.cells.get(column_index).and_then(Option::as_ref) {
                push_cell(&mut xml, column_index + 1, row_number, value, 0);
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("\n</sheetData></worksheet>");
    xml
}

/// Width per column: the longest rendered cell (header included) plus
/// padding, clamped to `[MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH]`.
fn column_widths(rows: &[CompanyRow]) -> Vec<usize> {
    FIELDS
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let mut longest = field.name.chars().count();
            for row in rows {
                if let Some(value) = row.cells.get(index).and_then(Option::as_ref) {
                    longest = longest.max(cell_text(value).chars().count());
                }
            }
            (longest + WIDTH_PADDING).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// How a cell renders to someone reading the sheet. Also what the width
/// derivation measures.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn push_col(xml: &mut String, index: usize, width: usize) {
    xml.push_str(&format!(
        "<col min=\"{}\" max=\"{}\" width=\"{}\" customWidth=\"1\"/>",
        index, index, width
    ));
}

fn push_cell(xml: &mut String, column: usize, row: usize, value: &Value, style: u32) {
    let reference = cell_reference(column, row);
    match value {
        Value::String(text) => xml.push_str(&format!(
            "<c r=\"{}\" s=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
            reference,
            style,
            xml_escape(text)
        )),
        Value::Number(number) => xml.push_str(&format!(
            "<c r=\"{}\" s=\"{}\"><v>{}</v></c>",
            reference, style, number
        )),
        Value::Bool(flag) => xml.push_str(&format!(
            "<c r=\"{}\" s=\"{}\" t=\"b\"><v>{}</v></c>",
            reference,
            style,
            u8::from(*flag)
        )),
        Value::Null => {}
        // Arrays and objects land as their compact JSON text.
        other => xml.push_str(&format!(
            "<c r=\"{}\" s=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
            reference,
            style,
            xml_escape(&other.to_string())
        )),
    }
}

fn cell_reference(column: usize, row: usize) -> String {
    format!("{}{}", column_letter(column), row)
}

/// 1-based column index to spreadsheet letters: 1 -> A, 26 -> Z, 27 -> AA.
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push(b'A' + remainder as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> ExportMetadata {
        ExportMetadata {
            total_records: 2,
            ateco_code: "6201".to_string(),
            province: "RM".to_string(),
            sandbox: false,
            source: "/IT-search".to_string(),
        }
    }

    fn field_index(name: &str) -> usize {
        FIELDS.iter().position(|field| field.name == name).unwrap()
    }

    fn row_with(values: &[(&str, Value)]) -> CompanyRow {
        let mut cells: Vec<Option<Value>> = vec![None; FIELDS.len()];
        for (name, value) in values {
            cells[field_index(name)] = Some(value.clone());
        }
        CompanyRow { cells }
    }

    fn read_part(workbook: &[u8], part: &str) -> String {
        let cursor = std::io::Cursor::new(workbook.to_vec());
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        let mut file = archive.by_name(part).unwrap();
        let mut content = String::new();
        std::io::Read::read_to_string(&mut file, &mut content).unwrap();
        content
    }

    #[test]
    fn test_workbook_part_inventory() {
        let workbook = build_workbook(&[], &metadata()).unwrap();

        let cursor = std::io::Cursor::new(workbook);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/workbook.xml",
                "xl/worksheets/sheet1.xml",
                "xl/worksheets/sheet2.xml",
            ]
        );
    }

    #[test]
    fn test_workbook_declares_both_sheets() {
        let workbook = build_workbook(&[], &metadata()).unwrap();
        let content = read_part(&workbook, "xl/workbook.xml");

        assert!(content.contains(r#"<sheet name="Summary" sheetId="1" r:id="rId1"/>"#));
        assert!(content.contains(r#"<sheet name="Companies" sheetId="2" r:id="rId2"/>"#));
    }

    #[test]
    fn test_companies_sheet_header_and_rows() {
        let rows = vec![
            row_with(&[("company_name", json!("PRIMA S.R.L.")), ("turnover", json!(1000))]),
            row_with(&[("company_name", json!("SECONDA S.P.A."))]),
        ];
        let workbook = build_workbook(&rows, &metadata()).unwrap();
        let sheet = read_part(&workbook, "xl/worksheets/sheet2.xml");

        // Frozen header row.
        assert!(sheet.contains(r#"state="frozen""#));
        assert!(sheet.contains(r#"ySplit="1""#));
        // Headers carry the bold centered style.
        assert!(sheet.contains(r#"<c r="A1" s="1" t="inlineStr"><is><t>id</t></is></c>"#));
        assert!(sheet.contains("<t>company_name</t>"));
        assert!(sheet.contains("<t>last_update</t>"));
        // Data rows keep upstream order.
        let first = sheet.find("PRIMA S.R.L.").unwrap();
        let second = sheet.find("SECONDA S.P.A.").unwrap();
        assert!(first < second);
        // Numbers are written as numeric cells.
        assert!(sheet.contains("<v>1000</v>"));
    }

    #[test]
    fn test_column_count_matches_schema() {
        let workbook = build_workbook(&[], &metadata()).unwrap();
        let sheet = read_part(&workbook, "xl/worksheets/sheet2.xml");

        assert_eq!(sheet.matches("<col ").count(), FIELDS.len());
        let last_header = cell_reference(FIELDS.len(), 1);
        assert!(sheet.contains(&format!(r#"<c r="{}" s="1""#, last_header)));
    }

    #[test]
    fn test_column_widths_derived_from_content() {
        let rows = vec![row_with(&[
            ("company_name", json!("X".repeat(200))),
            ("vat_code", json!("123")),
        ])];
        let widths = column_widths(&rows);

        // Oversized content clamps to the cap.
        assert_eq!(widths[field_index("company_name")], MAX_COLUMN_WIDTH);
        // Short content floors at the minimum.
        assert_eq!(widths[field_index("vat_code")], MIN_COLUMN_WIDTH);
        // Long headers win over short content.
        assert_eq!(
            widths[field_index("primary_sic_description")],
            "primary_sic_description".len() + WIDTH_PADDING
        );
    }

    #[test]
    fn test_cell_values_are_escaped() {
        let rows = vec![row_with(&[(
            "company_name",
            json!(r#"R&D <Società> "Speciale""#),
        )])];
        let workbook = build_workbook(&rows, &metadata()).unwrap();
        let sheet = read_part(&workbook, "xl/worksheets/sheet2.xml");

        assert!(sheet.contains("R&amp;D &lt;Società&gt; &quot;Speciale&quot;"));
        assert!(!sheet.contains("R&D"));
    }

    #[test]
    fn test_summary_sheet_contents() {
        let workbook = build_workbook(&[], &metadata()).unwrap();
        let sheet = read_part(&workbook, "xl/worksheets/sheet1.xml");

        assert!(sheet.contains("<t>Generated at</t>"));
        assert!(sheet.contains("<t>total_records</t>"));
        assert!(sheet.contains("<v>2</v>"));
        assert!(sheet.contains("<t>province</t>"));
        assert!(sheet.contains("<t>RM</t>"));
        // Booleans render as boolean cells.
        assert!(sheet.contains(r#"t="b"><v>0</v>"#));
        assert!(sheet.contains(r#"<col min="1" max="1" width="30" customWidth="1"/>"#));
        assert!(sheet.contains(r#"<col min="2" max="2" width="40" customWidth="1"/>"#));
        // No frozen pane on the summary sheet.
        assert!(!sheet.contains("frozen"));
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(2), "B");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(32), "AF");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(53), "BA");
    }

    #[test]
    fn test_missing_cells_stay_empty() {
        // A row shorter than the schema must not panic or shift columns.
        let short_row = CompanyRow {
            cells: vec![Some(json!("only-id"))],
        };
        let workbook = build_workbook(&[short_row], &metadata()).unwrap();
        let sheet = read_part(&workbook, "xl/worksheets/sheet2.xml");

        assert!(sheet.contains("<t>only-id</t>"));
        assert!(sheet.contains(r#"<row r="2"><c r="A2""#));
    }
}
