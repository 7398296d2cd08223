//! Conversion orchestration: workbook in, report document out.
//!
//! One conversion runs start to finish through four states: sheets loaded,
//! replacement map populated (including the derived keys), document
//! rendered — against a supplied template or from scratch — and the result
//! saved under the fixed output path. Any step failure aborts the
//! conversion and surfaces the error; there is no partial output beyond
//! whatever an interrupted file write leaves behind.

use docx_rs::{read_docx, BreakType, Docx, Paragraph, Run};
use pqreport_core::extract::{
    deviation_summary, harmonic_summary, monitor_location, steady_summary,
};
use pqreport_core::meta::{MAX_VOLTAGE_DEVIATION_KEY, MEASUREMENT_KEY};
use pqreport_core::{
    flatten_measurements, format_fixed, MeasurementEntry, ReplaceMap, ReportError, Result,
    SheetKind,
};
use std::fs;
use std::path::{Path, PathBuf};

use crate::docx::{
    caption_paragraph, fill_deviation_table, fill_harmonic_table, fill_steady_table, insert_image,
    set_table_caption, substitute_placeholders, table_count, table_mut, ImageKind,
    VOLTS_PER_KILOVOLT,
};
use crate::tables::{
    deviation_table_spec, harmonic_table_spec, realize, steady_table_spec, TableSpec,
};
use crate::xlsx::load_sheet_data_from_bytes;

/// Fixed output location, overwritten on every run. Concurrent conversions
/// race on it and the last writer wins.
const DEFAULT_OUTPUT_DIR: &str = "outputs";
const OUTPUT_FILE_NAME: &str = "output.docx";

/// Embedded chart images render at this fixed pixel size.
const IMAGE_WIDTH_PX: u32 = 400;
const IMAGE_HEIGHT_PX: u32 = 250;

/// How many tables, in document order, a usable template must contain.
const REQUIRED_TABLES: usize = 4;

/// Report-table titles, in document order.
const TABLE_TITLES: [&str; 4] = [
    "谐波电压统计表",
    "谐波电流统计表",
    "频率偏差、三相电压不平衡度及长时间闪变统计表",
    "电压偏差统计表",
];

/// One chart image to embed, matched to placeholder `{{imageN}}` by
/// 1-based position.
#[derive(Debug, Clone)]
pub struct ReportImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Everything one conversion consumes.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    /// Workbook bytes (required).
    pub workbook: Vec<u8>,
    /// Template document bytes; `None` switches to from-scratch generation.
    pub template: Option<Vec<u8>>,
    /// Chart images, in placeholder order.
    pub images: Vec<ReportImage>,
    /// Flat report metadata fields, keyed by placeholder name.
    pub fields: ReplaceMap,
    /// Measuring-instrument list, flattened into the `measurement` field.
    pub measurements: Vec<MeasurementEntry>,
}

/// Conversion options.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Directory the report is written into, created if absent.
    pub output_dir: PathBuf,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ConvertOptions {
    /// Override the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// The conversion orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ReportConverter {
    options: ConvertOptions,
}

impl ReportConverter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Run one conversion and return the path of the written document.
    pub fn convert(&self, request: &ConvertRequest) -> Result<PathBuf> {
        // Loaded
        let sheets = load_sheet_data_from_bytes(&request.workbook)?;
        let location = monitor_location(&sheets);
        let voltage = harmonic_summary(&sheets, SheetKind::VoltageHarmonic);
        let current = harmonic_summary(&sheets, SheetKind::CurrentHarmonic);
        let steady = steady_summary(&sheets);
        let deviation = deviation_summary(&sheets);

        // Populated: derived keys go in before any substitution runs
        let mut map = request.fields.clone();
        map.insert(
            MEASUREMENT_KEY.to_string(),
            flatten_measurements(&request.measurements),
        );
        map.insert(
            MAX_VOLTAGE_DEVIATION_KEY.to_string(),
            format_fixed(deviation.max_up_deviation(), 2),
        );

        // Rendered
        let docx = match &request.template {
            Some(template) => {
                let mut docx = read_docx(template)
                    .map_err(|e| ReportError::Template(format!("failed to read template: {e}")))?;
                substitute_placeholders(&mut docx, &map);
                if table_count(&docx) < REQUIRED_TABLES {
                    return Err(ReportError::Template(format!(
                        "template holds {} tables, expected at least {REQUIRED_TABLES}",
                        table_count(&docx)
                    )));
                }
                for (i, title) in TABLE_TITLES.iter().enumerate() {
                    set_table_caption(&mut docx, i, &table_title(i, &location, title));
                }
                if let Some(table) = table_mut(&mut docx, 0) {
                    fill_harmonic_table(table, &voltage, VOLTS_PER_KILOVOLT);
                }
                if let Some(table) = table_mut(&mut docx, 1) {
                    fill_harmonic_table(table, &current, 1.0);
                }
                if let Some(table) = table_mut(&mut docx, 2) {
                    fill_steady_table(table, &steady);
                }
                if let Some(table) = table_mut(&mut docx, 3) {
                    fill_deviation_table(table, &deviation);
                }
                embed_images(&mut docx, &request.images, &location);
                docx
            }
            None => {
                let specs = [
                    harmonic_table_spec(&voltage, "基波电压(kV)", VOLTS_PER_KILOVOLT),
                    harmonic_table_spec(&current, "基波电流(A)", 1.0),
                    steady_table_spec(&steady),
                    deviation_table_spec(&deviation),
                ];
                generated_document(&location, &specs)
            }
        };

        // Saved
        self.write_document(docx)
    }

    fn write_document(&self, docx: Docx) -> Result<PathBuf> {
        fs::create_dir_all(&self.options.output_dir)?;
        let path = self.options.output_dir.join(OUTPUT_FILE_NAME);
        let file = fs::File::create(&path)?;
        docx.build()
            .pack(file)
            .map_err(|e| ReportError::Document(format!("failed to write document: {e}")))?;
        log::info!("report written to {}", path.display());
        Ok(path)
    }
}

fn table_title(index: usize, location: &str, title: &str) -> String {
    format!("表1.{}  {location}{title}", index + 1)
}

/// From-scratch rendering: caption paragraph, table, page break, four times
/// over.
fn generated_document(location: &str, specs: &[TableSpec]) -> Docx {
    let mut docx = Docx::new();
    for (i, spec) in specs.iter().enumerate() {
        docx = docx
            .add_paragraph(caption_paragraph(&table_title(i, location, TABLE_TITLES[i])))
            .add_table(realize(spec));
        if i + 1 < specs.len() {
            docx = docx
                .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
        }
    }
    docx
}

/// Embed each image at its 1-based placeholder. Failures are per-image:
/// an undecodable payload or a missing placeholder is logged and skipped,
/// and the conversion carries on.
fn embed_images(docx: &mut Docx, images: &[ReportImage], location: &str) {
    for (i, image) in images.iter().enumerate() {
        let placeholder = format!("{{{{image{}}}}}", i + 1);
        let kind = ImageKind::from_filename(&image.filename);
        if let Err(e) = image::load_from_memory_with_format(&image.bytes, kind.into()) {
            log::warn!("skipping image {}: {e}", image.filename);
            continue;
        }
        if !insert_image(
            docx,
            &placeholder,
            &image.bytes,
            IMAGE_WIDTH_PX,
            IMAGE_HEIGHT_PX,
            location,
        ) {
            log::warn!(
                "placeholder {placeholder} not found in template, skipping image {}",
                image.filename
            );
        }
    }
}

/// Relative download reference for a written report, derived from its
/// filename.
#[must_use]
pub fn download_reference(path: &Path) -> String {
    let name = path
        .file_name()
        .map_or_else(|| OUTPUT_FILE_NAME.to_string(), |n| n.to_string_lossy().into_owned());
    format!("/download/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::paragraph_text;
    use docx_rs::{
        AlignmentType, DocumentChild, Table, TableCell, TableCellContent, TableChild, TableRow,
        TableRowChild,
    };
    use rust_xlsxwriter::Workbook;

    /// Author a workbook with recognizable values at the layout coordinates.
    fn sample_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();

        let voltage = workbook.add_worksheet();
        voltage.set_name("电压谐波").unwrap();
        voltage.write_string(1, 0, "监测点：变电站A").unwrap();
        voltage.write_number(9, 3, 6350.0).unwrap();
        voltage.write_number(9, 5, 6410.0).unwrap();
        for row in 10..=33 {
            voltage.write_number(row, 3, 0.5).unwrap();
            voltage.write_number(row, 17, 3.2).unwrap();
        }
        voltage.write_number(59, 3, 2.1).unwrap();
        voltage.write_number(59, 17, 4.0).unwrap();
        // flicker row
        voltage.write_number(61, 2, 0.3).unwrap();
        voltage.write_number(61, 17, 1.0).unwrap();
        // deviation rows
        voltage.write_number(63, 2, 2.4).unwrap();
        voltage.write_number(63, 7, 2.9).unwrap();
        voltage.write_number(63, 12, 2.7).unwrap();
        voltage.write_number(63, 17, 7.0).unwrap();
        voltage.write_number(64, 2, 1.1).unwrap();
        voltage.write_number(64, 17, 3.0).unwrap();

        let current = workbook.add_worksheet();
        current.set_name("电流谐波").unwrap();
        current.write_number(9, 3, 120.5).unwrap();

        let power = workbook.add_worksheet();
        power.set_name("功率").unwrap();
        power.write_number(15, 2, 50.02).unwrap();
        power.write_string(15, 17, "±0.2").unwrap();
        power.write_number(16, 2, 0.8).unwrap();
        power.write_number(16, 17, 2.0).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    fn blank_table(rows: usize, cols: usize) -> Table {
        Table::new(
            (0..rows)
                .map(|_| {
                    TableRow::new(
                        (0..cols)
                            .map(|_| {
                                TableCell::new().add_paragraph(
                                    docx_rs::Paragraph::new()
                                        .add_run(docx_rs::Run::new().add_text("")),
                                )
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// A minimal template: caption + table, four times, plus a placeholder
    /// paragraph.
    fn sample_template() -> Vec<u8> {
        let mut docx = Docx::new().add_paragraph(
            docx_rs::Paragraph::new()
                .align(AlignmentType::Center)
                .add_run(docx_rs::Run::new().add_text("检测报告 {{reportNo}} {{measurement}}")),
        );
        for (rows, cols) in [(28, 9), (28, 9), (6, 7), (4, 8)] {
            docx = docx
                .add_paragraph(
                    docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text("caption")),
                )
                .add_table(blank_table(rows, cols));
        }
        let mut buffer = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut buffer).unwrap();
        buffer.into_inner()
    }

    fn document_text(docx: &Docx) -> String {
        let mut out = String::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => {
                    out.push_str(&paragraph_text(p));
                    out.push('\n');
                }
                DocumentChild::Table(t) => push_table_text(t, &mut out),
                _ => {}
            }
        }
        out
    }

    fn push_table_text(table: &Table, out: &mut String) {
        for row in &table.rows {
            let TableChild::TableRow(row) = row;
            for cell in &row.cells {
                let TableRowChild::TableCell(cell) = cell;
                for content in &cell.children {
                    if let TableCellContent::Paragraph(p) = content {
                        out.push_str(&paragraph_text(p));
                        out.push(' ');
                    }
                }
            }
            out.push('\n');
        }
    }

    fn cell_text(table: &Table, row: usize, col: usize) -> String {
        let TableChild::TableRow(table_row) = &table.rows[row];
        let TableRowChild::TableCell(cell) = &table_row.cells[col];
        cell.children
            .iter()
            .map(|content| match content {
                TableCellContent::Paragraph(p) => paragraph_text(p),
                _ => String::new(),
            })
            .collect()
    }

    fn read_back(path: &std::path::Path) -> Docx {
        read_docx(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_generated_mode_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let converter =
            ReportConverter::with_options(ConvertOptions::default().with_output_dir(dir.path()));
        let request = ConvertRequest {
            workbook: sample_workbook(),
            ..ConvertRequest::default()
        };
        let path = converter.convert(&request).unwrap();
        assert_eq!(path, dir.path().join("output.docx"));

        let docx = read_back(&path);
        let text = document_text(&docx);
        assert!(text.contains("表1.1  变电站A谐波电压统计表"));
        assert!(text.contains("表1.4  变电站A电压偏差统计表"));
        assert!(text.contains("6.35")); // 6350 V → kV
        assert!(text.contains("±0.2"));
        assert!(text.contains("-3.00")); // negated down limit
        assert_eq!(
            docx.document
                .children
                .iter()
                .filter(|c| matches!(c, DocumentChild::Table(_)))
                .count(),
            4
        );
    }

    #[test]
    fn test_template_mode_fills_cells_and_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let converter =
            ReportConverter::with_options(ConvertOptions::default().with_output_dir(dir.path()));
        let mut fields = ReplaceMap::new();
        fields.insert("reportNo".to_string(), "R-2024-07".to_string());
        let request = ConvertRequest {
            workbook: sample_workbook(),
            template: Some(sample_template()),
            fields,
            measurements: vec![MeasurementEntry {
                measurement: "PQ-Box".to_string(),
                certificate_no: "C42".to_string(),
                certificate_date: "2024-05-01".to_string(),
            }],
            ..ConvertRequest::default()
        };
        let path = converter.convert(&request).unwrap();
        let docx = read_back(&path);

        // placeholder substitution, including the derived measurement key
        let text = document_text(&docx);
        assert!(text.contains("R-2024-07"));
        assert!(text.contains("PQ-Box  C42  2024-05-01"));
        assert!(!text.contains("{{reportNo}}"));

        // captions rewritten in place
        assert!(text.contains("表1.2  变电站A谐波电流统计表"));

        // positional fills: voltage fundamental in kV, THD, deviation limit
        let tables: Vec<&Table> = docx
            .document
            .children
            .iter()
            .filter_map(|c| match c {
                DocumentChild::Table(t) => Some(&**t),
                _ => None,
            })
            .collect();
        assert_eq!(cell_text(tables[0], 2, 1), "6.35");
        assert_eq!(cell_text(tables[0], 2, 2), "6.41");
        assert_eq!(cell_text(tables[0], 27, 1), "2.10");
        assert_eq!(cell_text(tables[0], 2, 7), "—");
        assert_eq!(cell_text(tables[1], 2, 1), "120.50");
        assert_eq!(cell_text(tables[2], 1, 1), "0.02");
        assert_eq!(cell_text(tables[2], 1, 5), "±0.2");
        assert_eq!(cell_text(tables[3], 2, 7), "7.00");
        assert_eq!(cell_text(tables[3], 3, 7), "-3.00");
    }

    #[test]
    fn test_template_with_too_few_tables_is_fatal() {
        let docx = Docx::new().add_table(blank_table(2, 2));
        let mut buffer = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut buffer).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let converter =
            ReportConverter::with_options(ConvertOptions::default().with_output_dir(dir.path()));
        let request = ConvertRequest {
            workbook: sample_workbook(),
            template: Some(buffer.into_inner()),
            ..ConvertRequest::default()
        };
        let err = converter.convert(&request).unwrap_err();
        assert!(matches!(err, ReportError::Template(_)));
    }

    #[test]
    fn test_max_voltage_deviation_placeholder_resolves() {
        let mut docx = Docx::new().add_paragraph(
            docx_rs::Paragraph::new()
                .add_run(docx_rs::Run::new().add_text("最大上偏差 {{maxVoltageDeviation}}%")),
        );
        for (rows, cols) in [(28, 9), (28, 9), (6, 7), (4, 8)] {
            docx = docx
                .add_paragraph(
                    docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text("caption")),
                )
                .add_table(blank_table(rows, cols));
        }
        let mut buffer = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut buffer).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let converter =
            ReportConverter::with_options(ConvertOptions::default().with_output_dir(dir.path()));
        let request = ConvertRequest {
            workbook: sample_workbook(),
            template: Some(buffer.into_inner()),
            ..ConvertRequest::default()
        };
        let path = converter.convert(&request).unwrap();
        let text = document_text(&read_back(&path));
        // largest of the three up-deviation maxima (2.4, 2.9, 2.7)
        assert!(text.contains("最大上偏差 2.90%"));
    }

    #[test]
    fn test_unreadable_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let converter =
            ReportConverter::with_options(ConvertOptions::default().with_output_dir(dir.path()));
        let request = ConvertRequest {
            workbook: sample_workbook(),
            template: Some(sample_template()),
            images: vec![ReportImage {
                filename: "broken.png".to_string(),
                bytes: vec![0, 1, 2, 3],
            }],
            ..ConvertRequest::default()
        };
        // the broken image must not abort the conversion
        assert!(converter.convert(&request).is_ok());
    }

    #[test]
    fn test_download_reference() {
        assert_eq!(
            download_reference(Path::new("outputs/output.docx")),
            "/download/output.docx"
        );
    }
}
