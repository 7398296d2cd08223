//! Template-mode document operations on the docx-rs model.
//!
//! Everything here mutates an already-loaded [`Docx`] in place: placeholder
//! substitution across every run, bounds-guarded positional cell writes
//! into the template's tables, caption rewriting, and image insertion.
//! Template tables are externally authored and vary in shape, so the
//! established policy is tolerance: a write whose target row or column does
//! not exist is skipped silently rather than aborting the conversion.

use docx_rs::{
    AlignmentType, Docx, DocumentChild, Paragraph, ParagraphChild, Pic, Run, RunChild, RunFonts,
    Table, TableCellContent, TableChild, TableRowChild,
};
use pqreport_core::extract::{DeviationBand, DeviationSummary, HarmonicSummary, SteadySummary};
use pqreport_core::{format_fixed, ReplaceMap, NOT_APPLICABLE};

/// Font for numeric/Latin cell content.
pub(crate) const LATIN_FONT: &str = "Times New Roman";
/// Font for CJK captions and labels.
pub(crate) const EAST_ASIAN_FONT: &str = "SimSun";
/// Cell run size in half-points (10 pt).
pub(crate) const CELL_FONT_SIZE: usize = 20;
/// Caption run size in half-points (12 pt).
pub(crate) const CAPTION_FONT_SIZE: usize = 24;

/// Fixed conversion from pixels to document EMUs.
const EMU_PER_PIXEL: u32 = 9525;

/// Captions starting with this prefix are the report's lead figure and are
/// exempt from location splicing.
const FIRST_FIGURE_PREFIX: &str = "图1.1";

/// Reported frequencies render as deviation from this nominal.
pub(crate) const NOMINAL_FREQUENCY_HZ: f64 = 50.0;

/// Fundamental-voltage divisor: the sheet stores volts, the report shows
/// kilovolts.
pub(crate) const VOLTS_PER_KILOVOLT: f64 = 1000.0;

// Template-table cell coordinates (document side, 0-based).
const FUNDAMENTAL_FILL_ROW: usize = 2;
const HARMONIC_FILL_FIRST_ROW: usize = 3;
const THD_FILL_ROW: usize = 27;
const HARMONIC_LIMIT_COL: usize = 8;
const SECTION_LIMIT_COL: usize = 7;
const FREQUENCY_FILL_ROW: usize = 1;
const UNBALANCE_FILL_ROW: usize = 2;
const FLICKER_FILL_FIRST_ROW: usize = 3;
const STEADY_FIRST_VALUE_COL: usize = 1;
const STEADY_LIMIT_COL: usize = 5;
const FLICKER_FIRST_VALUE_COL: usize = 2;
const FLICKER_LIMIT_COL: usize = 6;
const DEVIATION_UP_FILL_ROW: usize = 2;
const DEVIATION_DOWN_FILL_ROW: usize = 3;

/// Concatenated text of a paragraph's runs.
pub(crate) fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(text) = run_child {
                    out.push_str(&text.text);
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Placeholder substitution
// ---------------------------------------------------------------------------

/// Replace every `{{key}}` occurrence for keys in `map`, in every run of
/// every paragraph — top-level and nested inside table cells. Keys absent
/// from the map are left untouched; run formatting is preserved.
pub fn substitute_placeholders(docx: &mut Docx, map: &ReplaceMap) {
    for child in &mut docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => substitute_in_paragraph(paragraph, map),
            DocumentChild::Table(table) => substitute_in_table(table, map),
            _ => {}
        }
    }
}

fn substitute_in_paragraph(paragraph: &mut Paragraph, map: &ReplaceMap) {
    for child in &mut paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &mut run.children {
                if let RunChild::Text(text) = run_child {
                    text.text = apply_map(&text.text, map);
                }
            }
        }
    }
}

fn substitute_in_table(table: &mut Table, map: &ReplaceMap) {
    for row in &mut table.rows {
        let TableChild::TableRow(row) = row;
        for cell in &mut row.cells {
            let TableRowChild::TableCell(cell) = cell;
            for content in &mut cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => {
                        substitute_in_paragraph(paragraph, map);
                    }
                    TableCellContent::Table(nested) => substitute_in_table(nested, map),
                    _ => {}
                }
            }
        }
    }
}

/// All mapped tokens in one pass; several distinct keys may occur in a
/// single run.
fn apply_map(text: &str, map: &ReplaceMap) -> String {
    let mut out = text.to_string();
    for (key, value) in map {
        let token = format!("{{{{{key}}}}}");
        if out.contains(&token) {
            out = out.replace(&token, value);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Positional cell writes
// ---------------------------------------------------------------------------

/// Write `text` into an existing table cell, replacing its whole content
/// with one centered paragraph at the fixed cell font. Out-of-range
/// coordinates are skipped silently — template shapes vary.
pub fn set_cell_text(table: &mut Table, row: usize, col: usize, text: &str) {
    let Some(TableChild::TableRow(table_row)) = table.rows.get_mut(row) else {
        return;
    };
    let Some(TableRowChild::TableCell(cell)) = table_row.cells.get_mut(col) else {
        return;
    };
    cell.children.clear();
    cell.children
        .push(TableCellContent::Paragraph(Box::new(cell_paragraph(text))));
}

fn cell_paragraph(text: &str) -> Paragraph {
    Paragraph::new().align(AlignmentType::Center).add_run(
        Run::new()
            .add_text(text)
            .size(CELL_FONT_SIZE)
            .fonts(RunFonts::new().ascii(LATIN_FONT)),
    )
}

/// Caption paragraph at the fixed caption font.
pub(crate) fn caption_paragraph(title: &str) -> Paragraph {
    Paragraph::new().add_run(
        Run::new()
            .add_text(title)
            .size(CAPTION_FONT_SIZE)
            .fonts(
                RunFonts::new()
                    .ascii(EAST_ASIAN_FONT)
                    .east_asia(EAST_ASIAN_FONT),
            ),
    )
}

/// Number of tables among the document's top-level elements.
pub fn table_count(docx: &Docx) -> usize {
    docx.document
        .children
        .iter()
        .filter(|c| matches!(c, DocumentChild::Table(_)))
        .count()
}

/// Mutable access to the nth top-level table, in document order.
pub fn table_mut(docx: &mut Docx, index: usize) -> Option<&mut Table> {
    docx.document
        .children
        .iter_mut()
        .filter_map(|child| match child {
            DocumentChild::Table(table) => Some(&mut **table),
            _ => None,
        })
        .nth(index)
}

/// Rewrite the paragraph directly preceding the nth table to `title`.
/// When the table has no preceding paragraph, a new caption paragraph is
/// inserted in front of it.
pub fn set_table_caption(docx: &mut Docx, table_index: usize, title: &str) {
    let mut seen = 0usize;
    let mut table_pos = None;
    for (i, child) in docx.document.children.iter().enumerate() {
        if matches!(child, DocumentChild::Table(_)) {
            if seen == table_index {
                table_pos = Some(i);
                break;
            }
            seen += 1;
        }
    }
    let Some(pos) = table_pos else {
        return;
    };
    if pos > 0 {
        if let DocumentChild::Paragraph(paragraph) = &mut docx.document.children[pos - 1] {
            let rebuilt = caption_paragraph(title);
            paragraph.children = rebuilt.children;
            return;
        }
    }
    docx.document
        .children
        .insert(pos, DocumentChild::Paragraph(Box::new(caption_paragraph(title))));
}

// ---------------------------------------------------------------------------
// Section fills
// ---------------------------------------------------------------------------

/// Fill one harmonic statistics table. The voltage and current tables share
/// a single layout and differ only in the unit of the fundamental row, so
/// both go through this one routine; `fundamental_divisor` is 1000 for the
/// voltage table (V → kV) and 1 for the current table.
pub fn fill_harmonic_table(table: &mut Table, summary: &HarmonicSummary, fundamental_divisor: f64) {
    for (i, phase) in summary.phases.iter().enumerate() {
        let average_col = 1 + 2 * i;
        let p95_col = average_col + 1;
        set_cell_text(
            table,
            FUNDAMENTAL_FILL_ROW,
            average_col,
            &format_fixed(phase.average.fundamental / fundamental_divisor, 2),
        );
        set_cell_text(
            table,
            FUNDAMENTAL_FILL_ROW,
            p95_col,
            &format_fixed(phase.p95.fundamental / fundamental_divisor, 2),
        );
        // harmonic rows carry an extra leading order column
        for (n, ratio) in phase.average.ratios.iter().enumerate() {
            set_cell_text(
                table,
                HARMONIC_FILL_FIRST_ROW + n,
                average_col + 1,
                &format_fixed(*ratio, 2),
            );
        }
        for (n, ratio) in phase.p95.ratios.iter().enumerate() {
            set_cell_text(
                table,
                HARMONIC_FILL_FIRST_ROW + n,
                p95_col + 1,
                &format_fixed(*ratio, 2),
            );
        }
        set_cell_text(
            table,
            THD_FILL_ROW,
            average_col,
            &format_fixed(phase.average.thd, 2),
        );
        set_cell_text(table, THD_FILL_ROW, p95_col, &format_fixed(phase.p95.thd, 2));
    }
    for (n, limit) in summary.ratio_limits.iter().enumerate() {
        set_cell_text(
            table,
            HARMONIC_FILL_FIRST_ROW + n,
            HARMONIC_LIMIT_COL,
            &format_fixed(*limit, 2),
        );
    }
    // the fundamental row has no regulatory limit
    set_cell_text(table, FUNDAMENTAL_FILL_ROW, SECTION_LIMIT_COL, NOT_APPLICABLE);
    set_cell_text(
        table,
        THD_FILL_ROW,
        SECTION_LIMIT_COL,
        &format_fixed(summary.thd_limit, 2),
    );
}

/// Fill the frequency / unbalance / long-term flicker table. Frequencies
/// render as deviation from the 50 Hz nominal; the frequency limit is the
/// sheet's raw text.
pub fn fill_steady_table(table: &mut Table, summary: &SteadySummary) {
    let freq = [
        summary.frequency.max,
        summary.frequency.average,
        summary.frequency.min,
        summary.frequency.p95,
    ];
    for (i, value) in freq.iter().enumerate() {
        set_cell_text(
            table,
            FREQUENCY_FILL_ROW,
            STEADY_FIRST_VALUE_COL + i,
            &format_fixed(value - NOMINAL_FREQUENCY_HZ, 2),
        );
    }
    set_cell_text(
        table,
        FREQUENCY_FILL_ROW,
        STEADY_LIMIT_COL,
        &summary.frequency_limit,
    );

    let unbalance = [
        summary.unbalance.max,
        summary.unbalance.average,
        summary.unbalance.min,
        summary.unbalance.p95,
    ];
    for (i, value) in unbalance.iter().enumerate() {
        set_cell_text(
            table,
            UNBALANCE_FILL_ROW,
            STEADY_FIRST_VALUE_COL + i,
            &format_fixed(*value, 2),
        );
    }
    set_cell_text(
        table,
        UNBALANCE_FILL_ROW,
        STEADY_LIMIT_COL,
        &format_fixed(summary.unbalance_limit, 2),
    );

    for (b, block) in summary.flicker.iter().enumerate() {
        let row = FLICKER_FILL_FIRST_ROW + b;
        let stats = [
            block.stats.max,
            block.stats.average,
            block.stats.min,
            block.stats.p95,
        ];
        for (i, value) in stats.iter().enumerate() {
            set_cell_text(
                table,
                row,
                FLICKER_FIRST_VALUE_COL + i,
                &format_fixed(*value, 2),
            );
        }
        set_cell_text(
            table,
            row,
            FLICKER_LIMIT_COL,
            &format_fixed(summary.flicker_limit, 2),
        );
    }
}

/// Fill the voltage-deviation table: upward band, then downward band with
/// its already-negated limit.
pub fn fill_deviation_table(table: &mut Table, summary: &DeviationSummary) {
    fill_deviation_row(table, DEVIATION_UP_FILL_ROW, &summary.up, summary.up_limit);
    fill_deviation_row(
        table,
        DEVIATION_DOWN_FILL_ROW,
        &summary.down,
        summary.down_limit,
    );
}

fn fill_deviation_row(table: &mut Table, row: usize, bands: &[DeviationBand], limit: f64) {
    for (i, band) in bands.iter().enumerate() {
        set_cell_text(table, row, 1 + 2 * i, &format_fixed(band.max, 2));
        set_cell_text(table, row, 2 + 2 * i, &format_fixed(band.min, 2));
    }
    set_cell_text(table, row, SECTION_LIMIT_COL, &format_fixed(limit, 2));
}

// ---------------------------------------------------------------------------
// Image insertion
// ---------------------------------------------------------------------------

/// Image payload kind, inferred from the filename extension. Anything
/// unrecognized is treated as PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Bmp,
    Gif,
}

impl ImageKind {
    #[must_use]
    pub fn from_filename(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            Self::Jpeg
        } else if lower.ends_with(".bmp") {
            Self::Bmp
        } else if lower.ends_with(".gif") {
            Self::Gif
        } else {
            Self::Png
        }
    }
}

impl From<ImageKind> for image::ImageFormat {
    fn from(kind: ImageKind) -> Self {
        match kind {
            ImageKind::Png => Self::Png,
            ImageKind::Jpeg => Self::Jpeg,
            ImageKind::Bmp => Self::Bmp,
            ImageKind::Gif => Self::Gif,
        }
    }
}

/// Replace the first paragraph containing `placeholder` with the embedded
/// image scaled to the given pixel size, then splice the monitor location
/// into the following caption paragraph. Returns `false` when no paragraph
/// contains the placeholder.
pub fn insert_image(
    docx: &mut Docx,
    placeholder: &str,
    bytes: &[u8],
    width_px: u32,
    height_px: u32,
    location: &str,
) -> bool {
    let children = &mut docx.document.children;
    let Some(pos) = children.iter().position(|child| {
        matches!(child, DocumentChild::Paragraph(p) if paragraph_text(p).contains(placeholder))
    }) else {
        return false;
    };

    if let DocumentChild::Paragraph(paragraph) = &mut children[pos] {
        let pic = Pic::new(bytes).size(width_px * EMU_PER_PIXEL, height_px * EMU_PER_PIXEL);
        paragraph.children.clear();
        paragraph
            .children
            .push(ParagraphChild::Run(Box::new(Run::new().add_image(pic))));
    }

    // the caption is the next paragraph element, if one exists
    let caption_pos = (pos + 1..children.len())
        .find(|&i| matches!(children[i], DocumentChild::Paragraph(_)));
    if let Some(caption_pos) = caption_pos {
        if let DocumentChild::Paragraph(paragraph) = &mut children[caption_pos] {
            let caption = splice_location(&paragraph_text(paragraph), location);
            let rebuilt = caption_paragraph(&caption);
            paragraph.children = rebuilt.children;
        }
    }
    true
}

/// Splice `location` in after the caption's first space-delimited token
/// (`图1.2 谐波曲线` → `图1.2 变电站A谐波曲线`). The report's lead figure
/// caption is exempt and returned unchanged.
fn splice_location(caption: &str, location: &str) -> String {
    if caption.trim().starts_with(FIRST_FIGURE_PREFIX) {
        return caption.to_string();
    }
    match caption.find(' ') {
        Some(i) if i + 1 < caption.len() => {
            let (head, tail) = caption.split_at(i + 1);
            format!("{head} {location}{tail}")
        }
        _ => format!("{caption} {location}"),
    }
}
