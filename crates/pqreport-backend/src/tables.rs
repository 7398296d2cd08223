//! From-scratch table generation for the template-less rendering mode.
//!
//! A table's logical content is assembled first as plain data — a
//! [`TableSpec`] of rows of [`CellSpec`]s — and realized against the
//! document library in a single step ([`realize`]). The builders below know
//! nothing about the document format; [`realize`] knows nothing about the
//! report.
//!
//! Merging maps onto the document model as follows: a horizontal merge is a
//! `gridSpan` on the anchor cell (continuation cells are simply absent from
//! the row), a vertical merge is a `vMerge` restart on the anchor and a
//! `vMerge` continue on every cell below it. Each cell is therefore
//! unambiguously either a fresh region start or a continuation per
//! direction.

use docx_rs::{
    AlignmentType, HeightRule, Paragraph, Run, RunFonts, Table, TableAlignmentType, TableCell,
    TableRow, VAlignType, VMergeType,
};
use pqreport_core::extract::{DeviationSummary, HarmonicSummary, SteadySummary};
use pqreport_core::layout::FIRST_HARMONIC_ORDER;
use pqreport_core::{format_fixed, NOT_APPLICABLE};

use crate::docx::{
    CELL_FONT_SIZE, EAST_ASIAN_FONT, LATIN_FONT, NOMINAL_FREQUENCY_HZ, VOLTS_PER_KILOVOLT,
};

/// Fixed row height, twentieths of a point.
const ROW_HEIGHT: f32 = 400.0;

/// Minimum column width, twentieths of a point.
const MIN_COLUMN_WIDTH: usize = 1000;

/// Position of a cell inside a vertical merge region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePosition {
    /// Anchor: holds the visible text.
    Start,
    /// Continuation: no content of its own.
    Continue,
}

/// Logical content of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSpec {
    pub text: String,
    /// Number of grid columns this cell spans horizontally.
    pub span: usize,
    pub merge: Option<MergePosition>,
}

impl CellSpec {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: 1,
            merge: None,
        }
    }

    pub fn spanning(text: impl Into<String>, span: usize) -> Self {
        Self {
            text: text.into(),
            span,
            merge: None,
        }
    }

    pub fn merge_start(text: impl Into<String>, span: usize) -> Self {
        Self {
            text: text.into(),
            span,
            merge: Some(MergePosition::Start),
        }
    }

    pub fn merge_continue(span: usize) -> Self {
        Self {
            text: String::new(),
            span,
            merge: Some(MergePosition::Continue),
        }
    }
}

/// Logical content of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSpec {
    pub cells: Vec<CellSpec>,
}

impl RowSpec {
    pub fn new(cells: Vec<CellSpec>) -> Self {
        Self { cells }
    }
}

/// Logical content of one generated table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    /// Number of grid columns.
    pub columns: usize,
    pub rows: Vec<RowSpec>,
}

/// Realize a logical table against the document model, applying the uniform
/// styling: fixed row height, minimum column widths, centered paragraphs,
/// centered vertical alignment, and per-script fonts (a serif Latin face
/// for figures, the standard CJK face for labels).
pub fn realize(spec: &TableSpec) -> Table {
    let rows = spec
        .rows
        .iter()
        .map(|row| {
            TableRow::new(row.cells.iter().map(realize_cell).collect())
                .row_height(ROW_HEIGHT)
                .height_rule(HeightRule::AtLeast)
        })
        .collect();
    Table::new(rows)
        .set_grid(vec![MIN_COLUMN_WIDTH; spec.columns])
        .align(TableAlignmentType::Center)
}

fn realize_cell(cell: &CellSpec) -> TableCell {
    let mut out = TableCell::new().vertical_align(VAlignType::Center);
    if cell.span > 1 {
        out = out.grid_span(cell.span);
    }
    match cell.merge {
        Some(MergePosition::Continue) => return out.vertical_merge(VMergeType::Continue),
        Some(MergePosition::Start) => out = out.vertical_merge(VMergeType::Restart),
        None => {}
    }
    out.add_paragraph(
        Paragraph::new().align(AlignmentType::Center).add_run(
            Run::new()
                .add_text(cell.text.as_str())
                .size(CELL_FONT_SIZE)
                .fonts(RunFonts::new().ascii(LATIN_FONT).east_asia(EAST_ASIAN_FONT)),
        ),
    )
}

fn fmt(value: f64) -> String {
    format_fixed(value, 2)
}

/// Two-level header shared by the harmonic tables: phase groups spanning
/// two columns, statistic sub-headers beneath, label and limit columns
/// merged across both rows.
fn phase_group_header(first_label: &str, phase_labels: &[String]) -> Vec<RowSpec> {
    let mut top = vec![CellSpec::merge_start(first_label, 2)];
    let mut sub = vec![CellSpec::merge_continue(2)];
    for label in phase_labels {
        top.push(CellSpec::spanning(label.clone(), 2));
        sub.push(CellSpec::text("平均值"));
        sub.push(CellSpec::text("95%概率值"));
    }
    top.push(CellSpec::merge_start("限值", 1));
    sub.push(CellSpec::merge_continue(1));
    vec![RowSpec::new(top), RowSpec::new(sub)]
}

/// Build the logical content of one harmonic statistics table.
/// `quantity_label` names the fundamental row (`基波电压(kV)` /
/// `基波电流(A)`); `fundamental_divisor` converts its unit.
pub fn harmonic_table_spec(
    summary: &HarmonicSummary,
    quantity_label: &str,
    fundamental_divisor: f64,
) -> TableSpec {
    let phase_labels: Vec<String> = summary
        .phases
        .iter()
        .map(|p| format!("{}相", p.label))
        .collect();
    let mut rows = phase_group_header("项目", &phase_labels);

    let mut fundamental = vec![CellSpec::spanning(quantity_label, 2)];
    for phase in &summary.phases {
        fundamental.push(CellSpec::text(fmt(
            phase.average.fundamental / fundamental_divisor,
        )));
        fundamental.push(CellSpec::text(fmt(phase.p95.fundamental / fundamental_divisor)));
    }
    fundamental.push(CellSpec::text(NOT_APPLICABLE));
    rows.push(RowSpec::new(fundamental));

    let order_count = summary.ratio_limits.len();
    for n in 0..order_count {
        let mut cells = vec![if n == 0 {
            CellSpec::merge_start("谐波含有率(%)", 1)
        } else {
            CellSpec::merge_continue(1)
        }];
        cells.push(CellSpec::text((FIRST_HARMONIC_ORDER + n).to_string()));
        for phase in &summary.phases {
            cells.push(CellSpec::text(fmt(
                phase.average.ratios.get(n).copied().unwrap_or(0.0),
            )));
            cells.push(CellSpec::text(fmt(
                phase.p95.ratios.get(n).copied().unwrap_or(0.0),
            )));
        }
        cells.push(CellSpec::text(fmt(summary.ratio_limits[n])));
        rows.push(RowSpec::new(cells));
    }

    let mut thd = vec![CellSpec::spanning("总谐波畸变率(%)", 2)];
    for phase in &summary.phases {
        thd.push(CellSpec::text(fmt(phase.average.thd)));
        thd.push(CellSpec::text(fmt(phase.p95.thd)));
    }
    thd.push(CellSpec::text(fmt(summary.thd_limit)));
    rows.push(RowSpec::new(thd));

    TableSpec { columns: 9, rows }
}

/// Build the frequency / unbalance / long-term flicker table.
pub fn steady_table_spec(summary: &SteadySummary) -> TableSpec {
    let mut rows = vec![RowSpec::new(vec![
        CellSpec::spanning("项目", 2),
        CellSpec::text("最大值"),
        CellSpec::text("平均值"),
        CellSpec::text("最小值"),
        CellSpec::text("95%概率值"),
        CellSpec::text("限值"),
    ])];

    rows.push(RowSpec::new(vec![
        CellSpec::spanning("频率偏差(Hz)", 2),
        CellSpec::text(fmt(summary.frequency.max - NOMINAL_FREQUENCY_HZ)),
        CellSpec::text(fmt(summary.frequency.average - NOMINAL_FREQUENCY_HZ)),
        CellSpec::text(fmt(summary.frequency.min - NOMINAL_FREQUENCY_HZ)),
        CellSpec::text(fmt(summary.frequency.p95 - NOMINAL_FREQUENCY_HZ)),
        CellSpec::text(summary.frequency_limit.clone()),
    ]));

    rows.push(RowSpec::new(vec![
        CellSpec::spanning("三相电压不平衡度(%)", 2),
        CellSpec::text(fmt(summary.unbalance.max)),
        CellSpec::text(fmt(summary.unbalance.average)),
        CellSpec::text(fmt(summary.unbalance.min)),
        CellSpec::text(fmt(summary.unbalance.p95)),
        CellSpec::text(fmt(summary.unbalance_limit)),
    ]));

    for (i, block) in summary.flicker.iter().enumerate() {
        rows.push(RowSpec::new(vec![
            if i == 0 {
                CellSpec::merge_start("长时间闪变", 1)
            } else {
                CellSpec::merge_continue(1)
            },
            CellSpec::text(format!("{}相", block.label)),
            CellSpec::text(fmt(block.stats.max)),
            CellSpec::text(fmt(block.stats.average)),
            CellSpec::text(fmt(block.stats.min)),
            CellSpec::text(fmt(block.stats.p95)),
            CellSpec::text(fmt(summary.flicker_limit)),
        ]));
    }

    TableSpec { columns: 7, rows }
}

/// Build the voltage-deviation table.
pub fn deviation_table_spec(summary: &DeviationSummary) -> TableSpec {
    let mut top = vec![CellSpec::merge_start("项目", 1)];
    let mut sub = vec![CellSpec::merge_continue(1)];
    for band in &summary.up {
        top.push(CellSpec::spanning(format!("{}相", band.label), 2));
        sub.push(CellSpec::text("最大值"));
        sub.push(CellSpec::text("最小值"));
    }
    top.push(CellSpec::merge_start("限值", 1));
    sub.push(CellSpec::merge_continue(1));

    let band_row = |label: &str, bands: &[pqreport_core::extract::DeviationBand], limit: f64| {
        let mut cells = vec![CellSpec::text(label)];
        for band in bands {
            cells.push(CellSpec::text(fmt(band.max)));
            cells.push(CellSpec::text(fmt(band.min)));
        }
        cells.push(CellSpec::text(fmt(limit)));
        RowSpec::new(cells)
    };

    TableSpec {
        columns: 8,
        rows: vec![
            RowSpec::new(top),
            RowSpec::new(sub),
            band_row("上偏差", &summary.up, summary.up_limit),
            band_row("下偏差", &summary.down, summary.down_limit),
        ],
    }
}
