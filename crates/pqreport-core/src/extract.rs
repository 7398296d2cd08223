//! Field extraction: turning densified grids into typed report values.
//!
//! One generic routine ([`scalar`] / [`vector`] / [`raw_text`]) reads a
//! [`FieldSpec`] from the declarative coordinate table in [`crate::layout`];
//! the per-section functions below assemble those specs and bundle the
//! results into the shapes the renderers consume. Non-numeric and absent
//! cells coerce to `0.0` throughout — the engine never aborts on a
//! malformed cell.

use crate::layout::{
    self, FieldAddr, FieldSpec, PhaseColumns, DEVIATION_BLOCKS, DEVIATION_DOWN_ROW,
    DEVIATION_UP_ROW, FLICKER_BLOCKS, FLICKER_ROW, FREQUENCY_ROW, FUNDAMENTAL_ROW, HARMONIC_ROWS,
    LIMIT_COL, STAT_FIRST_COL, THD_ROW, UNBALANCE_ROW,
};
use crate::sheet::{SheetData, SheetKind};

/// Numeric value of a single-cell field. A column-range spec yields its
/// first cell.
#[must_use]
pub fn scalar(data: &SheetData, spec: FieldSpec) -> f64 {
    let grid = data.grid(spec.sheet);
    match spec.addr {
        FieldAddr::Cell { row, col } => grid.numeric_at(row, col),
        FieldAddr::Column { col, rows } => grid.numeric_at(rows.0, col),
    }
}

/// Numeric values of a column-range field. A single-cell spec yields a
/// one-element vector.
#[must_use]
pub fn vector(data: &SheetData, spec: FieldSpec) -> Vec<f64> {
    let grid = data.grid(spec.sheet);
    match spec.addr {
        FieldAddr::Cell { row, col } => vec![grid.numeric_at(row, col)],
        FieldAddr::Column { col, rows } => grid.column_numeric(col, rows),
    }
}

/// Raw text of a single-cell field, uncoerced.
#[must_use]
pub fn raw_text(data: &SheetData, spec: FieldSpec) -> String {
    let grid = data.grid(spec.sheet);
    match spec.addr {
        FieldAddr::Cell { row, col } => grid.text_at(row, col),
        FieldAddr::Column { col, rows } => grid.text_at(rows.0, col),
    }
}

// ---------------------------------------------------------------------------
// Harmonic tables
// ---------------------------------------------------------------------------

/// One statistic column of a harmonic table: the fundamental value, the
/// order 2–25 content ratios, and the total distortion.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicColumn {
    pub fundamental: f64,
    pub ratios: Vec<f64>,
    pub thd: f64,
}

/// Average and 95th-percentile columns of one phase group.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseHarmonics {
    pub label: &'static str,
    pub average: HarmonicColumn,
    pub p95: HarmonicColumn,
}

/// Everything a harmonic table shows: three phase groups plus the shared
/// limit column.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicSummary {
    pub phases: Vec<PhaseHarmonics>,
    pub ratio_limits: Vec<f64>,
    pub thd_limit: f64,
}

fn harmonic_column(data: &SheetData, sheet: SheetKind, col: usize) -> HarmonicColumn {
    HarmonicColumn {
        fundamental: scalar(data, FieldSpec::cell(sheet, FUNDAMENTAL_ROW, col)),
        ratios: vector(data, FieldSpec::column(sheet, col, HARMONIC_ROWS)),
        thd: scalar(data, FieldSpec::cell(sheet, THD_ROW, col)),
    }
}

/// Extract one harmonic table. The voltage and current sheets share the
/// same layout and differ only in phase labels, so both go through here.
#[must_use]
pub fn harmonic_summary(data: &SheetData, sheet: SheetKind) -> HarmonicSummary {
    let columns: &[PhaseColumns; 3] = match sheet {
        SheetKind::CurrentHarmonic => &layout::CURRENT_PHASE_COLUMNS,
        _ => &layout::VOLTAGE_PHASE_COLUMNS,
    };
    let phases = columns
        .iter()
        .map(|p| PhaseHarmonics {
            label: p.label,
            average: harmonic_column(data, sheet, p.average_col),
            p95: harmonic_column(data, sheet, p.p95_col),
        })
        .collect();
    HarmonicSummary {
        phases,
        ratio_limits: vector(data, FieldSpec::column(sheet, LIMIT_COL, HARMONIC_ROWS)),
        thd_limit: scalar(data, FieldSpec::cell(sheet, THD_ROW, LIMIT_COL)),
    }
}

// ---------------------------------------------------------------------------
// Frequency, unbalance, flicker
// ---------------------------------------------------------------------------

/// The four statistics a steady-state row carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatQuad {
    pub max: f64,
    pub average: f64,
    pub min: f64,
    pub p95: f64,
}

fn stat_quad(data: &SheetData, sheet: SheetKind, row: usize, first_col: usize) -> StatQuad {
    let at = |offset| scalar(data, FieldSpec::cell(sheet, row, first_col + offset));
    StatQuad {
        max: at(0),
        average: at(1),
        min: at(2),
        p95: at(3),
    }
}

/// One long-term flicker phase block.
#[derive(Debug, Clone, PartialEq)]
pub struct FlickerBlock {
    pub label: &'static str,
    pub stats: StatQuad,
}

/// Frequency deviation, voltage unbalance, and long-term flicker.
#[derive(Debug, Clone, PartialEq)]
pub struct SteadySummary {
    pub frequency: StatQuad,
    /// Kept as the sheet's raw text (reads like "±0.2"), never parsed.
    pub frequency_limit: String,
    pub unbalance: StatQuad,
    pub unbalance_limit: f64,
    pub flicker: Vec<FlickerBlock>,
    pub flicker_limit: f64,
}

/// Extract the steady-state section (power sheet rows plus the flicker row
/// of the voltage sheet).
#[must_use]
pub fn steady_summary(data: &SheetData) -> SteadySummary {
    let flicker = FLICKER_BLOCKS
        .iter()
        .map(|&(label, first_col)| FlickerBlock {
            label,
            stats: stat_quad(data, SheetKind::VoltageHarmonic, FLICKER_ROW, first_col),
        })
        .collect();
    SteadySummary {
        frequency: stat_quad(data, SheetKind::Power, FREQUENCY_ROW, STAT_FIRST_COL),
        frequency_limit: raw_text(data, layout::FREQUENCY_LIMIT),
        unbalance: stat_quad(data, SheetKind::Power, UNBALANCE_ROW, STAT_FIRST_COL),
        unbalance_limit: scalar(data, FieldSpec::cell(SheetKind::Power, UNBALANCE_ROW, LIMIT_COL)),
        flicker,
        flicker_limit: scalar(
            data,
            FieldSpec::cell(SheetKind::VoltageHarmonic, FLICKER_ROW, LIMIT_COL),
        ),
    }
}

// ---------------------------------------------------------------------------
// Voltage deviation
// ---------------------------------------------------------------------------

/// Max/min deviation of one phase pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationBand {
    pub label: &'static str,
    pub max: f64,
    pub min: f64,
}

/// The up/down voltage-deviation section.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationSummary {
    pub up: Vec<DeviationBand>,
    pub up_limit: f64,
    pub down: Vec<DeviationBand>,
    /// Already negated: the sheet stores a magnitude, the report shows a
    /// signed band.
    pub down_limit: f64,
}

impl DeviationSummary {
    /// Largest upward-deviation maximum across the three phase pairs.
    /// Feeds the derived `maxVoltageDeviation` placeholder.
    #[must_use]
    pub fn max_up_deviation(&self) -> f64 {
        self.up.iter().map(|b| b.max).fold(f64::MIN, f64::max)
    }
}

fn deviation_row(data: &SheetData, row: usize) -> Vec<DeviationBand> {
    DEVIATION_BLOCKS
        .iter()
        .map(|&(label, max_col, min_col)| DeviationBand {
            label,
            max: scalar(data, FieldSpec::cell(SheetKind::VoltageHarmonic, row, max_col)),
            min: scalar(data, FieldSpec::cell(SheetKind::VoltageHarmonic, row, min_col)),
        })
        .collect()
}

/// Extract the voltage-deviation section of the voltage sheet.
#[must_use]
pub fn deviation_summary(data: &SheetData) -> DeviationSummary {
    let limit = |row| {
        scalar(
            data,
            FieldSpec::cell(SheetKind::VoltageHarmonic, row, LIMIT_COL),
        )
    };
    DeviationSummary {
        up: deviation_row(data, DEVIATION_UP_ROW),
        up_limit: limit(DEVIATION_UP_ROW),
        down: deviation_row(data, DEVIATION_DOWN_ROW),
        down_limit: -limit(DEVIATION_DOWN_ROW),
    }
}

// ---------------------------------------------------------------------------
// Monitor location
// ---------------------------------------------------------------------------

/// The bare monitoring-point name, with any descriptive prefix up to and
/// including the last colon (full- or half-width) stripped off.
#[must_use]
pub fn monitor_location(data: &SheetData) -> String {
    let raw = raw_text(data, layout::MONITOR_LOCATION);
    let cut = raw
        .rfind(['：', ':'])
        .map_or(0, |i| i + raw[i..].chars().next().map_or(0, char::len_utf8));
    raw[cut..].trim().to_string()
}
