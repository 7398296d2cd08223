//! The fixed cell-coordinate conventions of the monitoring workbook.
//!
//! This is the one genuinely fragile piece of domain knowledge in the
//! engine: every statistic the report shows lives at a hard-coded sheet
//! coordinate. All of those coordinates are declared here as data —
//! per-section constant tables of [`FieldSpec`]s — and consumed by the
//! generic routines in [`crate::extract`]. A report-format revision should
//! only ever touch this file.
//!
//! All coordinates are 0-based. Column ranges are inclusive on both ends.

use crate::sheet::SheetKind;

/// Address of a named field inside a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAddr {
    /// A single cell.
    Cell { row: usize, col: usize },
    /// A contiguous run of rows in one column, inclusive.
    Column { col: usize, rows: (usize, usize) },
}

/// A field location: which sheet, and where in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub sheet: SheetKind,
    pub addr: FieldAddr,
}

impl FieldSpec {
    /// Single-cell field.
    #[must_use]
    pub const fn cell(sheet: SheetKind, row: usize, col: usize) -> Self {
        Self {
            sheet,
            addr: FieldAddr::Cell { row, col },
        }
    }

    /// Column-range field.
    #[must_use]
    pub const fn column(sheet: SheetKind, col: usize, rows: (usize, usize)) -> Self {
        Self {
            sheet,
            addr: FieldAddr::Column { col, rows },
        }
    }
}

// ---------------------------------------------------------------------------
// Harmonic tables (voltage and current sheets share one layout)
// ---------------------------------------------------------------------------

/// Row holding the fundamental (order-1) values.
pub const FUNDAMENTAL_ROW: usize = 9;

/// Rows holding the order 2–25 content ratios, inclusive.
pub const HARMONIC_ROWS: (usize, usize) = (10, 33);

/// Row holding the total harmonic distortion.
pub const THD_ROW: usize = 59;

/// Column holding regulatory limits, shared by every section.
pub const LIMIT_COL: usize = 17;

/// Lowest harmonic order reported (rows in [`HARMONIC_ROWS`] count up from
/// this order).
pub const FIRST_HARMONIC_ORDER: usize = 2;

/// Column pair of one phase group: the average statistic and the
/// 95th-percentile statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseColumns {
    pub label: &'static str,
    pub average_col: usize,
    pub p95_col: usize,
}

/// Phase-pair columns of the voltage harmonic sheet (line-to-line).
pub const VOLTAGE_PHASE_COLUMNS: [PhaseColumns; 3] = [
    PhaseColumns {
        label: "AB",
        average_col: 3,
        p95_col: 5,
    },
    PhaseColumns {
        label: "BC",
        average_col: 8,
        p95_col: 10,
    },
    PhaseColumns {
        label: "CA",
        average_col: 13,
        p95_col: 15,
    },
];

/// Phase columns of the current harmonic sheet (per conductor).
pub const CURRENT_PHASE_COLUMNS: [PhaseColumns; 3] = [
    PhaseColumns {
        label: "A",
        average_col: 3,
        p95_col: 5,
    },
    PhaseColumns {
        label: "B",
        average_col: 8,
        p95_col: 10,
    },
    PhaseColumns {
        label: "C",
        average_col: 13,
        p95_col: 15,
    },
];

// ---------------------------------------------------------------------------
// Frequency, unbalance, flicker
// ---------------------------------------------------------------------------

/// First of the four consecutive statistic columns
/// (max, average, min, 95th-percentile).
pub const STAT_FIRST_COL: usize = 2;

/// Frequency statistics row of the power sheet.
pub const FREQUENCY_ROW: usize = 15;

/// Voltage-unbalance statistics row of the power sheet.
pub const UNBALANCE_ROW: usize = 16;

/// The frequency limit cell is kept as raw text (it reads like "±0.2"),
/// never parsed numerically.
pub const FREQUENCY_LIMIT: FieldSpec = FieldSpec::cell(SheetKind::Power, FREQUENCY_ROW, LIMIT_COL);

/// Long-term flicker row of the voltage sheet.
pub const FLICKER_ROW: usize = 61;

/// Flicker phase-pair blocks: label and the first of four statistic columns.
pub const FLICKER_BLOCKS: [(&str, usize); 3] = [("AB", 2), ("BC", 7), ("AC", 12)];

// ---------------------------------------------------------------------------
// Voltage deviation
// ---------------------------------------------------------------------------

/// Upward-deviation row of the voltage sheet.
pub const DEVIATION_UP_ROW: usize = 63;

/// Downward-deviation row of the voltage sheet. The limit in this row is
/// stored as a positive magnitude and is negated at extraction.
pub const DEVIATION_DOWN_ROW: usize = 64;

/// Deviation phase-pair blocks: label, max column, min column.
pub const DEVIATION_BLOCKS: [(&str, usize, usize); 3] = [("AB", 2, 4), ("BC", 7, 9), ("AC", 12, 14)];

// ---------------------------------------------------------------------------
// Monitor location
// ---------------------------------------------------------------------------

/// Cell holding the monitoring-point label, e.g. `监测点：变电站A`.
/// Everything up to and including the last colon is stripped off.
pub const MONITOR_LOCATION: FieldSpec = FieldSpec::cell(SheetKind::VoltageHarmonic, 1, 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmonic_row_count_matches_orders() {
        // orders 2..=25 inclusive
        assert_eq!(HARMONIC_ROWS.1 - HARMONIC_ROWS.0 + 1, 24);
    }

    #[test]
    fn test_phase_tables_share_columns() {
        for (v, c) in VOLTAGE_PHASE_COLUMNS.iter().zip(CURRENT_PHASE_COLUMNS.iter()) {
            assert_eq!(v.average_col, c.average_col);
            assert_eq!(v.p95_col, c.p95_col);
        }
    }

    #[test]
    fn test_field_spec_constructors() {
        let spec = FieldSpec::cell(SheetKind::Power, 15, 2);
        assert_eq!(spec.addr, FieldAddr::Cell { row: 15, col: 2 });
        let spec = FieldSpec::column(SheetKind::VoltageHarmonic, 17, HARMONIC_ROWS);
        assert_eq!(
            spec.addr,
            FieldAddr::Column {
                col: 17,
                rows: (10, 33)
            }
        );
    }
}
