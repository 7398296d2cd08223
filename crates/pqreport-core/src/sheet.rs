//! The three fixed worksheets of a monitoring workbook.

use crate::grid::Grid;

/// Identity of a required worksheet.
///
/// The report format supports exactly three sheets, located by their exact
/// localized names. Anything else in the workbook is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    /// 电压谐波 — voltage harmonics, flicker, and voltage deviation rows.
    VoltageHarmonic,
    /// 电流谐波 — current harmonics.
    CurrentHarmonic,
    /// 功率 — frequency and unbalance rows.
    Power,
}

impl SheetKind {
    /// All required sheets, in loading order.
    pub const ALL: [Self; 3] = [Self::VoltageHarmonic, Self::CurrentHarmonic, Self::Power];

    /// The exact worksheet name in the source workbook.
    #[must_use]
    pub const fn sheet_name(self) -> &'static str {
        match self {
            Self::VoltageHarmonic => "电压谐波",
            Self::CurrentHarmonic => "电流谐波",
            Self::Power => "功率",
        }
    }
}

/// Densified grids of the three sheets, built once per conversion and
/// read-only during rendering.
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub voltage_harmonic: Grid,
    pub current_harmonic: Grid,
    pub power: Grid,
}

impl SheetData {
    /// Borrow the grid for a sheet.
    #[must_use]
    pub fn grid(&self, kind: SheetKind) -> &Grid {
        match kind {
            SheetKind::VoltageHarmonic => &self.voltage_harmonic,
            SheetKind::CurrentHarmonic => &self.current_harmonic,
            SheetKind::Power => &self.power,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellValue;

    #[test]
    fn test_sheet_names() {
        assert_eq!(SheetKind::VoltageHarmonic.sheet_name(), "电压谐波");
        assert_eq!(SheetKind::CurrentHarmonic.sheet_name(), "电流谐波");
        assert_eq!(SheetKind::Power.sheet_name(), "功率");
    }

    #[test]
    fn test_grid_lookup_by_kind() {
        let mut data = SheetData::default();
        data.power = Grid::from_rows(vec![vec![CellValue::Number(50.0)]]);
        assert_eq!(data.grid(SheetKind::Power).numeric_at(0, 0), 50.0);
        assert_eq!(data.grid(SheetKind::VoltageHarmonic).row_count(), 0);
    }
}
