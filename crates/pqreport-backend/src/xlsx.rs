//! Monitoring-workbook loader built on calamine.
//!
//! Reads the three required sheets by their exact names, densifies each
//! into an absolute-coordinate [`Grid`], and resolves merged regions so
//! that downstream extraction can index cells directly. Only the zip-based
//! workbook container is supported: merged-region metadata is load-bearing
//! for every coordinate in the report layout, and calamine exposes it for
//! that container only.

use calamine::{Data, DataType, Dimensions, Range, Reader, Xlsx};
use pqreport_core::{
    resolve_merged_regions, CellValue, Grid, MergedRegion, ReportError, Result, SheetData,
    SheetKind,
};
use std::io::{Read, Seek};

/// Load the three report sheets from a workbook byte stream.
///
/// A missing or misnamed sheet is fatal ([`ReportError::SheetNotFound`]):
/// every downstream lookup assumes fixed sheet identity and would otherwise
/// fail later with confusing index arithmetic.
pub fn load_sheet_data<RS: Read + Seek>(stream: RS) -> Result<SheetData> {
    let mut workbook: Xlsx<_> = Xlsx::new(stream)
        .map_err(|e| ReportError::Spreadsheet(format!("failed to open workbook: {e}")))?;
    workbook
        .load_merged_regions()
        .map_err(|e| ReportError::Spreadsheet(format!("failed to load merged regions: {e}")))?;

    let mut data = SheetData::default();
    for kind in SheetKind::ALL {
        let grid = read_sheet(&mut workbook, kind)?;
        match kind {
            SheetKind::VoltageHarmonic => data.voltage_harmonic = grid,
            SheetKind::CurrentHarmonic => data.current_harmonic = grid,
            SheetKind::Power => data.power = grid,
        }
    }
    Ok(data)
}

/// Load from an in-memory workbook buffer.
pub fn load_sheet_data_from_bytes(bytes: &[u8]) -> Result<SheetData> {
    load_sheet_data(std::io::Cursor::new(bytes))
}

fn read_sheet<RS: Read + Seek>(workbook: &mut Xlsx<RS>, kind: SheetKind) -> Result<Grid> {
    let name = kind.sheet_name();
    if !workbook.sheet_names().iter().any(|n| n == name) {
        return Err(ReportError::SheetNotFound(name.to_string()));
    }
    let range = workbook
        .worksheet_range(name)
        .map_err(|e| ReportError::Spreadsheet(format!("failed to read sheet {name}: {e}")))?;
    let merged = workbook
        .worksheet_merge_cells(name)
        .unwrap_or(Ok(Vec::new()))
        .unwrap_or_default();

    let mut grid = grid_from_range(&range);
    let regions: Vec<MergedRegion> = merged.iter().map(merged_region).collect();
    resolve_merged_regions(&mut grid, &regions);
    Ok(grid)
}

/// Densify a calamine range into an absolute-coordinate grid.
///
/// Worksheet ranges start at the first used cell, not at the sheet origin,
/// so rows and columns before the range start are padded with `Empty` —
/// the report layout addresses cells in absolute coordinates.
fn grid_from_range(range: &Range<Data>) -> Grid {
    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return Grid::default();
    };
    let mut rows = vec![vec![CellValue::Empty; end.1 as usize + 1]; end.0 as usize + 1];
    for (r, row) in range.rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            rows[start.0 as usize + r][start.1 as usize + c] = cell_value(cell);
        }
    }
    Grid::from_rows(rows)
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Error(e) => CellValue::Text(format!("{e}")),
    }
}

fn merged_region(dim: &Dimensions) -> MergedRegion {
    MergedRegion {
        first_row: dim.start.0 as usize,
        last_row: dim.end.0 as usize,
        first_col: dim.start.1 as usize,
        last_col: dim.end.1 as usize,
    }
}
