//! Core engine for turning power-quality monitoring workbooks into report
//! content.
//!
//! This crate owns everything that does not touch a spreadsheet or document
//! library: the densified cell grid and merged-region resolution, the
//! declarative coordinate table of the report layout, field extraction into
//! typed summaries, fixed-point number formatting, and the placeholder
//! replacement map. The format backends in `pqreport-backend` feed grids in
//! and render the extracted values out.

pub mod error;
pub mod extract;
pub mod grid;
pub mod layout;
pub mod meta;
pub mod numfmt;
pub mod sheet;

pub use error::{ReportError, Result};
pub use grid::{resolve_merged_regions, CellValue, Grid, MergedRegion};
pub use meta::{flatten_measurements, MeasurementEntry, ReplaceMap};
pub use numfmt::{format_fixed, NOT_APPLICABLE};
pub use sheet::{SheetData, SheetKind};
