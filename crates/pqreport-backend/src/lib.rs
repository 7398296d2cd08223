//! Format backends for pqreport: calamine-based workbook loading, docx-rs
//! based document rendering, and the conversion orchestrator tying them
//! together.
//!
//! The extraction engine itself lives in `pqreport-core`; this crate only
//! moves data between the engine and the two file formats.

pub mod convert;
pub mod docx;
pub mod tables;
pub mod xlsx;

pub use convert::{
    download_reference, ConvertOptions, ConvertRequest, ReportConverter, ReportImage,
};
pub use xlsx::{load_sheet_data, load_sheet_data_from_bytes};
