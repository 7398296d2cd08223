//! pqreport — turn a power-quality monitoring workbook into a report
//! document.
//!
//! Thin local driver around the conversion engine: it reads the workbook,
//! the optional template, the optional chart images, and a JSON metadata
//! file from disk, runs one conversion, and prints the written path.

use anyhow::{Context, Result};
use clap::Parser;
use pqreport_backend::{
    download_reference, ConvertOptions, ConvertRequest, ReportConverter, ReportImage,
};
use pqreport_core::{MeasurementEntry, ReplaceMap};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pqreport",
    about = "Generate a power-quality report document from a monitoring workbook"
)]
struct Args {
    /// Monitoring workbook (.xlsx) holding the 电压谐波 / 电流谐波 / 功率 sheets
    excel: PathBuf,

    /// Report template (.docx); omit to generate the tables from scratch
    #[arg(long)]
    template: Option<PathBuf>,

    /// Chart image matched to {{imageN}} by position; repeatable
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// JSON file with flat placeholder fields plus a "measurements" array
    #[arg(long)]
    meta: Option<PathBuf>,

    /// Output directory (default: outputs)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

/// Metadata file shape: every flat string field becomes a placeholder
/// value; the `measurements` array feeds the derived `measurement` field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetaFile {
    measurements: Vec<MeasurementEntry>,
    #[serde(flatten)]
    fields: ReplaceMap,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workbook = fs::read(&args.excel)
        .with_context(|| format!("failed to read workbook {}", args.excel.display()))?;
    let template = args
        .template
        .as_ref()
        .map(|path| {
            fs::read(path).with_context(|| format!("failed to read template {}", path.display()))
        })
        .transpose()?;
    let images = args
        .images
        .iter()
        .map(|path| {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read image {}", path.display()))?;
            let filename = path
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            Ok(ReportImage { filename, bytes })
        })
        .collect::<Result<Vec<_>>>()?;
    let meta = args
        .meta
        .as_ref()
        .map(|path| {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read metadata {}", path.display()))?;
            serde_json::from_slice::<MetaFile>(&bytes)
                .with_context(|| format!("failed to parse metadata {}", path.display()))
        })
        .transpose()?
        .unwrap_or_default();

    let options = match args.output_dir {
        Some(dir) => ConvertOptions::default().with_output_dir(dir),
        None => ConvertOptions::default(),
    };
    let converter = ReportConverter::with_options(options);
    let path = converter
        .convert(&ConvertRequest {
            workbook,
            template,
            images,
            fields: meta.fields,
            measurements: meta.measurements,
        })
        .context("conversion failed")?;

    println!("{}", path.display());
    println!("{}", download_reference(&path));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_file_parses_flat_fields_and_measurements() {
        let json = r#"{
            "reportNo": "R-2024-07",
            "client": "国网",
            "measurements": [
                {"measurement": "PQ-Box", "certificateNo": "C42", "certificateDate": "2024-05-01"}
            ]
        }"#;
        let meta: MetaFile = serde_json::from_str(json).unwrap();
        assert_eq!(meta.fields.get("reportNo").unwrap(), "R-2024-07");
        assert_eq!(meta.fields.get("client").unwrap(), "国网");
        assert_eq!(meta.measurements.len(), 1);
        assert_eq!(meta.measurements[0].certificate_no, "C42");
    }

    #[test]
    fn test_meta_file_defaults_empty() {
        let meta: MetaFile = serde_json::from_str("{}").unwrap();
        assert!(meta.fields.is_empty());
        assert!(meta.measurements.is_empty());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "pqreport",
            "in.xlsx",
            "--template",
            "t.docx",
            "--image",
            "a.png",
            "--image",
            "b.png",
            "--output-dir",
            "out",
        ]);
        assert_eq!(args.excel, PathBuf::from("in.xlsx"));
        assert_eq!(args.images.len(), 2);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }
}
