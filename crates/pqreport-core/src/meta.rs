//! Report metadata: placeholder replacement values and instrument entries.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Placeholder key → replacement text. Keys are unique; order is
/// irrelevant. Every `{{key}}` occurrence in the document is replaced by
/// the mapped value; keys absent from the map are left untouched.
pub type ReplaceMap = HashMap<String, String>;

/// Derived key holding the flattened instrument list.
pub const MEASUREMENT_KEY: &str = "measurement";

/// Derived key holding the largest upward voltage deviation.
pub const MAX_VOLTAGE_DEVIATION_KEY: &str = "maxVoltageDeviation";

/// One measuring instrument: name, certificate number, certificate date.
/// All fields may be absent or empty. Field names follow the request
/// format's camelCase keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeasurementEntry {
    pub measurement: String,
    pub certificate_no: String,
    pub certificate_date: String,
}

/// Flatten the instrument list into the single multi-line string stored
/// under [`MEASUREMENT_KEY`]: one entry per line, fields joined by two
/// spaces, surrounding whitespace trimmed. An empty list flattens to the
/// empty string so the placeholder is still consumed.
#[must_use]
pub fn flatten_measurements(entries: &[MeasurementEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{}  {}  {}",
            entry.measurement, entry.certificate_no, entry.certificate_date
        );
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(m: &str, no: &str, date: &str) -> MeasurementEntry {
        MeasurementEntry {
            measurement: m.to_string(),
            certificate_no: no.to_string(),
            certificate_date: date.to_string(),
        }
    }

    #[test]
    fn test_flatten_two_entries() {
        let entries = [
            entry("Meter1", "C001", "2024-01-01"),
            entry("Meter2", "C002", "2024-02-02"),
        ];
        assert_eq!(
            flatten_measurements(&entries),
            "Meter1  C001  2024-01-01\nMeter2  C002  2024-02-02"
        );
    }

    #[test]
    fn test_flatten_empty_list() {
        assert_eq!(flatten_measurements(&[]), "");
    }

    #[test]
    fn test_flatten_trims_outer_whitespace_only() {
        let entries = [entry("Meter1", "", ""), entry("Meter2", "C2", "")];
        // inner blank fields keep their separators; only the ends are trimmed
        assert_eq!(flatten_measurements(&entries), "Meter1    \nMeter2  C2");
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{"measurement":"PQ-Box","certificateNo":"C42","certificateDate":"2024-05-01"}"#;
        let parsed: MeasurementEntry = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, entry("PQ-Box", "C42", "2024-05-01"));
    }

    #[test]
    fn test_deserialize_missing_fields_default_empty() {
        let parsed: MeasurementEntry = serde_json::from_str(r#"{"measurement":"M"}"#).unwrap();
        assert_eq!(parsed.certificate_no, "");
        assert_eq!(parsed.certificate_date, "");
    }
}
