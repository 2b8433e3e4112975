//! Per-block sequence files.

use std::fs;
use std::path::Path;

use trialgen_core::errors::ErrorInfo;
use trialgen_core::{CueInstruction, DistractorProb, TrialLabel, TrialRecord, TrialgenError};

use crate::pool::{condition_fields, condition_headers, ConditionColumns};

const TRAILING_COLUMNS: [&str; 6] = [
    "Label",
    "Priming",
    "DistractorProb",
    "CueInstruction",
    "ITI-Jitter",
    "cue_stim_delay_jitter",
];

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes one row per record. Unused optional columns stay empty.
pub fn write_sequence_csv(
    records: &[TrialRecord],
    roles: usize,
    path: &Path,
) -> Result<(), TrialgenError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|err| TrialgenError::io("sequence-mkdir", err, parent))?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .map_err(|err| TrialgenError::io("sequence-open", err, path))?;
    let mut headers = condition_headers(roles);
    headers.extend(TRAILING_COLUMNS.iter().map(|name| name.to_string()));
    writer
        .write_record(&headers)
        .map_err(|err| TrialgenError::io("sequence-write", err, path))?;
    for record in records {
        let mut fields = condition_fields(&record.condition, roles);
        fields.push(record.label.to_string());
        fields.push(record.priming().to_string());
        fields.push(optional(record.distractor_prob));
        fields.push(optional(record.cue_instruction));
        fields.push(optional(record.iti_jitter.map(|v| format!("{v:.3}"))));
        fields.push(optional(record.cue_stim_delay_jitter.map(|v| format!("{v:.3}"))));
        writer
            .write_record(&fields)
            .map_err(|err| TrialgenError::io("sequence-write", err, path))?;
    }
    writer
        .flush()
        .map_err(|err| TrialgenError::io("sequence-flush", err, path))
}

/// Reads a file written by [`write_sequence_csv`].
pub fn read_sequence_csv(path: &Path) -> Result<Vec<TrialRecord>, TrialgenError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|err| TrialgenError::io("sequence-open", err, path))?;
    let headers = reader
        .headers()
        .map_err(|err| TrialgenError::io("sequence-headers", err, path))?
        .clone();
    let columns = ConditionColumns::from_headers(&headers)?;
    let position = |name: &str| headers.iter().position(|header| header.trim() == name);
    let label_col = position("Label").ok_or_else(|| {
        TrialgenError::Serde(
            ErrorInfo::new("sequence-column", "Label column is missing")
                .with_context("path", path.display().to_string()),
        )
    })?;
    let distractor_col = position("DistractorProb");
    let cue_col = position("CueInstruction");
    let iti_col = position("ITI-Jitter");
    let cue_delay_col = position("cue_stim_delay_jitter");

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|err| TrialgenError::io("sequence-read", err, path))?;
        let cell = |col: Option<usize>| {
            col.and_then(|c| row.get(c))
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };
        let condition = columns.parse(&row, index)?;
        let label: TrialLabel = cell(Some(label_col))
            .unwrap_or_default()
            .parse()
            .map_err(|err: TrialgenError| with_row(err, index, path))?;
        let distractor_prob = cell(distractor_col)
            .map(|raw| {
                DistractorProb::parse(raw).ok_or_else(|| bad_value("DistractorProb", raw, index, path))
            })
            .transpose()?;
        let cue_instruction = cell(cue_col)
            .map(|raw| {
                CueInstruction::parse(raw).ok_or_else(|| bad_value("CueInstruction", raw, index, path))
            })
            .transpose()?;
        let number = |col: Option<usize>, name: &str| {
            cell(col)
                .map(|raw| raw.parse::<f64>().map_err(|_| bad_value(name, raw, index, path)))
                .transpose()
        };
        records.push(TrialRecord {
            index,
            label,
            condition,
            distractor_prob,
            cue_instruction,
            iti_jitter: number(iti_col, "ITI-Jitter")?,
            cue_stim_delay_jitter: number(cue_delay_col, "cue_stim_delay_jitter")?,
        });
    }
    Ok(records)
}

fn with_row(err: TrialgenError, row: usize, path: &Path) -> TrialgenError {
    TrialgenError::Serde(
        err.info()
            .clone()
            .with_context("row", row.to_string())
            .with_context("path", path.display().to_string()),
    )
}

fn bad_value(column: &str, raw: &str, row: usize, path: &Path) -> TrialgenError {
    TrialgenError::Serde(
        ErrorInfo::new("sequence-value", "unrecognised value")
            .with_context("column", column)
            .with_context("value", raw)
            .with_context("row", row.to_string())
            .with_context("path", path.display().to_string()),
    )
}
