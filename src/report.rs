// src/report.rs
//
// CSV report export for the retained event log, plus the matching
// parser. One record per event: quoted fields, comma-separated,
// confidence as a percentage with one decimal.

use crate::types::{ActionType, DetectionEvent};
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const CSV_HEADER: &str = "Timestamp,Type,Confidence,Message";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One parsed report row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub timestamp: NaiveDateTime,
    pub action: ActionType,
    /// Confidence in [0,1], recovered from the percentage field.
    pub confidence: f32,
    pub message: String,
}

pub fn format_report(events: &[DetectionEvent]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for event in events {
        let timestamp = event.timestamp().format(TIMESTAMP_FORMAT);
        out.push_str(&format!(
            "{},{},{},{}\n",
            quote(&timestamp.to_string()),
            quote(event.action.label()),
            quote(&format!("{:.1}%", event.confidence * 100.0)),
            quote(&event.message),
        ));
    }
    out
}

pub fn write_report(path: &Path, events: &[DetectionEvent]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    file.write_all(format_report(events).as_bytes())?;
    info!("Report with {} event(s) written to {}", events.len(), path.display());
    Ok(())
}

pub fn parse_report(contents: &str) -> Result<Vec<ReportRecord>> {
    let mut lines = contents.lines();
    match lines.next() {
        Some(header) if header.trim_end() == CSV_HEADER => {}
        other => bail!("Unexpected report header: {:?}", other),
    }

    let mut records = Vec::new();
    for (number, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_quoted(line)
            .with_context(|| format!("Malformed report row {}", number + 2))?;
        if fields.len() != 4 {
            bail!("Report row {} has {} fields, expected 4", number + 2, fields.len());
        }

        let timestamp = NaiveDateTime::parse_from_str(&fields[0], TIMESTAMP_FORMAT)
            .with_context(|| format!("Bad timestamp in report row {}", number + 2))?;
        let action = ActionType::from_label(&fields[1])
            .with_context(|| format!("Unknown action type {:?}", fields[1]))?;
        let confidence = fields[2]
            .strip_suffix('%')
            .with_context(|| format!("Confidence missing %: {:?}", fields[2]))?
            .parse::<f32>()
            .with_context(|| format!("Bad confidence in report row {}", number + 2))?
            / 100.0;

        records.push(ReportRecord {
            timestamp,
            action,
            confidence,
            message: fields[3].clone(),
        });
    }
    Ok(records)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Split one row of quoted, comma-separated fields, undoing the
/// doubled-quote escaping.
fn split_quoted(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        match chars.next() {
            Some('"') => {}
            other => bail!("Expected opening quote, found {:?}", other),
        }

        let mut field = String::new();
        loop {
            match chars.next() {
                Some('"') => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        break;
                    }
                }
                Some(c) => field.push(c),
                None => bail!("Unterminated quoted field"),
            }
        }
        fields.push(field);

        match chars.next() {
            Some(',') => {}
            None => break,
            Some(c) => bail!("Expected comma between fields, found {:?}", c),
        }
    }

    Ok(fields)
}
