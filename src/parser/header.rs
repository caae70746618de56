use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::model::IfcHeader;
use crate::parser::step::{parse_parameters, Parameter};

/// Reads FILE_DESCRIPTION, FILE_NAME and FILE_SCHEMA from header lines.
///
/// Never fails: unreadable fields stay empty and an unreadable timestamp
/// falls back to the current time.
#[must_use]
pub fn read_header(lines: &[&str]) -> IfcHeader {
    let mut header = IfcHeader::default();
    let joined = lines.join(" ");

    for statement in split_statements(&joined) {
        let Some(open) = statement.find('(') else {
            continue;
        };
        let Some(close) = statement.rfind(')').filter(|&close| close > open) else {
            continue;
        };
        let keyword = statement[..open].trim();
        let params = parse_parameters(&statement[open + 1..close]);

        match keyword {
            "FILE_DESCRIPTION" => {
                header.description = strings(params.first());
                header.implementation_level = string(params.get(1));
            }
            "FILE_NAME" => {
                header.file_name = string(params.first());
                match parse_time_stamp(&string(params.get(1))) {
                    Some(time_stamp) => header.time_stamp = time_stamp,
                    None => tracing::debug!("unreadable header timestamp, using current time"),
                }
                header.author = strings(params.get(2));
                header.organization = strings(params.get(3));
                header.preprocessor_version = string(params.get(4));
                header.originating_system = string(params.get(5));
                header.authorization = string(params.get(6));
            }
            "FILE_SCHEMA" => header.schema_identifiers = strings(params.first()),
            _ => {}
        }
    }

    header
}

// Header statements can span lines, so split on `;` outside quotes.
fn split_statements(text: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut in_string = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            ';' if !in_string => {
                statements.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        statements.push(tail);
    }

    statements
}

fn string(param: Option<&Parameter>) -> String {
    param
        .and_then(Parameter::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn strings(param: Option<&Parameter>) -> Vec<String> {
    match param {
        Some(Parameter::List(items)) => items
            .iter()
            .filter_map(Parameter::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Parameter::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn parse_time_stamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time_stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(time_stamp.with_timezone(&Utc));
    }
    if let Ok(time_stamp) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(time_stamp.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time_stamp| time_stamp.and_utc())
}
