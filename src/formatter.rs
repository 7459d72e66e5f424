use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Write};

/// What an analyzer renders when the run ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    /// Rows of cells under a header; rendered as CSV or JSON objects.
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// Pre-rendered text, written verbatim.
    Text(String),
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        match self {
            Summary::Table { rows, .. } => rows.is_empty(),
            Summary::Text(text) => text.is_empty(),
        }
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    analyzer: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<Map<String, Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

/// Write every summary to `writer`, as CSV/text or as one JSON array.
pub fn write_summaries<W: Write>(
    writer: &mut W,
    summaries: &[(&str, Summary)],
    json: bool,
) -> io::Result<()> {
    if json {
        let output: Vec<JsonSummary> = summaries
            .iter()
            .map(|(name, summary)| match summary {
                Summary::Table { headers, rows } => JsonSummary {
                    analyzer: name,
                    rows: Some(rows.iter().map(|row| row_object(headers, row)).collect()),
                    text: None,
                },
                Summary::Text(text) => JsonSummary {
                    analyzer: name,
                    rows: None,
                    text: Some(text.as_str()),
                },
            })
            .collect();

        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)?;
        return Ok(());
    }

    for (index, (_, summary)) in summaries.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }
        match summary {
            Summary::Table { headers, rows } => write_csv(writer, headers, rows)?,
            Summary::Text(text) => write!(writer, "{}", text)?,
        }
    }
    Ok(())
}

/// RFC 4180 CSV: header line then one line per row.
pub fn write_csv<W: Write>(writer: &mut W, headers: &[String], rows: &[Vec<Value>]) -> io::Result<()> {
    let header: Vec<String> = headers.iter().map(|h| csv_field(h)).collect();
    writeln!(writer, "{}", header.join(","))?;
    for row in rows {
        let line: Vec<String> = row.iter().map(|cell| csv_field(&cell_text(cell))).collect();
        writeln!(writer, "{}", line.join(","))?;
    }
    Ok(())
}

fn row_object(headers: &[String], row: &[Value]) -> Map<String, Value> {
    headers
        .iter()
        .cloned()
        .zip(row.iter().cloned())
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
