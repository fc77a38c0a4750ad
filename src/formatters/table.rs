use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, settings::Style};

const MAX_CELL_WIDTH: usize = 60;

pub struct TableFormatter;

impl TableFormatter {
    /// Render report records as a rounded table, one column per field.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;

        match &value {
            Value::Array(arr) if arr.is_empty() => Ok("No data to display".to_string()),
            Value::Null => Ok("No data to display".to_string()),
            Value::Array(arr) => Self::format_records(arr),
            Value::Object(_) => Self::format_records(std::slice::from_ref(&value)),
            _ => Ok(value.to_string()),
        }
    }

    fn format_records(arr: &[Value]) -> Result<String> {
        // Columns in first-seen order so reports keep their declared layout
        let mut headers: Vec<&str> = Vec::new();
        for item in arr {
            if let Value::Object(obj) = item {
                for key in obj.keys() {
                    if !headers.contains(&key.as_str()) {
                        headers.push(key);
                    }
                }
            }
        }

        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());

        for item in arr {
            let row: Vec<String> = headers
                .iter()
                .map(|key| match item {
                    Value::Object(obj) => Self::format_value(obj.get(*key)),
                    _ => String::new(),
                })
                .collect();
            builder.push_record(row);
        }

        let mut table = builder.build();
        table.with(Style::rounded());

        Ok(table.to_string())
    }

    fn format_value(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => Self::truncate_string(&other.to_string(), MAX_CELL_WIDTH),
        }
    }

    fn truncate_string(s: &str, max_chars: usize) -> String {
        if s.chars().count() <= max_chars {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_chars).collect();
            format!("{head}...")
        }
    }

    /// Render GAQL rows as a plain text grid.
    ///
    /// Columns are the top-level keys of the first row. Each cell is the
    /// pretty-printed JSON of its value and may span several lines; a column
    /// is as wide as its header or the widest first line of its cells.
    pub fn format_results(rows: &[Map<String, Value>]) -> Result<String> {
        let Some(first) = rows.first() else {
            return Ok(String::new());
        };
        let headers: Vec<&str> = first.keys().map(String::as_str).collect();

        let cells: Vec<Vec<Vec<String>>> = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|h| Self::cell_lines(row.get(*h)))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<_>>()?;

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                cells
                    .iter()
                    .map(|row| row[col].first().map_or(0, |line| line.chars().count()))
                    .fold(header.chars().count(), usize::max)
            })
            .collect();

        let join = |parts: Vec<&str>| -> String {
            parts
                .iter()
                .zip(widths.iter().copied())
                .map(|(text, width)| format!("{text:<width$}"))
                .collect::<Vec<_>>()
                .join(" | ")
        };
        let separator = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");

        let mut lines = vec![join(headers.clone()), separator.clone()];
        for row in &cells {
            let height = row.iter().map(Vec::len).max().unwrap_or(0);
            for i in 0..height {
                lines.push(join(
                    row.iter()
                        .map(|cell| cell.get(i).map_or("", String::as_str))
                        .collect(),
                ));
            }
            lines.push(separator.clone());
        }

        Ok(lines.join("\n"))
    }

    /// A missing value renders as the JSON empty string
    fn cell_lines(value: Option<&Value>) -> Result<Vec<String>> {
        let empty = Value::String(String::new());
        let pretty = serde_json::to_string_pretty(value.unwrap_or(&empty))?;
        Ok(pretty.lines().map(str::to_string).collect())
    }
}
