use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

pub struct CsvFormatter;

impl CsvFormatter {
    /// Render report records with plain cell values.
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

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&headers)?;

        for item in arr {
            let row: Vec<String> = headers
                .iter()
                .map(|key| match item {
                    Value::Object(obj) => Self::format_value(obj.get(*key)),
                    _ => String::new(),
                })
                .collect();
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }

    fn format_value(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Render GAQL rows. Headers are the first row's top-level keys and every
    /// cell is the compact JSON of its value, so nested resources survive
    /// intact.
    pub fn format_results(rows: &[Map<String, Value>]) -> Result<String> {
        let Some(first) = rows.first() else {
            return Ok(String::new());
        };
        let headers: Vec<&str> = first.keys().map(String::as_str).collect();
        let empty = Value::String(String::new());

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&headers)?;

        for row in rows {
            let record = headers
                .iter()
                .map(|h| serde_json::to_string(row.get(*h).unwrap_or(&empty)))
                .collect::<Result<Vec<_>, _>>()?;
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Map<String, Value>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn parse(out: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(out.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_results_cells_are_compact_json() {
        let data = rows(json!([
            {"campaign": {"id": "1", "name": "Spring, Sale"}, "metrics": {"clicks": "10"}}
        ]));

        let out = CsvFormatter::format_results(&data).unwrap();
        let records = parse(&out);

        assert_eq!(records[0], ["campaign", "metrics"]);
        assert_eq!(records[1][0], r#"{"id":"1","name":"Spring, Sale"}"#);
        assert_eq!(records[1][1], r#"{"clicks":"10"}"#);
    }

    #[test]
    fn test_results_cells_decode_to_original_values() {
        let data = rows(json!([
            {"campaign": {"id": "1", "name": "Spring, \"Sale\""}, "clicks": 10, "active": true},
            {"campaign": {"id": "2", "name": "Line\nbreak"}, "clicks": 0, "active": false}
        ]));

        let out = CsvFormatter::format_results(&data).unwrap();
        let mut rdr = csv::Reader::from_reader(out.as_bytes());
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, ["campaign", "clicks", "active"]);

        for (record, original) in rdr.records().zip(&data) {
            let record = record.unwrap();
            for (cell, header) in record.iter().zip(&headers) {
                let decoded: Value = serde_json::from_str(cell).unwrap();
                assert_eq!(&decoded, &original[header.as_str()]);
            }
        }
    }

    #[test]
    fn test_results_missing_value_is_json_empty_string() {
        let data = rows(json!([
            {"a": 1, "b": "x"},
            {"a": 2}
        ]));

        let records = parse(&CsvFormatter::format_results(&data).unwrap());
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], ["1", "\"x\""]);
        assert_eq!(records[2], ["2", "\"\""]);
    }

    #[test]
    fn test_results_ignore_keys_not_in_first_row() {
        let data = rows(json!([
            {"a": 1},
            {"a": 2, "extra": true}
        ]));

        let records = parse(&CsvFormatter::format_results(&data).unwrap());
        assert!(records.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_records_plain_values() {
        let data = vec![
            json!({"Keyword": "running shoes", "Match Type": "PHRASE", "Clicks": 12}),
            json!({"Keyword": "trail, shoes", "Match Type": "EXACT"}),
        ];

        let records = parse(&CsvFormatter::format(&data).unwrap());
        assert_eq!(records[0], ["Keyword", "Match Type", "Clicks"]);
        assert_eq!(records[1], ["running shoes", "PHRASE", "12"]);
        assert_eq!(records[2], ["trail, shoes", "EXACT", ""]);
    }

    #[test]
    fn test_records_empty() {
        let data: Vec<Value> = vec![];
        assert_eq!(CsvFormatter::format(&data).unwrap(), "No data to display");
    }
}
