use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::example::RawRecord;

/// How a raw file is laid out.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputFormat {
    /// One JSON object per line.
    Jsonl,
    /// One document; `records_path` walks nested arrays down to the records,
    /// e.g. `["data", "paragraphs"]`.
    Json {
        #[serde(default)]
        records_path: Vec<String>,
    },
    /// Header row names the columns.
    Csv {
        #[serde(default)]
        delimiter: Option<char>,
    },
}

/// Everything one source produced, plus how many raw units could not be read as records.
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub records: Vec<RawRecord>,
    pub malformed: usize,
}

pub trait RecordSource {
    fn tag(&self) -> &str;
    fn read(&mut self) -> Result<SourceBatch>;
}

/// Records kept in memory; used by tests and by callers that already hold rows.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    tag: String,
    records: Vec<RawRecord>,
    malformed: usize,
}

impl InMemorySource {
    pub fn new(tag: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            tag: tag.into(),
            records,
            malformed: 0,
        }
    }

    /// Non-object values are reported as malformed on read.
    pub fn from_values(tag: impl Into<String>, values: Vec<Value>) -> Self {
        let total = values.len();
        let records: Vec<RawRecord> = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(obj) => Some(obj),
                _ => None,
            })
            .collect();
        let malformed = total - records.len();
        Self {
            malformed,
            ..Self::new(tag, records)
        }
    }
}

impl RecordSource for InMemorySource {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn read(&mut self) -> Result<SourceBatch> {
        Ok(SourceBatch {
            records: self.records.clone(),
            malformed: self.malformed,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FileSource {
    tag: String,
    path: PathBuf,
    format: InputFormat,
}

impl FileSource {
    pub fn new(tag: impl Into<String>, path: impl Into<PathBuf>, format: InputFormat) -> Self {
        Self {
            tag: tag.into(),
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for FileSource {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn read(&mut self) -> Result<SourceBatch> {
        let batch = match &self.format {
            InputFormat::Jsonl => read_jsonl(&self.path)?,
            InputFormat::Json { records_path } => read_json_document(&self.path, records_path)?,
            InputFormat::Csv { delimiter } => read_csv(&self.path, *delimiter)?,
        };
        info!(
            "source {}: {} records ({} malformed) from {:?}",
            self.tag,
            batch.records.len(),
            batch.malformed,
            self.path
        );
        Ok(batch)
    }
}

fn read_jsonl(path: &Path) -> Result<SourceBatch> {
    let reader = BufReader::new(File::open(path)?);
    let mut batch = SourceBatch::default();
    for (lineno, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let raw = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                warn!("{:?}:{}: {e}, skipped", path, lineno + 1);
                batch.malformed += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(obj)) => batch.records.push(obj),
            Ok(_) => {
                warn!("{:?}:{}: not a JSON object, skipped", path, lineno + 1);
                batch.malformed += 1;
            }
            Err(e) => {
                warn!("{:?}:{}: {e}, skipped", path, lineno + 1);
                batch.malformed += 1;
            }
        }
    }
    Ok(batch)
}

fn read_json_document(path: &Path, records_path: &[String]) -> Result<SourceBatch> {
    let root: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(collect_nested(root, records_path))
}

/// Walk `records_path` from `root`, flattening one array level at every step.
pub fn collect_nested(root: Value, records_path: &[String]) -> SourceBatch {
    let mut current = flatten(vec![root]);
    for key in records_path {
        current = flatten(
            current
                .into_iter()
                .filter_map(|mut v| v.get_mut(key.as_str()).map(Value::take))
                .collect(),
        );
    }

    let mut batch = SourceBatch::default();
    for v in current {
        match v {
            Value::Object(obj) => batch.records.push(obj),
            _ => batch.malformed += 1,
        }
    }
    batch
}

fn flatten(values: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        match v {
            Value::Array(items) => out.extend(items),
            other => out.push(other),
        }
    }
    out
}

fn read_csv(path: &Path, delimiter: Option<char>) -> Result<SourceBatch> {
    let delimiter = match delimiter {
        None => b',',
        Some(c) if c.is_ascii() => c as u8,
        Some(c) => {
            return Err(PipelineError::Config(format!(
                "CSV delimiter {c:?} is not a single ASCII character"
            )))
        }
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut batch = SourceBatch::default();
    for (rowno, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("{:?}: row {}: {e}, skipped", path, rowno + 1);
                batch.malformed += 1;
                continue;
            }
        };
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(h, cell)| {
                // empty cells behave like missing values
                let value = if cell.trim().is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (h.to_string(), value)
            })
            .collect();
        batch.records.push(record);
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn jsonl_skips_blank_and_counts_malformed_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"text": "a"}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, "not json").unwrap();
        writeln!(f, "[1, 2]").unwrap();
        writeln!(f, r#"{{"text": "b", "label": 1}}"#).unwrap();

        let mut src = FileSource::new("t", f.path(), InputFormat::Jsonl);
        let batch = src.read().unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.malformed, 2);
        assert_eq!(batch.records[1]["label"], json!(1));
    }

    #[test]
    fn invalid_utf8_line_is_counted_not_fatal() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"{\"text\":\"good row\"}\r\n{\"text\":\"bad \xff\"}\n{\"text\":\"another\"}\n")
            .unwrap();

        let batch = FileSource::new("t", f.path(), InputFormat::Jsonl).read().unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.malformed, 1);
        assert_eq!(batch.records[0]["text"], json!("good row"));
        assert_eq!(batch.records[1]["text"], json!("another"));
    }

    #[test]
    fn nested_document_walks_records_path() {
        let doc = json!({
            "data": [
                {"title": "a", "paragraphs": [{"context": "one"}, {"context": "two"}]},
                {"title": "b", "paragraphs": [{"context": "three"}]},
                {"title": "c"}
            ]
        });
        let batch = collect_nested(doc, &["data".to_string(), "paragraphs".to_string()]);
        let contexts: Vec<_> = batch.records.iter().map(|r| r["context"].clone()).collect();
        assert_eq!(contexts, vec![json!("one"), json!("two"), json!("three")]);

        let snippets = json!({"snippets": [{"text": "s1"}, "stray", {"text": "s2"}]});
        let batch = collect_nested(snippets, &["snippets".to_string()]);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.malformed, 1);

        let top = json!([{"text": "x"}, {"text": "y"}]);
        assert_eq!(collect_nested(top, &[]).records.len(), 2);
    }

    #[test]
    fn csv_rows_become_string_maps_with_nulls_for_blanks() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "Reviews,Rating\n\"Good, really\",9\nmeh,\n").unwrap();

        let mut src = FileSource::new("drug", f.path(), InputFormat::Csv { delimiter: None });
        let batch = src.read().unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0]["Reviews"], json!("Good, really"));
        assert_eq!(batch.records[0]["Rating"], json!("9"));
        assert_eq!(batch.records[1]["Rating"], Value::Null);
    }

    #[test]
    fn format_parses_from_descriptor_json() {
        let f: InputFormat = serde_json::from_value(json!({"kind": "json", "records_path": ["snippets"]})).unwrap();
        assert_eq!(f, InputFormat::Json { records_path: vec!["snippets".into()] });
        let c: InputFormat = serde_json::from_value(json!({"kind": "csv", "delimiter": ";"})).unwrap();
        assert_eq!(c, InputFormat::Csv { delimiter: Some(';') });
    }
}
