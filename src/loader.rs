use crate::fields::YEAR_FIELD;
use crate::types::{DatasetSummary, NationalBenchmark, Record};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Years a dataset key may be tagged with, e.g. `Child_Annual_2023.xlsx_Sheet1`.
const KEY_YEARS: &[i32] = &[2023, 2024, 2025];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A loaded data file: raw rows, or a summary already aggregated upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Records(Vec<Record>),
    Summary(DatasetSummary),
}

fn read_json(path: &Path) -> Result<Value, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let dataset = dataset_from_value(read_json(path)?);
    match &dataset {
        Dataset::Records(records) => info!(path = %path.display(), records = records.len(), "loaded record dataset"),
        Dataset::Summary(summary) => {
            info!(path = %path.display(), total_records = summary.total_records, "loaded summary dataset")
        }
    }
    Ok(dataset)
}

/// National nutrition survey figures used as the state-level benchmark.
/// Unlike datasets, a benchmark file that does not match the expected shape
/// is an error.
pub fn load_benchmark(path: &Path) -> Result<NationalBenchmark, LoadError> {
    let benchmark: NationalBenchmark = serde_json::from_value(read_json(path)?).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), states = benchmark.state_data.len(), "loaded nutrition benchmark");
    Ok(benchmark)
}

/// Pick the dataset shape from the document's top-level keys.
pub fn dataset_from_value(value: Value) -> Dataset {
    if is_summary_document(&value) {
        match serde_json::from_value::<DatasetSummary>(value.clone()) {
            Ok(summary) => return Dataset::Summary(summary),
            Err(e) => warn!(error = %e, "summary-shaped document did not parse, reading it as records"),
        }
    }
    Dataset::Records(records_from_value(&value))
}

pub fn is_summary_document(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key("totalRecords") || map.contains_key("byYear"))
}

/// Rows from a loosely typed JSON document.
///
/// An array is read as rows directly. An object is read as dataset key →
/// array of rows and flattened; rows without a `Year` get one from the key
/// when it names a reporting year. Anything else yields no rows.
pub fn records_from_value(value: &Value) -> Vec<Record> {
    match value {
        Value::Array(items) => rows(items),
        Value::Object(map) => {
            let mut out = Vec::new();
            for (key, entry) in map {
                let Value::Array(items) = entry else {
                    debug!(key = %key, "skipping non-array dataset entry");
                    continue;
                };
                let year = year_from_key(key);
                out.extend(rows(items).into_iter().map(|mut record| {
                    if let Some(y) = year {
                        if !record.contains(YEAR_FIELD) {
                            record.insert(YEAR_FIELD, f64::from(y));
                        }
                    }
                    record
                }));
            }
            out
        }
        _ => Vec::new(),
    }
}

fn rows(items: &[Value]) -> Vec<Record> {
    items
        .iter()
        .filter(|v| v.is_object())
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

fn year_from_key(key: &str) -> Option<i32> {
    KEY_YEARS.iter().copied().find(|y| key.contains(&y.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scalar;
    use serde_json::json;

    #[test]
    fn arrays_are_read_as_rows() {
        let value = json!([{"Gender": "Male", "Age": 7, "Nested": {"a": 1}}, 3, "x"]);
        let records = records_from_value(&value);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("Gender"), Some("Male"));
        assert_eq!(records[0].number("Age"), Some(7.0));
        assert_eq!(records[0].get("Nested"), Some(&Scalar::Null));
    }

    #[test]
    fn keyed_datasets_are_flattened_with_years() {
        let value = json!({
            "Child_Annual_2023.xlsx_Sheet1": [{"Gender": "Male"}],
            "child-annual-information_Report_2024.xlsx": [{"Gender": "Female"}, {"Gender": "Girl", "Year": 2030}],
            "notes": "ignored",
        });
        let records = records_from_value(&value);
        assert_eq!(records.len(), 3);
        let years: Vec<Option<f64>> = records.iter().map(|r| r.number("Year")).collect();
        assert_eq!(years, vec![Some(2023.0), Some(2024.0), Some(2030.0)]);
    }

    #[test]
    fn columns_keep_document_order() {
        let records = records_from_value(&json!([{"Year": 2023, "Date of Survey": "05/01/2024", "Age": 9}]));
        let names: Vec<&str> = records[0].fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Year", "Date of Survey", "Age"]);
        assert_eq!(crate::fields::detect_year(&records[0]), Some(2023));
    }

    #[test]
    fn scalars_yield_nothing() {
        assert!(records_from_value(&json!(42)).is_empty());
        assert!(records_from_value(&json!(null)).is_empty());
        assert!(records_from_value(&json!("rows")).is_empty());
    }

    #[test]
    fn summary_documents_are_detected() {
        let value = json!({
            "totalRecords": 3,
            "byYear": {"2023": {"count": 3, "boys": 1, "girls": 2}},
            "regionDistrictMap": {"North": ["Gaya"]},
            "sampleRecords": []
        });
        match dataset_from_value(value) {
            Dataset::Summary(summary) => {
                assert_eq!(summary.total_records, 3);
                assert_eq!(summary.by_year["2023"].girls, 2);
                assert_eq!(summary.region_district_map["North"], vec!["Gaya"]);
            }
            other => panic!("expected summary, got {other:?}"),
        }
        assert!(matches!(dataset_from_value(json!([])), Dataset::Records(r) if r.is_empty()));
    }

    #[test]
    fn benchmark_files_are_parsed() {
        let path = std::env::temp_dir().join(format!("survey-benchmark-{}.json", std::process::id()));
        let body = json!({
            "india_average": {"underweight": 32.1, "stunting": 35.5, "wasting": 19.3},
            "state_data": {"Bihar": {"underweight": 41.0, "stunting": 42.9, "wasting": 22.9}}
        });
        std::fs::write(&path, body.to_string()).unwrap();
        let benchmark = load_benchmark(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(benchmark.india_average.stunting, 35.5);
        assert_eq!(benchmark.state_data["Bihar"].wasting, 22.9);
    }

    #[test]
    fn benchmark_with_wrong_shape_is_a_json_error() {
        let path = std::env::temp_dir().join(format!("survey-benchmark-bad-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"state_data": [1, 2]}"#).unwrap();
        let err = load_benchmark(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_dataset(Path::new("/nonexistent/survey.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
