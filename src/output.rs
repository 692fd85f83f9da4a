use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ExportError> {
    let csv_err = |source| ExportError::Csv { path: path.to_path_buf(), source };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    for r in rows {
        wtr.serialize(r).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| ExportError::Io { path: path.to_path_buf(), source })?;
    debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let s = serde_json::to_string_pretty(value).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, s).map_err(|source| ExportError::Io { path: path.to_path_buf(), source })?;
    debug!(path = %path.display(), "wrote json");
    Ok(())
}

/// Markdown table of the first `max_rows` rows, for console previews.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EquityMetrics, InfrastructureImpact};

    fn equity(category: &str) -> EquityMetrics {
        EquityMetrics {
            category: category.to_string(),
            boys: 1,
            girls: 3,
            total_children: 4,
            gender_ratio: 75.0,
        }
    }

    #[test]
    fn render_limits_rows() {
        let table = render_table(&[equity("Rural"), equity("Urban")], 1);
        assert!(table.contains("Rural"));
        assert!(!table.contains("Urban"));
        assert!(table.contains("Girls %"));
        assert_eq!(render_table::<EquityMetrics>(&[], 5), "(no rows)");
    }

    #[test]
    fn writes_json_and_csv() {
        let dir = std::env::temp_dir().join(format!("survey_insights_output_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let json_path = dir.join("equity.json");
        write_json(&json_path, &vec![equity("Rural")]).unwrap();
        let text = std::fs::read_to_string(&json_path).unwrap();
        assert!(text.contains("\"genderRatio\": 75.0"));

        let csv_path = dir.join("impact.csv");
        let rows = vec![InfrastructureImpact {
            attribute: "Toilet for children".into(),
            facilities_with: 2,
            facilities_without: 1,
            avg_enrollment_with: 2.0,
            avg_enrollment_without: 1.0,
            impact: 100.0,
        }];
        write_csv(&csv_path, &rows).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("attribute,facilitiesWith,facilitiesWithout"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unwritable_path_is_reported() {
        let err = write_json(Path::new("/nonexistent/dir/out.json"), &1).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
