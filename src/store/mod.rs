use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Catalog, RealValues, Submission};

const RESULTS_FILE: &str = "resultados.csv";
const REAL_FILE: &str = "reales.json";
const PARTICIPANT_LABEL: &str = "Participante";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid submission: {0}")]
    Validation(&'static str),
    #[error("storage error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("table error on {path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("real values encoding on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed store for the two pool documents: the submissions table
/// (CSV, header row first) and the real-values map (JSON, known entries
/// only). Every read reconstructs the full document and every write rewrites
/// it wholesale. Two concurrent registrations can race on the rewrite (last
/// writer wins); with a handful of human participants that is an accepted
/// non-goal, not something the store guards against.
pub struct Store {
    results_path: PathBuf,
    real_path: PathBuf,
    catalog: Catalog,
}

impl Store {
    pub fn new(data_dir: impl AsRef<Path>, catalog: Catalog) -> Result<Self, StoreError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StoreError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let store = Store {
            results_path: dir.join(RESULTS_FILE),
            real_path: dir.join(REAL_FILE),
            catalog,
        };
        store.ensure_results_file()?;
        Ok(store)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // The fixed outcome catalog, in order.
    pub fn outcomes(&self) -> &[String] {
        self.catalog.names()
    }

    // Append one registration row and rewrite the table. Fails with
    // Validation when the participant name is blank; values missing from the
    // map are persisted as empty cells.
    pub fn append_submission(
        &self,
        name: &str,
        values: &HashMap<String, f64>,
    ) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("empty participant name"));
        }

        let mut rows = self.data_rows();
        let mut row = Vec::with_capacity(self.catalog.len() + 1);
        row.push(name.to_string());
        for outcome in self.catalog.names() {
            match values.get(outcome) {
                Some(v) if v.is_finite() => row.push(format!("{}", v)),
                _ => row.push(String::new()),
            }
        }
        rows.push(row);
        self.write_rows(&rows)
    }

    // All submissions in insertion order. Cells that do not parse as finite
    // numbers are absent from the value map, never zero.
    pub fn list_submissions(&self) -> Vec<Submission> {
        let rows = self.data_rows();
        let mut submissions = Vec::with_capacity(rows.len());
        for row in rows {
            let name = row.first().cloned().unwrap_or_default();
            let mut values = HashMap::new();
            for (idx, outcome) in self.catalog.names().iter().enumerate() {
                if let Some(cell) = row.get(idx + 1) {
                    if let Ok(v) = cell.trim().parse::<f64>() {
                        if v.is_finite() {
                            values.insert(outcome.clone(), v);
                        }
                    }
                }
            }
            submissions.push(Submission { name, values });
        }
        submissions
    }

    // The raw persisted table, header first, for the results endpoint.
    // Numeric cells come back as JSON numbers, everything else as strings.
    pub fn results_table(&self) -> (Vec<String>, Vec<Vec<Value>>) {
        let table = self.read_table();
        match table.split_first() {
            Some((header, rows)) => {
                let rows = rows
                    .iter()
                    .map(|row| row.iter().map(|cell| cell_value(cell)).collect())
                    .collect();
                (header.clone(), rows)
            }
            None => (self.header(), Vec::new()),
        }
    }

    // Known real values. A missing or corrupt document degrades to "all
    // unknown" rather than failing the request.
    pub fn real_values(&self) -> RealValues {
        if !self.real_path.exists() {
            return RealValues::new();
        }
        let raw = match fs::read_to_string(&self.real_path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("real values unreadable, treating all as unknown: {}", e);
                return RealValues::new();
            }
        };
        let parsed: HashMap<String, Value> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("real values corrupt, treating all as unknown: {}", e);
                return RealValues::new();
            }
        };

        let mut real = RealValues::new();
        for outcome in self.catalog.names() {
            if let Some(v) = parsed.get(outcome).and_then(Value::as_f64) {
                if v.is_finite() {
                    real.insert(outcome.clone(), v);
                }
            }
        }
        real
    }

    // Replace the real-values document with the incoming map. Outcomes
    // absent from it (or carrying non-finite values, or unknown to the
    // catalog) become unknown; nothing is merged from the previous state.
    pub fn set_real_values(&self, incoming: &RealValues) -> Result<(), StoreError> {
        let mut filtered = serde_json::Map::new();
        for outcome in self.catalog.names() {
            if let Some(v) = incoming.get(outcome) {
                if let Some(n) = serde_json::Number::from_f64(*v) {
                    filtered.insert(outcome.clone(), Value::Number(n));
                }
            }
        }
        let body =
            serde_json::to_string_pretty(&Value::Object(filtered)).map_err(|e| StoreError::Json {
                path: self.real_path.clone(),
                source: e,
            })?;
        fs::write(&self.real_path, body).map_err(|e| StoreError::Io {
            path: self.real_path.clone(),
            source: e,
        })
    }

    // Delete both documents and re-initialize the empty table. Irreversible.
    pub fn reset_all(&self) -> Result<(), StoreError> {
        remove_if_exists(&self.results_path)?;
        remove_if_exists(&self.real_path)?;
        self.ensure_results_file()
    }

    // Raw bytes of the tabular document, for download.
    pub fn export_table(&self) -> Result<Vec<u8>, StoreError> {
        self.ensure_results_file()?;
        fs::read(&self.results_path).map_err(|e| StoreError::Io {
            path: self.results_path.clone(),
            source: e,
        })
    }

    fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.catalog.len() + 1);
        header.push(PARTICIPANT_LABEL.to_string());
        header.extend(self.catalog.names().iter().cloned());
        header
    }

    fn ensure_results_file(&self) -> Result<(), StoreError> {
        if self.results_path.exists() {
            return Ok(());
        }
        self.write_rows(&[])
    }

    // Rewrites the whole table: header record first, then one record per row.
    fn write_rows(&self, rows: &[Vec<String>]) -> Result<(), StoreError> {
        let mut writer =
            csv::Writer::from_path(&self.results_path).map_err(|e| self.table_err(e))?;
        writer
            .write_record(self.header())
            .map_err(|e| self.table_err(e))?;
        for row in rows {
            writer.write_record(row).map_err(|e| self.table_err(e))?;
        }
        writer.flush().map_err(|e| StoreError::Io {
            path: self.results_path.clone(),
            source: e,
        })
    }

    // Every record on disk, header included. A missing or unreadable
    // document degrades to an empty table.
    fn read_table(&self) -> Vec<Vec<String>> {
        match self.try_read_table() {
            Ok(table) => table,
            Err(e) => {
                warn!("results table unreadable, starting from empty: {}", e);
                Vec::new()
            }
        }
    }

    fn try_read_table(&self) -> Result<Vec<Vec<String>>, StoreError> {
        if !self.results_path.exists() {
            return Ok(Vec::new());
        }
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.results_path)
            .map_err(|e| self.table_err(e))?;
        let mut table = Vec::new();
        for record in reader.into_records() {
            let record = record.map_err(|e| self.table_err(e))?;
            table.push(record.iter().map(|cell| cell.to_string()).collect());
        }
        Ok(table)
    }

    fn data_rows(&self) -> Vec<Vec<String>> {
        let mut table = self.read_table();
        if table.is_empty() {
            return table;
        }
        table.remove(0);
        table
    }

    fn table_err(&self, source: csv::Error) -> StoreError {
        StoreError::Table {
            path: self.results_path.clone(),
            source,
        }
    }
}

fn cell_value(cell: &str) -> Value {
    if !cell.trim().is_empty() {
        if let Ok(v) = cell.trim().parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(v) {
                return Value::Number(n);
            }
        }
    }
    Value::String(cell.to_string())
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
