use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

/// Candidate list used when `POLLA_CANDIDATES` is not set. This mirrors the
/// ballot of the deployment the pool was originally run for.
const DEFAULT_CANDIDATES: [&str; 9] = [
    "Franco Parisi",
    "Jeannette Jara",
    "Marco Enriquez-Ominami",
    "Johannes Kaiser",
    "José Antonio Kast",
    "Eduardo Artés",
    "Evelyn Matthei",
    "Harold Mayne-Nicholls",
    "Blanco/Nulo",
];

/// The fixed, ordered set of outcomes every submission and every real value
/// is keyed by. Built once at startup and passed around read-only; nothing
/// mutates it for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Catalog {
    names: Vec<String>,
}

impl Catalog {
    pub fn new(names: Vec<String>) -> Self {
        Catalog { names }
    }

    /// Catalog from `POLLA_CANDIDATES` (comma-separated), falling back to the
    /// built-in candidate list.
    pub fn from_env() -> Self {
        match env::var("POLLA_CANDIDATES") {
            Ok(raw) => {
                let names: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if names.is_empty() {
                    Catalog::default()
                } else {
                    Catalog::new(names)
                }
            }
            Err(_) => Catalog::default(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect())
    }
}

/// One participant's registration: a name plus one percentage guess per
/// outcome. An outcome missing from `values` means the participant left that
/// field blank; it is never coerced to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    pub values: HashMap<String, f64>,
}

/// Admin-entered observed percentages, known entries only. An outcome absent
/// from the map is unknown.
pub type RealValues = HashMap<String, f64>;
