//! Weights table and its per-heuristic text files
//!
//! On disk every heuristic gets its own `<heuristic>.txt`:
//!
//! ```text
//! Heuristic_Value, Elo_Value
//! 2.69, 1500
//! 0.53, None
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ExtractError, Result};
use crate::render_float;

/// Header line of every heuristic file.
pub const TABLE_HEADER: &str = "Heuristic_Value, Elo_Value";

/// How an unresolved Elo is written.
pub const UNRESOLVED_ELO: &str = "None";

/// One observed heuristic value and the Elo of the agent that carried it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    pub value: f64,
    /// `None` until the batch's Elo list has been seen
    pub elo: Option<i32>,
}

impl WeightSample {
    pub fn unresolved(value: f64) -> Self {
        Self { value, elo: None }
    }

    pub fn resolved(value: f64, elo: i32) -> Self {
        Self {
            value,
            elo: Some(elo),
        }
    }
}

/// All samples of one heuristic, in encounter order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicSeries {
    pub name: String,
    pub samples: Vec<WeightSample>,
}

impl HeuristicSeries {
    /// Number of trailing samples still waiting for an Elo.
    pub fn unresolved_tail(&self) -> usize {
        self.samples
            .iter()
            .rev()
            .take_while(|s| s.elo.is_none())
            .count()
    }
}

/// Heuristic name → sample history, ordered by first appearance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightsTable {
    series: Vec<HeuristicSeries>,
    index: HashMap<String, usize>,
}

impl WeightsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to `name`'s history, creating the heuristic on first use.
    pub fn push(&mut self, name: &str, sample: WeightSample) {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.series.push(HeuristicSeries {
                    name: name.to_string(),
                    samples: Vec::new(),
                });
                self.index.insert(name.to_string(), self.series.len() - 1);
                self.series.len() - 1
            }
        };
        self.series[idx].samples.push(sample);
    }

    pub fn get(&self, name: &str) -> Option<&[WeightSample]> {
        self.index
            .get(name)
            .map(|&idx| self.series[idx].samples.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeuristicSeries> {
        self.series.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut HeuristicSeries> {
        self.series.iter_mut()
    }

    pub fn heuristic_names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of heuristics
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total samples across all heuristics
    pub fn sample_count(&self) -> usize {
        self.series.iter().map(|s| s.samples.len()).sum()
    }

    /// Total samples without an Elo
    pub fn unresolved_count(&self) -> usize {
        self.series
            .iter()
            .flat_map(|s| &s.samples)
            .filter(|s| s.elo.is_none())
            .count()
    }
}

/// Write one heuristic's samples in the table format.
pub fn write_table<W: Write>(samples: &[WeightSample], mut out: W) -> Result<()> {
    writeln!(out, "{}", TABLE_HEADER)?;
    for sample in samples {
        let elo = sample
            .elo
            .map(|e| e.to_string())
            .unwrap_or_else(|| UNRESOLVED_ELO.to_string());
        writeln!(out, "{}, {}", render_float(sample.value), elo)?;
    }
    out.flush()?;
    Ok(())
}

/// Read a table written by [`write_table`].
///
/// Both `None` and an empty field are read as an unresolved Elo.
pub fn read_table<R: Read>(input: R) -> Result<Vec<WeightSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut samples = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        // Header is line 1.
        let line = idx + 2;
        if row.len() != 2 {
            return Err(ExtractError::malformed(
                line,
                format!("expected 2 fields, found {}", row.len()),
            ));
        }
        let value = row[0].parse::<f64>().map_err(|e| {
            ExtractError::malformed(line, format!("bad heuristic value `{}`: {}", &row[0], e))
        })?;
        let elo = match &row[1] {
            "" | UNRESOLVED_ELO => None,
            text => Some(text.parse::<i32>().map_err(|e| {
                ExtractError::malformed(line, format!("bad Elo `{}`: {}", text, e))
            })?),
        };
        samples.push(WeightSample { value, elo });
    }
    Ok(samples)
}

/// Path of a heuristic's file inside `dir`.
pub fn table_path(dir: &Path, heuristic: &str) -> PathBuf {
    dir.join(format!("{}.txt", heuristic))
}

/// Write every heuristic of `table` to `<dir>/<heuristic>.txt`.
///
/// Creates `dir` if needed. Returns the written paths in table order.
pub fn write_tables(table: &WeightsTable, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| ExtractError::unavailable(dir, e))?;

    let mut written = Vec::with_capacity(table.len());
    for series in table.iter() {
        let path = table_path(dir, &series.name);
        let file = fs::File::create(&path).map_err(|e| ExtractError::unavailable(&path, e))?;
        write_table(&series.samples, std::io::BufWriter::new(file))?;
        debug!(path = %path.display(), samples = series.samples.len(), "Wrote heuristic table");
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "Heuristic tables written");
    Ok(written)
}

/// Read back one heuristic's file.
pub fn load_table(path: &Path) -> Result<Vec<WeightSample>> {
    let file = fs::File::open(path).map_err(|e| ExtractError::unavailable(path, e))?;
    read_table(std::io::BufReader::new(file))
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod table_tests;
