//! Heuristic/Elo correlation report

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::correlator::Alignment;
use crate::error::{ExtractError, Result};
use crate::table::{HeuristicSeries, WeightsTable};

/// Summary statistics of one heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicSummary {
    pub name: String,
    /// All samples, resolved or not
    pub samples: usize,
    /// Samples that carry an Elo
    pub resolved: usize,
    /// Mean heuristic value over all samples
    pub mean_value: f64,
    /// Mean Elo over resolved samples
    pub mean_elo: Option<f64>,
    /// Pearson correlation between value and Elo over resolved samples
    pub correlation: Option<f64>,
}

impl HeuristicSummary {
    pub fn from_series(series: &HeuristicSeries) -> Self {
        let samples = series.samples.len();
        let mean_value = if samples == 0 {
            0.0
        } else {
            series.samples.iter().map(|s| s.value).sum::<f64>() / samples as f64
        };

        let pairs: Vec<(f64, f64)> = series
            .samples
            .iter()
            .filter_map(|s| s.elo.map(|elo| (s.value, elo as f64)))
            .collect();
        let mean_elo = if pairs.is_empty() {
            None
        } else {
            Some(pairs.iter().map(|(_, e)| e).sum::<f64>() / pairs.len() as f64)
        };

        Self {
            name: series.name.clone(),
            samples,
            resolved: pairs.len(),
            mean_value,
            mean_elo,
            correlation: pearson(&pairs),
        }
    }
}

/// Pearson correlation coefficient; `None` below two points or with zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Per-heuristic correlation with Elo for one alignment policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub alignment: Alignment,
    /// Sorted by |correlation|, strongest first; undefined correlations last
    pub heuristics: Vec<HeuristicSummary>,
}

impl CorrelationReport {
    pub fn from_table(alignment: Alignment, table: &WeightsTable) -> Self {
        let mut heuristics: Vec<_> = table.iter().map(HeuristicSummary::from_series).collect();
        heuristics.sort_by(|a, b| match (a.correlation, b.correlation) {
            (Some(x), Some(y)) => y
                .abs()
                .partial_cmp(&x.abs())
                .unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Self {
            alignment,
            heuristics,
        }
    }

    /// Save report to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ExtractError::unavailable(path, e))
    }

    /// Load report from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ExtractError::unavailable(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Generate a text report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!(
            "=== Heuristic/Elo correlation ({}) ===\n\n",
            self.alignment
        ));
        report.push_str(&format!(
            "{:<32} {:>8} {:>8} {:>10} {:>10} {:>8}\n",
            "Heuristic", "Samples", "Elo'd", "Mean val", "Mean Elo", "r"
        ));
        report.push_str(&"-".repeat(81));
        report.push('\n');

        for h in &self.heuristics {
            let mean_elo = h
                .mean_elo
                .map(|e| format!("{:.1}", e))
                .unwrap_or_else(|| "-".to_string());
            let r = h
                .correlation
                .map(|r| format!("{:+.3}", r))
                .unwrap_or_else(|| "-".to_string());
            report.push_str(&format!(
                "{:<32} {:>8} {:>8} {:>10.3} {:>10} {:>8}\n",
                h.name, h.samples, h.resolved, h.mean_value, mean_elo, r
            ));
        }

        report
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
