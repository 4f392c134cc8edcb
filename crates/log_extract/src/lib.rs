//! Tournament log extraction
//!
//! This crate turns the plain-text logs written by the tournament runner into
//! tables:
//! - Per-batch numeric metrics (`Batch #N` blocks)
//! - Per-heuristic (weight value, Elo) histories, under two alignment policies
//! - Correlation reports between heuristic weights and Elo
//!
//! Every entry point is a single pass over a finite line sequence. Nothing is
//! shared between invocations.
//!
//! # Usage
//!
//! ```ignore
//! use log_extract::{read_batches, BatchReaderConfig, FieldSelection};
//!
//! let log = std::io::BufReader::new(std::fs::File::open("exp2.log")?);
//! let scan = read_batches(log, &BatchReaderConfig::new(5, FieldSelection::All))?;
//! for record in &scan.records {
//!     println!("{} -> {:?}", record.batch, record.values);
//! }
//! ```

mod batch_metrics;
mod correlator;
mod error;
mod report;
mod table;
mod weights;

pub use batch_metrics::*;
pub use correlator::*;
pub use error::*;
pub use report::*;
pub use table::*;
pub use weights::*;

/// Render a float the way the downstream tables expect it: shortest
/// round-trip digits with a mandatory fractional part (`2.69`, `0.1`, `1.0`).
pub fn render_float(value: f64) -> String {
    format!("{:?}", value)
}

/// Render a sequence of floats space-separated, without a trailing space.
pub fn render_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| render_float(*v))
        .collect::<Vec<_>>()
        .join(" ")
}
