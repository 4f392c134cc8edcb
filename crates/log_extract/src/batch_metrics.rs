//! Batch metric reader
//!
//! Scans a log for `Batch #N` blocks and extracts their floats. Batches are
//! expected at `step, 2 * step, 3 * step, ...`; a block opens on the line
//! carrying the current batch marker and closes on the first later line
//! containing `},`.

use std::io::{BufRead, Write};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ExtractError, Result};
use crate::weights::extract_floats;
use crate::render_floats;

/// Prefix of the line that opens a batch block; followed by the batch index.
pub const BATCH_MARKER: &str = "Batch #";

/// Token that closes a batch block.
pub const BLOCK_CLOSE: &str = "},";

/// Which floats to keep from a batch block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSelection {
    /// Every decimal float in the block
    All,
    /// Only the values of `<name>: "<float>"` occurrences for these names
    Named(Vec<String>),
}

impl FieldSelection {
    /// `All` when no field is named, `Named` otherwise.
    pub fn from_fields(fields: Vec<String>) -> Self {
        if fields.is_empty() {
            Self::All
        } else {
            Self::Named(fields)
        }
    }
}

/// Batch reader configuration
#[derive(Debug, Clone)]
pub struct BatchReaderConfig {
    /// Batch numbering step; the first expected batch is `step`
    pub step: u32,
    pub fields: FieldSelection,
    /// Abandon a block that has not closed after this many lines.
    /// `None` keeps capturing until the end of the stream.
    pub max_capture_lines: Option<usize>,
}

impl BatchReaderConfig {
    pub fn new(step: u32, fields: FieldSelection) -> Self {
        Self {
            step,
            fields,
            max_capture_lines: None,
        }
    }

    pub fn with_max_capture_lines(mut self, max: usize) -> Self {
        self.max_capture_lines = Some(max);
        self
    }
}

/// Floats extracted from one closed batch block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch: u32,
    pub values: Vec<f64>,
    /// Space-separated value column as written by [`write_batches`].
    /// Named fields keep their matched text (`"1.10"` stays `1.10`).
    pub text: String,
}

impl BatchRecord {
    /// Record whose text is the rendered floats.
    pub fn new(batch: u32, values: Vec<f64>) -> Self {
        let text = render_floats(&values);
        Self {
            batch,
            values,
            text,
        }
    }
}

/// Result of scanning a whole log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchScan {
    /// Closed blocks in log order
    pub records: Vec<BatchRecord>,
    /// Batch whose block was still open when the log ended
    pub unterminated: Option<u32>,
    /// Batches whose blocks hit `max_capture_lines` without closing
    pub abandoned: Vec<u32>,
    /// Next batch index would overflow `u32`; later markers were not matched.
    pub counter_exhausted: bool,
}

#[derive(Debug)]
enum CaptureState {
    Idle,
    Capturing { buffer: String, lines: usize },
}

enum FieldExtractor {
    All,
    Named(Option<Regex>),
}

impl FieldExtractor {
    fn new(fields: &FieldSelection) -> Result<Self> {
        match fields {
            FieldSelection::All => Ok(Self::All),
            FieldSelection::Named(names) if names.is_empty() => Ok(Self::Named(None)),
            FieldSelection::Named(names) => {
                let pattern = names
                    .iter()
                    .map(|name| format!(r#"{}: "(\d+\.\d+)""#, regex::escape(name)))
                    .collect::<Vec<_>>()
                    .join("|");
                let re = Regex::new(&pattern).map_err(|e| {
                    ExtractError::InvalidConfig(format!("field pattern rejected: {}", e))
                })?;
                Ok(Self::Named(Some(re)))
            }
        }
    }

    fn extract(&self, batch: u32, text: &str) -> BatchRecord {
        match self {
            Self::All => BatchRecord::new(batch, extract_floats(text)),
            Self::Named(None) => BatchRecord::new(batch, Vec::new()),
            Self::Named(Some(re)) => {
                // One capture group per field; exactly one participates in each match.
                let raw: Vec<&str> = re
                    .captures_iter(text)
                    .filter_map(|caps| caps.iter().skip(1).flatten().next())
                    .map(|m| m.as_str())
                    .collect();
                BatchRecord {
                    batch,
                    values: raw.iter().filter_map(|v| v.parse().ok()).collect(),
                    text: raw.join(" "),
                }
            }
        }
    }
}

/// Line-by-line batch reader.
///
/// Feed lines in order with [`feed`](Self::feed), then call
/// [`finish`](Self::finish).
pub struct BatchMetricReader {
    step: u32,
    max_capture_lines: Option<usize>,
    extractor: FieldExtractor,
    counter: u32,
    /// `None` once the counter can no longer advance
    marker: Option<String>,
    state: CaptureState,
    scan: BatchScan,
    line_no: usize,
}

impl BatchMetricReader {
    pub fn new(config: &BatchReaderConfig) -> Result<Self> {
        if config.step == 0 {
            return Err(ExtractError::InvalidConfig(
                "batch step must be positive".to_string(),
            ));
        }
        if config.max_capture_lines == Some(0) {
            return Err(ExtractError::InvalidConfig(
                "max_capture_lines must be positive".to_string(),
            ));
        }
        Ok(Self {
            step: config.step,
            max_capture_lines: config.max_capture_lines,
            extractor: FieldExtractor::new(&config.fields)?,
            counter: config.step,
            marker: Some(format!("{}{}", BATCH_MARKER, config.step)),
            state: CaptureState::Idle,
            scan: BatchScan::default(),
            line_no: 0,
        })
    }

    /// Index of the batch the reader is waiting for (or capturing).
    pub fn current_batch(&self) -> u32 {
        self.counter
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing { .. })
    }

    pub fn feed(&mut self, line: &str) {
        self.line_no += 1;

        let state = std::mem::replace(&mut self.state, CaptureState::Idle);
        self.state = match state {
            CaptureState::Idle => CaptureState::Idle,
            CaptureState::Capturing { mut buffer, lines } => {
                buffer.push_str(line);
                buffer.push('\n');
                let lines = lines + 1;
                if line.contains(BLOCK_CLOSE) {
                    self.close_block(&buffer);
                    CaptureState::Idle
                } else if self.max_capture_lines.is_some_and(|max| lines >= max) {
                    warn!(
                        batch = self.counter,
                        line = self.line_no,
                        "Abandoning batch block after {} lines without `{}`",
                        lines,
                        BLOCK_CLOSE
                    );
                    self.scan.abandoned.push(self.counter);
                    CaptureState::Idle
                } else {
                    CaptureState::Capturing { buffer, lines }
                }
            }
        };

        // A closing line may also carry the next batch's marker.
        let opens = self.marker.as_deref().is_some_and(|marker| line.contains(marker));
        if matches!(self.state, CaptureState::Idle) && opens {
            debug!(batch = self.counter, line = self.line_no, "Batch block opened");
            self.state = CaptureState::Capturing {
                buffer: String::new(),
                lines: 0,
            };
        }
    }

    fn close_block(&mut self, buffer: &str) {
        let record = self.extractor.extract(self.counter, buffer);
        debug!(
            batch = self.counter,
            line = self.line_no,
            values = record.values.len(),
            "Batch block closed"
        );
        self.scan.records.push(record);

        match self.counter.checked_add(self.step) {
            Some(next) => {
                self.counter = next;
                self.marker = Some(format!("{}{}", BATCH_MARKER, next));
            }
            None => {
                warn!(
                    batch = self.counter,
                    step = self.step,
                    "Batch counter exhausted; ignoring the rest of the log"
                );
                self.marker = None;
                self.scan.counter_exhausted = true;
            }
        }
    }

    pub fn finish(mut self) -> BatchScan {
        if self.is_capturing() {
            warn!(
                batch = self.counter,
                "Log ended inside batch block; block was never closed"
            );
            self.scan.unterminated = Some(self.counter);
        }
        info!(
            records = self.scan.records.len(),
            abandoned = self.scan.abandoned.len(),
            "Batch scan complete"
        );
        self.scan
    }
}

/// Scan an in-memory line sequence.
pub fn scan_lines<'a, I>(lines: I, config: &BatchReaderConfig) -> Result<BatchScan>
where
    I: IntoIterator<Item = &'a str>,
{
    let reader = lines
        .into_iter()
        .fold(BatchMetricReader::new(config)?, |mut reader, line| {
            reader.feed(line);
            reader
        });
    Ok(reader.finish())
}

/// Scan a log stream.
pub fn read_batches<R: BufRead>(log: R, config: &BatchReaderConfig) -> Result<BatchScan> {
    let mut reader = BatchMetricReader::new(config)?;
    for line in log.lines() {
        reader.feed(&line?);
    }
    Ok(reader.finish())
}

/// Write records as `<batch>,<v1 v2 ... vn>` rows, no header.
pub fn write_batches<W: Write>(records: &[BatchRecord], out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    for record in records {
        writer.write_record([record.batch.to_string(), record.text.clone()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "batch_metrics_tests.rs"]
mod batch_metrics_tests;
