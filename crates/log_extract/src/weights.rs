//! `Weights { ... }` blocks
//!
//! The tournament runner prints every agent's heuristic weights as
//!
//! ```text
//! Weights { Piece Diff: "2.69", Middle Line Diff: "0.53", ... },
//! ```
//!
//! This module parses those blocks into `(name, value)` pairs and provides the
//! float scanner shared with the batch metric reader.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ExtractError, Result};
use crate::render_floats;

/// Marker identifying a weights line in the log.
pub const WEIGHTS_MARKER: &str = "Weights {";

/// A plain decimal float: digits, a point, digits. No sign, no exponent.
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.\d+").expect("float pattern is valid"));

/// Extract every decimal float in `text`, left to right.
pub fn extract_floats(text: &str) -> Vec<f64> {
    FLOAT_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Parse the `name: "value"` pairs of one weights block.
///
/// The block is the text between the first `{ ` and the following ` },`
/// (a closing ` }` at end of line is accepted too). Pairs keep their textual
/// order.
pub fn parse_weights_block(line: &str, line_no: usize) -> Result<Vec<(String, f64)>> {
    let line = line.trim();
    let start = line
        .find("{ ")
        .ok_or_else(|| ExtractError::malformed(line_no, "weights block has no opening `{ `"))?;
    let rest = &line[start + 2..];
    let end = rest
        .find(" },")
        .or_else(|| rest.strip_suffix(" }").map(str::len))
        .ok_or_else(|| ExtractError::malformed(line_no, "weights block has no closing ` },`"))?;

    rest[..end]
        .split(", ")
        .map(|pair| {
            let (name, value) = pair.split_once(": ").ok_or_else(|| {
                ExtractError::malformed(line_no, format!("weight pair `{}` has no `: `", pair))
            })?;
            let value = value.trim_matches('"').parse::<f64>().map_err(|e| {
                ExtractError::malformed(
                    line_no,
                    format!("weight `{}` has a non-numeric value `{}`: {}", name, value, e),
                )
            })?;
            Ok((name.to_string(), value))
        })
        .collect()
}

/// Flatten a pasted weights string into a space-separated float line.
///
/// Used to copy an agent's weights out of a log and into an agent file.
pub fn format_weights_string(unformatted: &str) -> String {
    render_floats(&extract_floats(unformatted))
}

#[cfg(test)]
#[path = "weights_tests.rs"]
mod weights_tests;
