//! Heuristic/Elo correlator
//!
//! Pairs the heuristic weights printed for each agent with the Elo ratings the
//! tournament runner reports at the end of a batch. Two alignment policies
//! exist and produce different tables from the same log:
//!
//! - [`BackfillCorrelator`]: every agent of every batch. Weights are recorded
//!   as they appear and receive their Elo once the batch's Elo list is seen.
//! - [`TopRankCorrelator`]: only the best agents. The batch's Elo list is cut
//!   to its five highest values and paired, in rank order, with the five
//!   weights lines that follow the "completed with best agents" line.

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ExtractError, Result};
use crate::table::{WeightSample, WeightsTable};
use crate::weights::{parse_weights_block, WEIGHTS_MARKER};

/// Line announcing the per-batch agent count, e.g. `... variable (12)`.
pub const AGENT_COUNT_MARKER: &str = "Using NUM_AGENTS environment variable";
pub const RUNNING_BATCH_MARKER: &str = "Running batch";
/// Line carrying a batch's Elo list, e.g. `Elos of batch 3: [1500, 1400]`.
pub const ELO_LIST_MARKER: &str = "Elos of batch";
pub const BEST_AGENTS_MARKER: &str = "completed with best agents";

/// Number of best agents paired by [`TopRankCorrelator`].
pub const TOP_RANKED: usize = 5;

static AGENT_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+)\)").expect("agent count pattern is valid"));

/// What a log line means to the correlators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLine {
    AgentCount(usize),
    RunningBatch,
    BestAgents,
    Weights,
    EloList,
    Other,
}

/// Classify a line. Markers are checked in a fixed order; the first hit wins.
pub fn classify(line: &str) -> LogLine {
    if line.contains(AGENT_COUNT_MARKER) {
        AGENT_COUNT_RE
            .captures(line)
            .and_then(|caps| caps[1].parse().ok())
            .map(LogLine::AgentCount)
            .unwrap_or(LogLine::Other)
    } else if line.contains(RUNNING_BATCH_MARKER) {
        LogLine::RunningBatch
    } else if line.contains(BEST_AGENTS_MARKER) {
        LogLine::BestAgents
    } else if line.contains(WEIGHTS_MARKER) {
        LogLine::Weights
    } else if line.contains(ELO_LIST_MARKER) {
        LogLine::EloList
    } else {
        LogLine::Other
    }
}

/// Parse the bracketed Elo list of an `Elos of batch N: [e1, e2, ...]` line.
pub fn parse_elo_list(line: &str, line_no: usize) -> Result<Vec<i32>> {
    let after_marker = line
        .find(ELO_LIST_MARKER)
        .map(|pos| &line[pos + ELO_LIST_MARKER.len()..])
        .unwrap_or(line);
    let (_, list) = after_marker
        .split_once(": ")
        .ok_or_else(|| ExtractError::malformed(line_no, "Elo line has no `: `"))?;
    let inner = list
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| ExtractError::malformed(line_no, "Elo list is not bracketed"))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|item| {
            item.trim().parse::<i32>().map_err(|e| {
                ExtractError::malformed(line_no, format!("bad Elo `{}`: {}", item.trim(), e))
            })
        })
        .collect()
}

/// Alignment policy between weights lines and Elo ratings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Every agent, back-filled from the batch's Elo list
    #[default]
    #[serde(rename = "backfill")]
    TemporalBackfill,
    /// Top five Elos paired with the best agents' weights
    #[serde(rename = "top-ranked")]
    TopRanked,
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::TemporalBackfill => write!(f, "backfill"),
            Alignment::TopRanked => write!(f, "top-ranked"),
        }
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "backfill" | "temporal" => Ok(Alignment::TemporalBackfill),
            "top-ranked" | "top" | "top5" => Ok(Alignment::TopRanked),
            _ => Err(format!("unknown alignment `{}`", s)),
        }
    }
}

/// Order in which a batch's Elo list is laid over its unresolved samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EloPairing {
    /// Oldest unresolved sample takes the last Elo of the list.
    ///
    /// With `[1500, 1400]` the first-seen agent gets 1400.
    #[default]
    #[serde(rename = "reversed")]
    Reversed,
    /// Oldest unresolved sample takes the first Elo of the list, so the list
    /// reads in roster order. This is how the tournament's own analysis
    /// script back-fills.
    #[serde(rename = "chronological")]
    Chronological,
}

impl FromStr for EloPairing {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reversed" => Ok(EloPairing::Reversed),
            "chronological" => Ok(EloPairing::Chronological),
            _ => Err(format!("unknown Elo pairing `{}`", s)),
        }
    }
}

/// A line-driven weights/Elo alignment strategy.
///
/// `feed` returns `MalformedRecord` for a line it had to skip; the scan may
/// continue. Any other error means the log cannot be aligned.
pub trait Correlator {
    fn alignment(&self) -> Alignment;

    fn feed(&mut self, line_no: usize, line: &str) -> Result<()>;

    fn finish(self) -> WeightsTable;
}

// =============================================================================
// Temporal back-fill
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillPhase {
    BetweenBatches,
    AwaitingWeights,
}

#[derive(Debug, Clone)]
pub struct BackfillCorrelator {
    phase: BackfillPhase,
    num_agents: Option<usize>,
    pairing: EloPairing,
    table: WeightsTable,
}

impl Default for BackfillCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl BackfillCorrelator {
    pub fn new() -> Self {
        Self::with_pairing(EloPairing::default())
    }

    pub fn with_pairing(pairing: EloPairing) -> Self {
        Self {
            phase: BackfillPhase::BetweenBatches,
            num_agents: None,
            pairing,
            table: WeightsTable::new(),
        }
    }

    pub fn phase(&self) -> BackfillPhase {
        self.phase
    }

    pub fn num_agents(&self) -> Option<usize> {
        self.num_agents
    }

    pub fn table(&self) -> &WeightsTable {
        &self.table
    }

    /// Drop samples of a batch whose Elo list never arrived.
    fn discard_stale(&mut self, line_no: usize) {
        let num_agents = self.num_agents;
        for series in self.table.iter_mut() {
            let stale = series.unresolved_tail();
            if stale == 0 {
                continue;
            }
            if num_agents.is_some_and(|n| n != stale) {
                warn!(
                    line = line_no,
                    heuristic = %series.name,
                    stale,
                    expected = ?num_agents,
                    "Unresolved sample count differs from agent count"
                );
            }
            let keep = series.samples.len() - stale;
            series.samples.truncate(keep);
            warn!(
                line = line_no,
                heuristic = %series.name,
                dropped = stale,
                "Discarded samples of a batch without Elo list"
            );
        }
    }

    fn backfill(&mut self, line_no: usize, elos: &[i32]) -> Result<()> {
        if let Some(n) = self.num_agents {
            if elos.len() != n {
                return Err(ExtractError::mismatch(
                    line_no,
                    format!("Elo list has {} entries, expected {} agents", elos.len(), n),
                ));
            }
        }
        if self.table.is_empty() && !elos.is_empty() {
            return Err(ExtractError::mismatch(
                line_no,
                "Elo list seen before any weights",
            ));
        }
        if let Some(short) = self.table.iter().find(|s| s.samples.len() < elos.len()) {
            return Err(ExtractError::mismatch(
                line_no,
                format!(
                    "heuristic `{}` has {} samples, Elo list has {}",
                    short.name,
                    short.samples.len(),
                    elos.len()
                ),
            ));
        }

        let pairing = self.pairing;
        for series in self.table.iter_mut() {
            let start = series.samples.len() - elos.len();
            let tail = &mut series.samples[start..];
            match pairing {
                EloPairing::Reversed => {
                    for (sample, &elo) in tail.iter_mut().zip(elos.iter().rev()) {
                        sample.elo = Some(elo);
                    }
                }
                EloPairing::Chronological => {
                    for (sample, &elo) in tail.iter_mut().zip(elos) {
                        sample.elo = Some(elo);
                    }
                }
            }
        }
        debug!(line = line_no, elos = elos.len(), "Back-filled Elo list");
        Ok(())
    }
}

impl Correlator for BackfillCorrelator {
    fn alignment(&self) -> Alignment {
        Alignment::TemporalBackfill
    }

    fn feed(&mut self, line_no: usize, line: &str) -> Result<()> {
        match classify(line) {
            LogLine::AgentCount(n) => {
                debug!(line = line_no, agents = n, "Agent count");
                self.num_agents = Some(n);
            }
            LogLine::RunningBatch => {
                self.discard_stale(line_no);
                self.phase = BackfillPhase::AwaitingWeights;
            }
            LogLine::Weights => match self.phase {
                BackfillPhase::AwaitingWeights => {
                    for (name, value) in parse_weights_block(line, line_no)? {
                        self.table.push(&name, WeightSample::unresolved(value));
                    }
                }
                BackfillPhase::BetweenBatches => {
                    debug!(line = line_no, "Weights outside a batch ignored");
                }
            },
            LogLine::EloList => {
                let elos = parse_elo_list(line, line_no)?;
                self.backfill(line_no, &elos)?;
                self.phase = BackfillPhase::BetweenBatches;
            }
            LogLine::BestAgents | LogLine::Other => {}
        }
        Ok(())
    }

    fn finish(self) -> WeightsTable {
        let unresolved = self.table.unresolved_count();
        if unresolved > 0 {
            info!(unresolved, "Log ended with samples awaiting an Elo list");
        }
        self.table
    }
}

// =============================================================================
// Top-ranked
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopRankPhase {
    Idle,
    /// Inside the best-agents listing; `rank` weights lines consumed so far
    CollectingBest { rank: usize },
}

#[derive(Debug, Clone)]
pub struct TopRankCorrelator {
    phase: TopRankPhase,
    ranking: Vec<i32>,
    table: WeightsTable,
}

impl Default for TopRankCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl TopRankCorrelator {
    pub fn new() -> Self {
        Self {
            phase: TopRankPhase::Idle,
            ranking: Vec::new(),
            table: WeightsTable::new(),
        }
    }

    pub fn phase(&self) -> TopRankPhase {
        self.phase
    }

    /// Pending top Elos, highest first
    pub fn ranking(&self) -> &[i32] {
        &self.ranking
    }

    pub fn table(&self) -> &WeightsTable {
        &self.table
    }

    fn end_listing(&mut self) {
        self.phase = TopRankPhase::Idle;
        self.ranking.clear();
    }
}

impl Correlator for TopRankCorrelator {
    fn alignment(&self) -> Alignment {
        Alignment::TopRanked
    }

    fn feed(&mut self, line_no: usize, line: &str) -> Result<()> {
        let kind = classify(line);

        if let TopRankPhase::CollectingBest { rank } = self.phase {
            if kind == LogLine::Weights {
                let elo = self.ranking.get(rank).copied();
                if rank + 1 == TOP_RANKED {
                    self.end_listing();
                } else {
                    self.phase = TopRankPhase::CollectingBest { rank: rank + 1 };
                }
                for (name, value) in parse_weights_block(line, line_no)? {
                    self.table.push(&name, WeightSample { value, elo });
                }
                return Ok(());
            }
            warn!(
                line = line_no,
                collected = rank,
                "Best-agents listing ended before {} weights lines",
                TOP_RANKED
            );
            self.end_listing();
        }

        match kind {
            LogLine::EloList => {
                let mut elos = parse_elo_list(line, line_no)?;
                elos.sort_unstable_by(|a, b| b.cmp(a));
                elos.truncate(TOP_RANKED);
                debug!(line = line_no, top = ?elos, "Top Elos");
                self.ranking = elos;
            }
            LogLine::BestAgents => {
                if self.ranking.is_empty() {
                    warn!(line = line_no, "Best agents listed before any Elo list");
                }
                self.phase = TopRankPhase::CollectingBest { rank: 0 };
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> WeightsTable {
        self.table
    }
}

// =============================================================================
// Drivers
// =============================================================================

/// Run any correlator over a log stream.
///
/// Malformed lines are logged and skipped; structural errors abort.
pub fn run_correlator<R: BufRead, C: Correlator>(
    log: R,
    mut correlator: C,
) -> Result<WeightsTable> {
    let alignment = correlator.alignment();
    for (idx, line) in log.lines().enumerate() {
        let line = line?;
        if let Err(e) = correlator.feed(idx + 1, &line) {
            if !e.is_recoverable() {
                return Err(e);
            }
            warn!(error = %e, "Skipping record");
        }
    }

    let table = correlator.finish();
    info!(
        %alignment,
        heuristics = table.len(),
        samples = table.sample_count(),
        "Correlation complete"
    );
    Ok(table)
}

/// Correlate a log stream with the given policy's default settings.
pub fn correlate<R: BufRead>(log: R, alignment: Alignment) -> Result<WeightsTable> {
    match alignment {
        Alignment::TemporalBackfill => run_correlator(log, BackfillCorrelator::new()),
        Alignment::TopRanked => run_correlator(log, TopRankCorrelator::new()),
    }
}

#[cfg(test)]
#[path = "correlator_tests.rs"]
mod correlator_tests;
