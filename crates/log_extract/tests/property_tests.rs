//! Property-based tests for log extraction
//!
//! - Batch indices form the arithmetic sequence step, 2*step, ...
//! - Extracted values match what the runner printed
//! - Heuristic tables survive a write/read cycle unchanged

use log_extract::{
    read_table, scan_lines, write_table, BatchReaderConfig, FieldSelection, WeightSample,
};
use proptest::prelude::*;

/// Two-decimal values as printed by the runner (`{:.2}`)
fn arb_value() -> impl Strategy<Value = f64> {
    (0u32..100_000).prop_map(|n| n as f64 / 100.0)
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<f64>>> {
    proptest::collection::vec(proptest::collection::vec(arb_value(), 0..6), 0..12)
}

fn render_log(step: u32, batches: &[Vec<f64>]) -> String {
    let mut log = String::from("[INFO] Using NUM_AGENTS environment variable (4)\n");
    for (idx, values) in batches.iter().enumerate() {
        let batch = step * (idx as u32 + 1);
        log.push_str(&format!("[INFO] Running batch #{} with agents: [...]\n", batch));
        log.push_str(&format!("[INFO] Batch #{} completed with best agents: [\n", batch));
        let fields: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("H{}: \"{:.2}\"", i, v))
            .collect();
        log.push_str(&format!("    Weights {{ {} }},\n", fields.join(", ")));
        log.push_str("]\n");
    }
    log
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: batch indices are step, 2*step, 3*step, ...
    #[test]
    fn prop_batch_indices_are_arithmetic(step in 1u32..50, batches in arb_batches()) {
        let log = render_log(step, &batches);
        let config = BatchReaderConfig::new(step, FieldSelection::All);
        let scan = scan_lines(log.lines(), &config).unwrap();

        prop_assert_eq!(scan.records.len(), batches.len());
        for (idx, record) in scan.records.iter().enumerate() {
            prop_assert_eq!(record.batch, step * (idx as u32 + 1));
        }
        prop_assert_eq!(scan.unterminated, None);
    }

    /// Property: "all fields" extraction returns the printed values in order
    #[test]
    fn prop_all_fields_returns_printed_values(step in 1u32..10, batches in arb_batches()) {
        let log = render_log(step, &batches);
        let config = BatchReaderConfig::new(step, FieldSelection::All);
        let scan = scan_lines(log.lines(), &config).unwrap();

        let extracted: Vec<Vec<f64>> = scan.records.into_iter().map(|r| r.values).collect();
        prop_assert_eq!(extracted, batches);
    }

    /// Property: a named field yields at most one value per batch here
    #[test]
    fn prop_named_field_picks_its_own_value(batches in arb_batches()) {
        let log = render_log(1, &batches);
        let fields = FieldSelection::Named(vec!["H0".to_string()]);
        let scan = scan_lines(log.lines(), &BatchReaderConfig::new(1, fields)).unwrap();

        for (record, printed) in scan.records.iter().zip(&batches) {
            let expected: Vec<f64> = printed.first().copied().into_iter().collect();
            prop_assert_eq!(&record.values, &expected);
        }
    }

    /// Property: named fields are written exactly as they appear in the log
    #[test]
    fn prop_named_field_text_is_verbatim(batches in arb_batches()) {
        let log = render_log(1, &batches);
        let fields = FieldSelection::Named(vec!["H0".to_string()]);
        let scan = scan_lines(log.lines(), &BatchReaderConfig::new(1, fields)).unwrap();

        for (record, printed) in scan.records.iter().zip(&batches) {
            let expected = printed.first().map(|v| format!("{:.2}", v)).unwrap_or_default();
            prop_assert_eq!(&record.text, &expected);
        }
    }

    /// Property: write_table then read_table reproduces the samples
    #[test]
    fn prop_table_round_trip(
        samples in proptest::collection::vec(
            (arb_value(), proptest::option::of(0i32..3000))
                .prop_map(|(value, elo)| WeightSample { value, elo }),
            0..40,
        )
    ) {
        let mut out = Vec::new();
        write_table(&samples, &mut out).unwrap();
        let loaded = read_table(out.as_slice()).unwrap();
        prop_assert_eq!(loaded, samples);
    }
}
