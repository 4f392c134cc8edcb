use super::*;
use std::fs;

use crate::config::ModelConfig;

const LOG: &str = "\
[INFO  hexgame::cli] Using NUM_AGENTS environment variable (2)
[INFO  hexgame::genetic::emperor] Running batch #1 with agents: [...]
    Weights { Piece Diff: \"1.50\", Mobility: \"0.25\" },
    Weights { Piece Diff: \"0.50\", Mobility: \"0.75\" },
[INFO  hexgame::genetic::referee] Elos of batch 1: [1500, 1400]
[INFO  hexgame::genetic::emperor] Batch #1 completed with best agents: [...]
    Weights { Piece Diff: \"1.50\", Mobility: \"0.25\" },
";

fn write_log(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("exp.log");
    fs::write(&path, LOG).unwrap();
    path
}

#[test]
fn test_batches_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(&dir);

    let mut out = Vec::new();
    let scan = batches(&BatchesConfig::default(), &log, None, &mut out).unwrap();
    assert_eq!(scan.records.len(), 1);
    assert_eq!(String::from_utf8(out).unwrap(), "1,1.5 0.25\n");
}

#[test]
fn test_batches_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(&dir);
    let dest = dir.path().join("metrics.csv");

    let config = BatchesConfig {
        fields: vec!["Mobility".into()],
        ..BatchesConfig::default()
    };
    let mut out = Vec::new();
    batches(&config, &log, Some(&dest), &mut out).unwrap();
    assert!(out.is_empty());
    assert_eq!(fs::read_to_string(&dest).unwrap(), "1,0.25\n");
}

#[test]
fn test_batches_missing_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut out = Vec::new();
    let err = batches(
        &BatchesConfig::default(),
        &dir.path().join("absent.log"),
        None,
        &mut out,
    )
    .unwrap_err();
    assert!(err.to_string().contains("failed to open log"));
}

#[test]
fn test_correlate_writes_tables_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(&dir);
    let config = CorrelateConfig {
        out_dir: dir.path().join("tables"),
        ..CorrelateConfig::default()
    };
    let report_path = dir.path().join("report.json");

    let mut out = Vec::new();
    let report = correlate(&config, &log, Some(&report_path), &mut out).unwrap();

    assert_eq!(report.heuristics.len(), 2);
    assert_eq!(
        fs::read_to_string(config.out_dir.join("Piece Diff.txt")).unwrap(),
        "Heuristic_Value, Elo_Value\n1.5, 1400\n0.5, 1500\n"
    );
    assert_eq!(CorrelationReport::load(&report_path).unwrap().heuristics.len(), 2);
    assert!(String::from_utf8(out).unwrap().contains("Piece Diff"));
}

#[test]
fn test_correlate_top_ranked() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(&dir);
    let config = CorrelateConfig {
        alignment: Alignment::TopRanked,
        out_dir: dir.path().join("top"),
        ..CorrelateConfig::default()
    };

    let mut out = Vec::new();
    correlate(&config, &log, None, &mut out).unwrap();

    // Only the best-agents listing is recorded, paired with the top Elo.
    assert_eq!(
        fs::read_to_string(config.out_dir.join("Mobility.txt")).unwrap(),
        "Heuristic_Value, Elo_Value\n0.25, 1500\n"
    );
}

#[test]
fn test_format_weights() {
    let mut out = Vec::new();
    format_weights(r#"Weights { Piece Diff: "2.69", Mobility: "0.10" },"#, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "2.69 0.1\n");
}

#[test]
fn test_train_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let games = dir.path().join("game_table.txt");
    let states = dir.path().join("state_table.txt");
    fs::write(&games, "game_id,result\n1,1\n2,0\n").unwrap();
    fs::write(&states, "state_id,state,game_id\n1,b:3/4/3,1\n2,w:w2/4/3,2\n").unwrap();

    let mut section = crate::config::TrainSection {
        games,
        states,
        ..Default::default()
    };
    section.params.hidden_units = 4;
    section.params.epochs = 3;
    let model = ModelConfig {
        path: dir.path().join("model.json"),
    };

    let mut out = Vec::new();
    let report = train(&section, &model.path, &mut out).unwrap();
    assert_eq!(report.states, 2);
    assert!(String::from_utf8(out).unwrap().starts_with("states: 2"));

    let mut out = Vec::new();
    predict(&model.path, "3/4/3", &mut out).unwrap();
    assert!(!out.is_empty());

    let mut out = Vec::new();
    assert!(predict(&model.path, "3/4", &mut out).is_err());
}

#[test]
fn test_predict_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut out = Vec::new();
    let err = predict(&dir.path().join("nn.json"), "3/4/3", &mut out).unwrap_err();
    assert!(err.to_string().contains("failed to load model"));
}
