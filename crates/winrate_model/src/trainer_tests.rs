use super::*;

fn game(id: &str, result: f64) -> GameRecord {
    GameRecord {
        game_id: id.to_string(),
        result,
    }
}

fn state(id: &str, board: &str, game_id: &str) -> StateRecord {
    StateRecord {
        state_id: id.to_string(),
        state: board.to_string(),
        game_id: game_id.to_string(),
    }
}

const OPENING: &str = "b:b/bb/bbb/bbbb/3/4/3/4/3/wwww/www/ww/w";
const MIDGAME: &str = "w:b/bb/bb1/bbbb/3/4/1b1/4/3/wwww/www/ww/w";

#[test]
fn test_aggregate_labels() {
    let games = vec![game("g1", 1.0), game("g2", 0.0), game("g3", 0.0)];
    let states = vec![
        state("s1", OPENING, "g1"),
        state("s2", OPENING, "g2"),
        state("s3", OPENING, "g3"),
        state("s4", MIDGAME, "g1"),
        state("s5", MIDGAME, "g9"),
    ];

    let outcomes = aggregate(&games, &states);
    assert_eq!(outcomes.len(), 2);

    // Sorted by state string.
    assert_eq!(outcomes[0].state, OPENING);
    assert_eq!(outcomes[0].wins, 1.0);
    assert_eq!(outcomes[0].games, 3);
    assert!((outcomes[0].black_win_ratio - 2.0 / 3.0).abs() < 1e-12);

    // g9 is not in the game table, so only g1 counts.
    assert_eq!(outcomes[1].state, MIDGAME);
    assert_eq!(outcomes[1].games, 1);
    assert_eq!(outcomes[1].black_win_ratio, 0.0);
}

#[test]
fn test_build_dataset_skips_undecodable_states() {
    let outcomes = vec![
        StateOutcome {
            state: "3/4/3".into(),
            wins: 1.0,
            games: 2,
            black_win_ratio: 0.5,
        },
        StateOutcome {
            state: "3/x/3".into(),
            wins: 0.0,
            games: 1,
            black_win_ratio: 1.0,
        },
    ];
    let set = build_dataset(&outcomes).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.width(), Some(10));
    assert_eq!(set.labels, vec![0.5]);
}

#[test]
fn test_build_dataset_width_mismatch() {
    let outcomes = vec![
        StateOutcome {
            state: "3/4/3".into(),
            wins: 0.0,
            games: 1,
            black_win_ratio: 1.0,
        },
        StateOutcome {
            state: "3/4".into(),
            wins: 0.0,
            games: 1,
            black_win_ratio: 1.0,
        },
    ];
    assert!(matches!(
        build_dataset(&outcomes),
        Err(ModelError::StructuralMismatch { expected: 10, actual: 7 })
    ));
}

#[test]
fn test_build_dataset_empty() {
    assert!(matches!(build_dataset(&[]), Err(ModelError::EmptyDataset)));
}

#[test]
fn test_split_sizes() {
    let config = TrainConfig::default();
    assert_eq!(config.test_size(8), 2);
    assert_eq!(config.test_size(10), 3);
    assert_eq!(config.test_size(1), 0);

    let none = TrainConfig {
        test_fraction: 0.0,
        ..TrainConfig::default()
    };
    assert_eq!(none.test_size(10), 0);
}

#[test]
fn test_config_validation() {
    assert!(TrainConfig::default().validate().is_ok());
    for bad in [
        TrainConfig {
            hidden_units: 0,
            ..TrainConfig::default()
        },
        TrainConfig {
            epochs: 0,
            ..TrainConfig::default()
        },
        TrainConfig {
            learning_rate: 0.0,
            ..TrainConfig::default()
        },
        TrainConfig {
            batch_size: 0,
            ..TrainConfig::default()
        },
        TrainConfig {
            test_fraction: 1.0,
            ..TrainConfig::default()
        },
    ] {
        assert!(matches!(bad.validate(), Err(ModelError::InvalidConfig(_))));
    }
}

fn toy_tables() -> (Vec<GameRecord>, Vec<StateRecord>) {
    // Each board is one white or black piece on a ten-square strip; black
    // wins every game where its piece is on the board.
    let mut games = Vec::new();
    let mut states = Vec::new();
    for pos in 0..10 {
        for (side, result) in [('w', 1.0), ('b', 0.0)] {
            let id = format!("{}{}", side, pos);
            let board = format!("{}{}{}", pos, side, 9 - pos).replace('0', "");
            games.push(game(&id, result));
            states.push(state(&id, &board, &id));
        }
    }
    (games, states)
}

#[test]
fn test_train_is_deterministic() {
    let (games, states) = toy_tables();
    let config = TrainConfig {
        hidden_units: 8,
        epochs: 10,
        learning_rate: 0.01,
        ..TrainConfig::default()
    };

    let a = train(&config, &games, &states).unwrap();
    let b = train(&config, &games, &states).unwrap();
    assert_eq!(a.model.parameters().unwrap(), b.model.parameters().unwrap());
    assert_eq!(a.epoch_losses, b.epoch_losses);

    assert_eq!(a.states, 20);
    assert_eq!(a.test_size, 5);
    assert_eq!(a.train_size, 15);
    assert!(a.test_mse.is_some());
}

#[test]
fn test_train_loss_decreases() {
    let (games, states) = toy_tables();
    let config = TrainConfig {
        hidden_units: 16,
        epochs: 200,
        learning_rate: 0.01,
        batch_size: 8,
        test_fraction: 0.0,
        seed: 5,
    };

    let report = train(&config, &games, &states).unwrap();
    assert_eq!(report.test_mse, None);
    let first = report.epoch_losses[0];
    let last = *report.epoch_losses.last().unwrap();
    assert!(last < first, "loss {} -> {}", first, last);
    assert_eq!(report.model.input_width(), 10);
}

#[test]
fn test_fit_config_mirrors_train_config() {
    let config = TrainConfig {
        epochs: 7,
        learning_rate: 0.02,
        batch_size: 16,
        ..TrainConfig::default()
    };
    let fit = config.fit_config();
    assert_eq!(fit.epochs, 7);
    assert_eq!(fit.learning_rate, 0.02);
    assert_eq!(fit.batch_size, 16);
}

#[test]
fn test_train_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let games_path = dir.path().join("game_table.txt");
    let states_path = dir.path().join("state_table.txt");
    std::fs::write(&games_path, "game_id,result\n1,1\n2,0\n3,0\n").unwrap();
    std::fs::write(
        &states_path,
        "state_id,state,game_id,move_number\n\
         10,b:3/4/3,1,0\n\
         11,b:3/4/3,2,0\n\
         12,w:b2/4/3,3,1\n",
    )
    .unwrap();

    let config = TrainConfig {
        hidden_units: 4,
        epochs: 5,
        test_fraction: 0.0,
        ..TrainConfig::default()
    };
    let report = train_from_files(&config, &games_path, &states_path).unwrap();
    assert_eq!(report.states, 2);
    assert_eq!(report.train_size, 2);
    assert_eq!(report.model.input_width(), 10);
}

#[test]
fn test_missing_tables() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_games(&dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, ModelError::ResourceUnavailable { .. }));
}
