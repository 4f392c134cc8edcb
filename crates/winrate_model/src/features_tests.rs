use super::*;

#[test]
fn test_decode_run_lengths_only() {
    let features = decode_board("3/4/3").unwrap();
    assert_eq!(features, vec![0.0; 10]);
}

#[test]
fn test_decode_start_position() {
    let board = parse_board(START_POSITION).unwrap();
    assert_eq!(board.side_to_move, Some(Side::Black));
    assert_eq!(board.squares.len(), BOARD_SQUARES);

    // 10 black pieces first, 10 white pieces last, 17 empty squares between.
    assert!(board.squares[..10].iter().all(|&x| x == BLACK_CODE));
    assert!(board.squares[10..27].iter().all(|&x| x == EMPTY_CODE));
    assert!(board.squares[27..].iter().all(|&x| x == WHITE_CODE));
}

#[test]
fn test_decode_mixed_rank() {
    let features = decode_board("w:w1b/2").unwrap();
    assert_eq!(features, vec![WHITE_CODE, EMPTY_CODE, BLACK_CODE, EMPTY_CODE, EMPTY_CODE]);
    assert_eq!(parse_board("w:w1b/2").unwrap().side_to_move, Some(Side::White));
}

#[test]
fn test_digits_are_single_runs() {
    // "12" is a run of one followed by a run of two.
    assert_eq!(decode_board("12").unwrap().len(), 3);
}

#[test]
fn test_decode_rejects_unknown_piece() {
    let err = decode_board("3/x/3").unwrap_err();
    assert!(matches!(err, ModelError::MalformedRecord { .. }));
}

#[test]
fn test_decode_rejects_bad_prefix() {
    assert!(decode_board("red:3/4/3").is_err());
    assert!(decode_board(":3/4/3").is_err());
}
