//! Feature extraction for the win-rate regressor
//!
//! Converts a board-state string into a flat vector suitable for model input.
//!
//! Notation: an optional side-to-move prefix (`b:` or `w:`), then ranks
//! separated by `/`. Within a rank, `w` and `b` are occupied squares and a
//! digit is a run of that many empty squares:
//!
//! ```text
//! b:b/bb/bbb/bbbb/3/4/3/4/3/wwww/www/ww/w
//! ```
//!
//! Each square becomes one slot: 0.0 empty, 1.0 white, 2.0 black.

use crate::error::{ModelError, Result};

/// Number of squares on the standard board (and slots in its feature vector).
pub const BOARD_SQUARES: usize = 37;

pub const EMPTY_CODE: f32 = 0.0;
pub const WHITE_CODE: f32 = 1.0;
pub const BLACK_CODE: f32 = 2.0;

/// Starting position of the standard board, black to move.
pub const START_POSITION: &str = "b:b/bb/bbb/bbbb/3/4/3/4/3/wwww/www/ww/w";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn from_char(c: char) -> Option<Side> {
        match c {
            'w' => Some(Side::White),
            'b' => Some(Side::Black),
            _ => None,
        }
    }

    /// Feature value of a square occupied by this side.
    pub fn code(self) -> f32 {
        match self {
            Side::White => WHITE_CODE,
            Side::Black => BLACK_CODE,
        }
    }
}

/// A decoded board-state string
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    /// From the `w:`/`b:` prefix, when present
    pub side_to_move: Option<Side>,
    /// One slot per square, in notation order
    pub squares: Vec<f32>,
}

/// Decode a board-state string, keeping the side to move.
pub fn parse_board(notation: &str) -> Result<BoardState> {
    let notation = notation.trim();
    let (side_to_move, ranks) = match notation.split_once(':') {
        Some((side, ranks)) => {
            let mut chars = side.chars();
            let side = match (chars.next().and_then(Side::from_char), chars.next()) {
                (Some(side), None) => side,
                _ => {
                    return Err(ModelError::malformed(
                        notation,
                        format!("unknown side-to-move prefix `{}`", side),
                    ))
                }
            };
            (Some(side), ranks)
        }
        None => (None, notation),
    };

    let mut squares = Vec::with_capacity(BOARD_SQUARES);
    for c in ranks.chars() {
        if let Some(side) = Side::from_char(c) {
            squares.push(side.code());
        } else if let Some(run) = c.to_digit(10) {
            squares.extend(std::iter::repeat(EMPTY_CODE).take(run as usize));
        } else if c != '/' {
            return Err(ModelError::malformed(
                notation,
                format!("unexpected character `{}`", c),
            ));
        }
    }

    Ok(BoardState {
        side_to_move,
        squares,
    })
}

/// Decode a board-state string into its feature vector.
pub fn decode_board(notation: &str) -> Result<Vec<f32>> {
    parse_board(notation).map(|board| board.squares)
}

#[cfg(test)]
#[path = "features_tests.rs"]
mod features_tests;
