//! Gomoku rule engine with Renju restrictions for black.
//!
//! White wins on any line of five or more. Black wins only on an exact five and
//! may never create an overline, a double three or a double four; an exact five
//! takes priority over the double patterns. The engine is pure: it holds the
//! board and whose turn it is, nothing else.

/// Board grid, stones and the snapshot codec.
pub mod board;
mod patterns;

use thiserror::Error;

pub use self::board::{BOARD_SIZE, Board, CELL_COUNT, SnapshotError, Stone};

/// Where the game stands from the engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// Placements are still accepted.
    InProgress,
    /// Black completed an exact five.
    WonByBlack,
    /// White completed five or more.
    WonByWhite,
}

/// Why a placement was refused. The board is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("({row}, {col}) is outside the board")]
    /// Coordinates outside the 15×15 grid.
    OutOfBounds {
        /// Requested row.
        row: i32,
        /// Requested column.
        col: i32,
    },
    #[error("cell is already occupied")]
    /// The cell already holds a stone.
    Occupied,
    #[error("the game already has a winner")]
    /// A winner already exists.
    GameOver,
    #[error("black may not form six or more in a row")]
    /// Black would make six or more in a row.
    Overline,
    #[error("black may not form two open threes at once")]
    /// Black would make two open threes at once.
    DoubleThree,
    #[error("black may not form two fours at once")]
    /// Black would make two fours at once.
    DoubleFour,
}

/// An accepted placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Row of the stone.
    pub row: usize,
    /// Column of the stone.
    pub col: usize,
    /// Color that was placed.
    pub stone: Stone,
    /// Whether this stone ended the game.
    pub winning: bool,
}

/// Board plus turn order, validating every placement.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    board: Board,
    turn: Stone,
    state: PlayState,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// Fresh game, black to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Stone::Black,
            state: PlayState::InProgress,
        }
    }

    /// Resume from a stored position. Black moves when both colors have the
    /// same number of stones, white otherwise.
    pub fn from_board(board: Board) -> Self {
        let turn = if board.count(Stone::Black) > board.count(Stone::White) {
            Stone::White
        } else {
            Stone::Black
        };
        Self {
            board,
            turn,
            state: PlayState::InProgress,
        }
    }

    /// Replay a move history from an empty board, stopping at the first illegal move.
    pub fn replay<I>(moves: I) -> Result<Self, (usize, PlacementError)>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut engine = Self::new();
        for (index, (row, col)) in moves.into_iter().enumerate() {
            engine
                .place_stone(row, col)
                .map_err(|err| (index, err))?;
        }
        Ok(engine)
    }

    /// Current position.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Color expected to move next.
    pub fn turn(&self) -> Stone {
        self.turn
    }

    /// Whether the game is still being played.
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Color that won, once the game is over.
    pub fn winner(&self) -> Option<Stone> {
        match self.state {
            PlayState::InProgress => None,
            PlayState::WonByBlack => Some(Stone::Black),
            PlayState::WonByWhite => Some(Stone::White),
        }
    }

    /// Place the current color at `(row, col)`.
    pub fn place_stone(&mut self, row: i32, col: i32) -> Result<Placement, PlacementError> {
        let cell = self
            .board
            .cell(row, col)
            .ok_or(PlacementError::OutOfBounds { row, col })?;
        if self.state != PlayState::InProgress {
            return Err(PlacementError::GameOver);
        }
        if cell.is_some() {
            return Err(PlacementError::Occupied);
        }

        let stone = self.turn;
        let (r, c) = (row as usize, col as usize);
        self.board.set(r, c, Some(stone));

        let verdict = match stone {
            Stone::White => Ok(patterns::longest_run(&self.board, row, col, Stone::White) >= 5),
            Stone::Black => self.judge_black(row, col),
        };

        let winning = match verdict {
            Ok(winning) => winning,
            Err(err) => {
                self.board.set(r, c, None);
                return Err(err);
            }
        };

        if winning {
            self.state = match stone {
                Stone::Black => PlayState::WonByBlack,
                Stone::White => PlayState::WonByWhite,
            };
        } else {
            self.turn = stone.opponent();
        }

        Ok(Placement {
            row: r,
            col: c,
            stone,
            winning,
        })
    }

    /// Classify a black stone already sitting at `(row, col)`.
    fn judge_black(&self, row: i32, col: i32) -> Result<bool, PlacementError> {
        if patterns::longest_run(&self.board, row, col, Stone::Black) >= 6 {
            return Err(PlacementError::Overline);
        }
        if patterns::has_exact_five(&self.board, row, col) {
            return Ok(true);
        }
        if patterns::open_three_count(&self.board, row, col) >= 2 {
            return Err(PlacementError::DoubleThree);
        }
        if patterns::four_count(&self.board, row, col) >= 2 {
            return Err(PlacementError::DoubleFour);
        }
        Ok(false)
    }
}
