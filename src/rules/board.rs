use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Number of rows and columns on the board.
pub const BOARD_SIZE: usize = 15;
/// Number of cells on the board, also the length of a serialized snapshot.
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// Stone colors. Black always moves first and is the restricted side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stone {
    /// First player, subject to the overline / 3-3 / 4-4 restrictions.
    Black,
    /// Second player, wins on any line of five or more.
    White,
}

impl Stone {
    /// Color of the other player.
    pub fn opponent(self) -> Self {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    /// Integer code used by the persisted snapshot format.
    pub fn code(self) -> u8 {
        match self {
            Stone::Black => 1,
            Stone::White => 2,
        }
    }
}

/// Failure to encode or decode a persisted board snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not a JSON integer array: {0}")]
    /// The snapshot is not a JSON integer array.
    Malformed(#[from] serde_json::Error),
    #[error("snapshot has {0} cells, expected {CELL_COUNT}")]
    /// The array does not hold one code per cell.
    WrongLength(usize),
    #[error("snapshot cell {index} holds unknown code {code}")]
    /// A cell holds a code other than 0, 1 or 2.
    UnknownCode {
        /// Position in the array.
        index: usize,
        /// Offending value.
        code: u8,
    },
}

/// 15×15 grid of cells, `None` meaning empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Stone>; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Empty board.
    pub fn new() -> Self {
        Self {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Whether `(row, col)` lies on the board.
    pub fn in_bounds(row: i32, col: i32) -> bool {
        (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
    }

    /// Cell content, or `None` when the coordinates fall off the board.
    pub fn cell(&self, row: i32, col: i32) -> Option<Option<Stone>> {
        if !Self::in_bounds(row, col) {
            return None;
        }
        Some(self.cells[row as usize][col as usize])
    }

    /// Stone at an on-board position.
    pub fn stone_at(&self, row: usize, col: usize) -> Option<Stone> {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .flatten()
    }

    /// Caller guarantees the coordinates are in bounds.
    pub(crate) fn set(&mut self, row: usize, col: usize, value: Option<Stone>) {
        self.cells[row][col] = value;
    }

    /// Number of stones of `stone` currently on the board.
    pub fn count(&self, stone: Stone) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell == Some(stone))
            .count()
    }

    /// Row-major cell codes: 0 empty, 1 black, 2 white.
    pub fn codes(&self) -> Vec<u8> {
        self.cells
            .iter()
            .flatten()
            .map(|cell| cell.map_or(0, Stone::code))
            .collect()
    }

    /// Rebuild a board from row-major cell codes.
    pub fn from_codes(codes: &[u8]) -> Result<Self, SnapshotError> {
        if codes.len() != CELL_COUNT {
            return Err(SnapshotError::WrongLength(codes.len()));
        }

        let mut board = Self::new();
        for (index, code) in codes.iter().enumerate() {
            let value = match code {
                0 => None,
                1 => Some(Stone::Black),
                2 => Some(Stone::White),
                other => {
                    return Err(SnapshotError::UnknownCode {
                        index,
                        code: *other,
                    });
                }
            };
            board.set(index / BOARD_SIZE, index % BOARD_SIZE, value);
        }
        Ok(board)
    }

    /// Serialize into the persisted snapshot format (a JSON array of 225 integers).
    pub fn to_snapshot(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&self.codes())?)
    }

    /// Parse the persisted snapshot format.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, SnapshotError> {
        let codes: Vec<u8> = serde_json::from_str(snapshot)?;
        Self::from_codes(&codes)
    }
}
