//! Line scanning helpers used to classify a freshly placed stone.
//!
//! Every check looks along the four axes through the new stone. Pattern checks
//! work on a 9-cell window centred on it, where off-board cells read the same as
//! an opposing stone.

use super::board::{Board, Stone};

/// Row/column steps for horizontal, vertical and the two diagonals.
pub(crate) const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

const WINDOW_LEN: usize = 9;
const CENTER: usize = 4;

const OWN: u8 = b'x';
const EMPTY: u8 = b'.';
const BLOCKED: u8 = b'o';

/// Unobstructed threes, including both broken shapes.
const OPEN_THREES: [&[u8]; 3] = [b".xxx.", b".xx.x.", b".x.xx."];

/// Cells along one axis, seen from the mover's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window([u8; WINDOW_LEN]);

impl Window {
    /// Sample the window through `(row, col)` along `(dr, dc)`.
    pub(crate) fn sample(board: &Board, row: i32, col: i32, (dr, dc): (i32, i32), own: Stone) -> Self {
        let mut cells = [BLOCKED; WINDOW_LEN];
        for (slot, offset) in cells.iter_mut().zip(-(CENTER as i32)..=CENTER as i32) {
            *slot = match board.cell(row + offset * dr, col + offset * dc) {
                Some(None) => EMPTY,
                Some(Some(stone)) if stone == own => OWN,
                Some(Some(_)) | None => BLOCKED,
            };
        }
        Self(cells)
    }

    /// Start offsets of every `len`-cell sub-window that covers the centre.
    fn spans(len: usize) -> impl Iterator<Item = usize> {
        (0..=WINDOW_LEN - len).filter(move |start| *start <= CENTER && CENTER < start + len)
    }

    fn matches(&self, pattern: &[u8]) -> bool {
        Self::spans(pattern.len()).any(|start| &self.0[start..start + pattern.len()] == pattern)
    }

    pub(crate) fn has_open_three(&self) -> bool {
        OPEN_THREES.iter().any(|pattern| self.matches(pattern))
    }

    /// Four in a row with at least one open end next to it.
    pub(crate) fn has_straight_four(&self) -> bool {
        Self::spans(4).any(|start| {
            let run = &self.0[start..start + 4];
            let before = start.checked_sub(1).and_then(|i| self.0.get(i));
            let after = self.0.get(start + 4);
            run.iter().all(|cell| *cell == OWN)
                && (before == Some(&EMPTY) || after == Some(&EMPTY))
        })
    }

    /// Four own stones somewhere inside a 5-cell span holding no opposing stone.
    pub(crate) fn has_broken_four(&self) -> bool {
        Self::spans(5).any(|start| {
            let span = &self.0[start..start + 5];
            !span.contains(&BLOCKED) && span.iter().filter(|cell| **cell == OWN).count() == 4
        })
    }

    pub(crate) fn has_four(&self) -> bool {
        self.has_straight_four() || self.has_broken_four()
    }
}

/// Length of the unbroken run of `stone` through `(row, col)` along one axis.
pub(crate) fn run_length(board: &Board, row: i32, col: i32, (dr, dc): (i32, i32), stone: Stone) -> usize {
    let walk = |dr: i32, dc: i32| {
        (1..)
            .take_while(|step| board.cell(row + step * dr, col + step * dc) == Some(Some(stone)))
            .count()
    };
    1 + walk(dr, dc) + walk(-dr, -dc)
}

/// Longest run of `stone` through `(row, col)` over all four axes.
pub(crate) fn longest_run(board: &Board, row: i32, col: i32, stone: Stone) -> usize {
    DIRECTIONS
        .iter()
        .map(|direction| run_length(board, row, col, *direction, stone))
        .max()
        .unwrap_or(1)
}

/// Whether any axis through `(row, col)` holds exactly five black stones.
pub(crate) fn has_exact_five(board: &Board, row: i32, col: i32) -> bool {
    DIRECTIONS
        .iter()
        .any(|direction| run_length(board, row, col, *direction, Stone::Black) == 5)
}

/// Number of axes on which the stone at `(row, col)` forms an open three.
pub(crate) fn open_three_count(board: &Board, row: i32, col: i32) -> usize {
    DIRECTIONS
        .iter()
        .filter(|direction| Window::sample(board, row, col, **direction, Stone::Black).has_open_three())
        .count()
}

/// Number of axes on which the stone at `(row, col)` forms a four.
pub(crate) fn four_count(board: &Board, row: i32, col: i32) -> usize {
    DIRECTIONS
        .iter()
        .filter(|direction| Window::sample(board, row, col, **direction, Stone::Black).has_four())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(cells: &[u8; WINDOW_LEN]) -> Window {
        Window(*cells)
    }

    #[test]
    fn open_three_shapes() {
        assert!(window(b"o..xxx..o").has_open_three());
        assert!(window(b"o..xx.x.o").has_open_three());
        assert!(window(b"o.x.xx..o").has_open_three());
        // closed on one side
        assert!(!window(b"oooxxx..o").has_open_three());
        assert!(!window(b"o..xxxo..").has_open_three());
        // pattern far from the centre does not count
        assert!(!window(b"....x....").has_open_three());
    }

    #[test]
    fn straight_four_needs_an_open_end() {
        assert!(window(b"...xxxx..").has_straight_four());
        assert!(window(b"..oxxxx..").has_straight_four());
        assert!(!window(b"..oxxxxo.").has_straight_four());
        assert!(!window(b"..oxxxxo.").has_broken_four());
    }

    #[test]
    fn broken_four_ignores_gap_position() {
        assert!(window(b"..xxx.x..").has_broken_four());
        assert!(window(b"..x.xxx..").has_broken_four());
        assert!(!window(b"xxoxx.x..").has_broken_four());
    }

    #[test]
    fn off_board_reads_as_blocked() {
        let mut board = Board::new();
        board.set(0, 1, Some(Stone::Black));
        board.set(0, 2, Some(Stone::Black));
        board.set(0, 0, Some(Stone::Black));

        let sample = Window::sample(&board, 0, 0, (0, 1), Stone::Black);
        assert_eq!(&sample.0, b"ooooxxx..");
        assert!(!sample.has_open_three());
    }

    #[test]
    fn run_length_counts_both_sides() {
        let mut board = Board::new();
        for col in 3..8 {
            board.set(7, col, Some(Stone::White));
        }
        assert_eq!(run_length(&board, 7, 5, (0, 1), Stone::White), 5);
        assert_eq!(run_length(&board, 7, 5, (1, 0), Stone::White), 1);
        assert_eq!(longest_run(&board, 7, 3, Stone::White), 5);
    }
}
