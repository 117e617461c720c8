use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of cells on the board
pub const CELL_COUNT: usize = 9;

/// Winning triples in priority order: rows, columns, diagonals
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A player's symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The mark that moves first in every game
    pub const FIRST: Mark = Mark::X;

    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// Mark assigned to the participant at `index` in join order
    pub fn for_seat(index: usize) -> Option<Self> {
        match index {
            0 => Some(Mark::X),
            1 => Some(Mark::O),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a placement could not be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    OutOfRange(usize),
    Occupied(usize),
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::OutOfRange(i) => write!(f, "cell {} is out of range", i),
            PlacementError::Occupied(i) => write!(f, "cell {} is already occupied", i),
        }
    }
}

/// 3x3 board, cells indexed row-major from 0 to 8.
///
/// On the wire a board is an array of nine strings: `""` for an empty cell,
/// `"X"` or `"O"` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    cells: [Option<Mark>; CELL_COUNT],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Option<Mark>; CELL_COUNT]) -> Self {
        Self { cells }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Mark> {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Set an empty cell to `mark`
    pub fn place(&mut self, index: usize, mark: Mark) -> Result<(), PlacementError> {
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(PlacementError::OutOfRange(index))?;
        if cell.is_some() {
            return Err(PlacementError::Occupied(index));
        }
        *cell = Some(mark);
        Ok(())
    }

    /// Find the single placement that turns `previous` into `self`.
    ///
    /// Returns `None` unless exactly one previously empty cell became filled
    /// and every other cell is unchanged.
    pub fn placement_from(&self, previous: &Board) -> Option<(usize, Mark)> {
        let mut placement = None;
        for (index, (before, after)) in previous.cells.iter().zip(self.cells.iter()).enumerate() {
            match (before, after) {
                (a, b) if a == b => {}
                (None, Some(mark)) if placement.is_none() => placement = Some((index, *mark)),
                _ => return None,
            }
        }
        placement
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(CELL_COUNT))?;
        for cell in &self.cells {
            seq.serialize_element(cell.map_or("", Mark::as_str))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BoardVisitor;

        impl<'de> Visitor<'de> for BoardVisitor {
            type Value = Board;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of 9 cells (\"\", \"X\" or \"O\")")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Board, A::Error> {
                let mut cells = [None; CELL_COUNT];
                for (index, cell) in cells.iter_mut().enumerate() {
                    let raw: Option<String> = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(index, &self))?;
                    *cell = match raw.as_deref() {
                        None | Some("") => None,
                        Some("X") => Some(Mark::X),
                        Some("O") => Some(Mark::O),
                        Some(other) => {
                            return Err(de::Error::invalid_value(
                                de::Unexpected::Str(other),
                                &"\"\", \"X\" or \"O\"",
                            ));
                        }
                    };
                }
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(CELL_COUNT + 1, &self));
                }
                Ok(Board { cells })
            }
        }

        deserializer.deserialize_seq(BoardVisitor)
    }
}

/// A completed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinningLine {
    pub mark: Mark,
    pub cells: [usize; 3],
}

/// Terminal result of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win(WinningLine),
    Tie,
}

/// Return the first completed line in [`LINES`] order, if any.
#[inline]
pub fn check_winner(board: &Board) -> Option<WinningLine> {
    LINES.iter().find_map(|&[a, b, c]| {
        let mark = board.get(a)?;
        (board.get(b) == Some(mark) && board.get(c) == Some(mark)).then_some(WinningLine {
            mark,
            cells: [a, b, c],
        })
    })
}

/// Like [`check_winner`], but a full board without a line is reported as a tie.
pub fn evaluate(board: &Board) -> Option<Outcome> {
    match check_winner(board) {
        Some(line) => Some(Outcome::Win(line)),
        None if board.is_full() => Some(Outcome::Tie),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(layout: &str) -> Board {
        let mut cells = [None; CELL_COUNT];
        for (cell, ch) in cells.iter_mut().zip(layout.chars()) {
            *cell = match ch {
                'X' => Some(Mark::X),
                'O' => Some(Mark::O),
                _ => None,
            };
        }
        Board::from_cells(cells)
    }

    #[test]
    fn empty_board_has_no_result() {
        assert_eq!(check_winner(&Board::empty()), None);
        assert_eq!(evaluate(&Board::empty()), None);
    }

    #[test]
    fn every_line_is_detected() {
        for line in LINES {
            let mut b = Board::empty();
            for &i in &line {
                b.place(i, Mark::O).unwrap();
            }
            let found = check_winner(&b).expect("line should win");
            assert_eq!(found.mark, Mark::O);
            assert_eq!(found.cells, line);
        }
    }

    #[test]
    fn first_line_in_priority_order_wins() {
        // top row and left column both complete
        let b = board("XXXX..X..");
        let found = check_winner(&b).unwrap();
        assert_eq!(found.cells, [0, 1, 2]);

        // middle column and anti-diagonal both complete
        let b = board("OXX.X.XXO");
        let found = check_winner(&b).unwrap();
        assert_eq!(found.mark, Mark::X);
        assert_eq!(found.cells, [1, 4, 7]);
    }

    #[test]
    fn mixed_line_is_not_a_win() {
        assert_eq!(check_winner(&board("XXO......")), None);
    }

    #[test]
    fn full_board_without_line_is_tie() {
        let b = board("XOXXOOOXX");
        assert_eq!(check_winner(&b), None);
        assert_eq!(evaluate(&b), Some(Outcome::Tie));
    }

    #[test]
    fn full_board_with_line_is_win_not_tie() {
        let b = board("XXXOOXOXO");
        assert!(matches!(evaluate(&b), Some(Outcome::Win(l)) if l.mark == Mark::X));
    }

    #[test]
    fn place_rejects_occupied_and_out_of_range() {
        let mut b = Board::empty();
        b.place(4, Mark::X).unwrap();
        assert_eq!(b.place(4, Mark::O), Err(PlacementError::Occupied(4)));
        assert_eq!(b.place(9, Mark::O), Err(PlacementError::OutOfRange(9)));
        assert_eq!(b.get(4), Some(Mark::X));
    }

    #[test]
    fn placement_from_finds_single_new_cell() {
        let before = board("X........");
        let after = board("X...O....");
        assert_eq!(after.placement_from(&before), Some((4, Mark::O)));
    }

    #[test]
    fn placement_from_rejects_other_changes() {
        let before = board("X........");
        assert_eq!(before.placement_from(&before), None);
        assert_eq!(board("X...OO...").placement_from(&before), None);
        assert_eq!(board("O........").placement_from(&before), None);
        assert_eq!(board("....O....").placement_from(&before), None);
    }

    #[test]
    fn mark_opponent_and_seats() {
        assert_eq!(Mark::X.opponent(), Mark::O);
        assert_eq!(Mark::O.opponent(), Mark::X);
        assert_eq!(Mark::for_seat(0), Some(Mark::X));
        assert_eq!(Mark::for_seat(1), Some(Mark::O));
        assert_eq!(Mark::for_seat(2), None);
    }

    #[test]
    fn board_serialization() {
        let json = serde_json::to_string(&board("X...O....")).unwrap();
        assert_eq!(json, r#"["X","","","","O","","","",""]"#);
    }

    #[test]
    fn board_deserialization_accepts_null_cells() {
        let b: Board =
            serde_json::from_str(r#"["X",null,"","","O","","","",""]"#).unwrap();
        assert_eq!(b, board("X...O...."));
    }

    #[test]
    fn board_deserialization_rejects_bad_input() {
        assert!(serde_json::from_str::<Board>(r#"["X","O"]"#).is_err());
        assert!(serde_json::from_str::<Board>(r#"["","","","","","","","","",""]"#).is_err());
        assert!(serde_json::from_str::<Board>(r#"["Z","","","","","","","",""]"#).is_err());
    }
}
