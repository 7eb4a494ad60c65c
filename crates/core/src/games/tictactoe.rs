//! Tic-tac-toe with an optimal minimax player.
//!
//! X always moves first. Scores are from X's point of view: `1` when X
//! wins, `-1` when O wins, `0` otherwise.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{AiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    X,
    O,
}

impl Player {
    pub fn other(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::X => write!(f, "X"),
            Player::O => write!(f, "O"),
        }
    }
}

/// `(row, column)`, both in `0..3`.
pub type Action = (usize, usize);

/// A 3x3 grid; `None` is an empty square.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Option<Player>; 3]; 3],
}

impl Board {
    pub fn get(&self, row: usize, col: usize) -> Option<Player> {
        self.cells[row][col]
    }

    fn empties(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_none()).count()
    }
}

/// Parses nine squares in row-major order from `X`, `O` and `.` (or `_`).
/// Whitespace and `|` or `/` separators are skipped.
impl FromStr for Board {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self> {
        let squares: Vec<char> = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '|' && *c != '/')
            .collect();
        if squares.len() != 9 {
            return Err(AiError::InvalidParameter(format!(
                "board needs 9 squares, got {}",
                squares.len()
            )));
        }

        let mut board = Board::default();
        for (i, c) in squares.into_iter().enumerate() {
            board.cells[i / 3][i % 3] = match c.to_ascii_uppercase() {
                'X' => Some(Player::X),
                'O' => Some(Player::O),
                '.' | '_' => None,
                other => {
                    return Err(AiError::InvalidParameter(format!(
                        "unexpected square '{}'",
                        other
                    )))
                }
            };
        }

        let xs = board.cells.iter().flatten().filter(|c| **c == Some(Player::X)).count();
        let os = board.cells.iter().flatten().filter(|c| **c == Some(Player::O)).count();
        if xs != os && xs != os + 1 {
            return Err(AiError::InvalidParameter(format!(
                "unreachable position: {} X and {} O",
                xs, os
            )));
        }
        Ok(board)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for cell in row {
                match cell {
                    Some(p) => write!(f, "{}", p)?,
                    None => write!(f, ".")?,
                }
            }
        }
        Ok(())
    }
}

pub fn initial_state() -> Board {
    Board::default()
}

/// Whose turn it is: X when an odd number of squares is empty.
pub fn player(board: &Board) -> Player {
    if board.empties() % 2 == 1 {
        Player::X
    } else {
        Player::O
    }
}

/// Every empty square.
pub fn actions(board: &Board) -> BTreeSet<Action> {
    (0..3)
        .flat_map(|r| (0..3).map(move |c| (r, c)))
        .filter(|&(r, c)| board.cells[r][c].is_none())
        .collect()
}

/// The board after the current player takes `action`. `board` is untouched.
///
/// # Errors
/// [`AiError::InvalidAction`] if the square is off the board or taken.
pub fn result(board: &Board, action: Action) -> Result<Board> {
    let (r, c) = action;
    if r >= 3 || c >= 3 {
        return Err(AiError::InvalidAction(format!(
            "({}, {}) is off the board",
            r, c
        )));
    }
    if let Some(p) = board.cells[r][c] {
        return Err(AiError::InvalidAction(format!(
            "({}, {}) is already taken by {}",
            r, c, p
        )));
    }
    let mut next = *board;
    next.cells[r][c] = Some(player(board));
    Ok(next)
}

const LINES: [[Action; 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// The player holding three in a row, if any.
pub fn winner(board: &Board) -> Option<Player> {
    let at = |(r, c): Action| board.cells[r][c];
    LINES.iter().find_map(|&[a, b, c]| match at(a) {
        Some(p) if at(b) == Some(p) && at(c) == Some(p) => Some(p),
        _ => None,
    })
}

pub fn terminal(board: &Board) -> bool {
    winner(board).is_some() || board.empties() == 0
}

pub fn utility(board: &Board) -> i32 {
    match winner(board) {
        Some(Player::X) => 1,
        Some(Player::O) => -1,
        None => 0,
    }
}

/// Optimal move for the player to move, or `None` if the game is over.
///
/// Among equally good moves the first in row-major order is chosen.
pub fn minimax(board: &Board) -> Option<Action> {
    if terminal(board) {
        return None;
    }
    let maximizing = player(board) == Player::X;
    let mut alpha = i32::MIN;
    let mut beta = i32::MAX;
    let mut best: Option<(Action, i32)> = None;

    for action in actions(board) {
        let next = result(board, action).ok()?;
        let score = search(&next, alpha, beta);
        let better = match best {
            None => true,
            Some((_, v)) if maximizing => score > v,
            Some((_, v)) => score < v,
        };
        if better {
            best = Some((action, score));
        }
        if maximizing {
            alpha = alpha.max(score);
        } else {
            beta = beta.min(score);
        }
    }

    best.map(|(action, score)| {
        log::debug!("minimax picks {:?} with value {}", action, score);
        action
    })
}

/// Game value under optimal play from both sides.
pub fn value(board: &Board) -> i32 {
    search(board, i32::MIN, i32::MAX)
}

fn search(board: &Board, mut alpha: i32, mut beta: i32) -> i32 {
    if terminal(board) {
        return utility(board);
    }

    if player(board) == Player::X {
        let mut v = i32::MIN;
        for action in actions(board) {
            let Ok(next) = result(board, action) else { continue };
            v = v.max(search(&next, alpha, beta));
            alpha = alpha.max(v);
            if beta <= alpha {
                break;
            }
        }
        v
    } else {
        let mut v = i32::MAX;
        for action in actions(board) {
            let Ok(next) = result(board, action) else { continue };
            v = v.min(search(&next, alpha, beta));
            beta = beta.min(v);
            if beta <= alpha {
                break;
            }
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    #[test]
    fn test_player_alternates() {
        assert_eq!(player(&initial_state()), Player::X);
        assert_eq!(player(&board("X........")), Player::O);
        assert_eq!(player(&board("XO.......")), Player::X);
    }

    #[test]
    fn test_actions_are_empty_squares() {
        assert_eq!(actions(&initial_state()).len(), 9);
        let a = actions(&board("XO......."));
        assert_eq!(a.len(), 7);
        assert!(!a.contains(&(0, 0)));
        assert!(!a.contains(&(0, 1)));
        assert!(a.contains(&(0, 2)));
    }

    #[test]
    fn test_result_leaves_input_untouched() {
        let start = initial_state();
        let next = result(&start, (1, 1)).unwrap();
        assert_eq!(next.get(1, 1), Some(Player::X));
        assert_eq!(start, initial_state());

        let after = result(&board("XO......."), (0, 2)).unwrap();
        assert_eq!(after.to_string(), "XOX\n...\n...");
    }

    #[test]
    fn test_result_rejects_invalid_actions() {
        assert!(matches!(
            result(&initial_state(), (3, 3)),
            Err(AiError::InvalidAction(_))
        ));
        assert!(matches!(
            result(&board("....X...."), (1, 1)),
            Err(AiError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_winner_lines() {
        assert_eq!(winner(&initial_state()), None);
        assert_eq!(winner(&board(".X..O....")), None);
        assert_eq!(winner(&board("XOO|XXO|X..")), Some(Player::X));
        assert_eq!(winner(&board("XXX|OXO|O..")), Some(Player::X));
        assert_eq!(winner(&board("XX.|OXO|O.X")), Some(Player::X));
        assert_eq!(winner(&board(".XO|XOX|O..")), Some(Player::O));
        assert_eq!(winner(&board("XOX|OOX|XXO")), None);
    }

    #[test]
    fn test_terminal_and_utility() {
        assert!(!terminal(&initial_state()));
        assert!(!terminal(&board(".X..O....")));
        assert!(terminal(&board("XOX|OOX|XXO")));
        assert!(terminal(&board("XXX|OXO|O..")));

        assert_eq!(utility(&board("XXX|OXO|O..")), 1);
        assert_eq!(utility(&board(".XO|XOX|O..")), -1);
        assert_eq!(utility(&board("XOX|OOX|XXO")), 0);
    }

    #[test]
    fn test_minimax_on_terminal_board() {
        assert_eq!(minimax(&board("XOX|OOX|XXO")), None);
        assert_eq!(minimax(&board("XXX|OXO|O..")), None);
    }

    #[test]
    fn test_minimax_takes_the_win() {
        // X to move, (0, 2) completes the top row.
        assert_eq!(minimax(&board("XX.|OO.|...")), Some((0, 2)));
    }

    #[test]
    fn test_minimax_blocks() {
        // O to move, X threatens the top row.
        assert_eq!(minimax(&board("XX.|.O.|...")), Some((0, 2)));
    }

    #[test]
    fn test_perfect_play_is_a_draw() {
        assert_eq!(value(&initial_state()), 0);

        let mut b = initial_state();
        while let Some(action) = minimax(&b) {
            b = result(&b, action).unwrap();
        }
        assert!(terminal(&b));
        assert_eq!(winner(&b), None);
    }

    #[test]
    fn test_parse_rejects_bad_boards() {
        assert!("XO".parse::<Board>().is_err());
        assert!("XXX......".parse::<Board>().is_err());
        assert!("XZ.......".parse::<Board>().is_err());
    }
}
