// Search and knowledge-based players for small board games.

pub mod minesweeper;
pub mod tictactoe;

pub use minesweeper::{play, Cell, GameOutcome, Minesweeper, MinesweeperAi, Sentence};
pub use tictactoe::{Action, Board, Player};
