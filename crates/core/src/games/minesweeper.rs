//! Minesweeper board and a knowledge-based player.
//!
//! The player keeps a list of [`Sentence`]s, each saying "exactly `count`
//! of these cells are mines", and derives new ones until nothing changes.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{AiError, Result};

/// `(row, column)`.
pub type Cell = (usize, usize);

fn neighbours(height: usize, width: usize, (r, c): Cell) -> impl Iterator<Item = Cell> {
    let rows = r.saturating_sub(1)..(r + 2).min(height);
    rows.flat_map(move |i| {
        (c.saturating_sub(1)..(c + 2).min(width)).map(move |j| (i, j))
    })
    .filter(move |&cell| cell != (r, c))
}

/// A board with hidden mines.
#[derive(Debug, Clone, PartialEq)]
pub struct Minesweeper {
    height: usize,
    width: usize,
    mines: BTreeSet<Cell>,
}

impl Minesweeper {
    /// Place `mines` mines uniformly at random.
    ///
    /// # Errors
    /// [`AiError::InvalidParameter`] for an empty board or more mines than cells.
    pub fn new<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> Result<Self> {
        check_dimensions(height, width)?;
        let cells = height * width;
        if mines > cells {
            return Err(AiError::InvalidParameter(format!(
                "{} mines do not fit on a {}x{} board",
                mines, height, width
            )));
        }
        let mines = rand::seq::index::sample(rng, cells, mines)
            .into_iter()
            .map(|i| (i / width, i % width))
            .collect();
        Ok(Self {
            height,
            width,
            mines,
        })
    }

    /// A board with mines at exactly the given cells.
    pub fn from_mines<I: IntoIterator<Item = Cell>>(
        height: usize,
        width: usize,
        mines: I,
    ) -> Result<Self> {
        check_dimensions(height, width)?;
        let mines: BTreeSet<Cell> = mines.into_iter().collect();
        if let Some(&(r, c)) = mines.iter().find(|&&(r, c)| r >= height || c >= width) {
            return Err(AiError::InvalidParameter(format!(
                "mine ({}, {}) is off the {}x{} board",
                r, c, height, width
            )));
        }
        Ok(Self {
            height,
            width,
            mines,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn mines(&self) -> &BTreeSet<Cell> {
        &self.mines
    }

    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines.contains(&cell)
    }

    /// Mines in the up-to-eight cells around `cell`.
    pub fn nearby_mines(&self, cell: Cell) -> usize {
        neighbours(self.height, self.width, cell)
            .filter(|n| self.is_mine(*n))
            .count()
    }

    /// True once `flags` marks exactly the mines.
    pub fn won(&self, flags: &BTreeSet<Cell>) -> bool {
        *flags == self.mines
    }
}

fn check_dimensions(height: usize, width: usize) -> Result<()> {
    if height == 0 || width == 0 {
        return Err(AiError::InvalidParameter(format!(
            "board must have at least one cell, got {}x{}",
            height, width
        )));
    }
    Ok(())
}

/// "Exactly `count` of `cells` are mines."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    cells: BTreeSet<Cell>,
    count: usize,
}

impl Sentence {
    pub fn new<I: IntoIterator<Item = Cell>>(cells: I, count: usize) -> Self {
        Self {
            cells: cells.into_iter().collect(),
            count,
        }
    }

    pub fn cells(&self) -> &BTreeSet<Cell> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn known_mines(&self) -> BTreeSet<Cell> {
        if self.count > 0 && self.count == self.cells.len() {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    pub fn known_safes(&self) -> BTreeSet<Cell> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    pub fn mark_mine(&mut self, cell: Cell) {
        if self.cells.remove(&cell) {
            self.count = self.count.saturating_sub(1);
        }
    }

    pub fn mark_safe(&mut self, cell: Cell) {
        self.cells.remove(&cell);
    }

    fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MinesweeperAi {
    height: usize,
    width: usize,
    moves_made: BTreeSet<Cell>,
    mines: BTreeSet<Cell>,
    safes: BTreeSet<Cell>,
    knowledge: Vec<Sentence>,
}

impl MinesweeperAi {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            moves_made: BTreeSet::new(),
            mines: BTreeSet::new(),
            safes: BTreeSet::new(),
            knowledge: Vec::new(),
        }
    }

    pub fn moves_made(&self) -> &BTreeSet<Cell> {
        &self.moves_made
    }

    pub fn mines(&self) -> &BTreeSet<Cell> {
        &self.mines
    }

    pub fn safes(&self) -> &BTreeSet<Cell> {
        &self.safes
    }

    pub fn knowledge(&self) -> &[Sentence] {
        &self.knowledge
    }

    pub fn mark_mine(&mut self, cell: Cell) {
        self.mines.insert(cell);
        for sentence in &mut self.knowledge {
            sentence.mark_mine(cell);
        }
    }

    pub fn mark_safe(&mut self, cell: Cell) {
        self.safes.insert(cell);
        for sentence in &mut self.knowledge {
            sentence.mark_safe(cell);
        }
    }

    /// Record that `cell` was revealed safely with `count` neighbouring mines,
    /// then draw every conclusion that follows.
    ///
    /// # Errors
    /// [`AiError::InvalidParameter`] if `cell` is off the board;
    /// [`AiError::EvidenceContradiction`] if `count` cannot be reconciled
    /// with what is already known. A rejected observation leaves the
    /// player's state unchanged.
    pub fn add_knowledge(&mut self, cell: Cell, count: usize) -> Result<()> {
        if cell.0 >= self.height || cell.1 >= self.width {
            return Err(AiError::InvalidParameter(format!(
                "cell ({}, {}) is off the {}x{} board",
                cell.0, cell.1, self.height, self.width
            )));
        }
        if self.mines.contains(&cell) {
            return Err(AiError::EvidenceContradiction(format!(
                "({}, {}) was deduced to be a mine",
                cell.0, cell.1
            )));
        }

        let mut unknown = BTreeSet::new();
        let mut remaining = count;
        for n in neighbours(self.height, self.width, cell) {
            if self.mines.contains(&n) {
                remaining = remaining.checked_sub(1).ok_or_else(|| {
                    contradiction(cell, "fewer mines reported than already known")
                })?;
            } else if !self.safes.contains(&n) {
                unknown.insert(n);
            }
        }
        if remaining > unknown.len() {
            return Err(contradiction(cell, "more mines reported than cells left"));
        }

        let before = self.clone();
        self.moves_made.insert(cell);
        self.mark_safe(cell);
        if !unknown.is_empty() {
            self.knowledge.push(Sentence::new(unknown, remaining));
        }

        self.infer().map_err(|e| {
            *self = before;
            e
        })
    }

    /// Apply known mines and safes, drop empty sentences and add subset
    /// differences until a fixed point.
    fn infer(&mut self) -> Result<()> {
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;

            let mines: BTreeSet<Cell> = self
                .knowledge
                .iter()
                .flat_map(|s| s.known_mines())
                .filter(|c| !self.mines.contains(c))
                .collect();
            let safes: BTreeSet<Cell> = self
                .knowledge
                .iter()
                .flat_map(|s| s.known_safes())
                .filter(|c| !self.safes.contains(c))
                .collect();
            if let Some(&c) = mines.intersection(&safes).next() {
                return Err(contradiction(c, "deduced to be both a mine and safe"));
            }
            for &c in &mines {
                self.mark_mine(c);
                changed = true;
            }
            for &c in &safes {
                self.mark_safe(c);
                changed = true;
            }

            if let Some(s) = self.knowledge.iter().find(|s| s.count > s.cells.len()) {
                return Err(AiError::EvidenceContradiction(format!(
                    "{} mines left among {} undetermined cells",
                    s.count,
                    s.cells.len()
                )));
            }
            self.knowledge.retain(|s| !s.is_empty());
            let mut unique = Vec::with_capacity(self.knowledge.len());
            for s in self.knowledge.drain(..) {
                if !unique.contains(&s) {
                    unique.push(s);
                }
            }
            self.knowledge = unique;

            let mut derived = Vec::new();
            for a in &self.knowledge {
                for b in &self.knowledge {
                    if a.cells.len() >= b.cells.len() || !a.cells.is_subset(&b.cells) {
                        continue;
                    }
                    let count = b.count.checked_sub(a.count).ok_or_else(|| {
                        AiError::EvidenceContradiction(format!(
                            "a subset holds {} mines but its superset only {}",
                            a.count, b.count
                        ))
                    })?;
                    let s = Sentence::new(b.cells.difference(&a.cells).copied(), count);
                    if !self.knowledge.contains(&s) && !derived.contains(&s) {
                        derived.push(s);
                    }
                }
            }
            if !derived.is_empty() {
                self.knowledge.extend(derived);
                changed = true;
            }

            if !changed {
                break;
            }
        }
        log::trace!(
            "inference settled after {} rounds: {} sentences, {} mines, {} safes",
            rounds,
            self.knowledge.len(),
            self.mines.len(),
            self.safes.len()
        );
        Ok(())
    }

    /// A cell known to be safe that has not been played yet.
    pub fn make_safe_move(&self) -> Option<Cell> {
        self.safes.difference(&self.moves_made).next().copied()
    }

    /// Any unplayed cell not known to be a mine.
    pub fn make_random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Cell> {
        let candidates: Vec<Cell> = (0..self.height)
            .flat_map(|r| (0..self.width).map(move |c| (r, c)))
            .filter(|c| !self.moves_made.contains(c) && !self.mines.contains(c))
            .collect();
        candidates.choose(rng).copied()
    }
}

fn contradiction(cell: Cell, what: &str) -> AiError {
    AiError::EvidenceContradiction(format!("at ({}, {}): {}", cell.0, cell.1, what))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// Every mine flagged or every safe cell revealed.
    Won { moves: usize },
    /// Revealed a mine.
    Lost { moves: usize, mine: Cell },
}

/// Let a fresh [`MinesweeperAi`] play `board` to the end, preferring safe
/// moves and guessing only when it has to.
pub fn play<R: Rng + ?Sized>(board: &Minesweeper, rng: &mut R) -> Result<GameOutcome> {
    let mut ai = MinesweeperAi::new(board.height(), board.width());
    let safe_cells = board.height() * board.width() - board.mines().len();
    let mut moves = 0;

    loop {
        if moves > 0 && (board.won(ai.mines()) || ai.moves_made().len() == safe_cells) {
            log::info!("won after {} moves", moves);
            return Ok(GameOutcome::Won { moves });
        }

        let cell = match ai.make_safe_move() {
            Some(cell) => cell,
            None => match ai.make_random_move(rng) {
                Some(cell) => {
                    log::debug!("no safe move known, guessing {:?}", cell);
                    cell
                }
                None => return Ok(GameOutcome::Won { moves }),
            },
        };
        moves += 1;

        if board.is_mine(cell) {
            log::info!("hit a mine at {:?} after {} moves", cell, moves);
            return Ok(GameOutcome::Lost { moves, mine: cell });
        }
        ai.add_knowledge(cell, board.nearby_mines(cell))?;
    }
}
