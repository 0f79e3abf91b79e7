/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, ops::Deref, str::FromStr};

use anyhow::{bail, Context, Result};
use chessie::{Color, Game, Move};

use crate::{DrawReason, Rules};

/// A game of chess that can take back its moves.
///
/// [`Game`] is a copy-make type, so every applied move pushes the previous [`Game`] onto an undo stack.
/// That same stack doubles as the game history used to detect repetitions.
///
/// The legal moves of the current position are generated once per position and kept alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChessPosition {
    /// The current state of the board.
    game: Game,

    /// Legal moves in `game`, in generation order.
    legal: Vec<Move>,

    /// Every position before the current one, oldest first, with its legal moves.
    history: Vec<(Game, Vec<Move>)>,
}

impl ChessPosition {
    /// Wraps `game` with an empty history.
    #[inline(always)]
    pub fn new(game: Game) -> Self {
        Self {
            game,
            legal: generate(&game),
            history: Vec::with_capacity(64),
        }
    }

    /// Creates a new [`ChessPosition`] from the provided FEN string.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let game = Game::from_fen(fen).with_context(|| format!("Invalid FEN {fen:?}"))?;
        Ok(Self::new(game))
    }

    /// Parses `mv_str` in UCI notation (`e2e4`, `e7e8q`) and plays it.
    pub fn make_move_uci(&mut self, mv_str: &str) -> Result<()> {
        let mv = Move::from_uci(&self.game, mv_str)
            .with_context(|| format!("Failed to parse move {mv_str:?}"))?;
        self.apply_move(mv)
    }

    /// The current state of the board.
    #[inline(always)]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Number of moves that can currently be taken back.
    #[inline(always)]
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// Returns `true` if the current position has occurred at least twice before.
    fn is_threefold_repetition(&self) -> bool {
        let key = self.game.key();

        // Captures and pawn moves are irreversible, so nothing before the last one can repeat.
        let reversible = self.game.halfmove().min(self.history.len());

        self.history
            .iter()
            .rev()
            .take(reversible)
            .filter(|(prev, _)| prev.key() == key)
            .count()
            >= 2
    }
}

impl Rules for ChessPosition {
    type Move = Move;
    type Side = Color;

    #[inline(always)]
    fn side_to_move(&self) -> Color {
        self.game.side_to_move()
    }

    #[inline(always)]
    fn legal_moves(&self) -> Vec<Move> {
        self.legal.clone()
    }

    fn apply_move(&mut self, mv: Move) -> Result<()> {
        if !self.legal.contains(&mv) {
            bail!("{mv} is not a legal move in {}", self.game.to_fen());
        }

        let prev = self.game;
        self.game.make_move(mv);
        let legal = std::mem::replace(&mut self.legal, generate(&self.game));
        self.history.push((prev, legal));
        Ok(())
    }

    fn undo_move(&mut self) -> Result<()> {
        let Some((prev, legal)) = self.history.pop() else {
            bail!("No moves to undo in {}", self.game.to_fen());
        };

        self.game = prev;
        self.legal = legal;
        Ok(())
    }

    #[inline(always)]
    fn is_checkmate(&self) -> bool {
        self.legal.is_empty() && self.game.is_in_check()
    }

    fn draw_reason(&self) -> Option<DrawReason> {
        // Checkmate takes precedence over every draw condition.
        if self.legal.is_empty() {
            return (!self.game.is_in_check()).then_some(DrawReason::Stalemate);
        }

        if self.game.can_draw_by_fifty() {
            Some(DrawReason::FiftyMoves)
        } else if self.game.can_draw_by_insufficient_material() {
            Some(DrawReason::InsufficientMaterial)
        } else if self.is_threefold_repetition() {
            Some(DrawReason::Repetition)
        } else {
            None
        }
    }
}

#[inline(always)]
fn generate(game: &Game) -> Vec<Move> {
    game.get_legal_moves().into_iter().collect()
}

impl Deref for ChessPosition {
    type Target = Game;
    /// A [`ChessPosition`] immutably dereferences to its current [`Game`].
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.game
    }
}

impl From<Game> for ChessPosition {
    #[inline(always)]
    fn from(game: Game) -> Self {
        Self::new(game)
    }
}

impl FromStr for ChessPosition {
    type Err = anyhow::Error;
    /// Wrapper for [`ChessPosition::from_fen`]
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl Default for ChessPosition {
    /// Standard starting position for Chess.
    #[inline(always)]
    fn default() -> Self {
        Self::new(Game::default())
    }
}

impl fmt::Display for ChessPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.game)
    }
}
