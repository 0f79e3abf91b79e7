/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::Result;

/// Why a game ended in a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawReason {
    /// The side to move has no legal moves and is not in check.
    Stalemate,

    /// One hundred half-moves passed without a capture or pawn move.
    FiftyMoves,

    /// Neither side has enough material left to deliver mate.
    InsufficientMaterial,

    /// The same position occurred for the third time.
    Repetition,
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Stalemate => "stalemate",
            Self::FiftyMoves => "fifty-move rule",
            Self::InsufficientMaterial => "insufficient material",
            Self::Repetition => "threefold repetition",
        };

        write!(f, "{reason}")
    }
}

/// The way a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome<S> {
    /// `loser` is to move and has been checkmated.
    Checkmate { loser: S },

    /// The game is drawn.
    Draw(DrawReason),
}

/// The rules of a two-player game, as consumed by the search.
///
/// Implementors own the full game state. The search only ever changes that state through
/// [`Rules::apply_move`] and [`Rules::undo_move`], always in strict stack order.
pub trait Rules {
    /// A legal transition from one position to another.
    type Move: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync;

    /// One of the two players.
    type Side: Copy + Eq + fmt::Debug + Send + Sync;

    /// The player whose turn it is.
    fn side_to_move(&self) -> Self::Side;

    /// All moves legal in the current position, in a deterministic order.
    ///
    /// An empty list means the game is over by checkmate or stalemate.
    fn legal_moves(&self) -> Vec<Self::Move>;

    /// Plays `mv` on the current position.
    ///
    /// Must fail, leaving the position untouched, if `mv` is not legal here.
    fn apply_move(&mut self, mv: Self::Move) -> Result<()>;

    /// Takes back the most recent [`Rules::apply_move`], restoring every part of the state.
    ///
    /// Must fail if there is no move to take back.
    fn undo_move(&mut self) -> Result<()>;

    /// Returns `true` if the side to move has been checkmated.
    fn is_checkmate(&self) -> bool;

    /// Returns the reason the current position is drawn, if it is.
    fn draw_reason(&self) -> Option<DrawReason>;

    /// Returns `true` if the side to move is stalemated.
    fn is_stalemate(&self) -> bool {
        self.draw_reason() == Some(DrawReason::Stalemate)
    }

    /// Returns `true` if the current position is drawn for any reason.
    fn is_draw(&self) -> bool {
        self.draw_reason().is_some()
    }

    /// Returns `true` if no further moves may be played.
    fn is_game_over(&self) -> bool {
        self.outcome().is_some()
    }

    /// Classifies the current position, returning `None` if play continues.
    fn outcome(&self) -> Option<Outcome<Self::Side>> {
        if self.is_checkmate() {
            Some(Outcome::Checkmate {
                loser: self.side_to_move(),
            })
        } else {
            self.draw_reason().map(Outcome::Draw)
        }
    }
}
