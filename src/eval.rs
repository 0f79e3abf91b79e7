/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use chessie::{Color, File, Game, Piece, PieceKind, Rank, Square};

use crate::{ChessPosition, Psqt, Rules, Score};

/// Initial material value of all pieces in a standard setup.
const INITIAL_MATERIAL_VALUE: i32 = value_of(PieceKind::Pawn) * 16
    + value_of(PieceKind::Knight) * 4
    + value_of(PieceKind::Bishop) * 4
    + value_of(PieceKind::Rook) * 4
    + value_of(PieceKind::Queen) * 2;

/// Scores a position for the search.
///
/// Scores are side-relative: a positive score is good for `perspective`,
/// a negative score is good for its opponent, and `0` is equal.
/// Implementations must be pure and must stay within `±`[`Score::MAX_EVAL`].
pub trait Evaluate<R: Rules> {
    /// Evaluate `position` from `perspective`'s point of view.
    fn evaluate(&self, position: &R, perspective: R::Side) -> Score;
}

/// Which terms contribute to an [`Evaluator`]'s score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvalTerms {
    /// Sum of piece values.
    pub material: bool,

    /// Sum of piece-square table bonuses.
    pub positional: bool,
}

impl Default for EvalTerms {
    #[inline(always)]
    fn default() -> Self {
        Self {
            material: true,
            positional: true,
        }
    }
}

/// Encapsulates the logic of scoring a chess position.
///
/// The score is the material balance plus the balance of [`Psqt`] bonuses,
/// each computed as "`color`'s pieces minus the opponent's pieces".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluator {
    terms: EvalTerms,
}

impl Evaluator {
    /// Construct a new [`Evaluator`] using only the provided terms.
    #[inline(always)]
    pub const fn new(terms: EvalTerms) -> Self {
        Self { terms }
    }

    /// An [`Evaluator`] that counts material and ignores piece placement.
    #[inline(always)]
    pub const fn material_only() -> Self {
        Self::new(EvalTerms {
            material: true,
            positional: false,
        })
    }

    /// The terms this evaluator sums.
    #[inline(always)]
    pub const fn terms(&self) -> EvalTerms {
        self.terms
    }

    /// Evaluate `game` from `color`'s perspective.
    ///
    /// A positive/high number is good for the `color`, while a negative number is better for the opponent.
    /// A score of 0 is considered equal.
    pub fn eval_for(&self, game: &Game, color: Color) -> Score {
        let endgame_weight = endgame_weight(game);

        // By default, the score is a draw.
        let mut score = Score::DRAW;

        // Iterate over every occupied square
        for (square, piece) in game.board() {
            let value = self.value_of_piece(piece, square, endgame_weight);

            // Flip scores appropriately to evaluate from `color`'s perspective
            if color == piece.color() {
                score += value;
            } else {
                score -= value;
            }
        }

        score
    }

    /// The contribution of a single piece, from its owner's perspective.
    #[inline(always)]
    fn value_of_piece(&self, piece: Piece, square: Square, endgame_weight: i32) -> i32 {
        let mut value = 0;

        if self.terms.material {
            value += value_of(piece.kind());
        }

        if self.terms.positional {
            value += Psqt::eval(piece, square, endgame_weight);
        }

        value
    }

    /// Renders `game` with the contribution of every piece.
    #[inline(always)]
    pub fn pretty<'a>(&'a self, game: &'a Game) -> EvalBoard<'a> {
        EvalBoard {
            evaluator: self,
            game,
        }
    }
}

impl Evaluate<ChessPosition> for Evaluator {
    #[inline(always)]
    fn evaluate(&self, position: &ChessPosition, perspective: Color) -> Score {
        self.eval_for(position.game(), perspective)
    }
}

/// A board printout annotated with each piece's contribution to the evaluation.
///
/// Contributions are signed from White's perspective.
pub struct EvalBoard<'a> {
    evaluator: &'a Evaluator,
    game: &'a Game,
}

impl EvalBoard<'_> {
    /// Fetches the value for the piece on the specified square, if one exists.
    #[inline(always)]
    fn value_at(&self, square: Square, endgame_weight: i32) -> Option<Score> {
        self.game.piece_at(square).map(|piece| {
            let value = self
                .evaluator
                .value_of_piece(piece, square, endgame_weight);

            if piece.color() == Color::White {
                Score(value)
            } else {
                Score(-value)
            }
        })
    }
}

impl fmt::Display for EvalBoard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = self.game.side_to_move();
        let endgame_weight = endgame_weight(self.game);

        write!(f, "  +")?;
        for _ in File::iter() {
            write!(f, "-----+")?;
        }
        writeln!(f)?;

        for rank in Rank::iter().rev() {
            write!(f, "{rank} |")?;

            // Step 1: Write the piece char
            for file in File::iter() {
                let piece = self.game.piece_at(Square::new(file, rank));
                let piece_char = piece.map(|p| p.char()).unwrap_or(' ');
                write!(f, "  {piece_char}  |")?;
            }
            writeln!(f)?;
            write!(f, "  |")?;

            // Step 2: Write the contribution of that piece
            for file in File::iter() {
                let cell = match self.value_at(Square::new(file, rank), endgame_weight) {
                    Some(val) => format!("{:^+5.1}", val.normalize()),
                    None => String::from("     "),
                };
                write!(f, "{cell}|")?;
            }
            writeln!(f)?;

            write!(f, "  +")?;
            for _ in File::iter() {
                write!(f, "-----+")?;
            }
            writeln!(f)?;
        }
        for file in File::iter() {
            write!(f, "     {file}")?;
        }

        let score = self.evaluator.eval_for(self.game, color);

        let winning_side = if score > Score::DRAW {
            Some(color)
        } else if score < Score::DRAW {
            Some(color.opponent())
        } else {
            None
        };

        writeln!(f, "\n\nEndgame: {endgame_weight}%")?;
        writeln!(
            f,
            "Winning side: {}",
            winning_side.map(|c| c.name()).unwrap_or("N/A")
        )?;
        write!(f, "Score ({}): {}", color.name(), score.0)
    }
}

/// Returns a value of the provided `PieceKind`.
///
/// Values are obtained from here: <https://www.chessprogramming.org/Simplified_Evaluation_Function>
#[inline(always)]
pub const fn value_of(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => 100,
        PieceKind::Knight => 320,
        PieceKind::Bishop => 330,
        PieceKind::Rook => 500,
        PieceKind::Queen => 900,
        PieceKind::King => 0, // King is invaluable, but 0 is easier to work with in computations
    }
}

/// Counts the material value of all pieces on the board
///
/// Does NOT count the material of the King, as it cannot be removed from the board.
#[inline(always)]
fn material_remaining(game: &Game) -> i32 {
    PieceKind::all_except_king()
        .into_iter()
        .fold(0, |score, kind| {
            score + game.kind(kind).population() as i32 * value_of(kind)
        })
}

/// Compares the current material on the board against the starting material, yielding an `i32` in the range `[0, 100]`
///
/// Lower numbers are closer to the beginning of the game. Higher numbers are closer to the end of the game.
/// Promotions can push the material above its starting value, which still counts as `0`.
///
/// The King is ignored when performing this calculation.
#[inline(always)]
pub fn endgame_weight(game: &Game) -> i32 {
    let remaining = INITIAL_MATERIAL_VALUE - material_remaining(game);
    (remaining * 100 / INITIAL_MATERIAL_VALUE).clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(fen: &str, evaluator: Evaluator) -> Score {
        let position: ChessPosition = fen.parse().unwrap();
        evaluator.evaluate(&position, position.side_to_move())
    }

    #[test]
    fn test_startpos_is_equal() {
        let position = ChessPosition::default();

        for evaluator in [Evaluator::default(), Evaluator::material_only()] {
            assert_eq!(evaluator.evaluate(&position, Color::White), Score::DRAW);
            assert_eq!(evaluator.evaluate(&position, Color::Black), Score::DRAW);
        }
    }

    #[test]
    fn test_perspectives_are_negations() {
        let fens = [
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
            "4k3/8/8/3q4/8/8/PPP5/1K6 b - - 0 1",
            "8/8/8/8/8/8/6k1/4K2R w K - 0 1",
        ];

        for fen in fens {
            let position: ChessPosition = fen.parse().unwrap();
            let evaluator = Evaluator::default();

            let white = evaluator.evaluate(&position, Color::White);
            let black = evaluator.evaluate(&position, Color::Black);
            assert_eq!(white, -black, "{fen}");
        }
    }

    #[test]
    fn test_mirrored_positions_score_the_same() {
        // The same position with colors swapped and the board flipped vertically.
        let white = eval(
            "4k3/8/8/8/8/8/PPPN4/4K3 w - - 0 1",
            Evaluator::default(),
        );
        let black = eval(
            "4k3/pppn4/8/8/8/8/8/4K3 b - - 0 1",
            Evaluator::default(),
        );

        assert_eq!(white, black);
    }

    #[test]
    fn test_material_only_counts_piece_values() {
        // White is up a rook, Black is up a knight.
        let score = eval(
            "4k3/8/8/3n4/8/8/8/R3K3 w - - 0 1",
            Evaluator::material_only(),
        );
        assert_eq!(score, Score(value_of(PieceKind::Rook) - value_of(PieceKind::Knight)));
    }

    #[test]
    fn test_positional_only() {
        let evaluator = Evaluator::new(EvalTerms {
            material: false,
            positional: true,
        });

        // A lone knight: only its table bonus remains, kings cancel out by symmetry.
        let position: ChessPosition = "4k3/8/8/8/4N3/8/8/4K3 w - - 0 1".parse().unwrap();
        let e4: Square = "e4".parse().unwrap();
        let knight = Piece::new(Color::White, PieceKind::Knight);
        let expected = Psqt::eval(knight, e4, endgame_weight(position.game()));

        let e1: Square = "e1".parse().unwrap();
        let e8: Square = "e8".parse().unwrap();
        let weight = endgame_weight(position.game());
        let kings = Psqt::eval(Piece::new(Color::White, PieceKind::King), e1, weight)
            - Psqt::eval(Piece::new(Color::Black, PieceKind::King), e8, weight);
        assert_eq!(kings, 0);

        assert_eq!(
            evaluator.evaluate(&position, Color::White),
            Score(expected)
        );
    }

    #[test]
    fn test_endgame_weight() {
        assert_eq!(endgame_weight(ChessPosition::default().game()), 0);

        let bare_kings: ChessPosition = "4k3/8/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(endgame_weight(bare_kings.game()), 100);

        // Extra queens from promotion do not produce a negative weight.
        let promoted: ChessPosition =
            "rnbqkbnr/pppppppp/8/8/Q6Q/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".parse().unwrap();
        assert_eq!(endgame_weight(promoted.game()), 0);
    }

    #[test]
    fn test_scores_stay_within_bounds() {
        // Lopsided positions at the extremes of what is reachable.
        let fens = [
            "k7/8/8/8/8/NNBBRR2/QQQQQQQQ/QK6 w - - 0 1",
            "qk6/qqqqqqqq/nnbbrr2/8/8/8/8/K7 b - - 0 1",
            "4k3/8/PPPPPPPP/8/8/8/8/4K3 w - - 0 1",
        ];

        for fen in fens {
            let position: ChessPosition = fen.parse().unwrap();
            for color in [Color::White, Color::Black] {
                let score = Evaluator::default().evaluate(&position, color);
                assert!(score.abs() < Score::MAX_EVAL, "{fen}: {score:?}");
                assert!(!score.is_mate(), "{fen}: {score:?}");
            }
        }
    }

    #[test]
    fn test_pretty_output_mentions_score() {
        let position = ChessPosition::default();
        let evaluator = Evaluator::default();
        let printed = evaluator.pretty(position.game()).to_string();

        assert!(printed.contains("Endgame: 0%"));
        assert!(printed.contains("Winning side: N/A"));
    }
}
