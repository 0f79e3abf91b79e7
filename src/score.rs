/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::MAX_DEPTH;

/// A numerical representation of the evaluation of a position / move, in units of ["centipawns"](https://www.chessprogramming.org/Score).
///
/// This value is internally capped at [`Self::INF`].
/// `Self::INF` and `-Self::INF` are only ever used as the initial bounds of a search,
/// and are never produced by evaluating a position.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Score(pub i32);

impl Score {
    /// Largest possible score ever achievable.
    pub const INF: Self = Self(i16::MAX as i32);

    /// Score of mate in the current position.
    pub const MATE: Self = Self(Self::INF.0 - 1);

    /// Score of a draw.
    pub const DRAW: Self = Self(0);

    /// Lowest possible score for mate.
    ///
    /// This is only obtainable if mate is possible in [`MAX_DEPTH`] plies.
    pub const LOWEST_MATE: Self = Self(Self::MATE.0 - MAX_DEPTH as i32);

    /// Upper bound on the magnitude of any static evaluation.
    ///
    /// Nine queens plus the remaining minor and major pieces against a bare king,
    /// with the best piece-square bonus on every square, stays well below this value.
    pub const MAX_EVAL: Self = Self(16_000);

    /// Score for the side that delivers mate `ply` half-moves from the root.
    #[inline(always)]
    pub const fn mate_in(ply: i32) -> Self {
        Self(Self::MATE.0 - ply)
    }

    /// Score for the side that gets mated `ply` half-moves from the root.
    #[inline(always)]
    pub const fn mated_in(ply: i32) -> Self {
        Self(-Self::MATE.0 + ply)
    }

    /// Returns `true` if the score is a mate score.
    #[inline(always)]
    pub fn is_mate(&self) -> bool {
        self.abs() >= Self::LOWEST_MATE
    }

    /// Returns `true` if the score lies strictly between the search sentinels `-INF` and `INF`.
    #[inline(always)]
    pub fn is_bounded(&self) -> bool {
        -Self::INF < *self && *self < Self::INF
    }

    /// Returns the number of plies (half moves) this score is from mate.
    #[inline(always)]
    pub const fn plies_to_mate(&self) -> i32 {
        Self::MATE.0 - self.0.abs()
    }

    /// Returns the number of moves (full moves) this score is from mate.
    #[inline(always)]
    pub const fn moves_to_mate(&self) -> i32 {
        let plies = self.plies_to_mate();

        // If this score is in favor of the side-to-move, it will be positive
        // so we add 1 (because we need to make the current move in order for it's score to take effect).
        // Otherwise, the score is for our opponent, so we need to negate it.
        let relative_to_side = if self.0 > 0 { plies + 1 } else { -plies };

        // Divide by 2 to obtain the number of moves (1 move = 2 ply)
        relative_to_side / 2
    }

    /// Returns the absolute value of this [`Score`].
    #[inline(always)]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// "Normalizes" a score so that it can be printed as a float.
    ///
    /// Presently, this just divides by 100, since a score represents a centipawn value.
    #[inline(always)]
    pub fn normalize(&self) -> f32 {
        self.0 as f32 / 100.0
    }
}

macro_rules! impl_binary_op {
    ($trait:tt, $fn:ident) => {
        impl std::ops::$trait for Score {
            type Output = Self;

            #[inline(always)]
            fn $fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$fn(rhs.0))
            }
        }

        impl std::ops::$trait<i32> for Score {
            type Output = Self;

            #[inline(always)]
            fn $fn(self, rhs: i32) -> Self::Output {
                Self(self.0.$fn(rhs))
            }
        }
    };
}

macro_rules! impl_binary_op_assign {
    ($trait:tt, $fn:ident) => {
        impl std::ops::$trait for Score {
            #[inline(always)]
            fn $fn(&mut self, rhs: Self) {
                self.0.$fn(rhs.0);
            }
        }

        impl std::ops::$trait<i32> for Score {
            #[inline(always)]
            fn $fn(&mut self, rhs: i32) {
                self.0.$fn(rhs);
            }
        }
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);

impl_binary_op_assign!(AddAssign, add_assign);
impl_binary_op_assign!(SubAssign, sub_assign);

impl std::ops::Neg for Score {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self(self.0.neg())
    }
}

impl PartialEq<i32> for Score {
    fn eq(&self, other: &i32) -> bool {
        self.0.eq(other)
    }
}

impl PartialOrd<i32> for Score {
    fn partial_cmp(&self, other: &i32) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(other)
    }
}

impl fmt::Display for Score {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() {
            write!(f, "mate {}", self.moves_to_mate())
        } else {
            write!(f, "cp {}", self.0)
        }
    }
}

impl fmt::Debug for Score {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() {
            write!(
                f,
                "{} (mate in {} plies {} moves)",
                self.0,
                self.plies_to_mate(),
                self.moves_to_mate()
            )
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_constructors() {
        let ours = Score::mate_in(3);
        assert!(ours.is_mate());
        assert_eq!(ours.plies_to_mate(), 3);
        assert_eq!(ours.moves_to_mate(), 2);

        let theirs = Score::mated_in(2);
        assert!(theirs.is_mate());
        assert_eq!(theirs, -Score::mate_in(2));
        assert_eq!(theirs.moves_to_mate(), -1);

        assert_eq!(Score::mated_in(0), -Score::MATE);
        assert_eq!(Score::mated_in(0).moves_to_mate(), 0);
    }

    #[test]
    fn test_sentinels_leave_headroom() {
        assert!(Score::MAX_EVAL < Score::LOWEST_MATE);
        assert!(Score::MATE < Score::INF);
        assert!(Score::mate_in(MAX_DEPTH as i32).is_mate());
        assert!(Score::mate_in(MAX_DEPTH as i32).is_bounded());
        assert!(!Score::INF.is_bounded());
        assert!(!(-Score::INF).is_bounded());
        assert!(!Score::MAX_EVAL.is_mate());
    }

    #[test]
    fn test_display() {
        assert_eq!(Score(-35).to_string(), "cp -35");
        assert_eq!(Score::mate_in(1).to_string(), "mate 1");
        assert_eq!(Score::mated_in(2).to_string(), "mate -1");
    }
}
