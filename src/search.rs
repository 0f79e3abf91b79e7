/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    sync::atomic::{AtomicI32, Ordering},
    time::Instant,
};

use rayon::{prelude::*, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;
use tracing::{debug, info};

use crate::{tune, Evaluate, Outcome, Rules, Score};

/// Maximum depth that can be searched
pub const MAX_DEPTH: usize = 255;

/// Ways a search can be rejected or aborted.
///
/// All of these are contract violations by the caller or the rules engine;
/// a position without legal moves is reported through [`SearchResult::bestmove`] instead.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The requested depth was below zero.
    #[error("search depth must not be negative (got {0})")]
    NegativeDepth(i32),

    /// The requested depth was above [`MAX_DEPTH`].
    #[error("search depth {0} exceeds the maximum of {MAX_DEPTH}")]
    DepthTooLarge(i32),

    /// The rules engine failed to apply or undo a move.
    #[error("rules engine error during search: {0:#}")]
    Rules(#[from] anyhow::Error),

    /// The worker pool for a parallel search could not be started.
    #[error("failed to start search threads: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

/// The result of a search, containing the best move found, score, and total nodes searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchResult<M> {
    /// Number of nodes searched.
    pub nodes: u64,

    /// Best move found during the search.
    ///
    /// `None` if the root position has no legal moves, is otherwise over, or was searched at depth 0.
    pub bestmove: Option<M>,

    /// Evaluation of the position after `bestmove` is made, from the root side-to-move's perspective.
    pub score: Score,
}

impl<M> Default for SearchResult<M> {
    /// A default search result should initialize to a *very bad* value,
    /// since there isn't a move to play.
    #[inline(always)]
    fn default() -> Self {
        Self {
            nodes: 0,
            bestmove: None,
            score: -Score::INF,
        }
    }
}

/// Configuration variables for executing a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Number of threads the root moves are split across.
    ///
    /// Only used for searches at least `min_parallel_depth` plies deep.
    pub threads: usize,

    /// Whether alpha-beta cutoffs are taken.
    ///
    /// Disabling this runs a plain minimax, which returns the same result while visiting more nodes.
    pub pruning: bool,
}

impl Default for SearchConfig {
    #[inline(always)]
    fn default() -> Self {
        Self {
            threads: 1,
            pruning: true,
        }
    }
}

/// Fixed-depth minimax search with alpha-beta pruning.
///
/// Every score is relative to the side to move at the root: the root is a maximizing node,
/// and plies alternate between minimizing and maximizing from there.
#[derive(Debug, Clone, Default)]
pub struct Searcher<E> {
    /// Scores leaf positions.
    evaluator: E,

    /// Configuration variables for every search run by this instance.
    config: SearchConfig,
}

impl<E> Searcher<E> {
    /// Construct a new [`Searcher`] that scores positions with `evaluator`.
    #[inline(always)]
    pub const fn new(evaluator: E, config: SearchConfig) -> Self {
        Self { evaluator, config }
    }

    /// The evaluator used at leaf nodes.
    #[inline(always)]
    pub const fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// The configuration of this searcher.
    #[inline(always)]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Searches `position` to `depth` plies and returns the best move for its side to move.
    ///
    /// The position is borrowed mutably so moves can be applied and undone in place,
    /// and is always handed back unchanged, even if the search fails.
    ///
    /// Among moves with equal scores, the one listed first by [`Rules::legal_moves`] is chosen.
    /// At depth 0 nothing is searched and the score is the static evaluation of `position`,
    /// even if the game is already over.
    pub fn find_best_move<R>(
        &self,
        position: &mut R,
        depth: i32,
    ) -> Result<SearchResult<R::Move>, SearchError>
    where
        R: Rules + Clone + Send + Sync,
        E: Evaluate<R> + Sync,
    {
        let depth = match usize::try_from(depth) {
            Ok(depth) if depth <= MAX_DEPTH => depth,
            Ok(_) => return Err(SearchError::DepthTooLarge(depth)),
            Err(_) => return Err(SearchError::NegativeDepth(depth)),
        };

        let starttime = Instant::now();
        let mut minimax = Minimax::new(&self.evaluator, position.side_to_move(), self.config.pruning);
        minimax.nodes += 1;

        if depth == 0 {
            return Ok(SearchResult {
                nodes: minimax.nodes,
                bestmove: None,
                score: minimax.evaluate(position),
            });
        }

        // Game over at the root, or nothing to search: report the position as-is.
        if let Some(score) = minimax.leaf(position, depth, 0) {
            return Ok(SearchResult {
                nodes: minimax.nodes,
                bestmove: None,
                score,
            });
        }
        let moves = position.legal_moves();
        if moves.is_empty() {
            return Ok(SearchResult {
                nodes: minimax.nodes,
                bestmove: None,
                score: minimax.evaluate(position),
            });
        }

        let threads = self.config.threads.min(moves.len());
        let scores = if threads > 1 && depth >= tune::min_parallel_depth!() {
            let (scores, nodes) = self.search_root_parallel(position, &moves, depth, threads)?;
            minimax.nodes += nodes;
            scores
        } else {
            minimax.search_root(position, &moves, depth)?
        };

        // Strict comparison, so the first of several equally good moves is kept.
        let mut res = SearchResult {
            nodes: minimax.nodes,
            ..Default::default()
        };
        for (&mv, &score) in moves.iter().zip(&scores) {
            if score > res.score {
                res.score = score;
                res.bestmove = Some(mv);
            }
        }
        debug_assert!(res.score.is_bounded(), "root score {:?} is a sentinel", res.score);

        let elapsed = starttime.elapsed();
        info!(
            depth,
            nodes = res.nodes,
            score = %res.score,
            bestmove = ?res.bestmove,
            ms = elapsed.as_millis() as u64,
            nps = (res.nodes as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64,
            "search complete"
        );

        Ok(res)
    }

    /// Searches the root moves on a pool of `threads` workers, each with its own copy of `position`.
    ///
    /// Workers share the best score found so far as a lower bound.
    /// A root move is searched with a window starting just *below* that bound,
    /// so any move that ties or beats the final best score still receives its exact score.
    /// Moves that fail low come back with a score strictly below the best and are never chosen.
    ///
    /// Returns the scores in the same order as `moves`, along with the number of nodes searched.
    fn search_root_parallel<R>(
        &self,
        position: &R,
        moves: &[R::Move],
        depth: usize,
        threads: usize,
    ) -> Result<(Vec<Score>, u64), SearchError>
    where
        R: Rules + Clone + Send + Sync,
        E: Evaluate<R> + Sync,
    {
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;

        let shared_alpha = AtomicI32::new((-Score::INF).0);
        let perspective = position.side_to_move();
        let evaluator = &self.evaluator;
        let pruning = self.config.pruning;

        let results = pool.install(|| {
            moves
                .par_iter()
                .map_init(
                    || position.clone(),
                    |position, &mv| -> Result<(Score, u64), SearchError> {
                        let mut minimax = Minimax::new(evaluator, perspective, pruning);
                        let hint = Score(shared_alpha.load(Ordering::Relaxed));
                        let alpha = if hint > -Score::INF { hint - 1 } else { hint };

                        let score = with_move(position, mv, |position| {
                            minimax.minimax(position, depth - 1, alpha, Score::INF, false, 1)
                        })?;

                        debug!(%mv, score = %score, nodes = minimax.nodes, "root move searched");
                        shared_alpha.fetch_max(score.0, Ordering::Relaxed);
                        Ok((score, minimax.nodes))
                    },
                )
                .collect::<Result<Vec<_>, _>>()
        })?;

        let (scores, nodes): (Vec<Score>, Vec<u64>) = results.into_iter().unzip();
        Ok((scores, nodes.into_iter().sum()))
    }
}

/// State of a single depth-first search.
struct Minimax<'a, R: Rules, E> {
    /// Scores leaf positions.
    evaluator: &'a E,

    /// The side to move at the root. All scores are from this side's point of view.
    perspective: R::Side,

    /// Whether alpha-beta cutoffs are taken.
    pruning: bool,

    /// Number of nodes visited so far.
    nodes: u64,
}

impl<'a, R: Rules, E: Evaluate<R>> Minimax<'a, R, E> {
    #[inline(always)]
    fn new(evaluator: &'a E, perspective: R::Side, pruning: bool) -> Self {
        Self {
            evaluator,
            perspective,
            pruning,
            nodes: 0,
        }
    }

    /// Searches every root move in order, returning their scores in the same order.
    ///
    /// Since beta stays at `+INF` at the root, alpha only ever tightens the children's windows.
    fn search_root(
        &mut self,
        position: &mut R,
        moves: &[R::Move],
        depth: usize,
    ) -> Result<Vec<Score>, SearchError> {
        let mut alpha = -Score::INF;
        let mut scores = Vec::with_capacity(moves.len());

        for &mv in moves {
            let score = with_move(position, mv, |position| {
                self.minimax(position, depth - 1, alpha, Score::INF, false, 1)
            })?;

            debug!(%mv, score = %score, nodes = self.nodes, "root move searched");
            alpha = alpha.max(score);
            scores.push(score);
        }

        Ok(scores)
    }

    /// Primary location of search logic.
    ///
    /// Uses the [minimax](https://www.chessprogramming.org/Minimax) algorithm
    /// with [alpha-beta pruning](https://www.chessprogramming.org/Alpha-Beta).
    fn minimax(
        &mut self,
        position: &mut R,
        depth: usize,
        mut alpha: Score,
        mut beta: Score,
        maximizing: bool,
        ply: i32,
    ) -> Result<Score, SearchError> {
        self.nodes += 1;

        // If we've reached a terminal node, evaluate the position
        if let Some(score) = self.leaf(position, depth, ply) {
            return Ok(score);
        }

        let moves = position.legal_moves();

        // The rules engine said play continues but offered no moves; treat it as a leaf.
        if moves.is_empty() {
            return Ok(self.evaluate(position));
        }

        // Start with a *really bad* initial score, so that the first move always replaces it
        let mut best = if maximizing { -Score::INF } else { Score::INF };

        for mv in moves {
            let score = with_move(position, mv, |position| {
                self.minimax(position, depth - 1, alpha, beta, !maximizing, ply + 1)
            })?;

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(best);
            } else {
                best = best.min(score);
                beta = beta.min(best);
            }

            // The opponent already has a better option elsewhere, so nothing below here can matter.
            if self.pruning && beta <= alpha {
                break;
            }
        }

        Ok(best)
    }

    /// Scores `position` if the search stops here, or returns `None` if it must be expanded.
    #[inline(always)]
    fn leaf(&self, position: &R, depth: usize, ply: i32) -> Option<Score> {
        match position.outcome() {
            // Prefer earlier mates, and postpone being mated.
            Some(Outcome::Checkmate { loser }) if loser == self.perspective => {
                Some(Score::mated_in(ply))
            }
            Some(Outcome::Checkmate { .. }) => Some(Score::mate_in(ply)),
            Some(Outcome::Draw(_)) => Some(Score::DRAW),
            None if depth == 0 => Some(self.evaluate(position)),
            None => None,
        }
    }

    #[inline(always)]
    fn evaluate(&self, position: &R) -> Score {
        let score = self.evaluator.evaluate(position, self.perspective);
        debug_assert!(
            score.abs() < Score::LOWEST_MATE,
            "evaluation {score:?} collides with mate scores"
        );
        score
    }
}

/// Applies `mv`, runs `f` on the resulting position, then undoes `mv`.
///
/// The move is undone whether or not `f` succeeds.
#[inline(always)]
fn with_move<R: Rules, T>(
    position: &mut R,
    mv: R::Move,
    f: impl FnOnce(&mut R) -> Result<T, SearchError>,
) -> Result<T, SearchError> {
    position.apply_move(mv)?;
    let res = f(position);
    position.undo_move()?;
    res
}
