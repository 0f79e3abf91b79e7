/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::time::Instant;

use anyhow::{Context, Result};
use chessie::{Color, Piece, Square};
use tracing::info;

use crate::{
    ChessPosition, EngineCommand, Evaluate, Evaluator, Outcome, PositionArgs, Psqt, Rules,
    SearchArgs, SearchConfig, Searcher, BENCHMARK_FENS,
};

/// The Pruner chess engine.
///
/// Holds the position that commands operate on, and runs every command to completion on the calling thread.
#[derive(Debug, Default)]
pub struct Engine {
    /// The current state of the chess board, as known to the engine.
    ///
    /// This is replaced whenever a command supplies a new position, and advanced by `play`.
    position: ChessPosition,
}

impl Engine {
    /// Constructs a new [`Engine`] on the standard starting position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a string of the engine's name and current version.
    pub fn name(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// The position the engine is currently working on.
    #[inline(always)]
    pub const fn position(&self) -> &ChessPosition {
        &self.position
    }

    /// Executes a single [`EngineCommand`], printing its results to `stdout`.
    pub fn execute(&mut self, command: EngineCommand) -> Result<()> {
        match command {
            EngineCommand::Search { position, search } => {
                self.set_position(&position)?;
                self.search(&search)
            }

            EngineCommand::Eval {
                position,
                pretty,
                material_only,
            } => {
                self.set_position(&position)?;
                self.eval(pretty, material_only);
                Ok(())
            }

            EngineCommand::Psqt {
                piece,
                square,
                endgame_weight,
            } => {
                psqt(piece, square, endgame_weight);
                Ok(())
            }

            EngineCommand::Bench {
                pretty,
                depth,
                threads,
            } => self.bench(depth, threads, pretty),

            EngineCommand::Play {
                position,
                search,
                max_plies,
            } => {
                self.set_position(&position)?;
                self.play(&search, max_plies)
            }
        }
    }

    /// Set the position to the supplied FEN string (defaults to the standard startpos if not supplied),
    /// and then apply the supplied moves one-by-one to the position.
    fn set_position(&mut self, args: &PositionArgs) -> Result<()> {
        self.position = match args.fen.as_deref() {
            Some(fen) => ChessPosition::from_fen(fen)?,
            None => ChessPosition::default(),
        };

        for mv_str in &args.moves {
            self.position.make_move_uci(mv_str)?;
        }

        Ok(())
    }

    /// Executes the `search` command, printing the best move found and its score.
    fn search(&mut self, args: &SearchArgs) -> Result<()> {
        let res = searcher(args).find_best_move(&mut self.position, args.depth)?;

        match res.bestmove {
            Some(mv) => println!("bestmove {mv} score {} nodes {}", res.score, res.nodes),
            None => match self.position.outcome() {
                Some(outcome) => println!("bestmove (none) {}", describe(outcome)),
                None => println!("bestmove (none) score {} nodes {}", res.score, res.nodes),
            },
        }

        Ok(())
    }

    /// Executes the `eval` command, printing an evaluation of the current position.
    fn eval(&self, pretty: bool, material_only: bool) {
        let evaluator = evaluator(material_only);

        if pretty {
            println!("{}", evaluator.pretty(self.position.game()));
        } else {
            let score = evaluator.evaluate(&self.position, self.position.side_to_move());
            println!("{score}");
        }
    }

    /// Execute the `bench` command, running a benchmark of a fixed search on a series of positions and displaying the results.
    fn bench(&mut self, depth: i32, threads: usize, pretty: bool) -> Result<()> {
        let searcher = Searcher::new(
            Evaluator::default(),
            SearchConfig {
                threads: threads.max(1),
                ..Default::default()
            },
        );

        let num_tests = BENCHMARK_FENS.len();
        let mut nodes = 0;
        let starttime = Instant::now();

        // Run a fixed search on each position
        for (i, fen) in BENCHMARK_FENS.into_iter().enumerate() {
            println!("Benchmark position {}/{}: {fen}", i + 1, num_tests);

            self.position = ChessPosition::from_fen(fen)?;
            let res = searcher
                .find_best_move(&mut self.position, depth)
                .with_context(|| format!("Benchmark search failed on {fen:?}"))?;
            nodes += res.nodes;
        }

        // Compute results
        let elapsed = starttime.elapsed();
        let nps = (nodes as f32 / elapsed.as_secs_f32()) as u64;
        let m_nps = nodes as f32 / elapsed.as_secs_f32() / 1_000_000.0;
        let ms = elapsed.as_millis();

        if pretty {
            // Display the results in a nice table
            println!();
            println!("+--- Benchmark Complete ---+");
            println!("| time (ms)  : {ms:<12}|");
            println!("| nodes      : {nodes:<12}|");
            println!("| nps        : {nps:<12}|");
            println!("| Mnps       : {m_nps:<12.2}|");
            println!("+--------------------------+");
        } else {
            println!("{nodes} nodes {nps} nps");
        }

        // Re-set the internal game state.
        self.position = ChessPosition::default();

        Ok(())
    }

    /// Executes the `play` command, letting the engine play both sides until the game ends
    /// or `max_plies` moves have been made.
    fn play(&mut self, args: &SearchArgs, max_plies: usize) -> Result<()> {
        let searcher = searcher(args);

        for ply in 0..max_plies {
            if let Some(outcome) = self.position.outcome() {
                println!("{}", describe(outcome));
                println!("{}", self.position.to_fen());
                return Ok(());
            }

            let res = searcher.find_best_move(&mut self.position, args.depth)?;
            let Some(mv) = res.bestmove else {
                println!("No move chosen at depth {}", args.depth);
                return Ok(());
            };

            let mover = self.position.side_to_move();
            println!("{:>3}. {:<5} {mv} ({})", ply + 1, mover.name(), res.score);
            info!(ply, %mv, score = %res.score, nodes = res.nodes, "move played");

            self.position.apply_move(mv)?;
        }

        match self.position.outcome() {
            Some(outcome) => println!("{}", describe(outcome)),
            None => println!("Stopped after {max_plies} plies"),
        }
        println!("{}", self.position.to_fen());

        Ok(())
    }
}

/// Executes the `psqt` command.
///
/// Prints both tables for `piece` if no square was given, or the tapered value at `square` otherwise.
fn psqt(piece: Piece, square: Option<Square>, endgame_weight: u8) {
    if let Some(square) = square {
        let value = Psqt::eval(piece, square, endgame_weight.into());
        println!("{}", value);
        return;
    }

    let (mg, eg) = Psqt::get_tables_for(piece.kind());
    let piece = piece.char();
    if piece.is_ascii_lowercase() {
        println!("Middle-game table for {piece}:\n{mg:#}\n");
        println!("End-game table for {piece}:\n{eg:#}");
    } else {
        println!("Middle-game table for {piece}:\n{mg}\n");
        println!("End-game table for {piece}:\n{eg}");
    }
}

/// Builds the searcher configured by `args`.
fn searcher(args: &SearchArgs) -> Searcher<Evaluator> {
    Searcher::new(
        evaluator(args.material_only),
        SearchConfig {
            threads: args.threads.max(1),
            pruning: !args.no_prune,
        },
    )
}

#[inline(always)]
fn evaluator(material_only: bool) -> Evaluator {
    if material_only {
        Evaluator::material_only()
    } else {
        Evaluator::default()
    }
}

/// Human-readable summary of a finished game.
fn describe(outcome: Outcome<Color>) -> String {
    match outcome {
        Outcome::Checkmate { loser } => {
            format!("checkmate, {} wins", loser.opponent().name())
        }
        Outcome::Draw(reason) => format!("draw by {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::{Cli, DrawReason};

    fn run(args: &[&str]) -> Engine {
        let cli = Cli::try_parse_from(std::iter::once("pruner").chain(args.iter().copied()))
            .unwrap();
        let mut engine = Engine::new();
        engine.execute(cli.command).unwrap();
        engine
    }

    #[test]
    fn test_position_with_moves() {
        let engine = run(&["eval", "--moves", "e2e4", "e7e5"]);
        assert_eq!(engine.position().ply(), 2);
        assert!(engine
            .position()
            .to_fen()
            .starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq"));
    }

    #[test]
    fn test_search_leaves_position_untouched() {
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
        let engine = run(&["search", "--fen", fen, "-d", "2"]);
        assert_eq!(engine.position().to_fen(), fen);
        assert_eq!(engine.position().ply(), 0);
    }

    #[test]
    fn test_invalid_fen_is_an_error() {
        let cli = Cli::try_parse_from(["pruner", "search", "--fen", "not a fen"]).unwrap();
        assert!(Engine::new().execute(cli.command).is_err());
    }

    #[test]
    fn test_negative_depth_is_an_error() {
        let cli = Cli::try_parse_from(["pruner", "search", "-d", "-3"]).unwrap();
        assert!(Engine::new().execute(cli.command).is_err());
    }

    #[test]
    fn test_play_finds_mate() {
        let engine = run(&["play", "--fen", "k7/8/KQ6/8/8/8/8/8 w - - 0 1", "-d", "2"]);
        assert_eq!(
            engine.position().outcome(),
            Some(Outcome::Checkmate {
                loser: Color::Black
            })
        );
    }

    #[test]
    fn test_play_stops_at_max_plies() {
        let engine = run(&["play", "-d", "1", "--max-plies", "3"]);
        assert_eq!(engine.position().ply(), 3);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(Outcome::Checkmate {
                loser: Color::Black
            }),
            format!("checkmate, {} wins", Color::White.name())
        );
        assert_eq!(
            describe(Outcome::Draw(DrawReason::Stalemate)),
            format!("draw by {}", DrawReason::Stalemate)
        );
    }
}
