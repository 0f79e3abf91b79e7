/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use chessie::{Piece, Square};
use clap::{Args, Parser, Subcommand};

use crate::tune;

/// Command-line interface of the engine.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Default log filter, used when `RUST_LOG` is not set (e.g. `info`, `pruner=debug`).
    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,

    /// The command to execute.
    #[command(subcommand)]
    pub command: EngineCommand,
}

/// A command to be sent to the engine.
#[derive(Debug, Clone, Subcommand)]
pub enum EngineCommand {
    /// Search a position and print the best move found.
    #[command(alias = "go")]
    Search {
        #[command(flatten)]
        position: PositionArgs,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Print an evaluation of a position, from the side-to-move's perspective.
    Eval {
        #[command(flatten)]
        position: PositionArgs,

        /// If set, every piece's contribution to the evaluation is printed on the board.
        #[arg(short, long, default_value = "false")]
        pretty: bool,

        /// Count material only, ignoring piece-square tables.
        #[arg(short, long, default_value = "false")]
        material_only: bool,
    },

    /// Outputs the Piece-Square table value for the provided piece at the provided square, scaled with the endgame weight.
    ///
    /// If no square was provided, the entire middle-game and end-game tables are printed.
    #[command(aliases = ["psq", "pst"])]
    Psqt {
        /// The piece whose Piece-Square table value(s) to fetch, as a FEN character (`N` for a White knight, `q` for a Black queen).
        piece: Piece,

        /// Evaluate `piece` at `square`.
        square: Option<Square>,

        /// Evaluate `piece` at `square` with the provided endgame weight [0-100].
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100), default_value = "0")]
        endgame_weight: u8,
    },

    /// Run a benchmark of fixed-depth searches over a set of positions.
    Bench {
        /// If set, the benchmarking results will be printed in a well-formatted table.
        #[arg(short, long, default_value = "false")]
        pretty: bool,

        /// Override the default benchmark depth.
        #[arg(short, long, default_value_t = tune::bench_depth!())]
        depth: i32,

        /// Number of threads to split each search across.
        #[arg(short, long, default_value = "1")]
        threads: usize,
    },

    /// Let the engine play against itself until the game ends.
    Play {
        #[command(flatten)]
        position: PositionArgs,

        #[command(flatten)]
        search: SearchArgs,

        /// Stop after this many half-moves, even if the game is not over.
        #[arg(long, default_value = "200")]
        max_plies: usize,
    },
}

/// Options selecting the position to work on.
#[derive(Debug, Clone, Args)]
pub struct PositionArgs {
    /// FEN of the position. Defaults to the standard starting position.
    #[arg(short, long)]
    pub fen: Option<String>,

    /// Moves, in UCI notation, to play from the position before doing anything else.
    #[arg(long, num_args = 1..)]
    pub moves: Vec<String>,
}

/// Options controlling a search.
#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    /// Number of plies to search.
    #[arg(short, long, default_value_t = tune::default_search_depth!(), allow_negative_numbers = true)]
    pub depth: i32,

    /// Number of threads to split the root moves across.
    #[arg(short, long, default_value = "1")]
    pub threads: usize,

    /// Disable alpha-beta cutoffs, searching the full minimax tree.
    #[arg(long, default_value = "false")]
    pub no_prune: bool,

    /// Count material only, ignoring piece-square tables.
    #[arg(short, long, default_value = "false")]
    pub material_only: bool,
}
