/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Command-line interface.
mod cli;

/// Code related to the engine's functionality, such as executing commands.
mod engine;

/// Evaluation of chess positions.
mod eval;

/// A chess position that can take back its moves.
mod position;

/// Piece-Square tables.
mod psqt;

/// The interface between the search and the rules of the game.
mod rules;

/// Scores produced by evaluation and search.
mod score;

/// Main engine logic; all search related code.
mod search;

/// Compile-time tunable parameters.
mod tune;

/// Misc utility functions, constants, and types.
mod utils;

pub use cli::*;
pub use engine::*;
pub use eval::*;
pub use position::*;
pub use psqt::*;
pub use rules::*;
pub use score::*;
pub use search::*;
pub use utils::*;
