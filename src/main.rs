/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::Parser;
use pruner::{Cli, Engine};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // `RUST_LOG` wins over `--log-level`
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut engine = Engine::new();
    if let Err(e) = engine.execute(cli.command) {
        eprintln!("{} encountered an error: {e:#}", engine.name());
        std::process::exit(1);
    }
}
