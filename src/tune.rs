/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Depth searched when the caller does not ask for one.
macro_rules! default_search_depth {
    () => {
        4
    };
}
pub(crate) use default_search_depth;

/// Depth at which the `bench` searches are run.
macro_rules! bench_depth {
    () => {
        4
    };
}
pub(crate) use bench_depth;

/// Shallowest search that is worth splitting across threads at the root.
///
/// Below this, thread startup costs more than the search itself.
macro_rules! min_parallel_depth {
    () => {
        3
    };
}
pub(crate) use min_parallel_depth;
