/*
 * This file is a part of embercache, an in-memory keyspace server
 * speaking the Redis wire protocol.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! `embercached` -- the server binary. Parses configuration, initializes
//! logging, and runs the server to completion on a multi-thread Tokio
//! runtime, the same overall shape as the teacher's `main()` (build a
//! runtime, block on the server future, propagate the exit code) minus
//! the bgsave/pid-file persistence steps this system has no use for.

use std::process;

use embercache::config::Config;
use embercache::server::Server;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() {
    let config = Config::load();
    env_logger::Builder::new().parse_filters(config.log_filter()).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("embercache-worker")
        .enable_all()
        .build()
        .expect("failed to start tokio runtime");

    let result = runtime.block_on(async {
        let server = Server::new(config);
        server.run().await
    });

    if let Err(e) = result {
        log::error!("fatal error: {e}");
        process::exit(1);
    }
}
