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

//! Server configuration.
//!
//! Unlike the cascading file/env/cli layering of a full-fledged deployment,
//! this server takes its configuration from CLI flags alone -- there is no
//! persistence layer and nothing to reconcile across sources.

use std::net::IpAddr;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 6379;
/// Mirrors the connection ceiling the dbnet layer enforces via a semaphore.
pub const DEFAULT_MAX_CONNECTIONS: usize = 50000;

#[derive(Parser, Debug)]
#[command(name = "embercached", about = "An in-memory, Redis-wire-compatible keyspace server")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,
    /// Enable verbose (debug-level) logging
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Maximum number of simultaneous client connections
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub debug: bool,
    pub max_connections: usize,
}

impl Config {
    /// Parse configuration from the process's command-line arguments.
    pub fn load() -> Self {
        let cli = Cli::parse();
        Self {
            bind: cli.bind,
            port: cli.port,
            debug: cli.debug,
            max_connections: cli.max_connections,
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
