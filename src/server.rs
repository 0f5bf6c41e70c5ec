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

//! Server bootstrap and lifecycle (C7): bind, accept, spawn a handler per
//! connection, and an orderly SHUTDOWN sequence.
//!
//! Grounded on `dbnet::listener::connect`/`BaseListener` for the
//! bind-then-accept shape and the broadcast-signal-plus-task-draining
//! shutdown idiom; unlike the teacher this server has exactly one plain
//! TCP listener (no TLS, no dual v1/v2 protocol), so `MultiListener`'s
//! secure/insecure branching collapses to a single accept loop.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;

use crate::commands::Context;
use crate::config::Config;
use crate::connection::ConnectionHandler;
use crate::error::TResult;
use crate::store::Store;

pub struct Server {
    config: Config,
    store: Arc<Store>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config, store: Arc::new(Store::new()) }
    }

    pub async fn run(self) -> TResult<()> {
        let listener = TcpListener::bind((self.config.bind, self.config.port)).await?;
        info!("server started on {}:{}", self.config.bind, self.config.port);

        let (shutdown_tx, _) = broadcast::channel(1);
        let climit = Arc::new(Semaphore::new(self.config.max_connections));
        let ctx = Context { store: self.store.clone(), shutdown_tx: shutdown_tx.clone() };
        let mut tasks = JoinSet::new();
        let mut shutdown_rx = shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("accept failed: {e}");
                            continue;
                        }
                    };
                    let permit = match climit.clone().try_acquire_owned() {
                        Ok(p) => p,
                        Err(_) => {
                            warn!("connection limit reached, dropping {peer}");
                            continue;
                        }
                    };
                    debug!("accepted connection from {peer}");
                    let handler = ConnectionHandler::new(stream, ctx.clone(), shutdown_tx.subscribe(), permit);
                    tasks.spawn(handler.run());
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received, draining connections");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("ctrl-c received, shutting down");
                    self.store.wake_all_waiters_for_shutdown();
                    let _ = shutdown_tx.send(());
                    break;
                }
            }
        }

        while tasks.join_next().await.is_some() {}
        info!("server shut down cleanly");
        Ok(())
    }
}
