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

//! Per-connection request/response loop (C6).
//!
//! Grounded on the teacher's `dbnet::connection::ConnectionHandler`: a
//! `tokio::select!` between reading the next frame and a shutdown signal,
//! and an owned connection-limit permit that is released automatically
//! (even on panic) when the handler's task ends -- the same guarantee the
//! teacher gets from its `Drop for ConnectionHandler` calling
//! `climit.add_permits(1)`, expressed here with `OwnedSemaphorePermit`'s
//! own `Drop` instead of a manual counter.

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::sync::OwnedSemaphorePermit;

use crate::commands::{self, Context, Outcome};
use crate::resp::parser::{parse_frame, ParseError};

const READ_CHUNK: usize = 4 * 1024;

pub struct ConnectionHandler {
    stream: TcpStream,
    ctx: Context,
    shutdown_rx: broadcast::Receiver<()>,
    _permit: OwnedSemaphorePermit,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        ctx: Context,
        shutdown_rx: broadcast::Receiver<()>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self { stream, ctx, shutdown_rx, _permit: permit }
    }

    pub async fn run(mut self) {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        loop {
            match parse_frame(&buf) {
                Ok((argv, consumed)) => {
                    let _ = buf.split_to(consumed);
                    if argv.is_empty() {
                        continue;
                    }
                    match commands::dispatch(&self.ctx, argv).await {
                        Outcome::Reply(reply) => {
                            let mut out = BytesMut::new();
                            reply.encode(&mut out);
                            if self.stream.write_all(&out).await.is_err() {
                                return;
                            }
                            if self.stream.flush().await.is_err() {
                                return;
                            }
                        }
                        Outcome::Shutdown => {
                            let _ = self.stream.flush().await;
                            return;
                        }
                    }
                }
                Err(ParseError::BadPacket) => {
                    let mut out = BytesMut::new();
                    crate::resp::Reply::Error("ERR Protocol error".to_string()).encode(&mut out);
                    let _ = self.stream.write_all(&out).await;
                    return;
                }
                Err(ParseError::NotEnough) => {
                    tokio::select! {
                        n = self.stream.read_buf(&mut buf) => {
                            match n {
                                Ok(0) => return, // peer closed
                                Ok(_) => continue,
                                Err(_) => return,
                            }
                        }
                        _ = self.shutdown_rx.recv() => {
                            return;
                        }
                    }
                }
            }
        }
    }
}
