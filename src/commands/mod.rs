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

//! Command dispatch (C5): a case-insensitive lookup from command name to
//! handler, grouped by family the way the teacher's `queryengine`/`kvengine`
//! split strings/lists/admin concerns into sibling modules, and driven by a
//! `gen_match!`-style dispatch table (here a plain `match`, since this
//! command surface is small enough that the teacher's macro buys nothing).

mod generic;
mod lists;
mod sets;
mod streams;
mod strings;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::error::CommandError;
use crate::resp::Reply;
use crate::store::Store;

/// Shared handles every command handler may need: the keyspace store and
/// the means to kick off an orderly server shutdown.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<Store>,
    pub shutdown_tx: broadcast::Sender<()>,
}

pub enum Outcome {
    Reply(Reply),
    Shutdown,
}

pub async fn dispatch(ctx: &Context, argv: Vec<Bytes>) -> Outcome {
    if argv.is_empty() {
        return Outcome::Reply(Reply::Error(CommandError::unknown_command("").as_wire_text()));
    }
    let cmd = String::from_utf8_lossy(&argv[0]).to_uppercase();
    let args = &argv[1..];
    let result = match cmd.as_str() {
        "PING" => generic::ping(args),
        "ECHO" => generic::echo(args),
        "TYPE" => generic::type_cmd(&ctx.store, args),
        "EXISTS" => generic::exists(&ctx.store, args),
        "DEL" => generic::del(&ctx.store, args),
        "FLUSHDB" => generic::flushdb(&ctx.store, args),
        "SHUTDOWN" => {
            ctx.store.wake_all_waiters_for_shutdown();
            let _ = ctx.shutdown_tx.send(());
            return Outcome::Shutdown;
        }
        "SET" => strings::set(&ctx.store, args),
        "GET" => strings::get(&ctx.store, args),
        "INCR" => strings::incr(&ctx.store, args),
        "TTL" => generic::ttl(&ctx.store, args),
        "EXPIRE" => generic::expire(&ctx.store, args),
        "RPUSH" => lists::rpush(&ctx.store, args),
        "LPUSH" => lists::lpush(&ctx.store, args),
        "LLEN" => lists::llen(&ctx.store, args),
        "LRANGE" => lists::lrange(&ctx.store, args),
        "LPOP" => lists::lpop(&ctx.store, args),
        "BLPOP" => return Outcome::Reply(lists::blpop(&ctx.store, args).await),
        "XADD" => streams::xadd(&ctx.store, args),
        "XRANGE" => streams::xrange(&ctx.store, args),
        "SADD" => sets::sadd(&ctx.store, args),
        "SCARD" => sets::scard(&ctx.store, args),
        "SDIFF" => sets::sdiff(&ctx.store, args),
        "SDIFFSTORE" => sets::sdiffstore(&ctx.store, args),
        "SINTER" => sets::sinter(&ctx.store, args),
        "SINTERSTORE" => sets::sinterstore(&ctx.store, args),
        "SUNION" => sets::sunion(&ctx.store, args),
        "SUNIONSTORE" => sets::sunionstore(&ctx.store, args),
        "SISMEMBER" => sets::sismember(&ctx.store, args),
        "SMEMBERS" => sets::smembers(&ctx.store, args),
        "SMOVE" => sets::smove(&ctx.store, args),
        "SREM" => sets::srem(&ctx.store, args),
        _ => Err(CommandError::unknown_command(&cmd)),
    };
    Outcome::Reply(match result {
        Ok(reply) => reply,
        Err(e) => Reply::Error(e.as_wire_text()),
    })
}

/// Shared argument helpers.

pub(crate) fn parse_i64(raw: &Bytes) -> Result<i64, CommandError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(CommandError::not_an_integer)
}

pub(crate) fn parse_usize(raw: &Bytes) -> Result<usize, CommandError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(CommandError::not_an_integer)
}

pub(crate) fn require_args(args: &[Bytes], min: usize, max: usize, cmd: &str) -> Result<(), CommandError> {
    if args.len() < min || args.len() > max {
        Err(CommandError::wrong_args(cmd))
    } else {
        Ok(())
    }
}
