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

//! PING/ECHO/TYPE/EXISTS/DEL/FLUSHDB/TTL/EXPIRE -- the commands that
//! aren't specific to any one value type.

use bytes::Bytes;

use super::{parse_i64, require_args};
use crate::error::CommandError;
use crate::resp::Reply;
use crate::store::{now_secs, Store};

pub fn ping(args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 0, 1, "ping")?;
    Ok(match args.first() {
        Some(msg) => Reply::bulk(msg.clone()),
        None => Reply::Simple("PONG"),
    })
}

pub fn echo(args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 1, "echo")?;
    Ok(Reply::bulk(args[0].clone()))
}

pub fn type_cmd(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 1, "type")?;
    Ok(Reply::Simple(store.type_of(&args[0]).as_str()))
}

pub fn exists(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, usize::MAX, "exists")?;
    let n = args.iter().filter(|k| store.exists(k)).count();
    Ok(Reply::Integer(n as i64))
}

pub fn del(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, usize::MAX, "del")?;
    let n = args.iter().filter(|k| store.delete(k)).count();
    Ok(Reply::Integer(n as i64))
}

pub fn flushdb(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 0, 1, "flushdb")?;
    if let Some(mode) = args.first() {
        let mode = String::from_utf8_lossy(mode).to_uppercase();
        if mode != "ASYNC" && mode != "SYNC" {
            return Err("ERR syntax error".into());
        }
    }
    store.flush();
    Ok(Reply::ok())
}

pub fn ttl(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 1, "ttl")?;
    Ok(Reply::Integer(store.ttl(&args[0])))
}

pub fn expire(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, 3, "expire")?;
    let seconds = parse_i64(&args[1])?;
    let deadline = now_secs() + seconds;
    let cond = match args.get(2) {
        None => None,
        Some(raw) => {
            let s = String::from_utf8_lossy(raw).to_uppercase();
            match s.as_str() {
                "NX" | "XX" | "GT" | "LT" => Some(s),
                _ => return Err(CommandError::syntax()),
            }
        }
    };
    let applied = store.expire(&args[0], deadline, cond.as_deref());
    Ok(Reply::Integer(if applied { 1 } else { 0 }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_without_args_replies_pong() {
        assert!(matches!(ping(&[]).unwrap(), Reply::Simple("PONG")));
    }

    #[test]
    fn exists_counts_only_present_keys() {
        let store = Store::new();
        store.set_string(Bytes::from_static(b"a"), Bytes::from_static(b"1"), None);
        let reply = exists(&store, &[Bytes::from_static(b"a"), Bytes::from_static(b"b")]).unwrap();
        assert!(matches!(reply, Reply::Integer(1)));
    }
}
