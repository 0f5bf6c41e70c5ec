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

//! SADD/SCARD/SDIFF(STORE)/SINTER(STORE)/SUNION(STORE)/SISMEMBER/SMEMBERS/SMOVE/SREM.

use bytes::Bytes;

use super::require_args;
use crate::error::CommandError;
use crate::resp::Reply;
use crate::store::Store;

pub fn sadd(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, usize::MAX, "sadd")?;
    let added = store.sadd(&args[0], args[1..].to_vec())?;
    Ok(Reply::Integer(added as i64))
}

pub fn scard(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 1, "scard")?;
    Ok(Reply::Integer(store.scard(&args[0])? as i64))
}

pub fn sdiff(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, usize::MAX, "sdiff")?;
    let result = store.sdiff(args)?;
    Ok(Reply::Array(result.iter().cloned().map(Reply::bulk).collect()))
}

pub fn sdiffstore(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, usize::MAX, "sdiffstore")?;
    let result = store.sdiff(&args[1..])?;
    let n = store.overwrite_set(&args[0], result);
    Ok(Reply::Integer(n as i64))
}

pub fn sinter(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, usize::MAX, "sinter")?;
    let result = store.sinter(args)?;
    Ok(Reply::Array(result.iter().cloned().map(Reply::bulk).collect()))
}

pub fn sinterstore(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, usize::MAX, "sinterstore")?;
    let result = store.sinter(&args[1..])?;
    let n = store.overwrite_set(&args[0], result);
    Ok(Reply::Integer(n as i64))
}

pub fn sunion(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, usize::MAX, "sunion")?;
    let result = store.sunion(args)?;
    Ok(Reply::Array(result.iter().cloned().map(Reply::bulk).collect()))
}

pub fn sunionstore(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, usize::MAX, "sunionstore")?;
    let result = store.sunion(&args[1..])?;
    let n = store.overwrite_set(&args[0], result);
    Ok(Reply::Integer(n as i64))
}

pub fn sismember(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, 2, "sismember")?;
    Ok(Reply::Integer(if store.sismember(&args[0], &args[1]) { 1 } else { 0 }))
}

pub fn smembers(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 1, "smembers")?;
    let members = store.smembers(&args[0])?;
    Ok(Reply::Array(members.into_iter().map(Reply::bulk).collect()))
}

pub fn smove(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 3, 3, "smove")?;
    let moved = store.smove(&args[0], &args[1], &args[2])?;
    Ok(Reply::Integer(if moved { 1 } else { 0 }))
}

pub fn srem(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, usize::MAX, "srem")?;
    let removed = store.srem(&args[0], &args[1..])?;
    Ok(Reply::Integer(removed as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdiff_order_matches_first_operand() {
        let store = Store::new();
        store.sadd(&Bytes::from_static(b"a"), vec![Bytes::from_static(b"x"), Bytes::from_static(b"y"), Bytes::from_static(b"z")]).unwrap();
        store.sadd(&Bytes::from_static(b"b"), vec![Bytes::from_static(b"y")]).unwrap();
        let r = sdiff(&store, &[Bytes::from_static(b"a"), Bytes::from_static(b"b")]).unwrap();
        match r {
            Reply::Array(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn smove_requires_member_present_in_source() {
        let store = Store::new();
        store.sadd(&Bytes::from_static(b"src"), vec![Bytes::from_static(b"m")]).unwrap();
        let r = smove(&store, &[Bytes::from_static(b"src"), Bytes::from_static(b"dst"), Bytes::from_static(b"missing")]).unwrap();
        assert!(matches!(r, Reply::Integer(0)));
    }
}
