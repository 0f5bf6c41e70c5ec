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

//! SET/GET/INCR.

use bytes::Bytes;

use super::{parse_i64, require_args};
use crate::error::CommandError;
use crate::resp::Reply;
use crate::store::{now_secs, Store};

enum Expiry {
    None,
    KeepTtl,
    At(i64),
}

pub fn set(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, 4, "set")?;
    let key = args[0].clone();
    let value = args[1].clone();
    let rest = &args[2..];
    let expiry = if rest.is_empty() {
        Expiry::None
    } else if rest.len() == 1 {
        let opt = String::from_utf8_lossy(&rest[0]).to_uppercase();
        match opt.as_str() {
            "KEEPTTL" => Expiry::KeepTtl,
            _ => return Err(CommandError::syntax()),
        }
    } else if rest.len() == 2 {
        let opt = String::from_utf8_lossy(&rest[0]).to_uppercase();
        let n = parse_i64(&rest[1])?;
        match opt.as_str() {
            "EX" => Expiry::At(now_secs() + n),
            "PX" => Expiry::At(now_secs() + n / 1000),
            "EXAT" => Expiry::At(n),
            "PXAT" => Expiry::At(n / 1000),
            _ => return Err(CommandError::syntax()),
        }
    } else {
        return Err(CommandError::syntax());
    };

    let deadline = match expiry {
        Expiry::None => None,
        Expiry::At(d) => Some(d),
        Expiry::KeepTtl => store.get_expiry(&key),
    };
    store.set_string(key, value, deadline);
    Ok(Reply::ok())
}

pub fn get(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 1, "get")?;
    Ok(match store.get_string(&args[0])? {
        Some(v) => Reply::bulk(v),
        None => Reply::NullBulk,
    })
}

pub fn incr(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 1, "incr")?;
    Ok(Reply::Integer(store.incr(&args[0])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let store = Store::new();
        set(&store, &[Bytes::from_static(b"k"), Bytes::from_static(b"v")]).unwrap();
        let r = get(&store, &[Bytes::from_static(b"k")]).unwrap();
        match r {
            Reply::Bulk(b) => assert_eq!(&b[..], b"v"),
            _ => panic!("expected bulk"),
        }
    }

    #[test]
    fn incr_on_missing_key_starts_at_one() {
        let store = Store::new();
        let r = incr(&store, &[Bytes::from_static(b"counter")]).unwrap();
        assert!(matches!(r, Reply::Integer(1)));
    }

    #[test]
    fn incr_on_non_numeric_string_errors() {
        let store = Store::new();
        set(&store, &[Bytes::from_static(b"k"), Bytes::from_static(b"notanumber")]).unwrap();
        assert!(incr(&store, &[Bytes::from_static(b"k")]).is_err());
    }
}
