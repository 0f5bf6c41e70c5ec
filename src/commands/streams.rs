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

//! XADD/XRANGE.

use bytes::Bytes;
use indexmap::IndexMap;

use super::{parse_i64, require_args};
use crate::error::CommandError;
use crate::resp::Reply;
use crate::store::stream::{parse_id_spec, parse_range_bound};
use crate::store::Store;

pub fn xadd(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, usize::MAX, "xadd")?;
    let key = &args[0];
    let id_spec = parse_id_spec(&args[1])?;
    let mut fields = IndexMap::new();
    let pairs = &args[2..];
    let mut it = pairs.iter();
    loop {
        match (it.next(), it.next()) {
            (Some(f), Some(v)) => {
                fields.insert(f.clone(), v.clone());
            }
            (Some(f), None) => {
                fields.insert(f.clone(), Bytes::new());
                break;
            }
            _ => break,
        }
    }
    let id = store.xadd(key, id_spec, fields)?;
    Ok(Reply::bulk(id.to_bytes()))
}

pub fn xrange(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 5, "xrange")?;
    if args.len() == 2 || args.len() == 4 {
        return Err(CommandError::syntax());
    }
    let key = &args[0];
    let start = match args.get(1) {
        Some(raw) => parse_range_bound(raw)?,
        None => parse_range_bound(b"-")?,
    };
    let end = match args.get(2) {
        Some(raw) => parse_range_bound(raw)?,
        None => parse_range_bound(b"+")?,
    };
    // only the literal "COUNT <n>" form is recognized in position 3/4
    let count = match args.get(3) {
        None => None,
        Some(raw) => {
            if String::from_utf8_lossy(raw).to_uppercase() != "COUNT" {
                return Err(CommandError::syntax());
            }
            Some(parse_i64(&args[4])?)
        }
    };
    let entries = store.xrange(key, start, end, count)?;
    Ok(match entries {
        None => Reply::NullBulk,
        Some(entries) => Reply::Array(
            entries
                .into_iter()
                .map(|e| {
                    let mut flat = Vec::with_capacity(e.fields.len() * 2);
                    for (f, v) in e.fields.iter() {
                        flat.push(Reply::bulk(f.clone()));
                        flat.push(Reply::bulk(v.clone()));
                    }
                    Reply::Array(vec![Reply::bulk(e.id.to_bytes()), Reply::Array(flat)])
                })
                .collect(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xadd_full_auto_then_xrange_roundtrips() {
        let store = Store::new();
        let key = Bytes::from_static(b"s");
        xadd(&store, &[key.clone(), Bytes::from_static(b"*"), Bytes::from_static(b"field"), Bytes::from_static(b"value")]).unwrap();
        let r = xrange(&store, &[key, Bytes::from_static(b"-"), Bytes::from_static(b"+")]).unwrap();
        match r {
            Reply::Array(items) => assert_eq!(items.len(), 1),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn xadd_rejects_zero_zero() {
        let store = Store::new();
        let err = xadd(&store, &[Bytes::from_static(b"s"), Bytes::from_static(b"0-0"), Bytes::from_static(b"f"), Bytes::from_static(b"v")]);
        assert!(err.is_err());
    }
}
