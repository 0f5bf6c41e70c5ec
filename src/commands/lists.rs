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

//! RPUSH/LPUSH/LLEN/LRANGE/LPOP/BLPOP.

use bytes::Bytes;
use tokio::time::Duration;

use super::{parse_i64, parse_usize, require_args};
use crate::error::CommandError;
use crate::resp::Reply;
use crate::store::Store;

pub fn rpush(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, usize::MAX, "rpush")?;
    let len = store.rpush(&args[0], args[1..].to_vec())?;
    Ok(Reply::Integer(len as i64))
}

pub fn lpush(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 2, usize::MAX, "lpush")?;
    let len = store.lpush(&args[0], args[1..].to_vec())?;
    Ok(Reply::Integer(len as i64))
}

pub fn llen(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 1, "llen")?;
    Ok(Reply::Integer(store.llen(&args[0])? as i64))
}

pub fn lrange(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 3, "lrange")?;
    let start = if args.len() > 1 { parse_i64(&args[1])? } else { 0 };
    let end = if args.len() > 2 { parse_i64(&args[2])? } else { -1 };
    let items = store.lrange(&args[0], start, end)?;
    Ok(Reply::Array(items.into_iter().map(Reply::bulk).collect()))
}

pub fn lpop(store: &Store, args: &[Bytes]) -> Result<Reply, CommandError> {
    require_args(args, 1, 2, "lpop")?;
    let count = if args.len() > 1 { parse_usize(&args[1])? } else { 1 };
    match store.lpop(&args[0], count)? {
        None => Ok(Reply::NullBulk),
        Some(items) if items.len() == 1 && args.len() == 1 => Ok(Reply::bulk(items.into_iter().next().unwrap())),
        Some(items) => Ok(Reply::Array(items.into_iter().map(Reply::bulk).collect())),
    }
}

/// Blocking pop: try the fast path first, then register a waiter and
/// await its handoff or the caller's timeout. See the store's waiter
/// registry for the handoff protocol this relies on.
pub async fn blpop(store: &Store, args: &[Bytes]) -> Reply {
    if args.len() != 2 {
        return Reply::Error(CommandError::wrong_args("blpop").as_wire_text());
    }
    let key = args[0].clone();
    let timeout_secs = match std::str::from_utf8(&args[1]).ok().and_then(|s| s.parse::<f64>().ok()) {
        Some(t) if t >= 0.0 => t,
        _ => return Reply::Error(CommandError::not_an_integer().as_wire_text()),
    };

    match store.try_lpop_one(&key) {
        Err(e) => return Reply::Error(e.as_wire_text()),
        Ok(Some(elem)) => return Reply::Array(vec![Reply::bulk(key), Reply::bulk(elem)]),
        Ok(None) => {}
    }

    let (waiter_id, rx) = store.register_waiter(key.clone());
    let outcome = if timeout_secs == 0.0 {
        rx.await.ok()
    } else {
        match tokio::time::timeout(Duration::from_secs_f64(timeout_secs), rx).await {
            Ok(res) => res.ok(),
            Err(_) => {
                store.remove_waiter(&key, waiter_id);
                None
            }
        }
    };

    match outcome {
        Some(elem) => Reply::Array(vec![Reply::bulk(key), Reply::bulk(elem)]),
        None => Reply::NullBulk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lrange_negative_indices() {
        let store = Store::new();
        store.rpush(&Bytes::from_static(b"k"), vec![
            Bytes::from_static(b"a"),
            Bytes::from_static(b"b"),
            Bytes::from_static(b"c"),
        ]).unwrap();
        let r = lrange(&store, &[Bytes::from_static(b"k"), Bytes::from_static(b"-2"), Bytes::from_static(b"-1")]).unwrap();
        match r {
            Reply::Array(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn lpop_single_returns_bulk_not_array() {
        let store = Store::new();
        store.rpush(&Bytes::from_static(b"k"), vec![Bytes::from_static(b"a")]).unwrap();
        let r = lpop(&store, &[Bytes::from_static(b"k")]).unwrap();
        assert!(matches!(r, Reply::Bulk(_)));
    }

    #[tokio::test]
    async fn blpop_fast_path_returns_immediately() {
        let store = Store::new();
        store.rpush(&Bytes::from_static(b"k"), vec![Bytes::from_static(b"a")]).unwrap();
        let r = blpop(&store, &[Bytes::from_static(b"k"), Bytes::from_static(b"0")]).await;
        match r {
            Reply::Array(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected array"),
        }
    }

    #[tokio::test]
    async fn blpop_times_out_to_null_bulk() {
        let store = Store::new();
        let r = blpop(&store, &[Bytes::from_static(b"missing"), Bytes::from_static(b"0.01")]).await;
        assert!(matches!(r, Reply::NullBulk));
    }

    #[tokio::test]
    async fn blpop_waiters_are_served_in_arrival_order() {
        let store = std::sync::Arc::new(Store::new());
        let key = Bytes::from_static(b"k");

        let s1 = store.clone();
        let k1 = key.clone();
        let first = tokio::spawn(async move { blpop(&s1, &[k1, Bytes::from_static(b"0")]).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let s2 = store.clone();
        let k2 = key.clone();
        let second = tokio::spawn(async move { blpop(&s2, &[k2, Bytes::from_static(b"0")]).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.rpush(&key, vec![Bytes::from_static(b"x"), Bytes::from_static(b"y")]).unwrap();

        let r1 = first.await.unwrap();
        let r2 = second.await.unwrap();
        match (r1, r2) {
            (Reply::Array(a), Reply::Array(b)) => {
                assert!(matches!(&a[1], Reply::Bulk(v) if &v[..] == b"x"));
                assert!(matches!(&b[1], Reply::Bulk(v) if &v[..] == b"y"));
            }
            _ => panic!("expected both waiters to be fulfilled"),
        }
    }
}
