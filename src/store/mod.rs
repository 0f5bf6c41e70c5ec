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

//! The typed, concurrent keyspace store (C3) plus the blocked-waiter
//! registry (C4), folded into a single `parking_lot::Mutex` guarded
//! structure so that the "single coarse lock" concurrency model in the
//! design is literal: there is exactly one lock, covering both the
//! keyspace map and the waiter queues, so a push and its waiter handoff
//! happen in the same critical section.
//!
//! Grounded on the teacher's `coredb::Shared { table: RwLock<Coretable> }`
//! shape (a single lock guarding one concurrent table), scaled from an
//! `RwLock` down to a plain `Mutex` since every store operation here,
//! including reads, may need to mutate on passive expiry.

pub mod ordered_set;
pub mod stream;
pub mod value;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::CommandError;
use ordered_set::OrderedSet;
use stream::{IdSpec, RangeBound, Stream, StreamEntry, StreamId};
use value::{TypeName, Value};

/// Wall-clock seconds since the epoch, used for TTL deadlines. Grounded
/// on the teacher's use of `chrono` for its own timestamped bookkeeping
/// (e.g. `SnapshotStatus`'s last-snapshot time) rather than raw
/// `SystemTime` arithmetic.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Wall-clock milliseconds since the epoch, used for XADD's full-auto ID
/// generation.
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis() as u64
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    pub expiry: Option<i64>,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Bytes>,
}

#[derive(Default)]
struct StoreInner {
    map: HashMap<Bytes, Entry>,
    waiters: HashMap<Bytes, VecDeque<Waiter>>,
}

impl StoreInner {
    /// Evict `key` if it has expired. Returns `true` if the key is now
    /// (or already was) absent.
    fn expire_if_needed(&mut self, key: &Bytes) -> bool {
        let expired = match self.map.get(key) {
            Some(e) => matches!(e.expiry, Some(deadline) if now_secs() > deadline),
            None => return true,
        };
        if expired {
            self.map.remove(key);
            true
        } else {
            false
        }
    }

    fn get(&mut self, key: &Bytes) -> Option<&Entry> {
        self.expire_if_needed(key);
        self.map.get(key)
    }

    fn get_mut(&mut self, key: &Bytes) -> Option<&mut Entry> {
        self.expire_if_needed(key);
        self.map.get_mut(key)
    }

    /// After a push to `key`, hand off newly available elements to the
    /// earliest-arrived waiters still on this key, atomically within the
    /// caller's lock hold.
    fn handoff(&mut self, key: &Bytes) {
        loop {
            let Some(queue) = self.waiters.get_mut(key) else { return };
            if queue.is_empty() {
                self.waiters.remove(key);
                return;
            }
            let list_has_elem = self
                .map
                .get(key)
                .and_then(|e| e.value.as_list())
                .map(|l| !l.is_empty())
                .unwrap_or(false);
            if !list_has_elem {
                return;
            }
            let waiter = queue.pop_front().unwrap();
            let elem = self
                .map
                .get_mut(key)
                .and_then(|e| e.value.as_list_mut())
                .and_then(|l| l.pop_front())
                .unwrap();
            if let Err(elem) = waiter.tx.send(elem) {
                // receiver already gone (timed out / connection dropped);
                // the element was never actually delivered, put it back.
                if let Some(l) = self.map.get_mut(key).and_then(|e| e.value.as_list_mut()) {
                    l.push_front(elem);
                }
            }
        }
    }
}

pub struct Store {
    inner: Mutex<StoreInner>,
    waiter_ids: AtomicU64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self { inner: Mutex::new(StoreInner::default()), waiter_ids: AtomicU64::new(0) }
    }

    // ---- generic -----------------------------------------------------

    pub fn exists(&self, key: &Bytes) -> bool {
        self.inner.lock().get(key).is_some()
    }

    pub fn delete(&self, key: &Bytes) -> bool {
        let mut inner = self.inner.lock();
        inner.expire_if_needed(key);
        inner.map.remove(key).is_some()
    }

    pub fn type_of(&self, key: &Bytes) -> TypeName {
        match self.inner.lock().get(key) {
            Some(e) => e.value.type_name(),
            None => TypeName::None,
        }
    }

    pub fn flush(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
    }

    // ---- strings -------------------------------------------------------

    pub fn set_string(&self, key: Bytes, value: Bytes, expiry: Option<i64>) {
        let mut inner = self.inner.lock();
        inner.map.insert(key, Entry { value: Value::Str(value), expiry });
    }

    pub fn get_string(&self, key: &Bytes) -> Result<Option<Bytes>, CommandError> {
        let mut inner = self.inner.lock();
        match inner.get(key) {
            None => Ok(None),
            Some(e) => e.value.as_str().cloned().map(Some).ok_or(CommandError::WrongType),
        }
    }

    pub fn incr(&self, key: &Bytes) -> Result<i64, CommandError> {
        let mut inner = self.inner.lock();
        let current: i64 = match inner.get(key) {
            None => 0,
            Some(e) => {
                let s = e.value.as_str().ok_or(CommandError::WrongType)?;
                let text = std::str::from_utf8(s).ok().ok_or_else(CommandError::not_an_integer)?;
                // matches the ground truth's `str.isdigit()` gate: non-empty and
                // every byte an ASCII digit, so a leading `-` is rejected too.
                if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(CommandError::not_an_integer());
                }
                text.parse::<i64>().ok().ok_or_else(CommandError::not_an_integer)?
            }
        };
        let new_value = current + 1;
        let expiry = inner.map.get(key).and_then(|e| e.expiry);
        inner.map.insert(key.clone(), Entry { value: Value::Str(Bytes::from(new_value.to_string())), expiry });
        Ok(new_value)
    }

    // ---- ttl -----------------------------------------------------------

    pub fn ttl(&self, key: &Bytes) -> i64 {
        let mut inner = self.inner.lock();
        match inner.get(key) {
            None => -2,
            Some(Entry { expiry: None, .. }) => -1,
            Some(Entry { expiry: Some(deadline), .. }) => deadline - now_secs(),
        }
    }

    pub fn get_expiry(&self, key: &Bytes) -> Option<i64> {
        self.inner.lock().get(key).and_then(|e| e.expiry)
    }

    pub fn expire(&self, key: &Bytes, deadline: i64, cond: Option<&str>) -> bool {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.get_mut(key) else { return false };
        let allowed = match cond {
            None => true,
            Some("NX") => entry.expiry.is_none(),
            Some("XX") => entry.expiry.is_some(),
            Some("GT") => entry.expiry.map(|cur| deadline > cur).unwrap_or(false),
            Some("LT") => entry.expiry.map(|cur| deadline < cur).unwrap_or(true),
            Some(_) => false,
        };
        if allowed {
            entry.expiry = Some(deadline);
        }
        allowed
    }

    // ---- lists -----------------------------------------------------------

    pub fn rpush(&self, key: &Bytes, items: Vec<Bytes>) -> Result<usize, CommandError> {
        let mut inner = self.inner.lock();
        inner.expire_if_needed(key);
        let entry = inner.map.entry(key.clone()).or_insert_with(|| Entry { value: Value::List(VecDeque::new()), expiry: None });
        let list = entry.value.as_list_mut().ok_or(CommandError::WrongType)?;
        list.extend(items);
        let len = list.len();
        inner.handoff(key);
        Ok(len)
    }

    pub fn lpush(&self, key: &Bytes, items: Vec<Bytes>) -> Result<usize, CommandError> {
        let mut inner = self.inner.lock();
        inner.expire_if_needed(key);
        let entry = inner.map.entry(key.clone()).or_insert_with(|| Entry { value: Value::List(VecDeque::new()), expiry: None });
        let list = entry.value.as_list_mut().ok_or(CommandError::WrongType)?;
        for item in items {
            list.push_front(item);
        }
        let len = list.len();
        inner.handoff(key);
        Ok(len)
    }

    pub fn llen(&self, key: &Bytes) -> Result<usize, CommandError> {
        let mut inner = self.inner.lock();
        match inner.get(key) {
            None => Ok(0),
            Some(e) => e.value.as_list().map(|l| l.len()).ok_or(CommandError::WrongType),
        }
    }

    pub fn lrange(&self, key: &Bytes, start: i64, end: i64) -> Result<Vec<Bytes>, CommandError> {
        let mut inner = self.inner.lock();
        let list = match inner.get(key) {
            None => return Ok(Vec::new()),
            Some(e) => e.value.as_list().ok_or(CommandError::WrongType)?,
        };
        let len = list.len() as i64;
        if len == 0 {
            return Ok(Vec::new());
        }
        let norm = |i: i64| -> i64 {
            if i < 0 {
                (i + len).max(0)
            } else {
                i
            }
        };
        let s = norm(start);
        let mut e = norm(end);
        if s >= len {
            return Ok(Vec::new());
        }
        if e >= len {
            e = len - 1;
        }
        if s > e {
            return Ok(Vec::new());
        }
        Ok(list.iter().skip(s as usize).take((e - s + 1) as usize).cloned().collect())
    }

    pub fn lpop(&self, key: &Bytes, count: usize) -> Result<Option<Vec<Bytes>>, CommandError> {
        let mut inner = self.inner.lock();
        let list = match inner.get_mut(key) {
            None => return Ok(None),
            Some(e) => e.value.as_list_mut().ok_or(CommandError::WrongType)?,
        };
        if list.is_empty() {
            return Ok(None);
        }
        let n = count.min(list.len());
        let popped: Vec<Bytes> = list.drain(..n).collect();
        Ok(Some(popped))
    }

    /// The BLPOP fast path: an ordinary single-element pop. Returns `None`
    /// if there is nothing to pop right now, in which case the caller
    /// should register a waiter.
    pub fn try_lpop_one(&self, key: &Bytes) -> Result<Option<Bytes>, CommandError> {
        let mut inner = self.inner.lock();
        let list = match inner.get_mut(key) {
            None => return Ok(None),
            Some(e) => e.value.as_list_mut().ok_or(CommandError::WrongType)?,
        };
        Ok(list.pop_front())
    }

    /// Register a BLPOP waiter on `key`. Returns the waiter id (needed to
    /// cancel on timeout) and the receiving half of its completion
    /// channel.
    pub fn register_waiter(&self, key: Bytes) -> (u64, oneshot::Receiver<Bytes>) {
        let id = self.waiter_ids.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock();
        inner.waiters.entry(key).or_default().push_back(Waiter { id, tx });
        (id, rx)
    }

    /// Remove a specific waiter (by id) from its queue -- called when a
    /// BLPOP call times out so it cannot be handed an element later.
    pub fn remove_waiter(&self, key: &Bytes, id: u64) {
        let mut inner = self.inner.lock();
        if let Some(queue) = inner.waiters.get_mut(key) {
            queue.retain(|w| w.id != id);
            if queue.is_empty() {
                inner.waiters.remove(key);
            }
        }
    }

    /// Drop every pending waiter's sender, which resolves their receivers
    /// with a disconnect error -- the server-shutdown wakeup.
    pub fn wake_all_waiters_for_shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.waiters.clear();
    }

    // ---- streams ---------------------------------------------------------

    pub fn xadd(&self, key: &Bytes, id_spec: IdSpec, fields: IndexMap<Bytes, Bytes>) -> Result<StreamId, CommandError> {
        let mut inner = self.inner.lock();
        inner.expire_if_needed(key);
        let entry = inner.map.entry(key.clone()).or_insert_with(|| Entry { value: Value::Stream(Stream::new()), expiry: None });
        let stream = entry.value.as_stream_mut().ok_or(CommandError::WrongType)?;
        let id = stream.resolve_id(id_spec, now_millis())?;
        stream.push(id, fields);
        Ok(id)
    }

    pub fn xrange(
        &self,
        key: &Bytes,
        start: RangeBound,
        end: RangeBound,
        count: Option<i64>,
    ) -> Result<Option<Vec<StreamEntry>>, CommandError> {
        let mut inner = self.inner.lock();
        let stream = match inner.get(key) {
            None => return Ok(Some(Vec::new())),
            Some(e) => match e.value.as_stream() {
                Some(s) => s,
                None => return Ok(Some(Vec::new())),
            },
        };
        Ok(stream.range(start, end, count).map(|s| s.to_vec()))
    }

    // ---- sets --------------------------------------------------------------

    pub fn sadd(&self, key: &Bytes, members: Vec<Bytes>) -> Result<usize, CommandError> {
        let mut inner = self.inner.lock();
        inner.expire_if_needed(key);
        let entry = inner.map.entry(key.clone()).or_insert_with(|| Entry { value: Value::Set(OrderedSet::new()), expiry: None });
        let set = entry.value.as_set_mut().ok_or(CommandError::WrongType)?;
        let mut added = 0;
        for m in members {
            if set.add(m) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn scard(&self, key: &Bytes) -> Result<usize, CommandError> {
        let mut inner = self.inner.lock();
        match inner.get(key) {
            None => Ok(0),
            Some(e) => e.value.as_set().map(|s| s.len()).ok_or(CommandError::WrongType),
        }
    }

    fn load_set(&self, inner: &mut StoreInner, key: &Bytes, required: bool) -> Result<OrderedSet, CommandError> {
        match inner.get(key) {
            None => Ok(OrderedSet::new()),
            Some(e) => match e.value.as_set() {
                Some(s) => Ok(s.clone()),
                None if required => Err(CommandError::WrongType),
                None => Ok(OrderedSet::new()),
            },
        }
    }

    pub fn sdiff(&self, keys: &[Bytes]) -> Result<OrderedSet, CommandError> {
        let mut inner = self.inner.lock();
        let mut acc = self.load_set(&mut inner, &keys[0], true)?;
        for k in &keys[1..] {
            let other = self.load_set(&mut inner, k, false)?;
            acc = acc.difference_with(&other);
        }
        Ok(acc)
    }

    pub fn sinter(&self, keys: &[Bytes]) -> Result<OrderedSet, CommandError> {
        let mut inner = self.inner.lock();
        let mut acc = self.load_set(&mut inner, &keys[0], true)?;
        for k in &keys[1..] {
            let other = self.load_set(&mut inner, k, false)?;
            acc = acc.intersect_with(&other);
        }
        Ok(acc)
    }

    pub fn sunion(&self, keys: &[Bytes]) -> Result<OrderedSet, CommandError> {
        let mut inner = self.inner.lock();
        let mut acc = OrderedSet::new();
        for k in keys {
            let other = self.load_set(&mut inner, k, false)?;
            acc = acc.union_with(&other);
        }
        Ok(acc)
    }

    pub fn overwrite_set(&self, key: &Bytes, set: OrderedSet) -> usize {
        let mut inner = self.inner.lock();
        let len = set.len();
        inner.map.insert(key.clone(), Entry { value: Value::Set(set), expiry: None });
        len
    }

    pub fn sismember(&self, key: &Bytes, member: &Bytes) -> bool {
        let mut inner = self.inner.lock();
        inner.get(key).and_then(|e| e.value.as_set()).map(|s| s.contains(member)).unwrap_or(false)
    }

    pub fn smembers(&self, key: &Bytes) -> Result<Vec<Bytes>, CommandError> {
        let mut inner = self.inner.lock();
        match inner.get(key) {
            None => Ok(Vec::new()),
            Some(e) => e.value.as_set().map(|s| s.iter().cloned().collect()).ok_or(CommandError::WrongType),
        }
    }

    pub fn srem(&self, key: &Bytes, members: &[Bytes]) -> Result<usize, CommandError> {
        let mut inner = self.inner.lock();
        let set = match inner.get_mut(key) {
            None => return Ok(0),
            Some(e) => e.value.as_set_mut().ok_or(CommandError::WrongType)?,
        };
        let mut removed = 0;
        for m in members {
            if set.remove(m) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn smove(&self, src: &Bytes, dst: &Bytes, member: &Bytes) -> Result<bool, CommandError> {
        let mut inner = self.inner.lock();
        // type-check destination first, without mutating, so a WRONGTYPE on
        // dst never partially removes the member from src.
        if let Some(e) = inner.get(dst) {
            if e.value.as_set().is_none() {
                return Err(CommandError::WrongType);
            }
        }
        let removed = match inner.get_mut(src) {
            None => false,
            Some(e) => {
                let set = e.value.as_set_mut().ok_or(CommandError::WrongType)?;
                set.remove(member)
            }
        };
        if !removed {
            return Ok(false);
        }
        let entry = inner.map.entry(dst.clone()).or_insert_with(|| Entry { value: Value::Set(OrderedSet::new()), expiry: None });
        let dst_set = entry.value.as_set_mut().ok_or(CommandError::WrongType)?;
        dst_set.add(member.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passive_expiry_removes_key_on_access() {
        let store = Store::new();
        store.set_string(Bytes::from_static(b"k"), Bytes::from_static(b"v"), Some(now_secs() - 1));
        assert_eq!(store.get_string(&Bytes::from_static(b"k")).unwrap(), None);
        assert!(!store.exists(&Bytes::from_static(b"k")));
    }

    #[test]
    fn rpush_then_lrange_full_matches_argument_order() {
        let store = Store::new();
        let key = Bytes::from_static(b"k");
        store.rpush(&key, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]).unwrap();
        let out = store.lrange(&key, 0, -1).unwrap();
        assert_eq!(out, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
    }

    #[test]
    fn lpush_reverses_argument_order() {
        let store = Store::new();
        let key = Bytes::from_static(b"k");
        store.lpush(&key, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b"), Bytes::from_static(b"c")]).unwrap();
        let out = store.lrange(&key, 0, -1).unwrap();
        assert_eq!(out, vec![Bytes::from_static(b"c"), Bytes::from_static(b"b"), Bytes::from_static(b"a")]);
    }

    #[test]
    fn wrongtype_on_get_of_list_key() {
        let store = Store::new();
        let key = Bytes::from_static(b"k");
        store.rpush(&key, vec![Bytes::from_static(b"a")]).unwrap();
        assert_eq!(store.get_string(&key).unwrap_err(), CommandError::WrongType);
    }

    #[test]
    fn sadd_is_idempotent_in_added_count() {
        let store = Store::new();
        let key = Bytes::from_static(b"k");
        assert_eq!(store.sadd(&key, vec![Bytes::from_static(b"a"), Bytes::from_static(b"a")]).unwrap(), 1);
        assert_eq!(store.sadd(&key, vec![Bytes::from_static(b"a")]).unwrap(), 0);
    }

    #[test]
    fn expire_nx_only_applies_to_persistent_keys() {
        let store = Store::new();
        let key = Bytes::from_static(b"k");
        store.set_string(key.clone(), Bytes::from_static(b"v"), None);
        assert!(store.expire(&key, now_secs() + 10, Some("NX")));
        assert!(!store.expire(&key, now_secs() + 20, Some("NX")));
    }
}
