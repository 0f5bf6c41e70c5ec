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

//! An insertion-ordered set of byte strings backing the `Set` value
//! variant and SADD/SDIFF/SINTER/SUNION and friends.
//!
//! Grounded on the Python original's `app/utils/ordered_set.py`, which
//! pairs a dict (for O(1) membership) with insertion order; here
//! `indexmap::IndexSet` gives both for free, the same way the broader
//! corpus (e.g. spineldb) reaches for `indexmap` wherever order-preserving
//! set/map semantics are needed instead of hand-rolling one.

use bytes::Bytes;
use indexmap::IndexSet;

#[derive(Debug, Clone, Default)]
pub struct OrderedSet {
    inner: IndexSet<Bytes>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `member` was newly inserted.
    pub fn add(&mut self, member: Bytes) -> bool {
        self.inner.insert(member)
    }

    /// Returns `true` if `member` was present and removed. Uses
    /// `shift_remove` rather than `swap_remove` so the relative order of
    /// the remaining members is preserved.
    pub fn remove(&mut self, member: &Bytes) -> bool {
        self.inner.shift_remove(member)
    }

    pub fn contains(&self, member: &Bytes) -> bool {
        self.inner.contains(member)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.inner.iter()
    }

    pub fn into_vec(self) -> Vec<Bytes> {
        self.inner.into_iter().collect()
    }

    /// SUNION: append every element of `other` not already present, in
    /// `other`'s order, after `self`'s existing elements.
    pub fn union_with(&self, other: &OrderedSet) -> OrderedSet {
        let mut out = self.clone();
        for m in other.iter() {
            out.add(m.clone());
        }
        out
    }

    /// SINTER: retain only members of `self` also present in `other`,
    /// preserving `self`'s insertion order.
    pub fn intersect_with(&self, other: &OrderedSet) -> OrderedSet {
        let mut out = self.clone();
        out.inner.retain(|m| other.contains(m));
        out
    }

    /// SDIFF: members of `self` absent from `other`, preserving `self`'s
    /// insertion order.
    pub fn difference_with(&self, other: &OrderedSet) -> OrderedSet {
        let mut out = self.clone();
        out.inner.retain(|m| !other.contains(m));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> OrderedSet {
        let mut s = OrderedSet::new();
        for i in items {
            s.add(Bytes::copy_from_slice(i.as_bytes()));
        }
        s
    }

    #[test]
    fn add_is_idempotent() {
        let mut s = set(&["a"]);
        assert!(!s.add(Bytes::from_static(b"a")));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn intersection_preserves_left_order() {
        let a = set(&["c", "a", "b"]);
        let b = set(&["a", "b"]);
        let i = a.intersect_with(&b);
        assert_eq!(i.into_vec(), vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
    }

    #[test]
    fn union_appends_new_members_in_order() {
        let a = set(&["a", "b"]);
        let b = set(&["b", "c"]);
        let u = a.union_with(&b);
        assert_eq!(
            u.into_vec(),
            vec![Bytes::from_static(b"a"), Bytes::from_static(b"b"), Bytes::from_static(b"c")]
        );
    }

    #[test]
    fn remove_preserves_order_of_remaining() {
        let mut s = set(&["a", "b", "c"]);
        s.remove(&Bytes::from_static(b"b"));
        assert_eq!(s.into_vec(), vec![Bytes::from_static(b"a"), Bytes::from_static(b"c")]);
    }
}
