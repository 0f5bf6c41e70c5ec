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

//! Append-only stream values: monotone `(ms, seq)` entry IDs with
//! explicit / partial-auto / full-auto generation, and inclusive range
//! queries with `-`/`+` sentinel bounds.

use bytes::Bytes;
use indexmap::IndexMap;

use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId { ms: u64::MAX, seq: u64::MAX };

    pub fn to_bytes(self) -> Bytes {
        Bytes::from(format!("{}-{}", self.ms, self.seq))
    }
}

#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: IndexMap<Bytes, Bytes>,
}

#[derive(Debug, Clone, Default)]
pub struct Stream {
    entries: Vec<StreamEntry>,
}

/// The three ID-specification forms XADD accepts.
pub enum IdSpec {
    Explicit(u64, u64),
    PartialAuto(u64),
    FullAuto,
}

fn parse_component(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u64>().ok()
}

pub fn parse_id_spec(raw: &[u8]) -> Result<IdSpec, CommandError> {
    let s = std::str::from_utf8(raw).map_err(|_| CommandError::bad_stream_id())?;
    if s == "*" {
        return Ok(IdSpec::FullAuto);
    }
    match s.split_once('-') {
        None => {
            let ms = parse_component(s).ok_or_else(CommandError::bad_stream_id)?;
            Ok(IdSpec::PartialAuto(ms))
        }
        Some((ms_s, seq_s)) => {
            let ms = parse_component(ms_s).ok_or_else(CommandError::bad_stream_id)?;
            if seq_s == "*" {
                Ok(IdSpec::PartialAuto(ms))
            } else {
                let seq = parse_component(seq_s).ok_or_else(CommandError::bad_stream_id)?;
                Ok(IdSpec::Explicit(ms, seq))
            }
        }
    }
}

/// The bound forms accepted by XRANGE: a raw numeric ID, a bare `ms` with
/// seq implied, or the `-`/`+` sentinels.
pub enum RangeBound {
    Min,
    Max,
    Explicit(u64, u64),
    MsOnly(u64),
}

pub fn parse_range_bound(raw: &[u8]) -> Result<RangeBound, CommandError> {
    let s = std::str::from_utf8(raw).map_err(|_| CommandError::bad_stream_id())?;
    if s == "-" {
        return Ok(RangeBound::Min);
    }
    if s == "+" {
        return Ok(RangeBound::Max);
    }
    match s.split_once('-') {
        None => {
            let ms = parse_component(s).ok_or_else(CommandError::bad_stream_id)?;
            Ok(RangeBound::MsOnly(ms))
        }
        Some((ms_s, seq_s)) => {
            let ms = parse_component(ms_s).ok_or_else(CommandError::bad_stream_id)?;
            let seq = parse_component(seq_s).ok_or_else(CommandError::bad_stream_id)?;
            Ok(RangeBound::Explicit(ms, seq))
        }
    }
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_id(&self) -> Option<StreamId> {
        self.entries.last().map(|e| e.id)
    }

    /// Resolve an `IdSpec` against the current stream state into a concrete,
    /// validated `StreamId`, following the generation rules in full.
    pub fn resolve_id(&self, spec: IdSpec, now_ms: u64) -> Result<StreamId, CommandError> {
        let last = self.last_id();
        let id = match spec {
            IdSpec::Explicit(ms, seq) => {
                let candidate = StreamId { ms, seq };
                if candidate == StreamId::MIN {
                    return Err(CommandError::xadd_zero());
                }
                if let Some(last) = last {
                    if candidate <= last {
                        return Err(CommandError::xadd_not_greater());
                    }
                }
                candidate
            }
            IdSpec::PartialAuto(ms) => {
                let seq = match last {
                    Some(last) if ms == last.ms => last.seq + 1,
                    Some(last) if ms < last.ms => return Err(CommandError::xadd_not_greater()),
                    _ => {
                        if ms == 0 {
                            1
                        } else {
                            0
                        }
                    }
                };
                let candidate = StreamId { ms, seq };
                if candidate == StreamId::MIN {
                    return Err(CommandError::xadd_zero());
                }
                candidate
            }
            IdSpec::FullAuto => {
                let ms = now_ms;
                let seq = match last {
                    Some(last) if ms == last.ms => last.seq + 1,
                    Some(last) if ms < last.ms => {
                        // clock moved backwards relative to the stream; keep it monotone
                        return Ok(StreamId { ms: last.ms, seq: last.seq + 1 });
                    }
                    _ => 0,
                };
                StreamId { ms, seq }
            }
        };
        Ok(id)
    }

    pub fn push(&mut self, id: StreamId, fields: IndexMap<Bytes, Bytes>) {
        self.entries.push(StreamEntry { id, fields });
    }

    fn resolve_lower(bound: RangeBound) -> StreamId {
        match bound {
            RangeBound::Min => StreamId::MIN,
            RangeBound::Max => StreamId::MAX,
            RangeBound::Explicit(ms, seq) => StreamId { ms, seq },
            RangeBound::MsOnly(ms) => StreamId { ms, seq: 0 },
        }
    }

    fn resolve_upper(&self, bound: RangeBound) -> StreamId {
        match bound {
            RangeBound::Min => StreamId::MIN,
            RangeBound::Max => StreamId::MAX,
            RangeBound::Explicit(ms, seq) => StreamId { ms, seq },
            RangeBound::MsOnly(ms) => {
                let max_seq_at_ms = self
                    .entries
                    .iter()
                    .filter(|e| e.id.ms == ms)
                    .map(|e| e.id.seq)
                    .max()
                    .unwrap_or(0);
                StreamId { ms, seq: max_seq_at_ms }
            }
        }
    }

    pub fn range(&self, start: RangeBound, end: RangeBound, count: Option<i64>) -> Option<&[StreamEntry]> {
        if let Some(c) = count {
            if c <= 0 {
                return None;
            }
        }
        let lo = Self::resolve_lower(start);
        let hi = self.resolve_upper(end);
        let first = self.entries.partition_point(|e| e.id < lo);
        let last = self.entries.partition_point(|e| e.id <= hi);
        if first >= last {
            return Some(&[]);
        }
        let slice = &self.entries[first..last];
        Some(match count {
            Some(c) => &slice[..slice.len().min(c as usize)],
            None => slice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idb(ms: u64, seq: u64) -> StreamId {
        StreamId { ms, seq }
    }

    #[test]
    fn explicit_zero_zero_is_rejected() {
        let s = Stream::new();
        let err = s.resolve_id(IdSpec::Explicit(0, 0), 0).unwrap_err();
        assert_eq!(err, CommandError::xadd_zero());
    }

    #[test]
    fn partial_auto_on_empty_stream_at_ms_zero_starts_at_one() {
        let s = Stream::new();
        let id = s.resolve_id(IdSpec::PartialAuto(0), 0).unwrap();
        assert_eq!(id, idb(0, 1));
    }

    #[test]
    fn partial_auto_increments_seq_when_ms_matches_last() {
        let mut s = Stream::new();
        s.push(idb(5, 3), IndexMap::new());
        let id = s.resolve_id(IdSpec::PartialAuto(5), 0).unwrap();
        assert_eq!(id, idb(5, 4));
    }

    #[test]
    fn explicit_must_be_strictly_greater_than_last() {
        let mut s = Stream::new();
        s.push(idb(5, 3), IndexMap::new());
        let err = s.resolve_id(IdSpec::Explicit(5, 3), 0).unwrap_err();
        assert_eq!(err, CommandError::xadd_not_greater());
    }

    #[test]
    fn range_with_nonpositive_count_is_none() {
        let s = Stream::new();
        assert!(s.range(RangeBound::Min, RangeBound::Max, Some(0)).is_none());
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let mut s = Stream::new();
        s.push(idb(1, 0), IndexMap::new());
        s.push(idb(2, 0), IndexMap::new());
        s.push(idb(3, 0), IndexMap::new());
        let r = s.range(RangeBound::Explicit(1, 0), RangeBound::Explicit(2, 0), None).unwrap();
        assert_eq!(r.len(), 2);
    }
}
