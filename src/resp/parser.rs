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

//! Request-side decoding: RESP arrays-of-bulk-strings, plus the inline
//! command fallback for interactive clients (e.g. `nc`/`telnet`).

use bytes::Bytes;

/// Mirrors the teacher's `protocol::ParseError` enum shape, trimmed to the
/// cases a RESP2 decoder can actually hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer doesn't yet hold a complete frame; wait for more bytes.
    NotEnough,
    /// The frame is malformed beyond repair; the connection must close.
    BadPacket,
}

type ParseResult<T> = Result<T, ParseError>;

/// Find the next CRLF starting at `pos`. Returns the index of the `\r`.
fn find_crlf(buf: &[u8], pos: usize) -> Option<usize> {
    if pos >= buf.len() {
        return None;
    }
    buf[pos..].windows(2).position(|w| w == b"\r\n").map(|i| pos + i)
}

/// Read a CRLF-terminated line starting at `pos`. Returns `(line, next_pos)`.
fn read_line(buf: &[u8], pos: usize) -> ParseResult<(&[u8], usize)> {
    match find_crlf(buf, pos) {
        Some(end) => Ok((&buf[pos..end], end + 2)),
        None => Err(ParseError::NotEnough),
    }
}

fn parse_i64(bytes: &[u8]) -> ParseResult<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(ParseError::BadPacket)
}

/// Parse a single `$<len>\r\n<bytes>\r\n` bulk string starting at `pos`,
/// where `pos` already points just past the leading `$`.
fn parse_bulk(buf: &[u8], pos: usize) -> ParseResult<(Bytes, usize)> {
    let (len_line, after_len) = read_line(buf, pos)?;
    let len = parse_i64(len_line)?;
    if len < 0 {
        return Err(ParseError::BadPacket);
    }
    let len = len as usize;
    let data_end = after_len + len;
    if buf.len() < data_end + 2 {
        return Err(ParseError::NotEnough);
    }
    if &buf[data_end..data_end + 2] != b"\r\n" {
        return Err(ParseError::BadPacket);
    }
    Ok((Bytes::copy_from_slice(&buf[after_len..data_end]), data_end + 2))
}

/// Parse the `*<n>\r\n` prefixed multi-bulk array request form.
fn parse_multibulk(buf: &[u8]) -> ParseResult<(Vec<Bytes>, usize)> {
    let (count_line, mut pos) = read_line(buf, 1)?;
    let count = parse_i64(count_line)?;
    if count <= 0 {
        return Ok((Vec::new(), pos));
    }
    let mut argv = Vec::with_capacity(count as usize);
    for _ in 0..count {
        if pos >= buf.len() {
            return Err(ParseError::NotEnough);
        }
        if buf[pos] != b'$' {
            return Err(ParseError::BadPacket);
        }
        let (item, next) = parse_bulk(buf, pos + 1)?;
        argv.push(item);
        pos = next;
    }
    Ok((argv, pos))
}

/// Parse a single line of whitespace-separated tokens, Redis's "inline
/// command" fallback for clients that don't speak full RESP framing.
fn parse_inline(buf: &[u8]) -> ParseResult<(Vec<Bytes>, usize)> {
    let (line, next) = read_line(buf, 0)?;
    let argv = line
        .split(|b| *b == b' ' || *b == b'\t')
        .filter(|tok| !tok.is_empty())
        .map(Bytes::copy_from_slice)
        .collect();
    Ok((argv, next))
}

/// Attempt to parse one complete command out of `buf`.
///
/// Returns `Ok((argv, consumed))` where `consumed` bytes should be dropped
/// from the caller's read buffer, `Err(NotEnough)` if the caller should
/// read more bytes and retry, or `Err(BadPacket)` if the connection must
/// be closed.
pub fn parse_frame(buf: &[u8]) -> ParseResult<(Vec<Bytes>, usize)> {
    if buf.is_empty() {
        return Err(ParseError::NotEnough);
    }
    if buf[0] == b'*' {
        parse_multibulk(buf)
    } else {
        parse_inline(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_multibulk() {
        let buf = b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
        let (argv, consumed) = parse_frame(buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(argv, vec![Bytes::from_static(b"GET"), Bytes::from_static(b"foo")]);
    }

    #[test]
    fn reports_not_enough_on_partial_frame() {
        let buf = b"*2\r\n$3\r\nGET\r\n$3\r\nfo";
        assert_eq!(parse_frame(buf), Err(ParseError::NotEnough));
    }

    #[test]
    fn parses_inline_command() {
        let buf = b"PING\r\n";
        let (argv, consumed) = parse_frame(buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(argv, vec![Bytes::from_static(b"PING")]);
    }

    #[test]
    fn rejects_negative_bulk_length() {
        let buf = b"*1\r\n$-5\r\n";
        assert_eq!(parse_frame(buf), Err(ParseError::BadPacket));
    }

    #[test]
    fn pipelined_frames_each_consume_exactly_their_own_bytes() {
        let buf = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
        let (argv1, consumed1) = parse_frame(buf).unwrap();
        assert_eq!(argv1, vec![Bytes::from_static(b"PING")]);
        let (argv2, consumed2) = parse_frame(&buf[consumed1..]).unwrap();
        assert_eq!(argv2, vec![Bytes::from_static(b"PING")]);
        assert_eq!(consumed1 + consumed2, buf.len());
    }
}
