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

//! Reply-side encoding. A `Reply` is the typed shape of a response frame;
//! `encode` renders it directly onto the connection's write buffer.

use bytes::{BufMut, Bytes, BytesMut};

use super::responses;

#[derive(Debug, Clone)]
pub enum Reply {
    Simple(&'static str),
    SimpleOwned(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    NullBulk,
    Array(Vec<Reply>),
}

impl Reply {
    pub fn bulk(b: impl Into<Bytes>) -> Self {
        Self::Bulk(b.into())
    }

    pub fn ok() -> Self {
        Self::Simple("OK")
    }

    pub fn encode(&self, out: &mut BytesMut) {
        match self {
            Reply::Simple("OK") => out.extend_from_slice(responses::OK),
            Reply::Simple(s) => {
                out.put_u8(b'+');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::SimpleOwned(s) => {
                out.put_u8(b'+');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Error(s) => {
                out.put_u8(b'-');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Integer(0) => out.extend_from_slice(responses::ZERO),
            Reply::Integer(1) => out.extend_from_slice(responses::ONE),
            Reply::Integer(n) => {
                out.put_u8(b':');
                out.extend_from_slice(n.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Bulk(b) => {
                out.put_u8(b'$');
                out.extend_from_slice(b.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(b);
                out.extend_from_slice(b"\r\n");
            }
            Reply::NullBulk => out.extend_from_slice(responses::NULL_BULK),
            Reply::Array(items) if items.is_empty() => out.extend_from_slice(responses::EMPTY_ARRAY),
            Reply::Array(items) => {
                out.put_u8(b'*');
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.encode(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_bulk_string() {
        let mut buf = BytesMut::new();
        Reply::bulk(Bytes::from_static(b"hello")).encode(&mut buf);
        assert_eq!(&buf[..], b"$5\r\nhello\r\n");
    }

    #[test]
    fn encodes_null_bulk() {
        let mut buf = BytesMut::new();
        Reply::NullBulk.encode(&mut buf);
        assert_eq!(&buf[..], b"$-1\r\n");
    }

    #[test]
    fn encodes_nested_array() {
        let mut buf = BytesMut::new();
        Reply::Array(vec![
            Reply::bulk(Bytes::from_static(b"k")),
            Reply::bulk(Bytes::from_static(b"v")),
        ])
        .encode(&mut buf);
        assert_eq!(&buf[..], b"*2\r\n$1\r\nk\r\n$1\r\nv\r\n");
    }

    #[test]
    fn encodes_error() {
        let mut buf = BytesMut::new();
        Reply::Error("ERR boom".into()).encode(&mut buf);
        assert_eq!(&buf[..], b"-ERR boom\r\n");
    }
}
