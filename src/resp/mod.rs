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

//! RESP2 wire protocol: a streaming-safe decoder that yields one command
//! (argv) per complete frame, and an encoder for the reply types the
//! command executors need to produce.
//!
//! The shape here -- a cursor-position parser returning `(value, consumed)`
//! so the caller can advance its read buffer -- mirrors the teacher's
//! `protocol::Parser`, but everything is done over `&[u8]` slice indices
//! instead of raw pointers: this protocol has no need for the teacher's
//! `unsafe` zero-copy cursor, since frames are small and copied into
//! owned `Bytes` once at decode time.

pub mod parser;
pub mod reply;
pub mod responses;

pub use parser::{parse_frame, ParseError};
pub use reply::Reply;
