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

//! The polymorphic per-key value, per the design notes: a tagged variant
//! over string / list / set / stream. Executors inspect the tag and
//! either operate or surface `WRONGTYPE`.

use std::collections::VecDeque;

use bytes::Bytes;

use super::ordered_set::OrderedSet;
use super::stream::Stream;

#[derive(Debug, Clone)]
pub enum Value {
    Str(Bytes),
    List(VecDeque<Bytes>),
    Set(OrderedSet),
    Stream(Stream),
}

/// The name a `TYPE` query reports for each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    None,
    String,
    List,
    Set,
    Stream,
}

impl TypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeName::None => "none",
            TypeName::String => "string",
            TypeName::List => "list",
            TypeName::Set => "set",
            TypeName::Stream => "stream",
        }
    }
}

impl Value {
    pub fn type_name(&self) -> TypeName {
        match self {
            Value::Str(_) => TypeName::String,
            Value::List(_) => TypeName::List,
            Value::Set(_) => TypeName::Set,
            Value::Stream(_) => TypeName::Stream,
        }
    }

    pub fn as_str(&self) -> Option<&Bytes> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&VecDeque<Bytes>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut VecDeque<Bytes>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&OrderedSet> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut OrderedSet> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stream_mut(&mut self) -> Option<&mut Stream> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }
}
