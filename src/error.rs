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

//! Error types shared across the store and command executors.

use std::io::Error as IoError;

/// A generic result for top-level, possibly-fatal operations.
pub type TResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// The result of running a single command against the store.
pub type CommandResult<T> = Result<T, CommandError>;

/// A recoverable, client-visible error. Distinct from an `IoError`, which
/// terminates the connection rather than producing a reply frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A fully-formed RESP error line, e.g. `ERR wrong number of arguments for 'get' command`.
    Protocol(String),
    WrongType,
}

impl CommandError {
    pub fn wrong_args(cmd: &str) -> Self {
        Self::Protocol(format!("ERR wrong number of arguments for '{}' command", cmd.to_lowercase()))
    }

    pub fn unknown_command(name: &str) -> Self {
        Self::Protocol(format!("ERR unknown command: {}", name))
    }

    pub fn not_an_integer() -> Self {
        Self::Protocol("ERR value is not an integer or out of range".to_string())
    }

    pub fn syntax() -> Self {
        Self::Protocol("ERR syntax error".to_string())
    }

    pub fn xadd_not_greater() -> Self {
        Self::Protocol(
            "ERR The ID specified in XADD is equal or smaller than the target stream top item"
                .to_string(),
        )
    }

    pub fn xadd_zero() -> Self {
        Self::Protocol("ERR The ID specified in XADD must be greater than 0-0".to_string())
    }

    pub fn bad_stream_id() -> Self {
        Self::Protocol(
            "ERR Invalid stream ID specified as stream command argument".to_string(),
        )
    }

    /// Render as the text that follows the leading `-` in a RESP error frame.
    pub fn as_wire_text(&self) -> String {
        match self {
            Self::Protocol(s) => s.clone(),
            Self::WrongType => {
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string()
            }
        }
    }
}

impl From<&'static str> for CommandError {
    fn from(s: &'static str) -> Self {
        Self::Protocol(s.to_string())
    }
}

/// A fatal, connection-ending error distinct from a client-visible `CommandError`.
#[derive(Debug)]
pub enum ConnectionError {
    Io(IoError),
    Protocol(&'static str),
}

impl From<IoError> for ConnectionError {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for ConnectionError {}
