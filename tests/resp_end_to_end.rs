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

//! End-to-end tests driving a real bound `TcpListener` over the RESP wire,
//! exercising the scenarios named in the design's testable-properties
//! section: basic request/reply, TTL expiry, BLPOP ordering, streams,
//! and SHUTDOWN waking a blocked waiter.

use std::time::Duration;

use embercache::config::Config;
use embercache::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    // bind on an ephemeral port ourselves first so the test can learn the
    // address, then hand the listener's port to a fresh Server.
    let probe = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = probe.local_addr().unwrap();
    drop(probe);

    let config = Config {
        bind: "127.0.0.1".parse().unwrap(),
        port: addr.port(),
        debug: false,
        max_connections: 100,
    };
    let handle = tokio::spawn(async move {
        let server = Server::new(config);
        let _ = server.run().await;
    });
    // give the listener a moment to bind
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, handle)
}

async fn send(stream: &mut TcpStream, frame: &[u8]) -> Vec<u8> {
    stream.write_all(frame).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await.unwrap();
    buf.truncate(n);
    buf
}

#[tokio::test]
async fn ping_and_echo() {
    let (addr, _h) = spawn_server().await;
    let mut c = TcpStream::connect(addr).await.unwrap();
    let r = send(&mut c, b"*1\r\n$4\r\nPING\r\n").await;
    assert_eq!(r, b"+PONG\r\n");
    let r = send(&mut c, b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n").await;
    assert_eq!(r, b"$2\r\nhi\r\n");
}

#[tokio::test]
async fn set_with_px_then_get_expires() {
    let (addr, _h) = spawn_server().await;
    let mut c = TcpStream::connect(addr).await.unwrap();
    let r = send(&mut c, b"*5\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nPX\r\n$2\r\n20\r\n").await;
    assert_eq!(r, b"+OK\r\n");
    let r = send(&mut c, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await;
    assert_eq!(r, b"$1\r\nv\r\n");
    tokio::time::sleep(Duration::from_millis(50)).await;
    let r = send(&mut c, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await;
    assert_eq!(r, b"$-1\r\n");
}

#[tokio::test]
async fn blpop_unblocked_by_rpush_from_another_connection() {
    let (addr, _h) = spawn_server().await;
    let mut waiter = TcpStream::connect(addr).await.unwrap();
    waiter.write_all(b"*3\r\n$5\r\nBLPOP\r\n$1\r\nq\r\n$1\r\n0\r\n").await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut pusher = TcpStream::connect(addr).await.unwrap();
    let r = send(&mut pusher, b"*3\r\n$5\r\nRPUSH\r\n$1\r\nq\r\n$1\r\nx\r\n").await;
    assert_eq!(r, b":1\r\n");

    let mut buf = vec![0u8; 256];
    let n = tokio::time::timeout(Duration::from_secs(2), waiter.read(&mut buf)).await.unwrap().unwrap();
    buf.truncate(n);
    assert_eq!(buf, b"*2\r\n$1\r\nq\r\n$1\r\nx\r\n");
}

#[tokio::test]
async fn xadd_then_xrange() {
    let (addr, _h) = spawn_server().await;
    let mut c = TcpStream::connect(addr).await.unwrap();
    let r = send(&mut c, b"*5\r\n$4\r\nXADD\r\n$1\r\ns\r\n$3\r\n1-1\r\n$1\r\nf\r\n$1\r\nv\r\n").await;
    assert_eq!(r, b"$3\r\n1-1\r\n");
    let r = send(&mut c, b"*3\r\n$6\r\nXRANGE\r\n$1\r\ns\r\n$1\r\n-\r\n").await;
    let r = String::from_utf8(r).unwrap();
    assert!(r.starts_with("*1\r\n"));
    assert!(r.contains("1-1"));
}

#[tokio::test]
async fn set_algebra_preserves_insertion_order() {
    let (addr, _h) = spawn_server().await;
    let mut c = TcpStream::connect(addr).await.unwrap();
    send(&mut c, b"*4\r\n$4\r\nSADD\r\n$1\r\na\r\n$1\r\nz\r\n$1\r\ny\r\n").await;
    let r = send(&mut c, b"*2\r\n$7\r\nSMEMBERS\r\n$1\r\na\r\n").await;
    assert_eq!(r, b"*2\r\n$1\r\nz\r\n$1\r\ny\r\n");
}

#[tokio::test]
async fn shutdown_wakes_blocked_waiter_with_null_bulk() {
    let (addr, _h) = spawn_server().await;
    let mut waiter = TcpStream::connect(addr).await.unwrap();
    waiter.write_all(b"*3\r\n$5\r\nBLPOP\r\n$1\r\nq\r\n$1\r\n0\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut admin = TcpStream::connect(addr).await.unwrap();
    admin.write_all(b"*1\r\n$8\r\nSHUTDOWN\r\n").await.unwrap();

    let mut buf = vec![0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(2), waiter.read(&mut buf)).await.unwrap().unwrap();
    buf.truncate(n);
    // the waiter's oneshot sender is dropped (not fulfilled) by the
    // shutdown wakeup, so its pending BLPOP resolves to a null bulk reply
    assert_eq!(buf, b"$-1\r\n");
}
