//! Per-connection state machine driving one client through
//! READING → REPLYING → CLOSING, possibly many times over a long-lived connection.

use crate::accumulator::{Accumulator, Feed};
use crate::error::LogResult;
use crate::log_store::LogStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Why a [`ClientSession`] stopped running.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The peer closed the connection (read returned `Ok(0)`).
    PeerClosed,
    /// A socket I/O error ended the session.
    IoError,
}

/// Owns one accepted socket, one [`Accumulator`], and one reusable read buffer for the
/// lifetime of a connection.
///
/// Corresponds to one entry in [`crate::server::ConnectionServer`]'s session table; the
/// generalized replacement for the original's intrusive linked list of pthread IDs.
pub struct ClientSession {
    stream: TcpStream,
    peer: SocketAddr,
    accumulator: Accumulator,
    read_buf: Vec<u8>,
}

impl ClientSession {
    /// Takes ownership of an accepted socket, ready to run its READING/REPLYING loop.
    pub fn new(stream: TcpStream, peer: SocketAddr, read_chunk_size: usize) -> Self {
        Self {
            stream,
            peer,
            accumulator: Accumulator::new(),
            read_buf: vec![0u8; read_chunk_size],
        }
    }

    /// Runs the session to completion: repeatedly reads from the socket, committing
    /// completed commands to `store` and echoing the full log back after each one, until
    /// the peer disconnects, a socket error occurs, or `store`'s commit/read path fails.
    pub async fn run(mut self, store: Arc<LogStore>) -> SessionOutcome {
        info!(peer = %self.peer, "session opened");

        loop {
            match self.read_one_command().await {
                ReadOutcome::Command(cmd) => {
                    if let Err(err) = store.commit(cmd).await {
                        warn!(peer = %self.peer, error = %err, "failed to commit command");
                        break SessionOutcome::IoError;
                    }

                    match self.reply(&store).await {
                        Ok(()) => continue,
                        Err(err) => {
                            warn!(peer = %self.peer, error = %err, "failed to reply to client");
                            break SessionOutcome::IoError;
                        }
                    }
                }
                ReadOutcome::Eof => break SessionOutcome::PeerClosed,
                ReadOutcome::Error => break SessionOutcome::IoError,
            }
        }
    }

    /// READING: reads chunks until the accumulator reports a completed command, or the
    /// socket hits EOF or an error first.
    async fn read_one_command(&mut self) -> ReadOutcome {
        loop {
            let n = match self.stream.read(&mut self.read_buf).await {
                Ok(0) => return ReadOutcome::Eof,
                Ok(n) => n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {
                    debug!(peer = %self.peer, "read interrupted, treating as cancellation");
                    return ReadOutcome::Error;
                }
                Err(err) => {
                    warn!(peer = %self.peer, error = %err, "socket read failed");
                    return ReadOutcome::Error;
                }
            };

            match self.accumulator.feed(&self.read_buf[..n]) {
                Feed::Complete(cmd) => return ReadOutcome::Command(cmd),
                Feed::Incomplete => continue,
            }
        }
    }

    /// REPLYING: writes the entire current log back to the client.
    async fn reply(&mut self, store: &LogStore) -> LogResult<()> {
        let snapshot = store.snapshot_read().await?;
        self.stream.write_all(&snapshot).await?;
        Ok(())
    }
}

enum ReadOutcome {
    Command(crate::command::Command),
    Eof,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_command_round_trips_full_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            LogStore::create(dir.path().join("log"), 10)
                .await
                .expect("create store"),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_store = store.clone();
        let server = tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            let session = ClientSession::new(stream, peer, 1024);
            session.run(server_store).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hello\n").await.unwrap();

        let mut response = vec![0u8; 64];
        let n = client.read(&mut response).await.unwrap();
        assert_eq!(&response[..n], b"hello\n");

        drop(client);
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(1), server)
            .await
            .expect("session should finish")
            .expect("task should not panic");
        assert_eq!(outcome, SessionOutcome::PeerClosed);
    }

    #[tokio::test]
    async fn multiple_commands_on_one_connection_each_echo_the_growing_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            LogStore::create(dir.path().join("log"), 10)
                .await
                .expect("create store"),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_store = store.clone();
        tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            let session = ClientSession::new(stream, peer, 1024);
            session.run(server_store).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"a\n").await.unwrap();
        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"a\n");

        client.write_all(b"b\n").await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"a\nb\n");
    }

    #[tokio::test]
    async fn split_chunks_without_terminator_do_not_trigger_a_reply() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            LogStore::create(dir.path().join("log"), 10)
                .await
                .expect("create store"),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_store = store.clone();
        tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            let session = ClientSession::new(stream, peer, 1024);
            session.run(server_store).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hel").await.unwrap();
        client.write_all(b"lo\n").await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello\n");
    }
}
