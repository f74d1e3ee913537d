//! Accept loop and session table.
//!
//! Grounded on this codebase's `NetworkServerActor::run`: a `tokio::select!` over
//! `listener.accept()` plus periodic interval ticks, with one spawned task per accepted
//! connection. Here the second branch drives `Ticker` instead of a heartbeat, and
//! completed session handles are reaped on every loop iteration instead of on a
//! dedicated cleanup interval, since session completion is already visible via
//! `JoinHandle` readiness.

use crate::config::Settings;
use crate::error::LogResult;
use crate::log_store::LogStore;
use crate::session::ClientSession;
use crate::ticker::Ticker;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Accepts connections, spawns one [`ClientSession`] task per connection, and runs the
/// [`Ticker`] alongside them, all sharing one [`LogStore`].
pub struct ConnectionServer {
    listener: TcpListener,
    store: Arc<LogStore>,
    read_chunk_size: usize,
    ticker_period: Duration,
    sessions: Vec<JoinHandle<()>>,
}

impl ConnectionServer {
    /// Binds the listening socket at `settings.port` and opens the backing file,
    /// returning a server ready to [`ConnectionServer::run`].
    pub async fn bind(settings: &Settings) -> LogResult<Self> {
        let addr = format!("0.0.0.0:{}", settings.port);
        let listener = TcpListener::bind(&addr).await?;
        info!(addr = %addr, backlog = settings.backlog, "listening");

        let store = Arc::new(LogStore::create(&settings.file, settings.capacity).await?);

        Ok(Self {
            listener,
            store,
            read_chunk_size: settings.read_chunk_size,
            ticker_period: Duration::from_secs(settings.ticker_period_secs),
            sessions: Vec::new(),
        })
    }

    /// Runs the accept loop until `shutdown` is notified, then joins every still-running
    /// session and removes the backing file.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) -> LogResult<()> {
        let ticker = Ticker::new(self.store.clone(), self.ticker_period);
        let ticker_handle = tokio::spawn(ticker.run(shutdown.clone()));

        let mut shutdown_rx = shutdown;
        loop {
            self.reap_completed_sessions();

            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!(peer = %peer, "connection accepted");
                            let store = self.store.clone();
                            let chunk_size = self.read_chunk_size;
                            let handle = tokio::spawn(async move {
                                let session = ClientSession::new(stream, peer, chunk_size);
                                let outcome = session.run(store).await;
                                info!(peer = %peer, ?outcome, "session closed");
                            });
                            self.sessions.push(handle);
                        }
                        Err(err) => {
                            error!(error = %err, "accept failed");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    info!("shutdown requested, draining sessions");
                    break;
                }
            }
        }

        for handle in self.sessions.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "session task panicked during shutdown drain");
            }
        }

        let _ = ticker_handle.await;

        if let Err(err) = self.store.remove_file().await {
            warn!(error = %err, "failed to remove backing file on shutdown");
        }

        Ok(())
    }

    fn reap_completed_sessions(&mut self) {
        self.sessions.retain(|handle| !handle.is_finished());
    }

    /// Local address of the bound listening socket. Mainly useful in tests that bind to
    /// port 0 and need to discover which port the OS assigned.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn test_settings(port: u16, file: std::path::PathBuf) -> Settings {
        let mut settings = Settings::default();
        settings.port = port;
        settings.file = file;
        settings.ticker_period_secs = 3600; // keep the ticker quiet for this test
        settings
    }

    #[tokio::test]
    async fn accepts_a_connection_and_echoes_a_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Port 0 lets the OS pick a free port; read it back via local_addr.
        let settings = test_settings(0, dir.path().join("log"));
        let server = ConnectionServer::bind(&settings).await.expect("bind");
        let addr = server.listener.local_addr().expect("local_addr");

        let (_tx, rx) = watch::channel(false);
        tokio::spawn(server.run(rx));

        let mut client = TcpStream::connect(addr).await.expect("connect");
        client.write_all(b"hi\n").await.expect("write");
        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.expect("read");
        assert_eq!(&buf[..n], b"hi\n");
    }

    #[tokio::test]
    async fn shutdown_signal_stops_the_accept_loop_and_removes_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("log");
        let settings = test_settings(0, path.clone());
        let server = ConnectionServer::bind(&settings).await.expect("bind");
        assert!(path.exists());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(server.run(rx));

        tx.send(true).expect("send shutdown");
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("server should shut down promptly")
            .expect("task should not panic")
            .expect("run should return Ok");

        assert!(!path.exists());
    }
}
