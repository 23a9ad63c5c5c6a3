//! Authenticated chat session over one transport.
//!
//! # Lifecycle
//!
//! 1. [`Session::establish`] connects and writes `PASS`, `NICK`, `JOIN`
//! 2. The receive loop calls [`Session::receive_chunk`] until EOF or error
//! 3. Any task holding a [`LineSender`] may write lines meanwhile
//! 4. [`Session::close`] shuts the write half; later sends fail with
//!    [`Error::ConnectionClosed`]
//!
//! # Thread Safety
//!
//! Writes go through one async mutex, so each line reaches the wire whole
//! even when the receive loop and the auto-poster send at the same time.
//!
//! # Stalled Peers
//!
//! A line that cannot be written within [`WRITE_TIMEOUT`] fails with
//! [`Error::ConnectionTimeout`] and retires the write half, so a partially
//! written line is never followed by another one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::bot::BotConfig;
use crate::error::{Error, Result};
use crate::protocol::{Command, LINE_TERMINATOR};

use super::connector::{BoxedTransport, Connector};

// ============================================================================
// Constants
// ============================================================================

/// Bytes requested per read.
const READ_CHUNK_SIZE: usize = 2048;

/// Upper bound for writing one line, and for closing the write half.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Write half shared by all senders; `None` once closed.
type WriterSlot = Arc<Mutex<Option<WriteHalf<BoxedTransport>>>>;

// ============================================================================
// LineSender
// ============================================================================

/// Capability to write lines on a session.
///
/// Cheap to clone. Cannot close or replace the connection; after the owning
/// [`Session`] closes, every send returns [`Error::ConnectionClosed`].
#[derive(Clone)]
pub struct LineSender {
    /// Shared write half.
    writer: WriterSlot,
    /// Cleared by [`Session::close`].
    open: Arc<AtomicBool>,
    /// Channel used by [`LineSender::send_chat`].
    channel: Arc<str>,
}

impl fmt::Debug for LineSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSender")
            .field("channel", &self.channel)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl LineSender {
    /// Returns `true` until the session is closed.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Returns the joined channel.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Writes `line` followed by `\r\n`.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if `line` contains `\r` or `\n`
    /// - [`Error::ConnectionClosed`] if the session is closed
    /// - [`Error::ConnectionTimeout`] if the peer stops reading
    /// - [`Error::Io`] if the write fails
    pub async fn send_line(&self, line: &str) -> Result<()> {
        if line.contains(['\r', '\n']) {
            return Err(Error::protocol("outbound line contains a line break"));
        }

        let mut frame = Vec::with_capacity(line.len() + LINE_TERMINATOR.len());
        frame.extend_from_slice(line.as_bytes());
        frame.extend_from_slice(LINE_TERMINATOR);

        let written = timeout(WRITE_TIMEOUT, async {
            let mut slot = self.writer.lock().await;
            let writer = slot.as_mut().ok_or(Error::ConnectionClosed)?;
            writer.write_all(&frame).await?;
            writer.flush().await?;
            Ok::<_, Error>(())
        })
        .await;

        match written {
            Ok(result) => result?,
            Err(_) => {
                self.retire();
                return Err(Error::connection_timeout(
                    u64::try_from(WRITE_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
                ));
            }
        }

        trace!(line = %redact(line), "Line sent");
        Ok(())
    }

    /// Posts `text` to the joined channel.
    ///
    /// # Errors
    ///
    /// Same as [`LineSender::send_line`].
    pub async fn send_chat(&self, text: &str) -> Result<()> {
        let command = Command::PrivMsg {
            channel: &self.channel,
            text,
        };
        self.send_line(&command.to_string()).await
    }

    /// Sends `PASS`, `NICK` and `JOIN` in that order.
    async fn login(&self, config: &BotConfig) -> Result<()> {
        self.send_line(&Command::Pass(&config.token).to_string())
            .await?;
        self.send_line(&Command::Nick(&config.nickname).to_string())
            .await?;
        self.send_line(&Command::Join(&config.channel).to_string())
            .await
    }

    /// Marks the sender closed and drops the write half if it is free.
    ///
    /// A write abandoned mid-line leaves the stream unusable.
    fn retire(&self) {
        self.open.store(false, Ordering::Release);
        if let Ok(mut slot) = self.writer.try_lock() {
            slot.take();
        }
        warn!(channel = %self.channel, "Write stalled, connection retired");
    }
}

// ============================================================================
// Session
// ============================================================================

/// One authenticated connection.
///
/// Owned by the receive loop. Other tasks get a [`LineSender`].
pub struct Session {
    /// Read half, used only by the receive loop.
    reader: ReadHalf<BoxedTransport>,
    /// Shared write capability.
    sender: LineSender,
    /// Scratch buffer for reads.
    read_buf: Box<[u8]>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connects and performs the login handshake.
    ///
    /// # Errors
    ///
    /// Returns the connector's error, or [`Error::Handshake`] if any
    /// handshake line cannot be written.
    pub async fn establish(connector: &dyn Connector, config: &BotConfig) -> Result<Self> {
        let transport = connector.connect(&config.server).await?;
        let session = Self::from_transport(transport, &config.channel);

        if let Err(e) = session.sender.login(config).await {
            session.close().await;
            return Err(Error::handshake(e.to_string()));
        }

        debug!(channel = %config.channel, nickname = %config.nickname, "Handshake sent");
        Ok(session)
    }

    /// Wraps an already connected transport without sending anything.
    pub fn from_transport(transport: BoxedTransport, channel: &str) -> Self {
        let (reader, writer) = tokio::io::split(transport);

        Self {
            reader,
            sender: LineSender {
                writer: Arc::new(Mutex::new(Some(writer))),
                open: Arc::new(AtomicBool::new(true)),
                channel: Arc::from(channel),
            },
            read_buf: vec![0; READ_CHUNK_SIZE].into_boxed_slice(),
        }
    }

    /// Returns a send capability for this session.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> LineSender {
        self.sender.clone()
    }

    /// Writes one line. See [`LineSender::send_line`].
    ///
    /// # Errors
    ///
    /// Same as [`LineSender::send_line`].
    pub async fn send_line(&self, line: &str) -> Result<()> {
        self.sender.send_line(line).await
    }

    /// Posts to the joined channel. See [`LineSender::send_chat`].
    ///
    /// # Errors
    ///
    /// Same as [`LineSender::send_line`].
    pub async fn send_chat(&self, text: &str) -> Result<()> {
        self.sender.send_chat(text).await
    }

    /// Waits for the next bytes from the server.
    ///
    /// Returns `Ok(None)` at end of stream. Cancel-safe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the read fails.
    pub async fn receive_chunk(&mut self) -> Result<Option<&[u8]>> {
        let n = self.reader.read(&mut self.read_buf).await?;
        if n == 0 {
            return Ok(None);
        }

        trace!(bytes = n, "Chunk received");
        Ok(Some(&self.read_buf[..n]))
    }

    /// Closes the connection.
    ///
    /// Waits up to [`WRITE_TIMEOUT`] for an in-flight write, then shuts the
    /// write half. Outstanding [`LineSender`]s turn into no-ops that return
    /// [`Error::ConnectionClosed`].
    pub async fn close(self) {
        self.sender.open.store(false, Ordering::Release);

        let closed = timeout(WRITE_TIMEOUT, async {
            let writer = self.sender.writer.lock().await.take();
            if let Some(mut writer) = writer
                && let Err(e) = writer.shutdown().await
            {
                debug!(error = %e, "Transport shutdown failed");
            }
        })
        .await;

        if closed.is_err() {
            warn!("Transport shutdown timed out, dropping connection");
        }

        debug!("Session closed");
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Hides the credential in `PASS` lines.
fn redact(line: &str) -> &str {
    if line.starts_with("PASS ") {
        "PASS ***"
    } else {
        line
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};

    use crate::bot::ServerConfig;

    struct OneShot(std::sync::Mutex<Option<DuplexStream>>);

    #[async_trait]
    impl Connector for OneShot {
        async fn connect(&self, _server: &ServerConfig) -> Result<BoxedTransport> {
            let stream = self.0.lock().expect("lock").take().ok_or(Error::ConnectionClosed)?;
            Ok(Box::new(stream))
        }
    }

    fn config() -> BotConfig {
        BotConfig::builder()
            .nickname("bot1")
            .token("oauth:secret")
            .channel("#chan")
            .build_config()
            .expect("valid config")
    }

    fn pair() -> (Session, DuplexStream) {
        let (client, server) = tokio::io::duplex(4096);
        (Session::from_transport(Box::new(client), "#chan"), server)
    }

    async fn read_line(reader: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.expect("read");
        line
    }

    #[tokio::test]
    async fn test_establish_sends_handshake_in_order() {
        let (client, server) = tokio::io::duplex(4096);
        let connector = OneShot(std::sync::Mutex::new(Some(client)));

        let session = Session::establish(&connector, &config())
            .await
            .expect("handshake");
        assert!(session.sender().is_open());

        let mut reader = BufReader::new(server);
        assert_eq!(read_line(&mut reader).await, "PASS oauth:secret\r\n");
        assert_eq!(read_line(&mut reader).await, "NICK bot1\r\n");
        assert_eq!(read_line(&mut reader).await, "JOIN #chan\r\n");
    }

    #[tokio::test]
    async fn test_handshake_bytes_on_the_wire() {
        let mock = tokio_test::io::Builder::new()
            .write(b"PASS oauth:secret\r\n")
            .write(b"NICK bot1\r\n")
            .write(b"JOIN #chan\r\n")
            .build();

        let session = Session::from_transport(Box::new(mock), "#chan");
        session.sender().login(&config()).await.expect("handshake");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_times_out_and_retires_sender() {
        let (client, _server) = tokio::io::duplex(16);
        let session = Session::from_transport(Box::new(client), "#chan");
        let sender = session.sender();

        let started = tokio::time::Instant::now();
        let err = sender
            .send_line(&"x".repeat(256))
            .await
            .expect_err("peer never reads");
        assert!(matches!(err, Error::ConnectionTimeout { .. }));
        assert!(err.is_connection_error());
        assert!(started.elapsed() >= WRITE_TIMEOUT);

        assert!(!sender.is_open());
        let err = sender.send_line("next").await.expect_err("retired");
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_does_not_wait_on_stalled_writer() {
        let (client, _server) = tokio::io::duplex(16);
        let session = Session::from_transport(Box::new(client), "#chan");
        let sender = session.sender();

        let stalled = tokio::spawn(async move { sender.send_line(&"x".repeat(256)).await });
        tokio::task::yield_now().await;

        let started = tokio::time::Instant::now();
        session.close().await;
        assert!(started.elapsed() <= WRITE_TIMEOUT + Duration::from_millis(5));

        assert!(stalled.await.expect("send task").is_err());
    }

    #[tokio::test]
    async fn test_establish_reports_connect_failure() {
        let connector = OneShot(std::sync::Mutex::new(None));
        let err = Session::establish(&connector, &config())
            .await
            .expect_err("no stream available");
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_establish_reports_handshake_write_failure() {
        let (client, server) = tokio::io::duplex(4096);
        drop(server);
        let connector = OneShot(std::sync::Mutex::new(Some(client)));

        let err = Session::establish(&connector, &config())
            .await
            .expect_err("peer is gone");
        assert!(matches!(err, Error::Handshake { .. }));
    }

    #[tokio::test]
    async fn test_send_chat_format() {
        let (session, server) = pair();
        session.send_chat("Hello, alice!").await.expect("send");

        let mut reader = BufReader::new(server);
        assert_eq!(read_line(&mut reader).await, "PRIVMSG #chan :Hello, alice!\r\n");
    }

    #[tokio::test]
    async fn test_send_line_rejects_line_breaks() {
        let (session, _server) = pair();
        let err = session
            .send_line("PRIVMSG #chan :a\r\nQUIT")
            .await
            .expect_err("injection");
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(!err.is_connection_error());
    }

    #[tokio::test]
    async fn test_receive_chunk_and_eof() {
        let (mut session, mut server) = pair();
        server.write_all(b"PING :tmi.twitch.tv\r\n").await.expect("write");

        let chunk = session.receive_chunk().await.expect("read").map(<[u8]>::to_vec);
        assert_eq!(chunk.as_deref(), Some(&b"PING :tmi.twitch.tv\r\n"[..]));

        drop(server);
        assert!(session.receive_chunk().await.expect("eof").is_none());
    }

    #[tokio::test]
    async fn test_send_after_close_is_connection_closed() {
        let (session, _server) = pair();
        let sender = session.sender();
        session.close().await;

        assert!(!sender.is_open());
        let err = sender.send_chat("late").await.expect_err("closed");
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_concurrent_sends_do_not_interleave() {
        let (session, server) = pair();
        let a = session.sender();
        let b = session.sender();
        let long_a = "a".repeat(3000);
        let long_b = "b".repeat(3000);

        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(server);
            let mut lines = Vec::new();
            for _ in 0..20 {
                lines.push(read_line(&mut reader).await);
            }
            lines
        });

        let (ra, rb) = tokio::join!(
            async {
                for _ in 0..10 {
                    a.send_line(&long_a).await?;
                }
                Ok::<_, Error>(())
            },
            async {
                for _ in 0..10 {
                    b.send_line(&long_b).await?;
                }
                Ok::<_, Error>(())
            },
        );
        ra.expect("sender a");
        rb.expect("sender b");

        let lines = reader_task.await.expect("reader");
        for line in lines {
            let body = line.trim_end_matches("\r\n");
            assert!(body == long_a || body == long_b, "interleaved line");
        }
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("PASS oauth:secret"), "PASS ***");
        assert_eq!(redact("NICK bot1"), "NICK bot1");
    }
}
