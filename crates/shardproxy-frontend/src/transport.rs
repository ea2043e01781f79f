//! Client transport with writability tracking
//!
//! Writes are buffered per connection and handed to a dedicated writer task on
//! flush. The transport stops reporting itself writable once buffered plus
//! in-flight bytes exceed the high watermark, and the writer task flips it back
//! (and fires the [`WritabilitySignal`]) once it has drained below the low
//! watermark. A socket error marks the transport inactive; from then on every
//! write and flush is a silent no-op because the peer is gone.

use crate::mysql::protocol::MySqlPacket;
use bytes::{Bytes, BytesMut};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outbound side of one client connection, used by a single command turn at a time
pub trait Transport: Send {
    /// Queue a packet; nothing reaches the peer before the next flush
    fn write(&mut self, packet: MySqlPacket) -> std::io::Result<()>;

    /// Hand everything queued so far to the peer
    fn flush(&mut self) -> std::io::Result<()>;

    /// False while the outbound buffer is above its high watermark
    fn is_writable(&self) -> bool;

    /// False once the peer is gone
    fn is_active(&self) -> bool;

    /// Fired on every not-writable to writable transition and on close
    fn writability(&self) -> Arc<WritabilitySignal>;
}

/// Notification owned by the transport's writability observer
#[derive(Debug, Default)]
pub struct WritabilitySignal {
    notify: Notify,
}

impl WritabilitySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the waiter. A notification with nobody waiting is kept for the next wait.
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    /// Block until notified or until `recheck` elapses.
    ///
    /// Returns true when woken by a notification. Either way the caller must
    /// re-check writability; a timeout only guards against a missed notification.
    pub async fn wait(&self, recheck: Duration) -> bool {
        tokio::time::timeout(recheck, self.notify.notified())
            .await
            .is_ok()
    }
}

/// Outbound buffer limits in bytes
#[derive(Debug, Clone, Copy)]
pub struct WriteBufferWatermarks {
    pub high: usize,
    pub low: usize,
}

impl Default for WriteBufferWatermarks {
    fn default() -> Self {
        Self {
            high: 64 * 1024,
            low: 32 * 1024,
        }
    }
}

struct Shared {
    outstanding: AtomicUsize,
    writable: AtomicBool,
    active: AtomicBool,
    signal: Arc<WritabilitySignal>,
    watermarks: WriteBufferWatermarks,
}

impl Shared {
    fn new(watermarks: WriteBufferWatermarks) -> Self {
        Self {
            outstanding: AtomicUsize::new(0),
            writable: AtomicBool::new(true),
            active: AtomicBool::new(true),
            signal: Arc::new(WritabilitySignal::new()),
            watermarks,
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.signal.notify();
    }

    /// Clear the writable flag, then re-check pending bytes. A writer that
    /// drained in between saw the flag still set and did not notify.
    fn mark_unwritable(&self, buffered: usize) {
        self.writable.store(false, Ordering::SeqCst);
        let pending = buffered + self.outstanding.load(Ordering::SeqCst);
        if pending <= self.watermarks.low {
            self.mark_writable();
        }
    }

    /// Called by the writer after `length` bytes reached the socket
    fn drained(&self, length: usize) {
        let remaining = self.outstanding.fetch_sub(length, Ordering::SeqCst) - length;
        if remaining <= self.watermarks.low {
            self.mark_writable();
        }
    }

    fn mark_writable(&self) {
        if !self.writable.swap(true, Ordering::SeqCst) {
            self.signal.notify();
        }
    }
}

/// Transport over any `AsyncWrite`, drained by a background writer task
pub struct ChannelTransport {
    buffer: BytesMut,
    tx: mpsc::UnboundedSender<Bytes>,
    shared: Arc<Shared>,
}

impl ChannelTransport {
    /// Create the transport and spawn its writer task
    pub fn new<W>(writer: W, watermarks: WriteBufferWatermarks) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(watermarks));
        let handle = tokio::spawn(run_writer(writer, rx, shared.clone()));
        let transport = Self {
            buffer: BytesMut::with_capacity(watermarks.low),
            tx,
            shared,
        };
        (transport, handle)
    }

    /// Bytes queued locally plus bytes the writer task has not written yet
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len() + self.shared.outstanding.load(Ordering::SeqCst)
    }

    fn update_writability(&self) {
        if self.pending_bytes() > self.shared.watermarks.high {
            self.shared.mark_unwritable(self.buffer.len());
        }
    }
}

impl Transport for ChannelTransport {
    fn write(&mut self, packet: MySqlPacket) -> std::io::Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        packet.encode(&mut self.buffer);
        self.update_writability();
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        if !self.is_active() {
            self.buffer.clear();
            return Ok(());
        }
        let chunk = self.buffer.split().freeze();
        let length = chunk.len();
        self.shared.outstanding.fetch_add(length, Ordering::SeqCst);
        if self.tx.send(chunk).is_err() {
            // Writer task is gone, so is the peer
            self.shared.outstanding.fetch_sub(length, Ordering::SeqCst);
            self.shared.deactivate();
            return Ok(());
        }
        self.update_writability();
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.shared.writable.load(Ordering::SeqCst)
    }

    fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    fn writability(&self) -> Arc<WritabilitySignal> {
        self.shared.signal.clone()
    }
}

async fn run_writer<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Bytes>, shared: Arc<Shared>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    while let Some(chunk) = rx.recv().await {
        let length = chunk.len();
        let result = async {
            writer.write_all(&chunk).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            if is_disconnect_error(&e) {
                debug!("Client disconnected while writing {} bytes", length);
            } else {
                warn!("Client write failed: {}", e);
            }
            shared.outstanding.store(0, Ordering::SeqCst);
            shared.deactivate();
            return;
        }

        shared.drained(length);
    }

    // Transport dropped: the connection is done
    let _ = writer.shutdown().await;
    shared.deactivate();
}

/// Check if an error indicates client disconnection
pub fn is_disconnect_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::NotConnected
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
    )
}
