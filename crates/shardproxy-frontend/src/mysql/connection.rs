//! Per-connection command loop
//!
//! Reads client frames one at a time and runs each through a
//! `CommandExecutor`. A turn finishes (reply flushed, backend connection
//! released) before the next frame is read, so replies leave in request order
//! and the backend connection is never shared by two turns.
//!
//! The stream handed in is already authenticated; the handshake happens elsewhere.

use super::config::FrontendConfig;
use super::executor::{CommandExecutor, TurnOutcome};
use super::protocol::constants::{COM_QUIT, FRAME_HEADER_LENGTH};
use crate::backend::BackendConnection;
use crate::hook::{InvocationHook, MetricsInvokeHook};
use crate::transport::{is_disconnect_error, ChannelTransport, Transport};
use bytes::{BufMut, Bytes, BytesMut};
use shardproxy_common::{ProxyError, Result};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Builds the invocation hook for each turn
pub type HookFactory = Arc<dyn Fn() -> Box<dyn InvocationHook> + Send + Sync>;

/// Read one frame: 3 byte payload length, sequence id, payload.
///
/// Returns the sequence id byte followed by the payload, or `None` once the
/// client has closed its side.
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LENGTH];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let length = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    if length > max_frame_size {
        return Err(ProxyError::MalformedPacket(format!(
            "frame of {} bytes exceeds limit of {} bytes",
            length, max_frame_size
        )));
    }

    let mut frame = BytesMut::with_capacity(length + 1);
    frame.put_u8(header[3]);
    frame.resize(length + 1, 0);
    reader.read_exact(&mut frame[1..]).await?;
    Ok(Some(frame.freeze()))
}

/// One client connection after authentication
pub struct FrontendConnection<R, T> {
    reader: R,
    transport: T,
    backend: Arc<dyn BackendConnection>,
    config: FrontendConfig,
    hook_factory: HookFactory,
}

impl<R, T> FrontendConnection<R, T>
where
    R: AsyncRead + Unpin + Send,
    T: Transport,
{
    pub fn new(
        reader: R,
        transport: T,
        backend: Arc<dyn BackendConnection>,
        config: FrontendConfig,
    ) -> Self {
        Self {
            reader,
            transport,
            backend,
            config,
            hook_factory: Arc::new(|| {
                Box::new(MetricsInvokeHook::new()) as Box<dyn InvocationHook>
            }),
        }
    }

    pub fn with_hook_factory(mut self, hook_factory: HookFactory) -> Self {
        self.hook_factory = hook_factory;
        self
    }

    /// Serve commands until the client quits or goes away. Returns the number of turns run.
    pub async fn run(mut self) -> Result<u64> {
        let mut turns = 0u64;
        let mut failures = 0u64;
        loop {
            if !self.transport.is_active() {
                debug!(turns, "Client transport closed");
                break;
            }
            let frame = match read_frame(&mut self.reader, self.config.max_frame_size).await? {
                Some(frame) => frame,
                None => {
                    debug!(turns, "Client closed connection");
                    break;
                }
            };
            let quit = frame.get(1) == Some(&COM_QUIT);

            let hook = (self.hook_factory)();
            let outcome = CommandExecutor::with_config(
                &mut self.transport,
                self.backend.clone(),
                hook,
                &self.config,
            )
            .run(frame)
            .await;
            turns += 1;
            if outcome != TurnOutcome::Ok {
                failures += 1;
            }

            if quit {
                debug!(turns, "Client sent COM_QUIT");
                break;
            }
        }
        debug!(turns, failures, "Connection loop finished");
        Ok(turns)
    }
}

/// Serve an authenticated TCP client until it disconnects
pub async fn serve_connection(
    stream: TcpStream,
    backend: Arc<dyn BackendConnection>,
    config: FrontendConfig,
) -> Result<()> {
    let peer = stream.peer_addr().ok();
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY: {}", e);
    }

    let (read_half, write_half) = stream.into_split();
    let (transport, writer) = ChannelTransport::new(write_half, config.watermarks());
    let result = FrontendConnection::new(read_half, transport, backend, config)
        .run()
        .await;
    // The transport is gone, so the writer drains what is left and shuts down
    if let Err(e) = writer.await {
        warn!("Client writer task failed: {}", e);
    }

    match result {
        Ok(turns) => {
            info!(peer = ?peer, turns, "MySQL connection closed");
            Ok(())
        }
        Err(ProxyError::Transport(ref e)) if is_disconnect_error(e) => {
            debug!(peer = ?peer, "Client disconnected: {}", e);
            Ok(())
        }
        Err(e) => {
            warn!(peer = ?peer, "Closing MySQL connection: {}", e);
            Err(e)
        }
    }
}
