//! Production transport over a tokio `TcpStream`.

use crate::error::EnvError;
use crate::network::NetworkTransport;
use crate::types::{Frame, FRAME_DELIMITER, MAX_FRAME_LEN};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;

/// Buffered read half plus the line being assembled.
struct ReadState {
    reader: BufReader<OwnedReadHalf>,
    line: Vec<u8>,
    closed: bool,
}

/// Newline-framed transport over one TCP connection.
///
/// The stream is split so that the receiver loop and the flushing tick loop
/// never contend for the same lock.
pub struct TcpTransport {
    peer: String,
    reader: Mutex<ReadState>,
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpTransport {
    /// Connects to a listening controller.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, EnvError> {
        let stream = TcpStream::connect(addr).await?;
        Self::from_stream(stream)
    }

    /// Wraps an already-connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self, EnvError> {
        stream.set_nodelay(true)?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let (read_half, write_half) = stream.into_split();

        tracing::info!("Connected to controller at {}", peer);

        Ok(Self {
            peer,
            reader: Mutex::new(ReadState {
                reader: BufReader::new(read_half),
                line: Vec::new(),
                closed: false,
            }),
            writer: Mutex::new(write_half),
        })
    }
}

#[async_trait]
impl NetworkTransport for TcpTransport {
    async fn send(&self, frame: Frame) -> Result<(), EnvError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame.to_wire()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn recv(&self) -> Option<Frame> {
        let mut guard = self.reader.lock().await;
        let state = &mut *guard;
        let limit = (MAX_FRAME_LEN + 1) as u64;

        while !state.closed {
            state.line.clear();
            let read = (&mut state.reader)
                .take(limit)
                .read_until(FRAME_DELIMITER, &mut state.line)
                .await;

            match read {
                Ok(0) => {
                    tracing::info!("Controller {} closed the connection", self.peer);
                    state.closed = true;
                }
                Ok(n) if state.line.last() == Some(&FRAME_DELIMITER) => {
                    if let Some(frame) = Frame::from_line(&state.line[..n]) {
                        return Some(frame);
                    }
                }
                Ok(n) if n as u64 >= limit => {
                    tracing::warn!(
                        "Dropping frame from {} longer than {} bytes",
                        self.peer,
                        MAX_FRAME_LEN
                    );
                    match discard_line(&mut state.reader).await {
                        Ok(true) => {}
                        Ok(false) => state.closed = true,
                        Err(e) => {
                            tracing::error!("Read from {} failed: {}", self.peer, e);
                            state.closed = true;
                        }
                    }
                }
                Ok(_) => {
                    // Stream ended mid-line; the tail is still a frame.
                    state.closed = true;
                    if let Some(frame) = Frame::from_line(&state.line) {
                        return Some(frame);
                    }
                }
                Err(e) => {
                    tracing::error!("Read from {} failed: {}", self.peer, e);
                    state.closed = true;
                }
            }
        }
        None
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}

/// Skips input up to and including the next delimiter. Returns false at EOF.
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<bool> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(false);
        }
        match buf.iter().position(|b| *b == FRAME_DELIMITER) {
            Some(idx) => {
                reader.consume(idx + 1);
                return Ok(true);
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}
