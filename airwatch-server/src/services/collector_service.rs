use std::io;
use std::sync::Arc;
use std::time::Duration;

use airwatch_api::FrameAssembler;
use time::OffsetDateTime;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::configs::Node;
use crate::models::Reading;
use crate::repositories::ReadingRepository;

/// Why a sensor-node connection was torn down.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionFault {
    #[error("connect failed: {0}")]
    Connect(io::Error),

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("socket error: {0}")]
    Io(io::Error),

    #[error("peer stalled mid-frame with {0} bytes pending")]
    StalledMidFrame(usize),

    #[error("peer closed the connection with {0} bytes pending")]
    Eof(usize),
}

/// TCP client that dials the sensor node and streams decoded readings into
/// storage.
///
/// Runs connect → stream → (fault) → wait → reconnect forever: the loop has
/// no terminal failure state and survives indefinite peer absence. The only
/// exit is the stop signal, honored at the top of every state transition, so
/// stop latency is bounded by the read timeout.
pub struct CollectorService {
    node: Node,
    readings: Arc<ReadingRepository>,
}

impl CollectorService {
    pub fn new(node: Node, readings: Arc<ReadingRepository>) -> Self {
        Self { node, readings }
    }

    /// Spawns the collector loop; the returned sender stops it.
    pub fn start(&self) -> oneshot::Sender<()> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let node = self.node.clone();
        let readings = Arc::clone(&self.readings);

        tokio::spawn(async move {
            Self::run_loop(node, readings, stop_rx).await;
            tracing::info!("collector stopped");
        });

        stop_tx
    }

    async fn run_loop(
        node: Node,
        readings: Arc<ReadingRepository>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let address = format!("{}:{}", node.host, node.port);
        let connect_timeout = Duration::from_secs(node.connect_timeout_secs);
        let reconnect_delay = Duration::from_secs(node.reconnect_delay_secs);

        loop {
            let connected = tokio::select! {
                _ = &mut stop_rx => return,
                result = timeout(connect_timeout, TcpStream::connect(address.as_str())) => result,
            };

            let fault = match connected {
                Ok(Ok(stream)) => {
                    tracing::info!("connected to sensor node at {address}");
                    match Self::stream_frames(stream, &node, &readings, &mut stop_rx).await {
                        Some(fault) => fault,
                        // Stop signal received mid-stream.
                        None => return,
                    }
                }
                Ok(Err(e)) => ConnectionFault::Connect(e),
                Err(_) => ConnectionFault::ConnectTimeout,
            };

            tracing::warn!(
                "sensor link lost ({fault}), reconnecting in {}s",
                node.reconnect_delay_secs
            );

            tokio::select! {
                _ = &mut stop_rx => return,
                _ = tokio::time::sleep(reconnect_delay) => {}
            }
        }
    }

    /// Streams frames until a connection fault (`Some`) or stop (`None`).
    /// Partial frames never outlive the connection that produced them.
    async fn stream_frames(
        mut stream: TcpStream,
        node: &Node,
        readings: &ReadingRepository,
        stop_rx: &mut oneshot::Receiver<()>,
    ) -> Option<ConnectionFault> {
        let read_timeout = Duration::from_secs(node.read_timeout_secs);
        let mut assembler = FrameAssembler::new(node.protocol);
        let mut chunk = [0u8; 256];

        loop {
            let read = tokio::select! {
                _ = &mut *stop_rx => return None,
                result = timeout(read_timeout, stream.read(&mut chunk)) => result,
            };

            match read {
                // Nothing pending: an idle link, keep waiting.
                Err(_) if assembler.is_empty() => continue,
                // Half a frame and the peer went quiet: presumed wedged.
                Err(_) => return Some(ConnectionFault::StalledMidFrame(assembler.len())),
                Ok(Ok(0)) => return Some(ConnectionFault::Eof(assembler.len())),
                Ok(Ok(n)) => {
                    assembler.extend(&chunk[..n]);
                    Self::drain_frames(&mut assembler, readings).await;
                }
                Ok(Err(e)) => return Some(ConnectionFault::Io(e)),
            }
        }
    }

    /// Decodes every complete frame in the buffer and persists it. Decode
    /// failures drop that one frame; the stream stays up.
    async fn drain_frames(assembler: &mut FrameAssembler, readings: &ReadingRepository) {
        loop {
            match assembler.next_frame() {
                Ok(Some(measurement)) => {
                    tracing::debug!(?measurement, "reading decoded");
                    let reading =
                        Reading::from_measurement(&measurement, OffsetDateTime::now_utc());
                    if let Err(e) = readings.append(&reading).await {
                        tracing::warn!("failed to persist reading: {e}");
                    }
                }
                Ok(None) => break,
                Err(e) => tracing::warn!("dropped frame: {e}"),
            }
        }
    }
}
