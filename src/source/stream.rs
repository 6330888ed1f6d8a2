//! Stream-based data source.
//!
//! Receives payloads from an async byte stream, one JSON document per line.
//! Server-sent-event framing (`data: {...}` lines) is accepted as well, so
//! the same source reads a raw TCP feed or a captured event stream.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{DataSource, Feed};

/// Initial delay before reconnecting a dropped TCP feed.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
/// Upper bound for the reconnect delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type ErrorSlot = Arc<Mutex<Option<String>>>;

/// A data source that receives payloads from an async stream.
///
/// A background task reads the stream and makes payloads available via
/// `poll()`.
///
/// # Example with a byte stream
///
/// ```
/// use std::io::Cursor;
/// use upwatch::StreamSource;
///
/// # tokio_test::block_on(async {
/// let data = b"{}\n";
/// let stream = Cursor::new(data.to_vec());
/// let source = StreamSource::spawn(stream, "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSource {
    receiver: mpsc::Receiver<Feed>,
    description: String,
    last_error: ErrorSlot,
}

impl StreamSource {
    /// Spawn a background task that reads from the given async reader.
    ///
    /// The reader should provide newline-delimited JSON payloads.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(64);
        let last_error: ErrorSlot = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();

        tokio::spawn(async move {
            if pump_lines(reader, &tx, &error_handle).await == PumpEnd::Closed {
                let mut slot = error_handle.lock().unwrap_or_else(|e| e.into_inner());
                slot.get_or_insert_with(|| "Connection closed".to_string());
            }
        });

        Self {
            receiver: rx,
            description: format!("stream: {}", description),
            last_error,
        }
    }

    /// Connect to a TCP endpoint, reconnecting whenever the connection drops.
    ///
    /// Every successful reconnect is reported as [`Feed::Resumed`] before the
    /// first payload of the new connection.
    pub fn connect(addr: &str) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let last_error: ErrorSlot = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();
        let target = addr.to_string();

        tokio::spawn(async move {
            let mut backoff = INITIAL_BACKOFF;
            let mut connected_before = false;

            loop {
                match TcpStream::connect(&target).await {
                    Ok(stream) => {
                        info!(addr = %target, resumed = connected_before, "connected to status feed");
                        backoff = INITIAL_BACKOFF;
                        set_error(&error_handle, None);
                        if connected_before && tx.send(Feed::Resumed).await.is_err() {
                            break;
                        }
                        connected_before = true;

                        if pump_lines(stream, &tx, &error_handle).await == PumpEnd::ReceiverDropped {
                            break;
                        }
                        warn!(addr = %target, "status feed disconnected");
                        set_error(&error_handle, Some("Connection closed, reconnecting".to_string()));
                    }
                    Err(e) => {
                        warn!(addr = %target, error = %e, ?backoff, "connect failed");
                        set_error(&error_handle, Some(format!("Connect error: {}", e)));
                    }
                }

                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        });

        Self {
            receiver: rx,
            description: format!("tcp: {}", addr),
            last_error,
        }
    }

    /// Create a StreamSource from raw bytes channel.
    ///
    /// Each message on the channel is one payload.
    pub fn from_bytes_channel(mut rx: mpsc::Receiver<Vec<u8>>, description: &str) -> Self {
        let (tx, feed_rx) = mpsc::channel(64);

        tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                if tx.send(Feed::Payload(bytes)).await.is_err() {
                    break;
                }
            }
        });

        Self {
            receiver: feed_rx,
            description: format!("stream: {}", description),
            last_error: Arc::new(Mutex::new(None)),
        }
    }
}

impl DataSource for StreamSource {
    fn poll(&mut self) -> Option<Feed> {
        // Try to receive without blocking
        match self.receiver.try_recv() {
            Ok(feed) => Some(feed),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                let mut slot = self.last_error.lock().unwrap_or_else(|e| e.into_inner());
                if slot.is_none() {
                    *slot = Some("Stream disconnected".to_string());
                }
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PumpEnd {
    /// The stream ended or failed.
    Closed,
    /// Nobody is polling anymore.
    ReceiverDropped,
}

fn set_error(slot: &ErrorSlot, value: Option<String>) {
    *slot.lock().unwrap_or_else(|e| e.into_inner()) = value;
}

/// Extract the JSON document from one line, handling SSE framing.
///
/// Works on raw bytes: a line that is not UTF-8 is still a payload, and the
/// ingestor rejects it on its own.
fn payload_from_line(line: &[u8]) -> Option<&[u8]> {
    let line = line.trim_ascii();
    if line.is_empty() || line.starts_with(b":") {
        return None;
    }
    if let Some(data) = line.strip_prefix(b"data:") {
        let data = data.trim_ascii();
        return (!data.is_empty()).then_some(data);
    }
    let sse_fields: [&[u8]; 3] = [b"event:", b"id:", b"retry:"];
    if sse_fields.iter().any(|p| line.starts_with(p)) {
        return None;
    }
    Some(line)
}

async fn pump_lines<R>(reader: R, tx: &mpsc::Sender<Feed>, errors: &ErrorSlot) -> PumpEnd
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => return PumpEnd::Closed,
            Ok(_) => {
                let Some(payload) = payload_from_line(&line) else {
                    continue;
                };
                debug!(bytes = payload.len(), "received stream payload");
                if tx.send(Feed::Payload(payload.to_vec())).await.is_err() {
                    return PumpEnd::ReceiverDropped;
                }
            }
            Err(e) => {
                set_error(errors, Some(format!("Read error: {}", e)));
                return PumpEnd::Closed;
            }
        }
    }
}
