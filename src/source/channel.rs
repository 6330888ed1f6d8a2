//! Channel-based data source.
//!
//! Receives payloads via a tokio mpsc channel. This is the in-process
//! integration point: whatever transport the host uses pushes payload bytes
//! (or a resumption marker) into the sender.

use tokio::sync::mpsc;

use super::{DataSource, Feed};

/// Capacity of channels created with [`ChannelSource::create`].
const CHANNEL_CAPACITY: usize = 64;

/// A data source that receives feed items via a channel.
///
/// Unlike a watch channel, every payload is kept: sparse updates depend on
/// seeing each one in order.
///
/// # Example
///
/// ```
/// use upwatch::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("sse://status.local");
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<Feed>,
    description: String,
    disconnected: bool,
}

impl ChannelSource {
    /// Create a new channel source.
    ///
    /// * `receiver` - The receiving end of a feed channel
    /// * `source_description` - Where payloads come from, for the status bar
    pub fn new(receiver: mpsc::Receiver<Feed>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            disconnected: false,
        }
    }

    /// Create a channel pair for sending feed items to a ChannelSource.
    pub fn create(source_description: &str) -> (mpsc::Sender<Feed>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (tx, Self::new(rx, source_description))
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self) -> Option<Feed> {
        match self.receiver.try_recv() {
            Ok(feed) => Some(feed),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.disconnected = true;
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.disconnected.then(|| "Channel closed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_source_poll() {
        let (tx, mut source) = ChannelSource::create("test");

        // Nothing sent yet
        assert!(source.poll().is_none());

        tx.try_send(Feed::Payload(b"{}".to_vec())).unwrap();
        tx.try_send(Feed::Resumed).unwrap();

        // Items arrive in order, none are coalesced
        assert_eq!(source.poll(), Some(Feed::Payload(b"{}".to_vec())));
        assert_eq!(source.poll(), Some(Feed::Resumed));
        assert!(source.poll().is_none());
        assert!(source.error().is_none());
    }

    #[test]
    fn test_channel_source_reports_closed_sender() {
        let (tx, mut source) = ChannelSource::create("test");
        drop(tx);

        assert!(source.poll().is_none());
        assert_eq!(source.error().as_deref(), Some("Channel closed"));
        assert_eq!(source.description(), "channel: test");
    }
}
