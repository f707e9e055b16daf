//! Channel-based event source.
//!
//! Events are pushed through a tokio mpsc channel instead of coming from a
//! broker. Requests made by the monitor are recorded so callers can inspect
//! them. Useful for replaying captured traffic and for tests.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::EventSource;
use crate::error::SourceError;
use crate::events::MonitorEvent;

/// A request the monitor made of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Subscribe(Vec<String>),
    Close,
}

/// Shared, append-only record of [`Request`]s.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<Request>>>);

impl RequestLog {
    fn push(&self, request: Request) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    /// Copy of every request recorded so far, oldest first.
    pub fn snapshot(&self) -> Vec<Request> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// An event source fed by an in-memory channel.
///
/// # Example
///
/// ```
/// use mqttwatch::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("replay");
/// let requests = source.requests();
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<MonitorEvent>,
    description: String,
    requests: RequestLog,
    closed: bool,
}

impl ChannelSource {
    /// Create a channel source reading from `receiver`.
    pub fn new(receiver: mpsc::Receiver<MonitorEvent>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            requests: RequestLog::default(),
            closed: false,
        }
    }

    /// Create a (sender, source) pair.
    pub fn create(source_description: &str) -> (mpsc::Sender<MonitorEvent>, Self) {
        let (tx, rx) = mpsc::channel(64);
        (tx, Self::new(rx, source_description))
    }

    /// Handle to the requests made of this source.
    pub fn requests(&self) -> RequestLog {
        self.requests.clone()
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next_event(&mut self) -> Option<MonitorEvent> {
        if self.closed {
            return None;
        }
        self.receiver.recv().await
    }

    async fn subscribe(&mut self, topics: &[String]) -> Result<(), SourceError> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        self.requests.push(Request::Subscribe(topics.to_vec()));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if !self.closed {
            self.closed = true;
            self.receiver.close();
            self.requests.push(Request::Close);
        }
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
