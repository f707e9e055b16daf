//! Event source abstraction.
//!
//! A source owns the broker connection and turns transport activity into
//! [`MonitorEvent`]s on a single-consumer queue. The monitor pulls events one
//! at a time and issues requests (subscribe, close) back through the source.

mod channel;
mod mqtt;

pub use channel::{ChannelSource, Request, RequestLog};
pub use mqtt::MqttSource;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::events::MonitorEvent;

/// Trait for anything that can feed the monitor with broker events.
///
/// # Example
///
/// ```
/// use mqttwatch::{ChannelSource, EventSource, MonitorEvent};
///
/// # tokio_test::block_on(async {
/// let (tx, mut source) = ChannelSource::create("test");
/// tx.send(MonitorEvent::Connected { session_present: false }).await.unwrap();
/// assert!(source.next_event().await.is_some());
/// # });
/// ```
#[async_trait]
pub trait EventSource: Send + Debug {
    /// Wait for the next event.
    ///
    /// Returns `None` once the transport has stopped and every queued event
    /// has been delivered.
    async fn next_event(&mut self) -> Option<MonitorEvent>;

    /// Subscribe to `topics` on the current connection.
    async fn subscribe(&mut self, topics: &[String]) -> Result<(), SourceError>;

    /// Disconnect cleanly and stop the transport.
    async fn close(&mut self) -> Result<(), SourceError>;

    /// Human-readable description, e.g. `mqtt://localhost:1883`.
    fn description(&self) -> &str;
}
