//! The monitor control loop.
//!
//! [`Monitor`] owns the event source and the renderer. It pulls one event at
//! a time, so every message is fully rendered before the next is looked at.
//!
//! ```text
//!   Disconnected ──Connected──▶ Connected ──interrupt / fatal error──▶ Terminating
//!        ▲                          │
//!        └────── lost (reconnect) ──┘
//! ```

use std::future::Future;
use std::io::{Stdout, Write};

use tracing::{debug, info, warn};

use crate::config::{MonitorConfig, TOPICS};
use crate::error::{MonitorError, SourceError};
use crate::events::{Grant, InboundMessage, MonitorEvent};
use crate::source::{EventSource, MqttSource};
use crate::ui::Renderer;

/// Connection state as seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Disconnected,
    Connected,
    /// Absorbing: no event leaves this state.
    Terminating,
}

impl MonitorState {
    /// State after a successful handshake.
    pub fn on_connected(self) -> Self {
        match self {
            MonitorState::Terminating => MonitorState::Terminating,
            _ => MonitorState::Connected,
        }
    }

    /// State after a transport error on an established session. Only a
    /// reconnecting session goes back to `Disconnected`.
    pub fn on_lost(self, reconnect: bool) -> Self {
        match self {
            MonitorState::Connected | MonitorState::Disconnected if reconnect => {
                MonitorState::Disconnected
            }
            _ => MonitorState::Terminating,
        }
    }
}

/// Subscribes to the fuzzy-control topics and renders what arrives.
#[derive(Debug)]
pub struct Monitor<W: Write> {
    source: Box<dyn EventSource>,
    renderer: Renderer<W>,
    broker: String,
    topics: Vec<String>,
    state: MonitorState,
    reconnect: bool,
    handshakes: u64,
    received: u64,
}

impl Monitor<Stdout> {
    /// Announce the broker and start connecting to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let mut renderer = Renderer::stdout(config.output.color.enabled());
        renderer.connecting(&config.broker.address())?;

        let source = MqttSource::spawn(&config.broker);
        info!("Monitoring {}", source.description());

        Ok(Self::new(Box::new(source), renderer, config.broker.address())
            .with_reconnect(config.broker.reconnect))
    }
}

impl<W: Write> Monitor<W> {
    /// Create a monitor over an arbitrary source and sink.
    pub fn new(
        source: Box<dyn EventSource>,
        renderer: Renderer<W>,
        broker: impl Into<String>,
    ) -> Self {
        Self {
            source,
            renderer,
            broker: broker.into(),
            topics: TOPICS.iter().map(|t| t.to_string()).collect(),
            state: MonitorState::Disconnected,
            reconnect: false,
            handshakes: 0,
            received: 0,
        }
    }

    /// Keep running when an established connection drops.
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Messages rendered so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn renderer(&self) -> &Renderer<W> {
        &self.renderer
    }

    /// Dispatch events until `shutdown` resolves or the connection ends.
    ///
    /// Returns `Ok` after a clean shutdown.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), MonitorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        while self.state != MonitorState::Terminating {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Interrupt received");
                    return self.stop().await;
                }
                event = self.source.next_event() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        self.state = MonitorState::Terminating;
                        return Err(SourceError::Closed.into());
                    }
                },
            }
        }

        Ok(())
    }

    /// Apply one event.
    pub async fn handle_event(&mut self, event: MonitorEvent) -> Result<(), MonitorError> {
        if self.state == MonitorState::Terminating {
            debug!("Dropping {:?} while terminating", event);
            return Ok(());
        }

        match event {
            MonitorEvent::Connected { session_present } => {
                self.state = self.state.on_connected();
                self.handshakes += 1;
                debug!(
                    "Handshake #{} (session present: {})",
                    self.handshakes, session_present
                );
                // Sessions are clean, so every connection needs subscribing
                self.source.subscribe(&self.topics).await?;
                self.renderer.banner(&self.topics)?;
            }
            MonitorEvent::Subscribed { pkid, grants } => {
                for (topic, grant) in self.topics.iter().zip(&grants) {
                    match grant {
                        Grant::Granted(qos) => debug!("{} granted at QoS {}", topic, qos),
                        Grant::Rejected => warn!("Broker rejected subscription to {}", topic),
                    }
                }
                debug!("SUBACK {} with {} grants", pkid, grants.len());
            }
            MonitorEvent::Message(message) => self.on_message(&message)?,
            MonitorEvent::Disconnected { reason } => return self.on_disconnected(reason),
        }

        Ok(())
    }

    /// Render one inbound message.
    pub fn on_message(&mut self, message: &InboundMessage) -> Result<(), MonitorError> {
        self.received += 1;
        self.renderer.message(message)?;
        Ok(())
    }

    fn on_disconnected(&mut self, reason: String) -> Result<(), MonitorError> {
        if self.handshakes == 0 {
            self.state = MonitorState::Terminating;
            return Err(MonitorError::Connect {
                broker: self.broker.clone(),
                reason,
            });
        }

        self.state = self.state.on_lost(self.reconnect);
        match self.state {
            MonitorState::Terminating => Err(MonitorError::ConnectionLost {
                broker: self.broker.clone(),
                reason,
            }),
            _ => {
                warn!("Connection to {} lost: {}", self.broker, reason);
                self.renderer.connection_lost(&reason)?;
                Ok(())
            }
        }
    }

    /// Print the farewell and close the connection.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        if self.state == MonitorState::Terminating {
            return Ok(());
        }
        self.state = MonitorState::Terminating;
        self.renderer.farewell()?;
        self.source.close().await?;
        info!("Stopped after {} messages", self.received);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelSource, Request, RequestLog};
    use crate::ui::Theme;
    use tokio::sync::{mpsc, oneshot};

    fn monitor() -> (mpsc::Sender<MonitorEvent>, RequestLog, Monitor<Vec<u8>>) {
        let (tx, source) = ChannelSource::create("test");
        let requests = source.requests();
        let renderer = Renderer::new(Vec::new(), Theme::plain());
        (tx, requests, Monitor::new(Box::new(source), renderer, "localhost:1883"))
    }

    fn output(monitor: &Monitor<Vec<u8>>) -> String {
        String::from_utf8(monitor.renderer().get_ref().clone()).unwrap()
    }

    fn connected() -> MonitorEvent {
        MonitorEvent::Connected {
            session_present: false,
        }
    }

    fn lost() -> MonitorEvent {
        MonitorEvent::Disconnected {
            reason: "I/O: Connection refused (os error 111)".to_string(),
        }
    }

    fn subscriptions(requests: &RequestLog) -> Vec<Vec<String>> {
        requests
            .snapshot()
            .into_iter()
            .filter_map(|r| match r {
                Request::Subscribe(topics) => Some(topics),
                Request::Close => None,
            })
            .collect()
    }

    #[test]
    fn test_state_transitions() {
        use MonitorState::*;

        assert_eq!(Disconnected.on_connected(), Connected);
        assert_eq!(Connected.on_lost(false), Terminating);
        assert_eq!(Connected.on_lost(true), Disconnected);
        assert_eq!(Disconnected.on_lost(true), Disconnected);
        assert_eq!(Disconnected.on_lost(false), Terminating);
        assert_eq!(Terminating.on_connected(), Terminating);
        assert_eq!(Terminating.on_lost(true), Terminating);
    }

    #[tokio::test]
    async fn test_connect_subscribes_to_exactly_the_topics() {
        let (_tx, requests, mut monitor) = monitor();

        monitor.handle_event(connected()).await.unwrap();

        assert_eq!(monitor.state(), MonitorState::Connected);
        assert_eq!(
            subscriptions(&requests),
            vec![vec![
                "datacenter/fuzzy/control".to_string(),
                "datacenter/fuzzy/temp".to_string(),
                "datacenter/fuzzy/alert".to_string(),
            ]]
        );

        let out = output(&monitor);
        assert!(out.contains("CONNECTED TO MQTT BROKER!"));
        for topic in TOPICS {
            assert!(out.contains(&format!("✓ {}", topic)));
        }
    }

    #[tokio::test]
    async fn test_messages_rendered_in_arrival_order() {
        let (tx, _requests, mut monitor) = monitor();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let messages = [
            ("datacenter/fuzzy/temp", r#"{"temp": 24.5}"#),
            ("datacenter/fuzzy/control", "ON"),
            ("datacenter/fuzzy/alert", "M3"),
        ];
        tx.send(connected()).await.unwrap();
        for (topic, payload) in messages {
            tx.send(MonitorEvent::Message(InboundMessage::now(topic, payload)))
                .await
                .unwrap();
        }

        let run = monitor.run(async {
            let _ = stop_rx.await;
        });
        let stopper = async {
            // Let the queued events drain before interrupting
            while tx.capacity() < tx.max_capacity() {
                tokio::task::yield_now().await;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            let _ = stop_tx.send(());
        };
        let (result, ()) = tokio::join!(run, stopper);
        result.unwrap();

        assert_eq!(monitor.received(), 3);
        let out = output(&monitor);
        let first = out.find("\"temp\": 24.5").unwrap();
        let second = out.find("Message: ON").unwrap();
        let third = out.find("Message: M3").unwrap();
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_interrupt_closes_cleanly() {
        let (_tx, requests, mut monitor) = monitor();
        monitor.handle_event(connected()).await.unwrap();

        // Shutdown already resolved: the biased select picks it first
        let result = monitor.run(async {}).await;

        assert!(result.is_ok());
        assert_eq!(monitor.state(), MonitorState::Terminating);
        assert_eq!(requests.snapshot().last(), Some(&Request::Close));
        assert!(output(&monitor).ends_with("Shutting down MQTT subscriber...\n"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_reported_once() {
        let (tx, requests, mut monitor) = monitor();
        tx.send(lost()).await.unwrap();

        let err = monitor.run(std::future::pending()).await.unwrap_err();

        assert!(matches!(err, MonitorError::Connect { .. }));
        assert!(err.hint().is_some());
        assert_eq!(monitor.state(), MonitorState::Terminating);
        assert!(subscriptions(&requests).is_empty());
    }

    #[tokio::test]
    async fn test_lost_connection_without_reconnect_terminates() {
        let (tx, _requests, mut monitor) = monitor();
        tx.send(connected()).await.unwrap();
        tx.send(lost()).await.unwrap();

        let err = monitor.run(std::future::pending()).await.unwrap_err();

        assert!(matches!(err, MonitorError::ConnectionLost { .. }));
        assert_eq!(monitor.state(), MonitorState::Terminating);
    }

    #[tokio::test]
    async fn test_reconnect_resubscribes() {
        let (_tx, requests, monitor) = monitor();
        let mut monitor = monitor.with_reconnect(true);

        monitor.handle_event(connected()).await.unwrap();
        monitor.handle_event(lost()).await.unwrap();
        assert_eq!(monitor.state(), MonitorState::Disconnected);

        monitor.handle_event(connected()).await.unwrap();
        assert_eq!(monitor.state(), MonitorState::Connected);

        let subs = subscriptions(&requests);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0], subs[1]);
        assert!(output(&monitor).contains("Connection lost:"));
    }

    #[tokio::test]
    async fn test_source_ending_is_an_error() {
        let (tx, _requests, mut monitor) = monitor();
        drop(tx);

        let err = monitor.run(std::future::pending()).await.unwrap_err();
        assert!(matches!(err, MonitorError::Source(SourceError::Closed)));
    }

    #[tokio::test]
    async fn test_rejected_grant_is_not_fatal() {
        let (_tx, _requests, mut monitor) = monitor();
        monitor.handle_event(connected()).await.unwrap();
        monitor
            .handle_event(MonitorEvent::Subscribed {
                pkid: 1,
                grants: vec![Grant::Granted(0), Grant::Rejected, Grant::Granted(0)],
            })
            .await
            .unwrap();
        assert_eq!(monitor.state(), MonitorState::Connected);
    }

    #[tokio::test]
    async fn test_events_ignored_after_stop() {
        let (_tx, _requests, mut monitor) = monitor();
        monitor.handle_event(connected()).await.unwrap();
        monitor.stop().await.unwrap();

        monitor
            .handle_event(MonitorEvent::Message(InboundMessage::now("datacenter/fuzzy/temp", "1")))
            .await
            .unwrap();
        assert_eq!(monitor.received(), 0);

        // Stopping again is a no-op
        monitor.stop().await.unwrap();
    }
}
