//! MQTT event source.
//!
//! Spawns a background task that drives the `rumqttc` event loop and forwards
//! typed events over a bounded channel. Only the monitor's control loop reads
//! that channel, so events are handled strictly in arrival order.
//!
//! The event loop is polled until the first error. Before the first handshake
//! an error always ends the task, so a connection is attempted exactly once.
//! After a handshake the task either stops or, with reconnect enabled, waits
//! and polls again so the library reconnects.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeFilter,
    SubscribeReasonCode,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::EventSource;
use crate::config::BrokerConfig;
use crate::error::SourceError;
use crate::events::{Grant, InboundMessage, MonitorEvent};

/// Capacity of the request queue inside `rumqttc`.
const REQUEST_CAPACITY: usize = 10;

/// How long `close` waits for the DISCONNECT to go out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// An event source backed by a live MQTT connection.
#[derive(Debug)]
pub struct MqttSource {
    client: AsyncClient,
    events: mpsc::Receiver<MonitorEvent>,
    task: JoinHandle<()>,
    description: String,
}

impl MqttSource {
    /// Start connecting to the broker described by `config`.
    ///
    /// Must be called from within a tokio runtime. The handshake happens in
    /// the background; its outcome arrives as the first event.
    pub fn spawn(config: &BrokerConfig) -> Self {
        let mut options = MqttOptions::new(config.client_id(), config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive());

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let reconnect = config.reconnect.then(|| config.reconnect_delay());

        debug!(
            "Spawning MQTT transport for {} (keep-alive {:?})",
            config.address(),
            config.keep_alive()
        );
        let task = tokio::spawn(pump(eventloop, tx, reconnect));

        Self {
            client,
            events: rx,
            task,
            description: format!("mqtt://{}", config.address()),
        }
    }
}

/// Drive the event loop until it fails (or, with `reconnect`, until the
/// monitor goes away).
async fn pump(
    mut eventloop: EventLoop,
    tx: mpsc::Sender<MonitorEvent>,
    reconnect: Option<Duration>,
) {
    let mut handshakes = 0u64;

    loop {
        let event = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                handshakes += 1;
                info!("Connected (session present: {})", ack.session_present);
                MonitorEvent::Connected {
                    session_present: ack.session_present,
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => MonitorEvent::Subscribed {
                pkid: ack.pkid,
                grants: ack.return_codes.iter().map(grant).collect(),
            },
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                trace!("Publish on {} ({} bytes)", publish.topic, publish.payload.len());
                MonitorEvent::Message(InboundMessage::now(publish.topic, publish.payload.to_vec()))
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("DISCONNECT sent, stopping transport");
                break;
            }
            Ok(other) => {
                trace!("Ignoring {:?}", other);
                continue;
            }
            Err(e) => {
                let reason = e.to_string();
                if tx
                    .send(MonitorEvent::Disconnected {
                        reason: reason.clone(),
                    })
                    .await
                    .is_err()
                {
                    break;
                }
                match reconnect {
                    Some(delay) if handshakes > 0 => {
                        warn!("Connection error: {}; reconnecting in {:?}", reason, delay);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    _ => {
                        debug!("Connection error: {}; stopping transport", reason);
                        break;
                    }
                }
            }
        };

        if tx.send(event).await.is_err() {
            // Monitor dropped
            break;
        }
    }
}

fn grant(code: &SubscribeReasonCode) -> Grant {
    match code {
        SubscribeReasonCode::Success(qos) => Grant::Granted(*qos as u8),
        SubscribeReasonCode::Failure => Grant::Rejected,
    }
}

#[async_trait]
impl EventSource for MqttSource {
    async fn next_event(&mut self) -> Option<MonitorEvent> {
        self.events.recv().await
    }

    async fn subscribe(&mut self, topics: &[String]) -> Result<(), SourceError> {
        let filters = topics
            .iter()
            .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtMostOnce));
        self.client.subscribe_many(filters).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if self.task.is_finished() {
            return Ok(());
        }

        if let Err(e) = self.client.disconnect().await {
            // The event loop is already gone
            debug!("Disconnect request not delivered: {}", e);
            return Ok(());
        }

        // Keep draining so the transport never blocks on a full queue while
        // it flushes the DISCONNECT.
        let events = &mut self.events;
        let drained = async move { while events.recv().await.is_some() {} };
        if tokio::time::timeout(CLOSE_TIMEOUT, drained).await.is_err() {
            warn!("Transport did not stop within {:?}, aborting", CLOSE_TIMEOUT);
            self.task.abort();
        }
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl Drop for MqttSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_mapping() {
        assert_eq!(
            grant(&SubscribeReasonCode::Success(QoS::AtMostOnce)),
            Grant::Granted(0)
        );
        assert_eq!(
            grant(&SubscribeReasonCode::Success(QoS::ExactlyOnce)),
            Grant::Granted(2)
        );
        assert_eq!(grant(&SubscribeReasonCode::Failure), Grant::Rejected);
    }

    #[tokio::test]
    async fn test_description() {
        let config = BrokerConfig {
            host: "broker.lan".to_string(),
            port: 1884,
            ..BrokerConfig::default()
        };
        let source = MqttSource::spawn(&config);
        assert_eq!(source.description(), "mqtt://broker.lan:1884");
    }
}
