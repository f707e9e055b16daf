//! # mqttwatch
//!
//! A console monitor for the datacenter fuzzy-control MQTT topics.
//!
//! It connects to a broker (by default `localhost:1883`), subscribes to
//! `datacenter/fuzzy/control`, `datacenter/fuzzy/temp` and
//! `datacenter/fuzzy/alert`, and prints every message it receives:
//! pretty-printed when the payload is JSON, verbatim otherwise.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  ┌──────────────┐  MonitorEvent   ┌─────────┐    ┌──────────┐ │
//! │  │   source     │───(mpsc)───────▶│   app   │───▶│    ui    │─┼─▶ stdout
//! │  │ (MqttSource) │◀──subscribe─────│(Monitor)│    │(Renderer)│ │
//! │  └──────────────┘     close       └─────────┘    └────┬─────┘ │
//! │                                                       │       │
//! │                                                  ┌────▼─────┐ │
//! │                                                  │   data   │ │
//! │                                                  │ (decode) │ │
//! │                                                  └──────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`EventSource`] trait, [`MqttSource`] on `rumqttc`, and
//!   [`ChannelSource`] for in-memory events
//! - **[`app`]**: the [`Monitor`] control loop and its state machine
//! - **[`data`]**: pure payload decoding into [`ParsedPayload`]
//! - **[`ui`]**: console rendering
//! - **[`config`]**: layered configuration
//!
//! ## Usage
//!
//! ```bash
//! # Watch the local broker
//! mqttwatch
//!
//! # Another broker, reconnecting after drops
//! mqttwatch --host broker.lan --port 1884 --reconnect
//! ```
//!
//! ### As a library with a channel source
//!
//! ```
//! use mqttwatch::{ChannelSource, InboundMessage, Monitor, MonitorEvent, Renderer, Theme};
//!
//! # tokio_test::block_on(async {
//! let (tx, source) = ChannelSource::create("replay");
//! let renderer = Renderer::new(Vec::new(), Theme::plain());
//! let mut monitor = Monitor::new(Box::new(source), renderer, "replay");
//!
//! tx.send(MonitorEvent::Connected { session_present: false }).await.unwrap();
//! tx.send(MonitorEvent::Message(InboundMessage::now("datacenter/fuzzy/control", "ON")))
//!     .await
//!     .unwrap();
//! drop(tx);
//!
//! // The source runs dry after the two events
//! assert!(monitor.run(std::future::pending()).await.is_err());
//! assert_eq!(monitor.received(), 1);
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::{Monitor, MonitorState};
pub use config::{MonitorConfig, TOPICS};
pub use data::{decode_payload, ParsedPayload};
pub use error::{MonitorError, SourceError};
pub use events::{Grant, InboundMessage, MonitorEvent};
pub use source::{ChannelSource, EventSource, MqttSource};
pub use ui::{Renderer, Theme};
