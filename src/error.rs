//! Error types for the monitor.

use thiserror::Error;

/// Remediation shown to the operator when the broker cannot be reached.
pub const BROKER_HINT: &str =
    "Make sure the mosquitto broker is running:\n   sudo systemctl start mosquitto";

/// Errors raised by an [`EventSource`](crate::source::EventSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be handed to the transport.
    #[error("Request failed: {0}")]
    Request(String),

    /// The transport task is gone.
    #[error("Transport closed")]
    Closed,
}

impl From<rumqttc::ClientError> for SourceError {
    fn from(err: rumqttc::ClientError) -> Self {
        SourceError::Request(err.to_string())
    }
}

/// Errors that end a monitoring session.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The broker could not be reached before the first handshake.
    #[error("Failed to connect to {broker}: {reason}")]
    Connect {
        /// `host:port` of the broker.
        broker: String,
        /// Transport error as reported by the client library.
        reason: String,
    },

    /// An established connection dropped and reconnecting is disabled.
    #[error("Connection to {broker} lost: {reason}")]
    ConnectionLost {
        /// `host:port` of the broker.
        broker: String,
        /// Transport error as reported by the client library.
        reason: String,
    },

    /// Subscribing or disconnecting failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Writing to the console failed.
    #[error("Console write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Operator hint for this error, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            MonitorError::Connect { .. } | MonitorError::ConnectionLost { .. } => {
                Some(BROKER_HINT)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_has_hint() {
        let err = MonitorError::Connect {
            broker: "localhost:1883".to_string(),
            reason: "Connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to connect to localhost:1883: Connection refused"
        );
        assert!(err.hint().unwrap().contains("mosquitto"));
    }

    #[test]
    fn test_source_error_has_no_hint() {
        let err = MonitorError::from(SourceError::Closed);
        assert_eq!(err.to_string(), "Transport closed");
        assert!(err.hint().is_none());
    }
}
