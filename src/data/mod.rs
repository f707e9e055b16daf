//! Payload decoding.
//!
//! Payloads are decoded by a pure function into a [`ParsedPayload`] that the
//! renderer prints without further inspection:
//!
//! ```text
//! raw bytes
//!     │
//!     ▼
//! decode_payload()
//!     │
//!     ├──▶ Structured(serde_json::Value)   valid UTF-8 JSON
//!     │
//!     └──▶ Text(String)                    anything else
//! ```

pub mod payload;

pub use payload::{decode_payload, ParsedPayload};
