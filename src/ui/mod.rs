//! Console rendering.
//!
//! Everything the operator sees on stdout goes through [`Renderer`], which
//! writes to any [`Write`] sink so output can be captured in tests.

mod theme;

pub use theme::Theme;

use std::io::{self, Stdout, Write};

use crate::data::{decode_payload, ParsedPayload};
use crate::error::MonitorError;
use crate::events::InboundMessage;

const HEAVY_RULE: &str = "============================================================";
const LIGHT_RULE: &str = "------------------------------------------------------------";

/// Writes banners and message blocks to a sink.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    out: W,
    theme: Theme,
}

impl Renderer<Stdout> {
    /// Renderer on the process's stdout.
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), Theme::new(color))
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, theme: Theme) -> Self {
        Self { out, theme }
    }

    /// Line printed before the first connection attempt.
    pub fn connecting(&mut self, broker: &str) -> io::Result<()> {
        writeln!(self.out, "\nConnecting to MQTT broker ({})...", broker)?;
        self.out.flush()
    }

    /// Confirmation banner listing the subscribed topics.
    pub fn banner(&mut self, topics: &[String]) -> io::Result<()> {
        let rule = self.theme.paint(HEAVY_RULE, self.theme.accent);
        writeln!(self.out, "{}", rule)?;
        writeln!(
            self.out,
            "{}",
            self.theme.strong("CONNECTED TO MQTT BROKER!", self.theme.accent)
        )?;
        writeln!(self.out, "{}", rule)?;
        writeln!(self.out, "\nSubscribed topics:")?;
        for topic in topics {
            writeln!(self.out, "   {} {}", self.theme.paint("✓", self.theme.ok), topic)?;
        }
        writeln!(self.out, "\nWaiting for messages...\n")?;
        writeln!(self.out, "{}", self.theme.paint(LIGHT_RULE, self.theme.accent))?;
        self.out.flush()
    }

    /// Render one inbound message.
    pub fn message(&mut self, message: &InboundMessage) -> io::Result<()> {
        writeln!(
            self.out,
            "\n[{}] 📨 Topic: {}",
            self.theme.paint(&message.timestamp(), self.theme.timestamp),
            self.theme.strong(&message.topic, self.theme.topic)
        )?;

        let payload = decode_payload(&message.payload);
        match &payload {
            ParsedPayload::Structured(_) => writeln!(self.out, "Data: {}", payload.pretty())?,
            ParsedPayload::Text(text) => writeln!(self.out, "Message: {}", text)?,
        }

        writeln!(self.out, "{}", self.theme.paint(LIGHT_RULE, self.theme.accent))?;
        self.out.flush()
    }

    /// Notice that an established connection dropped and will be retried.
    pub fn connection_lost(&mut self, reason: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "\n{} {}",
            self.theme.strong("Connection lost:", self.theme.error),
            reason
        )?;
        writeln!(self.out, "Reconnecting...")?;
        self.out.flush()
    }

    /// Farewell printed on operator interrupt.
    pub fn farewell(&mut self) -> io::Result<()> {
        writeln!(self.out, "\n\nShutting down MQTT subscriber...")?;
        self.out.flush()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Report a fatal error, with the remediation hint when there is one.
pub fn report_error<W: Write>(out: &mut W, theme: &Theme, error: &MonitorError) -> io::Result<()> {
    writeln!(out, "\n{} {}", theme.strong("Error:", theme.error), error)?;
    if let Some(hint) = error.hint() {
        writeln!(out, "\n{}", hint)?;
    }
    out.flush()
}
