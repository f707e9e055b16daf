use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mqttwatch::config::{ColorMode, MonitorConfig, Overrides};
use mqttwatch::{ui, Monitor};

#[derive(Parser, Debug)]
#[command(name = "mqttwatch")]
#[command(about = "Print messages from the datacenter fuzzy-control MQTT topics")]
#[command(version)]
struct Args {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker host [default: localhost]
    #[arg(long)]
    host: Option<String>,

    /// Broker port [default: 1883]
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep-alive interval in seconds [default: 60]
    #[arg(short, long)]
    keep_alive: Option<u16>,

    /// MQTT client id [default: mqttwatch-<pid>]
    #[arg(short = 'i', long)]
    client_id: Option<String>,

    /// Keep running and reconnect if an established connection drops
    #[arg(long)]
    reconnect: bool,

    /// When to colour output
    #[arg(long, value_enum)]
    color: Option<ColorMode>,

    /// Log filter for stderr diagnostics, e.g. "debug" [default: warn]
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            keep_alive_secs: self.keep_alive,
            client_id: self.client_id.clone(),
            reconnect: self.reconnect,
            color: self.color,
            log_level: self.log_level.clone(),
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = MonitorConfig::load(args.config.as_deref())?;
    config.apply(args.overrides());

    setup_logging(&config.log.level);

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let mut monitor = Monitor::start(&config)?;
        monitor.run(interrupted()).await
    });

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            let theme = ui::Theme::new(config.output.color.enabled());
            ui::report_error(&mut io::stderr(), &theme, &e)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `RUST_LOG` wins over the configured level; diagnostics go to stderr.
fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

/// Resolves on Ctrl+C.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler the default signal disposition applies
        error!("Unable to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
