use anyhow::{Context, Result};
use clap::Parser;
use loadfeed::{
    fetch,
    publish::{self, LogPublisher, MqttPublisher},
    Config, Grouping,
};
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Republish per-country electricity load from Open Power System Data over MQTT.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// MQTT server address, `host:port` [default: 0.0.0.0:1883]
    #[arg(long = "mqtt-server")]
    mqtt_server: Option<String>,

    /// YAML file overriding the built-in configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read the dataset from a local CSV instead of downloading it
    #[arg(long)]
    input: Option<PathBuf>,

    /// Delay between published messages, in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// How rows with several countries turn into records
    #[arg(long, value_enum)]
    grouping: Option<Grouping>,

    /// Log the encoded lines instead of publishing them
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn into_config(self) -> Result<(Config, Option<PathBuf>, bool)> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_yaml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(broker) = self.mqtt_server {
            cfg.broker = broker;
        }
        if let Some(ms) = self.pacing_ms {
            cfg.pacing_ms = ms;
        }
        if let Some(grouping) = self.grouping {
            cfg.grouping = grouping;
        }
        cfg.validate()?;
        Ok((cfg, self.input, self.dry_run))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    let (cfg, input, dry_run) = Args::parse().into_config()?;
    info!(
        broker = %cfg.broker,
        topic = %cfg.topic,
        countries = ?cfg.countries,
        cutoff = %cfg.cutoff,
        pacing_ms = cfg.pacing_ms,
        grouping = ?cfg.grouping,
        dry_run,
        "configuration"
    );

    // ─── 1) dataset ──────────────────────────────────────────────────
    let data = match input {
        Some(path) => fetch::read_dataset_file(&path).await?,
        None => {
            info!(url = %cfg.dataset_url, "downloading dataset");
            fetch::download_dataset(&Client::new(), &cfg.dataset_url)
                .await
                .context("fetching dataset")?
        }
    };

    // ─── 2) transform + publish ──────────────────────────────────────
    let sent = if dry_run {
        publish::run(&data, &cfg, || async {
            Ok::<_, loadfeed::Error>(LogPublisher::default())
        })
        .await
    } else {
        publish::run(&data, &cfg, || {
            MqttPublisher::connect(&cfg.broker, &cfg.client_id)
        })
        .await
    }
    .context("publishing dataset")?;

    info!(sent, "all done");
    Ok(())
}
