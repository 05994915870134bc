// src/publish/mod.rs
pub mod mqtt;

pub use mqtt::MqttPublisher;

use crate::line_protocol;
use crate::process::{self, Record};
use crate::{Config, Result};
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Anything that can carry one encoded line to a topic.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    async fn publish(&mut self, topic: &str, payload: String) -> Result<()>;

    /// Wait between two messages. Transports with session upkeep override
    /// this to keep servicing the connection while idle.
    async fn pause(&mut self, delay: Duration) -> Result<()> {
        tokio::time::sleep(delay).await;
        Ok(())
    }

    /// Flush and release the transport.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Logs each line instead of sending it. Used for `--dry-run`.
#[derive(Debug, Default)]
pub struct LogPublisher {
    pub sent: usize,
}

impl Publisher for LogPublisher {
    async fn publish(&mut self, topic: &str, payload: String) -> Result<()> {
        self.sent += 1;
        info!(topic, line = %payload, "dry run");
        Ok(())
    }
}

/// Encode and publish every record in order, waiting `pacing` between messages.
///
/// Each line is stamped with the wall clock at the moment it is encoded.
/// Stops at the first failed publish; lines already sent stay sent.
pub async fn publish_all<P: Publisher>(
    publisher: &mut P,
    records: &[Record],
    topic: &str,
    pacing: Duration,
) -> Result<usize> {
    let total = records.len();
    for (i, record) in records.iter().enumerate() {
        let line = line_protocol::encode(record, Utc::now());
        publisher.publish(topic, line).await?;
        info!("published {}/{} records", i + 1, total);

        if !pacing.is_zero() && i + 1 < total {
            publisher.pause(pacing).await?;
        }
    }
    Ok(total)
}

/// Transform a CSV payload, then connect and publish every record.
///
/// The whole dataset is turned into records before `connect` is called, so a
/// bad row anywhere aborts the run without touching the sink. A failed close
/// after the last message is only logged.
pub async fn run<P, F, Fut>(data: &[u8], cfg: &Config, connect: F) -> Result<usize>
where
    P: Publisher,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<P>>,
{
    info!("parsing dataset");
    let records = process::build_records(data, cfg)?;

    info!(records = records.len(), "publishing records");
    let mut publisher = connect().await?;
    let sent = publish_all(&mut publisher, &records, &cfg.topic, cfg.pacing()).await?;
    if let Err(e) = publisher.close().await {
        warn!(error = %e, "closing publisher failed");
    }
    Ok(sent)
}
