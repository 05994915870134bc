// src/publish/mqtt.rs
use super::Publisher;
use crate::{Error, Result};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Split `host:port`, `tcp://host:port` or `mqtt://host` into host and port.
pub fn parse_broker(broker: &str) -> Result<(String, u16)> {
    let with_scheme = if broker.contains("://") {
        broker.to_string()
    } else {
        format!("tcp://{}", broker)
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| Error::config(format!("invalid broker address '{}': {}", broker, e)))?;
    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::config(format!("broker address '{}' has no host", broker)))?;
    Ok((host.to_string(), url.port().unwrap_or(DEFAULT_MQTT_PORT)))
}

/// QoS 0, non-retained publisher over a single MQTT session.
///
/// The event loop is driven inline: every call polls it until the packet it
/// queued has been written, so publishes stay strictly sequential. Between
/// messages [`Publisher::pause`] keeps polling so keep-alive pings go out.
pub struct MqttPublisher {
    client: AsyncClient,
    eventloop: EventLoop,
    broker: String,
}

impl MqttPublisher {
    /// Open a session and wait for the broker's CONNACK.
    pub async fn connect(broker: &str, client_id: &str) -> Result<Self> {
        Self::connect_with_keep_alive(broker, client_id, DEFAULT_KEEP_ALIVE).await
    }

    /// `keep_alive` must be zero or at least one second.
    #[instrument(level = "info", skip(client_id))]
    pub async fn connect_with_keep_alive(
        broker: &str,
        client_id: &str,
        keep_alive: Duration,
    ) -> Result<Self> {
        if !keep_alive.is_zero() && keep_alive < Duration::from_secs(1) {
            return Err(Error::config("keep-alive must be zero or at least one second"));
        }
        let (host, port) = parse_broker(broker)?;
        let mut opts = MqttOptions::new(client_id, host, port);
        opts.set_keep_alive(keep_alive);

        let (client, mut eventloop) = AsyncClient::new(opts, 10);
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(Error::sink_connect(
                            broker,
                            format!("broker refused connection: {:?}", ack.code),
                        ));
                    }
                    break;
                }
                Ok(event) => debug!(?event, "waiting for CONNACK"),
                Err(e) => return Err(Error::sink_connect(broker, e)),
            }
        }

        info!("connected to broker");
        Ok(Self {
            client,
            eventloop,
            broker: broker.to_string(),
        })
    }
}

impl Publisher for MqttPublisher {
    async fn publish(&mut self, topic: &str, payload: String) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.into_bytes())
            .await
            .map_err(|e| Error::publish(topic, e))?;

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Publish(_))) => return Ok(()),
                Ok(event) => debug!(?event, "mqtt event"),
                Err(e) => return Err(Error::publish(topic, e)),
            }
        }
    }

    async fn pause(&mut self, delay: Duration) -> Result<()> {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                event = self.eventloop.poll() => match event {
                    Ok(event) => debug!(?event, "mqtt event while idle"),
                    Err(e) => return Err(Error::sink_connect(&self.broker, e)),
                },
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| Error::sink_connect(&self.broker, format!("disconnect: {}", e)))?;

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    info!(broker = %self.broker, "disconnected");
                    return Ok(());
                }
                Ok(event) => debug!(?event, "mqtt event"),
                Err(e) => {
                    return Err(Error::sink_connect(
                        &self.broker,
                        format!("disconnect: {}", e),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::{mpsc, oneshot};

    #[test]
    fn test_parse_broker_forms() -> Result<()> {
        assert_eq!(parse_broker("0.0.0.0:1883")?, ("0.0.0.0".to_string(), 1883));
        assert_eq!(
            parse_broker("tcp://broker.local:1884")?,
            ("broker.local".to_string(), 1884)
        );
        assert_eq!(parse_broker("mqtt://broker.local")?, ("broker.local".to_string(), 1883));
        assert_eq!(parse_broker("[::1]:1885")?, ("::1".to_string(), 1885));
        Ok(())
    }

    #[test]
    fn test_parse_broker_rejects_garbage() {
        assert!(matches!(parse_broker("host:notaport"), Err(Error::Config { .. })));
        assert!(matches!(parse_broker(""), Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let err = MqttPublisher::connect(&addr.to_string(), "loadfeed-test")
            .await
            .err()
            .expect("connect should fail");
        assert!(matches!(err, Error::SinkConnect { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_refused_connack_fails() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 256];
                let _ = sock.read(&mut buf).await;
                // CONNACK, return code 5: not authorized
                let _ = sock.write_all(&[0x20, 0x02, 0x00, 0x05]).await;
                let _ = sock.read(&mut buf).await;
            }
        });

        let err = MqttPublisher::connect(&addr.to_string(), "loadfeed-test")
            .await
            .err()
            .expect("connect should be refused");
        assert!(matches!(err, Error::SinkConnect { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_reaches_broker() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<Vec<u8>>();
        let line = "sensor,country=DE load_actual=1000.000000,load_forecast=1100.000000 1";

        tokio::spawn(async move {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let _ = sock.write_all(&[0x20, 0x02, 0x00, 0x00]).await;

            let mut seen = Vec::new();
            let mut tx = Some(tx);
            loop {
                match sock.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        seen.extend_from_slice(&buf[..n]);
                        if seen.windows(line.len()).any(|w| w == line.as_bytes()) {
                            if let Some(tx) = tx.take() {
                                let _ = tx.send(seen.clone());
                            }
                        }
                    }
                }
            }
        });

        let mut publisher = MqttPublisher::connect(&addr.to_string(), "loadfeed-test").await?;
        publisher.publish("sensor", line.to_string()).await?;

        let seen = tokio::time::timeout(Duration::from_secs(5), rx).await??;
        // topic name is on the wire right before the payload
        assert!(seen.windows(6).any(|w| w == b"sensor"));
        Ok(())
    }

    /// Minimal broker: answers CONNECT and PINGREQ, reports every packet type it sees.
    async fn recording_broker() -> Result<(String, mpsc::UnboundedReceiver<u8>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let mut pending: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = match sock.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                pending.extend_from_slice(&buf[..n]);

                while let Some(len) = frame_len(&pending) {
                    let packet_type = pending[0] >> 4;
                    pending.drain(..len);
                    let _ = tx.send(packet_type);
                    let reply: &[u8] = match packet_type {
                        1 => &[0x20, 0x02, 0x00, 0x00],
                        12 => &[0xD0, 0x00],
                        _ => &[],
                    };
                    if !reply.is_empty() && sock.write_all(reply).await.is_err() {
                        return;
                    }
                }
            }
        });
        Ok((addr.to_string(), rx))
    }

    /// Total length of the first complete packet in `buf`, if there is one.
    fn frame_len(buf: &[u8]) -> Option<usize> {
        let mut remaining = 0usize;
        let mut shift = 0;
        for (i, byte) in buf.iter().enumerate().skip(1).take(4) {
            remaining |= ((byte & 0x7F) as usize) << shift;
            if byte & 0x80 == 0 {
                let total = i + 1 + remaining;
                return (buf.len() >= total).then_some(total);
            }
            shift += 7;
        }
        None
    }

    #[tokio::test]
    async fn test_pings_sent_during_long_pacing() -> Result<()> {
        let (addr, mut packets) = recording_broker().await?;
        let keep_alive = Duration::from_secs(1);
        let mut publisher =
            MqttPublisher::connect_with_keep_alive(&addr, "loadfeed-test", keep_alive).await?;

        let now = chrono::Utc::now();
        let records: Vec<crate::Record> = ["DE", "AT"]
            .iter()
            .map(|c| crate::Record {
                timestamp: now,
                country_code: c.to_string(),
                load_actual: 1.0,
                load_forecast: 2.0,
            })
            .collect();

        // pacing well past the keep-alive interval
        crate::publish::publish_all(
            &mut publisher,
            &records,
            "sensor",
            Duration::from_millis(2500),
        )
        .await?;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut seen = Vec::new();
        while let Ok(t) = packets.try_recv() {
            seen.push(t);
        }
        let publishes: Vec<usize> = seen
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == 3)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(seen.first(), Some(&1), "packets: {:?}", seen);
        assert_eq!(publishes.len(), 2, "packets: {:?}", seen);
        assert!(
            seen[publishes[0]..publishes[1]].contains(&12),
            "no PINGREQ between publishes: {:?}",
            seen
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sub_second_keep_alive_rejected() {
        let err = MqttPublisher::connect_with_keep_alive(
            "127.0.0.1:1883",
            "loadfeed-test",
            Duration::from_millis(500),
        )
        .await
        .err()
        .expect("sub-second keep-alive should be rejected");
        assert!(matches!(err, Error::Config { .. }));
    }
}
