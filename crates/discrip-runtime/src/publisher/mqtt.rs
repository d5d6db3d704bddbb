//! MQTT transport built on `rumqttc`.
//!
//! Each connection gets a driver task that polls the `rumqttc` event loop
//! for as long as the session lives, so keep-alive pings go out while the
//! worker sits idle between discs. The driver forwards publish
//! confirmations and the error that ends the session; a session that died
//! while idle therefore fails the next publish instead of swallowing it.

use std::time::Duration;

use async_trait::async_trait;
use discrip_core::{OutboundMessage, PublishError, Qos, Transport};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Requests buffered between the client handle and its event loop.
const CLIENT_CAPACITY: usize = 16;

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    /// Limit on waiting for CONNACK.
    pub connect_timeout: Duration,
    /// Limit on waiting for a publish to be sent or acknowledged.
    pub publish_timeout: Duration,
}

impl MqttConfig {
    pub fn new(host: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MQTT_PORT,
            client_id: client_id.into(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            publish_timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        if let Some(username) = &self.username {
            options.set_credentials(username.clone(), self.password.clone().unwrap_or_default());
        }
        options
    }
}

/// What the driver task reports back to the transport.
type SessionEvent = Result<Event, String>;

/// A live broker connection and the task servicing it.
struct Session {
    client: AsyncClient,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    driver: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// One broker session at a time; `connect` replaces any previous one.
pub struct MqttTransport {
    config: MqttConfig,
    session: Option<Session>,
}

impl MqttTransport {
    pub const fn new(config: MqttConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Whether a session is established and its driver still running.
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.driver.is_finished())
    }
}

const fn to_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Whether `event` completes a publish sent with `qos`.
fn confirms(event: &Event, qos: QoS) -> bool {
    match (event, qos) {
        (Event::Outgoing(Outgoing::Publish(_)), QoS::AtMostOnce)
        | (Event::Incoming(Packet::PubAck(_)), QoS::AtLeastOnce)
        | (Event::Incoming(Packet::PubComp(_)), QoS::ExactlyOnce) => true,
        _ => false,
    }
}

/// Whether `event` can complete a publish of any QoS.
const fn is_confirmation(event: &Event) -> bool {
    matches!(
        event,
        Event::Outgoing(Outgoing::Publish(_))
            | Event::Incoming(Packet::PubAck(_) | Packet::PubComp(_))
    )
}

/// Poll the event loop until the session fails or the transport goes away.
async fn drive_session(mut eventloop: EventLoop, events: mpsc::UnboundedSender<SessionEvent>) {
    loop {
        match eventloop.poll().await {
            Ok(event) => {
                if is_confirmation(&event) && events.send(Ok(event)).is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!(error = %e, "MQTT session ended");
                let _ = events.send(Err(e.to_string()));
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&mut self) -> Result<(), PublishError> {
        self.session = None;
        let (client, mut eventloop) = AsyncClient::new(self.config.options(), CLIENT_CAPACITY);

        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(PublishError::Connection(e.to_string())),
                }
            }
        };
        timeout(self.config.connect_timeout, handshake)
            .await
            .map_err(|_| PublishError::Connection("timed out waiting for CONNACK".to_string()))??;

        debug!(host = %self.config.host, port = self.config.port, "Connected to MQTT broker");
        let (sender, events) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive_session(eventloop, sender));
        self.session = Some(Session {
            client,
            events,
            driver,
        });
        Ok(())
    }

    async fn publish(&mut self, message: &OutboundMessage) -> Result<(), PublishError> {
        let publish_timeout = self.config.publish_timeout;
        let Some(session) = self.session.as_mut() else {
            return Err(PublishError::NotConnected);
        };

        let qos = to_qos(message.options.qos);
        let outcome = match session
            .client
            .publish(message.topic.clone(), qos, message.options.retain, message.payload.clone())
            .await
        {
            Ok(()) => {
                let confirmation = async {
                    loop {
                        match session.events.recv().await {
                            Some(Ok(event)) if confirms(&event, qos) => return Ok(()),
                            Some(Ok(_)) => {}
                            Some(Err(e)) => return Err(PublishError::Connection(e)),
                            None => return Err(PublishError::Connection("session closed".to_string())),
                        }
                    }
                };
                match timeout(publish_timeout, confirmation).await {
                    Ok(result) => result,
                    Err(_) => Err(PublishError::Delivery("timed out waiting for acknowledgement".to_string())),
                }
            }
            Err(e) => Err(PublishError::Delivery(e.to_string())),
        };

        if outcome.is_err() {
            self.session = None;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{PubAck, PubComp};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_qos_mapping() {
        assert_eq!(to_qos(Qos::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(to_qos(Qos::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(to_qos(Qos::ExactlyOnce), QoS::ExactlyOnce);
    }

    #[test]
    fn test_confirmation_depends_on_qos() {
        let sent = Event::Outgoing(Outgoing::Publish(1));
        let acked = Event::Incoming(Packet::PubAck(PubAck::new(1)));
        let completed = Event::Incoming(Packet::PubComp(PubComp::new(1)));

        assert!(confirms(&sent, QoS::AtMostOnce));
        assert!(!confirms(&sent, QoS::AtLeastOnce));
        assert!(confirms(&acked, QoS::AtLeastOnce));
        assert!(!confirms(&acked, QoS::ExactlyOnce));
        assert!(confirms(&completed, QoS::ExactlyOnce));
    }

    #[tokio::test]
    async fn test_publish_without_connect_fails() {
        let mut transport = MqttTransport::new(MqttConfig::new("localhost", "test"));
        let message = OutboundMessage::new("t", "x", discrip_core::PublishOptions::default());
        assert_eq!(transport.publish(&message).await, Err(PublishError::NotConnected));
    }

    #[test]
    fn test_only_confirmations_are_forwarded() {
        assert!(is_confirmation(&Event::Outgoing(Outgoing::Publish(1))));
        assert!(is_confirmation(&Event::Incoming(Packet::PubAck(PubAck::new(1)))));
        assert!(!is_confirmation(&Event::Outgoing(Outgoing::PingReq)));
        assert!(!is_confirmation(&Event::Incoming(Packet::PingResp)));
    }

    /// Accept one client, answer its CONNECT with a CONNACK, then hang up.
    async fn broker_that_hangs_up() -> (u16, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let broker = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut connect = [0u8; 256];
            let _ = stream.read(&mut connect).await.unwrap();
            stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();
            stream.flush().await.unwrap();
        });
        (port, broker)
    }

    #[tokio::test]
    async fn test_session_lost_while_idle_fails_next_publish() {
        let (port, broker) = broker_that_hangs_up().await;
        let mut transport = MqttTransport::new(MqttConfig::new("127.0.0.1", "test").with_port(port));

        transport.connect().await.unwrap();
        broker.await.unwrap();

        // The driver notices the closed socket without any publish traffic.
        for _ in 0..100 {
            if !transport.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!transport.is_connected());

        let message = OutboundMessage::new("t", "x", discrip_core::PublishOptions::default());
        assert!(transport.publish(&message).await.is_err());
        assert_eq!(transport.publish(&message).await, Err(PublishError::NotConnected));
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_connection_error() {
        let mut config = MqttConfig::new("127.0.0.1", "test").with_port(1);
        config.connect_timeout = Duration::from_secs(2);
        let mut transport = MqttTransport::new(config);
        assert!(matches!(transport.connect().await, Err(PublishError::Connection(_))));
    }
}
