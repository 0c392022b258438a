use super::*;
use announce::Announcement;
use rumqttc::{self, AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};
use std::{collections::HashMap, time::Duration};
use tokio::sync::watch;
pub use topics::{topic_id, Topics};

mod announce;
mod topics;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// State of the broker session as seen by the poll loop.
#[derive(Clone, Debug, PartialEq)]
enum Connection {
    Pending,
    Online,
    Failed(String),
}

/// Accessory network carried over an MQTT broker.
#[derive(Clone, Deref)]
pub struct MQTTService(Arc<MQTTServiceData>);

pub struct MQTTServiceData {
    client:          AsyncClient,
    eventloop:       Mutex<EventLoop>,
    connection:      watch::Sender<Connection>,
    connect_timeout: Duration,
    topics:          Topics,
    setup_code:      Pin,
    accessories:     RwLock<HashMap<String, ThermostatAccessory>>,
}

impl std::fmt::Debug for MQTTService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MQTTService")
            .field("topics", &self.topics)
            .finish()
    }
}

impl MQTTService {
    pub fn new(config: &MQTTConfiguration, setup_code: Pin) -> Self {
        let topics = Topics::new(&config.base_topic);
        let mut mqtt_options =
            MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        mqtt_options.set_keep_alive(Duration::from_secs(5));
        mqtt_options.set_last_will(LastWill::new(
            topics.availability(),
            "offline",
            QoS::AtLeastOnce,
            true,
        ));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            mqtt_options.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = AsyncClient::new(mqtt_options, 10);
        let (connection, _) = watch::channel(Connection::Pending);
        MQTTService(Arc::new(MQTTServiceData {
            eventloop: Mutex::new(eventloop),
            connect_timeout: Duration::from_secs(config.connect_timeout),
            accessories: Default::default(),
            connection,
            client,
            topics,
            setup_code,
        }))
    }

    /// Drives the broker connection. Fails if the first connection attempt
    /// fails; once connected, errors are logged and the next poll reconnects.
    pub async fn run(&self) -> Result<()> {
        let mut eventloop = self.eventloop.lock().await;
        let mut connected = false;
        info!("Connecting to MQTT broker");
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("MQTT connected");
                    connected = true;
                    self.connection.send_replace(Connection::Online);
                    self.restore_session().await;
                }
                Ok(Event::Incoming(Incoming::Publish(p))) => {
                    self.handle_message(p)
                        .await
                        .unwrap_or_else(|e| warn!("Error handling accessory request: {:?}", e));
                }
                Ok(_) => (),
                Err(e) if !connected => {
                    self.connection
                        .send_replace(Connection::Failed(e.to_string()));
                    return Err(e).context("Could not connect to MQTT broker");
                }
                Err(e) => {
                    error!("Error received on MQTT poll: {:?}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// Resolves once the broker session is up, fails if the first connection
    /// attempt failed or did not complete within the configured timeout.
    async fn online(&self) -> Result<()> {
        tokio::time::timeout(self.connect_timeout, self.wait_online())
            .await
            .map_err(|_| {
                anyhow!(
                    "No MQTT connection after {} seconds",
                    self.connect_timeout.as_secs()
                )
            })?
    }

    async fn wait_online(&self) -> Result<()> {
        let mut state = self.connection.subscribe();
        loop {
            let current = state.borrow_and_update().clone();
            match current {
                Connection::Online => return Ok(()),
                Connection::Failed(e) => bail!("MQTT broker unavailable: {}", e),
                Connection::Pending => state.changed().await?,
            }
        }
    }

    // Runs inside the poll loop, so requests must not wait on the eventloop.
    async fn restore_session(&self) {
        if let Err(e) =
            self.client
                .try_publish(self.topics.availability(), QoS::AtLeastOnce, true, "online")
        {
            warn!("Could not publish availability: {:?}", e);
        }
        for id in self.accessories.read().await.keys() {
            debug!("Restoring subscription for accessory '{}'", id);
            if let Err(e) = self
                .client
                .try_subscribe(self.topics.command_filter(id), QoS::AtLeastOnce)
            {
                warn!("Could not subscribe for accessory '{}': {:?}", id, e);
            }
        }
    }

    async fn handle_message(&self, p: rumqttc::Publish) -> Result<()> {
        let payload = String::from_utf8(p.payload.to_vec()).unwrap_or_default();
        trace!("Payload received: '{}' => Topic: {}", payload, p.topic);
        let (id, kind) = match self.topics.parse_command(&p.topic) {
            Some(parsed) => parsed,
            None => {
                debug!("Unknown topic '{}'", p.topic);
                return Ok(());
            }
        };
        let accessory = self
            .accessories
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("No accessory published as '{}'", id))?;
        debug!("Set {} of '{}' to '{}'", kind, accessory.name(), payload);
        accessory.remote_update(kind, &payload)
    }

    async fn publish(&self, topic: &str, message: &str, retain: bool) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, message.as_bytes().to_vec())
            .await
            .with_context(|| format!("Failed to publish on {}", topic))
    }

    async fn announce(&self, id: &str, accessory: &ThermostatAccessory) -> Result<()> {
        let announcement = Announcement::new(id, accessory, &self.setup_code, &self.topics);
        self.publish(
            &self.topics.config(id),
            &serde_json::to_string(&announcement)?,
            true,
        )
        .await
    }

    async fn forward<T: CharacteristicValue>(
        &self,
        id: &str,
        characteristic: Characteristic<T>,
    ) -> Result<()> {
        let topic = self.topics.state(id, characteristic.kind());
        let mut changes = characteristic.subscribe();
        loop {
            let value = *changes.borrow_and_update();
            trace!("MQTT send on topic {}", topic);
            self.publish(&topic, &value.to_string(), true).await?;
            changes
                .changed()
                .await
                .with_context(|| format!("{} is no longer available", topic))?;
        }
    }
}

#[async_trait]
impl Publisher for MQTTService {
    async fn start(&self, accessory: ThermostatAccessory) -> Result<()> {
        self.online().await?;
        let id = topic_id(accessory.id());
        info!(
            "Publishing accessory '{}' as {}",
            accessory.name(),
            self.topics.config(&id)
        );
        self.accessories
            .write()
            .await
            .insert(id.clone(), accessory.clone());
        self.client
            .subscribe(self.topics.command_filter(&id), QoS::AtLeastOnce)
            .await?;
        self.announce(&id, &accessory).await?;
        self.publish(self.topics.availability(), "online", true)
            .await?;

        tokio::try_join!(
            self.forward(&id, accessory.current_temperature.clone()),
            self.forward(&id, accessory.target_temperature.clone()),
            self.forward(&id, accessory.target_mode.clone()),
            self.forward(&id, accessory.current_mode.clone()),
        )?;
        Ok(())
    }
}
