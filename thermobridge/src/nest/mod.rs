//! Client for the Nest developer API: authorization, the device stream and
//! the thermostat mutators.

use crate::{bridge::ThermostatApi, prelude::*};
use async_trait::async_trait;
use parking_lot::RwLock as SyncRwLock;
use reqwest::{header::ACCEPT, Client, Response};
use serde::Deserialize;
use serde_json::json;
pub use stream::DeviceStream;
pub use thermostat::*;

mod stream;
mod thermostat;

/// Mode commands understood by the Nest API.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ModeCommand {
    #[display(fmt = "heat")]
    Heat,
    #[display(fmt = "cool")]
    Cool,
    #[display(fmt = "off")]
    Off,
    #[display(fmt = "heat-cool")]
    HeatCool,
}

#[derive(Deserialize, Debug)]
struct AccessToken {
    access_token: String,
    #[serde(default)]
    expires_in:   u64,
}

#[derive(Clone, Debug, Deref)]
pub struct NestClient(Arc<NestClientData>);

#[derive(Debug)]
pub struct NestClientData {
    http:   Client,
    config: Arc<NestConfiguration>,
    token:  SyncRwLock<Option<String>>,
}

impl NestClient {
    pub fn new(config: Arc<NestConfiguration>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Could not build HTTP client")?;
        let token = Some(config.token.clone()).filter(|t| !t.is_empty());
        Ok(NestClient(Arc::new(NestClientData {
            token: SyncRwLock::new(token),
            http,
            config,
        })))
    }

    /// Page where a user grants access and receives a pin.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&state={}",
            self.config.authorize_url, self.config.product_id, self.config.state
        )
    }

    /// Returns the configured token, or exchanges the pin for a new one.
    pub async fn authorize(&self) -> Result<String> {
        if let Some(token) = self.token.read().clone() {
            debug!("Using provided Nest token");
            return Ok(token);
        }
        if self.config.pin.is_empty() {
            bail!(
                "No Nest token or pin given; obtain a pin at {}",
                self.authorization_url()
            );
        }

        info!("Exchanging Nest pin for an access token");
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.product_id.as_str()),
                ("client_secret", self.config.product_secret.as_str()),
                ("code", self.config.pin.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("Nest token request failed")?;
        let token: AccessToken = check(response).await?.json().await?;
        debug!("Nest token expires in {} seconds", token.expires_in);
        *self.token.write() = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    fn token(&self) -> Result<String> {
        self.token
            .read()
            .clone()
            .ok_or_else(|| anyhow!("Not authorized with Nest"))
    }

    /// Opens the device change feed.
    pub async fn devices_stream(&self) -> Result<DeviceStream> {
        let url = format!("{}/devices.json", self.config.api_url);
        info!("Subscribing to Nest device stream");
        let response = self
            .http
            .get(&url)
            .query(&[("auth", self.token()?)])
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .context("Could not open Nest device stream")?;
        Ok(DeviceStream::new(check(response).await?))
    }

    async fn update_thermostat(&self, device_id: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}/devices/thermostats/{}", self.config.api_url, device_id);
        trace!("PUT {} <= {}", url, body);
        let response = self
            .http
            .put(&url)
            .query(&[("auth", self.token()?)])
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Nest update of {} failed", device_id))?;
        check(response).await?;
        Ok(())
    }
}

/// Turns a non-success response into an error carrying its body.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("Nest responded {}: {}", status, body.trim()))
    }
}

#[async_trait]
impl ThermostatApi for NestClient {
    async fn set_target_temperature(&self, device_id: &str, celsius: f32) -> Result<()> {
        self.update_thermostat(device_id, json!({ "target_temperature_c": celsius }))
            .await
    }

    async fn set_hvac_mode(&self, device_id: &str, mode: ModeCommand) -> Result<()> {
        self.update_thermostat(device_id, json!({ "hvac_mode": mode.to_string() }))
            .await
    }
}
