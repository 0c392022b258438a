use crate::{accessory::Pin, app::Options, *};
use serde::{Deserialize, Serialize};
use std::{
    io::{Read, Write},
    path::Path,
};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "snake_case", default)]
pub struct Configuration {
    pub nest:      Arc<NestConfiguration>,
    pub accessory: Arc<AccessoryConfiguration>,
    pub mqtt:      Arc<MQTTConfiguration>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields, rename_all = "snake_case", default)]
pub struct NestConfiguration {
    pub product_id:     String,
    pub product_secret: String,
    pub state:          String,
    pub pin:            String,
    pub token:          String,
    pub api_url:        String,
    pub token_url:      String,
    pub authorize_url:  String,
}

impl Default for NestConfiguration {
    fn default() -> Self {
        NestConfiguration {
            product_id:     Default::default(),
            product_secret: Default::default(),
            state:          Default::default(),
            pin:            Default::default(),
            token:          Default::default(),
            api_url:        "https://developer-api.nest.com".into(),
            token_url:      "https://api.home.nest.com/oauth2/access_token".into(),
            authorize_url:  "https://home.nest.com/login/oauth2".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields, rename_all = "snake_case", default)]
pub struct AccessoryConfiguration {
    pub setup_code:       Pin,
    pub manufacturer:     String,
    pub model:            String,
    pub min_temperature:  f64,
    pub max_temperature:  f64,
    pub temperature_step: f64,
}

impl Default for AccessoryConfiguration {
    fn default() -> Self {
        AccessoryConfiguration {
            setup_code:       Default::default(),
            manufacturer:     "Nest".into(),
            model:            "Thermostat".into(),
            min_temperature:  9.0,
            max_temperature:  32.0,
            temperature_step: 0.5,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields, rename_all = "snake_case", default)]
pub struct MQTTConfiguration {
    pub client_id:       String,
    pub host:            String,
    pub port:            u16,
    pub base_topic:      String,
    /// Seconds a publisher waits for the first broker connection
    pub connect_timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username:        Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password:        Option<String>,
}

impl Default for MQTTConfiguration {
    fn default() -> Self {
        MQTTConfiguration {
            client_id:       "thermobridge".into(),
            host:            "localhost".into(),
            port:            1883,
            base_topic:      "thermobridge".into(),
            connect_timeout: 10,
            username:        None,
            password:        None,
        }
    }
}

fn set_if_given(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

impl Configuration {
    pub fn load(file: &Path) -> Result<Self> {
        let path = file.to_string_lossy();
        let mut f = std::fs::File::open(file)
            .with_context(|| format!("Could not load configuration from file {}!", path))?;
        let mut contents = String::new();
        f.read_to_string(&mut contents)?;
        let c = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse contents of {}!", path))?;
        Ok(c)
    }

    /// Loads the configuration file when present and applies the command line on top.
    pub fn resolve(opts: &Options) -> Result<Arc<Self>> {
        let mut config = if opts.config.exists() {
            Self::load(&opts.config)?
        } else {
            debug!(
                "No configuration at {}, using defaults",
                opts.config.to_string_lossy()
            );
            Self::default()
        };
        config.apply(opts)?;
        Ok(Arc::new(config))
    }

    pub fn apply(&mut self, opts: &Options) -> Result<()> {
        let nest = Arc::make_mut(&mut self.nest);
        set_if_given(&mut nest.product_id, &opts.product_id);
        set_if_given(&mut nest.product_secret, &opts.product_secret);
        set_if_given(&mut nest.state, &opts.state);
        set_if_given(&mut nest.pin, &opts.nest_pin);
        set_if_given(&mut nest.token, &opts.nest_token);

        if let Some(pin) = opts.homekit_pin.as_deref().filter(|p| !p.is_empty()) {
            Arc::make_mut(&mut self.accessory).setup_code = pin
                .parse()
                .context("Invalid --homekit-pin")?;
        }
        Ok(())
    }

    pub fn generate_default(file: &Path) -> Result<()> {
        let path = file.to_string_lossy();
        let config = Self::default();
        let content = toml::to_string_pretty(&config)?;
        let mut f = std::fs::File::create(file)
            .with_context(|| format!("Could not create file {}!", path))?;
        f.write_all(content.as_bytes())?;
        Ok(())
    }
}
