pub use crate::prelude::*;
use crate::{
    accessory::mqtt::MQTTService,
    bridge::{AccessoryRegistry, BindingFactory, SyncLoop},
    nest::NestClient,
};
use tokio::sync::mpsc;

mod args;
mod shutdown;

pub use args::Options;
use shutdown::Shutdown;

#[derive(Clone, Deref, Debug)]
pub struct App(Arc<AppServices>);

#[derive(Debug)]
pub struct AppServices {
    pub config: Arc<Configuration>,
    pub nest:   NestClient,
    pub mqtt:   MQTTService,
}

impl App {
    pub async fn new() -> Result<Self> {
        let opts = args::parse()?;
        simplelog::TermLogger::init(
            match opts.verbosity {
                0 => simplelog::LevelFilter::Warn,
                1 => simplelog::LevelFilter::Info,
                2 => simplelog::LevelFilter::Debug,
                _ => simplelog::LevelFilter::Trace,
            },
            simplelog::ConfigBuilder::new()
                .add_filter_allow_str("thermobridge")
                .set_location_level(simplelog::LevelFilter::Debug)
                .set_target_level(simplelog::LevelFilter::Error)
                .set_time_format_str("%D %T")
                .set_time_to_local(true)
                .build(),
            simplelog::TerminalMode::Mixed,
        )?;
        if opts.generate {
            info!(
                "Generating new configuration file at {}",
                opts.config.to_string_lossy()
            );
            Configuration::generate_default(&opts.config)?;
            std::process::exit(0);
        }

        info!("Starting thermobridge");
        let config = Configuration::resolve(&opts)?;
        let nest = NestClient::new(config.nest.clone())?;
        let mqtt = MQTTService::new(&config.mqtt, config.accessory.setup_code.clone());
        Ok(App(Arc::new(AppServices { config, nest, mqtt })))
    }

    /// Runs the bridge. Only returns with an error: the feed failed, the
    /// accessory network or one of its publishers failed, or the process was
    /// told to stop.
    pub async fn start(&self) -> Result<()> {
        let token = self.nest.authorize().await?;
        if self.config.nest.token.is_empty() {
            println!("Nest access token (reuse with --nest-token): {}", token);
        }

        let mut shutdown = Shutdown::listen()?;
        let (failures, mut failures_rx) = mpsc::unbounded_channel();
        let factory = BindingFactory::new(
            self.config.accessory.clone(),
            Arc::new(self.mqtt.clone()),
            Arc::new(self.nest.clone()),
            failures,
        );
        let sync = SyncLoop::new(Arc::new(AccessoryRegistry::new(factory)));
        let feed = self.nest.devices_stream().await?;

        let result = tokio::select! {
            r = sync.run(feed) => r,
            r = self.mqtt.run() => Err(BridgeError::transport(
                r.err().unwrap_or_else(|| anyhow!("MQTT service stopped")),
            )),
            Some(failure) = failures_rx.recv() => Err(failure.into()),
            e = shutdown.recv() => Err(e),
        };
        result.map_err(Error::from)
    }
}
