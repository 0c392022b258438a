use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures that end the process.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("device feed failed: {0}")]
    Feed(#[source] BoxError),

    #[error("accessory publisher for '{device_id}' failed: {source}")]
    Publisher {
        device_id: String,
        #[source]
        source:    BoxError,
    },

    #[error("accessory network failed: {0}")]
    Transport(#[source] BoxError),

    #[error("terminated by signal")]
    Terminated,
}

impl BridgeError {
    pub fn feed(e: anyhow::Error) -> Self {
        BridgeError::Feed(e.into())
    }

    pub fn transport(e: anyhow::Error) -> Self {
        BridgeError::Transport(e.into())
    }

    pub fn publisher(device_id: &str, e: anyhow::Error) -> Self {
        BridgeError::Publisher {
            device_id: device_id.into(),
            source:    e.into(),
        }
    }
}
