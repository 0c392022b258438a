use super::*;
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Termination signals that end the bridge.
pub struct Shutdown {
    interrupt: Signal,
    terminate: Signal,
}

impl Shutdown {
    pub fn listen() -> Result<Self> {
        Ok(Shutdown {
            interrupt: signal(SignalKind::interrupt()).context("Could not listen for SIGINT")?,
            terminate: signal(SignalKind::terminate()).context("Could not listen for SIGTERM")?,
        })
    }

    pub async fn recv(&mut self) -> BridgeError {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        };
        warn!("{} received, shutting down", name);
        BridgeError::Terminated
    }
}
