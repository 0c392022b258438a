pub use crate::{app::App, config::*, error::BridgeError};
pub use anyhow::{Context, Error, Result};
pub use std::sync::Arc;
pub use tokio::sync::{Mutex, RwLock};
