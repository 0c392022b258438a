#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate clap;

#[macro_use]
extern crate derive_more;

#[macro_use]
extern crate log;

mod accessory;
mod app;
mod bridge;
mod config;
mod error;
mod nest;
mod prelude;
mod translate;

pub use prelude::*;

#[tokio::main(worker_threads = 4)]
async fn main() -> Result<()> {
    App::new().await?.start().await
}
