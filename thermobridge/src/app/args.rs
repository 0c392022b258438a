use super::*;
use std::path::PathBuf;
use structopt::{clap::AppSettings::*, StructOpt};

pub fn parse() -> Result<Options> {
    Ok(Options::from_args())
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "thermobridge",
    rename_all = "kebab_case",
    author,
    about,
    settings = &[DeriveDisplayOrder, DisableHelpSubcommand, UnifiedHelpMessage]
)]
pub struct Options {
    /// Nest API product (client) id
    #[structopt(long)]
    pub product_id: Option<String>,

    /// Nest API product secret
    #[structopt(long)]
    pub product_secret: Option<String>,

    /// Anti-forgery state sent with the authorization request
    #[structopt(long)]
    pub state: Option<String>,

    /// Pin obtained from the Nest authorization page
    #[structopt(long)]
    pub nest_pin: Option<String>,

    /// Existing Nest access token, skips the pin exchange
    #[structopt(long)]
    pub nest_token: Option<String>,

    /// Setup code presented to accessory clients (XXX-XX-XXX)
    #[structopt(long)]
    pub homekit_pin: Option<String>,

    /// Location of the bridge configuration file
    #[structopt(short = "c", long, parse(from_os_str), default_value = "thermobridge.toml")]
    pub config: PathBuf,

    /// Generate configuration with default values
    #[structopt(short, long)]
    pub generate: bool,

    /// Verbosity level of output
    #[structopt(short = "v", long, parse(from_occurrences))]
    pub verbosity: u64,
}
