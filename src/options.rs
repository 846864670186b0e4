use crate::chain::Chain;
use crate::config::Config;
use crate::subcommand::Subcommand;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about = "BRC-20 and Runes wallet")]
pub struct Options {
    #[clap(long, help = "Config file, defaults to ~/.tokenwallet/config.json")]
    pub config: Option<PathBuf>,
    #[clap(long, help = "Chain to use: mainnet, testnet, signet, regtest")]
    pub chain: Option<Chain>,
    #[clap(long, help = "Fee rate in sat/vB, defaults to the current fastest estimate")]
    pub fee_rate: Option<u64>,
    #[clap(subcommand)]
    pub subcommand: Subcommand,
}

impl Options {
    /// The config file with command line overrides applied.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(chain) = self.chain {
            config.chain = chain;
        }
        Ok(config)
    }
}
