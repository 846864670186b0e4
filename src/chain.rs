use crate::{Error, Result};
use bitcoin::Network;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Mainnet,
    Testnet,
    Signet,
    #[default]
    Regtest,
}

impl Chain {
    /// Address and key parameters. Testnet deployments run against signet.
    pub fn network(self) -> Network {
        match self {
            Chain::Mainnet => Network::Bitcoin,
            Chain::Testnet | Chain::Signet => Network::Signet,
            Chain::Regtest => Network::Regtest,
        }
    }

    /// Network flag passed to the `ord` binary, none on mainnet.
    pub fn ord_flag(self) -> Option<&'static str> {
        match self {
            Chain::Mainnet => None,
            Chain::Testnet | Chain::Signet => Some("-t"),
            Chain::Regtest => Some("-r"),
        }
    }

    pub fn default_data_dir(self) -> PathBuf {
        let mut home = dirs::home_dir().unwrap_or_default();
        home.push(".tokenwallet");
        home.push(self.to_string());
        home
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            Chain::Mainnet => "mainnet",
            Chain::Testnet => "testnet",
            Chain::Signet => "signet",
            Chain::Regtest => "regtest",
        };
        f.write_str(name)
    }
}

impl FromStr for Chain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mainnet" => Ok(Chain::Mainnet),
            "testnet" => Ok(Chain::Testnet),
            "signet" => Ok(Chain::Signet),
            "regtest" => Ok(Chain::Regtest),
            _ => Err(Error::Input(format!("unknown chain: {s}"))),
        }
    }
}
