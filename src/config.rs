//! Wallet configuration, read once from a JSON document and passed by
//! reference to every operation.

use crate::chain::Chain;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chain: Chain,
    pub btc: BtcConfig,
    pub opi: OpiConfig,
    pub bis: BisConfig,
    pub policy: Policy,
}

/// Where unspent outputs are listed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtxoSourceKind {
    #[default]
    Node,
    Electrum,
    Esplora,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BtcConfig {
    pub rpc_host: String,
    pub cookie_path: PathBuf,
    pub wallet_name: String,
    pub ord_path: PathBuf,
    pub bitcoin_data_dir: Option<PathBuf>,
    pub ord_data_dir: Option<PathBuf>,
    pub utxo_source: UtxoSourceKind,
    pub electrum_proxy: String,
    pub esplora_url: String,
    pub mempool_url: String,
}

impl Default for BtcConfig {
    fn default() -> Self {
        Self {
            rpc_host: "http://127.0.0.1:18443".to_string(),
            cookie_path: PathBuf::from(".cookie"),
            wallet_name: "tokenwallet".to_string(),
            ord_path: PathBuf::from("ord"),
            bitcoin_data_dir: None,
            ord_data_dir: None,
            utxo_source: UtxoSourceKind::default(),
            electrum_proxy: String::new(),
            esplora_url: "https://mempool.space/api".to_string(),
            mempool_url: "https://mempool.space/api".to_string(),
        }
    }
}

impl BtcConfig {
    /// Wallet-scoped RPC endpoint, `<host>/wallet/<name>`.
    pub fn wallet_url(&self) -> String {
        format!(
            "{}/wallet/{}",
            self.rpc_host.trim_end_matches('/'),
            self.wallet_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpiConfig {
    pub brc20_url: String,
    pub runes_url: String,
    pub endpoints: OpiEndpoints,
}

impl Default for OpiConfig {
    fn default() -> Self {
        Self {
            brc20_url: "http://127.0.0.1:3000".to_string(),
            runes_url: "http://127.0.0.1:3001".to_string(),
            endpoints: OpiEndpoints::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpiEndpoints {
    pub brc20_events_by_inscription_id: String,
    pub brc20_balance: String,
    pub runes_balance: String,
    pub runes_events_by_txid: String,
    pub runes_unspent_outpoints: String,
}

impl Default for OpiEndpoints {
    fn default() -> Self {
        Self {
            brc20_events_by_inscription_id: "/v1/brc20/event".to_string(),
            brc20_balance: "/v1/brc20/get_current_balance_of_wallet".to_string(),
            runes_balance: "/v1/runes/get_current_balance_of_wallet".to_string(),
            runes_events_by_txid: "/v1/runes/get_events".to_string(),
            runes_unspent_outpoints: "/v1/runes/get_unspent_rune_outpoints_of_wallet".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BisConfig {
    pub base_url: String,
    pub api_key: String,
}

impl Default for BisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bestinslot.xyz".to_string(),
            api_key: String::new(),
        }
    }
}

/// Amounts and bounds used by selection, fee planning and retry loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Postage of inscription and rune carriers.
    pub dust_limit: u64,
    /// UTXOs above this value are treated as fee candidates.
    pub fee_utxo_threshold: u64,
    /// Extra sats locked in the commit output on top of the reveal fee.
    pub commit_buffer: u64,
    pub min_funding: u64,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub tool_attempts: u32,
    pub tool_backoff_ms: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            dust_limit: 546,
            fee_utxo_threshold: 6500,
            commit_buffer: 100,
            min_funding: 1000,
            poll_attempts: 120,
            poll_interval_ms: 1000,
            tool_attempts: 10,
            tool_backoff_ms: 1000,
        }
    }
}

impl Policy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn tool_backoff(&self) -> Duration {
        Duration::from_millis(self.tool_backoff_ms)
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let mut home = dirs::home_dir().unwrap_or_default();
        home.push(".tokenwallet");
        home.push("config.json");
        home
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads `path` when given, else the default location if it exists,
    /// else built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    log::debug!("no config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn ord_data_dir(&self) -> PathBuf {
        self.btc
            .ord_data_dir
            .clone()
            .unwrap_or_else(|| self.chain.default_data_dir().join("ord"))
    }
}
