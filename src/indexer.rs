//! Read-only HTTP collaborators: token indexers, fee estimates and
//! address UTXO listings.

use crate::config::{BisConfig, BtcConfig, OpiConfig};
use crate::utxo::{EsploraUtxo, Unspent, UtxoSource, WebUtxo};
use crate::{Error, Result};
use bitcoin::{Address, Network, OutPoint, Txid};
use ordinals::RuneId;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// OPI envelope.
#[derive(Debug, Deserialize)]
pub struct OpiResponse<T> {
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    pub result: T,
}

/// OPI runes envelope, which also reports the indexed height.
#[derive(Debug, Deserialize)]
pub struct RunesResponse<T> {
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    pub result: T,
    #[serde(default)]
    pub db_block_height: Option<u64>,
}

/// BestInSlot envelope.
#[derive(Debug, Deserialize)]
pub struct BisResponse<T> {
    pub data: T,
    #[serde(default)]
    pub block_height: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brc20Event {
    pub event_type: String,
    pub tick: String,
    pub amount: String,
    pub source_wallet: String,
    #[serde(rename = "source_pkScript", default)]
    pub source_pk_script: String,
    #[serde(default)]
    pub spent_wallet: Option<String>,
    #[serde(rename = "spent_pkScript", default)]
    pub spent_pk_script: Option<String>,
    #[serde(default)]
    pub using_tx_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunesEvent {
    pub event_type: String,
    #[serde(default)]
    pub outpoint: Option<String>,
    #[serde(default)]
    pub pkscript: Option<String>,
    #[serde(default)]
    pub wallet_addr: Option<String>,
    pub rune_id: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brc20Balance {
    pub overall_balance: String,
    pub available_balance: String,
    pub block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunesBalance {
    pub pkscript: String,
    pub wallet_addr: String,
    pub rune_id: RuneId,
    #[serde(default)]
    pub rune_name: String,
    pub total_balance: String,
}

/// An output holding runes, with one balance per listed rune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneOutpoint {
    pub pkscript: String,
    pub wallet_addr: String,
    #[serde(alias = "output")]
    pub outpoint: OutPoint,
    pub rune_ids: Vec<RuneId>,
    #[serde(deserialize_with = "balances")]
    pub balances: Vec<u128>,
}

impl RuneOutpoint {
    pub fn balance(&self, id: RuneId) -> Option<u128> {
        self.rune_ids
            .iter()
            .zip(&self.balances)
            .find(|(rune, _)| **rune == id)
            .map(|(_, balance)| *balance)
    }
}

/// Indexers report balances either as JSON numbers or decimal strings.
fn balances<'de, D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Vec<u128>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Balance {
        Number(u128),
        Text(String),
    }

    Vec::<Balance>::deserialize(deserializer)?
        .into_iter()
        .map(|balance| match balance {
            Balance::Number(n) => Ok(n),
            Balance::Text(s) => s.parse().map_err(serde::de::Error::custom),
        })
        .collect()
}

pub trait EventSource {
    fn brc20_events(&self, inscription_id: &str) -> Result<Vec<Brc20Event>>;
    fn runes_events(&self, txid: &Txid) -> Result<Vec<RunesEvent>>;
}

pub trait RuneOutpointSource {
    fn rune_outpoints(&self, address: &Address) -> Result<Vec<RuneOutpoint>>;
}

fn http() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(concat!("tokenwallet/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn get_json<T: DeserializeOwned>(request: reqwest::blocking::RequestBuilder) -> Result<T> {
    let response = request.send()?;
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(Error::Network(format!("http status {status}: {body}")));
    }
    serde_json::from_str(&body).map_err(|e| {
        log::error!("unexpected response body: {body}");
        Error::Network(format!("malformed response: {e}"))
    })
}

fn check_error(error: Option<serde_json::Value>) -> Result<()> {
    match error {
        None | Some(serde_json::Value::Null) => Ok(()),
        Some(error) => Err(Error::Network(format!("indexer error: {error}"))),
    }
}

pub struct OpiClient<'a> {
    config: &'a OpiConfig,
    http: Client,
}

impl<'a> OpiClient<'a> {
    pub fn new(config: &'a OpiConfig) -> Result<Self> {
        for url in [&config.brc20_url, &config.runes_url] {
            if !url.starts_with("http") {
                return Err(Error::Config(format!("indexer url {url} needs an http(s) scheme")));
            }
        }
        Ok(Self {
            config,
            http: http()?,
        })
    }

    fn brc20_url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.config.brc20_url.trim_end_matches('/'))
    }

    fn runes_url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.config.runes_url.trim_end_matches('/'))
    }

    pub fn brc20_balance(&self, address: &Address, ticker: &str) -> Result<Brc20Balance> {
        let url = self.brc20_url(&self.config.endpoints.brc20_balance);
        let address = address.to_string();
        let response: OpiResponse<Brc20Balance> = get_json(
            self.http
                .get(url)
                .query(&[("address", address.as_str()), ("ticker", ticker)]),
        )?;
        check_error(response.error)?;
        Ok(response.result)
    }

    pub fn runes_balance(&self, address: &Address) -> Result<Vec<RunesBalance>> {
        let url = self.runes_url(&self.config.endpoints.runes_balance);
        let response: RunesResponse<Vec<RunesBalance>> =
            get_json(self.http.get(url).query(&[("address", address.to_string())]))?;
        check_error(response.error)?;
        Ok(response.result)
    }
}

impl EventSource for OpiClient<'_> {
    fn brc20_events(&self, inscription_id: &str) -> Result<Vec<Brc20Event>> {
        let url = self.brc20_url(&self.config.endpoints.brc20_events_by_inscription_id);
        let response: OpiResponse<Vec<Brc20Event>> =
            get_json(self.http.get(url).query(&[("inscription_id", inscription_id)]))?;
        check_error(response.error)?;
        Ok(response.result)
    }

    fn runes_events(&self, txid: &Txid) -> Result<Vec<RunesEvent>> {
        let url = self.runes_url(&self.config.endpoints.runes_events_by_txid);
        let response: OpiResponse<Vec<RunesEvent>> =
            get_json(self.http.get(url).query(&[("transaction_id", txid.to_string())]))?;
        check_error(response.error)?;
        Ok(response.result)
    }
}

impl RuneOutpointSource for OpiClient<'_> {
    fn rune_outpoints(&self, address: &Address) -> Result<Vec<RuneOutpoint>> {
        let url = self.runes_url(&self.config.endpoints.runes_unspent_outpoints);
        let response: RunesResponse<Vec<RuneOutpoint>> =
            get_json(self.http.get(url).query(&[("address", address.to_string())]))?;
        check_error(response.error)?;
        if let Some(height) = response.db_block_height {
            log::debug!("rune outpoints for {address} as of block {height}");
        }
        Ok(response.result)
    }
}

pub struct BisClient<'a> {
    config: &'a BisConfig,
    http: Client,
}

impl<'a> BisClient<'a> {
    pub fn new(config: &'a BisConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config("bis.api_key is not set".to_string()));
        }
        Ok(Self {
            config,
            http: http()?,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<BisResponse<T>> {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        get_json(
            self.http
                .get(url)
                .header("x-api-key", &self.config.api_key)
                .query(query),
        )
    }
}

impl RuneOutpointSource for BisClient<'_> {
    fn rune_outpoints(&self, address: &Address) -> Result<Vec<RuneOutpoint>> {
        let response: BisResponse<Vec<RuneOutpoint>> = self.get(
            "/v3/runes/wallet_valid_outputs",
            &[
                ("address", address.to_string()),
                ("order", "asc".to_string()),
                ("offset", "0".to_string()),
                ("count", "2000".to_string()),
                ("sort_by", "output".to_string()),
            ],
        )?;
        Ok(response.data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedFees {
    fastest_fee: u64,
}

/// Current `fastestFee` estimate in sat/vB.
pub fn fastest_fee_rate(config: &BtcConfig) -> Result<u64> {
    let url = format!(
        "{}/v1/fees/recommended",
        config.mempool_url.trim_end_matches('/')
    );
    let fees: RecommendedFees = get_json(http()?.get(url))?;
    log::debug!("fastest fee rate {} sat/vB", fees.fastest_fee);
    Ok(fees.fastest_fee)
}

/// Esplora-compatible address listing.
pub struct EsploraClient {
    base_url: String,
    http: Client,
}

impl EsploraClient {
    pub fn new(config: &BtcConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.esplora_url.trim_end_matches('/').to_string(),
            http: http()?,
        })
    }
}

impl UtxoSource for EsploraClient {
    fn unspent(&self, address: &Address) -> Result<Vec<Unspent>> {
        let url = format!("{}/address/{address}/utxo", self.base_url);
        let utxos: Vec<EsploraUtxo> = get_json(self.http.get(url))?;
        Ok(utxos.iter().map(Unspent::from_utxo).collect())
    }
}

#[derive(Debug, Deserialize)]
struct WebUtxoResponse {
    result: Vec<WebUtxo>,
}

/// Electrum proxy `getunspent` listing.
pub struct ElectrumProxy {
    base_url: String,
    network: Network,
    http: Client,
}

impl ElectrumProxy {
    pub fn new(config: &BtcConfig, network: Network) -> Result<Self> {
        if config.electrum_proxy.is_empty() {
            return Err(Error::Config("btc.electrum_proxy is not set".to_string()));
        }
        Ok(Self {
            base_url: config.electrum_proxy.trim_end_matches('/').to_string(),
            network,
            http: http()?,
        })
    }
}

impl UtxoSource for ElectrumProxy {
    fn unspent(&self, address: &Address) -> Result<Vec<Unspent>> {
        let url = format!("{}/getunspent", self.base_url);
        let response: WebUtxoResponse = get_json(self.http.get(url).query(&[
            ("address", address.to_string()),
            ("network", self.network.to_string()),
        ]))?;
        Ok(response.result.iter().map(Unspent::from_utxo).collect())
    }
}
