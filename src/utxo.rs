//! Unspent outputs as seen by the core: an outpoint and a value. Each
//! external listing format is an adapter implementing [`Utxo`].

use crate::Result;
use bitcoin::{Address, OutPoint, Txid};
use bitcoincore_rpc::json::ListUnspentResultEntry;
use serde::{Deserialize, Serialize};

pub trait Utxo {
    fn txid(&self) -> Txid;
    fn vout(&self) -> u32;
    fn value_sats(&self) -> u64;

    fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid(), self.vout())
    }
}

/// Source-independent unspent output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unspent {
    pub outpoint: OutPoint,
    pub value: u64,
}

impl Unspent {
    pub fn new(outpoint: OutPoint, value: u64) -> Self {
        Self { outpoint, value }
    }

    pub fn from_utxo(utxo: &impl Utxo) -> Self {
        Self::new(utxo.outpoint(), utxo.value_sats())
    }
}

impl Utxo for Unspent {
    fn txid(&self) -> Txid {
        self.outpoint.txid
    }

    fn vout(&self) -> u32 {
        self.outpoint.vout
    }

    fn value_sats(&self) -> u64 {
        self.value
    }

    fn outpoint(&self) -> OutPoint {
        self.outpoint
    }
}

/// Lists the unspent outputs paying to an address.
pub trait UtxoSource {
    fn unspent(&self, address: &Address) -> Result<Vec<Unspent>>;
}

impl Utxo for ListUnspentResultEntry {
    fn txid(&self) -> Txid {
        self.txid
    }

    fn vout(&self) -> u32 {
        self.vout
    }

    fn value_sats(&self) -> u64 {
        self.amount.to_sat()
    }
}

/// Electrum-proxy listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebUtxo {
    #[serde(default)]
    pub height: i64,
    pub tx_hash: Txid,
    pub tx_pos: u32,
    pub value: u64,
}

impl Utxo for WebUtxo {
    fn txid(&self) -> Txid {
        self.tx_hash
    }

    fn vout(&self) -> u32 {
        self.tx_pos
    }

    fn value_sats(&self) -> u64 {
        self.value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EsploraStatus {
    pub confirmed: bool,
    pub block_height: Option<u64>,
}

/// Esplora `/address/:address/utxo` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EsploraUtxo {
    pub txid: Txid,
    pub vout: u32,
    pub value: u64,
    #[serde(default)]
    pub status: EsploraStatus,
}

impl Utxo for EsploraUtxo {
    fn txid(&self) -> Txid {
        self.txid
    }

    fn vout(&self) -> u32 {
        self.vout
    }

    fn value_sats(&self) -> u64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    #[test]
    fn web_and_esplora_entries_normalize_alike() -> anyhow::Result<()> {
        let web: WebUtxo = serde_json::from_str(&format!(
            r#"{{"height":100,"tx_hash":"{TXID}","tx_pos":1,"value":7000}}"#
        ))?;
        let esplora: EsploraUtxo = serde_json::from_str(&format!(
            r#"{{"txid":"{TXID}","vout":1,"value":7000,"status":{{"confirmed":true,"block_height":100}}}}"#
        ))?;
        let expected = Unspent::new(OutPoint::new(Txid::from_str(TXID)?, 1), 7000);
        assert_eq!(Unspent::from_utxo(&web), expected);
        assert_eq!(Unspent::from_utxo(&esplora), expected);
        Ok(())
    }

    #[test]
    fn unconfirmed_esplora_entry_has_no_height() -> anyhow::Result<()> {
        let esplora: EsploraUtxo = serde_json::from_str(&format!(
            r#"{{"txid":"{TXID}","vout":0,"value":546,"status":{{"confirmed":false}}}}"#
        ))?;
        assert!(!esplora.status.confirmed);
        assert_eq!(esplora.status.block_height, None);
        Ok(())
    }
}
