//! Bitcoin Core JSON-RPC collaborator.

use crate::config::Config;
use crate::utxo::{Unspent, UtxoSource};
use crate::{Error, Result};
use bitcoin::{Address, OutPoint, Transaction, TxOut, Txid};
use bitcoincore_rpc::{Auth, Client, RpcApi};

/// The node operations wallet flows depend on.
pub trait NodeClient {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid>;
    fn transaction(&self, txid: &Txid) -> Result<Transaction>;
    /// Zero while the transaction is unconfirmed.
    fn confirmations(&self, txid: &Txid) -> Result<u32>;
    fn block_count(&self) -> Result<u64>;
}

pub struct BitcoindClient {
    client: Client,
    wallet_name: String,
}

impl BitcoindClient {
    /// Connects to the wallet-scoped endpoint with cookie authentication.
    pub fn new(config: &Config) -> Result<Self> {
        let url = config.btc.wallet_url();
        let client = Client::new(&url, Auth::CookieFile(config.btc.cookie_path.clone()))?;
        log::debug!("rpc endpoint {url}");
        Ok(Self {
            client,
            wallet_name: config.btc.wallet_name.clone(),
        })
    }

    /// Loads the configured wallet, creating a watch-only one if missing.
    pub fn ensure_wallet(&self) -> Result<()> {
        if self.client.list_wallets()?.contains(&self.wallet_name) {
            return Ok(());
        }
        match self.client.load_wallet(&self.wallet_name) {
            Ok(_) => Ok(()),
            Err(err) => {
                log::info!("loading wallet {} failed ({err}), creating it", self.wallet_name);
                self.client
                    .create_wallet(&self.wallet_name, Some(true), None, None, None)?;
                Ok(())
            }
        }
    }

    /// Watches `address` so `listunspent` reports its outputs.
    pub fn import_address(&self, address: &Address) -> Result<()> {
        self.client.import_address(address, None, Some(false))?;
        Ok(())
    }
}

impl NodeClient for BitcoindClient {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        Ok(self.client.send_raw_transaction(tx)?)
    }

    fn transaction(&self, txid: &Txid) -> Result<Transaction> {
        Ok(self.client.get_raw_transaction(txid, None)?)
    }

    fn confirmations(&self, txid: &Txid) -> Result<u32> {
        let info = self.client.get_raw_transaction_info(txid, None)?;
        Ok(info.confirmations.unwrap_or(0))
    }

    fn block_count(&self) -> Result<u64> {
        Ok(self.client.get_block_count()?)
    }
}

impl UtxoSource for BitcoindClient {
    fn unspent(&self, address: &Address) -> Result<Vec<Unspent>> {
        let entries = self
            .client
            .list_unspent(Some(0), None, Some(&[address]), Some(true), None)?;
        Ok(entries.iter().map(Unspent::from_utxo).collect())
    }
}

/// Looks up the output spent by `outpoint`.
pub fn previous_output(node: &dyn NodeClient, outpoint: &OutPoint) -> Result<TxOut> {
    let tx = node.transaction(&outpoint.txid)?;
    tx.output
        .get(outpoint.vout as usize)
        .cloned()
        .ok_or_else(|| Error::Verification(format!("{outpoint} does not exist")))
}
