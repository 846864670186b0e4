use crate::config::{Config, Policy};
use crate::poller::Poller;
use crate::rpc::NodeClient;
use crate::selector::Selector;
use crate::utxo::{Unspent, UtxoSource};
use crate::Result;
use bitcoin::{Address, Network, Transaction, Txid};

/// Collaborators shared by every wallet operation.
#[derive(Clone, Copy)]
pub struct Wallet<'a> {
    pub config: &'a Config,
    pub node: &'a dyn NodeClient,
    pub utxos: &'a dyn UtxoSource,
}

impl<'a> Wallet<'a> {
    pub fn new(config: &'a Config, node: &'a dyn NodeClient, utxos: &'a dyn UtxoSource) -> Self {
        Self {
            config,
            node,
            utxos,
        }
    }

    pub fn network(&self) -> Network {
        self.config.chain.network()
    }

    pub fn policy(&self) -> &'a Policy {
        &self.config.policy
    }

    pub fn selector(&self) -> Selector<'a> {
        Selector::new(&self.config.policy)
    }

    pub fn poller(&self) -> Poller {
        Poller::from_policy(&self.config.policy)
    }

    pub fn unspent(&self, address: &Address) -> Result<Vec<Unspent>> {
        self.utxos.unspent(address)
    }

    pub fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        let txid = self.node.broadcast(tx)?;
        log::info!("broadcast {txid} ({} vB)", tx.vsize());
        Ok(txid)
    }
}
