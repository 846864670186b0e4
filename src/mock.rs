//! In-memory node for tests and dry runs. Broadcasting applies the
//! transaction to the UTXO set immediately, as if it had been mined.

use crate::rpc::NodeClient;
use crate::utxo::{Unspent, UtxoSource};
use crate::{Error, Result};
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    utxos: Vec<(ScriptBuf, Unspent)>,
    transactions: HashMap<Txid, Transaction>,
    confirmations: HashMap<Txid, u32>,
    broadcasts: Vec<Transaction>,
    height: u64,
    funded: u32,
}

#[derive(Clone, Default)]
pub struct MockNode {
    state: Arc<Mutex<State>>,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credits `address` with a fresh confirmed output worth `value`.
    pub fn fund(&self, address: &Address, value: u64) -> Unspent {
        let funded = {
            let mut state = self.state();
            state.funded += 1;
            state.funded
        };
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::from_consensus(funded),
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::all_zeros(), funded),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(value),
                script_pubkey: address.script_pubkey(),
            }],
        };
        let txid = self.apply(&tx);
        self.confirm(txid, 1);
        Unspent::new(OutPoint::new(txid, 0), value)
    }

    /// Records `tx` without validating it: spent outputs disappear and
    /// spendable outputs are added.
    pub fn apply(&self, tx: &Transaction) -> Txid {
        let txid = tx.compute_txid();
        let mut state = self.state();
        state.utxos.retain(|(_, utxo)| {
            !tx.input
                .iter()
                .any(|input| input.previous_output == utxo.outpoint)
        });
        for (vout, output) in tx.output.iter().enumerate() {
            if output.script_pubkey.is_op_return() {
                continue;
            }
            let Ok(vout) = u32::try_from(vout) else {
                continue;
            };
            state.utxos.push((
                output.script_pubkey.clone(),
                Unspent::new(OutPoint::new(txid, vout), output.value.to_sat()),
            ));
        }
        state.transactions.insert(txid, tx.clone());
        txid
    }

    pub fn confirm(&self, txid: Txid, confirmations: u32) {
        self.state().confirmations.insert(txid, confirmations);
    }

    pub fn mine(&self) {
        let mut state = self.state();
        state.height += 1;
        for confirmations in state.confirmations.values_mut() {
            *confirmations += 1;
        }
    }

    pub fn broadcasts(&self) -> Vec<Transaction> {
        self.state().broadcasts.clone()
    }

    pub fn balance(&self, address: &Address) -> u64 {
        let script = address.script_pubkey();
        self.state()
            .utxos
            .iter()
            .filter(|(owner, _)| *owner == script)
            .map(|(_, utxo)| utxo.value)
            .sum()
    }
}

impl NodeClient for MockNode {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        {
            let state = self.state();
            for input in &tx.input {
                if !state
                    .utxos
                    .iter()
                    .any(|(_, utxo)| utxo.outpoint == input.previous_output)
                {
                    return Err(Error::Network(format!(
                        "bad-txns-inputs-missingorspent: {}",
                        input.previous_output
                    )));
                }
            }
        }
        let txid = self.apply(tx);
        let mut state = self.state();
        state.confirmations.insert(txid, 0);
        state.broadcasts.push(tx.clone());
        Ok(txid)
    }

    fn transaction(&self, txid: &Txid) -> Result<Transaction> {
        self.state()
            .transactions
            .get(txid)
            .cloned()
            .ok_or_else(|| Error::Network(format!("No such mempool or blockchain transaction {txid}")))
    }

    fn confirmations(&self, txid: &Txid) -> Result<u32> {
        Ok(self.state().confirmations.get(txid).copied().unwrap_or(0))
    }

    fn block_count(&self) -> Result<u64> {
        Ok(self.state().height)
    }
}

impl UtxoSource for MockNode {
    fn unspent(&self, address: &Address) -> Result<Vec<Unspent>> {
        let script = address.script_pubkey();
        Ok(self
            .state()
            .utxos
            .iter()
            .filter(|(owner, _)| *owner == script)
            .map(|(_, utxo)| *utxo)
            .collect())
    }
}
