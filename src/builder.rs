//! Unsigned transaction assembly, fee estimation and change computation.

use crate::keys::SpendKind;
use crate::utxo::Utxo;
use crate::{Error, Result};
use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, Script, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

/// Size of a legacy P2PKH scriptSig (signature, sighash byte, pubkey) with
/// headroom for an uncompressed key.
pub const DUMMY_SCRIPT_SIG_LEN: usize = 105;

/// Value of the stand-in change output used while sizing a transaction.
pub const CHANGE_PLACEHOLDER: u64 = 5_000;

const SCHNORR_SIGNATURE_LEN: usize = 64;

/// Fee for `tx` once every input carries a legacy scriptSig and the change
/// output exists: serialized length times `fee_rate`.
pub fn estimate_fee(tx: &Transaction, change_script: &Script, fee_rate: u64) -> u64 {
    let mut sized = tx.clone();
    for input in &mut sized.input {
        input.script_sig = ScriptBuf::from_bytes(vec![0u8; DUMMY_SCRIPT_SIG_LEN]);
    }
    sized.output.push(TxOut {
        value: Amount::from_sat(CHANGE_PLACEHOLDER),
        script_pubkey: change_script.to_owned(),
    });
    let len = bitcoin::consensus::serialize(&sized).len() as u64;
    fee_rate.saturating_mul(len)
}

/// Fee for `tx` as it stands, with placeholder signatures of the right
/// shape for `kind` on every input that has none.
pub fn estimate_fee_vsize(tx: &Transaction, kind: SpendKind, fee_rate: u64) -> u64 {
    let mut sized = tx.clone();
    for input in &mut sized.input {
        match kind {
            SpendKind::Legacy if input.script_sig.is_empty() => {
                input.script_sig = ScriptBuf::from_bytes(vec![0u8; DUMMY_SCRIPT_SIG_LEN]);
            }
            SpendKind::Taproot if input.witness.is_empty() => {
                input.witness = Witness::from_slice(&[[0u8; SCHNORR_SIGNATURE_LEN]]);
            }
            _ => {}
        }
    }
    fee_rate.saturating_mul(sized.vsize() as u64)
}

/// A transaction ready for signing, with the outputs it spends.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    pub prevouts: Vec<TxOut>,
    pub fee: u64,
    pub change: u64,
}

#[derive(Debug, Clone)]
pub struct TxBuilder {
    change_script: ScriptBuf,
    inputs: Vec<TxIn>,
    prevouts: Vec<TxOut>,
    outputs: Vec<TxOut>,
}

impl TxBuilder {
    /// Starts a transaction whose change returns to `change_script`.
    pub fn new(change_script: ScriptBuf) -> Self {
        Self {
            change_script,
            inputs: Vec::new(),
            prevouts: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Spends `utxo`, locked by `script_pubkey`.
    pub fn add_input(&mut self, utxo: &impl Utxo, script_pubkey: ScriptBuf) -> &mut Self {
        self.inputs.push(TxIn {
            previous_output: utxo.outpoint(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        });
        self.prevouts.push(TxOut {
            value: Amount::from_sat(utxo.value_sats()),
            script_pubkey,
        });
        self
    }

    pub fn add_output(&mut self, value: u64, script_pubkey: ScriptBuf) -> &mut Self {
        self.outputs.push(TxOut {
            value: Amount::from_sat(value),
            script_pubkey,
        });
        self
    }

    /// `None` if the values overflow.
    pub fn input_value(&self) -> Option<u64> {
        checked_total(&self.prevouts)
    }

    pub fn output_value(&self) -> Option<u64> {
        checked_total(&self.outputs)
    }

    pub fn unsigned(&self) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: self.inputs.clone(),
            output: self.outputs.clone(),
        }
    }

    pub fn estimate_fee(&self, fee_rate: u64) -> u64 {
        estimate_fee(&self.unsigned(), &self.change_script, fee_rate)
    }

    /// Fee for inputs signed as `kind`, change output included.
    pub fn estimate_fee_for(&self, kind: SpendKind, fee_rate: u64) -> u64 {
        match kind {
            SpendKind::Legacy => self.estimate_fee(fee_rate),
            SpendKind::Taproot => {
                let mut tx = self.unsigned();
                tx.output.push(TxOut {
                    value: Amount::from_sat(CHANGE_PLACEHOLDER),
                    script_pubkey: self.change_script.clone(),
                });
                estimate_fee_vsize(&tx, kind, fee_rate)
            }
        }
    }

    /// Appends the change output. Fails with the shortfall, and produces
    /// nothing to sign, when less than one sat of change would remain.
    pub fn finalize(self, fee_rate: u64) -> Result<UnsignedTransaction> {
        let fee = self.estimate_fee(fee_rate);
        self.finalize_with_fee(fee)
    }

    pub fn finalize_with_fee(self, fee: u64) -> Result<UnsignedTransaction> {
        let inputs = self
            .input_value()
            .ok_or_else(|| Error::input("input values overflow"))?;
        let spent = self
            .output_value()
            .and_then(|outputs| outputs.checked_add(fee))
            .ok_or_else(|| Error::input("output values overflow"))?;

        log::debug!("inputs {inputs} sats, outputs {} sats, fee {fee} sats", spent - fee);

        if inputs <= spent {
            return Err(Error::Funds {
                shortfall: spent - inputs + 1,
            });
        }

        let change = inputs - spent;
        let mut tx = self.unsigned();
        tx.output.push(TxOut {
            value: Amount::from_sat(change),
            script_pubkey: self.change_script,
        });

        Ok(UnsignedTransaction {
            tx,
            prevouts: self.prevouts,
            fee,
            change,
        })
    }
}

fn checked_total(outputs: &[TxOut]) -> Option<u64> {
    outputs
        .iter()
        .try_fold(0u64, |total, out| total.checked_add(out.value.to_sat()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utxo::Unspent;
    use bitcoin::hashes::Hash;
    use bitcoin::{OutPoint, PubkeyHash, Txid};

    fn script(n: u8) -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([n; 20]))
    }

    fn builder(value: u64) -> TxBuilder {
        let mut builder = TxBuilder::new(script(1));
        builder
            .add_input(
                &Unspent::new(OutPoint::new(Txid::from_byte_array([3; 32]), 0), value),
                script(1),
            )
            .add_output(546, script(2));
        builder
    }

    #[test]
    fn estimate_counts_dummy_script_sig_and_change() {
        let builder = builder(10_000);
        let bare = bitcoin::consensus::serialize(&builder.unsigned()).len() as u64;
        // scriptSig grows by 105 bytes, plus one 34-byte P2PKH output
        assert_eq!(builder.estimate_fee(1), bare + 105 + 34);
    }

    #[test]
    fn estimate_is_monotonic_in_rate() {
        let builder = builder(10_000);
        let mut last = builder.estimate_fee(1);
        for rate in 2..50 {
            let fee = builder.estimate_fee(rate);
            assert!(fee > last);
            last = fee;
        }
    }

    #[test]
    fn finalize_appends_change_last() {
        let builder = builder(10_000);
        let fee = builder.estimate_fee(2);
        let unsigned = builder.finalize(2).unwrap();
        assert_eq!(unsigned.fee, fee);
        assert_eq!(unsigned.change, 10_000 - 546 - fee);
        assert_eq!(unsigned.tx.output.len(), 2);
        assert_eq!(unsigned.tx.output[1].script_pubkey, script(1));
        assert_eq!(unsigned.tx.output[1].value.to_sat(), unsigned.change);
        assert_eq!(unsigned.prevouts.len(), 1);
    }

    #[test]
    fn taproot_inputs_are_cheaper_than_legacy_estimate() {
        let builder = builder(10_000);
        assert!(
            builder.estimate_fee_for(SpendKind::Taproot, 5)
                < builder.estimate_fee_for(SpendKind::Legacy, 5)
        );
    }

    #[test]
    fn zero_change_is_a_funds_error() {
        let probe = builder(0).estimate_fee(1);
        let exact = builder(546 + probe);
        assert!(matches!(exact.finalize(1), Err(Error::Funds { shortfall: 1 })));

        let one_more = builder(546 + probe + 1).finalize(1).unwrap();
        assert_eq!(one_more.change, 1);
    }

    #[test]
    fn overflowing_outputs_are_rejected() {
        let mut builder = builder(10_000);
        builder.add_output(u64::MAX, script(2));
        assert_eq!(builder.output_value(), None);
        assert!(matches!(builder.finalize_with_fee(1), Err(Error::Input(_))));
    }
}
