//! Two-phase taproot inscription: a commit output locking the envelope
//! leaf, then a reveal spending it through the script path.

use crate::builder::TxBuilder;
use crate::config::Policy;
use crate::keys::Sender;
use crate::signer::sign_script_spend;
use crate::taproot::TaprootCommitMetadata;
use crate::utxo::Unspent;
use crate::wallet::Wallet;
use crate::{Error, Result};
use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use ordinals::Inscription;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const SCHNORR_SIGNATURE_LEN: usize = 64;

/// `<txid>i<index>`: the reveal transaction and the inscription's position
/// within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InscriptionId {
    pub txid: Txid,
    pub index: u32,
}

impl Display for InscriptionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}i{}", self.txid, self.index)
    }
}

impl FromStr for InscriptionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (txid, index) = s
            .rsplit_once('i')
            .ok_or_else(|| Error::input(format!("inscription id {s} has no index")))?;
        Ok(Self {
            txid: txid
                .parse()
                .map_err(|e| Error::input(format!("inscription id {s}: {e}")))?,
            index: index
                .parse()
                .map_err(|e| Error::input(format!("inscription id {s}: {e}")))?,
        })
    }
}

impl Serialize for InscriptionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InscriptionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Signed commit and reveal transactions, not yet broadcast.
#[derive(Debug, Clone)]
pub struct InscriptionPlan {
    pub commit: Transaction,
    pub reveal: Transaction,
    pub commit_fee: u64,
    pub reveal_fee: u64,
    /// Value locked in the commit output for the reveal to spend.
    pub payforward: u64,
    /// Everything that ends up with miners: the commit fee plus whatever
    /// the reveal does not pass on as postage.
    pub total_fee: u64,
}

impl InscriptionPlan {
    pub fn inscription_id(&self) -> InscriptionId {
        InscriptionId {
            txid: self.reveal.compute_txid(),
            index: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InscriptionResult {
    pub commit: Txid,
    pub reveal: Txid,
    pub inscription: InscriptionId,
    pub total_fee: u64,
}

pub struct Inscriber<'a> {
    policy: &'a Policy,
    network: Network,
}

impl<'a> Inscriber<'a> {
    pub fn new(policy: &'a Policy, network: Network) -> Self {
        Self { policy, network }
    }

    /// Builds and signs both transactions. `funding` must pay to `sender`;
    /// the inscription lands on `receiver` with the dust-limit postage.
    pub fn plan(
        &self,
        sender: &Sender,
        funding: &Unspent,
        inscription: &Inscription,
        receiver: &Address,
        fee_rate: u64,
    ) -> Result<InscriptionPlan> {
        let meta = TaprootCommitMetadata::for_inscription(
            sender.secp(),
            sender.x_only_public_key(),
            inscription,
            self.network,
        )?;
        let postage = self.policy.dust_limit;

        let mut reveal = reveal_template(&meta, receiver.script_pubkey(), postage);
        let reveal_fee = fee_rate.saturating_mul(reveal.vsize() as u64);
        let payforward = reveal_fee
            .saturating_add(postage)
            .saturating_add(self.policy.commit_buffer);

        let mut commit = TxBuilder::new(sender.script_pubkey());
        commit
            .add_input(funding, sender.script_pubkey())
            .add_output(payforward, meta.pk_script.clone());
        let commit_fee = commit.estimate_fee_for(sender.kind(), fee_rate);
        let commit = commit.finalize_with_fee(commit_fee)?.sign(sender)?;

        log::debug!(
            "commit fee {commit_fee}, reveal fee {reveal_fee}, payforward {payforward} at {fee_rate} sat/vB"
        );

        reveal.input[0].previous_output = OutPoint::new(commit.compute_txid(), 0);
        let commit_output = TxOut {
            value: Amount::from_sat(payforward),
            script_pubkey: meta.pk_script.clone(),
        };
        sign_script_spend(
            &mut reveal,
            0,
            &[commit_output],
            &meta.lock_script,
            &meta.control_block,
            sender,
        )?;

        Ok(InscriptionPlan {
            commit,
            reveal,
            commit_fee,
            reveal_fee,
            payforward,
            total_fee: commit_fee
                .saturating_add(payforward)
                .saturating_sub(postage),
        })
    }
}

/// Reveal spending a placeholder outpoint, with a witness of the final size.
fn reveal_template(meta: &TaprootCommitMetadata, receiver: ScriptBuf, postage: u64) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::from_slice(&[
                vec![0u8; SCHNORR_SIGNATURE_LEN],
                meta.lock_script.to_bytes(),
                meta.control_block.serialize(),
            ]),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(postage),
            script_pubkey: receiver,
        }],
    }
}

/// Funds, signs and broadcasts an inscription from `sender`'s outputs.
pub fn inscribe(
    wallet: &Wallet,
    sender: &Sender,
    inscription: &Inscription,
    receiver: &Address,
    fee_rate: u64,
) -> Result<InscriptionResult> {
    let utxos = wallet.unspent(sender.address())?;
    let funding = wallet
        .selector()
        .select_one(&utxos, wallet.policy().min_funding)?;

    let plan = Inscriber::new(wallet.policy(), wallet.network()).plan(
        sender,
        &funding,
        inscription,
        receiver,
        fee_rate,
    )?;

    let commit = wallet.broadcast(&plan.commit)?;
    let reveal = wallet.broadcast(&plan.reveal)?;
    let inscription = plan.inscription_id();
    log::info!(
        "inscribed {inscription} for {receiver}, {} sats in fees",
        plan.total_fee
    );

    Ok(InscriptionResult {
        commit,
        reveal,
        inscription,
        total_fee: plan.total_fee,
    })
}
