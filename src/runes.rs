//! Runes operations built on the runestone codec.

use crate::builder::TxBuilder;
use crate::indexer::{EventSource, RuneOutpoint, RuneOutpointSource};
use crate::keys::Sender;
use crate::rpc::{previous_output, NodeClient};
use crate::wallet::Wallet;
use crate::{Error, Result};
use bitcoin::{Address, Transaction, Txid};
use ordinals::{Artifact, Edict, RuneId, Runestone};
use serde::Serialize;

/// Output index the rune destination takes in a transfer.
const DESTINATION_OUTPUT: u32 = 0;
/// Output index of the change, which also receives unallocated runes.
const CHANGE_OUTPUT: u32 = 2;

/// Mints `rune` into the sender's change output.
pub fn mint(wallet: &Wallet, sender: &Sender, rune: RuneId, fee_rate: u64) -> Result<Txid> {
    let utxos = wallet.unspent(sender.address())?;
    let funding = wallet
        .selector()
        .select_one(&utxos, wallet.policy().min_funding)?;

    let runestone = Runestone {
        mint: Some(rune),
        ..Default::default()
    };

    let mut builder = TxBuilder::new(sender.script_pubkey());
    builder
        .add_input(&funding, sender.script_pubkey())
        .add_output(0, runestone.encipher());
    let fee = builder.estimate_fee_for(sender.kind(), fee_rate);
    let tx = builder.finalize_with_fee(fee)?.sign(sender)?;

    let txid = wallet.broadcast(&tx)?;
    log::info!("minted {rune} in {txid}");
    Ok(txid)
}

/// First listed output holding at least `amount` of `rune`.
pub fn select_rune_outpoint(
    outpoints: &[RuneOutpoint],
    rune: RuneId,
    amount: u128,
) -> Option<&RuneOutpoint> {
    outpoints
        .iter()
        .find(|outpoint| outpoint.balance(rune).is_some_and(|balance| balance >= amount))
}

/// Sends `amount` of `rune` to `destination`. Any other runes on the
/// carrier, and the remainder of this one, go back to the sender's change.
pub fn transfer(
    wallet: &Wallet,
    indexer: &dyn RuneOutpointSource,
    sender: &Sender,
    rune: RuneId,
    amount: u128,
    destination: &Address,
    fee_rate: u64,
) -> Result<Txid> {
    if amount == 0 {
        return Err(Error::input("rune amount must be positive"));
    }
    let outpoints = indexer.rune_outpoints(sender.address())?;
    let carrier = select_rune_outpoint(&outpoints, rune, amount)
        .ok_or_else(|| Error::input(format!("no output of {} holds {amount} of {rune}", sender.address())))?
        .outpoint;

    let utxos = wallet.unspent(sender.address())?;
    let carrier = utxos
        .iter()
        .find(|utxo| utxo.outpoint == carrier)
        .copied()
        .ok_or_else(|| Error::input(format!("rune output {carrier} is not unspent")))?;
    let fee_utxo = wallet.selector().select_one_excluding(
        &utxos,
        wallet.policy().min_funding,
        carrier.outpoint,
    )?;

    let runestone = Runestone {
        edicts: vec![Edict {
            id: rune,
            amount,
            output: DESTINATION_OUTPUT,
        }],
        pointer: Some(CHANGE_OUTPUT),
        ..Default::default()
    };

    let mut builder = TxBuilder::new(sender.script_pubkey());
    builder
        .add_input(&carrier, sender.script_pubkey())
        .add_input(&fee_utxo, sender.script_pubkey())
        .add_output(wallet.policy().dust_limit, destination.script_pubkey())
        .add_output(0, runestone.encipher());
    let fee = builder.estimate_fee_for(sender.kind(), fee_rate);
    let tx = builder.finalize_with_fee(fee)?.sign(sender)?;

    let txid = wallet.broadcast(&tx)?;
    log::info!("sent {amount} of {rune} to {destination} in {txid}");
    Ok(txid)
}

/// Splits one output into `count` outputs of `value` sats back to the
/// sender, plus change.
pub fn split(wallet: &Wallet, sender: &Sender, count: u32, value: u64, fee_rate: u64) -> Result<Txid> {
    if count == 0 {
        return Err(Error::input("split count must be positive"));
    }
    if value < wallet.policy().dust_limit {
        return Err(Error::input(format!(
            "split value {value} is below the dust limit"
        )));
    }
    let required = value
        .checked_mul(u64::from(count))
        .ok_or_else(|| Error::input("split total overflows"))?;

    let utxos = wallet.unspent(sender.address())?;
    let funding = wallet.selector().select_one(&utxos, required)?;

    let mut builder = TxBuilder::new(sender.script_pubkey());
    builder.add_input(&funding, sender.script_pubkey());
    for _ in 0..count {
        builder.add_output(value, sender.script_pubkey());
    }
    let fee = builder.estimate_fee_for(sender.kind(), fee_rate);
    let unsigned = builder.finalize_with_fee(fee)?;
    log::debug!("split into {count} x {value} sats, change {}", unsigned.change);
    let tx = unsigned.sign(sender)?;

    wallet.broadcast(&tx)
}

/// Fetches `txid` and deciphers its runestone, if any.
pub fn decode(node: &dyn NodeClient, txid: &Txid) -> Result<Option<Artifact>> {
    Ok(Runestone::decipher(&node.transaction(txid)?))
}

#[derive(Debug, Clone)]
pub struct RunesDepositRequest {
    pub txid: Txid,
    pub from: Address,
    pub to: Address,
    pub rune: RuneId,
    pub amount: u128,
}

/// Checks on chain that `request.txid` moved exactly `request.amount` of
/// the rune from `from` to `to`, and has confirmed.
pub fn verify_deposit(node: &dyn NodeClient, request: &RunesDepositRequest) -> Result<Edict> {
    let tx = node.transaction(&request.txid)?;
    let runestone = match Runestone::decipher(&tx) {
        None => {
            return Err(Error::Verification(format!(
                "{} carries no runestone",
                request.txid
            )))
        }
        Some(Artifact::Cenotaph(cenotaph)) => {
            return Err(Error::Verification(format!(
                "{} is a cenotaph: {}",
                request.txid, cenotaph.flaw
            )))
        }
        Some(Artifact::Runestone(runestone)) => runestone,
    };

    let confirmations = node.confirmations(&request.txid)?;
    if confirmations < 1 {
        return Err(Error::Verification(format!(
            "{} is not confirmed",
            request.txid
        )));
    }

    check_sender(node, &tx, &request.from)?;

    let to = request.to.script_pubkey();
    runestone
        .edicts
        .iter()
        .find(|edict| {
            edict.id == request.rune
                && edict.amount == request.amount
                && tx
                    .output
                    .get(edict.output as usize)
                    .is_some_and(|output| output.script_pubkey == to)
        })
        .copied()
        .ok_or_else(|| {
            Error::Verification(format!(
                "{} has no edict moving {} of {} to {}",
                request.txid, request.amount, request.rune, request.to
            ))
        })
}

fn check_sender(node: &dyn NodeClient, tx: &Transaction, from: &Address) -> Result<()> {
    let input = tx
        .input
        .first()
        .ok_or_else(|| Error::Verification("transaction has no inputs".to_string()))?;
    let spent = previous_output(node, &input.previous_output)?;
    if spent.script_pubkey != from.script_pubkey() {
        return Err(Error::Verification(format!(
            "first input was not spent by {from}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunesTransferParties {
    pub sender: String,
    pub receiver: String,
}

/// Sender and receiver of a runes transfer as reported by the indexer.
pub fn verify_deposit_events(events: &dyn EventSource, txid: &Txid) -> Result<RunesTransferParties> {
    let mut sender = None;
    let mut receiver = None;
    for event in events.runes_events(txid)? {
        match (event.event_type.as_str(), event.wallet_addr) {
            ("input", Some(wallet)) => sender = Some(wallet),
            ("output", Some(wallet)) => receiver = Some(wallet),
            _ => {}
        }
    }
    match (sender, receiver) {
        (Some(sender), Some(receiver)) => Ok(RunesTransferParties { sender, receiver }),
        _ => Err(Error::Verification(format!(
            "{txid} is not a runes transfer"
        ))),
    }
}
