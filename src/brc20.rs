//! BRC-20 operations: JSON inscriptions plus moving the inscribed carrier.

use crate::builder::TxBuilder;
use crate::indexer::EventSource;
use crate::inscribe::{inscribe as inscribe_native, InscriptionId, InscriptionResult};
use crate::keys::Sender;
use crate::ord_tool::OrdTool;
use crate::selector::CarrierMatch;
use crate::wallet::Wallet;
use crate::{Error, Result};
use bitcoin::{Address, Txid};
use ordinals::Inscription;
use serde::{Deserialize, Serialize};

pub const PROTOCOL: &str = "brc-20";
pub const CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Event the indexer records when a transfer inscription is spent.
pub const TRANSFER_TRANSFER: &str = "transfer-transfer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brc20Operation {
    pub p: String,
    pub op: String,
    pub tick: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub amt: Option<String>,
}

fn check_ticker(tick: &str) -> Result<()> {
    match tick.len() {
        4 | 5 => Ok(()),
        len => Err(Error::input(format!(
            "ticker {tick:?} is {len} bytes, expected 4 or 5"
        ))),
    }
}

fn check_amount(what: &str, amount: &str) -> Result<()> {
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (amount, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if digits(whole) && fraction.map_or(true, digits) {
        Ok(())
    } else {
        Err(Error::input(format!("{what} {amount:?} is not a decimal number")))
    }
}

impl Brc20Operation {
    fn new(op: &str, tick: &str) -> Result<Self> {
        check_ticker(tick)?;
        Ok(Self {
            p: PROTOCOL.to_string(),
            op: op.to_string(),
            tick: tick.to_string(),
            max: None,
            lim: None,
            amt: None,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_inscription(&self) -> Result<Inscription> {
        Ok(Inscription::new(
            Some(CONTENT_TYPE.as_bytes().to_vec()),
            Some(self.to_json()?.into_bytes()),
        ))
    }
}

pub fn deploy_payload(tick: &str, max: &str, lim: Option<&str>) -> Result<Brc20Operation> {
    check_amount("max", max)?;
    if let Some(lim) = lim {
        check_amount("lim", lim)?;
    }
    let mut operation = Brc20Operation::new("deploy", tick)?;
    operation.max = Some(max.to_string());
    operation.lim = lim.map(str::to_string);
    Ok(operation)
}

pub fn mint_payload(tick: &str, amt: &str) -> Result<Brc20Operation> {
    check_amount("amt", amt)?;
    let mut operation = Brc20Operation::new("mint", tick)?;
    operation.amt = Some(amt.to_string());
    Ok(operation)
}

pub fn transfer_payload(tick: &str, amt: &str) -> Result<Brc20Operation> {
    check_amount("amt", amt)?;
    let mut operation = Brc20Operation::new("transfer", tick)?;
    operation.amt = Some(amt.to_string());
    Ok(operation)
}

/// Who builds the commit and reveal.
pub enum InscribeVia<'a> {
    /// The built-in taproot engine, funded and signed by the sender.
    Native(&'a Sender),
    /// An external `ord` wallet.
    Tool(&'a OrdTool<'a>),
}

pub fn inscribe(
    wallet: &Wallet,
    via: &InscribeVia,
    operation: &Brc20Operation,
    receiver: &Address,
    fee_rate: u64,
) -> Result<InscriptionResult> {
    log::info!(
        "inscribing {} {} for {receiver}",
        operation.op,
        operation.tick
    );
    match via {
        InscribeVia::Native(sender) => {
            inscribe_native(wallet, sender, &operation.to_inscription()?, receiver, fee_rate)
        }
        InscribeVia::Tool(tool) => tool.inscribe(operation.to_json()?.as_bytes(), receiver, fee_rate),
    }
}

/// Waits for the inscription's carrier and a fee output to show up on the
/// sender's address, then moves the carrier to `destination`.
pub fn transfer_inscription(
    wallet: &Wallet,
    sender: &Sender,
    inscription: InscriptionId,
    destination: &Address,
    fee_rate: u64,
) -> Result<Txid> {
    let selector = wallet.selector();
    let (carrier, fee_utxo) = wallet.poller().wait_for_carrier(
        wallet.utxos,
        &selector,
        sender.address(),
        CarrierMatch::Txid(inscription.txid),
    )?;
    log::debug!(
        "carrier {} ({} sats), fee input {} ({} sats)",
        carrier.outpoint,
        carrier.value,
        fee_utxo.outpoint,
        fee_utxo.value
    );

    let mut builder = TxBuilder::new(sender.script_pubkey());
    builder
        .add_input(&carrier, sender.script_pubkey())
        .add_input(&fee_utxo, sender.script_pubkey())
        .add_output(carrier.value, destination.script_pubkey());
    let fee = builder.estimate_fee_for(sender.kind(), fee_rate);
    let tx = builder.finalize_with_fee(fee)?.sign(sender)?;

    let txid = wallet.broadcast(&tx)?;
    log::info!("moved {inscription} to {destination} in {txid}");
    Ok(txid)
}

#[derive(Debug, Clone, Serialize)]
pub struct Brc20Send {
    pub inscription: InscriptionResult,
    pub transfer: Txid,
}

/// Inscribes a transfer to the sender's own address, then hands the
/// inscription to `destination`.
pub fn send(
    wallet: &Wallet,
    via: &InscribeVia,
    sender: &Sender,
    tick: &str,
    amt: &str,
    destination: &Address,
    fee_rate: u64,
) -> Result<Brc20Send> {
    let operation = transfer_payload(tick, amt)?;
    let inscription = inscribe(wallet, via, &operation, sender.address(), fee_rate)?;
    let transfer = transfer_inscription(
        wallet,
        sender,
        inscription.inscription,
        destination,
        fee_rate,
    )?;
    Ok(Brc20Send {
        inscription,
        transfer,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Brc20Deposit {
    pub tick: String,
    pub amount: String,
    pub sender: String,
    pub receiver: String,
}

/// Sender and receiver of the spend of a transfer inscription.
pub fn verify_deposit(events: &dyn EventSource, inscription_id: &str) -> Result<Brc20Deposit> {
    let event = events
        .brc20_events(inscription_id)?
        .into_iter()
        .find(|event| event.event_type == TRANSFER_TRANSFER)
        .ok_or_else(|| {
            Error::Verification(format!("{inscription_id} has not been transferred"))
        })?;
    let receiver = event.spent_wallet.ok_or_else(|| {
        Error::Verification(format!("{inscription_id} transfer has no receiving wallet"))
    })?;
    Ok(Brc20Deposit {
        tick: event.tick,
        amount: event.amount,
        sender: event.source_wallet,
        receiver,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{Brc20Event, RunesEvent};
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_json_shapes() {
        assert_eq!(
            deploy_payload("ordi", "21000000", Some("1000"))
                .unwrap()
                .to_json()
                .unwrap(),
            r#"{"p":"brc-20","op":"deploy","tick":"ordi","max":"21000000","lim":"1000"}"#
        );
        assert_eq!(
            mint_payload("sats", "100").unwrap().to_json().unwrap(),
            r#"{"p":"brc-20","op":"mint","tick":"sats","amt":"100"}"#
        );
        assert_eq!(
            transfer_payload("pizza", "0.5").unwrap().to_json().unwrap(),
            r#"{"p":"brc-20","op":"transfer","tick":"pizza","amt":"0.5"}"#
        );
    }

    #[test]
    fn ticker_length_is_counted_in_bytes() {
        assert!(transfer_payload("abc", "1").is_err());
        assert!(transfer_payload("abcdef", "1").is_err());
        // three characters, six bytes
        assert!(matches!(transfer_payload("ßßß", "1"), Err(Error::Input(_))));
        // two characters, four bytes
        assert!(transfer_payload("ßß", "1").is_ok());
    }

    #[test]
    fn amounts_must_be_decimal() {
        for bad in ["", "-1", "1e5", "1.", ".5", "1.2.3", " 1"] {
            assert!(mint_payload("ordi", bad).is_err(), "{bad:?} accepted");
        }
        assert!(deploy_payload("ordi", "21000000", Some("x")).is_err());
        assert!(deploy_payload("ordi", "21000000", None).is_ok());
    }

    #[test]
    fn inscription_carries_text_content_type() {
        let inscription = transfer_payload("ordi", "5")
            .unwrap()
            .to_inscription()
            .unwrap();
        assert_eq!(
            inscription,
            Inscription::new(
                Some(b"text/plain;charset=utf-8".to_vec()),
                Some(br#"{"p":"brc-20","op":"transfer","tick":"ordi","amt":"5"}"#.to_vec())
            )
        );
    }

    struct Events(Vec<Brc20Event>);

    impl EventSource for Events {
        fn brc20_events(&self, _inscription_id: &str) -> Result<Vec<Brc20Event>> {
            Ok(self.0.clone())
        }

        fn runes_events(&self, _txid: &Txid) -> Result<Vec<RunesEvent>> {
            Ok(Vec::new())
        }
    }

    fn event(event_type: &str, spent_wallet: Option<&str>) -> Brc20Event {
        Brc20Event {
            event_type: event_type.to_string(),
            tick: "ordi".to_string(),
            amount: "5".to_string(),
            source_wallet: "alice".to_string(),
            source_pk_script: String::new(),
            spent_wallet: spent_wallet.map(str::to_string),
            spent_pk_script: None,
            using_tx_id: None,
        }
    }

    #[test]
    fn deposit_comes_from_the_transfer_transfer_event() {
        let events = Events(vec![
            event("transfer-inscribe", None),
            event("transfer-transfer", Some("bob")),
        ]);
        assert_eq!(
            verify_deposit(&events, "x").unwrap(),
            Brc20Deposit {
                tick: "ordi".to_string(),
                amount: "5".to_string(),
                sender: "alice".to_string(),
                receiver: "bob".to_string(),
            }
        );
    }

    #[test]
    fn untransferred_inscription_is_not_a_deposit() {
        let events = Events(vec![event("transfer-inscribe", None)]);
        assert!(matches!(
            verify_deposit(&events, "x"),
            Err(Error::Verification(_))
        ));
    }
}
