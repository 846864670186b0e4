//! Deterministic first-fit selection over an address's unspent outputs.

use crate::config::Policy;
use crate::utxo::Utxo;
use crate::{Error, Result};
use bitcoin::{OutPoint, Txid};

/// What identifies the output carrying an inscription or runes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierMatch {
    Outpoint(OutPoint),
    Txid(Txid),
    /// Any output holding exactly the dust limit.
    Dust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Carrier,
    Fee,
    Other,
}

pub struct Selector<'a> {
    policy: &'a Policy,
}

impl<'a> Selector<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy }
    }

    pub fn classify(&self, utxo: &impl Utxo, carrier: CarrierMatch) -> Class {
        let is_carrier = match carrier {
            CarrierMatch::Outpoint(outpoint) => utxo.outpoint() == outpoint,
            CarrierMatch::Txid(txid) => utxo.txid() == txid,
            CarrierMatch::Dust => utxo.value_sats() == self.policy.dust_limit,
        };
        if is_carrier {
            Class::Carrier
        } else if utxo.value_sats() > self.policy.fee_utxo_threshold {
            Class::Fee
        } else {
            Class::Other
        }
    }

    /// First carrier and first fee candidate, in listing order. An output
    /// classified as the carrier is never also used for fees.
    pub fn carrier_and_fee<U: Utxo + Clone>(
        &self,
        utxos: &[U],
        carrier: CarrierMatch,
    ) -> (Option<U>, Option<U>) {
        let mut found_carrier = None;
        let mut found_fee = None;
        for utxo in utxos {
            if found_carrier.is_some() && found_fee.is_some() {
                break;
            }
            match self.classify(utxo, carrier) {
                Class::Carrier if found_carrier.is_none() => found_carrier = Some(utxo.clone()),
                Class::Fee if found_fee.is_none() => found_fee = Some(utxo.clone()),
                _ => {}
            }
        }
        (found_carrier, found_fee)
    }

    /// First output worth strictly more than `amount`.
    pub fn select_for_amount<U: Utxo + Clone>(&self, utxos: &[U], amount: u64) -> Result<U> {
        first_fit(utxos, |value| value > amount, amount.saturating_add(1))
    }

    /// First output worth at least `min`.
    pub fn select_one<U: Utxo + Clone>(&self, utxos: &[U], min: u64) -> Result<U> {
        first_fit(utxos, |value| value >= min, min)
    }

    /// Like [`Selector::select_one`], skipping `exclude`.
    pub fn select_one_excluding<U: Utxo + Clone>(
        &self,
        utxos: &[U],
        min: u64,
        exclude: OutPoint,
    ) -> Result<U> {
        let candidates: Vec<U> = utxos
            .iter()
            .filter(|utxo| utxo.outpoint() != exclude)
            .cloned()
            .collect();
        self.select_one(&candidates, min)
    }
}

fn first_fit<U: Utxo + Clone>(utxos: &[U], fits: impl Fn(u64) -> bool, needed: u64) -> Result<U> {
    if let Some(utxo) = utxos.iter().find(|utxo| fits(utxo.value_sats())) {
        log::debug!("selected {} worth {} sats", utxo.outpoint(), utxo.value_sats());
        return Ok(utxo.clone());
    }
    let best = utxos.iter().map(Utxo::value_sats).max().unwrap_or(0);
    Err(Error::Funds {
        shortfall: needed.saturating_sub(best),
    })
}
