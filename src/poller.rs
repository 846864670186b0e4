//! Bounded polling for outputs that have just been broadcast.

use crate::config::Policy;
use crate::selector::{CarrierMatch, Selector};
use crate::utxo::{Unspent, UtxoSource};
use crate::{Error, Result};
use bitcoin::Address;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct Poller {
    attempts: u32,
    interval: Duration,
}

impl Poller {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    pub fn from_policy(policy: &Policy) -> Self {
        Self::new(policy.poll_attempts, policy.poll_interval())
    }

    /// Calls `probe` until it yields a value, at most `attempts` times with
    /// `interval` between calls. Probe errors end the loop immediately.
    pub fn poll<T>(
        &self,
        what: &str,
        mut probe: impl FnMut(u32) -> Result<Option<T>>,
    ) -> Result<T> {
        for attempt in 1..=self.attempts {
            log::debug!("waiting for {what}, attempt {attempt}/{}", self.attempts);
            if let Some(found) = probe(attempt)? {
                return Ok(found);
            }
            if attempt < self.attempts {
                thread::sleep(self.interval);
            }
        }
        Err(Error::Timeout {
            attempts: self.attempts,
            what: what.to_string(),
        })
    }

    /// Waits until `address` shows both the carrier and a fee output.
    pub fn wait_for_carrier(
        &self,
        source: &dyn UtxoSource,
        selector: &Selector,
        address: &Address,
        carrier: CarrierMatch,
    ) -> Result<(Unspent, Unspent)> {
        self.poll("carrier and fee outputs", |_| {
            let utxos = source.unspent(address)?;
            match selector.carrier_and_fee(&utxos, carrier) {
                (Some(carrier), Some(fee)) => Ok(Some((carrier, fee))),
                (carrier, fee) => {
                    log::debug!(
                        "carrier found: {}, fee output found: {}",
                        carrier.is_some(),
                        fee.is_some()
                    );
                    Ok(None)
                }
            }
        })
    }
}
