//! Plain value transfers.

use crate::builder::{TxBuilder, UnsignedTransaction};
use crate::keys::Sender;
use crate::utxo::Unspent;
use crate::wallet::Wallet;
use crate::{Error, Result};
use bitcoin::{Address, Txid};

/// Spends `utxo` into `amount` for `destination` plus change, unsigned.
pub fn plan_send(
    sender: &Sender,
    utxo: &Unspent,
    destination: &Address,
    amount: u64,
    fee_rate: u64,
) -> Result<UnsignedTransaction> {
    let mut builder = TxBuilder::new(sender.script_pubkey());
    builder
        .add_input(utxo, sender.script_pubkey())
        .add_output(amount, destination.script_pubkey());
    let fee = builder.estimate_fee_for(sender.kind(), fee_rate);
    builder.finalize_with_fee(fee)
}

pub fn send(
    wallet: &Wallet,
    sender: &Sender,
    destination: &Address,
    amount: u64,
    fee_rate: u64,
) -> Result<Txid> {
    if amount < wallet.policy().dust_limit {
        return Err(Error::input(format!(
            "{amount} sats is below the dust limit"
        )));
    }
    let utxos = wallet.unspent(sender.address())?;
    let utxo = wallet.selector().select_for_amount(&utxos, amount)?;

    let unsigned = plan_send(sender, &utxo, destination, amount, fee_rate)?;
    log::debug!("fee {} sats, change {} sats", unsigned.fee, unsigned.change);
    let tx = unsigned.sign(sender)?;

    let txid = wallet.broadcast(&tx)?;
    log::info!("sent {amount} sats to {destination} in {txid}");
    Ok(txid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mock::MockNode;
    use crate::rpc::NodeClient;
    use bitcoin::secp256k1::SecretKey;
    use bitcoin::{Network, PrivateKey};

    fn sender(seed: u8) -> Sender {
        Sender::legacy(
            PrivateKey::new(SecretKey::from_slice(&[seed; 32]).unwrap(), Network::Regtest),
            Network::Regtest,
        )
    }

    #[test]
    fn send_pays_destination_and_returns_change() {
        let config = Config::default();
        let node = MockNode::new();
        let wallet = Wallet::new(&config, &node, &node);
        let alice = sender(1);
        let bob = sender(2);
        node.fund(alice.address(), 3_000);
        node.fund(alice.address(), 40_000);

        let txid = send(&wallet, &alice, bob.address(), 5_000, 2).unwrap();
        let tx = node.transaction(&txid).unwrap();
        assert_eq!(tx.output[0].value.to_sat(), 5_000);
        assert_eq!(node.balance(bob.address()), 5_000);
        assert!(node.balance(alice.address()) < 38_000);
        assert!(node.balance(alice.address()) > 30_000);
    }

    #[test]
    fn dust_and_unfunded_sends_are_rejected() {
        let config = Config::default();
        let node = MockNode::new();
        let wallet = Wallet::new(&config, &node, &node);
        let alice = sender(1);
        node.fund(alice.address(), 3_000);

        assert!(matches!(
            send(&wallet, &alice, sender(2).address(), 100, 1),
            Err(Error::Input(_))
        ));
        assert!(matches!(
            send(&wallet, &alice, sender(2).address(), 3_000, 1),
            Err(Error::Funds { shortfall: 1 })
        ));
        assert!(node.broadcasts().is_empty());
    }
}
