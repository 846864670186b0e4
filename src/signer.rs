//! Legacy ECDSA and taproot Schnorr signing.

use crate::builder::UnsignedTransaction;
use crate::keys::{Sender, SpendKind};
use crate::{Error, Result};
use bitcoin::hashes::Hash;
use bitcoin::key::TapTweak;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::Message;
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot::{ControlBlock, LeafVersion, TapLeafHash};
use bitcoin::{ecdsa, taproot, Script, Transaction, TxOut, Witness};

impl UnsignedTransaction {
    /// Signs every input as spending from `sender`'s own outputs.
    pub fn sign(self, sender: &Sender) -> Result<Transaction> {
        let mut tx = self.tx;
        match sender.kind() {
            SpendKind::Legacy => {
                for index in 0..tx.input.len() {
                    let script_pubkey = self.prevouts[index].script_pubkey.clone();
                    sign_legacy(&mut tx, index, &script_pubkey, sender)?;
                }
            }
            SpendKind::Taproot => {
                for index in 0..tx.input.len() {
                    sign_key_spend(&mut tx, index, &self.prevouts, sender)?;
                }
            }
        }
        Ok(tx)
    }
}

/// `SIGHASH_ALL` legacy signature; scriptSig is `<sig||0x01> <pubkey>`.
pub fn sign_legacy(
    tx: &mut Transaction,
    index: usize,
    script_pubkey: &Script,
    sender: &Sender,
) -> Result<()> {
    let sighash = SighashCache::new(&*tx)
        .legacy_signature_hash(index, script_pubkey, EcdsaSighashType::All.to_u32())
        .map_err(Error::transaction)?;
    let message = Message::from_digest(sighash.to_byte_array());
    let signature = ecdsa::Signature {
        signature: sender.secp().sign_ecdsa(&message, sender.secret_key()),
        sighash_type: EcdsaSighashType::All,
    };
    let push = PushBytesBuf::try_from(signature.to_vec()).map_err(Error::transaction)?;

    tx.input[index].script_sig = Builder::new()
        .push_slice(push)
        .push_key(sender.public_key())
        .into_script();
    Ok(())
}

/// Key-path spend with the tweaked key and the default sighash.
pub fn sign_key_spend(
    tx: &mut Transaction,
    index: usize,
    prevouts: &[TxOut],
    sender: &Sender,
) -> Result<()> {
    let sighash = SighashCache::new(&*tx)
        .taproot_key_spend_signature_hash(index, &Prevouts::All(prevouts), TapSighashType::Default)
        .map_err(Error::transaction)?;
    let message = Message::from_digest(sighash.to_byte_array());
    let tweaked = sender.keypair().tap_tweak(sender.secp(), None);
    let signature = taproot::Signature {
        signature: sender
            .secp()
            .sign_schnorr_no_aux_rand(&message, &tweaked.to_inner()),
        sighash_type: TapSighashType::Default,
    };
    tx.input[index].witness = Witness::p2tr_key_spend(&signature);
    Ok(())
}

/// Script-path spend of `leaf`; witness is `[sig, leaf, control block]`.
pub fn sign_script_spend(
    tx: &mut Transaction,
    index: usize,
    prevouts: &[TxOut],
    leaf: &Script,
    control_block: &ControlBlock,
    sender: &Sender,
) -> Result<()> {
    let leaf_hash = TapLeafHash::from_script(leaf, LeafVersion::TapScript);
    let sighash = SighashCache::new(&*tx)
        .taproot_script_spend_signature_hash(
            index,
            &Prevouts::All(prevouts),
            leaf_hash,
            TapSighashType::Default,
        )
        .map_err(Error::transaction)?;
    let message = Message::from_digest(sighash.to_byte_array());
    let signature = taproot::Signature {
        signature: sender
            .secp()
            .sign_schnorr_no_aux_rand(&message, &sender.keypair()),
        sighash_type: TapSighashType::Default,
    };

    let mut witness = Witness::new();
    witness.push(signature.to_vec());
    witness.push(leaf.as_bytes());
    witness.push(control_block.serialize());
    tx.input[index].witness = witness;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TxBuilder;
    use crate::utxo::Unspent;
    use bitcoin::key::PrivateKey;
    use bitcoin::script::Instruction;
    use bitcoin::secp256k1::{schnorr, SecretKey};
    use bitcoin::{Network, OutPoint, Txid};

    fn sender(kind: SpendKind) -> Sender {
        let key = PrivateKey::new(SecretKey::from_slice(&[0x33; 32]).unwrap(), Network::Regtest);
        match kind {
            SpendKind::Legacy => Sender::legacy(key, Network::Regtest),
            SpendKind::Taproot => Sender::taproot(key, Network::Regtest),
        }
    }

    fn unsigned(sender: &Sender) -> UnsignedTransaction {
        let mut builder = TxBuilder::new(sender.script_pubkey());
        builder
            .add_input(
                &Unspent::new(OutPoint::new(Txid::from_byte_array([4; 32]), 1), 20_000),
                sender.script_pubkey(),
            )
            .add_output(546, sender.script_pubkey());
        builder.finalize(1).unwrap()
    }

    #[test]
    fn legacy_script_sig_verifies() {
        let sender = sender(SpendKind::Legacy);
        let unsigned = unsigned(&sender);
        let script_pubkey = unsigned.prevouts[0].script_pubkey.clone();
        let tx = unsigned.sign(&sender).unwrap();

        let pushes: Vec<Vec<u8>> = tx.input[0]
            .script_sig
            .instructions()
            .map(|i| match i.unwrap() {
                Instruction::PushBytes(p) => p.as_bytes().to_vec(),
                Instruction::Op(op) => panic!("unexpected opcode {op}"),
            })
            .collect();
        assert_eq!(pushes.len(), 2);
        assert_eq!(*pushes[0].last().unwrap(), 0x01);
        assert_eq!(pushes[1], sender.public_key().to_bytes());

        let signature = ecdsa::Signature::from_slice(&pushes[0]).unwrap();
        let sighash = SighashCache::new(&tx)
            .legacy_signature_hash(0, &script_pubkey, EcdsaSighashType::All.to_u32())
            .unwrap();
        let message = Message::from_digest(sighash.to_byte_array());
        sender
            .secp()
            .verify_ecdsa(&message, &signature.signature, &sender.public_key().inner)
            .unwrap();
    }

    #[test]
    fn key_spend_witness_verifies_against_output_key() {
        let sender = sender(SpendKind::Taproot);
        let unsigned = unsigned(&sender);
        let prevouts = unsigned.prevouts.clone();
        let tx = unsigned.sign(&sender).unwrap();

        let witness = &tx.input[0].witness;
        assert_eq!(witness.len(), 1);
        let signature = schnorr::Signature::from_slice(&witness[0]).unwrap();

        let sighash = SighashCache::new(&tx)
            .taproot_key_spend_signature_hash(0, &Prevouts::All(&prevouts), TapSighashType::Default)
            .unwrap();
        let message = Message::from_digest(sighash.to_byte_array());
        let (output_key, _) = sender
            .x_only_public_key()
            .tap_tweak(sender.secp(), None);
        sender
            .secp()
            .verify_schnorr(&signature, &message, &output_key.to_inner())
            .unwrap();
    }
}
