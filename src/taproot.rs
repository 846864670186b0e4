use crate::{Error, Result};
use bitcoin::secp256k1::{All, Secp256k1, XOnlyPublicKey};
use bitcoin::taproot::{ControlBlock, LeafVersion, TapNodeHash, TaprootBuilder};
use bitcoin::{Address, Network, ScriptBuf};
use ordinals::Inscription;

/// Single-leaf taproot output committing to `lock_script`, derived once per
/// key and script.
#[derive(Debug, Clone, PartialEq)]
pub struct TaprootCommitMetadata {
    pub address: Address,
    pub control_block: ControlBlock,
    pub pk_script: ScriptBuf,
    pub tap_hash: TapNodeHash,
    pub lock_script: ScriptBuf,
}

impl TaprootCommitMetadata {
    pub fn new(
        secp: &Secp256k1<All>,
        internal_key: XOnlyPublicKey,
        lock_script: ScriptBuf,
        network: Network,
    ) -> Result<Self> {
        let spend_info = TaprootBuilder::new()
            .add_leaf(0, lock_script.clone())?
            .finalize(secp, internal_key)
            .map_err(|_| Error::Transaction("taproot tree is incomplete".to_string()))?;
        let control_block = spend_info
            .control_block(&(lock_script.clone(), LeafVersion::TapScript))
            .ok_or_else(|| Error::Transaction("no control block for leaf".to_string()))?;
        let tap_hash = spend_info
            .merkle_root()
            .ok_or_else(|| Error::Transaction("taproot tree has no root".to_string()))?;
        let address = Address::p2tr_tweaked(spend_info.output_key(), network);

        Ok(Self {
            pk_script: address.script_pubkey(),
            address,
            control_block,
            tap_hash,
            lock_script,
        })
    }

    /// Commitment to the reveal leaf of `inscription`, spendable by `key`.
    pub fn for_inscription(
        secp: &Secp256k1<All>,
        key: XOnlyPublicKey,
        inscription: &Inscription,
        network: Network,
    ) -> Result<Self> {
        Self::new(secp, key, inscription.reveal_script(&key), network)
    }
}
