//! Key and address handling: the only place that decides how a private key
//! maps onto a spendable script.

use crate::{Error, Result};
use bitcoin::key::{Keypair, PrivateKey, PublicKey};
use bitcoin::secp256k1::{All, Secp256k1, SecretKey, XOnlyPublicKey};
use bitcoin::{Address, Network, Script, ScriptBuf};
use std::str::FromStr;

/// How the sender's outputs are spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendKind {
    /// P2PKH, signed with a legacy `SIGHASH_ALL` ECDSA scriptSig.
    Legacy,
    /// P2TR key path, signed with a BIP-341 Schnorr signature.
    Taproot,
}

/// A private key bound to the address it controls.
#[derive(Debug, Clone)]
pub struct Sender {
    secp: Secp256k1<All>,
    private_key: PrivateKey,
    public_key: PublicKey,
    address: Address,
    kind: SpendKind,
}

impl Sender {
    /// Binds `private_key` to `address`, failing unless the key controls it.
    pub fn new(private_key: PrivateKey, address: Address) -> Result<Self> {
        let secp = Secp256k1::new();
        let (public_key, kind) = verify_private_key(&secp, &private_key, &address)?;
        Ok(Self {
            secp,
            private_key,
            public_key,
            address,
            kind,
        })
    }

    /// Compressed P2PKH sender.
    pub fn legacy(private_key: PrivateKey, network: Network) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::new(private_key.inner.public_key(&secp));
        let address = Address::p2pkh(public_key.pubkey_hash(), network);
        Self {
            secp,
            private_key,
            public_key,
            address,
            kind: SpendKind::Legacy,
        }
    }

    /// Key-path P2TR sender with no script tree.
    pub fn taproot(private_key: PrivateKey, network: Network) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::new(private_key.inner.public_key(&secp));
        let (x_only, _) = public_key.inner.x_only_public_key();
        let address = Address::p2tr(&secp, x_only, None, network);
        Self {
            secp,
            private_key,
            public_key,
            address,
            kind: SpendKind::Taproot,
        }
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    pub fn kind(&self) -> SpendKind {
        self.kind
    }

    /// Public key as it appears in scriptSigs, compressed or not.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn x_only_public_key(&self) -> XOnlyPublicKey {
        self.public_key.inner.x_only_public_key().0
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.private_key.inner
    }

    pub fn keypair(&self) -> Keypair {
        Keypair::from_secret_key(&self.secp, &self.private_key.inner)
    }
}

pub fn parse_address(s: &str, network: Network) -> Result<Address> {
    Ok(Address::from_str(s)?.require_network(network)?)
}

/// Accepts WIF or a 32-byte hex secret.
pub fn parse_private_key(s: &str, network: Network) -> Result<PrivateKey> {
    let s = s.trim();
    if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        let bytes = hex::decode(s).map_err(|e| Error::input(format!("private key: {e}")))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|e| Error::input(format!("private key: {e}")))?;
        return Ok(PrivateKey::new(secret, network));
    }
    PrivateKey::from_wif(s).map_err(|e| Error::input(format!("private key: {e}")))
}

/// Checks that `private_key` controls `address` as compressed P2PKH,
/// uncompressed P2PKH or key-path P2TR, returning the public key form that
/// matched.
pub fn verify_private_key(
    secp: &Secp256k1<All>,
    private_key: &PrivateKey,
    address: &Address,
) -> Result<(PublicKey, SpendKind)> {
    let inner = private_key.inner.public_key(secp);
    let target = address.script_pubkey();

    for public_key in [PublicKey::new(inner), PublicKey::new_uncompressed(inner)] {
        if ScriptBuf::new_p2pkh(&public_key.pubkey_hash()) == target {
            return Ok((public_key, SpendKind::Legacy));
        }
    }

    let (x_only, _) = inner.x_only_public_key();
    if ScriptBuf::new_p2tr(secp, x_only, None) == target {
        return Ok((PublicKey::new(inner), SpendKind::Taproot));
    }

    Err(Error::input(format!(
        "private key does not control address {address}"
    )))
}

pub fn address_from_script(script: &Script, network: Network) -> Option<Address> {
    Address::from_script(script, network).ok()
}
