//! BRC-20 and Runes wallet core: UTXO selection, transaction building and
//! signing, taproot inscriptions, and the indexer and node collaborators
//! the token flows depend on. The runestone and envelope wire formats live
//! in the `ordinals` crate.

pub mod brc20;
pub mod btc;
pub mod builder;
pub mod chain;
pub mod config;
pub mod error;
pub mod indexer;
pub mod inscribe;
pub mod keys;
pub mod logging;
pub mod mock;
pub mod options;
pub mod ord_tool;
pub mod poller;
pub mod rpc;
pub mod runes;
pub mod selector;
pub mod signer;
pub mod subcommand;
pub mod taproot;
pub mod utxo;
pub mod wallet;

pub use error::{Error, Result};
pub use ordinals;
