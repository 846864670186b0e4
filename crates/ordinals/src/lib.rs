//! Wire formats shared by the token wallet: the runestone integer protocol
//! carried in `OP_RETURN OP_13` outputs, and ordinal inscription envelopes.

use bitcoin::{
    constants::MAX_SCRIPT_ELEMENT_SIZE,
    opcodes,
    script::{self, Instruction, PushBytes},
    Script, ScriptBuf, Transaction,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

pub use {
    artifact::{Artifact, Cenotaph},
    edict::Edict,
    etching::{Etching, Terms},
    flaw::Flaw,
    inscription::{Inscription, ParsedInscription},
    rune::{ParseRuneError, Rune},
    rune_id::{ParseRuneIdError, RuneId},
    runestone::Runestone,
};

pub mod artifact;
pub mod edict;
pub mod etching;
pub mod flaw;
pub mod inscription;
pub mod rune;
pub mod rune_id;
pub mod runestone;
pub mod varint;

/// Appends `data` as consecutive pushes no larger than the consensus
/// element limit.
pub(crate) fn push_chunks(mut builder: script::Builder, data: &[u8]) -> script::Builder {
    for chunk in data.chunks(MAX_SCRIPT_ELEMENT_SIZE) {
        let Ok(push) = <&PushBytes>::try_from(chunk) else {
            unreachable!("chunks never exceed the push limit");
        };
        builder = builder.push_slice(push);
    }
    builder
}
