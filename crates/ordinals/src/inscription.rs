//! Ordinal inscription envelopes carried in taproot script-path leaves.
//!
//! The envelope is `OP_FALSE OP_IF "ord" OP_1 <content type> OP_0 <body...> OP_ENDIF`.
//! It is built into the reveal leaf ahead of the spend and read back out of
//! the reveal transaction's witness.

use super::*;
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_ENDIF, OP_IF, OP_PUSHNUM_1};
use bitcoin::opcodes::OP_FALSE;
use bitcoin::secp256k1::XOnlyPublicKey;
use std::iter::Peekable;

pub const PROTOCOL_ID: [u8; 3] = *b"ord";

const CONTENT_TYPE_TAG: u8 = 1;
const BODY_TAG: u8 = 0;

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Inscription {
    content_type: Option<Vec<u8>>,
    body: Option<Vec<u8>>,
}

#[derive(Debug, PartialEq)]
pub enum ParsedInscription {
    None,
    /// An envelope was opened but never closed with `OP_ENDIF`.
    Partial,
    Complete(Inscription),
}

impl Inscription {
    pub fn new(content_type: Option<Vec<u8>>, body: Option<Vec<u8>>) -> Self {
        Self { content_type, body }
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn into_body(self) -> Option<Vec<u8>> {
        self.body
    }

    pub fn content_length(&self) -> Option<usize> {
        Some(self.body()?.len())
    }

    pub fn content_type(&self) -> Option<&str> {
        std::str::from_utf8(self.content_type.as_ref()?).ok()
    }

    /// Appends the envelope to `builder`, splitting the body into pushes of
    /// at most 520 bytes.
    pub fn append_to(&self, builder: script::Builder) -> script::Builder {
        let mut builder = builder
            .push_opcode(OP_FALSE)
            .push_opcode(OP_IF)
            .push_slice(PROTOCOL_ID);

        if let Some(content_type) = &self.content_type {
            builder = push_chunks(builder.push_opcode(OP_PUSHNUM_1), content_type);
        }

        if let Some(body) = &self.body {
            builder = push_chunks(builder.push_opcode(OP_FALSE), body);
        }

        builder.push_opcode(OP_ENDIF)
    }

    /// Script-path leaf `<key> OP_CHECKSIG <envelope>`: spendable only with a
    /// signature for `key`, revealing the envelope when spent.
    pub fn reveal_script(&self, key: &XOnlyPublicKey) -> ScriptBuf {
        let builder = script::Builder::new()
            .push_x_only_key(key)
            .push_opcode(OP_CHECKSIG);
        self.append_to(builder).into_script()
    }

    pub fn from_transaction(tx: &Transaction) -> ParsedInscription {
        for input in &tx.input {
            if let Some(tapscript) = input.witness.tapscript() {
                match parse_from_tapscript(tapscript) {
                    ParsedInscription::None => continue,
                    parsed => return parsed,
                }
            }
        }
        ParsedInscription::None
    }
}

fn parse_from_tapscript(tapscript: &Script) -> ParsedInscription {
    let mut instructions = tapscript.instructions().peekable();

    while let Some(instruction) = instructions.next() {
        let Ok(Instruction::PushBytes(push)) = instruction else {
            continue;
        };
        if !push.is_empty() {
            continue;
        }
        if instructions.peek() != Some(&Ok(Instruction::Op(OP_IF))) {
            continue;
        }
        instructions.next();

        match instructions.next() {
            Some(Ok(Instruction::PushBytes(id))) if id.as_bytes() == PROTOCOL_ID => {
                return parse_envelope(&mut instructions);
            }
            _ => continue,
        }
    }

    ParsedInscription::None
}

/// Reads a tag pushed either as a one-byte push or as `OP_PUSHNUM_1`.
fn tag(instruction: &Instruction) -> Option<u8> {
    match instruction {
        Instruction::PushBytes(push) if push.len() == 1 => Some(push.as_bytes()[0]),
        Instruction::PushBytes(push) if push.is_empty() => Some(BODY_TAG),
        Instruction::Op(op) if *op == OP_PUSHNUM_1 => Some(CONTENT_TYPE_TAG),
        _ => None,
    }
}

fn parse_envelope<'a>(
    instructions: &mut Peekable<bitcoin::script::Instructions<'a>>,
) -> ParsedInscription {
    let mut content_type = None;

    while let Some(instruction) = instructions.next() {
        let Ok(instruction) = instruction else {
            return ParsedInscription::Partial;
        };

        if instruction == Instruction::Op(OP_ENDIF) {
            return ParsedInscription::Complete(Inscription::new(content_type, None));
        }

        match tag(&instruction) {
            Some(BODY_TAG) => {
                let mut body = Vec::new();
                for instruction in instructions.by_ref() {
                    match instruction {
                        Ok(Instruction::Op(OP_ENDIF)) => {
                            return ParsedInscription::Complete(Inscription::new(
                                content_type,
                                Some(body),
                            ));
                        }
                        Ok(Instruction::PushBytes(data)) => body.extend_from_slice(data.as_bytes()),
                        _ => return ParsedInscription::Partial,
                    }
                }
                return ParsedInscription::Partial;
            }
            Some(CONTENT_TYPE_TAG) => match instructions.next() {
                Some(Ok(Instruction::PushBytes(value))) => {
                    content_type = Some(value.as_bytes().to_vec());
                }
                _ => return ParsedInscription::Partial,
            },
            _ => {
                // unknown field, skip its value
                instructions.next();
            }
        }
    }

    ParsedInscription::Partial
}
