use super::*;
use flag::Flag;
use message::Message;
use tag::Tag;

mod flag;
mod message;
mod tag;

/// Runes instructions carried by a transaction with no flaw.
#[derive(Default, Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Runestone {
    pub edicts: Vec<Edict>,
    pub etching: Option<Etching>,
    pub mint: Option<RuneId>,
    pub pointer: Option<u32>,
}

impl Runestone {
    pub const MAGIC_NUMBER: opcodes::Opcode = opcodes::all::OP_PUSHNUM_13;

    /// `None` if no output is tagged `OP_RETURN OP_13`. Anything malformed
    /// after the tag is a [`Artifact::Cenotaph`], never an error.
    pub fn decipher(transaction: &Transaction) -> Option<Artifact> {
        let cenotaph = |flaw| {
            Some(Artifact::Cenotaph(Cenotaph {
                flaw,
                mint: None,
                etching: None,
            }))
        };

        let payload = match Runestone::payload(transaction)? {
            Ok(payload) => payload,
            Err(flaw) => return cenotaph(flaw),
        };
        let integers = match Runestone::integers(&payload) {
            Ok(integers) => integers,
            Err(err) => return cenotaph(Flaw::Varint(err)),
        };

        Some(Runestone::validate(
            transaction,
            Message::from_integers(transaction, &integers),
        ))
    }

    fn validate(transaction: &Transaction, message: Message) -> Artifact {
        let Message {
            mut flaw,
            edicts,
            mut fields,
        } = message;

        let mut flags = Tag::Flags
            .take(&mut fields, |[flags]| Some(flags))
            .unwrap_or_default();

        let etching = Flag::Etching.take(&mut flags).then(|| Etching {
            divisibility: Tag::Divisibility.take(&mut fields, |[divisibility]| {
                let divisibility = u8::try_from(divisibility).ok()?;
                (divisibility <= Etching::MAX_DIVISIBILITY).then_some(divisibility)
            }),
            premine: Tag::Premine.take(&mut fields, |[premine]| Some(premine)),
            rune: Tag::Rune.take(&mut fields, |[rune]| Some(Rune(rune))),
            spacers: Tag::Spacers.take(&mut fields, |[spacers]| {
                let spacers = u32::try_from(spacers).ok()?;
                (spacers <= Etching::MAX_SPACERS).then_some(spacers)
            }),
            symbol: Tag::Symbol.take(&mut fields, |[symbol]| {
                char::from_u32(u32::try_from(symbol).ok()?)
            }),
            terms: Flag::Terms.take(&mut flags).then(|| Terms {
                cap: Tag::Cap.take(&mut fields, |[cap]| Some(cap)),
                height: (
                    Tag::HeightStart.take(&mut fields, |[start]| u64::try_from(start).ok()),
                    Tag::HeightEnd.take(&mut fields, |[end]| u64::try_from(end).ok()),
                ),
                amount: Tag::Amount.take(&mut fields, |[amount]| Some(amount)),
                offset: (
                    Tag::OffsetStart.take(&mut fields, |[start]| u64::try_from(start).ok()),
                    Tag::OffsetEnd.take(&mut fields, |[end]| u64::try_from(end).ok()),
                ),
            }),
            turbo: Flag::Turbo.take(&mut flags),
        });

        let mint = Tag::Mint.take(&mut fields, |[block, tx]| {
            RuneId::new(block.try_into().ok()?, tx.try_into().ok()?)
        });

        let pointer = Tag::Pointer.take(&mut fields, |[pointer]| {
            let pointer = u32::try_from(pointer).ok()?;
            (usize::try_from(pointer).ok()? < transaction.output.len()).then_some(pointer)
        });

        if etching
            .map(|etching| etching.supply().is_none())
            .unwrap_or_default()
        {
            flaw.get_or_insert(Flaw::SupplyOverflow);
        }

        if flags != 0 {
            flaw.get_or_insert(Flaw::UnrecognizedFlag);
        }

        if fields.keys().any(|tag| tag % 2 == 0) {
            flaw.get_or_insert(Flaw::UnrecognizedEvenTag);
        }

        if let Some(flaw) = flaw {
            return Artifact::Cenotaph(Cenotaph {
                flaw,
                mint,
                etching: etching.and_then(|etching| etching.rune),
            });
        }

        Artifact::Runestone(Self {
            edicts,
            etching,
            mint,
            pointer,
        })
    }

    /// Output script for the runestone. Edicts are written sorted by id.
    pub fn encipher(&self) -> ScriptBuf {
        let mut payload = Vec::new();

        if let Some(etching) = self.etching {
            let mut flags = 0;
            Flag::Etching.set(&mut flags);

            if etching.terms.is_some() {
                Flag::Terms.set(&mut flags);
            }

            if etching.turbo {
                Flag::Turbo.set(&mut flags);
            }

            Tag::Flags.encode([flags], &mut payload);

            Tag::Rune.encode_option(etching.rune.map(|rune| rune.0), &mut payload);
            Tag::Divisibility.encode_option(etching.divisibility, &mut payload);
            Tag::Spacers.encode_option(etching.spacers, &mut payload);
            Tag::Symbol.encode_option(etching.symbol, &mut payload);
            Tag::Premine.encode_option(etching.premine, &mut payload);

            if let Some(terms) = etching.terms {
                Tag::Amount.encode_option(terms.amount, &mut payload);
                Tag::Cap.encode_option(terms.cap, &mut payload);
                Tag::HeightStart.encode_option(terms.height.0, &mut payload);
                Tag::HeightEnd.encode_option(terms.height.1, &mut payload);
                Tag::OffsetStart.encode_option(terms.offset.0, &mut payload);
                Tag::OffsetEnd.encode_option(terms.offset.1, &mut payload);
            }
        }

        if let Some(RuneId { block, tx }) = self.mint {
            Tag::Mint.encode([block.into(), tx.into()], &mut payload);
        }

        Tag::Pointer.encode_option(self.pointer, &mut payload);

        if !self.edicts.is_empty() {
            varint::encode_to_vec(Tag::Body.into(), &mut payload);

            let mut edicts = self.edicts.clone();
            edicts.sort_by_key(|edict| edict.id);

            let mut previous = RuneId::default();
            for edict in edicts {
                let Some((block, tx)) = previous.delta(edict.id) else {
                    unreachable!("edicts are sorted by id");
                };
                varint::encode_to_vec(block, &mut payload);
                varint::encode_to_vec(tx, &mut payload);
                varint::encode_to_vec(edict.amount, &mut payload);
                varint::encode_to_vec(edict.output.into(), &mut payload);
                previous = edict.id;
            }
        }

        let builder = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_opcode(Runestone::MAGIC_NUMBER);

        push_chunks(builder, &payload).into_script()
    }

    /// Data pushes of the first tagged output, joined.
    pub fn payload(transaction: &Transaction) -> Option<Result<Vec<u8>, Flaw>> {
        let instructions = transaction.output.iter().find_map(|output| {
            let mut instructions = output.script_pubkey.instructions();
            let tagged = instructions.next() == Some(Ok(Instruction::Op(opcodes::all::OP_RETURN)))
                && instructions.next() == Some(Ok(Instruction::Op(Runestone::MAGIC_NUMBER)));
            tagged.then_some(instructions)
        })?;

        let mut payload = Vec::new();
        for instruction in instructions {
            match instruction {
                Ok(Instruction::PushBytes(push)) => payload.extend_from_slice(push.as_bytes()),
                Ok(Instruction::Op(_)) => return Some(Err(Flaw::Opcode)),
                Err(_) => return Some(Err(Flaw::InvalidScript)),
            }
        }
        Some(Ok(payload))
    }

    pub fn integers(payload: &[u8]) -> Result<Vec<u128>, varint::Error> {
        let mut integers = Vec::new();
        let mut rest = payload;
        while !rest.is_empty() {
            let (integer, length) = varint::decode(rest)?;
            integers.push(integer);
            rest = &rest[length..];
        }
        Ok(integers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{absolute::LockTime, script::PushBytes, transaction::Version, Amount, TxOut};
    use pretty_assertions::assert_eq;

    fn transaction(script_pubkey: ScriptBuf, outputs: usize) -> Transaction {
        let mut output = vec![TxOut {
            script_pubkey,
            value: Amount::ZERO,
        }];
        output.extend((1..outputs).map(|_| TxOut {
            script_pubkey: ScriptBuf::new(),
            value: Amount::from_sat(546),
        }));
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: Vec::new(),
            output,
        }
    }

    fn payload(integers: &[u128]) -> Vec<u8> {
        let mut payload = Vec::new();
        for integer in integers {
            varint::encode_to_vec(*integer, &mut payload);
        }
        payload
    }

    fn decipher_with_outputs(integers: &[u128], outputs: usize) -> Artifact {
        let payload = payload(integers);
        let push: &PushBytes = payload.as_slice().try_into().unwrap();
        let script = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_opcode(Runestone::MAGIC_NUMBER)
            .push_slice(push)
            .into_script();
        Runestone::decipher(&transaction(script, outputs)).unwrap()
    }

    fn decipher(integers: &[u128]) -> Artifact {
        decipher_with_outputs(integers, 4)
    }

    fn cenotaph(flaw: Flaw) -> Artifact {
        Artifact::Cenotaph(Cenotaph {
            flaw,
            mint: None,
            etching: None,
        })
    }

    #[test]
    fn transaction_without_outputs_has_no_runestone() {
        assert_eq!(
            Runestone::decipher(&Transaction {
                version: Version::TWO,
                lock_time: LockTime::ZERO,
                input: Vec::new(),
                output: Vec::new(),
            }),
            None
        );
    }

    #[test]
    fn bare_or_foreign_op_return_has_no_runestone() {
        let bare = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .into_script();
        assert_eq!(Runestone::decipher(&transaction(bare, 1)), None);

        let foreign = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_opcode(opcodes::all::OP_PUSHNUM_12)
            .into_script();
        assert_eq!(Runestone::decipher(&transaction(foreign, 1)), None);
    }

    #[test]
    fn untagged_op_return_before_the_runestone_is_skipped() {
        let foreign = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_slice([0xff])
            .into_script();
        let tagged = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_opcode(Runestone::MAGIC_NUMBER)
            .push_slice([22, 1])
            .into_script();
        let mut tx = transaction(foreign, 2);
        tx.output[1].script_pubkey = tagged;
        assert_eq!(Runestone::payload(&tx), Some(Ok(vec![22, 1])));
        assert_eq!(
            Runestone::decipher(&tx),
            Some(Artifact::Runestone(Runestone {
                pointer: Some(1),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn malformed_leading_opcode_has_no_runestone() {
        let script = ScriptBuf::from_bytes(vec![opcodes::all::OP_PUSHBYTES_4.to_u8()]);
        assert_eq!(Runestone::decipher(&transaction(script, 1)), None);
    }

    #[test]
    fn empty_payload_is_an_empty_runestone() {
        let script = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_opcode(Runestone::MAGIC_NUMBER)
            .into_script();
        assert_eq!(
            Runestone::decipher(&transaction(script, 1)),
            Some(Artifact::Runestone(Runestone::default()))
        );
    }

    #[test]
    fn non_push_opcode_is_a_cenotaph() {
        let script = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_opcode(Runestone::MAGIC_NUMBER)
            .push_opcode(opcodes::all::OP_VERIFY)
            .into_script();
        assert_eq!(
            Runestone::decipher(&transaction(script, 1)),
            Some(cenotaph(Flaw::Opcode))
        );
    }

    #[test]
    fn truncated_push_is_an_invalid_script() {
        let script = ScriptBuf::from_bytes(vec![
            opcodes::all::OP_RETURN.to_u8(),
            Runestone::MAGIC_NUMBER.to_u8(),
            opcodes::all::OP_PUSHBYTES_4.to_u8(),
            0x01,
        ]);
        assert_eq!(
            Runestone::decipher(&transaction(script, 1)),
            Some(cenotaph(Flaw::InvalidScript))
        );
    }

    #[test]
    fn pushdata_variants_are_concatenated() {
        let script = ScriptBuf::from_bytes(vec![
            opcodes::all::OP_RETURN.to_u8(),
            Runestone::MAGIC_NUMBER.to_u8(),
            opcodes::all::OP_PUSHDATA1.to_u8(),
            1,
            20,
            opcodes::all::OP_PUSHDATA2.to_u8(),
            1,
            0,
            1,
            opcodes::all::OP_PUSHDATA4.to_u8(),
            2,
            0,
            0,
            0,
            20,
            0,
        ]);
        assert_eq!(
            Runestone::payload(&transaction(script, 1)),
            Some(Ok(vec![20, 1, 20, 0]))
        );
    }

    #[test]
    fn invalid_varint_is_a_cenotaph() {
        let script = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_opcode(Runestone::MAGIC_NUMBER)
            .push_slice([0x80])
            .into_script();
        assert_eq!(
            Runestone::decipher(&transaction(script, 1)),
            Some(cenotaph(Flaw::Varint(varint::Error::Unterminated)))
        );
    }

    #[test]
    fn edicts_are_delta_decoded() {
        assert_eq!(
            decipher(&[Tag::Body.into(), 5, 2, 100, 1, 0, 3, 200, 2, 1, 1, 300, 3]),
            Artifact::Runestone(Runestone {
                edicts: vec![
                    Edict {
                        id: RuneId { block: 5, tx: 2 },
                        amount: 100,
                        output: 1,
                    },
                    Edict {
                        id: RuneId { block: 5, tx: 5 },
                        amount: 200,
                        output: 2,
                    },
                    Edict {
                        id: RuneId { block: 6, tx: 1 },
                        amount: 300,
                        output: 3,
                    },
                ],
                ..Default::default()
            })
        );
    }

    #[test]
    fn trailing_integers_discard_every_edict() {
        let artifact = decipher(&[Tag::Body.into(), 1, 1, 100, 0, 1]);
        assert_eq!(artifact, cenotaph(Flaw::TrailingIntegers));
        assert!(artifact.edicts().is_empty());
    }

    #[test]
    fn edict_with_illegal_id_is_a_cenotaph() {
        assert_eq!(
            decipher(&[Tag::Body.into(), 0, 1, 100, 0]),
            cenotaph(Flaw::EdictRuneId)
        );
        assert_eq!(
            decipher(&[Tag::Body.into(), u128::from(u64::MAX) + 1, 0, 100, 0]),
            cenotaph(Flaw::EdictRuneId)
        );
    }

    #[test]
    fn edict_output_must_exist() {
        assert_eq!(
            decipher_with_outputs(&[Tag::Body.into(), 1, 1, 100, 2], 2),
            cenotaph(Flaw::EdictOutput)
        );
        assert!(matches!(
            decipher_with_outputs(&[Tag::Body.into(), 1, 1, 100, 1], 2),
            Artifact::Runestone(_)
        ));
    }

    #[test]
    fn tag_without_value_is_truncated() {
        assert_eq!(
            decipher(&[Tag::Pointer.into(), 1, Tag::Mint.into()]),
            cenotaph(Flaw::TruncatedField)
        );
    }

    #[test]
    fn mint_and_pointer_are_taken() {
        assert_eq!(
            decipher(&[Tag::Mint.into(), 840000, Tag::Mint.into(), 7, Tag::Pointer.into(), 2]),
            Artifact::Runestone(Runestone {
                mint: Some(RuneId {
                    block: 840000,
                    tx: 7
                }),
                pointer: Some(2),
                ..Default::default()
            })
        );
    }

    #[test]
    fn out_of_range_pointer_is_an_unrecognized_even_tag() {
        assert_eq!(
            decipher_with_outputs(&[Tag::Pointer.into(), 5], 2),
            cenotaph(Flaw::UnrecognizedEvenTag)
        );
    }

    #[test]
    fn cenotaph_keeps_the_mint() {
        assert_eq!(
            decipher(&[Tag::Mint.into(), 1, Tag::Mint.into(), 2, Tag::Cenotaph.into(), 0]),
            Artifact::Cenotaph(Cenotaph {
                flaw: Flaw::UnrecognizedEvenTag,
                mint: Some(RuneId { block: 1, tx: 2 }),
                etching: None,
            })
        );
    }

    #[test]
    fn odd_tags_are_ignored() {
        assert_eq!(
            decipher(&[Tag::Nop.into(), 5, 9, 1]),
            Artifact::Runestone(Runestone::default())
        );
    }

    #[test]
    fn unknown_flag_is_a_cenotaph() {
        assert_eq!(
            decipher(&[Tag::Flags.into(), Flag::Cenotaph.mask()]),
            cenotaph(Flaw::UnrecognizedFlag)
        );
    }

    #[test]
    fn etching_fields_are_read_under_the_etching_flag() {
        let mut flags = 0;
        Flag::Etching.set(&mut flags);
        Flag::Terms.set(&mut flags);
        assert_eq!(
            decipher(&[
                Tag::Flags.into(),
                flags,
                Tag::Rune.into(),
                26,
                Tag::Divisibility.into(),
                2,
                Tag::Symbol.into(),
                'R'.into(),
                Tag::Premine.into(),
                1000,
                Tag::Amount.into(),
                10,
                Tag::Cap.into(),
                50,
                Tag::HeightEnd.into(),
                900000,
            ]),
            Artifact::Runestone(Runestone {
                etching: Some(Etching {
                    divisibility: Some(2),
                    premine: Some(1000),
                    rune: Some(Rune(26)),
                    spacers: None,
                    symbol: Some('R'),
                    terms: Some(Terms {
                        amount: Some(10),
                        cap: Some(50),
                        height: (None, Some(900000)),
                        offset: (None, None),
                    }),
                    turbo: false,
                }),
                ..Default::default()
            })
        );
    }

    #[test]
    fn etching_fields_without_the_flag_are_unrecognized() {
        assert_eq!(
            decipher(&[Tag::Rune.into(), 26]),
            cenotaph(Flaw::UnrecognizedEvenTag)
        );
    }

    #[test]
    fn supply_overflow_is_a_cenotaph() {
        let mut flags = 0;
        Flag::Etching.set(&mut flags);
        Flag::Terms.set(&mut flags);
        assert_eq!(
            decipher(&[
                Tag::Flags.into(),
                flags,
                Tag::Rune.into(),
                1,
                Tag::Premine.into(),
                1,
                Tag::Cap.into(),
                1,
                Tag::Amount.into(),
                u128::MAX,
            ]),
            Artifact::Cenotaph(Cenotaph {
                flaw: Flaw::SupplyOverflow,
                mint: None,
                etching: Some(Rune(1)),
            })
        );
    }

    #[test]
    fn first_flaw_wins() {
        assert_eq!(
            decipher(&[Tag::Flags.into(), 1 << 10, Tag::Body.into(), 0, 1, 1, 0]),
            cenotaph(Flaw::EdictRuneId)
        );
    }

    #[test]
    fn encipher_sorts_and_delta_encodes_edicts() {
        let runestone = Runestone {
            edicts: vec![
                Edict {
                    id: RuneId { block: 7, tx: 1 },
                    amount: 5,
                    output: 0,
                },
                Edict {
                    id: RuneId { block: 3, tx: 9 },
                    amount: 6,
                    output: 1,
                },
                Edict {
                    id: RuneId { block: 3, tx: 2 },
                    amount: 7,
                    output: 2,
                },
            ],
            mint: Some(RuneId { block: 3, tx: 2 }),
            pointer: Some(1),
            etching: None,
        };

        let script = runestone.encipher();
        let tx = transaction(script, 3);
        let payload = Runestone::payload(&tx).unwrap().unwrap();
        assert_eq!(
            Runestone::integers(&payload).unwrap(),
            vec![20, 3, 20, 2, 22, 1, 0, 3, 2, 7, 2, 0, 7, 6, 1, 4, 1, 5, 0]
        );

        let mut sorted = runestone.clone();
        sorted.edicts.sort_by_key(|edict| edict.id);
        assert_eq!(Runestone::decipher(&tx), Some(Artifact::Runestone(sorted)));
    }

    #[test]
    fn large_payloads_are_chunked() {
        let runestone = Runestone {
            edicts: (0..100)
                .map(|i| Edict {
                    id: RuneId {
                        block: 1_000_000 + i,
                        tx: 1,
                    },
                    amount: u128::MAX,
                    output: 0,
                })
                .collect(),
            ..Default::default()
        };

        let script = runestone.encipher();
        let pushes = script
            .instructions()
            .filter(|instruction| matches!(instruction, Ok(Instruction::PushBytes(_))))
            .count();
        assert!(pushes > 1);

        assert_eq!(
            Runestone::decipher(&transaction(script, 1)),
            Some(Artifact::Runestone(runestone))
        );
    }

    #[test]
    fn etching_round_trips() {
        let runestone = Runestone {
            etching: Some(Etching {
                divisibility: Some(8),
                premine: Some(21_000_000),
                rune: Some("TOKENWALLET".parse().unwrap()),
                spacers: Some(0b100),
                symbol: Some('$'),
                terms: Some(Terms {
                    amount: Some(1000),
                    cap: Some(100),
                    height: (Some(840000), None),
                    offset: (None, Some(5000)),
                }),
                turbo: true,
            }),
            pointer: Some(0),
            ..Default::default()
        };
        assert_eq!(
            Runestone::decipher(&transaction(runestone.encipher(), 1)),
            Some(Artifact::Runestone(runestone))
        );
    }
}
