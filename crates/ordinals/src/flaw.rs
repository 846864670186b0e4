use super::*;

/// Reason a runestone was rejected as a cenotaph.
#[derive(Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq, Error)]
#[serde(rename_all = "snake_case")]
pub enum Flaw {
    #[error("edict output greater than transaction output count")]
    EdictOutput,
    #[error("invalid rune ID in edict")]
    EdictRuneId,
    #[error("invalid script in OP_RETURN")]
    InvalidScript,
    #[error("non-pushdata opcode in OP_RETURN")]
    Opcode,
    #[error("supply overflows u128")]
    SupplyOverflow,
    #[error("trailing integers in body")]
    TrailingIntegers,
    #[error("field with missing value")]
    TruncatedField,
    #[error("unrecognized even tag")]
    UnrecognizedEvenTag,
    #[error("unrecognized flag")]
    UnrecognizedFlag,
    #[error("invalid varint: {0}")]
    Varint(#[from] varint::Error),
}
