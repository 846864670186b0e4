use derive_more::Display;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Identifies a rune by the block height and transaction index of its etching.
#[derive(
    Debug,
    Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Copy,
    Clone,
    Default,
    DeserializeFromStr,
    SerializeDisplay,
)]
#[display("{block}:{tx}")]
pub struct RuneId {
    pub block: u64,
    pub tx: u32,
}

#[derive(Debug, PartialEq, Error)]
pub enum ParseRuneIdError {
    #[error("rune id must have the form BLOCK:TX")]
    Separator,
    #[error("invalid block height: {0}")]
    Block(ParseIntError),
    #[error("invalid transaction index: {0}")]
    Transaction(ParseIntError),
    #[error("rune id {0}:{1} has a transaction index but no block")]
    Illegal(u64, u32),
}

impl RuneId {
    /// Sentinel used for "the rune etched in this transaction".
    pub const EMPTY: RuneId = RuneId { block: 0, tx: 0 };

    /// Returns `None` for the illegal `block == 0, tx > 0` combination.
    pub fn new(block: u64, tx: u32) -> Option<RuneId> {
        if block == 0 && tx > 0 {
            return None;
        }
        Some(RuneId { block, tx })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Applies an encoded delta. A zero block delta makes `tx` an offset
    /// from the current transaction index, otherwise `tx` is absolute.
    pub fn next(self, block: u128, tx: u128) -> Option<RuneId> {
        let block_delta = u64::try_from(block).ok()?;
        let tx = u32::try_from(tx).ok()?;
        RuneId::new(
            self.block.checked_add(block_delta)?,
            if block_delta == 0 {
                self.tx.checked_add(tx)?
            } else {
                tx
            },
        )
    }

    /// Inverse of [`RuneId::next`]; `None` when `next` sorts before `self`.
    pub fn delta(self, next: RuneId) -> Option<(u128, u128)> {
        let block = next.block.checked_sub(self.block)?;
        let tx = if block == 0 {
            next.tx.checked_sub(self.tx)?
        } else {
            next.tx
        };
        Some((block.into(), tx.into()))
    }
}

impl FromStr for RuneId {
    type Err = ParseRuneIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (block, tx) = s.split_once(':').ok_or(ParseRuneIdError::Separator)?;
        let block = block.parse().map_err(ParseRuneIdError::Block)?;
        let tx = tx.parse().map_err(ParseRuneIdError::Transaction)?;
        RuneId::new(block, tx).ok_or(ParseRuneIdError::Illegal(block, tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_and_parse() {
        let id = RuneId { block: 840000, tx: 3 };
        assert_eq!(id.to_string(), "840000:3");
        assert_eq!("840000:3".parse::<RuneId>().unwrap(), id);
    }

    #[test]
    fn parse_errors() {
        assert_eq!("840000".parse::<RuneId>(), Err(ParseRuneIdError::Separator));
        assert!(matches!(
            "x:1".parse::<RuneId>(),
            Err(ParseRuneIdError::Block(_))
        ));
        assert!(matches!(
            "1:-1".parse::<RuneId>(),
            Err(ParseRuneIdError::Transaction(_))
        ));
        assert_eq!(
            "0:5".parse::<RuneId>(),
            Err(ParseRuneIdError::Illegal(0, 5))
        );
    }

    #[test]
    fn illegal_combination_has_no_id() {
        assert_eq!(RuneId::new(0, 1), None);
        assert_eq!(RuneId::new(0, 0), Some(RuneId::EMPTY));
        assert!(RuneId::EMPTY.is_empty());
    }

    #[test]
    fn next_applies_offsets_within_a_block() {
        let id = RuneId { block: 10, tx: 4 };
        assert_eq!(id.next(0, 3), Some(RuneId { block: 10, tx: 7 }));
        assert_eq!(id.next(2, 3), Some(RuneId { block: 12, tx: 3 }));
        assert_eq!(RuneId::EMPTY.next(0, 1), None);
        assert_eq!(id.next(u128::from(u64::MAX), 0), None);
        assert_eq!(id.next(0, u128::from(u32::MAX)), None);
    }

    #[test]
    fn delta_inverts_next() {
        let a = RuneId { block: 10, tx: 4 };
        let b = RuneId { block: 10, tx: 9 };
        let c = RuneId { block: 12, tx: 1 };
        assert_eq!(a.delta(b), Some((0, 5)));
        assert_eq!(a.delta(c), Some((2, 1)));
        assert_eq!(b.delta(a), None);
        let (block, tx) = b.delta(c).unwrap();
        assert_eq!(b.next(block, tx), Some(c));
    }

    #[test]
    fn serializes_as_string() {
        let id = RuneId { block: 1, tx: 2 };
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1:2\"");
        assert_eq!(serde_json::from_str::<RuneId>("\"1:2\"").unwrap(), id);
    }
}
