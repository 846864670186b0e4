use super::*;

/// Moves `amount` of rune `id` to output `output`.
#[derive(Default, Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq)]
pub struct Edict {
    pub id: RuneId,
    pub amount: u128,
    pub output: u32,
}

impl Edict {
    /// Builds an edict from decoded integers, rejecting outputs the
    /// transaction does not have.
    pub fn from_integers(tx: &Transaction, id: RuneId, amount: u128, output: u128) -> Option<Self> {
        let output = u32::try_from(output).ok()?;

        if usize::try_from(output).ok()? >= tx.output.len() {
            return None;
        }

        Some(Self { id, amount, output })
    }
}
