use super::*;

/// Result of deciphering a transaction that carries a runestone payload.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Artifact {
    Cenotaph(Cenotaph),
    Runestone(Runestone),
}

/// A malformed runestone. Cenotaphs move nothing: every rune input to the
/// transaction is burned and no edict is ever applied.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Cenotaph {
    pub flaw: Flaw,
    pub mint: Option<RuneId>,
    pub etching: Option<Rune>,
}

impl Artifact {
    pub fn mint(&self) -> Option<RuneId> {
        match self {
            Self::Cenotaph(cenotaph) => cenotaph.mint,
            Self::Runestone(runestone) => runestone.mint,
        }
    }

    /// Edicts that carry economic effect. Always empty for a cenotaph.
    pub fn edicts(&self) -> &[Edict] {
        match self {
            Self::Cenotaph(_) => &[],
            Self::Runestone(runestone) => &runestone.edicts,
        }
    }

    pub fn flaw(&self) -> Option<Flaw> {
        match self {
            Self::Cenotaph(cenotaph) => Some(cenotaph.flaw),
            Self::Runestone(_) => None,
        }
    }

    pub fn runestone(&self) -> Option<&Runestone> {
        match self {
            Self::Cenotaph(_) => None,
            Self::Runestone(runestone) => Some(runestone),
        }
    }
}
