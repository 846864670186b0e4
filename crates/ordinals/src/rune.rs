use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// A rune name stored as a modified base-26 integer: `A` is 0, `Z` is 25,
/// `AA` is 26.
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Default, DeserializeFromStr, SerializeDisplay,
)]
pub struct Rune(pub u128);

#[derive(Debug, PartialEq, Error)]
pub enum ParseRuneError {
    #[error("invalid character `{0}` in rune name")]
    Character(char),
    #[error("rune name is empty")]
    Empty,
    #[error("rune name out of range")]
    Range,
}

impl Display for Rune {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut n = self.0;
        if n == u128::MAX {
            return write!(f, "BCGDENLQRQWDSLRUGSNLBTMFIJAV");
        }

        n += 1;
        let mut symbol = String::new();
        while n > 0 {
            symbol.push(char::from(b'A' + ((n - 1) % 26) as u8));
            n = (n - 1) / 26;
        }

        for c in symbol.chars().rev() {
            write!(f, "{c}")?;
        }

        Ok(())
    }
}

impl FromStr for Rune {
    type Err = ParseRuneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseRuneError::Empty);
        }

        let mut x = 0u128;
        for (i, c) in s.chars().enumerate() {
            if i > 0 {
                x = x.checked_add(1).ok_or(ParseRuneError::Range)?;
            }
            x = x.checked_mul(26).ok_or(ParseRuneError::Range)?;
            match c {
                'A'..='Z' => {
                    x = x
                        .checked_add(c as u128 - 'A' as u128)
                        .ok_or(ParseRuneError::Range)?;
                }
                _ => return Err(ParseRuneError::Character(c)),
            }
        }

        Ok(Rune(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        for (n, name) in [(0, "A"), (25, "Z"), (26, "AA"), (27, "AB"), (51, "AZ"), (52, "BA")] {
            assert_eq!(Rune(n).to_string(), name);
            assert_eq!(name.parse::<Rune>().unwrap(), Rune(n));
        }
    }

    #[test]
    fn extremes() {
        assert_eq!(Rune(u128::MAX).to_string(), "BCGDENLQRQWDSLRUGSNLBTMFIJAV");
        assert_eq!(
            "BCGDENLQRQWDSLRUGSNLBTMFIJAV".parse::<Rune>().unwrap(),
            Rune(u128::MAX)
        );
        assert_eq!(
            "BCGDENLQRQWDSLRUGSNLBTMFIJAW".parse::<Rune>(),
            Err(ParseRuneError::Range)
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Rune>(), Err(ParseRuneError::Empty));
        assert_eq!("Ab".parse::<Rune>(), Err(ParseRuneError::Character('b')));
    }
}
