#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Flag {
    Etching = 0,
    Terms = 1,
    Turbo = 2,
    #[allow(unused)]
    Cenotaph = 127,
}

impl Flag {
    pub(super) fn mask(self) -> u128 {
        1 << self as u128
    }

    /// Clears this flag in `flags` and reports whether it was set.
    pub(super) fn take(self, flags: &mut u128) -> bool {
        let mask = self.mask();
        let set = *flags & mask != 0;
        *flags &= !mask;
        set
    }

    pub(super) fn set(self, flags: &mut u128) {
        *flags |= self.mask()
    }
}
