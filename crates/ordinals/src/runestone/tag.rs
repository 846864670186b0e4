use super::*;

/// Reserved field keys. Even tags must be understood by a decoder; odd tags
/// may be ignored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Tag {
    Body = 0,
    Flags = 2,
    Rune = 4,
    Premine = 6,
    Cap = 8,
    Amount = 10,
    HeightStart = 12,
    HeightEnd = 14,
    OffsetStart = 16,
    OffsetEnd = 18,
    Mint = 20,
    Pointer = 22,
    #[allow(unused)]
    Cenotaph = 126,

    Divisibility = 1,
    Spacers = 3,
    Symbol = 5,
    #[allow(unused)]
    Nop = 127,
}

impl Tag {
    /// Takes the first `N` values of this tag, but only drains them from
    /// `fields` if `with` accepts them.
    pub(super) fn take<const N: usize, T>(
        self,
        fields: &mut HashMap<u128, VecDeque<u128>>,
        with: impl Fn([u128; N]) -> Option<T>,
    ) -> Option<T> {
        let key = u128::from(self);
        let field = fields.get_mut(&key)?;

        let mut values: [u128; N] = [0; N];
        for (i, v) in values.iter_mut().enumerate() {
            *v = *field.get(i)?;
        }

        let value = with(values)?;

        field.drain(0..N);

        if field.is_empty() {
            fields.remove(&key);
        }

        Some(value)
    }

    pub(super) fn encode<const N: usize>(self, values: [u128; N], payload: &mut Vec<u8>) {
        for value in values {
            varint::encode_to_vec(self.into(), payload);
            varint::encode_to_vec(value, payload);
        }
    }

    pub(super) fn encode_option<T: Into<u128>>(self, value: Option<T>, payload: &mut Vec<u8>) {
        if let Some(value) = value {
            self.encode([value.into()], payload)
        }
    }
}

impl From<Tag> for u128 {
    fn from(tag: Tag) -> Self {
        tag as u128
    }
}

impl PartialEq<u128> for Tag {
    fn eq(&self, other: &u128) -> bool {
        u128::from(*self) == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_drains_only_on_success() {
        let mut fields: HashMap<u128, VecDeque<u128>> = HashMap::new();
        fields.insert(2, VecDeque::from([3]));

        assert_eq!(Tag::Flags.take(&mut fields, |[_]| None::<u128>), None);
        assert!(!fields.is_empty());

        assert_eq!(Tag::Flags.take(&mut fields, |[flags]| Some(flags)), Some(3));
        assert!(fields.is_empty());
    }

    #[test]
    fn take_requires_enough_values() {
        let mut fields: HashMap<u128, VecDeque<u128>> = HashMap::new();
        fields.insert(20, VecDeque::from([1]));
        assert_eq!(
            Tag::Mint.take(&mut fields, |[block, tx]| Some((block, tx))),
            None
        );

        fields.get_mut(&20).unwrap().push_back(2);
        assert_eq!(
            Tag::Mint.take(&mut fields, |[block, tx]| Some((block, tx))),
            Some((1, 2))
        );
        assert!(fields.is_empty());
    }

    #[test]
    fn take_leaves_repeated_values() {
        let mut fields: HashMap<u128, VecDeque<u128>> = HashMap::new();
        fields.insert(22, VecDeque::from([1, 2]));
        assert_eq!(Tag::Pointer.take(&mut fields, |[p]| Some(p)), Some(1));
        assert_eq!(fields[&22], VecDeque::from([2]));
    }

    #[test]
    fn encode_repeats_the_tag() {
        let mut payload = Vec::new();
        Tag::Mint.encode([1, 2], &mut payload);
        assert_eq!(payload, [20, 1, 20, 2]);

        let mut payload = Vec::new();
        Tag::Pointer.encode_option(None::<u32>, &mut payload);
        assert!(payload.is_empty());
    }
}
