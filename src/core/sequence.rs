//! Byte sequences sent to and received from the Minitel
//!
//! A [`Sequence`] is a flat list of bytes built from heterogeneous pieces:
//! raw bytes, text (translated through a [`CharacterSet`]), nested lists and
//! other sequences. Everything is canonicalized on insertion so two sequences
//! compare equal exactly when the bytes on the wire would be the same.
//!
//! ```
//! use minitel::{Item, Sequence};
//!
//! let mut seq = Sequence::new();
//! seq.append(Item::list(["dd", " "]));
//! seq.append(0x20u8);
//! assert!(seq.equals([100u8, 100, 32, 32]));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use super::charset::CharacterSet;

/// One piece of content that can be appended to a [`Sequence`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A raw byte, kept as-is
    Byte(u8),
    /// Text, translated character by character
    Text(String),
    /// Nested items, flattened in order
    List(Vec<Item>),
    /// Bytes of an already canonical sequence
    Sequence(Sequence),
}

impl Item {
    /// Build a list item from anything iterable
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Item::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<u8> for Item {
    fn from(byte: u8) -> Self {
        Item::Byte(byte)
    }
}

impl From<char> for Item {
    fn from(ch: char) -> Self {
        Item::Text(ch.to_string())
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Item::Text(text.to_string())
    }
}

impl From<String> for Item {
    fn from(text: String) -> Self {
        Item::Text(text)
    }
}

impl From<&String> for Item {
    fn from(text: &String) -> Self {
        Item::Text(text.clone())
    }
}

impl From<Vec<Item>> for Item {
    fn from(items: Vec<Item>) -> Self {
        Item::List(items)
    }
}

impl From<Vec<u8>> for Item {
    fn from(bytes: Vec<u8>) -> Self {
        Item::List(bytes.into_iter().map(Item::Byte).collect())
    }
}

impl From<&[u8]> for Item {
    fn from(bytes: &[u8]) -> Self {
        Item::List(bytes.iter().copied().map(Item::Byte).collect())
    }
}

impl<const N: usize> From<[u8; N]> for Item {
    fn from(bytes: [u8; N]) -> Self {
        Item::from(&bytes[..])
    }
}

impl<const N: usize> From<&[u8; N]> for Item {
    fn from(bytes: &[u8; N]) -> Self {
        Item::from(&bytes[..])
    }
}

impl From<Sequence> for Item {
    fn from(seq: Sequence) -> Self {
        Item::Sequence(seq)
    }
}

impl From<&Sequence> for Item {
    fn from(seq: &Sequence) -> Self {
        Item::Sequence(seq.clone())
    }
}

impl<T: Into<Item>> From<Option<T>> for Item {
    /// `None` contributes nothing
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Item::List(Vec::new()),
        }
    }
}

/// Canonical byte sequence
#[derive(Clone, Default)]
pub struct Sequence {
    bytes: Vec<u8>,
    charset: CharacterSet,
}

impl Sequence {
    /// Create an empty sequence using the Videotex character set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sequence translating text with `charset`
    pub fn with_charset(charset: CharacterSet) -> Self {
        Self {
            bytes: Vec::new(),
            charset,
        }
    }

    /// Create a sequence from `value` translated with `charset`
    pub fn from_item(value: impl Into<Item>, charset: CharacterSet) -> Self {
        let mut seq = Self::with_charset(charset);
        seq.append(value);
        seq
    }

    /// Canonicalize `value` and append it
    pub fn append(&mut self, value: impl Into<Item>) -> &mut Self {
        let item = value.into();
        self.canonicalize(&item);
        self
    }

    /// Append a single byte
    pub fn push(&mut self, byte: u8) -> &mut Self {
        self.bytes.push(byte);
        self
    }

    /// Append translated text
    pub fn push_str(&mut self, text: &str) -> &mut Self {
        self.charset.encode_str(text, &mut self.bytes);
        self
    }

    /// Append raw bytes
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn canonicalize(&mut self, item: &Item) {
        match item {
            Item::Byte(b) => self.bytes.push(*b),
            Item::Text(text) => self.charset.encode_str(text, &mut self.bytes),
            Item::List(items) => {
                for item in items {
                    self.canonicalize(item);
                }
            }
            Item::Sequence(seq) => self.bytes.extend_from_slice(&seq.bytes),
        }
    }

    /// Compare with anything coercible to a sequence
    ///
    /// `other` is canonicalized with this sequence's character set first, so
    /// `seq.equals("é")` and `seq == Sequence::from_item("é", seq.charset())`
    /// always agree.
    pub fn equals(&self, other: impl Into<Item>) -> bool {
        let other = Sequence::from_item(other, self.charset);
        self.bytes == other.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Most recently appended byte
    pub fn last(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    pub fn charset(&self) -> CharacterSet {
        self.charset
    }

    pub fn iter(&self) -> std::slice::Iter<'_, u8> {
        self.bytes.iter()
    }
}

macro_rules! sequence_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Sequence {
                fn from(value: $ty) -> Self {
                    Sequence::from_item(value, CharacterSet::default())
                }
            }
        )*
    };
}

sequence_from!(Item, u8, char, &str, String, Vec<Item>, Vec<u8>, &[u8]);

impl<const N: usize> From<[u8; N]> for Sequence {
    fn from(bytes: [u8; N]) -> Self {
        Sequence::from_item(bytes, CharacterSet::default())
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Sequence {}

impl Hash for Sequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a u8;
    type IntoIter = std::slice::Iter<'a, u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.bytes.iter()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence[")?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_lists_flatten() {
        let seq = Sequence::from(Item::list([
            Item::from("dd"),
            Item::from(32u8),
            Item::list([Item::from("dd"), Item::from(32u8)]),
        ]));
        assert_eq!(seq.as_bytes(), &[100, 100, 32, 100, 100, 32]);
    }

    #[test]
    fn test_empty_value() {
        let seq = Sequence::from_item(None::<u8>, CharacterSet::Videotex);
        assert!(seq.is_empty());
        assert_eq!(seq.last(), None);
    }

    #[test]
    fn test_append_is_associative() {
        let a = Item::list([Item::from("é"), Item::from(0x1bu8)]);
        let b = Item::from("3615 ");
        let c = Item::list([Item::from(Sequence::from([0x13u8, 0x5e])), Item::from("ç")]);

        // append(append(a, b), c)
        let mut left = Sequence::new();
        left.append(a.clone()).append(b.clone());
        left.append(c.clone());

        // append(a, append(b, c))
        let mut bc = Sequence::new();
        bc.append(b).append(c);
        let mut right = Sequence::new();
        right.append(a).append(bc);

        assert_eq!(left, right);
    }

    #[test]
    fn test_equals_reflexive_and_symmetric() {
        let x = Sequence::from(Item::list([Item::from(0x13u8), Item::from("^")]));
        let y = Sequence::from([0x13u8, 0x5e]);

        assert!(x.equals(&x));
        assert!(x.equals(&y));
        assert!(y.equals(&x));
    }

    #[test]
    fn test_equals_coercion_consistent() {
        let seq = Sequence::from("Minitel é");

        let raw: Vec<u8> = seq.as_bytes().to_vec();
        assert!(seq.equals(raw.clone()));
        assert_eq!(seq.equals(raw.clone()), seq == Sequence::from(raw));

        assert!(seq.equals("Minitel é"));
        assert!(!seq.equals("Minitel e"));
    }

    #[test]
    fn test_charset_applies_to_text_only() {
        let mut seq = Sequence::with_charset(CharacterSet::Ascii);
        seq.append(Item::list([Item::from("à"), Item::from(0x41u8)]));
        assert_eq!(seq.as_bytes(), &[0x0e, 0x40, 0x0f, 0x41]);

        // Comparison coerces with the same character set
        assert!(seq.equals(Item::list([Item::from('à'), Item::from('A')])));
    }

    #[test]
    fn test_builder_methods() {
        let mut seq = Sequence::new();
        seq.push(0x1b).extend_from_slice(&[0x5b, 0x32]).push_str("A");
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.last(), Some(b'A'));
        assert_eq!(format!("{:?}", seq), "Sequence[1B 5B 32 41]");
    }
}
