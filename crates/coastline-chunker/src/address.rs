//! Quadrant addresses: digit paths from the root box down to a chunk
//!
//! An address is read left to right, one digit per subdivision. The empty
//! address is the root box. Addresses compare lexicographically, which is the
//! same order as their string form, so every descendant of an address sorts
//! directly after it.

use crate::{ChunkError, Result};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Digits stored inline before spilling to the heap (the default depth bound)
const INLINE_DIGITS: usize = 24;

/// One of the four quarters of a box, numbered clockwise from the top-left
///
/// "Top" is the half with the smaller y value, so in longitude/latitude the
/// top-left quarter of the world is the south-west one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Quadrant {
    TopLeft = 1,
    TopRight = 2,
    BottomRight = 3,
    BottomLeft = 4,
}

impl Quadrant {
    /// All quadrants in digit order
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomRight,
        Quadrant::BottomLeft,
    ];

    /// The address digit of this quadrant (1..=4)
    #[inline]
    pub fn digit(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(Quadrant::TopLeft),
            2 => Some(Quadrant::TopRight),
            3 => Some(Quadrant::BottomRight),
            4 => Some(Quadrant::BottomLeft),
            _ => None,
        }
    }

    #[inline]
    pub fn from_char(c: char) -> Option<Self> {
        c.to_digit(10).and_then(|d| Self::from_digit(d as u8))
    }

    #[inline]
    pub fn as_char(self) -> char {
        char::from(b'0' + self.digit())
    }

    /// True for the quarters on the greater-or-equal side of the vertical midline
    #[inline]
    pub fn is_right(self) -> bool {
        matches!(self, Quadrant::TopRight | Quadrant::BottomRight)
    }

    /// True for the quarters on the greater-or-equal side of the horizontal midline
    #[inline]
    pub fn is_bottom(self) -> bool {
        matches!(self, Quadrant::BottomRight | Quadrant::BottomLeft)
    }
}

/// A path of quadrant choices from the root box
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    digits: SmallVec<[Quadrant; INLINE_DIGITS]>,
}

impl Address {
    /// The empty address, denoting the root box
    #[inline]
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_quadrants(quadrants: &[Quadrant]) -> Self {
        Self {
            digits: SmallVec::from_slice(quadrants),
        }
    }

    /// Number of digits, i.e. the subdivision depth of the addressed box
    #[inline]
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.digits.len()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.digits.is_empty()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    #[inline]
    pub fn digits(&self) -> &[Quadrant] {
        &self.digits
    }

    #[inline]
    pub fn last(&self) -> Option<Quadrant> {
        self.digits.last().copied()
    }

    /// Append a digit in place
    #[inline]
    pub fn push(&mut self, quadrant: Quadrant) {
        self.digits.push(quadrant);
    }

    /// The address of the given child of this box
    pub fn child(&self, quadrant: Quadrant) -> Self {
        let mut digits = self.digits.clone();
        digits.push(quadrant);
        Self { digits }
    }

    /// The enclosing address, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(self.truncated(self.len() - 1))
    }

    /// The first `depth` digits of this address
    pub fn truncated(&self, depth: usize) -> Self {
        let depth = depth.min(self.len());
        Self {
            digits: SmallVec::from_slice(&self.digits[..depth]),
        }
    }

    /// Strict ancestors, nearest first, ending with the root
    pub fn ancestors(&self) -> impl Iterator<Item = Address> + '_ {
        (0..self.len()).rev().map(move |depth| self.truncated(depth))
    }

    /// True if `other` lies inside the box of this address (including itself)
    #[inline]
    pub fn is_prefix_of(&self, other: &Address) -> bool {
        other.digits.starts_with(&self.digits)
    }

    /// True if `other` lies strictly inside the box of this address
    #[inline]
    pub fn is_ancestor_of(&self, other: &Address) -> bool {
        self.len() < other.len() && self.is_prefix_of(other)
    }

    /// Key range `[start, end)` covering this address and all its descendants
    /// in a string-keyed store whose keys are `layer` followed by the address.
    ///
    /// `end` is `None` when the range is unbounded (root address, empty layer).
    pub fn key_range(&self, layer: &str) -> (String, Option<String>) {
        let start = format!("{layer}{self}");
        let end = next_key(&start);
        (start, end)
    }
}

/// Smallest key greater than every key starting with `key`
///
/// Increments the final character, so `"c13"` becomes `"c14"` and `"c4"`
/// becomes `"c5"`.
pub fn next_key(key: &str) -> Option<String> {
    let mut chars: Vec<char> = key.chars().collect();
    while let Some(last) = chars.pop() {
        if let Some(next) = char::from_u32(last as u32 + 1) {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quadrant in &self.digits {
            write!(f, "{}", quadrant.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = ChunkError;

    fn from_str(s: &str) -> Result<Self> {
        let mut address = Address::root();
        for (position, c) in s.chars().enumerate() {
            let quadrant = Quadrant::from_char(c).ok_or_else(|| ChunkError::InvalidAddress {
                input: s.to_string(),
                reason: format!("unexpected character {c:?} at position {position}"),
            })?;
            address.push(quadrant);
        }
        Ok(address)
    }
}

impl From<&[Quadrant]> for Address {
    fn from(quadrants: &[Quadrant]) -> Self {
        Self::from_quadrants(quadrants)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn test_quadrant_digits() {
        for (i, quadrant) in Quadrant::ALL.iter().enumerate() {
            assert_eq!(quadrant.digit() as usize, i + 1);
            assert_eq!(Quadrant::from_digit(quadrant.digit()), Some(*quadrant));
            assert_eq!(Quadrant::from_char(quadrant.as_char()), Some(*quadrant));
        }
        assert_eq!(Quadrant::from_digit(0), None);
        assert_eq!(Quadrant::from_digit(5), None);
        assert_eq!(Quadrant::from_char('x'), None);
    }

    #[test]
    fn test_quadrant_sides() {
        assert!(!Quadrant::TopLeft.is_right() && !Quadrant::TopLeft.is_bottom());
        assert!(Quadrant::TopRight.is_right() && !Quadrant::TopRight.is_bottom());
        assert!(Quadrant::BottomRight.is_right() && Quadrant::BottomRight.is_bottom());
        assert!(!Quadrant::BottomLeft.is_right() && Quadrant::BottomLeft.is_bottom());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(addr("").to_string(), "");
        assert!(addr("").is_root());
        assert_eq!(addr("1423").to_string(), "1423");
        assert_eq!(addr("1423").len(), 4);
        assert_eq!(
            addr("24").digits(),
            &[Quadrant::TopRight, Quadrant::BottomLeft]
        );
    }

    #[test]
    fn test_parse_rejects_bad_digits() {
        for bad in ["0", "15", "12a", " 1", "c1"] {
            let err = bad.parse::<Address>().unwrap_err();
            assert!(
                matches!(err, ChunkError::InvalidAddress { ref input, .. } if input == bad),
                "unexpected error for {bad:?}: {err}"
            );
        }
    }

    #[test]
    fn test_parent_and_child() {
        let a = addr("312");
        assert_eq!(a.parent(), Some(addr("31")));
        assert_eq!(a.child(Quadrant::BottomLeft), addr("3124"));
        assert_eq!(a.last(), Some(Quadrant::TopRight));
        assert_eq!(Address::root().parent(), None);
        assert_eq!(addr("4").parent(), Some(Address::root()));
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let ancestors: Vec<String> = addr("123").ancestors().map(|a| a.to_string()).collect();
        assert_eq!(ancestors, vec!["12", "1", ""]);
        assert_eq!(Address::root().ancestors().count(), 0);
    }

    #[test]
    fn test_prefix_relations() {
        assert!(addr("12").is_prefix_of(&addr("12")));
        assert!(!addr("12").is_ancestor_of(&addr("12")));
        assert!(addr("12").is_ancestor_of(&addr("1234")));
        assert!(Address::root().is_ancestor_of(&addr("4")));
        assert!(!addr("13").is_prefix_of(&addr("1234")));
    }

    #[test]
    fn test_ordering_matches_strings() {
        let mut addresses = vec![addr("2"), addr("14"), addr(""), addr("1"), addr("141"), addr("4")];
        let mut strings: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
        addresses.sort();
        strings.sort();
        let sorted: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
        assert_eq!(sorted, strings);
    }

    #[test]
    fn test_key_range() {
        assert_eq!(
            addr("13").key_range("c"),
            ("c13".to_string(), Some("c14".to_string()))
        );
        assert_eq!(
            addr("4").key_range("c"),
            ("c4".to_string(), Some("c5".to_string()))
        );
        assert_eq!(
            Address::root().key_range("c"),
            ("c".to_string(), Some("d".to_string()))
        );
        assert_eq!(Address::root().key_range(""), (String::new(), None));
    }

    #[test]
    fn test_key_range_selects_descendants() {
        use std::collections::BTreeMap;

        let keys: BTreeMap<String, ()> = ["c1", "c13", "c132", "c14", "c2", "l13"]
            .into_iter()
            .map(|k| (k.to_string(), ()))
            .collect();
        let (start, end) = addr("13").key_range("c");
        let end = end.unwrap();
        let selected: Vec<&str> = keys
            .range(start..end)
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(selected, vec!["c13", "c132"]);
    }
}
