//! Semantic type tags.
//!
//! Every rule declares the kind of subject it works on as a bit set. Base tags
//! are single bits; composite tags are unions of base tags. The tags are only
//! used to find a type-checking rule that can guard a pattern rule, never to
//! check a subject directly.
use std::fmt;
use std::ops::BitOr;

use crate::error::IntegrityError;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag(u32);

impl TypeTag {
    // ---- base ----
    pub const BOOLEAN: Self = Self(1 << 0);
    pub const INTEGER: Self = Self(1 << 1);
    pub const FLOAT: Self = Self(1 << 2);
    pub const STRING: Self = Self(1 << 3);
    pub const NULL: Self = Self(1 << 4);
    pub const LIST: Self = Self(1 << 5);
    pub const MAP: Self = Self(1 << 6);
    /// Marks "numbers written as strings are welcome too".
    pub const STRINGABLE: Self = Self(1 << 7);

    // ---- composite ----
    pub const NUMBER: Self = Self::INTEGER.union(Self::FLOAT);
    pub const NUMERIC: Self = Self::STRINGABLE.union(Self::INTEGER).union(Self::FLOAT);
    pub const DIGITAL: Self = Self::STRINGABLE.union(Self::INTEGER);
    pub const DECIMAL: Self = Self::STRINGABLE.union(Self::FLOAT);
    pub const STRINGABLE_SCALAR: Self = Self::STRINGABLE
        .union(Self::STRING)
        .union(Self::INTEGER)
        .union(Self::FLOAT);
    pub const SCALAR: Self = Self::BOOLEAN
        .union(Self::INTEGER)
        .union(Self::FLOAT)
        .union(Self::STRING);
    pub const SCALAR_NULLABLE: Self = Self::SCALAR.union(Self::NULL);
    pub const CONTAINER: Self = Self::LIST.union(Self::MAP);
    pub const ANY: Self = Self::SCALAR_NULLABLE
        .union(Self::CONTAINER)
        .union(Self::STRINGABLE);

    /// Every named tag. Names are unique and so must the values be.
    pub const NAMED: &'static [(&'static str, TypeTag)] = &[
        ("BOOLEAN", Self::BOOLEAN),
        ("INTEGER", Self::INTEGER),
        ("FLOAT", Self::FLOAT),
        ("STRING", Self::STRING),
        ("NULL", Self::NULL),
        ("LIST", Self::LIST),
        ("MAP", Self::MAP),
        ("STRINGABLE", Self::STRINGABLE),
        ("NUMBER", Self::NUMBER),
        ("NUMERIC", Self::NUMERIC),
        ("DIGITAL", Self::DIGITAL),
        ("DECIMAL", Self::DECIMAL),
        ("STRINGABLE_SCALAR", Self::STRINGABLE_SCALAR),
        ("SCALAR", Self::SCALAR),
        ("SCALAR_NULLABLE", Self::SCALAR_NULLABLE),
        ("CONTAINER", Self::CONTAINER),
        ("ANY", Self::ANY),
    ];

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
    pub const fn bits(self) -> u32 {
        self.0
    }
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED.iter().find(|(_, t)| *t == self).map(|(n, _)| *n)
    }

    /// Fails if two named tags share a value.
    pub fn integrity() -> Result<(), IntegrityError> {
        for (i, (a_name, a)) in Self::NAMED.iter().enumerate() {
            for (b_name, b) in &Self::NAMED[i + 1..] {
                if a == b {
                    return Err(IntegrityError::DuplicateTag {
                        first: *a_name,
                        second: *b_name,
                        bits: a.bits(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl BitOr for TypeTag {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "TypeTag::{name}"),
            None => write!(f, "TypeTag({:#b})", self.0),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#b}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_tags_are_pairwise_distinct() {
        TypeTag::integrity().unwrap();
    }

    #[test]
    fn composites_contain_their_parts() {
        assert!(TypeTag::NUMERIC.contains(TypeTag::NUMBER));
        assert!(TypeTag::STRINGABLE_SCALAR.contains(TypeTag::STRING));
        assert!(!TypeTag::NUMBER.contains(TypeTag::STRING));
        assert!(TypeTag::ANY.contains(TypeTag::CONTAINER));
        assert_eq!(TypeTag::LIST | TypeTag::MAP, TypeTag::CONTAINER);
    }

    #[test]
    fn display_uses_names_when_known() {
        assert_eq!(TypeTag::NUMERIC.to_string(), "NUMERIC");
        assert_eq!((TypeTag::NULL | TypeTag::MAP).to_string(), "0b1010000");
    }
}
