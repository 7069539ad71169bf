//! Identifier types for registry entities.
//!
//! Every named entity lives in an arena inside its owning registry; an id is
//! the index of its slot. Ids are only meaningful relative to the registry
//! that issued them.

use std::fmt;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index.
            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw index.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

entity_id! {
    /// Identifier of a named struct type.
    StructId, "s"
}

entity_id! {
    /// Identifier of a named node type.
    NodeTypeId, "n"
}

entity_id! {
    /// Identifier of a named node template.
    TemplateId, "t"
}

entity_id! {
    /// Identifier of a named coerced type.
    CoercedId, "c"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_and_display() {
        let id = StructId::new(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "s7");
        assert_eq!(NodeTypeId::new(0).to_string(), "n0");
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Same raw index, different kinds: must not compare across kinds,
        // and each kind hashes independently.
        let s = StructId::new(1);
        let s2 = StructId::new(1);
        assert_eq!(s, s2);
    }
}
