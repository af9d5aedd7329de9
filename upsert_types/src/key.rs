use std::{fmt::Debug, sync::Arc};

/// An opaque primary key.
///
/// Equality and hashing are defined over the full byte sequence; the engine never interprets
/// the bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimaryKey(Arc<[u8]>);

impl PrimaryKey {
    /// Create a [`PrimaryKey`] from raw bytes.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the key's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrimaryKey({})", hex_encode(&self.0))
    }
}

impl From<&[u8]> for PrimaryKey {
    fn from(bytes: &[u8]) -> Self {
        Self::new(Arc::<[u8]>::from(bytes))
    }
}

impl From<Vec<u8>> for PrimaryKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for PrimaryKey {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_over_the_full_byte_sequence() {
        let a = PrimaryKey::from("abc");
        let b = PrimaryKey::from(b"abc".to_vec());
        let c = PrimaryKey::from("abd");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hashes_consistently_with_equality() {
        let mut set = HashSet::new();
        set.insert(PrimaryKey::from("k1"));
        set.insert(PrimaryKey::from("k1"));
        set.insert(PrimaryKey::from("k2"));
        assert_eq!(set.len(), 2);
    }
}
