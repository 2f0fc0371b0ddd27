//! [`Regex`] wrapper usable as an ordered-map key.

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
    ops::Deref,
};

use regex::Regex;

/// [`Regex`] wrapper hashing and comparing by its source pattern, so it can
/// key the registry's insertion-ordered maps.
#[derive(Clone, Debug)]
pub struct HashableRegex(Regex);

impl From<Regex> for HashableRegex {
    fn from(re: Regex) -> Self {
        Self(re)
    }
}

impl Hash for HashableRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_str().hash(state);
    }
}

impl PartialEq for HashableRegex {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Eq for HashableRegex {}

impl PartialOrd for HashableRegex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HashableRegex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_str().cmp(other.0.as_str())
    }
}

impl Deref for HashableRegex {
    type Target = Regex;

    fn deref(&self) -> &Regex {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_pattern() {
        let a = HashableRegex::from(Regex::new("^x$").unwrap());
        let b = HashableRegex::from(Regex::new("^x$").unwrap());
        let c = HashableRegex::from(Regex::new("^y$").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }
}
