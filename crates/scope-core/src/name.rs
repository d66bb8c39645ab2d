//! Dot-segmented scope names
//!
//! A scope name mirrors a component hierarchy, e.g. `svc.sub.leaf`.
//! Every segment is non-empty and made of ASCII letters, digits, `_` or `-`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Name of the ancestor-less scope that terminates every lookup chain.
pub const ROOT_NAME: &str = "root";

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("segment pattern is valid"));

/// Check that `key` is a single name segment.
///
/// Keys may not contain dots, so `scope.key` always splits unambiguously at
/// the last dot.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_key(key, "key is empty"));
    }
    if !SEGMENT.is_match(key) {
        return Err(Error::invalid_key(
            key,
            "keys may only contain letters, digits, '_' or '-'",
        ));
    }
    Ok(())
}

/// A validated, immutable scope name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeName(String);

impl ScopeName {
    /// Validate and wrap a scope name.
    ///
    /// # Example
    ///
    /// ```
    /// use scope_core::ScopeName;
    ///
    /// let name = ScopeName::parse("svc.sub.leaf").unwrap();
    /// assert_eq!(name.depth(), 3);
    /// assert!(ScopeName::parse("svc..leaf").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::invalid_name(name, "name is empty"));
        }
        for segment in name.split('.') {
            if segment.is_empty() {
                return Err(Error::invalid_name(name, "empty segment"));
            }
            if !SEGMENT.is_match(segment) {
                return Err(Error::invalid_name(
                    name,
                    format!("segment '{segment}' may only contain letters, digits, '_' or '-'"),
                ));
            }
        }
        Ok(Self(name.to_string()))
    }

    pub(crate) fn root() -> Self {
        Self(ROOT_NAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }

    /// The last segment.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_NAME
    }

    /// Strict ancestor names, nearest first.
    ///
    /// `a.b.c` yields `a.b` then `a`.
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        let name = self.0.as_str();
        name.rmatch_indices('.').map(move |(i, _)| &name[..i])
    }

    /// Dot-aware prefix test: `a.b` is an ancestor of `a.b.c` but not of `a.bc`.
    ///
    /// The root scope is an ancestor of every other name.
    pub fn is_ancestor_of(&self, other: &str) -> bool {
        if self.is_root() {
            return other != ROOT_NAME;
        }
        other.len() > self.0.len()
            && other.starts_with(self.0.as_str())
            && other.as_bytes()[self.0.len()] == b'.'
    }

    /// Append a dotted suffix.
    pub fn join(&self, suffix: &str) -> Result<Self> {
        Self::parse(&format!("{}.{}", self.0, suffix))
    }
}

impl fmt::Display for ScopeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScopeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a")]
    #[case("a.b.c")]
    #[case("svc_1.sub-2.leaf")]
    #[case("UPPER.lower")]
    fn test_valid_names(#[case] input: &str) {
        assert_eq!(ScopeName::parse(input).unwrap().as_str(), input);
    }

    #[rstest]
    #[case("")]
    #[case(".a")]
    #[case("a.")]
    #[case("a..b")]
    #[case("a b")]
    #[case("a/b")]
    #[case(" a")]
    fn test_invalid_names(#[case] input: &str) {
        let err = ScopeName::parse(input).unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }), "{err}");
    }

    #[rstest]
    #[case("port")]
    #[case("sex_id")]
    #[case("cod-in")]
    fn test_valid_keys(#[case] key: &str) {
        assert!(validate_key(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("b.c")]
    #[case("two words")]
    #[case("{x}")]
    fn test_invalid_keys(#[case] key: &str) {
        let err = validate_key(key).unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }), "{err}");
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let name = ScopeName::parse("a.b.c.d").unwrap();
        let ancestors: Vec<&str> = name.ancestors().collect();
        assert_eq!(ancestors, vec!["a.b.c", "a.b", "a"]);

        let single = ScopeName::parse("a").unwrap();
        assert_eq!(single.ancestors().count(), 0);
    }

    #[test]
    fn test_is_ancestor_of_is_dot_aware() {
        let ab = ScopeName::parse("a.b").unwrap();
        assert!(ab.is_ancestor_of("a.b.c"));
        assert!(ab.is_ancestor_of("a.b.c.d"));
        assert!(!ab.is_ancestor_of("a.bc"));
        assert!(!ab.is_ancestor_of("a.b"));
        assert!(!ab.is_ancestor_of("a"));
    }

    #[test]
    fn test_root_is_ancestor_of_everything_else() {
        let root = ScopeName::root();
        assert!(root.is_ancestor_of("a"));
        assert!(root.is_ancestor_of("a.b"));
        assert!(!root.is_ancestor_of(ROOT_NAME));
    }

    #[test]
    fn test_leaf_depth_and_join() {
        let name = ScopeName::parse("a.b").unwrap();
        assert_eq!(name.leaf(), "b");
        assert_eq!(name.depth(), 2);
        assert_eq!(name.join("c").unwrap().as_str(), "a.b.c");
        assert!(name.join("").is_err());
    }
}
