//! Domain selectors: named boolean predicates over attribute rows.
//!
//! A [`Selector`] classifies a single example as belonging to a domain by
//! inspecting one attribute column. Selectors are looked up by name in a
//! [`SelectorRegistry`] that is populated once and read-only afterwards.
//! The in-domain and out-domain selectors of a configuration must be
//! mutually exclusive conditions (e.g. `wearing_hat` vs `not_wearing_hat`);
//! the planner verifies the resulting index sets are disjoint.

use std::collections::HashMap;

use ndarray::ArrayView1;

use crate::attributes::attribute_index;
use crate::error::PartitionError;

/// A pure predicate over a single attribute row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Example has the attribute set (value == 1).
    Has(usize),
    /// Example lacks the attribute (value == 0).
    Lacks(usize),
}

impl Selector {
    /// Evaluate the predicate against one attribute row.
    #[inline]
    pub fn matches(&self, row: ArrayView1<'_, u8>) -> bool {
        match *self {
            Selector::Has(attr) => row[attr] == 1,
            Selector::Lacks(attr) => row[attr] == 0,
        }
    }

    /// The attribute column this selector inspects.
    #[inline]
    pub fn attribute(&self) -> usize {
        match *self {
            Selector::Has(attr) | Selector::Lacks(attr) => attr,
        }
    }
}

/// Named selector registry, built once at initialization.
///
/// [`SelectorRegistry::with_defaults`] provides the standard hat-based
/// domain pair; callers may register additional pairs before handing the
/// registry to the planner.
#[derive(Debug, Clone, Default)]
pub struct SelectorRegistry {
    entries: HashMap<String, Selector>,
}

impl SelectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in selectors
    /// `wearing_hat` and `not_wearing_hat`.
    pub fn with_defaults() -> Self {
        let hat = attribute_index("Wearing_Hat").expect("Wearing_Hat is a registered attribute");
        let mut registry = Self::new();
        registry.insert("wearing_hat", Selector::Has(hat));
        registry.insert("not_wearing_hat", Selector::Lacks(hat));
        registry
    }

    /// Register a selector under a name, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, selector: Selector) {
        self.entries.insert(name.into(), selector);
    }

    /// Look up a selector by name.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::UnknownSelector`] if the name is absent.
    pub fn get(&self, name: &str) -> Result<Selector, PartitionError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| PartitionError::UnknownSelector(name.to_string()))
    }

    /// Check whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn row_with(attr: usize) -> Array1<u8> {
        let mut row = Array1::zeros(crate::attributes::N_ATTRIBUTES);
        row[attr] = 1;
        row
    }

    #[test]
    fn has_and_lacks_are_complementary() {
        let hat = attribute_index("Wearing_Hat").unwrap();
        let with_hat = row_with(hat);
        let without_hat = Array1::zeros(crate::attributes::N_ATTRIBUTES);

        assert!(Selector::Has(hat).matches(with_hat.view()));
        assert!(!Selector::Has(hat).matches(without_hat.view()));
        assert!(Selector::Lacks(hat).matches(without_hat.view()));
        assert!(!Selector::Lacks(hat).matches(with_hat.view()));
    }

    #[test]
    fn defaults_cover_the_hat_pair() {
        let registry = SelectorRegistry::with_defaults();
        assert!(registry.contains("wearing_hat"));
        assert!(registry.contains("not_wearing_hat"));

        let hat = attribute_index("Wearing_Hat").unwrap();
        assert_eq!(registry.get("wearing_hat").unwrap(), Selector::Has(hat));
        assert_eq!(registry.get("not_wearing_hat").unwrap(), Selector::Lacks(hat));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let registry = SelectorRegistry::with_defaults();
        assert_eq!(
            registry.get("wearing_monocle"),
            Err(PartitionError::UnknownSelector("wearing_monocle".into()))
        );
    }

    #[test]
    fn custom_selectors_can_be_registered() {
        let glasses = attribute_index("Eyeglasses").unwrap();
        let mut registry = SelectorRegistry::with_defaults();
        registry.insert("eyeglasses", Selector::Has(glasses));
        assert_eq!(registry.get("eyeglasses").unwrap(), Selector::Has(glasses));
    }
}
