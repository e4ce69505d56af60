//! The explicit, ordered set of class names shared by training and evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;

/// Sorted, de-duplicated class names. A label is an index into this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassSet {
    names: Vec<String>,
}

impl ClassSet {
    /// Build a class set from names in any order, with duplicates allowed.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::EmptyClassSet`] when no names are given.
    pub fn new<I, S>(names: I) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Err(ClassifyError::EmptyClassSet);
        }
        Ok(Self { names })
    }

    /// Return the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`; a class set holds at least one class.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Return the class names in label order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the name of class `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Return the label of `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).ok()
    }

    /// Map a class name to its label.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UnknownClass`] when `name` is not in the set.
    pub fn encode(&self, name: &str) -> Result<usize, ClassifyError> {
        self.index_of(name).ok_or_else(|| ClassifyError::UnknownClass {
            name: name.to_string(),
        })
    }
}

impl TryFrom<Vec<String>> for ClassSet {
    type Error = ClassifyError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<ClassSet> for Vec<String> {
    fn from(classes: ClassSet) -> Self {
        classes.names
    }
}

impl fmt::Display for ClassSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_deduplicated() {
        let classes = ClassSet::new(["SNII", "SNIa", "SLSNe", "SNIa"]).unwrap();
        assert_eq!(classes.names(), &["SLSNe", "SNII", "SNIa"]);
        assert_eq!(classes.index_of("SNIa"), Some(2));
        assert_eq!(classes.name(0), Some("SLSNe"));
    }

    #[test]
    fn empty_rejected() {
        let err = ClassSet::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyClassSet));
    }

    #[test]
    fn unknown_name_rejected() {
        let classes = ClassSet::new(["a", "b"]).unwrap();
        assert!(matches!(
            classes.encode("c"),
            Err(ClassifyError::UnknownClass { ref name }) if name == "c"
        ));
    }
}
