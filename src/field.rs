//! Field names and field sets.
//!
//! A [`FieldName`] is validated once at construction so that every name the
//! engine knows about is also a safe SQL identifier. Raw input keys are never
//! promoted to `FieldName`; they are only compared against known names.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Conventional primary-key column.
pub const ID: &str = "id";
/// Conventional creation timestamp column.
pub const CREATED_AT: &str = "created_at";
/// Conventional modification timestamp column.
pub const UPDATED_AT: &str = "updated_at";

static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();

/// Returns true if `s` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(s: &str) -> bool {
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// Name of one record attribute.
///
/// # Examples
///
/// ```
/// use crudkit::FieldName;
///
/// let email = FieldName::new("email").unwrap();
/// assert_eq!(email.as_str(), "email");
/// assert!(FieldName::new("email; drop table users").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldName(String);

impl FieldName {
    /// Creates a field name, rejecting anything that is not a plain identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if is_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(ValidationError::InvalidFieldName { name })
        }
    }

    /// The `id` system field.
    #[must_use]
    pub fn id() -> Self {
        Self(ID.to_string())
    }

    /// The `created_at` system field.
    #[must_use]
    pub fn created_at() -> Self {
        Self(CREATED_AT.to_string())
    }

    /// The `updated_at` system field.
    #[must_use]
    pub fn updated_at() -> Self {
        Self(UPDATED_AT.to_string())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human label for table headers: `created_at` becomes `Created At`.
    #[must_use]
    pub fn label(&self) -> String {
        self.0
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<String> for FieldName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for FieldName {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FieldName> for String {
    fn from(value: FieldName) -> Self {
        value.0
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A duplicate-free set of field names.
///
/// Membership ignores order, but iteration yields names in first-insertion
/// order so a set built from a schema keeps the schema's column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<FieldName>", into = "Vec<FieldName>")]
pub struct FieldSet {
    order: Vec<FieldName>,
    members: HashSet<FieldName>,
}

impl FieldSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw names, validating each one.
    ///
    /// ```
    /// use crudkit::FieldSet;
    ///
    /// let set = FieldSet::of(["email", "role", "email"]).unwrap();
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains("role"));
    /// ```
    pub fn of<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().map(FieldName::new).collect()
    }

    /// Inserts a name. Returns false if it was already present.
    pub fn insert(&mut self, name: FieldName) -> bool {
        if self.members.contains(&name) {
            return false;
        }
        self.members.insert(name.clone());
        self.order.push(name);
        true
    }

    /// Returns true if `name` is a member.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    /// Returns the stored name equal to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldName> {
        self.members.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates in first-insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldName> {
        self.order.iter()
    }

    /// Returns the members of `self` not in `other`, keeping `self`'s order.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.iter()
            .filter(|name| !other.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for FieldSet {}

impl Extend<FieldName> for FieldSet {
    fn extend<T: IntoIterator<Item = FieldName>>(&mut self, iter: T) {
        for name in iter {
            self.insert(name);
        }
    }
}

impl FromIterator<FieldName> for FieldSet {
    fn from_iter<T: IntoIterator<Item = FieldName>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl From<Vec<FieldName>> for FieldSet {
    fn from(value: Vec<FieldName>) -> Self {
        value.into_iter().collect()
    }
}

impl From<FieldSet> for Vec<FieldName> {
    fn from(value: FieldSet) -> Self {
        value.order
    }
}

impl IntoIterator for FieldSet {
    type Item = FieldName;
    type IntoIter = std::vec::IntoIter<FieldName>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldName;
    type IntoIter = std::slice::Iter<'a, FieldName>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}
