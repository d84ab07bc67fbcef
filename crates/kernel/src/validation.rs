//! Declarative field validation.
//!
//! A [`RuleSet`] is an explicit table mapping a field name to an ordered list
//! of [`Check`]s. Every field is evaluated on each pass so that all violations
//! are reported together, while only the first failing check of a field is
//! kept.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use serde::Serialize;

/// Field-keyed validation failures.
///
/// Keys are lower-cased on insertion and the first message recorded for a
/// field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field` unless one is already present.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_lowercase())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert into a `Result`, treating an empty set as success.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// A single predicate with the message reported when it does not hold.
pub struct Check<T> {
    predicate: Predicate<T>,
    message: String,
}

impl<T> Check<T> {
    /// Build a check that passes when `predicate` returns `true`.
    pub fn new<P>(predicate: P, message: impl Into<String>) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            message: message.into(),
        }
    }

    /// Fails when the selected string is empty.
    pub fn required_str<F>(select: F) -> Self
    where
        F: Fn(&T) -> &str + Send + Sync + 'static,
    {
        Self::new(move |c| !select(c).is_empty(), "must be provided")
    }

    /// Fails when the selected string has more than `limit` characters.
    pub fn max_chars<F>(select: F, limit: usize) -> Self
    where
        F: Fn(&T) -> &str + Send + Sync + 'static,
    {
        Self::new(
            move |c| select(c).chars().count() <= limit,
            format!("above the character limit: {limit}"),
        )
    }

    /// Fails when the selected slice contains the same value twice.
    pub fn unique<F, V>(select: F, message: impl Into<String>) -> Self
    where
        F: Fn(&T) -> &[V] + Send + Sync + 'static,
        V: Eq + Hash,
    {
        Self::new(
            move |c| {
                let items = select(c);
                let mut seen = HashSet::with_capacity(items.len());
                items.iter().all(|item| seen.insert(item))
            },
            message,
        )
    }

    pub fn passes(&self, candidate: &T) -> bool {
        (self.predicate)(candidate)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Ordered table of per-field checks.
pub struct RuleSet<T> {
    rules: Vec<(&'static str, Vec<Check<T>>)>,
}

impl<T> RuleSet<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append the checks for `name`, evaluated in the given order.
    pub fn field(mut self, name: &'static str, checks: Vec<Check<T>>) -> Self {
        self.rules.push((name, checks));
        self
    }

    pub fn validate(&self, candidate: &T) -> FieldErrors {
        let mut errors = FieldErrors::new();
        self.validate_into(candidate, &mut errors);
        errors
    }

    /// Evaluate every field, adding failures to an existing error set.
    ///
    /// Fields that already carry a message keep it.
    pub fn validate_into(&self, candidate: &T, errors: &mut FieldErrors) {
        for (field, checks) in &self.rules {
            if let Some(failed) = checks.iter().find(|check| !check.passes(candidate)) {
                errors.add(field, failed.message());
            }
        }
    }
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
