//! Fact graph with per-file provenance

use crate::fact::{Fact, FactSet};
use std::collections::{BTreeMap, BTreeSet};

/// The accumulated fact graph
///
/// Facts are stored grouped by the source file that produced them
/// (`path -> facts`). This index is the only record of provenance, so
/// retracting a file is a single map removal. Two files producing the same
/// triple each own their own copy; retracting one leaves the other intact.
///
/// Ordered collections keep iteration (and therefore serialization)
/// deterministic: equal graphs always encode to identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    owners: BTreeMap<String, FactSet>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an existing provenance index
    ///
    /// Owners with no facts are dropped.
    pub fn from_owners(owners: BTreeMap<String, FactSet>) -> Self {
        let owners = owners
            .into_iter()
            .filter(|(_, facts)| !facts.is_empty())
            .collect();
        Self { owners }
    }

    /// Facts owned by `path`, if any
    pub fn owned(&self, path: &str) -> Option<&FactSet> {
        self.owners.get(path)
    }

    /// Remove and return every fact owned by `path`
    pub fn retract(&mut self, path: &str) -> FactSet {
        self.owners.remove(path).unwrap_or_default()
    }

    /// Set the facts owned by `path`, replacing whatever it owned before
    ///
    /// Returns the replaced facts. An empty set leaves `path` owning nothing.
    pub fn insert(&mut self, path: &str, facts: FactSet) -> FactSet {
        let previous = self.retract(path);
        if !facts.is_empty() {
            self.owners.insert(path.to_string(), facts);
        }
        previous
    }

    /// Whether `path` owns at least one fact
    pub fn has_owner(&self, path: &str) -> bool {
        self.owners.contains_key(path)
    }

    /// Owning paths, in order
    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    /// Number of owning paths
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Number of owned facts (a triple owned by two files counts twice)
    pub fn fact_count(&self) -> usize {
        self.owners.values().map(BTreeSet::len).sum()
    }

    /// Check if the graph holds no facts
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Distinct facts across all owners
    pub fn facts(&self) -> BTreeSet<&Fact> {
        self.owners.values().flatten().collect()
    }

    /// Check if any owner holds `fact`
    pub fn contains(&self, fact: &Fact) -> bool {
        self.owners.values().any(|facts| facts.contains(fact))
    }

    /// Distinct facts whose subject is `subject`
    pub fn with_subject(&self, subject: &str) -> BTreeSet<&Fact> {
        self.owners
            .values()
            .flatten()
            .filter(|f| f.subject == subject)
            .collect()
    }

    /// Iterate `(owner, fact)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fact)> {
        self.owners
            .iter()
            .flat_map(|(path, facts)| facts.iter().map(move |f| (path.as_str(), f)))
    }

    /// Borrow the full provenance index
    pub fn as_owners(&self) -> &BTreeMap<String, FactSet> {
        &self.owners
    }
}
