//! Attribute conflict resolution
//!
//! Cross-references and contributing sources always accumulate by union.
//! Scalar attributes can only hold one value, so when two sources disagree
//! the configured policy picks the winner.

use super::node::{AttributeValue, Attributes};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// How disagreeing attribute values are settled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The most recent write wins
    #[default]
    LastWriter,
    /// Sources earlier in `priority` win. Unlisted sources rank after every
    /// listed one and among themselves by name. A source overriding its own
    /// value is last-writer-wins.
    SourcePriority { priority: Vec<String> },
}

impl ConflictPolicy {
    pub fn source_priority<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::SourcePriority {
            priority: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `incoming` should replace `current`.
    pub(crate) fn prefers(&self, incoming: &AttributeSlot, current: &AttributeSlot) -> bool {
        match self {
            Self::LastWriter => incoming.written_at >= current.written_at,
            Self::SourcePriority { priority } => {
                match rank(priority, &incoming.source).cmp(&rank(priority, &current.source)) {
                    Ordering::Less => true,
                    Ordering::Greater => false,
                    Ordering::Equal => incoming.written_at >= current.written_at,
                }
            }
        }
    }
}

fn rank<'a>(priority: &[String], source: &'a str) -> (usize, &'a str) {
    match priority.iter().position(|s| s == source) {
        Some(i) => (i, ""),
        None => (priority.len(), source),
    }
}

/// One attribute value together with who wrote it and when
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttributeSlot {
    pub value: AttributeValue,
    pub source: String,
    /// Monotonic write sequence within a run
    pub written_at: u64,
}

/// Attributes of an entity or edge under construction
#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeTable {
    slots: HashMap<String, AttributeSlot>,
}

impl AttributeTable {
    pub fn upsert(&mut self, policy: &ConflictPolicy, field: &str, slot: AttributeSlot) {
        match self.slots.get_mut(field) {
            Some(current) => {
                if policy.prefers(&slot, current) {
                    *current = slot;
                }
            }
            None => {
                self.slots.insert(field.to_string(), slot);
            }
        }
    }

    /// Fold another table in, slot by slot, under the same policy
    pub fn absorb(&mut self, policy: &ConflictPolicy, other: AttributeTable) {
        for (field, slot) in other.slots {
            self.upsert(policy, &field, slot);
        }
    }

    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        self.slots.get(field).map(|s| &s.value)
    }

    pub fn to_attributes(&self) -> Attributes {
        self.slots
            .iter()
            .map(|(k, s)| (k.clone(), s.value.clone()))
            .collect()
    }
}
