/// Core types for dispatched actions and recorded stack entries.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to apply a registered reducer.
///
/// Actions are ephemeral: the engine turns them into `RecordedEntry` values
/// once their forward function has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Registered reducer name.
    pub name: String,
    /// Arguments handed to the reducer's forward function.
    pub forward_args: Value,
    /// Coalescing tag. Entries sharing a key collapse into one stack slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_key: Option<String>,
}

impl Action {
    pub fn new(name: impl Into<String>, forward_args: Value) -> Self {
        Self {
            name: name.into(),
            forward_args,
            series_key: None,
        }
    }

    /// Tags the action with a series key.
    #[must_use]
    pub fn with_series_key(mut self, key: impl Into<String>) -> Self {
        self.series_key = Some(key.into());
        self
    }

    /// Builds the stack entry once the forward function has produced
    /// its reverse arguments.
    pub(crate) fn record(self, reverse_args: Value) -> RecordedEntry {
        RecordedEntry {
            name: self.name,
            forward_args: self.forward_args,
            reverse_args,
            series_key: self.series_key,
            children: Vec::new(),
        }
    }
}

/// An applied action together with the data needed to reverse it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEntry {
    pub name: String,
    pub forward_args: Value,
    /// Value returned by the forward function at dispatch time.
    pub reverse_args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_key: Option<String>,
    /// Secondary entries applied atomically with this one, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RecordedEntry>,
}

impl RecordedEntry {
    /// Names of this entry and all of its children.
    pub(crate) fn reducer_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.children.iter().map(|c| c.name.as_str()))
    }

    /// Whether `other` can be merged into a series started by `self`:
    /// same name and the same child names in the same order.
    pub(crate) fn is_series_compatible(&self, other: &RecordedEntry) -> bool {
        self.name == other.name
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.name == b.name)
    }

    /// Replaces this entry's reverse arguments (and its children's) with
    /// those of `origin`, the first entry of the series.
    pub(crate) fn inherit_reverse_args(&mut self, origin: &RecordedEntry) {
        self.reverse_args = origin.reverse_args.clone();
        for (child, origin_child) in self.children.iter_mut().zip(&origin.children) {
            child.reverse_args = origin_child.reverse_args.clone();
        }
    }
}

/// Display row for one stack entry, in stack order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub name: String,
    pub label: String,
    /// `true` when the entry is currently applied (index <= cursor).
    pub done: bool,
}

/// What a dispatch call did to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A new entry was appended.
    Recorded,
    /// The entry was merged with an earlier entry of the same series.
    Coalesced,
    /// The action duplicated the current entry and was dropped.
    Suppressed,
    /// No action was given.
    Skipped,
}

impl DispatchOutcome {
    /// Whether the stack changed.
    pub fn is_recorded(self) -> bool {
        matches!(self, DispatchOutcome::Recorded | DispatchOutcome::Coalesced)
    }
}
