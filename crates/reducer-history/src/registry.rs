/// Reducer definitions and the name-keyed registry.
use std::collections::HashMap;

use anyhow::Result;
use serde_json::Value;

use crate::error::{HistoryError, HistoryResult};
use crate::operation::RecordedEntry;

type ForwardFn = Box<dyn FnMut(&Value) -> Result<Value>>;
type ReverseFn = Box<dyn FnMut(&Value) -> Result<()>>;
type LabelFn = Box<dyn Fn(&RecordedEntry) -> String>;
type DuplicateFn = Box<dyn Fn(&Value, &Value) -> bool>;

/// A reversible operation registered under an action name.
///
/// `forward` applies the action to caller-owned state and returns whatever
/// `reverse` later needs to undo it. Both run synchronously and must not
/// dispatch into the engine that invoked them.
pub struct Reducer {
    forward: ForwardFn,
    reverse: ReverseFn,
    label: Option<LabelFn>,
    suppress_duplicates: bool,
    is_duplicate: Option<DuplicateFn>,
}

impl std::fmt::Debug for Reducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reducer")
            .field("has_label", &self.label.is_some())
            .field("suppress_duplicates", &self.suppress_duplicates)
            .field("custom_duplicate_check", &self.is_duplicate.is_some())
            .finish()
    }
}

impl Reducer {
    /// Creates a reducer from its forward and reverse functions.
    pub fn new<F, R>(forward: F, reverse: R) -> Self
    where
        F: FnMut(&Value) -> Result<Value> + 'static,
        R: FnMut(&Value) -> Result<()> + 'static,
    {
        Self {
            forward: Box::new(forward),
            reverse: Box::new(reverse),
            label: None,
            suppress_duplicates: false,
            is_duplicate: None,
        }
    }

    /// Sets the display label function used by `UndoManager::summaries`.
    #[must_use]
    pub fn with_label<L>(mut self, label: L) -> Self
    where
        L: Fn(&RecordedEntry) -> String + 'static,
    {
        self.label = Some(Box::new(label));
        self
    }

    /// Drops a dispatch whose arguments equal those of the current entry.
    #[must_use]
    pub fn suppress_duplicates(mut self) -> Self {
        self.suppress_duplicates = true;
        self
    }

    /// Drops a dispatch when `check(new_args, current_args)` returns true.
    /// Implies `suppress_duplicates`.
    #[must_use]
    pub fn with_duplicate_check<D>(mut self, check: D) -> Self
    where
        D: Fn(&Value, &Value) -> bool + 'static,
    {
        self.suppress_duplicates = true;
        self.is_duplicate = Some(Box::new(check));
        self
    }

    pub(crate) fn forward(&mut self, args: &Value) -> Result<Value> {
        (self.forward)(args)
    }

    pub(crate) fn reverse(&mut self, args: &Value) -> Result<()> {
        (self.reverse)(args)
    }

    pub(crate) fn label(&self, entry: &RecordedEntry) -> String {
        match &self.label {
            Some(label) => label(entry),
            None => entry.name.clone(),
        }
    }

    /// Whether a dispatch with `new_args` duplicates an entry recorded
    /// with `current_args`. Always false unless suppression is enabled.
    pub(crate) fn is_duplicate(&self, new_args: &Value, current_args: &Value) -> bool {
        if !self.suppress_duplicates {
            return false;
        }
        match &self.is_duplicate {
            Some(check) => check(new_args, current_args),
            None => new_args == current_args,
        }
    }
}

/// Maps action names to reducers.
#[derive(Debug, Default)]
pub struct ReducerRegistry {
    reducers: HashMap<String, Reducer>,
    forbid_overwrite: bool,
}

impl ReducerRegistry {
    pub fn new(forbid_overwrite: bool) -> Self {
        Self {
            reducers: HashMap::new(),
            forbid_overwrite,
        }
    }

    /// Stores `reducer` under `name`, replacing any previous registration.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateReducer` if `name` is taken and overwrites are forbidden.
    pub fn register(&mut self, name: impl Into<String>, reducer: Reducer) -> HistoryResult<()> {
        let name = name.into();
        if self.forbid_overwrite && self.reducers.contains_key(&name) {
            return Err(HistoryError::DuplicateReducer { name });
        }
        if self.reducers.insert(name.clone(), reducer).is_some() {
            tracing::debug!("Replaced reducer for `{name}`");
        }
        Ok(())
    }

    /// Looks up the reducer for `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAction` if nothing is registered under `name`.
    pub(crate) fn lookup(&self, name: &str) -> HistoryResult<&Reducer> {
        self.reducers
            .get(name)
            .ok_or_else(|| HistoryError::unknown_action(name))
    }

    pub(crate) fn lookup_mut(&mut self, name: &str) -> HistoryResult<&mut Reducer> {
        self.reducers
            .get_mut(name)
            .ok_or_else(|| HistoryError::unknown_action(name))
    }

    /// Fails on the first name in `names` with no registered reducer.
    pub(crate) fn ensure_registered<'a>(
        &self,
        mut names: impl Iterator<Item = &'a str>,
    ) -> HistoryResult<()> {
        match names.find(|name| !self.reducers.contains_key(*name)) {
            Some(missing) => Err(HistoryError::unknown_action(missing)),
            None => Ok(()),
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.reducers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }

    /// Runs the forward function registered for `name`.
    pub(crate) fn forward(&mut self, name: &str, args: &Value) -> HistoryResult<Value> {
        self.lookup_mut(name)?
            .forward(args)
            .map_err(|e| HistoryError::reducer(name, e))
    }

    /// Runs the reverse function registered for `name`.
    pub(crate) fn reverse(&mut self, name: &str, args: &Value) -> HistoryResult<()> {
        self.lookup_mut(name)?
            .reverse(args)
            .map_err(|e| HistoryError::reducer(name, e))
    }
}
