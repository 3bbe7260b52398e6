/// Undo/redo engine over a stack of reducer-applied entries.
///
/// The stack is a `Vec` ordered oldest first. Instead of a signed cursor the
/// manager tracks how many entries are applied: entries `[0, applied)` are
/// done, entries `[applied, len)` are undone and kept for redo. The public
/// cursor is `applied - 1`, so `-1` means everything is undone.
use crate::config::HistoryConfig;
use crate::error::HistoryResult;
use crate::operation::{Action, DispatchOutcome, EntrySummary, RecordedEntry};
use crate::registry::{Reducer, ReducerRegistry};
use crate::snapshot::Snapshot;

type UpdateFn = Box<dyn FnMut()>;

/// Manages the action stack for one piece of caller-owned state.
///
/// Every operation runs to completion before returning and takes `&mut self`,
/// so reducers cannot dispatch back into the manager that is calling them.
pub struct UndoManager {
    /// Recorded entries, oldest first.
    stack: Vec<RecordedEntry>,
    /// Number of entries at the front of `stack` that are currently applied.
    applied: usize,
    registry: ReducerRegistry,
    config: HistoryConfig,
    /// Invoked once after every state-changing operation.
    on_updated: Option<UpdateFn>,
}

impl std::fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoManager")
            .field("stack_len", &self.stack.len())
            .field("cursor", &self.cursor())
            .field("reducers", &self.registry.len())
            .field("config", &self.config)
            .field("has_listener", &self.on_updated.is_some())
            .finish()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl UndoManager {
    /// Creates an empty manager (cursor `-1`).
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            stack: Vec::new(),
            applied: 0,
            registry: ReducerRegistry::new(config.forbid_overwrite_reducers),
            config,
            on_updated: None,
        }
    }

    /// Installs the update callback.
    #[must_use]
    pub fn with_on_updated<F>(mut self, on_updated: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.on_updated = Some(Box::new(on_updated));
        self
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn registry(&self) -> &ReducerRegistry {
        &self.registry
    }

    /// Registers `reducer` for action `name`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateReducer` when overwrites are forbidden and the name is taken.
    pub fn register(&mut self, name: impl Into<String>, reducer: Reducer) -> HistoryResult<()> {
        self.registry.register(name, reducer)
    }

    /// Index of the newest applied entry, or `-1` if none is applied.
    pub fn cursor(&self) -> isize {
        self.applied as isize - 1
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.stack.len()
    }

    /// Read-only view of the stack, oldest first.
    pub fn entries(&self) -> &[RecordedEntry] {
        &self.stack
    }

    /// One summary per stack entry, in stack order.
    pub fn summaries(&self) -> Vec<EntrySummary> {
        self.stack
            .iter()
            .enumerate()
            .map(|(index, entry)| EntrySummary {
                name: entry.name.clone(),
                label: self
                    .registry
                    .lookup(&entry.name)
                    .map(|reducer| reducer.label(entry))
                    .unwrap_or_else(|_| entry.name.clone()),
                done: index < self.applied,
            })
            .collect()
    }

    /// Applies `action` and records it.
    ///
    /// # Errors
    ///
    /// See [`UndoManager::dispatch_batch`].
    pub fn dispatch(&mut self, action: Action) -> HistoryResult<DispatchOutcome> {
        self.dispatch_batch(Some(action), Vec::new())
    }

    /// Applies `action` and `children` atomically as a single stack entry.
    ///
    /// # Errors
    ///
    /// See [`UndoManager::dispatch_batch`].
    pub fn dispatch_with_children(
        &mut self,
        action: Action,
        children: Vec<Action>,
    ) -> HistoryResult<DispatchOutcome> {
        self.dispatch_batch(Some(action), children)
    }

    /// Applies an optional primary action plus its children and records them.
    ///
    /// A `None` action is a no-op. A dispatch that duplicates the current
    /// entry under its reducer's suppression policy is dropped without calling
    /// `forward`. Otherwise the redo branch is discarded, the entry is
    /// coalesced with its series if it has a series key, and the stack is
    /// capped to `max_history_length`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAction` before any forward call if a name is not
    /// registered. Returns `Reducer` if a forward function fails; forwards that
    /// already ran are reversed and the stack is left untouched.
    pub fn dispatch_batch(
        &mut self,
        action: Option<Action>,
        children: Vec<Action>,
    ) -> HistoryResult<DispatchOutcome> {
        let Some(action) = action else {
            tracing::trace!("Skipped dispatch without an action");
            return Ok(DispatchOutcome::Skipped);
        };

        self.registry.ensure_registered(
            std::iter::once(action.name.as_str()).chain(children.iter().map(|c| c.name.as_str())),
        )?;

        if self.is_duplicate_of_current(&action)? {
            tracing::trace!("Suppressed duplicate dispatch of `{}`", action.name);
            return Ok(DispatchOutcome::Suppressed);
        }

        let entry = self.apply_forward(action, children)?;

        self.stack.truncate(self.applied);
        let outcome = self.push_coalesced(entry);
        self.applied = self.stack.len();
        self.enforce_cap();

        tracing::debug!(
            "Dispatched `{}` ({outcome:?}), stack length {}",
            self.stack[self.stack.len() - 1].name,
            self.stack.len()
        );
        self.notify();
        Ok(outcome)
    }

    /// Reverses the newest applied entry.
    ///
    /// Returns `false` without notifying if nothing is applied.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAction` or `Reducer`; the cursor does not move and
    /// any parts of the entry already reversed are re-applied.
    pub fn undo(&mut self) -> HistoryResult<bool> {
        if !self.can_undo() {
            return Ok(false);
        }
        self.undo_step()?;
        tracing::debug!("Undo, cursor now {}", self.cursor());
        self.notify();
        Ok(true)
    }

    /// Replays the oldest undone entry.
    ///
    /// Returns `false` without notifying if nothing is undone.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAction` or `Reducer`; the cursor does not move and
    /// any parts of the entry already replayed are reversed.
    pub fn redo(&mut self) -> HistoryResult<bool> {
        if !self.can_redo() {
            return Ok(false);
        }
        self.redo_step()?;
        tracing::debug!("Redo, cursor now {}", self.cursor());
        self.notify();
        Ok(true)
    }

    /// Undoes or redoes until the cursor equals `target`, clamped to
    /// `[-1, len - 1]`. Notifies once for the whole move.
    ///
    /// Returns `false` if the cursor was already at the target.
    ///
    /// # Errors
    ///
    /// If a step fails the jump stops at the last reached position, which
    /// is still notified if it differs from the start, and the error is
    /// returned.
    pub fn jump(&mut self, target: isize) -> HistoryResult<bool> {
        let target_applied = target.clamp(-1, self.stack.len() as isize - 1) + 1;
        let target_applied = target_applied as usize;
        if target_applied == self.applied {
            return Ok(false);
        }

        let start = self.applied;
        let mut result = Ok(());
        while self.applied != target_applied {
            let step = if target_applied < self.applied {
                self.undo_step()
            } else {
                self.redo_step()
            };
            if let Err(e) = step {
                tracing::warn!("Jump stopped at cursor {}: {e}", self.cursor());
                result = Err(e);
                break;
            }
        }

        if self.applied != start {
            tracing::debug!("Jumped from {} to {}", start as isize - 1, self.cursor());
            self.notify();
        }
        result.map(|()| true)
    }

    /// Drops every entry and resets the cursor to `-1`.
    pub fn clear(&mut self) {
        self.stack.clear();
        self.applied = 0;
        tracing::debug!("Cleared history");
        self.notify();
    }

    /// Copies the stack and cursor into a snapshot.
    pub fn serialize(&self) -> Snapshot {
        Snapshot::new(self.stack.clone(), self.cursor())
    }

    /// Replaces the stack and cursor with `snapshot` without calling any
    /// reducer. The caller's state must already match the snapshot.
    ///
    /// The stack is restored verbatim, so a snapshot longer than
    /// `max_history_length` stays over the cap until the next dispatch.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleSnapshot` for an unknown version or an
    /// out-of-range cursor; the current history is kept.
    pub fn deserialize(&mut self, snapshot: Snapshot) -> HistoryResult<()> {
        let (stack, applied) = snapshot.into_parts()?;
        self.stack = stack;
        self.applied = applied;
        tracing::debug!(
            "Restored {} entries, cursor {}",
            self.stack.len(),
            self.cursor()
        );
        self.notify();
        Ok(())
    }

    fn notify(&mut self) {
        if let Some(on_updated) = self.on_updated.as_mut() {
            on_updated();
        }
    }

    /// Whether `action` duplicates the entry at the cursor under its
    /// reducer's policy.
    fn is_duplicate_of_current(&self, action: &Action) -> HistoryResult<bool> {
        let Some(current) = self.applied.checked_sub(1).map(|i| &self.stack[i]) else {
            return Ok(false);
        };
        if current.name != action.name {
            return Ok(false);
        }
        let reducer = self.registry.lookup(&action.name)?;
        Ok(reducer.is_duplicate(&action.forward_args, &current.forward_args))
    }

    /// Runs forward for the primary action then each child in order.
    /// On failure, reverses what already ran, newest first.
    fn apply_forward(
        &mut self,
        action: Action,
        children: Vec<Action>,
    ) -> HistoryResult<RecordedEntry> {
        let reverse_args = self.registry.forward(&action.name, &action.forward_args)?;
        let mut entry = action.record(reverse_args);

        for child in children {
            match self.registry.forward(&child.name, &child.forward_args) {
                Ok(reverse_args) => entry.children.push(child.record(reverse_args)),
                Err(e) => {
                    let applied = entry.children.iter().rev().chain(std::iter::once(&entry));
                    unapply(&mut self.registry, applied);
                    return Err(e);
                }
            }
        }
        Ok(entry)
    }

    /// Appends `entry` to the (already truncated) stack, merging it with
    /// the first entry of its series when compatible.
    fn push_coalesced(&mut self, mut entry: RecordedEntry) -> DispatchOutcome {
        let Some(key) = entry.series_key.clone() else {
            self.stack.push(entry);
            return DispatchOutcome::Recorded;
        };

        let origin = self
            .stack
            .iter()
            .find(|e| e.series_key.as_deref() == Some(key.as_str()));
        match origin {
            Some(origin) if origin.is_series_compatible(&entry) => {
                entry.inherit_reverse_args(origin);
                self.stack
                    .retain(|e| e.series_key.as_deref() != Some(key.as_str()));
                self.stack.push(entry);
                DispatchOutcome::Coalesced
            }
            _ => {
                self.stack.push(entry);
                DispatchOutcome::Recorded
            }
        }
    }

    /// Evicts the oldest entries while the stack exceeds its cap.
    /// Only called right after a dispatch, when every entry is applied.
    fn enforce_cap(&mut self) {
        if !self.config.exceeds_cap(self.stack.len()) {
            return;
        }
        let excess = self.stack.len() - self.config.max_history_length;
        self.stack.drain(..excess);
        self.applied -= excess;
        tracing::debug!("Evicted {excess} oldest entries");
    }

    /// Reverses children newest first, then the primary. If a reverse
    /// fails, the parts already reversed are re-applied.
    fn undo_step(&mut self) -> HistoryResult<()> {
        let entry = &self.stack[self.applied - 1];
        self.registry.ensure_registered(entry.reducer_names())?;

        let parts: Vec<&RecordedEntry> = entry
            .children
            .iter()
            .rev()
            .chain(std::iter::once(entry))
            .collect();
        for (done, part) in parts.iter().enumerate() {
            if let Err(e) = self.registry.reverse(&part.name, &part.reverse_args) {
                reapply(&mut self.registry, parts[..done].iter().rev().copied());
                return Err(e);
            }
        }
        self.applied -= 1;
        Ok(())
    }

    /// Replays the primary, then children in order. If a forward fails,
    /// the parts already replayed are reversed.
    fn redo_step(&mut self) -> HistoryResult<()> {
        let entry = &self.stack[self.applied];
        self.registry.ensure_registered(entry.reducer_names())?;

        let parts: Vec<&RecordedEntry> =
            std::iter::once(entry).chain(entry.children.iter()).collect();
        for (done, part) in parts.iter().enumerate() {
            // The recorded reverse arguments stay authoritative, so the
            // value returned by a replay is dropped.
            if let Err(e) = self.registry.forward(&part.name, &part.forward_args) {
                unapply(&mut self.registry, parts[..done].iter().rev().copied());
                return Err(e);
            }
        }
        self.applied += 1;
        Ok(())
    }
}

/// Best-effort reversal of parts that already ran, in the given order.
fn unapply<'a>(registry: &mut ReducerRegistry, parts: impl Iterator<Item = &'a RecordedEntry>) {
    for part in parts {
        if let Err(e) = registry.reverse(&part.name, &part.reverse_args) {
            tracing::warn!("Rollback of `{}` failed: {e}", part.name);
        }
    }
}

/// Best-effort re-application of parts that were already reversed.
fn reapply<'a>(registry: &mut ReducerRegistry, parts: impl Iterator<Item = &'a RecordedEntry>) {
    for part in parts {
        if let Err(e) = registry.forward(&part.name, &part.forward_args) {
            tracing::warn!("Re-applying `{}` failed: {e}", part.name);
        }
    }
}
