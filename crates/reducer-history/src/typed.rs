/// Compile-time typed layer over the opaque `serde_json::Value` arguments.
///
/// The engine stores every argument as a JSON value. `ActionKind` pins an
/// action name to its forward-argument type so call sites cannot build an
/// action with the wrong payload, and `Reducer::typed` decodes and encodes
/// arguments around plain Rust closures.
use std::marker::PhantomData;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HistoryResult;
use crate::operation::Action;
use crate::registry::Reducer;

/// An action name bound to its forward-argument type `A`.
pub struct ActionKind<A> {
    name: &'static str,
    _args: PhantomData<fn(A)>,
}

impl<A> Clone for ActionKind<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for ActionKind<A> {}

impl<A> std::fmt::Debug for ActionKind<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ActionKind").field(&self.name).finish()
    }
}

impl<A: Serialize> ActionKind<A> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _args: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds an action carrying `args`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if `args` cannot be encoded as JSON.
    pub fn action(&self, args: &A) -> HistoryResult<Action> {
        Ok(Action::new(self.name, serde_json::to_value(args)?))
    }

    /// Builds an action tagged with a series key.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if `args` cannot be encoded as JSON.
    pub fn series(&self, args: &A, key: impl Into<String>) -> HistoryResult<Action> {
        Ok(self.action(args)?.with_series_key(key))
    }
}

impl Reducer {
    /// Creates a reducer whose functions take decoded arguments.
    ///
    /// `forward` receives the action's arguments as `A` and returns the
    /// reverse data `R`; `reverse` receives that `R` back. Decoding failures
    /// surface as reducer errors.
    pub fn typed<A, R, F, B>(mut forward: F, mut reverse: B) -> Self
    where
        A: DeserializeOwned,
        R: Serialize + DeserializeOwned,
        F: FnMut(A) -> anyhow::Result<R> + 'static,
        B: FnMut(R) -> anyhow::Result<()> + 'static,
    {
        Reducer::new(
            move |args| {
                let args: A = serde_json::from_value(args.clone())
                    .context("Failed to decode forward arguments")?;
                let reverse_args = forward(args)?;
                serde_json::to_value(reverse_args).context("Failed to encode reverse arguments")
            },
            move |args| {
                let args: R = serde_json::from_value(args.clone())
                    .context("Failed to decode reverse arguments")?;
                reverse(args)
            },
        )
    }
}
