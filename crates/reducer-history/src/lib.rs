/// Undo/redo history driven by registered reducers.
///
/// Callers register reversible operations by name, dispatch actions that
/// mutate state they own, and later reverse or replay those mutations by
/// stack index. The `UndoManager` only orchestrates the calls and records
/// the opaque arguments; it never touches the state itself.
pub mod config;
pub mod error;
pub mod manager;
pub mod operation;
pub mod registry;
pub mod snapshot;
pub mod typed;

pub use config::HistoryConfig;
pub use error::{HistoryError, HistoryResult};
pub use manager::UndoManager;
pub use operation::{Action, DispatchOutcome, EntrySummary, RecordedEntry};
pub use registry::{Reducer, ReducerRegistry};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use typed::ActionKind;
