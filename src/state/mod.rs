// Workflow state management
//
// This module provides the WorkflowStore which wraps WorkflowState with shared
// access and emits change events for observers (viewer, renderers).

use crate::models::{DetectionResult, SelectedFile, UploadState};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything the upload workflow knows at one point in time.
///
/// Invariants maintained by [`WorkflowStore`]:
/// - `result` is `Some` only in [`UploadState::Completed`]
/// - `selected_file` is `Some` in `FileSelected` and `Processing`, kept in
///   `Failed` for a retry, and `None` in `Idle` and `Completed`
/// - `generation` never decreases
#[derive(Clone, Debug, Default)]
pub struct WorkflowState {
    pub phase: UploadState,
    pub selected_file: Option<SelectedFile>,
    pub result: Option<Arc<DetectionResult>>,

    /// Cause of the last failure, for diagnostics only
    pub last_error: Option<String>,

    /// Session counter; bumped by every submit and reset
    pub generation: u64,
}

impl WorkflowState {
    pub fn file_name(&self) -> Option<&str> {
        self.selected_file.as_ref().map(|f| f.name())
    }

    /// Whether `submit()` would issue a request right now
    pub fn can_submit(&self) -> bool {
        self.phase.accepts_submit() && self.selected_file.is_some()
    }
}

/// Change events emitted when workflow state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The workflow moved to a new phase
    PhaseChanged { from: UploadState, to: UploadState },

    /// A file was selected, replaced or discarded
    FileChanged { file_name: Option<String> },

    /// A detection result became available
    ResultAvailable { id: String, total_elements: usize },

    /// The held result was dropped
    ResultCleared,

    /// Workflow returned to the initial state via reset
    StateReset,
}

/// Outcome of applying a request completion
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The completion matched the current generation and was applied
    Applied(Vec<StateChange>),
    /// The session moved on (reset or newer submit); nothing changed
    Stale { request: u64, current: u64 },
}

/// Shared workflow state with change events
///
/// The upload controller is the only writer. Readers take snapshots or use
/// [`read()`](Self::read); observers use [`subscribe()`](Self::subscribe).
/// Events are sent while the write lock is held, so every subscriber sees
/// them in mutation order.
pub struct WorkflowStore {
    state: Arc<RwLock<WorkflowState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl WorkflowStore {
    /// Create a new store in [`UploadState::Idle`]
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(WorkflowState::default())),
            state_tx,
        }
    }

    /// Clone of the current state. Cheap: file content and result are shared.
    pub fn snapshot(&self) -> WorkflowState {
        self.state.read().clone()
    }

    /// Execute a function with read access to the state
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&WorkflowState) -> R,
    {
        f(&self.state.read())
    }

    pub fn phase(&self) -> UploadState {
        self.state.read().phase
    }

    pub fn result(&self) -> Option<Arc<DetectionResult>> {
        self.state.read().result.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Mutate the state and emit change events.
    ///
    /// The closure's return value is passed back alongside the events, so
    /// callers can check-and-set under one lock.
    pub fn transition<F, R>(&self, update_fn: F) -> (R, Vec<StateChange>)
    where
        F: FnOnce(&mut WorkflowState) -> R,
    {
        self.transition_then(update_fn, None)
    }

    /// [`transition`](Self::transition) with an extra event sent after the
    /// detected changes, still under the write lock
    fn transition_then<F, R>(&self, update_fn: F, trailing: Option<StateChange>) -> (R, Vec<StateChange>)
    where
        F: FnOnce(&mut WorkflowState) -> R,
    {
        let mut state = self.state.write();
        let old_state = state.clone();

        let value = update_fn(&mut state);

        let mut changes = Self::detect_changes(&old_state, &state);
        changes.extend(trailing);
        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        (value, changes)
    }

    /// Mutate the state and emit change events
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut WorkflowState),
    {
        self.transition(update_fn).1
    }

    fn detect_changes(old: &WorkflowState, new: &WorkflowState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.phase != new.phase {
            changes.push(StateChange::PhaseChanged {
                from: old.phase,
                to: new.phase,
            });
        }

        let same_file = match (&old.selected_file, &new.selected_file) {
            (None, None) => true,
            (Some(a), Some(b)) => a.shares_content(b),
            _ => false,
        };
        if !same_file {
            changes.push(StateChange::FileChanged {
                file_name: new.file_name().map(str::to_string),
            });
        }

        let same_result = match (&old.result, &new.result) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        if !same_result {
            match &new.result {
                Some(result) => changes.push(StateChange::ResultAvailable {
                    id: result.id.clone(),
                    total_elements: result.elements.total(),
                }),
                None => changes.push(StateChange::ResultCleared),
            }
        }

        changes
    }

    // Transitions used by the upload controller. Preconditions are checked
    // under the write lock.

    /// Hold a new file, dropping any previous selection and result.
    ///
    /// Returns `false` without changing anything while a request is in flight.
    pub fn select(&self, file: SelectedFile) -> (bool, Vec<StateChange>) {
        self.transition(|state| {
            if !state.phase.accepts_selection() {
                return false;
            }
            state.phase = UploadState::FileSelected;
            state.selected_file = Some(file);
            state.result = None;
            state.last_error = None;
            true
        })
    }

    /// Enter `Processing` for the held file.
    ///
    /// Returns the new generation and the file to send, or `None` when there
    /// is nothing to submit (no file, already processing, completed).
    pub fn begin_processing(&self) -> (Option<(u64, SelectedFile)>, Vec<StateChange>) {
        self.transition(|state| {
            if !state.can_submit() {
                return None;
            }
            let file = state.selected_file.clone()?;
            state.generation += 1;
            state.phase = UploadState::Processing;
            state.result = None;
            state.last_error = None;
            Some((state.generation, file))
        })
    }

    /// Store a result for the request issued under `generation`
    pub fn complete(&self, generation: u64, result: DetectionResult) -> Completion {
        let result = Arc::new(result);
        self.finish(generation, move |state| {
            state.phase = UploadState::Completed;
            state.selected_file = None;
            state.result = Some(result);
            state.last_error = None;
        })
    }

    /// Record a failure for the request issued under `generation`.
    /// The selected file is kept so the user can retry.
    pub fn fail(&self, generation: u64, error: String) -> Completion {
        self.finish(generation, move |state| {
            state.phase = UploadState::Failed;
            state.result = None;
            state.last_error = Some(error);
        })
    }

    fn finish<F>(&self, generation: u64, apply: F) -> Completion
    where
        F: FnOnce(&mut WorkflowState),
    {
        let (outcome, changes) = self.transition(|state| {
            if state.generation != generation || state.phase != UploadState::Processing {
                return Err(state.generation);
            }
            apply(state);
            Ok(())
        });

        match outcome {
            Ok(()) => Completion::Applied(changes),
            Err(current) => Completion::Stale {
                request: generation,
                current,
            },
        }
    }

    /// Return to `Idle`, dropping file, result and error.
    ///
    /// Bumps the generation so an in-flight response is ignored on arrival.
    pub fn reset(&self) -> Vec<StateChange> {
        let ((), changes) = self.transition_then(
            |state| {
                state.phase = UploadState::Idle;
                state.selected_file = None;
                state.result = None;
                state.last_error = None;
                state.generation += 1;
            },
            Some(StateChange::StateReset),
        );
        changes
    }
}

impl Default for WorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WorkflowStore {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
