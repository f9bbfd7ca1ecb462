//! Constraint-based shift-scheduling core for radiology-style departments.
//!
//! This crate is the optimizer CORE only: slot expansion, the constraint
//! model, continuity/on-call-rest mechanics, and post-solve processing. The
//! persistent state store, auth, calendar UI, exporters, and HTTP transport
//! are external collaborators that consume the types in [`dto`] and
//! [`state`].

pub mod backend;
pub mod calendar;
pub mod demo_data;
pub mod diagnostics;
pub mod domain;
pub mod dto;
pub mod eligibility;
pub mod error;
pub mod extractor;
pub mod model;
pub mod objective;
pub mod solver;
pub mod state;
pub mod stats;
pub mod time;

use crate::backend::Backend;
use crate::dto::{DebugInfoDto, IncumbentEvent, ObserverAction, SolveRequest, SolveResponse};
use crate::error::ScheduleResult;
use crate::solver::{SolveOptions, SolveRegistry};
use crate::state::StateSnapshot;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Synchronous entry point (§6): runs one solve to completion, or until the
/// time budget or `abort` fires, streaming incumbents through `observer`.
pub fn solve(
    state: &StateSnapshot,
    request: &SolveRequest,
    registry: &SolveRegistry,
    backend: &dyn Backend,
    user_key: &str,
    time_budget: Duration,
    abort: Option<&AtomicBool>,
    observer: impl FnMut(IncumbentEvent) -> ObserverAction,
) -> ScheduleResult<SolveResponse> {
    let mut local_state = state.clone();
    local_state.solver_settings.only_fill_required = request.only_fill_required;

    let options = SolveOptions {
        range_start: request.start_iso,
        range_end: request.end_iso,
        time_budget,
        shard_days: None,
        user_key: user_key.to_string(),
    };

    let outcome = solver::solve(&local_state, &options, registry, backend, abort, observer)?;
    Ok(SolveResponse {
        assignments: outcome.assignments,
        notes: outcome.notes,
        debug_info: DebugInfoDto::from(&outcome.debug_info),
    })
}

/// Async variant: runs the blocking solve on a `tokio` blocking thread. The
/// returned `watch::Receiver` always holds the latest incumbent — a slow
/// consumer sees the newest event rather than blocking the solver, per the
/// drop-oldest observer contract.
pub async fn solve_async(
    state: StateSnapshot,
    request: SolveRequest,
    registry: Arc<SolveRegistry>,
    user_key: String,
    time_budget: Duration,
    abort: Arc<AtomicBool>,
) -> ScheduleResult<(SolveResponse, tokio::sync::watch::Receiver<Option<IncumbentEvent>>)> {
    let (tx, rx) = tokio::sync::watch::channel(None);
    let response = tokio::task::spawn_blocking(move || {
        let backend = backend::default_backend();
        solve(
            &state,
            &request,
            &registry,
            backend.as_ref(),
            &user_key,
            time_budget,
            Some(&abort),
            move |event| {
                let _ = tx.send(Some(event));
                ObserverAction::Continue
            },
        )
    })
    .await
    .expect("solve task panicked")?;
    Ok((response, rx))
}
