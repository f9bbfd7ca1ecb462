//! Solver Driver (§4.F): ties the Calendar Projector, Eligibility Resolver,
//! Model Builder, and Objective Composer to a `Backend`, shard by shard,
//! streaming progress to an observer and respecting cooperative
//! cancellation.

use crate::backend::{Backend, SolveStatus};
use crate::calendar::expand_slots;
use crate::diagnostics::{self, DebugInfo};
use crate::domain::Assignment;
use crate::dto::{IncumbentEvent, ObserverAction};
use crate::eligibility::EligibilityMatrix;
use crate::error::{ScheduleError, ScheduleResult};
use crate::{extractor, model, objective};
use crate::state::StateSnapshot;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TerminalStatus {
    Optimal,
    Feasible,
    Unknown,
    Infeasible,
    Aborted,
}

impl TerminalStatus {
    fn from_backend(status: SolveStatus) -> Self {
        match status {
            SolveStatus::Optimal => TerminalStatus::Optimal,
            SolveStatus::Feasible => TerminalStatus::Feasible,
            SolveStatus::Unknown => TerminalStatus::Unknown,
            SolveStatus::Infeasible => TerminalStatus::Infeasible,
        }
    }

    fn to_backend(self) -> SolveStatus {
        match self {
            TerminalStatus::Optimal => SolveStatus::Optimal,
            TerminalStatus::Feasible => SolveStatus::Feasible,
            TerminalStatus::Unknown | TerminalStatus::Aborted => SolveStatus::Unknown,
            TerminalStatus::Infeasible => SolveStatus::Infeasible,
        }
    }
}

pub struct SolveOptions {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub time_budget: Duration,
    /// `None` solves the whole range as a single shard.
    pub shard_days: Option<u32>,
    pub user_key: String,
}

pub struct SolveOutcome {
    pub status: TerminalStatus,
    pub assignments: Vec<Assignment>,
    pub notes: Vec<String>,
    pub debug_info: DebugInfo,
}

/// Caps concurrent in-flight solves per user key at 1 (§5).
#[derive(Default)]
pub struct SolveRegistry {
    inflight: Mutex<HashSet<String>>,
}

impl SolveRegistry {
    pub fn new() -> Self {
        SolveRegistry::default()
    }

    pub fn acquire<'a>(&'a self, user_key: &str) -> ScheduleResult<SolveGuard<'a>> {
        let mut inflight = self.inflight.lock();
        if !inflight.insert(user_key.to_string()) {
            return Err(ScheduleError::ConflictingSolve { user_key: user_key.to_string() });
        }
        Ok(SolveGuard { registry: self, key: user_key.to_string() })
    }
}

pub struct SolveGuard<'a> {
    registry: &'a SolveRegistry,
    key: String,
}

impl Drop for SolveGuard<'_> {
    fn drop(&mut self) {
        self.registry.inflight.lock().remove(&self.key);
    }
}

/// Splits `[start, end]` into `shard_days`-sized chunks, or a single shard
/// covering the whole range when no bound is given.
fn plan_shards(start: NaiveDate, end: NaiveDate, shard_days: Option<u32>) -> Vec<(NaiveDate, NaiveDate)> {
    let Some(days) = shard_days.filter(|&d| d > 0) else {
        return vec![(start, end)];
    };
    let mut out = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let shard_end = (cursor + chrono::Duration::days(days as i64 - 1)).min(end);
        out.push((cursor, shard_end));
        let Some(next) = shard_end.succ_opt() else { break };
        cursor = next;
    }
    out
}

/// Runs the full B→C→D→E→F→G pipeline shard by shard. `abort` is polled
/// between shards; setting it mid-solve yields `TerminalStatus::Aborted`
/// with the best incumbent collected so far, never an inconsistent state.
pub fn solve(
    state: &StateSnapshot,
    options: &SolveOptions,
    registry: &SolveRegistry,
    backend: &dyn Backend,
    abort: Option<&AtomicBool>,
    mut observer: impl FnMut(IncumbentEvent) -> ObserverAction,
) -> ScheduleResult<SolveOutcome> {
    let _guard = registry.acquire(&options.user_key)?;
    let started = Instant::now();

    let shards = plan_shards(options.range_start, options.range_end, options.shard_days);
    let shard_budget = options.time_budget / shards.len().max(1) as u32;

    let mut solved_assignments: Vec<Assignment> = Vec::new();
    let mut incumbent_count: u32 = 0;
    let mut worst_status = TerminalStatus::Optimal;
    let mut notes = Vec::new();

    for (shard_start, shard_end) in &shards {
        if abort.map(|flag| flag.load(Ordering::Relaxed)).unwrap_or(false) {
            worst_status = worst_status.max(TerminalStatus::Aborted);
            notes.push("solve aborted by caller".to_string());
            break;
        }
        let remaining = options.time_budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            worst_status = worst_status.max(TerminalStatus::Unknown);
            notes.push("global deadline expired before all shards were solved".to_string());
            break;
        }
        let budget = shard_budget.min(remaining);

        let instances = expand_slots(state, *shard_start, *shard_end);
        let eligibility = EligibilityMatrix::build(state, &instances, &state.clinicians);
        let shard_model = model::build(state, &instances, &state.clinicians, &eligibility);
        let problem = objective::build_problem(state, &instances, &state.clinicians, &shard_model, *shard_start, *shard_end);

        let mut shard_incumbents = 0u32;
        let solution = backend.solve(&problem, budget, &mut |_objective| shard_incumbents += 1);
        incumbent_count += shard_incumbents.max(1);

        let shard_status = TerminalStatus::from_backend(solution.status);
        worst_status = worst_status.max(shard_status);
        if shard_status == TerminalStatus::Infeasible {
            notes.push(format!(
                "shard {}..{} returned infeasible; other shards continue",
                shard_start, shard_end
            ));
        }

        let shard_result = extractor::extract(state, &instances, &state.clinicians, &shard_model, &solution.values);
        solved_assignments.extend(shard_result.into_iter().filter(|a| !a.manual));

        tracing::info!(
            target: "radschedule_core::solver",
            shard_start = %shard_start,
            shard_end = %shard_end,
            status = ?solution.status,
            objective = solution.objective,
            "shard solved"
        );

        let mut cumulative = state.assignments.clone();
        cumulative.extend(solved_assignments.clone());
        let event = IncumbentEvent {
            solution_num: incumbent_count,
            time_ms: started.elapsed().as_millis() as u64,
            objective: solution.objective as i64,
            assignments: cumulative,
        };
        if observer(event) == ObserverAction::Cancel {
            worst_status = worst_status.max(TerminalStatus::Aborted);
            notes.push("solve cancelled by observer".to_string());
            break;
        }
    }

    let mut assignments = state.assignments.clone();
    assignments.extend(solved_assignments);
    assignments.sort_by(|a, b| (a.date, &a.row_id, &a.clinician_id).cmp(&(b.date, &b.row_id, &b.clinician_id)));

    let full_instances = expand_slots(state, options.range_start, options.range_end);
    let uncovered = diagnostics::uncovered_slots(&full_instances, &assignments);
    for slot in &uncovered {
        notes.push(format!(
            "uncovered required slot {}@{} (missing {})",
            slot.row_id, slot.date, slot.missing
        ));
    }
    let rejected_pins = diagnostics::rejected_pins(state, &full_instances, &state.clinicians);
    for pin in &rejected_pins {
        notes.push(format!(
            "manual pin for {} on {}@{} rejected: {}",
            pin.clinician_id, pin.row_id, pin.date, pin.reason
        ));
    }
    let hours_outliers = diagnostics::hours_outliers(
        state,
        &state.clinicians,
        &assignments,
        options.range_start,
        options.range_end,
    );

    let debug_info = DebugInfo {
        solver_status: worst_status.to_backend(),
        wall_time_ms: started.elapsed().as_millis() as u64,
        incumbent_count,
        uncovered,
        hours_outliers,
        rejected_pins,
    };

    Ok(SolveOutcome { status: worst_status, assignments, notes, debug_info })
}
